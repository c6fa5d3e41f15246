//! Fetch orchestration: serve fresh stored records, otherwise go upstream,
//! extract and persist.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};

use dart_core::{
    Clock, Config, CorpCode, DEFAULT_FRESHNESS, DataError, DisclosureSource, FinancialRecord,
    Period, PeriodSpec, RecordStore, Result, StatementKind, SystemClock, Vocabulary,
    config::DEFAULT_PACING, covered_entities, extract, is_fresh_at,
};

/// Enforces a fixed minimum delay between consecutive upstream calls.
///
/// The first call goes out immediately. This is pacing, not backoff: the
/// delay never grows and failed calls are not retried.
#[derive(Debug)]
struct Pacer {
    last_call: Option<Instant>,
    interval: Duration,
}

impl Pacer {
    const fn new(interval: Duration) -> Self {
        Self {
            last_call: None,
            interval,
        }
    }

    async fn wait(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
        self.last_call = Some(Instant::now());
    }
}

/// The fetch-parse-cache pipeline.
///
/// A single-period request returns the stored record when it is fresh and
/// otherwise refetches exactly that period; a stale record is never served
/// as a fallback for a failed refetch. A range request is served from the
/// store only when every period in it is fresh; otherwise the whole range is
/// refetched, one period at a time with a fixed pacing delay, and periods
/// that fail upstream are left out of the result.
///
/// # Example
///
/// ```rust,ignore
/// use dart::{Config, Granularity, PeriodSpec, Pipeline, StatementKind, CorpCode};
///
/// let config = Config::from_env()?;
/// let pipeline = Pipeline::from_config(&config).await?;
///
/// let records = pipeline
///     .fetch_or_get(
///         StatementKind::Income,
///         &CorpCode::new("00126380"),
///         PeriodSpec::Range { start_year: 2019, end_year: 2020, granularity: Granularity::Annual },
///     )
///     .await?;
/// ```
pub struct Pipeline {
    store: Arc<dyn RecordStore>,
    source: Arc<dyn DisclosureSource>,
    vocabulary: Arc<Vocabulary>,
    clock: Arc<dyn Clock>,
    freshness: Duration,
    pacing: Duration,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("source", &self.source.name())
            .field("clock", &self.clock)
            .field("freshness", &self.freshness)
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with the built-in vocabulary, the wall clock, a
    /// 24 hour freshness window and the default pacing delay.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, source: Arc<dyn DisclosureSource>) -> Self {
        Self {
            store,
            source,
            vocabulary: Arc::new(Vocabulary::builtin()),
            clock: Arc::new(SystemClock),
            freshness: DEFAULT_FRESHNESS,
            pacing: DEFAULT_PACING,
        }
    }

    /// Builds the SQLite store and OpenDART client described by `config`,
    /// creates the schema and seeds the covered entities.
    ///
    /// # Errors
    /// [`DataError::Configuration`] for an unusable configuration and
    /// [`DataError::StoreUnavailable`] if the database cannot be prepared.
    #[cfg(feature = "cache-sqlite")]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(dart_cache::SqliteStore::new(&config.database_path)?);
        let source = Arc::new(dart_opendart::OpenDartClient::from_config(config)?);
        let pipeline = Self::new(store, source).configured(config)?;
        pipeline.initialize().await?;
        Ok(pipeline)
    }

    /// Applies the tunables and vocabulary of `config`.
    ///
    /// # Errors
    /// [`DataError::Configuration`] if the vocabulary file cannot be loaded.
    pub fn configured(self, config: &Config) -> Result<Self> {
        Ok(self
            .with_vocabulary(config.vocabulary()?)
            .with_freshness(config.freshness)
            .with_pacing(config.pacing))
    }

    /// Replaces the extractor vocabulary.
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = Arc::new(vocabulary);
        self
    }

    /// Replaces the clock used for freshness checks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets how long stored records are served without refetching.
    #[must_use]
    pub const fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    /// Sets the delay between consecutive upstream calls in a range fetch.
    #[must_use]
    pub const fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Current time according to the pipeline clock.
    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Creates the store schema and seeds the covered entity list.
    ///
    /// Safe to call repeatedly.
    pub async fn initialize(&self) -> Result<()> {
        self.store.ensure_schema().await?;
        self.store.seed_entities(&covered_entities()).await?;
        info!(source = self.source.name(), "Pipeline initialized");
        Ok(())
    }

    /// Returns the records for `spec`, from the store when fresh and from
    /// upstream otherwise.
    ///
    /// Records come back in period order.
    ///
    /// # Errors
    ///
    /// - [`DataError::EntityNotFound`] for a corp code outside the covered list.
    /// - [`DataError::StoreUnavailable`] if the store fails at any point.
    /// - For a single period, whatever upstream or the extractor reported.
    /// - For a range, [`DataError::NoData`] when no period could be produced,
    ///   or [`DataError::UpstreamUnavailable`] when every attempt failed to
    ///   reach upstream.
    #[instrument(skip(self), fields(kind = %kind, corp_code = %corp_code, spec = %spec))]
    pub async fn fetch_or_get(
        &self,
        kind: StatementKind,
        corp_code: &CorpCode,
        spec: PeriodSpec,
    ) -> Result<Vec<FinancialRecord>> {
        self.ensure_covered(corp_code).await?;
        match spec {
            PeriodSpec::Single(period) => Ok(vec![self.fetch_single(kind, corp_code, period).await?]),
            PeriodSpec::Range { .. } => self.fetch_range(kind, corp_code, spec).await,
        }
    }

    /// Single-period shorthand for [`Pipeline::fetch_or_get`].
    ///
    /// # Errors
    /// See [`Pipeline::fetch_or_get`].
    #[instrument(skip(self), fields(kind = %kind, corp_code = %corp_code, period = %period))]
    pub async fn fetch_period(
        &self,
        kind: StatementKind,
        corp_code: &CorpCode,
        period: Period,
    ) -> Result<FinancialRecord> {
        self.ensure_covered(corp_code).await?;
        self.fetch_single(kind, corp_code, period).await
    }

    /// Runs [`Pipeline::fetch_or_get`] for several entities concurrently.
    ///
    /// Each entity's periods are still fetched sequentially with pacing.
    /// Results are returned in input order.
    pub async fn fetch_entities(
        &self,
        kind: StatementKind,
        corp_codes: &[CorpCode],
        spec: PeriodSpec,
    ) -> Vec<(CorpCode, Result<Vec<FinancialRecord>>)> {
        let futures = corp_codes.iter().map(|corp_code| async move {
            let result = self.fetch_or_get(kind, corp_code, spec).await;
            (corp_code.clone(), result)
        });
        join_all(futures).await
    }

    async fn ensure_covered(&self, corp_code: &CorpCode) -> Result<()> {
        match self.store.entity(corp_code).await? {
            Some(_) => Ok(()),
            None => Err(DataError::EntityNotFound(corp_code.to_string())),
        }
    }

    async fn fetch_single(
        &self,
        kind: StatementKind,
        corp_code: &CorpCode,
        period: Period,
    ) -> Result<FinancialRecord> {
        if let Some(record) = self.store.get(kind, corp_code, period).await? {
            if is_fresh_at(&record, self.freshness, self.clock.now()) {
                debug!("Serving fresh stored record");
                return Ok(record);
            }
            debug!(last_refreshed = %record.last_refreshed, "Stored record is stale");
        }
        self.refresh(kind, corp_code, period).await
    }

    async fn fetch_range(
        &self,
        kind: StatementKind,
        corp_code: &CorpCode,
        spec: PeriodSpec,
    ) -> Result<Vec<FinancialRecord>> {
        let periods = spec.periods();
        let no_data = || DataError::NoData {
            corp_code: corp_code.to_string(),
            period: spec.to_string(),
        };
        if periods.is_empty() {
            return Err(no_data());
        }

        let now = self.clock.now();
        let mut stored: BTreeMap<Period, FinancialRecord> = self
            .store
            .get_all(kind, corp_code)
            .await?
            .into_iter()
            .map(|record| (record.period, record))
            .collect();

        let all_fresh = periods.iter().all(|period| {
            stored
                .get(period)
                .is_some_and(|record| is_fresh_at(record, self.freshness, now))
        });
        if all_fresh {
            debug!(count = periods.len(), "Serving fresh stored range");
            return Ok(periods
                .iter()
                .filter_map(|period| stored.remove(period))
                .collect());
        }

        info!(count = periods.len(), "Refetching range");
        let mut pacer = Pacer::new(self.pacing);
        let mut records = Vec::with_capacity(periods.len());
        let mut last_unavailable = None;
        let mut only_unavailable = true;

        for period in periods {
            pacer.wait().await;
            match self.refresh(kind, corp_code, period).await {
                Ok(record) => records.push(record),
                Err(e) if e.is_period_local() => {
                    warn!(period = %period, error = %e, "Skipping period");
                    if matches!(e, DataError::UpstreamUnavailable(_)) {
                        last_unavailable = Some(e);
                    } else {
                        only_unavailable = false;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        if records.is_empty() {
            return Err(match last_unavailable {
                Some(e) if only_unavailable => e,
                _ => no_data(),
            });
        }

        debug!(count = records.len(), "Range refetched");
        Ok(records)
    }

    /// Upstream call, extraction and upsert for one period.
    async fn refresh(
        &self,
        kind: StatementKind,
        corp_code: &CorpCode,
        period: Period,
    ) -> Result<FinancialRecord> {
        let payload = self.source.fetch_report(corp_code, period).await?;
        let extraction = extract(kind, &payload, &self.vocabulary)?;
        if !extraction.is_complete() {
            debug!(period = %period, missing = ?extraction.missing, "Persisting partial record");
        }
        self.store
            .upsert(corp_code, period, extraction.statement)
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use dart_cache::InMemoryStore;
    use dart_core::{
        Granularity, IncomeRecord, ManualClock, Quarter, RawLineItem, ReportPayload, Statement,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// What the scripted source answers for one period.
    #[derive(Debug, Clone)]
    pub(crate) enum Script {
        Report(ReportPayload),
        Unavailable,
    }

    /// Upstream double answering from a per-period script and counting calls.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedSource {
        scripts: Mutex<HashMap<Period, Script>>,
        calls: Mutex<Vec<(CorpCode, Period)>>,
    }

    impl ScriptedSource {
        pub(crate) fn set(&self, period: Period, script: Script) {
            self.scripts.lock().unwrap().insert(period, script);
        }

        pub(crate) fn calls(&self) -> Vec<(CorpCode, Period)> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DisclosureSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch_report(
            &self,
            corp_code: &CorpCode,
            period: Period,
        ) -> Result<ReportPayload> {
            self.calls.lock().unwrap().push((corp_code.clone(), period));
            let script = self.scripts.lock().unwrap().get(&period).cloned();
            match script {
                Some(Script::Report(payload)) => Ok(payload),
                Some(Script::Unavailable) => {
                    Err(DataError::UpstreamUnavailable("connection refused".into()))
                }
                None => Ok(ReportPayload::rejected("013", "조회된 데이타가 없습니다.")),
            }
        }
    }

    pub(crate) fn income_report(revenue: &str, operating_profit: &str) -> Script {
        Script::Report(ReportPayload::ok(vec![
            RawLineItem::new("IS", "ifrs-full_Revenue", "수익(매출액)", revenue),
            RawLineItem::new("IS", "dart_OperatingIncomeLoss", "영업이익", operating_profit),
        ]))
    }

    pub(crate) fn samsung() -> CorpCode {
        CorpCode::new("00126380")
    }

    pub(crate) fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    pub(crate) async fn pipeline_with(
        source: Arc<ScriptedSource>,
        clock: Arc<ManualClock>,
    ) -> (Pipeline, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new().with_clock(clock.clone()));
        let pipeline = Pipeline::new(store.clone(), source)
            .with_clock(clock)
            .with_pacing(Duration::ZERO);
        pipeline.initialize().await.unwrap();
        (pipeline, store)
    }

    fn annual_range(start_year: i32, end_year: i32) -> PeriodSpec {
        PeriodSpec::Range {
            start_year,
            end_year,
            granularity: Granularity::Annual,
        }
    }

    fn margins(records: &[FinancialRecord]) -> Vec<f64> {
        records
            .iter()
            .map(|r| r.as_income().unwrap().operating_margin)
            .collect()
    }

    #[tokio::test]
    async fn test_samsung_range_then_cache_hit() {
        let source = Arc::new(ScriptedSource::default());
        source.set(
            Period::annual(2019),
            income_report("279,604,800,000,000", "27,768,900,000,000"),
        );
        source.set(
            Period::annual(2020),
            income_report("236,806,988,000,000", "35,994,019,000,000"),
        );
        let clock = Arc::new(ManualClock::new(start()));
        let (pipeline, store) = pipeline_with(source.clone(), clock.clone()).await;

        let first = pipeline
            .fetch_or_get(StatementKind::Income, &samsung(), annual_range(2019, 2020))
            .await
            .unwrap();
        assert_eq!(margins(&first), vec![9.93, 15.2]);
        assert_eq!(source.call_count(), 2);
        assert_eq!(store.len().await, 2);

        clock.advance(chrono::Duration::hours(23));
        let second = pipeline
            .fetch_or_get(StatementKind::Income, &samsung(), annual_range(2019, 2020))
            .await
            .unwrap();
        assert_eq!(second, first);
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_range_partial_failure_is_isolated() {
        let source = Arc::new(ScriptedSource::default());
        for year in [2016, 2017, 2019, 2020] {
            source.set(Period::annual(year), income_report("1,000", "100"));
        }
        source.set(
            Period::annual(2018),
            Script::Report(ReportPayload::rejected("013", "조회된 데이타가 없습니다.")),
        );
        let clock = Arc::new(ManualClock::new(start()));
        let (pipeline, store) = pipeline_with(source.clone(), clock).await;

        let records = pipeline
            .fetch_or_get(StatementKind::Income, &samsung(), annual_range(2016, 2020))
            .await
            .unwrap();

        let years: Vec<i32> = records.iter().map(|r| r.period.fiscal_year).collect();
        assert_eq!(years, vec![2016, 2017, 2019, 2020]);
        assert_eq!(source.call_count(), 5);

        let stored = store
            .get_all(StatementKind::Income, &samsung())
            .await
            .unwrap();
        assert_eq!(stored.len(), 4);
        assert!(
            store
                .get(StatementKind::Income, &samsung(), Period::annual(2018))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_range_refetch_drops_failed_period_despite_stale_copy() {
        let source = Arc::new(ScriptedSource::default());
        for year in 2018..=2020 {
            source.set(Period::annual(year), income_report("1,000", "100"));
        }
        let clock = Arc::new(ManualClock::new(start()));
        let (pipeline, store) = pipeline_with(source.clone(), clock.clone()).await;

        pipeline
            .fetch_or_get(StatementKind::Income, &samsung(), annual_range(2018, 2020))
            .await
            .unwrap();

        clock.advance(chrono::Duration::days(2));
        source.set(Period::annual(2019), Script::Unavailable);
        let records = pipeline
            .fetch_or_get(StatementKind::Income, &samsung(), annual_range(2018, 2020))
            .await
            .unwrap();

        let years: Vec<i32> = records.iter().map(|r| r.period.fiscal_year).collect();
        assert_eq!(years, vec![2018, 2020]);
        assert_eq!(source.call_count(), 6);

        // the stale copy stays in the store untouched
        let stale = store
            .get(StatementKind::Income, &samsung(), Period::annual(2019))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stale.last_refreshed, start());
    }

    #[tokio::test]
    async fn test_one_stale_period_refetches_whole_range() {
        let source = Arc::new(ScriptedSource::default());
        for year in 2018..=2020 {
            source.set(Period::annual(year), income_report("1,000", "100"));
        }
        let clock = Arc::new(ManualClock::new(start()));
        let (pipeline, store) = pipeline_with(source.clone(), clock.clone()).await;

        pipeline
            .fetch_or_get(StatementKind::Income, &samsung(), annual_range(2018, 2020))
            .await
            .unwrap();
        assert_eq!(source.call_count(), 3);

        // only 2019 goes stale
        clock.advance(chrono::Duration::hours(25));
        store
            .upsert(
                &samsung(),
                Period::annual(2018),
                Statement::Income(IncomeRecord::new(1_000, 0, 100, 0)),
            )
            .await
            .unwrap();
        store
            .upsert(
                &samsung(),
                Period::annual(2020),
                Statement::Income(IncomeRecord::new(1_000, 0, 100, 0)),
            )
            .await
            .unwrap();

        source.set(Period::annual(2019), income_report("2,000", "500"));
        let records = pipeline
            .fetch_or_get(StatementKind::Income, &samsung(), annual_range(2018, 2020))
            .await
            .unwrap();

        assert_eq!(source.call_count(), 6);
        assert_eq!(margins(&records), vec![10.0, 25.0, 10.0]);
        for record in &records {
            assert_eq!(record.last_refreshed, clock.now());
        }
    }

    #[tokio::test]
    async fn test_single_period_fresh_hit_and_stale_refetch() {
        let source = Arc::new(ScriptedSource::default());
        let period = Period::quarterly(2023, Quarter::First);
        source.set(period, income_report("1,000", "100"));
        let clock = Arc::new(ManualClock::new(start()));
        let (pipeline, _store) = pipeline_with(source.clone(), clock.clone()).await;

        let first = pipeline
            .fetch_period(StatementKind::Income, &samsung(), period)
            .await
            .unwrap();
        let hit = pipeline
            .fetch_period(StatementKind::Income, &samsung(), period)
            .await
            .unwrap();
        assert_eq!(first, hit);
        assert_eq!(source.call_count(), 1);

        clock.advance(chrono::Duration::hours(24));
        source.set(period, income_report("1,000", "300"));
        let refreshed = pipeline
            .fetch_period(StatementKind::Income, &samsung(), period)
            .await
            .unwrap();
        assert_eq!(source.call_count(), 2);
        assert_eq!(refreshed.as_income().unwrap().operating_margin, 30.0);
    }

    #[tokio::test]
    async fn test_stale_record_is_not_served_when_upstream_fails() {
        let source = Arc::new(ScriptedSource::default());
        let period = Period::annual(2020);
        source.set(period, income_report("1,000", "100"));
        let clock = Arc::new(ManualClock::new(start()));
        let (pipeline, _store) = pipeline_with(source.clone(), clock.clone()).await;

        pipeline
            .fetch_period(StatementKind::Income, &samsung(), period)
            .await
            .unwrap();

        clock.advance(chrono::Duration::days(2));
        source.set(period, Script::Unavailable);
        let err = pipeline
            .fetch_period(StatementKind::Income, &samsung(), period)
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::UpstreamUnavailable(_)));

        source.set(
            period,
            Script::Report(ReportPayload::rejected("013", "조회된 데이타가 없습니다.")),
        );
        let err = pipeline
            .fetch_period(StatementKind::Income, &samsung(), period)
            .await
            .unwrap_err();
        assert!(err.is_no_data());
    }

    #[tokio::test]
    async fn test_unknown_entity_never_reaches_upstream() {
        let source = Arc::new(ScriptedSource::default());
        let clock = Arc::new(ManualClock::new(start()));
        let (pipeline, _store) = pipeline_with(source.clone(), clock).await;

        let err = pipeline
            .fetch_or_get(
                StatementKind::Income,
                &CorpCode::new("99999999"),
                annual_range(2019, 2020),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::EntityNotFound(_)));
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_range_results() {
        let source = Arc::new(ScriptedSource::default());
        let clock = Arc::new(ManualClock::new(start()));
        let (pipeline, _store) = pipeline_with(source.clone(), clock).await;

        // every period rejected
        let err = pipeline
            .fetch_or_get(StatementKind::Income, &samsung(), annual_range(2019, 2020))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::NoData { .. }));

        // every period unreachable
        source.set(Period::annual(2019), Script::Unavailable);
        source.set(Period::annual(2020), Script::Unavailable);
        let err = pipeline
            .fetch_or_get(StatementKind::Income, &samsung(), annual_range(2019, 2020))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::UpstreamUnavailable(_)));

        // inverted bounds
        let calls = source.call_count();
        let err = pipeline
            .fetch_or_get(StatementKind::Income, &samsung(), annual_range(2021, 2020))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::NoData { .. }));
        assert_eq!(source.call_count(), calls);
    }

    #[tokio::test]
    async fn test_quarterly_range_requests_each_report_code() {
        let source = Arc::new(ScriptedSource::default());
        for quarter in Quarter::ALL {
            source.set(
                Period::quarterly(2023, quarter),
                income_report("1,000", "100"),
            );
        }
        let clock = Arc::new(ManualClock::new(start()));
        let (pipeline, _store) = pipeline_with(source.clone(), clock).await;

        let records = pipeline
            .fetch_or_get(
                StatementKind::Income,
                &samsung(),
                PeriodSpec::Range {
                    start_year: 2023,
                    end_year: 2023,
                    granularity: Granularity::Quarterly,
                },
            )
            .await
            .unwrap();
        assert_eq!(records.len(), 3);

        let codes: Vec<&str> = source
            .calls()
            .iter()
            .map(|(_, period)| period.report_code().as_str())
            .collect();
        assert_eq!(codes, vec!["11013", "11012", "11014"]);
    }

    #[tokio::test]
    async fn test_range_calls_are_paced() {
        let source = Arc::new(ScriptedSource::default());
        let clock = Arc::new(ManualClock::new(start()));
        let (pipeline, _store) = pipeline_with(source.clone(), clock).await;
        let pipeline = pipeline.with_pacing(Duration::from_millis(30));

        let started = std::time::Instant::now();
        let _ = pipeline
            .fetch_or_get(StatementKind::Income, &samsung(), annual_range(2018, 2020))
            .await;
        assert_eq!(source.call_count(), 3);
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_fetch_entities_keeps_input_order() {
        let source = Arc::new(ScriptedSource::default());
        source.set(Period::annual(2020), income_report("1,000", "100"));
        let clock = Arc::new(ManualClock::new(start()));
        let (pipeline, _store) = pipeline_with(source.clone(), clock).await;

        let codes = vec![samsung(), CorpCode::new("99999999"), CorpCode::new("00164779")];
        let results = pipeline
            .fetch_entities(
                StatementKind::Income,
                &codes,
                PeriodSpec::Single(Period::annual(2020)),
            )
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, samsung());
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(DataError::EntityNotFound(_))));
        assert!(results[2].1.is_ok());
    }
}
