//! In-memory record store.

use async_trait::async_trait;
use dart_core::{
    Clock, CorpCode, Entity, FinancialRecord, Period, RecordStore, Result, Statement,
    StatementKind, SystemClock,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Natural key of a stored record. Field order gives the `get_all` ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RecordKey {
    kind: StatementKind,
    corp_code: CorpCode,
    period: Period,
}

/// Simple in-memory store for testing and development.
///
/// Data is stored in `RwLock`-protected maps and is lost when the store is
/// dropped. Records are cloned on every read and write.
#[derive(Debug)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<RecordKey, FinancialRecord>>,
    entities: RwLock<HashMap<CorpCode, Entity>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            records: RwLock::default(),
            entities: RwLock::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the clock used to stamp `last_refreshed`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of stored records across all kinds.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true when no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    #[instrument(skip(self, entities), fields(count = entities.len()))]
    async fn seed_entities(&self, entities: &[Entity]) -> Result<()> {
        let mut map = self.entities.write().await;
        for entity in entities {
            map.insert(entity.corp_code.clone(), entity.clone());
        }
        Ok(())
    }

    async fn entity(&self, corp_code: &CorpCode) -> Result<Option<Entity>> {
        Ok(self.entities.read().await.get(corp_code).cloned())
    }

    #[instrument(skip(self), fields(kind = %kind, corp_code = %corp_code, period = %period))]
    async fn get(
        &self,
        kind: StatementKind,
        corp_code: &CorpCode,
        period: Period,
    ) -> Result<Option<FinancialRecord>> {
        let key = RecordKey {
            kind,
            corp_code: corp_code.clone(),
            period,
        };
        let record = self.records.read().await.get(&key).cloned();
        if record.is_none() {
            debug!("No stored record");
        }
        Ok(record)
    }

    #[instrument(skip(self), fields(kind = %kind, corp_code = %corp_code))]
    async fn get_all(
        &self,
        kind: StatementKind,
        corp_code: &CorpCode,
    ) -> Result<Vec<FinancialRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|(key, _)| key.kind == kind && &key.corp_code == corp_code)
            .map(|(_, record)| record.clone())
            .collect())
    }

    #[instrument(skip(self, statement), fields(kind = %statement.kind(), corp_code = %corp_code, period = %period))]
    async fn upsert(
        &self,
        corp_code: &CorpCode,
        period: Period,
        statement: Statement,
    ) -> Result<FinancialRecord> {
        let record = FinancialRecord {
            corp_code: corp_code.clone(),
            period,
            statement,
            last_refreshed: self.clock.now(),
        };
        let key = RecordKey {
            kind: record.kind(),
            corp_code: corp_code.clone(),
            period,
        };
        self.records.write().await.insert(key, record.clone());
        debug!("Upserted record");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dart_core::{IncomeRecord, ManualClock, Quarter, covered_entities};

    fn samsung() -> CorpCode {
        CorpCode::new("00126380")
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_restamps() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        ));
        let store = InMemoryStore::new().with_clock(clock.clone());
        let period = Period::annual(2020);

        store
            .upsert(
                &samsung(),
                period,
                Statement::Income(IncomeRecord::new(100, 60, 10, 30)),
            )
            .await
            .unwrap();
        clock.advance(chrono::Duration::minutes(30));
        store
            .upsert(
                &samsung(),
                period,
                Statement::Income(IncomeRecord::new(300, 60, 30, 30)),
            )
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        let stored = store
            .get(StatementKind::Income, &samsung(), period)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.as_income().unwrap().revenue, 300);
        assert_eq!(stored.last_refreshed, clock.now());
    }

    #[tokio::test]
    async fn test_get_all_filters_and_orders() {
        let store = InMemoryStore::new();
        let other = CorpCode::new("00164779");
        for (corp, period) in [
            (samsung(), Period::quarterly(2021, Quarter::First)),
            (other.clone(), Period::annual(2020)),
            (samsung(), Period::annual(2021)),
            (samsung(), Period::annual(2019)),
        ] {
            store
                .upsert(&corp, period, Statement::Income(IncomeRecord::default()))
                .await
                .unwrap();
        }

        let periods: Vec<Period> = store
            .get_all(StatementKind::Income, &samsung())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.period)
            .collect();
        assert_eq!(
            periods,
            vec![
                Period::annual(2019),
                Period::annual(2021),
                Period::quarterly(2021, Quarter::First),
            ]
        );
        assert!(
            store
                .get_all(StatementKind::Balance, &samsung())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_entities() {
        let store = InMemoryStore::new();
        assert!(store.is_empty().await);
        store.seed_entities(&covered_entities()).await.unwrap();
        assert!(store.entity(&samsung()).await.unwrap().is_some());
        assert!(
            store
                .entity(&CorpCode::new("00000000"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
