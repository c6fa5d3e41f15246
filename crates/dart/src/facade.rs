//! Request façade: query-string requests in, status code and JSON body out.
//!
//! Parameters:
//!
//! - `corp_code` (required): covered entity.
//! - `year` (optional): a single fiscal year instead of the history range.
//! - `quarter` (optional, with `year`): 1 (Q1), 2 (half-year) or 3 (Q3).
//! - `granularity` (optional, range only): `annual` (default) or `quarterly`.
//!
//! Without `year` the request covers the configured history range ending at
//! the current year.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use dart_core::{
    Config, CorpCode, DataError, FinancialRecord, Granularity, Period, PeriodSpec, Quarter,
    Result, Statement, StatementKind, history_range,
};

use crate::pipeline::Pipeline;

/// HTTP-equivalent response.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// Status code: 200, 400, 404 or 500.
    pub status: u16,
    /// JSON body; `{"error": ...}` for failures.
    pub body: Value,
}

impl Response {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// Error response for `err`, e.g. a startup [`DataError::Configuration`].
    #[must_use]
    pub fn from_error(err: &DataError) -> Self {
        Self {
            status: status_for(err),
            body: json!({ "error": err.to_string() }),
        }
    }
}

/// Status code for a failed request.
///
/// Bad input is 400, the "nothing to serve" family is 404, and upstream,
/// store or configuration faults are 500.
#[must_use]
pub const fn status_for(err: &DataError) -> u16 {
    match err {
        DataError::InvalidParameter(_) => 400,
        e if e.is_no_data() => 404,
        _ => 500,
    }
}

/// Wire shape of one record.
#[derive(Serialize)]
struct RecordBody<'a> {
    corp_code: &'a CorpCode,
    year: i32,
    quarter: Option<Quarter>,
    period: String,
    last_refreshed: DateTime<Utc>,
    #[serde(flatten)]
    statement: &'a Statement,
}

impl<'a> From<&'a FinancialRecord> for RecordBody<'a> {
    fn from(record: &'a FinancialRecord) -> Self {
        Self {
            corp_code: &record.corp_code,
            year: record.period.fiscal_year,
            quarter: record.period.quarter,
            period: record.period.label(),
            last_refreshed: record.last_refreshed,
            statement: &record.statement,
        }
    }
}

/// Translates query strings into pipeline calls.
#[derive(Debug)]
pub struct Facade {
    pipeline: Pipeline,
    history_years: u32,
}

impl Facade {
    /// Wraps a pipeline, using `history_years` for requests without a year.
    #[must_use]
    pub const fn new(pipeline: Pipeline, history_years: u32) -> Self {
        Self {
            pipeline,
            history_years,
        }
    }

    /// Builds the pipeline described by `config`.
    ///
    /// # Errors
    /// Missing or unusable configuration is fatal for the whole façade and
    /// reported as [`DataError::Configuration`].
    #[cfg(feature = "cache-sqlite")]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pipeline = Pipeline::from_config(config).await?;
        Ok(Self::new(pipeline, config.history_years))
    }

    /// [`Facade::from_config`] with [`Config::from_env`].
    ///
    /// # Errors
    /// See [`Facade::from_config`].
    #[cfg(feature = "cache-sqlite")]
    pub async fn from_env() -> Result<Self> {
        Self::from_config(&Config::from_env()?).await
    }

    /// The wrapped pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Handles one request for `kind` statements.
    ///
    /// A single-period request answers with one record object, a range
    /// request with an array of records in period order.
    pub async fn handle(&self, kind: StatementKind, query: &str) -> Response {
        let (corp_code, spec) = match self.parse_query(query) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "Rejected request");
                return Response::from_error(&e);
            }
        };

        match self.pipeline.fetch_or_get(kind, &corp_code, spec).await {
            Ok(records) => match spec {
                PeriodSpec::Single(_) => match records.first() {
                    Some(record) => json_response(&RecordBody::from(record)),
                    None => Response::from_error(&DataError::NoData {
                        corp_code: corp_code.to_string(),
                        period: spec.to_string(),
                    }),
                },
                PeriodSpec::Range { .. } => {
                    let bodies: Vec<RecordBody<'_>> =
                        records.iter().map(RecordBody::from).collect();
                    json_response(&bodies)
                }
            },
            Err(e) => {
                let response = Response::from_error(&e);
                if response.status >= 500 {
                    warn!(corp_code = %corp_code, kind = %kind, error = %e, "Request failed");
                } else {
                    debug!(corp_code = %corp_code, kind = %kind, error = %e, "Nothing to serve");
                }
                response
            }
        }
    }

    /// Parses a query string into the requested entity and periods.
    ///
    /// # Errors
    /// [`DataError::InvalidParameter`] for a missing `corp_code` or a
    /// malformed `year`, `quarter` or `granularity`.
    pub fn parse_query(&self, query: &str) -> Result<(CorpCode, PeriodSpec)> {
        let mut corp_code = None;
        let mut year = None;
        let mut quarter = None;
        let mut granularity = None;

        let query = query.trim_start_matches('?');
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "corp_code" => corp_code = Some(CorpCode::new(value)),
                "year" => year = Some(value),
                "quarter" => quarter = Some(value),
                "granularity" => granularity = Some(value),
                _ => {}
            }
        }

        let corp_code = corp_code
            .ok_or_else(|| DataError::InvalidParameter("corp_code is required".to_string()))?;

        let spec = match year {
            Some(year) => {
                let year: i32 = year
                    .parse()
                    .map_err(|_| DataError::InvalidParameter(format!("invalid year: {year}")))?;
                let period = match quarter {
                    None => Period::annual(year),
                    Some(q) => q
                        .parse::<u8>()
                        .ok()
                        .and_then(Quarter::from_number)
                        .map(|q| Period::quarterly(year, q))
                        .ok_or_else(|| {
                            DataError::InvalidParameter(format!("invalid quarter: {q}"))
                        })?,
                };
                PeriodSpec::Single(period)
            }
            None => {
                if quarter.is_some() {
                    return Err(DataError::InvalidParameter(
                        "quarter requires year".to_string(),
                    ));
                }
                let granularity = granularity
                    .as_deref()
                    .map(Granularity::parse)
                    .transpose()?
                    .unwrap_or_default();
                let (start_year, end_year) = self.history_range();
                PeriodSpec::Range {
                    start_year,
                    end_year,
                    granularity,
                }
            }
        };

        Ok((corp_code, spec))
    }

    fn history_range(&self) -> (i32, i32) {
        history_range(self.history_years, self.pipeline.now().year())
    }
}

fn json_response<T: Serialize>(value: &T) -> Response {
    match serde_json::to_value(value) {
        Ok(body) => Response::ok(body),
        Err(e) => Response::from_error(&DataError::Parse(e.to_string())),
    }
}
