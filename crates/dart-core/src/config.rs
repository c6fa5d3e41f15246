//! Pipeline configuration.
//!
//! [`Config`] is built once at startup and passed to the pipeline and the
//! façade. Required values are the upstream credential and the store
//! location; everything else has a default matching the observed service.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DataError, Result};
use crate::period;
use crate::store::DEFAULT_FRESHNESS;
use crate::vocabulary::Vocabulary;

/// Default upstream API root.
pub const DEFAULT_BASE_URL: &str = "https://opendart.fss.or.kr/api";

/// Default upstream request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between consecutive upstream calls in a range fetch.
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

/// Default number of past years in a history range.
pub const DEFAULT_HISTORY_YEARS: u32 = 10;

/// Runtime configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Upstream API key. Never logged.
    pub api_key: String,
    /// Location of the SQLite database.
    pub database_path: PathBuf,
    /// Upstream API root, without trailing slash.
    pub base_url: String,
    /// How long a stored record may be served without refetching.
    pub freshness: Duration,
    /// Upstream request timeout.
    pub request_timeout: Duration,
    /// Fixed delay between consecutive upstream calls.
    pub pacing: Duration,
    /// History ranges span `current_year - history_years ..= current_year`.
    pub history_years: u32,
    /// Optional JSON file replacing the built-in vocabulary.
    pub vocabulary_path: Option<PathBuf>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"[REDACTED]")
            .field("database_path", &self.database_path)
            .field("base_url", &self.base_url)
            .field("freshness", &self.freshness)
            .field("request_timeout", &self.request_timeout)
            .field("pacing", &self.pacing)
            .field("history_years", &self.history_years)
            .field("vocabulary_path", &self.vocabulary_path)
            .finish()
    }
}

impl Config {
    /// Creates a configuration with defaults for everything but the
    /// required values.
    #[must_use]
    pub fn new(api_key: impl Into<String>, database_path: impl Into<PathBuf>) -> Self {
        Self {
            api_key: api_key.into(),
            database_path: database_path.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            freshness: DEFAULT_FRESHNESS,
            request_timeout: DEFAULT_TIMEOUT,
            pacing: DEFAULT_PACING,
            history_years: DEFAULT_HISTORY_YEARS,
            vocabulary_path: None,
        }
    }

    /// Loads configuration from the process environment, reading a `.env`
    /// file first if one exists.
    ///
    /// | variable               | default                          |
    /// |------------------------|----------------------------------|
    /// | `DART_API_KEY`         | required                         |
    /// | `DART_DATABASE_PATH`   | required                         |
    /// | `DART_BASE_URL`        | `https://opendart.fss.or.kr/api` |
    /// | `DART_CACHE_HOURS`     | 24                               |
    /// | `DART_TIMEOUT_SECS`    | 10                               |
    /// | `DART_PACING_MS`       | 500                              |
    /// | `DART_HISTORY_YEARS`   | 10                               |
    /// | `DART_VOCABULARY_PATH` | built-in vocabulary              |
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("DART_API_KEY")
            .ok_or_else(|| DataError::Configuration("DART_API_KEY not set".to_string()))?;
        let database_path = get("DART_DATABASE_PATH")
            .ok_or_else(|| DataError::Configuration("DART_DATABASE_PATH not set".to_string()))?;

        let mut config = Self::new(api_key.trim(), database_path.trim());

        if let Some(base_url) = get("DART_BASE_URL") {
            config.base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        if let Some(hours) = parse_var::<u64>(&get, "DART_CACHE_HOURS")? {
            let secs = hours.checked_mul(60 * 60).ok_or_else(|| {
                DataError::Configuration(format!("DART_CACHE_HOURS out of range: {hours}"))
            })?;
            config.freshness = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&get, "DART_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&get, "DART_PACING_MS")? {
            config.pacing = Duration::from_millis(ms);
        }
        if let Some(years) = parse_var::<u32>(&get, "DART_HISTORY_YEARS")? {
            config.history_years = years;
        }
        config.vocabulary_path = get("DART_VOCABULARY_PATH").map(PathBuf::from);

        Ok(config)
    }

    /// First and last fiscal year of the default history range.
    #[must_use]
    pub fn history_range(&self, current_year: i32) -> (i32, i32) {
        period::history_range(self.history_years, current_year)
    }

    /// The configured vocabulary, or the built-in one.
    pub fn vocabulary(&self) -> Result<Vocabulary> {
        match &self.vocabulary_path {
            Some(path) => Vocabulary::from_path(path),
            None => Ok(Vocabulary::builtin()),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| DataError::Configuration(format!("Invalid {key}: {raw}")))
        })
        .transpose()
}
