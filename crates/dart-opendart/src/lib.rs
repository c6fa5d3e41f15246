#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! OpenDART client for single-company full financial statements.
//!
//! This crate implements [`DisclosureSource`] over the
//! `fnlttSinglAcntAll.json` endpoint, requesting consolidated (`CFS`)
//! statements for one corp code, fiscal year and report code per call.
//!
//! # Example
//!
//! ```no_run
//! use dart_core::{CorpCode, DisclosureSource, Period};
//! use dart_opendart::OpenDartClient;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenDartClient::new(
//!         "your-api-key",
//!         dart_opendart::DEFAULT_BASE_URL,
//!         Duration::from_secs(10),
//!     )?;
//!
//!     let payload = client
//!         .fetch_report(&CorpCode::new("00126380"), Period::annual(2020))
//!         .await?;
//!     println!("status {} with {} line items", payload.status, payload.list.len());
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use dart_core::{Config, CorpCode, DataError, DisclosureSource, Period, ReportPayload, Result};
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

pub use dart_core::config::DEFAULT_BASE_URL;

/// Path of the single-company full financial statement endpoint.
pub const FULL_STATEMENT_ENDPOINT: &str = "fnlttSinglAcntAll.json";

/// Consolidation flag requesting consolidated statements.
pub const CONSOLIDATED: &str = "CFS";

/// OpenDART API client.
///
/// Performs exactly one HTTP request per [`DisclosureSource::fetch_report`]
/// call, with a bounded timeout and no retries. The API key travels as a
/// query parameter and is stripped from every surfaced error.
#[derive(Clone)]
pub struct OpenDartClient {
    client: Client,
    api_key: String,
    endpoint: Url,
}

impl fmt::Debug for OpenDartClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenDartClient")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl OpenDartClient {
    /// Creates a client against `base_url` with the given request timeout.
    ///
    /// # Errors
    /// Returns [`DataError::Configuration`] if the API key is empty, the base
    /// URL does not parse, or the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Configuration(format!("HTTP client: {e}")))?;
        Self::with_client(client, api_key, base_url)
    }

    /// Creates a client from runtime configuration.
    ///
    /// # Errors
    /// See [`OpenDartClient::new`].
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api_key.clone(),
            &config.base_url,
            config.request_timeout,
        )
    }

    /// Creates a client around a pre-configured reqwest client.
    ///
    /// # Errors
    /// See [`OpenDartClient::new`].
    pub fn with_client(
        client: Client,
        api_key: impl Into<String>,
        base_url: &str,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DataError::Configuration("Empty API key".to_string()));
        }

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint_url(base_url)?,
        })
    }

    /// URL requests are sent to, without query parameters.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn endpoint_url(base_url: &str) -> Result<Url> {
    let joined = format!(
        "{}/{FULL_STATEMENT_ENDPOINT}",
        base_url.trim().trim_end_matches('/')
    );
    Url::parse(&joined)
        .map_err(|e| DataError::Configuration(format!("Invalid base URL {base_url}: {e}")))
}

#[async_trait]
impl DisclosureSource for OpenDartClient {
    fn name(&self) -> &str {
        "OpenDART"
    }

    #[instrument(skip(self), fields(corp_code = %corp_code, period = %period))]
    async fn fetch_report(&self, corp_code: &CorpCode, period: Period) -> Result<ReportPayload> {
        let year = period.fiscal_year.to_string();
        let report_code = period.report_code();

        debug!("Requesting report {report_code}");
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("crtfc_key", self.api_key.as_str()),
                ("corp_code", corp_code.as_str()),
                ("bsns_year", year.as_str()),
                ("reprt_code", report_code.as_str()),
                ("fs_div", CONSOLIDATED),
            ])
            .send()
            .await
            .map_err(|e| DataError::UpstreamUnavailable(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Upstream returned HTTP {status}");
            return Err(DataError::UpstreamUnavailable(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DataError::UpstreamUnavailable(e.without_url().to_string()))?;

        let payload: ReportPayload = serde_json::from_str(&body)
            .map_err(|e| DataError::Parse(format!("Failed to parse report: {e}")))?;

        if payload.is_success() {
            debug!("Received {} line items", payload.list.len());
        } else {
            debug!(status = %payload.status, "Upstream rejected request");
        }
        Ok(payload)
    }
}
