//! Error types for pipeline operations.
//!
//! This module defines [`DataError`] which covers every failure the
//! fetch-parse-cache pipeline can surface: configuration, upstream transport,
//! upstream rejection, extraction and persistence.

use thiserror::Error;

use crate::types::StatementKind;

/// Errors that can occur while fetching, extracting or caching statements.
#[derive(Error, Debug)]
pub enum DataError {
    /// A required credential, location or tunable is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested corp code is not one of the covered entities.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Network failure, timeout or non-success HTTP status from upstream.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream answered, but the payload status signals a rejected request.
    #[error("Upstream rejected request with status {status}: {message}")]
    UpstreamRejected {
        /// Status code reported in the payload (e.g. "013").
        status: String,
        /// Message reported alongside the status.
        message: String,
    },

    /// No line items matched the statement section filter.
    #[error("No {kind} line items in upstream report")]
    ExtractionIncomplete {
        /// Statement kind that was being extracted.
        kind: StatementKind,
    },

    /// Nothing could be produced for the requested key.
    #[error("No data for {corp_code} in {period}")]
    NoData {
        /// Corp code that was requested.
        corp_code: String,
        /// Human-readable period or period range.
        period: String,
    },

    /// The persistence layer could not be reached or failed mid-operation.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Malformed upstream or stored payload.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl DataError {
    /// Returns true when the error means "there is nothing to serve" rather
    /// than a fault in the system.
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        matches!(
            self,
            Self::EntityNotFound(_)
                | Self::UpstreamRejected { .. }
                | Self::ExtractionIncomplete { .. }
                | Self::NoData { .. }
        )
    }

    /// Returns true when the failure is scoped to a single period and a range
    /// fetch may continue with the next one.
    #[must_use]
    pub const fn is_period_local(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable(_)
                | Self::UpstreamRejected { .. }
                | Self::ExtractionIncomplete { .. }
                | Self::NoData { .. }
                | Self::Parse(_)
        )
    }
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;
