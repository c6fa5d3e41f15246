#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the DART statement pipeline.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`Period`](period::Period) and [`periods_in_range`](period::periods_in_range) - Reporting periods
//! - [`extract`](extract::extract) - Field extraction from raw upstream reports
//! - [`Vocabulary`](vocabulary::Vocabulary) - Line-item alias table
//! - [`DisclosureSource`](source::DisclosureSource) - Upstream client trait
//! - [`RecordStore`](store::RecordStore) - Persistence trait and freshness policy
//! - [`Config`](config::Config) - Runtime configuration

/// Time source for refresh stamps.
pub mod clock;
/// Runtime configuration.
pub mod config;
/// Error types for pipeline operations.
pub mod error;
/// Field extraction from raw line items.
pub mod extract;
/// Reporting periods and granularity.
pub mod period;
/// Upstream source trait and raw payload types.
pub mod source;
/// Record store trait and freshness policy.
pub mod store;
/// Core data types (CorpCode, Entity, statements).
pub mod types;
/// Line-item vocabulary.
pub mod vocabulary;

// Re-export commonly used items at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{DataError, Result};
pub use extract::{Extraction, extract, parse_amount};
pub use period::{
    Granularity, Period, PeriodRange, PeriodSpec, Quarter, ReportCode, history_range,
    periods_in_range,
};
pub use source::{DisclosureSource, RawLineItem, ReportPayload};
pub use store::{DEFAULT_FRESHNESS, RecordStore, is_fresh, is_fresh_at};
pub use types::{
    BalanceRecord, Bucket, CashFlowRecord, CorpCode, Entity, FinancialRecord, IncomeRecord,
    LineItem, Statement, StatementKind, covered_entities, operating_margin,
};
pub use vocabulary::Vocabulary;
