//! Persistent record store trait and the freshness policy.
//!
//! This module defines the [`RecordStore`] trait, keyed by statement kind and
//! the natural key (corp code, period), and [`is_fresh`] which decides whether
//! a stored record may be served without going upstream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::{
    error::Result,
    period::Period,
    types::{CorpCode, Entity, FinancialRecord, Statement, StatementKind},
};

/// Freshness threshold of the observed system.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(24 * 60 * 60);

/// Trait for persisting normalized statements.
///
/// Every method reports connectivity or SQL failures as
/// [`DataError::StoreUnavailable`](crate::DataError::StoreUnavailable), which
/// is distinct from a missing key (`Ok(None)`).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Creates tables if absent. Safe to call repeatedly.
    async fn ensure_schema(&self) -> Result<()>;

    /// Inserts or refreshes the covered entity list.
    async fn seed_entities(&self, entities: &[Entity]) -> Result<()>;

    /// Looks up a covered entity.
    async fn entity(&self, corp_code: &CorpCode) -> Result<Option<Entity>>;

    /// Point lookup by natural key.
    async fn get(
        &self,
        kind: StatementKind,
        corp_code: &CorpCode,
        period: Period,
    ) -> Result<Option<FinancialRecord>>;

    /// All records of a kind for an entity, ordered by year then quarter,
    /// annual first.
    async fn get_all(&self, kind: StatementKind, corp_code: &CorpCode)
    -> Result<Vec<FinancialRecord>>;

    /// Inserts or fully replaces the record under its natural key and stamps
    /// `last_refreshed` with the store's current time. Atomic per key.
    ///
    /// Returns the record as stored.
    async fn upsert(
        &self,
        corp_code: &CorpCode,
        period: Period,
        statement: Statement,
    ) -> Result<FinancialRecord>;
}

/// Returns true when `now - record.last_refreshed < threshold`.
///
/// A record exactly `threshold` old is stale.
#[must_use]
pub fn is_fresh_at(record: &FinancialRecord, threshold: Duration, now: DateTime<Utc>) -> bool {
    let age = now.signed_duration_since(record.last_refreshed);
    age < chrono::TimeDelta::from_std(threshold).unwrap_or(chrono::TimeDelta::MAX)
}

/// [`is_fresh_at`] against the wall clock.
#[must_use]
pub fn is_fresh(record: &FinancialRecord, threshold: Duration) -> bool {
    is_fresh_at(record, threshold, Utc::now())
}
