//! Upstream disclosure source trait and its raw payload types.
//!
//! This module defines the [`DisclosureSource`] trait implemented by upstream
//! clients, and [`ReportPayload`] / [`RawLineItem`], the flat line-item list
//! every single-company full-statement report is delivered as.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::{error::Result, period::Period, types::CorpCode};

/// Payload status the upstream uses for a successful request.
pub const STATUS_OK: &str = "000";

/// One raw line item as delivered by upstream.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLineItem {
    /// Statement section tag ("IS", "BS", "CF", "CIS", ...).
    #[serde(rename = "sj_div", default)]
    pub section: String,
    /// Line-item identifier, e.g. `ifrs-full_Revenue`.
    #[serde(default)]
    pub account_id: String,
    /// Line-item display name.
    #[serde(rename = "account_nm", default)]
    pub account_name: String,
    /// Current-period amount, digits with thousands separators.
    #[serde(rename = "thstrm_amount", default)]
    pub current_amount: Option<String>,
}

impl RawLineItem {
    /// Creates a line item.
    #[must_use]
    pub fn new(
        section: impl Into<String>,
        account_id: impl Into<String>,
        account_name: impl Into<String>,
        current_amount: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            account_id: account_id.into(),
            account_name: account_name.into(),
            current_amount: Some(current_amount.into()),
        }
    }
}

/// Response body of a single-company full financial statement request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPayload {
    /// Top-level status code; anything but [`STATUS_OK`] is a rejection.
    pub status: String,
    /// Message accompanying the status.
    #[serde(default)]
    pub message: Option<String>,
    /// Flat list of line items across all statements.
    #[serde(default)]
    pub list: Vec<RawLineItem>,
}

impl ReportPayload {
    /// A successful payload carrying `list`.
    #[must_use]
    pub fn ok(list: Vec<RawLineItem>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            message: Some("정상".to_string()),
            list,
        }
    }

    /// A rejected payload.
    #[must_use]
    pub fn rejected(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: Some(message.into()),
            list: Vec::new(),
        }
    }

    /// Returns true when the status signals success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Upstream source of raw financial statement reports.
///
/// Implementations perform exactly one request per call and never retry.
/// Transport failures, timeouts and non-success HTTP statuses are reported as
/// [`DataError::UpstreamUnavailable`](crate::DataError::UpstreamUnavailable);
/// a payload with a rejecting status is still returned as `Ok` and left to
/// the extractor to interpret.
#[async_trait]
pub trait DisclosureSource: Send + Sync + Debug {
    /// Returns the name of this source.
    fn name(&self) -> &str;

    /// Fetches the consolidated report filed by `corp_code` for `period`.
    async fn fetch_report(&self, corp_code: &CorpCode, period: Period) -> Result<ReportPayload>;
}
