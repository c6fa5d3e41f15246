//! Core data types for normalized financial statements.
//!
//! This module defines the fundamental data structures:
//!
//! - [`CorpCode`] - Upstream-assigned entity identifier
//! - [`Entity`] - A covered company
//! - [`StatementKind`] - Income, balance sheet or cash flow
//! - [`IncomeRecord`], [`BalanceRecord`], [`CashFlowRecord`] - Normalized statements
//! - [`FinancialRecord`] - A statement stored under its natural key

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;
use crate::period::Period;

/// Upstream-assigned company identifier (eight digits, e.g. `00126380`).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorpCode(String);

impl CorpCode {
    /// Creates a corp code, trimming surrounding whitespace.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_string())
    }

    /// Returns the corp code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorpCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CorpCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A covered company.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Upstream identifier.
    pub corp_code: CorpCode,
    /// Display name.
    pub name: String,
    /// Exchange ticker.
    pub stock_code: Option<String>,
    /// Sector label.
    pub sector: Option<String>,
}

impl Entity {
    /// Creates an entity with required fields.
    #[must_use]
    pub fn new(corp_code: impl Into<CorpCode>, name: impl Into<String>) -> Self {
        Self {
            corp_code: corp_code.into(),
            name: name.into(),
            stock_code: None,
            sector: None,
        }
    }

    /// Sets the exchange ticker.
    #[must_use]
    pub fn with_stock_code(mut self, stock_code: impl Into<String>) -> Self {
        self.stock_code = Some(stock_code.into());
        self
    }

    /// Sets the sector label.
    #[must_use]
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

/// The static list of covered companies, largest KOSPI issuers by market cap.
#[must_use]
pub fn covered_entities() -> Vec<Entity> {
    [
        ("00126380", "Samsung Electronics", "005930", "Electronics"),
        ("00164779", "SK hynix", "000660", "Electronics"),
        ("00164742", "LG Energy Solution", "373220", "Electronics"),
        ("00113399", "Samsung Biologics", "207940", "Pharmaceuticals"),
        ("00165890", "Hyundai Motor", "005380", "Automotive"),
        ("00164529", "Celltrion", "068270", "Pharmaceuticals"),
        ("00167799", "Kia", "000270", "Automotive"),
        ("00159645", "POSCO Holdings", "005490", "Steel"),
        ("00356370", "KB Financial Group", "105560", "Financials"),
        ("00168099", "Shinhan Financial Group", "055550", "Financials"),
    ]
    .into_iter()
    .map(|(code, name, ticker, sector)| {
        Entity::new(code, name)
            .with_stock_code(ticker)
            .with_sector(sector)
    })
    .collect()
}

/// Which financial statement a record holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    /// Income statement.
    Income,
    /// Balance sheet (statement of financial position).
    Balance,
    /// Cash flow statement.
    CashFlow,
}

impl StatementKind {
    /// All statement kinds.
    pub const ALL: [Self; 3] = [Self::Income, Self::Balance, Self::CashFlow];

    /// Stable string used for storage keys and query parameters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Balance => "balance",
            Self::CashFlow => "cashflow",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "balance" => Ok(Self::Balance),
            "cashflow" | "cash_flow" => Ok(Self::CashFlow),
            other => Err(DataError::InvalidParameter(format!(
                "unknown statement kind: {other}"
            ))),
        }
    }
}

/// Operating margin in percent, rounded to two decimals.
///
/// Defined as 0 when revenue is zero or negative.
#[must_use]
pub fn operating_margin(operating_profit: i64, revenue: i64) -> f64 {
    if revenue <= 0 {
        return 0.0;
    }
    let margin = operating_profit as f64 / revenue as f64 * 100.0;
    (margin * 100.0).round() / 100.0
}

/// Normalized income statement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeRecord {
    /// Revenue.
    pub revenue: i64,
    /// Cost of sales.
    pub cost_of_sales: i64,
    /// Operating profit (loss).
    pub operating_profit: i64,
    /// Selling, general and administrative expenses.
    pub selling_admin_expenses: i64,
    /// Operating profit / revenue * 100, see [`operating_margin`].
    pub operating_margin: f64,
}

impl IncomeRecord {
    /// Creates an income record, deriving the operating margin.
    #[must_use]
    pub fn new(
        revenue: i64,
        cost_of_sales: i64,
        operating_profit: i64,
        selling_admin_expenses: i64,
    ) -> Self {
        Self {
            revenue,
            cost_of_sales,
            operating_profit,
            selling_admin_expenses,
            operating_margin: operating_margin(operating_profit, revenue),
        }
    }
}

/// A named balance sheet sub-line-item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Current-period amount.
    pub amount: i64,
    /// Upstream account identifier the amount came from.
    pub account_id: String,
}

/// Where a balance sheet sub-item is grouped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Current assets.
    CurrentAssets,
    /// Non-current assets.
    NonCurrentAssets,
    /// Current liabilities.
    CurrentLiabilities,
    /// Non-current liabilities.
    NonCurrentLiabilities,
    /// Equity components.
    Equity,
}

/// Normalized balance sheet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Total assets; derived from current + non-current when upstream omits it.
    pub total_assets: i64,
    /// Current assets.
    pub current_assets: i64,
    /// Non-current assets.
    pub non_current_assets: i64,
    /// Total liabilities; derived from current + non-current when upstream omits it.
    pub total_liabilities: i64,
    /// Current liabilities.
    pub current_liabilities: i64,
    /// Non-current liabilities.
    pub non_current_liabilities: i64,
    /// Total equity.
    pub total_equity: i64,
    /// Current asset detail keyed by label.
    pub assets_current: BTreeMap<String, LineItem>,
    /// Non-current asset detail keyed by label.
    pub assets_non_current: BTreeMap<String, LineItem>,
    /// Current liability detail keyed by label.
    pub liabilities_current: BTreeMap<String, LineItem>,
    /// Non-current liability detail keyed by label.
    pub liabilities_non_current: BTreeMap<String, LineItem>,
    /// Equity components keyed by label.
    pub equity_items: BTreeMap<String, LineItem>,
}

impl BalanceRecord {
    /// Mutable access to the detail map for a bucket.
    pub fn bucket_mut(&mut self, bucket: Bucket) -> &mut BTreeMap<String, LineItem> {
        match bucket {
            Bucket::CurrentAssets => &mut self.assets_current,
            Bucket::NonCurrentAssets => &mut self.assets_non_current,
            Bucket::CurrentLiabilities => &mut self.liabilities_current,
            Bucket::NonCurrentLiabilities => &mut self.liabilities_non_current,
            Bucket::Equity => &mut self.equity_items,
        }
    }

    /// Detail map for a bucket.
    #[must_use]
    pub const fn bucket(&self, bucket: Bucket) -> &BTreeMap<String, LineItem> {
        match bucket {
            Bucket::CurrentAssets => &self.assets_current,
            Bucket::NonCurrentAssets => &self.assets_non_current,
            Bucket::CurrentLiabilities => &self.liabilities_current,
            Bucket::NonCurrentLiabilities => &self.liabilities_non_current,
            Bucket::Equity => &self.equity_items,
        }
    }
}

/// Normalized cash flow statement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowRecord {
    /// Cash flow from operating activities.
    pub operating_cash_flow: i64,
    /// Cash flow from investing activities.
    pub investing_cash_flow: i64,
    /// Cash flow from financing activities.
    pub financing_cash_flow: i64,
    /// Cash at beginning of period.
    pub beginning_cash: Option<i64>,
    /// Cash at end of period, as reported.
    pub ending_cash: Option<i64>,
    /// Net increase (decrease) in cash, as reported.
    pub net_increase: Option<i64>,
    /// beginning + operating + investing + financing, saturating at the
    /// `i64` bounds.
    pub calculated_ending: i64,
}

impl CashFlowRecord {
    /// Creates a cash flow record, deriving `calculated_ending`.
    #[must_use]
    pub fn new(
        operating_cash_flow: i64,
        investing_cash_flow: i64,
        financing_cash_flow: i64,
        beginning_cash: Option<i64>,
        ending_cash: Option<i64>,
        net_increase: Option<i64>,
    ) -> Self {
        let calculated_ending = beginning_cash
            .unwrap_or(0)
            .saturating_add(operating_cash_flow)
            .saturating_add(investing_cash_flow)
            .saturating_add(financing_cash_flow);
        Self {
            operating_cash_flow,
            investing_cash_flow,
            financing_cash_flow,
            beginning_cash,
            ending_cash,
            net_increase,
            calculated_ending,
        }
    }

    /// Reported ending cash minus the calculated one.
    ///
    /// Non-zero gaps usually come from FX effects on cash; nothing enforces zero.
    /// `None` without a reported ending balance or when the gap overflows.
    #[must_use]
    pub fn reconciliation_gap(&self) -> Option<i64> {
        self.ending_cash
            .and_then(|ending| ending.checked_sub(self.calculated_ending))
    }
}

/// One normalized statement of any kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Statement {
    /// Income statement.
    Income(IncomeRecord),
    /// Balance sheet.
    Balance(BalanceRecord),
    /// Cash flow statement.
    #[serde(rename = "cashflow")]
    CashFlow(CashFlowRecord),
}

impl Statement {
    /// Kind of this statement.
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        match self {
            Self::Income(_) => StatementKind::Income,
            Self::Balance(_) => StatementKind::Balance,
            Self::CashFlow(_) => StatementKind::CashFlow,
        }
    }
}

/// A statement stored under its natural key (corp code, period).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    /// Entity the statement belongs to.
    pub corp_code: CorpCode,
    /// Reporting period.
    pub period: Period,
    /// Normalized statement.
    pub statement: Statement,
    /// When the store last wrote this record.
    pub last_refreshed: DateTime<Utc>,
}

impl FinancialRecord {
    /// Kind of the contained statement.
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.statement.kind()
    }

    /// Returns the income statement, if this is one.
    #[must_use]
    pub const fn as_income(&self) -> Option<&IncomeRecord> {
        match &self.statement {
            Statement::Income(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the balance sheet, if this is one.
    #[must_use]
    pub const fn as_balance(&self) -> Option<&BalanceRecord> {
        match &self.statement {
            Statement::Balance(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the cash flow statement, if this is one.
    #[must_use]
    pub const fn as_cash_flow(&self) -> Option<&CashFlowRecord> {
        match &self.statement {
            Statement::CashFlow(r) => Some(r),
            _ => None,
        }
    }
}
