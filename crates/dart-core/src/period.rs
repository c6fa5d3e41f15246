//! Reporting periods and their upstream report codes.
//!
//! This module defines [`Period`] (a fiscal year, optionally scoped to a
//! quarter), the [`ReportCode`] each period is filed under, and
//! [`periods_in_range`] for expanding a span of years into periods.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DataError;

/// Granularity of a multi-period request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One period per fiscal year (the annual filing).
    #[default]
    Annual,
    /// Three periods per fiscal year (Q1, half-year, Q3 filings).
    Quarterly,
}

impl Granularity {
    /// Parse a granularity from a query value ("annual" / "quarterly").
    pub fn parse(s: &str) -> Result<Self, DataError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual" | "a" => Ok(Self::Annual),
            "quarterly" | "q" => Ok(Self::Quarterly),
            other => Err(DataError::InvalidParameter(format!(
                "unknown granularity: {other}"
            ))),
        }
    }
}

/// Quarter scope of an interim filing.
///
/// Interim reports are cumulative and filed independently, so each quarter is
/// its own row rather than something derived from another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Quarter {
    /// First-quarter report.
    First,
    /// Half-year report (second quarter).
    Half,
    /// Third-quarter report.
    Third,
}

impl Quarter {
    /// All interim quarters in filing order.
    pub const ALL: [Self; 3] = [Self::First, Self::Half, Self::Third];

    /// Quarter number, 1 through 3.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Half => 2,
            Self::Third => 3,
        }
    }

    /// Build a quarter from its number.
    #[must_use]
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::First),
            2 => Some(Self::Half),
            3 => Some(Self::Third),
            _ => None,
        }
    }
}

impl From<Quarter> for u8 {
    fn from(q: Quarter) -> Self {
        q.number()
    }
}

impl TryFrom<u8> for Quarter {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::from_number(n).ok_or_else(|| format!("quarter must be 1-3, got {n}"))
    }
}

/// Upstream report type code (`reprt_code`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportCode {
    /// Annual business report, `11011`.
    Annual,
    /// Half-year report, `11012`.
    HalfYear,
    /// First-quarter report, `11013`.
    FirstQuarter,
    /// Third-quarter report, `11014`.
    ThirdQuarter,
}

impl ReportCode {
    /// Wire value sent as `reprt_code`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Annual => "11011",
            Self::HalfYear => "11012",
            Self::FirstQuarter => "11013",
            Self::ThirdQuarter => "11014",
        }
    }
}

impl fmt::Display for ReportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reporting period: a fiscal year and an optional interim quarter.
///
/// Ordering is by year, then annual before Q1 < Q2 < Q3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Fiscal (business) year.
    pub fiscal_year: i32,
    /// Interim quarter; `None` is the full annual period.
    pub quarter: Option<Quarter>,
}

impl Period {
    /// The full annual period for a year.
    #[must_use]
    pub const fn annual(fiscal_year: i32) -> Self {
        Self {
            fiscal_year,
            quarter: None,
        }
    }

    /// An interim period for a year.
    #[must_use]
    pub const fn quarterly(fiscal_year: i32, quarter: Quarter) -> Self {
        Self {
            fiscal_year,
            quarter: Some(quarter),
        }
    }

    /// Returns true for the full annual period.
    #[must_use]
    pub const fn is_annual(&self) -> bool {
        self.quarter.is_none()
    }

    /// Report code this period is filed under.
    #[must_use]
    pub const fn report_code(&self) -> ReportCode {
        match self.quarter {
            None => ReportCode::Annual,
            Some(Quarter::First) => ReportCode::FirstQuarter,
            Some(Quarter::Half) => ReportCode::HalfYear,
            Some(Quarter::Third) => ReportCode::ThirdQuarter,
        }
    }

    /// Human-readable label, e.g. `2020` or `2020 Q1`.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quarter {
            None => write!(f, "{}", self.fiscal_year),
            Some(q) => write!(f, "{} Q{}", self.fiscal_year, q.number()),
        }
    }
}

/// Lazy, finite sequence of periods produced by [`periods_in_range`].
///
/// Cloning the range restarts it from wherever the clone was taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeriodRange {
    next_year: i32,
    end_year: i32,
    granularity: Granularity,
    next_quarter: usize,
}

impl Iterator for PeriodRange {
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        if self.next_year > self.end_year {
            return None;
        }
        let year = self.next_year;
        match self.granularity {
            Granularity::Annual => {
                self.next_year += 1;
                Some(Period::annual(year))
            }
            Granularity::Quarterly => {
                let quarter = Quarter::ALL[self.next_quarter];
                self.next_quarter += 1;
                if self.next_quarter == Quarter::ALL.len() {
                    self.next_quarter = 0;
                    self.next_year += 1;
                }
                Some(Period::quarterly(year, quarter))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.next_year > self.end_year {
            return (0, Some(0));
        }
        let years = (self.end_year - self.next_year) as usize + 1;
        let n = match self.granularity {
            Granularity::Annual => years,
            Granularity::Quarterly => years * Quarter::ALL.len() - self.next_quarter,
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for PeriodRange {}

/// Expand `start_year..=end_year` into periods of the given granularity.
///
/// Quarterly expands each year into Q1, half-year and Q3; the annual filing
/// only ever appears under [`Granularity::Annual`]. Empty when `start_year`
/// is after `end_year`.
#[must_use]
pub const fn periods_in_range(
    start_year: i32,
    end_year: i32,
    granularity: Granularity,
) -> PeriodRange {
    PeriodRange {
        next_year: start_year,
        end_year,
        granularity,
        next_quarter: 0,
    }
}

/// First and last fiscal year of a history window: `current_year - years`
/// through `current_year`.
#[must_use]
pub fn history_range(years: u32, current_year: i32) -> (i32, i32) {
    let years = i32::try_from(years).unwrap_or(i32::MAX);
    (current_year.saturating_sub(years), current_year)
}

/// What a caller asks the pipeline for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodSpec {
    /// Exactly one period.
    Single(Period),
    /// A bounded span of fiscal years at a granularity.
    Range {
        /// First fiscal year, inclusive.
        start_year: i32,
        /// Last fiscal year, inclusive.
        end_year: i32,
        /// Annual or quarterly expansion.
        granularity: Granularity,
    },
}

impl PeriodSpec {
    /// Periods covered, in ascending order.
    #[must_use]
    pub fn periods(&self) -> Vec<Period> {
        match *self {
            Self::Single(period) => vec![period],
            Self::Range {
                start_year,
                end_year,
                granularity,
            } => periods_in_range(start_year, end_year, granularity).collect(),
        }
    }
}

impl fmt::Display for PeriodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(period) => write!(f, "{period}"),
            Self::Range {
                start_year,
                end_year,
                granularity,
            } => write!(f, "{start_year}-{end_year} ({granularity:?})"),
        }
    }
}
