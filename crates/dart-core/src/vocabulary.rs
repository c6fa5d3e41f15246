//! Line-item vocabulary used by the field extractor.
//!
//! Upstream identifiers drift between filers and years, so the mapping from
//! target fields to line items is data: per field, a prioritized list of
//! account identifiers followed by display-name aliases. The built-in table
//! covers the vocabulary observed in consolidated filings; a JSON document of
//! the same shape can replace it without a code change.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DataError, Result};
use crate::types::{Bucket, StatementKind};

/// Identifier and display-name aliases for one target field, in priority order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aliases {
    /// Account identifiers, tried first.
    #[serde(default)]
    pub account_ids: Vec<String>,
    /// Display names, tried when no identifier matches. Whitespace is ignored.
    #[serde(default)]
    pub names: Vec<String>,
}

impl Aliases {
    /// Creates aliases from static slices.
    #[must_use]
    pub fn new(account_ids: &[&str], names: &[&str]) -> Self {
        Self {
            account_ids: account_ids.iter().map(|s| (*s).to_string()).collect(),
            names: names.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// A balance sheet detail item and the bucket it is grouped under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubItem {
    /// Bucket the item belongs to.
    pub bucket: Bucket,
    /// Key used in the record's detail map.
    pub label: String,
    /// How to find the item.
    #[serde(flatten)]
    pub aliases: Aliases,
}

/// Income statement vocabulary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeVocabulary {
    /// Section tags that belong to the income statement.
    pub sections: Vec<String>,
    /// Revenue.
    pub revenue: Aliases,
    /// Cost of sales.
    pub cost_of_sales: Aliases,
    /// Operating profit (loss).
    pub operating_profit: Aliases,
    /// Selling, general and administrative expenses.
    pub selling_admin_expenses: Aliases,
}

/// Balance sheet vocabulary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceVocabulary {
    /// Section tags that belong to the balance sheet.
    pub sections: Vec<String>,
    /// Total assets.
    pub total_assets: Aliases,
    /// Current assets.
    pub current_assets: Aliases,
    /// Non-current assets.
    pub non_current_assets: Aliases,
    /// Total liabilities.
    pub total_liabilities: Aliases,
    /// Current liabilities.
    pub current_liabilities: Aliases,
    /// Non-current liabilities.
    pub non_current_liabilities: Aliases,
    /// Total equity.
    pub total_equity: Aliases,
    /// Detail items collected into the record's bucket maps.
    #[serde(default)]
    pub sub_items: Vec<SubItem>,
}

/// Cash flow statement vocabulary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowVocabulary {
    /// Section tags that belong to the cash flow statement.
    pub sections: Vec<String>,
    /// Operating activities.
    pub operating: Aliases,
    /// Investing activities.
    pub investing: Aliases,
    /// Financing activities.
    pub financing: Aliases,
    /// Cash at beginning of period.
    pub beginning_cash: Aliases,
    /// Cash at end of period.
    pub ending_cash: Aliases,
    /// Net increase (decrease) in cash.
    pub net_increase: Aliases,
}

/// Complete extractor vocabulary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Income statement fields.
    pub income: IncomeVocabulary,
    /// Balance sheet fields.
    pub balance: BalanceVocabulary,
    /// Cash flow fields.
    pub cash_flow: CashFlowVocabulary,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Vocabulary {
    /// Vocabulary observed in consolidated (CFS) filings.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            income: IncomeVocabulary {
                sections: vec!["IS".to_string()],
                revenue: Aliases::new(
                    &["ifrs-full_Revenue", "ifrs_Revenue"],
                    &["매출액", "수익(매출액)", "매출", "영업수익"],
                ),
                cost_of_sales: Aliases::new(
                    &["ifrs-full_CostOfSales", "ifrs_CostOfSales"],
                    &["매출원가"],
                ),
                operating_profit: Aliases::new(
                    &["dart_OperatingIncomeLoss"],
                    &["영업이익", "영업이익(손실)"],
                ),
                selling_admin_expenses: Aliases::new(
                    &["dart_TotalSellingGeneralAdministrativeExpenses"],
                    &["판매비와관리비", "판매비와일반관리비"],
                ),
            },
            balance: BalanceVocabulary {
                sections: vec!["BS".to_string()],
                total_assets: Aliases::new(&["ifrs-full_Assets"], &["자산총계"]),
                current_assets: Aliases::new(&["ifrs-full_CurrentAssets"], &["유동자산"]),
                non_current_assets: Aliases::new(
                    &["ifrs-full_NoncurrentAssets", "ifrs-full_Non-currentAssets"],
                    &["비유동자산"],
                ),
                total_liabilities: Aliases::new(&["ifrs-full_Liabilities"], &["부채총계"]),
                current_liabilities: Aliases::new(
                    &["ifrs-full_CurrentLiabilities"],
                    &["유동부채"],
                ),
                non_current_liabilities: Aliases::new(
                    &[
                        "ifrs-full_NoncurrentLiabilities",
                        "ifrs-full_Non-currentLiabilities",
                    ],
                    &["비유동부채"],
                ),
                total_equity: Aliases::new(&["ifrs-full_Equity"], &["자본총계"]),
                sub_items: builtin_sub_items(),
            },
            cash_flow: CashFlowVocabulary {
                sections: vec!["CF".to_string(), "CIS".to_string()],
                operating: Aliases::new(
                    &["ifrs-full_CashFlowsFromUsedInOperatingActivities"],
                    &["영업활동현금흐름", "영업활동으로인한현금흐름"],
                ),
                investing: Aliases::new(
                    &["ifrs-full_CashFlowsFromUsedInInvestingActivities"],
                    &["투자활동현금흐름", "투자활동으로인한현금흐름"],
                ),
                financing: Aliases::new(
                    &["ifrs-full_CashFlowsFromUsedInFinancingActivities"],
                    &["재무활동현금흐름", "재무활동으로인한현금흐름"],
                ),
                beginning_cash: Aliases::new(
                    &[
                        "dart_CashAndCashEquivalentsAtBeginningOfPeriodCf",
                        "ifrs-full_CashAndCashEquivalentsBeginningOfPeriod",
                    ],
                    &["기초현금및현금성자산", "기초의현금및현금성자산"],
                ),
                ending_cash: Aliases::new(
                    &[
                        "dart_CashAndCashEquivalentsAtEndOfPeriodCf",
                        "ifrs-full_CashAndCashEquivalents",
                    ],
                    &["기말현금및현금성자산", "기말의현금및현금성자산"],
                ),
                net_increase: Aliases::new(
                    &["ifrs-full_IncreaseDecreaseInCashAndCashEquivalents"],
                    &[
                        "현금및현금성자산의순증가(감소)",
                        "현금및현금성자산의증가(감소)",
                    ],
                ),
            },
        }
    }

    /// Parses a vocabulary from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DataError::Configuration(format!("vocabulary: {e}")))
    }

    /// Loads a vocabulary from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DataError::Configuration(format!("vocabulary {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Section tags for a statement kind.
    #[must_use]
    pub fn sections(&self, kind: StatementKind) -> &[String] {
        match kind {
            StatementKind::Income => &self.income.sections,
            StatementKind::Balance => &self.balance.sections,
            StatementKind::CashFlow => &self.cash_flow.sections,
        }
    }
}

type SubItemRow = (Bucket, &'static str, &'static [&'static str], &'static [&'static str]);

const SUB_ITEMS: &[SubItemRow] = &[
    (
        Bucket::CurrentAssets,
        "cash_and_cash_equivalents",
        &["ifrs-full_CashAndCashEquivalents"],
        &["현금및현금성자산"],
    ),
    (
        Bucket::CurrentAssets,
        "trade_receivables",
        &["ifrs-full_TradeAndOtherCurrentReceivables"],
        &["매출채권", "매출채권및기타채권"],
    ),
    (
        Bucket::CurrentAssets,
        "inventories",
        &["ifrs-full_Inventories"],
        &["재고자산"],
    ),
    (
        Bucket::NonCurrentAssets,
        "property_plant_and_equipment",
        &["ifrs-full_PropertyPlantAndEquipment"],
        &["유형자산"],
    ),
    (
        Bucket::NonCurrentAssets,
        "intangible_assets",
        &["ifrs-full_IntangibleAssetsOtherThanGoodwill"],
        &["무형자산"],
    ),
    (
        Bucket::CurrentLiabilities,
        "trade_payables",
        &["ifrs-full_TradeAndOtherCurrentPayables"],
        &["매입채무", "매입채무및기타채무"],
    ),
    (
        Bucket::CurrentLiabilities,
        "short_term_borrowings",
        &["ifrs-full_ShorttermBorrowings", "ifrs-full_CurrentBorrowings"],
        &["단기차입금"],
    ),
    (
        Bucket::NonCurrentLiabilities,
        "long_term_borrowings",
        &[
            "ifrs-full_LongtermBorrowings",
            "ifrs-full_NoncurrentBorrowings",
            "ifrs-full_Non-currentBorrowings",
        ],
        &["장기차입금"],
    ),
    (
        Bucket::Equity,
        "issued_capital",
        &["ifrs-full_IssuedCapital"],
        &["자본금"],
    ),
    (
        Bucket::Equity,
        "retained_earnings",
        &["ifrs-full_RetainedEarnings"],
        &["이익잉여금", "이익잉여금(결손금)"],
    ),
];

fn builtin_sub_items() -> Vec<SubItem> {
    SUB_ITEMS
        .iter()
        .map(|&(bucket, label, ids, names)| SubItem {
            bucket,
            label: label.to_string(),
            aliases: Aliases::new(ids, names),
        })
        .collect()
}
