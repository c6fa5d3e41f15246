//! Field extraction from raw upstream reports.
//!
//! Turns the flat line-item list of a [`ReportPayload`] into a normalized
//! [`Statement`]. Each target field is looked up by account identifier first
//! and by display name second, following the [`Vocabulary`]. Individual
//! missing fields default to zero and are reported in
//! [`Extraction::missing`]; only a rejected payload or an empty section is an
//! error.

use std::collections::HashMap;
use tracing::debug;

use crate::{
    error::{DataError, Result},
    source::{RawLineItem, ReportPayload},
    types::{
        BalanceRecord, CashFlowRecord, IncomeRecord, LineItem, Statement, StatementKind,
    },
    vocabulary::{Aliases, BalanceVocabulary, CashFlowVocabulary, IncomeVocabulary, Vocabulary},
};

/// Result of extracting one statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    /// The normalized statement, with absent fields set to zero.
    pub statement: Statement,
    /// Target fields the upstream report did not carry.
    pub missing: Vec<&'static str>,
}

impl Extraction {
    /// Returns true when every target field was present upstream.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Extracts a statement of `kind` from an upstream payload.
///
/// # Errors
///
/// - [`DataError::UpstreamRejected`] when the payload status is not success.
/// - [`DataError::ExtractionIncomplete`] when no line item carries one of the
///   section tags for `kind`.
/// - [`DataError::Parse`] when a derived total does not fit in an `i64`.
pub fn extract(
    kind: StatementKind,
    payload: &ReportPayload,
    vocabulary: &Vocabulary,
) -> Result<Extraction> {
    if !payload.is_success() {
        return Err(DataError::UpstreamRejected {
            status: payload.status.clone(),
            message: payload.message.clone().unwrap_or_default(),
        });
    }

    let sections = vocabulary.sections(kind);
    let items: Vec<&RawLineItem> = payload
        .list
        .iter()
        .filter(|item| sections.iter().any(|s| s == item.section.trim()))
        .collect();

    if items.is_empty() {
        return Err(DataError::ExtractionIncomplete { kind });
    }

    let mut fields = Fields::new(&items);
    let statement = match kind {
        StatementKind::Income => Statement::Income(extract_income(&mut fields, &vocabulary.income)),
        StatementKind::Balance => {
            Statement::Balance(extract_balance(&mut fields, &vocabulary.balance)?)
        }
        StatementKind::CashFlow => {
            Statement::CashFlow(extract_cash_flow(&mut fields, &vocabulary.cash_flow))
        }
    };

    if !fields.missing.is_empty() {
        debug!(%kind, missing = ?fields.missing, "Upstream report lacks some fields");
    }

    Ok(Extraction {
        statement,
        missing: fields.missing,
    })
}

/// Parses an upstream amount string.
///
/// Accepts thousands separators, surrounding whitespace, a leading sign and
/// accounting-style parentheses for negatives. Returns `None` for empty
/// strings, a lone `-`, a signed amount inside parentheses, and anything that
/// does not parse as an `i64`.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let digits: String = body
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if digits.is_empty() || digits == "-" {
        return None;
    }
    if negative && digits.starts_with(['-', '+']) {
        return None;
    }

    let value: i64 = digits.parse().ok()?;
    if negative { value.checked_neg() } else { Some(value) }
}

fn normalize_name(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Lookup tables over the section-filtered items, recording absent fields.
struct Fields<'a> {
    by_id: HashMap<&'a str, &'a RawLineItem>,
    by_name: HashMap<String, &'a RawLineItem>,
    missing: Vec<&'static str>,
}

impl<'a> Fields<'a> {
    fn new(items: &[&'a RawLineItem]) -> Self {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        // first occurrence wins
        for item in items {
            let id = item.account_id.trim();
            if !id.is_empty() {
                by_id.entry(id).or_insert(*item);
            }
            by_name
                .entry(normalize_name(&item.account_name))
                .or_insert(*item);
        }
        Self {
            by_id,
            by_name,
            missing: Vec::new(),
        }
    }

    /// Finds the highest-priority item with a usable amount.
    fn find(&self, aliases: &Aliases) -> Option<(&'a RawLineItem, i64)> {
        let by_id = aliases
            .account_ids
            .iter()
            .filter_map(|id| self.by_id.get(id.as_str()));
        let by_name = aliases
            .names
            .iter()
            .filter_map(|name| self.by_name.get(&normalize_name(name)));

        by_id.chain(by_name).find_map(|item| {
            item.current_amount
                .as_deref()
                .and_then(parse_amount)
                .map(|amount| (*item, amount))
        })
    }

    /// Amount of a field, recording it as missing when absent.
    fn take(&mut self, field: &'static str, aliases: &Aliases) -> Option<i64> {
        let amount = self.find(aliases).map(|(_, amount)| amount);
        if amount.is_none() {
            self.missing.push(field);
        }
        amount
    }

    /// Like [`Fields::take`], defaulting to zero.
    fn value(&mut self, field: &'static str, aliases: &Aliases) -> i64 {
        self.take(field, aliases).unwrap_or(0)
    }
}

fn extract_income(fields: &mut Fields<'_>, vocab: &IncomeVocabulary) -> IncomeRecord {
    IncomeRecord::new(
        fields.value("revenue", &vocab.revenue),
        fields.value("cost_of_sales", &vocab.cost_of_sales),
        fields.value("operating_profit", &vocab.operating_profit),
        fields.value("selling_admin_expenses", &vocab.selling_admin_expenses),
    )
}

/// A reported total, or current + non-current when the total is absent or a
/// zero that contradicts non-zero parts.
fn derive_total(
    field: &str,
    total: Option<i64>,
    current: i64,
    non_current: i64,
) -> Result<i64> {
    match total {
        Some(total) if total != 0 => Ok(total),
        _ => current
            .checked_add(non_current)
            .ok_or_else(|| DataError::Parse(format!("{field} overflows"))),
    }
}

fn extract_balance(fields: &mut Fields<'_>, vocab: &BalanceVocabulary) -> Result<BalanceRecord> {
    let current_assets = fields.value("current_assets", &vocab.current_assets);
    let non_current_assets = fields.value("non_current_assets", &vocab.non_current_assets);
    let total_assets = fields.take("total_assets", &vocab.total_assets);

    let current_liabilities = fields.value("current_liabilities", &vocab.current_liabilities);
    let non_current_liabilities =
        fields.value("non_current_liabilities", &vocab.non_current_liabilities);
    let total_liabilities = fields.take("total_liabilities", &vocab.total_liabilities);

    let mut record = BalanceRecord {
        total_assets: derive_total(
            "total_assets",
            total_assets,
            current_assets,
            non_current_assets,
        )?,
        current_assets,
        non_current_assets,
        total_liabilities: derive_total(
            "total_liabilities",
            total_liabilities,
            current_liabilities,
            non_current_liabilities,
        )?,
        current_liabilities,
        non_current_liabilities,
        total_equity: fields.value("total_equity", &vocab.total_equity),
        ..BalanceRecord::default()
    };

    for sub in &vocab.sub_items {
        if let Some((item, amount)) = fields.find(&sub.aliases) {
            record.bucket_mut(sub.bucket).insert(
                sub.label.clone(),
                LineItem {
                    amount,
                    account_id: item.account_id.clone(),
                },
            );
        }
    }

    Ok(record)
}

fn extract_cash_flow(fields: &mut Fields<'_>, vocab: &CashFlowVocabulary) -> CashFlowRecord {
    CashFlowRecord::new(
        fields.value("operating_cash_flow", &vocab.operating),
        fields.value("investing_cash_flow", &vocab.investing),
        fields.value("financing_cash_flow", &vocab.financing),
        fields.take("beginning_cash", &vocab.beginning_cash),
        fields.take("ending_cash", &vocab.ending_cash),
        fields.take("net_increase", &vocab.net_increase),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(section: &str, id: &str, name: &str, amount: &str) -> RawLineItem {
        RawLineItem::new(section, id, name, amount)
    }

    fn income_2020() -> ReportPayload {
        ReportPayload::ok(vec![
            item("IS", "ifrs-full_Revenue", "수익(매출액)", "236,806,988,000,000"),
            item("IS", "ifrs-full_CostOfSales", "매출원가", "144,488,296,000,000"),
            item(
                "IS",
                "dart_TotalSellingGeneralAdministrativeExpenses",
                "판매비와관리비",
                "56,324,816,000,000",
            ),
            item("IS", "dart_OperatingIncomeLoss", "영업이익", "35,994,019,000,000"),
            item("BS", "ifrs-full_Assets", "자산총계", "378,235,718,000,000"),
        ])
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("236,806,988,000,000"), Some(236_806_988_000_000));
        assert_eq!(parse_amount(" -1,234 "), Some(-1_234));
        assert_eq!(parse_amount("+42"), Some(42));
        assert_eq!(parse_amount("(1,000)"), Some(-1_000));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("-"), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_parse_amount_rejects_sign_inside_parentheses() {
        assert_eq!(parse_amount("(-5)"), None);
        assert_eq!(parse_amount("(+5)"), None);
        assert_eq!(parse_amount("(5)"), Some(-5));
    }

    #[test]
    fn test_parse_amount_out_of_range() {
        assert_eq!(parse_amount("(-9223372036854775808)"), None);
        assert_eq!(parse_amount("9,223,372,036,854,775,808"), None);
        assert_eq!(
            parse_amount("(9,223,372,036,854,775,807)"),
            Some(-i64::MAX)
        );
        assert_eq!(parse_amount("-9223372036854775808"), Some(i64::MIN));
    }

    #[test]
    fn test_derived_total_overflow_is_parse_error() {
        let payload = ReportPayload::ok(vec![
            item("BS", "ifrs-full_CurrentAssets", "유동자산", "9,223,372,036,854,775,807"),
            item("BS", "ifrs-full_NoncurrentAssets", "비유동자산", "1"),
        ]);
        let err = extract(StatementKind::Balance, &payload, &Vocabulary::builtin()).unwrap_err();
        assert!(matches!(err, DataError::Parse(ref m) if m.contains("total_assets")));
    }

    #[test]
    fn test_extreme_cash_flow_does_not_panic() {
        let payload = ReportPayload::ok(vec![
            item(
                "CF",
                "ifrs-full_CashFlowsFromUsedInOperatingActivities",
                "영업활동현금흐름",
                "9,223,372,036,854,775,807",
            ),
            item(
                "CF",
                "ifrs-full_CashAndCashEquivalentsAtBeginningOfPeriod",
                "기초현금및현금성자산",
                "1",
            ),
        ]);
        let extraction =
            extract(StatementKind::CashFlow, &payload, &Vocabulary::builtin()).unwrap();
        let Statement::CashFlow(cash_flow) = extraction.statement else {
            panic!("expected cash flow statement");
        };
        assert_eq!(cash_flow.operating_cash_flow, i64::MAX);
        assert_eq!(cash_flow.calculated_ending, i64::MAX);
    }

    #[test]
    fn test_extract_income() {
        let extraction =
            extract(StatementKind::Income, &income_2020(), &Vocabulary::builtin()).unwrap();
        assert!(extraction.is_complete());

        let Statement::Income(income) = extraction.statement else {
            panic!("expected income statement");
        };
        assert_eq!(income.revenue, 236_806_988_000_000);
        assert_eq!(income.cost_of_sales, 144_488_296_000_000);
        assert_eq!(income.operating_profit, 35_994_019_000_000);
        assert_eq!(income.selling_admin_expenses, 56_324_816_000_000);
        assert_eq!(income.operating_margin, 15.2);
    }

    #[test]
    fn test_missing_cost_of_sales_defaults_to_zero() {
        let mut payload = income_2020();
        payload
            .list
            .retain(|item| item.account_id != "ifrs-full_CostOfSales");

        let extraction = extract(StatementKind::Income, &payload, &Vocabulary::builtin()).unwrap();
        assert_eq!(extraction.missing, vec!["cost_of_sales"]);

        let Statement::Income(income) = extraction.statement else {
            panic!("expected income statement");
        };
        assert_eq!(income.cost_of_sales, 0);
        assert_eq!(income.revenue, 236_806_988_000_000);
        assert_eq!(income.operating_profit, 35_994_019_000_000);
    }

    #[test]
    fn test_name_alias_fallback_ignores_whitespace() {
        let payload = ReportPayload::ok(vec![
            item("IS", "-표준계정코드 미사용-", "매 출 액", "1,000"),
            item("IS", "-표준계정코드 미사용-", "영업이익(손실)", "-50"),
        ]);
        let extraction = extract(StatementKind::Income, &payload, &Vocabulary::builtin()).unwrap();
        let Statement::Income(income) = extraction.statement else {
            panic!("expected income statement");
        };
        assert_eq!(income.revenue, 1_000);
        assert_eq!(income.operating_profit, -50);
        assert_eq!(income.operating_margin, -5.0);
    }

    #[test]
    fn test_identifier_beats_name() {
        let payload = ReportPayload::ok(vec![
            item("IS", "other_Revenue", "매출액", "1"),
            item("IS", "ifrs-full_Revenue", "영업수익", "2"),
        ]);
        let extraction = extract(StatementKind::Income, &payload, &Vocabulary::builtin()).unwrap();
        let Statement::Income(income) = extraction.statement else {
            panic!("expected income statement");
        };
        assert_eq!(income.revenue, 2);
    }

    #[test]
    fn test_zero_revenue_margin() {
        let payload = ReportPayload::ok(vec![
            item("IS", "ifrs-full_Revenue", "매출액", "0"),
            item("IS", "dart_OperatingIncomeLoss", "영업이익", "500"),
        ]);
        let extraction = extract(StatementKind::Income, &payload, &Vocabulary::builtin()).unwrap();
        let Statement::Income(income) = extraction.statement else {
            panic!("expected income statement");
        };
        assert_eq!(income.operating_margin, 0.0);
    }

    #[test]
    fn test_zero_total_is_derived_from_parts() {
        let payload = ReportPayload::ok(vec![
            item("BS", "ifrs-full_CurrentAssets", "유동자산", "100"),
            item("BS", "ifrs-full_NoncurrentAssets", "비유동자산", "50"),
            item("BS", "ifrs-full_Assets", "자산총계", "0"),
            item("BS", "ifrs-full_CurrentLiabilities", "유동부채", "30"),
            item("BS", "ifrs-full_NoncurrentLiabilities", "비유동부채", "20"),
            item("BS", "ifrs-full_Equity", "자본총계", "100"),
            item("BS", "ifrs-full_Inventories", "재고자산", "40"),
            item("BS", "ifrs-full_RetainedEarnings", "이익잉여금", "70"),
        ]);
        let extraction = extract(StatementKind::Balance, &payload, &Vocabulary::builtin()).unwrap();
        assert_eq!(extraction.missing, vec!["total_liabilities"]);

        let Statement::Balance(balance) = extraction.statement else {
            panic!("expected balance sheet");
        };
        assert_eq!(balance.total_assets, 150);
        assert_eq!(balance.total_liabilities, 50);
        assert_eq!(balance.total_equity, 100);
        assert_eq!(balance.assets_current["inventories"].amount, 40);
        assert_eq!(
            balance.equity_items["retained_earnings"].account_id,
            "ifrs-full_RetainedEarnings"
        );
    }

    #[test]
    fn test_reported_total_is_kept() {
        let payload = ReportPayload::ok(vec![
            item("BS", "ifrs-full_CurrentAssets", "유동자산", "100"),
            item("BS", "ifrs-full_NoncurrentAssets", "비유동자산", "50"),
            item("BS", "ifrs-full_Assets", "자산총계", "155"),
        ]);
        let extraction = extract(StatementKind::Balance, &payload, &Vocabulary::builtin()).unwrap();
        let Statement::Balance(balance) = extraction.statement else {
            panic!("expected balance sheet");
        };
        assert_eq!(balance.total_assets, 155);
    }

    #[test]
    fn test_cash_flow_reads_both_section_tags() {
        let payload = ReportPayload::ok(vec![
            item(
                "CF",
                "ifrs-full_CashFlowsFromUsedInOperatingActivities",
                "영업활동현금흐름",
                "50",
            ),
            item(
                "CIS",
                "ifrs-full_CashFlowsFromUsedInInvestingActivities",
                "투자활동현금흐름",
                "-30",
            ),
            item(
                "CF",
                "ifrs-full_CashFlowsFromUsedInFinancingActivities",
                "재무활동현금흐름",
                "-10",
            ),
            item(
                "CF",
                "dart_CashAndCashEquivalentsAtBeginningOfPeriodCf",
                "기초현금및현금성자산",
                "100",
            ),
            item(
                "CF",
                "dart_CashAndCashEquivalentsAtEndOfPeriodCf",
                "기말현금및현금성자산",
                "112",
            ),
        ]);
        let extraction =
            extract(StatementKind::CashFlow, &payload, &Vocabulary::builtin()).unwrap();
        assert_eq!(extraction.missing, vec!["net_increase"]);

        let Statement::CashFlow(cf) = extraction.statement else {
            panic!("expected cash flow statement");
        };
        assert_eq!(cf.investing_cash_flow, -30);
        assert_eq!(cf.calculated_ending, 110);
        assert_eq!(cf.reconciliation_gap(), Some(2));
        assert_eq!(cf.net_increase, None);
    }

    #[test]
    fn test_rejected_payload() {
        let payload = ReportPayload::rejected("013", "조회된 데이타가 없습니다.");
        let err = extract(StatementKind::Income, &payload, &Vocabulary::builtin()).unwrap_err();
        assert!(matches!(err, DataError::UpstreamRejected { ref status, .. } if status == "013"));
    }

    #[test]
    fn test_no_matching_section() {
        let err = extract(StatementKind::CashFlow, &income_2020(), &Vocabulary::builtin())
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::ExtractionIncomplete {
                kind: StatementKind::CashFlow
            }
        ));
    }
}
