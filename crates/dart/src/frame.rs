//! Tabular export of normalized records.

use polars::prelude::*;

use dart_core::{
    BalanceRecord, CashFlowRecord, DataError, FinancialRecord, IncomeRecord, Result,
    StatementKind,
};

fn frame_err(e: PolarsError) -> DataError {
    DataError::Parse(e.to_string())
}

fn int_column<T>(name: &str, rows: &[&T], f: impl Fn(&T) -> i64) -> Column {
    Column::new(name.into(), rows.iter().map(|&r| f(r)).collect::<Vec<i64>>())
}

fn opt_column<T>(name: &str, rows: &[&T], f: impl Fn(&T) -> Option<i64>) -> Column {
    Column::new(
        name.into(),
        rows.iter().map(|&r| f(r)).collect::<Vec<Option<i64>>>(),
    )
}

fn income_columns(rows: &[&IncomeRecord]) -> Vec<Column> {
    vec![
        int_column("revenue", rows, |r| r.revenue),
        int_column("cost_of_sales", rows, |r| r.cost_of_sales),
        int_column("operating_profit", rows, |r| r.operating_profit),
        int_column("selling_admin_expenses", rows, |r| r.selling_admin_expenses),
        Column::new(
            "operating_margin".into(),
            rows.iter().map(|r| r.operating_margin).collect::<Vec<f64>>(),
        ),
    ]
}

fn balance_columns(rows: &[&BalanceRecord]) -> Vec<Column> {
    vec![
        int_column("total_assets", rows, |r| r.total_assets),
        int_column("current_assets", rows, |r| r.current_assets),
        int_column("non_current_assets", rows, |r| r.non_current_assets),
        int_column("total_liabilities", rows, |r| r.total_liabilities),
        int_column("current_liabilities", rows, |r| r.current_liabilities),
        int_column("non_current_liabilities", rows, |r| r.non_current_liabilities),
        int_column("total_equity", rows, |r| r.total_equity),
    ]
}

fn cash_flow_columns(rows: &[&CashFlowRecord]) -> Vec<Column> {
    vec![
        int_column("operating_cash_flow", rows, |r| r.operating_cash_flow),
        int_column("investing_cash_flow", rows, |r| r.investing_cash_flow),
        int_column("financing_cash_flow", rows, |r| r.financing_cash_flow),
        opt_column("beginning_cash", rows, |r| r.beginning_cash),
        opt_column("ending_cash", rows, |r| r.ending_cash),
        opt_column("net_increase", rows, |r| r.net_increase),
        int_column("calculated_ending", rows, |r| r.calculated_ending),
        opt_column("reconciliation_gap", rows, CashFlowRecord::reconciliation_gap),
    ]
}

/// One row per record: `corp_code`, `fiscal_year`, `quarter` (null for
/// annual), `period`, `kind`, then the scalar fields of the statement kind.
///
/// Balance sheet detail maps are not exported.
///
/// # Errors
/// [`DataError::InvalidParameter`] when the records mix statement kinds.
pub fn records_frame(records: &[FinancialRecord]) -> Result<DataFrame> {
    let kind = records.first().map(FinancialRecord::kind);
    if let Some(kind) = kind {
        if records.iter().any(|r| r.kind() != kind) {
            return Err(DataError::InvalidParameter(
                "cannot tabulate mixed statement kinds".to_string(),
            ));
        }
    }

    let mut columns = vec![
        Column::new(
            "corp_code".into(),
            records
                .iter()
                .map(|r| r.corp_code.to_string())
                .collect::<Vec<String>>(),
        ),
        Column::new(
            "fiscal_year".into(),
            records
                .iter()
                .map(|r| r.period.fiscal_year)
                .collect::<Vec<i32>>(),
        ),
        Column::new(
            "quarter".into(),
            records
                .iter()
                .map(|r| r.period.quarter.map(|q| i32::from(q.number())))
                .collect::<Vec<Option<i32>>>(),
        ),
        Column::new(
            "period".into(),
            records
                .iter()
                .map(|r| r.period.label())
                .collect::<Vec<String>>(),
        ),
        Column::new(
            "kind".into(),
            records
                .iter()
                .map(|r| r.kind().as_str())
                .collect::<Vec<&str>>(),
        ),
    ];

    match kind {
        Some(StatementKind::Income) => {
            let rows: Vec<&IncomeRecord> =
                records.iter().filter_map(FinancialRecord::as_income).collect();
            columns.extend(income_columns(&rows));
        }
        Some(StatementKind::Balance) => {
            let rows: Vec<&BalanceRecord> =
                records.iter().filter_map(FinancialRecord::as_balance).collect();
            columns.extend(balance_columns(&rows));
        }
        Some(StatementKind::CashFlow) => {
            let rows: Vec<&CashFlowRecord> = records
                .iter()
                .filter_map(FinancialRecord::as_cash_flow)
                .collect();
            columns.extend(cash_flow_columns(&rows));
        }
        None => {}
    }

    DataFrame::new(columns).map_err(frame_err)
}
