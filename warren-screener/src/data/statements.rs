//! Financial statement tables and fuzzy line-item lookup.
//!
//! Vendors rename statement rows over time ("Net Income" vs "NetIncome",
//! "Total Cash From Operating Activities" vs "Operating Cash Flow"). Fields
//! are therefore resolved through an ordered keyword list instead of a fixed
//! label.
//!
//! Resolution rules, per keyword in order:
//! 1. A row whose normalized label equals the keyword wins immediately.
//! 2. Otherwise, among rows whose label contains the keyword, the shortest
//!    label wins (first in table order on ties). This keeps "net income"
//!    from resolving to "net income from continuing operations".

use serde::{Deserialize, Serialize};

/// One statement line item with values ordered most-recent period first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub label: String,
    pub values: Vec<f64>,
}

impl StatementRow {
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }
}

/// A labeled statement table (income, balance sheet, or cash flow).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    rows: Vec<StatementRow>,
}

impl StatementTable {
    pub fn new(rows: Vec<StatementRow>) -> Self {
        Self { rows }
    }

    /// Build a table from `(label, values)` pairs.
    pub fn from_rows<L, I>(rows: I) -> Self
    where
        L: Into<String>,
        I: IntoIterator<Item = (L, Vec<f64>)>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|(label, values)| StatementRow::new(label, values))
                .collect(),
        }
    }

    pub fn push(&mut self, row: StatementRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[StatementRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve a field through its keyword list. Empty slice when nothing matches.
    pub fn resolve(&self, keywords: &[&str]) -> &[f64] {
        resolve_field(self, keywords)
    }
}

/// The three statements needed for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub income: StatementTable,
    pub balance: StatementTable,
    pub cash_flow: StatementTable,
}

impl FinancialStatements {
    /// True when any of the three tables has no rows.
    pub fn is_incomplete(&self) -> bool {
        self.income.is_empty() || self.balance.is_empty() || self.cash_flow.is_empty()
    }
}

/// Keyword lists per field, most specific first.
pub mod fields {
    pub const NET_INCOME: &[&str] = &["Net Income", "NetIncome"];
    pub const EBIT: &[&str] = &["EBIT", "Operating Income"];
    pub const OPERATING_CASH_FLOW: &[&str] =
        &["Operating Cash Flow", "Total Cash From Operating Activities"];
    pub const CAPEX: &[&str] = &[
        "Capital Expenditures",
        "Capital Expenditure",
        "Purchase of PPE",
    ];
    pub const EQUITY: &[&str] = &["Stockholders Equity", "Total Equity", "Stockholder Equity"];
    pub const DEBT: &[&str] = &["Total Debt"];
    pub const CASH: &[&str] = &["Cash", "Cash And Cash Equivalents"];
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Locate the values of a line item under any of its historical labels.
pub fn resolve_field<'a>(table: &'a StatementTable, keywords: &[&str]) -> &'a [f64] {
    if table.is_empty() {
        return &[];
    }

    let labels: Vec<String> = table.rows.iter().map(|r| normalize(&r.label)).collect();

    for keyword in keywords {
        let key = normalize(keyword);
        if key.is_empty() {
            continue;
        }

        if let Some(idx) = labels.iter().position(|l| *l == key) {
            return &table.rows[idx].values;
        }

        // min_by_key keeps the first of equal-length labels
        let shortest = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.contains(&key))
            .min_by_key(|(_, l)| l.len());

        if let Some((idx, _)) = shortest {
            return &table.rows[idx].values;
        }
    }

    &[]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn income() -> StatementTable {
        StatementTable::from_rows([
            ("Net Income From Continuing Operations", vec![90.0]),
            ("Net Income Common Stockholders", vec![95.0]),
            ("  NET INCOME ", vec![100.0, 80.0]),
            ("Operating Income", vec![150.0]),
        ])
    }

    #[test]
    fn test_exact_match_is_case_and_whitespace_insensitive() {
        assert_eq!(income().resolve(fields::NET_INCOME), &[100.0, 80.0]);
    }

    #[test]
    fn test_shortest_containing_label_wins() {
        let table = StatementTable::from_rows([
            ("Net Income From Continuing Operations", vec![1.0]),
            ("Net Income Common Stockholders", vec![2.0]),
        ]);
        assert_eq!(table.resolve(fields::NET_INCOME), &[2.0]);
    }

    #[test]
    fn test_tie_keeps_table_order() {
        let table = StatementTable::from_rows([("Total Debt A", vec![1.0]), ("Total Debt B", vec![2.0])]);
        assert_eq!(table.resolve(fields::DEBT), &[1.0]);
    }

    #[test]
    fn test_later_keyword_used_when_earlier_absent() {
        let table = StatementTable::from_rows([
            ("Total Revenue", vec![10.0]),
            ("Operating Income", vec![7.0]),
        ]);
        assert_eq!(table.resolve(fields::EBIT), &[7.0]);
    }

    #[test]
    fn test_vendor_drift_without_spaces() {
        let table = StatementTable::from_rows([("NetIncome", vec![42.0])]);
        assert_eq!(table.resolve(fields::NET_INCOME), &[42.0]);
    }

    #[test]
    fn test_earlier_keyword_substring_beats_later_exact() {
        // "cash" is a substring of "cash and cash equivalents" so the first
        // keyword already resolves; the later exact label is never consulted.
        let table = StatementTable::from_rows([
            ("Cash And Cash Equivalents", vec![5.0]),
            ("Restricted Cash", vec![1.0]),
        ]);
        assert_eq!(table.resolve(fields::CASH), &[1.0]);
    }

    #[test]
    fn test_empty_table_and_no_match() {
        assert!(StatementTable::default().resolve(fields::NET_INCOME).is_empty());
        assert!(income().resolve(fields::DEBT).is_empty());
    }

    #[test]
    fn test_incomplete_statements() {
        let mut statements = FinancialStatements::default();
        assert!(statements.is_incomplete());
        statements.income = income();
        statements.balance = StatementTable::from_rows([("Total Debt", vec![1.0])]);
        statements.cash_flow = StatementTable::from_rows([("Operating Cash Flow", vec![1.0])]);
        assert!(!statements.is_incomplete());
    }

    proptest! {
        #[test]
        fn prop_resolved_row_contains_keyword(
            labels in proptest::collection::vec("[a-z ]{1,20}", 1..8),
            keyword in "[a-z]{1,3}",
        ) {
            let table = StatementTable::from_rows(
                labels.iter().enumerate().map(|(i, l)| (l.clone(), vec![i as f64])),
            );
            let values = table.resolve(&[keyword.as_str()]);
            if let Some(&idx) = values.first() {
                let label = normalize(&labels[idx as usize]);
                prop_assert!(label.contains(keyword.trim()));
            } else {
                prop_assert!(labels.iter().all(|l| !normalize(l).contains(&keyword)));
            }
        }
    }
}
