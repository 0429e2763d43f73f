//! Refinement output types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Final classification of a refined candidate.
///
/// Declaration order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Gem,
    Opportunity,
    FairValue,
    ValueTrapSuspect,
    BankInsurer,
    ExpensivePostAdjustment,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Self::Gem,
        Self::Opportunity,
        Self::FairValue,
        Self::ValueTrapSuspect,
        Self::BankInsurer,
        Self::ExpensivePostAdjustment,
    ];

    /// Stable machine tag, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gem => "GEM",
            Self::Opportunity => "OPPORTUNITY",
            Self::FairValue => "FAIR_VALUE",
            Self::ValueTrapSuspect => "VALUE_TRAP_SUSPECT",
            Self::BankInsurer => "BANK_INSURER",
            Self::ExpensivePostAdjustment => "EXPENSIVE_POST_ADJUSTMENT",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gem => "Gem",
            Self::Opportunity => "Opportunity",
            Self::FairValue => "Fair Value",
            Self::ValueTrapSuspect => "Value Trap?",
            Self::BankInsurer => "Bank/Insurer",
            Self::ExpensivePostAdjustment => "Expensive After Adjustment",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate after sector-aware review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinedRecord {
    pub ticker: String,
    pub sector: String,
    pub category: Category,
    pub category_label: &'static str,
    /// Clauses joined with "; "
    pub reason: String,
    pub price: f64,
    pub roic: f64,
    pub health_score: u8,
    pub original_growth: f64,
    pub sector_growth_cap: f64,
    pub growth_adjusted: bool,
    pub intrinsic_value: f64,
    pub adjusted_intrinsic: f64,
    pub original_mos: f64,
    pub adjusted_mos: f64,
}

/// Aggregate counts over a refinement run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementSummary {
    pub total_reviewed: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub gems_count: usize,
    pub opportunities_count: usize,
    pub value_traps_count: usize,
    /// Mean of adjusted minus original MOS over finite values
    pub avg_mos_adjustment: Option<f64>,
    pub stocks_with_growth_adjustment: usize,
}

/// Full refinement output. The three lists are filtered views of
/// `refined_results` in final order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementReport {
    pub refined_results: Vec<RefinedRecord>,
    pub summary: RefinementSummary,
    pub gems: Vec<RefinedRecord>,
    pub opportunities: Vec<RefinedRecord>,
    pub value_traps: Vec<RefinedRecord>,
}

/// Rejected refinement payload.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("payload must contain a 'results' field")]
    MissingResults,

    #[error("'results' must be an array")]
    ResultsNotArray,

    #[error("'results' is empty")]
    Empty,

    #[error("invalid record at index {index}: {message}")]
    InvalidRecord { index: usize, message: String },
}

impl From<RefineError> for warren_common::Error {
    fn from(e: RefineError) -> Self {
        warren_common::Error::InvalidInput(e.to_string())
    }
}
