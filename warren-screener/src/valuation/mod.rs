//! Valuation: quality gates and the two-stage DCF.
//!
//! # Pipeline per ticker
//!
//! ```text
//! statements ──► QualityScorer ──► TwoStageValuator ──► margin-of-safety gate
//!                (ROIC ≥ min,       (FCF → growth →       (MOS ≥ floor or
//!                 health ≥ min)      EV → per share)       health ≥ override)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use warren_screener::valuation::{TwoStageValuator, ValuationInputs};
//!
//! let valuator = TwoStageValuator::new(0.09)?;
//! let v = valuator.value(&ValuationInputs {
//!     operating_cash_flow: 1300.0,
//!     capital_expenditure: -300.0,
//!     roic: 0.1215,
//!     shares_outstanding: 100.0,
//!     cash: 500.0,
//!     debt: 2000.0,
//!     price: 150.0,
//! });
//! println!("intrinsic {:.2}, MOS {:.1}%", v.intrinsic_value, v.margin_of_safety * 100.0);
//! ```

pub mod dcf;
pub mod quality;

pub use dcf::{
    growth_from_roic, margin_of_safety, passes_margin_view, TwoStageValuator, Valuation,
    ValuationError, ValuationInputs, UNDEFINED_MOS,
};
pub use quality::{
    compute_roic, health_score, QualityAssessment, QualityInputs, QualityRejection, QualityScorer,
};
