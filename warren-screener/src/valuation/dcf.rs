//! Two-stage discounted cash flow valuation.
//!
//! ```text
//!   Stage 1 (years 1..=5)          Stage 2 (terminal, Gordon growth)
//!   fcf·(1+g)^i / (1+r)^i          fcf·(1+g)^5 · (1+gₜ) / (r − gₜ) / (1+r)^5
//!           └───────────── enterprise value ─────────────┘
//!                 + cash − debt = equity value
//!                 ÷ shares      = intrinsic value per share
//! ```
//!
//! `g` is derived from ROIC and clamped; `gₜ` is the fixed 3% perpetual rate.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warren_common::config::TERMINAL_GROWTH_RATE;

/// Explicit forecast horizon in years.
pub const EXPLICIT_YEARS: i32 = 5;

/// Growth estimate bounds.
pub const MIN_GROWTH: f64 = 0.03;
pub const MAX_GROWTH: f64 = 0.14;

/// Share of ROIC assumed to translate into long-run growth.
pub const ROIC_GROWTH_FACTOR: f64 = 0.5;

/// Margin of safety reported when intrinsic value is not positive.
pub const UNDEFINED_MOS: f64 = -0.99;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ValuationError {
    #[error("discount rate {rate} must exceed the terminal growth rate {}", TERMINAL_GROWTH_RATE)]
    DiscountRateTooLow { rate: f64 },
}

/// Long-run growth proxy: half of ROIC, bounded to [3%, 14%].
pub fn growth_from_roic(roic: f64) -> f64 {
    if roic.is_nan() {
        return MIN_GROWTH;
    }
    (roic * ROIC_GROWTH_FACTOR).clamp(MIN_GROWTH, MAX_GROWTH)
}

/// (intrinsic − price) / intrinsic, or [`UNDEFINED_MOS`] when intrinsic ≤ 0.
pub fn margin_of_safety(intrinsic: f64, price: f64) -> f64 {
    if intrinsic > 0.0 {
        (intrinsic - price) / intrinsic
    } else {
        UNDEFINED_MOS
    }
}

/// Gate 3: not too expensive, or good enough to watch anyway.
pub fn passes_margin_view(mos: f64, health_score: u8, floor: f64, quality_override: u8) -> bool {
    mos >= floor || health_score >= quality_override
}

/// Inputs for one valuation. Capex sign is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationInputs {
    pub operating_cash_flow: f64,
    pub capital_expenditure: f64,
    pub roic: f64,
    pub shares_outstanding: f64,
    pub cash: f64,
    pub debt: f64,
    pub price: f64,
}

/// Full DCF breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub free_cash_flow: f64,
    pub growth: f64,
    pub stage_one_pv: f64,
    pub terminal_value: f64,
    pub terminal_pv: f64,
    pub enterprise_value: f64,
    pub equity_value: f64,
    pub intrinsic_value: f64,
    pub margin_of_safety: f64,
}

/// Two-stage DCF with a fixed discount rate.
#[derive(Debug, Clone, Copy)]
pub struct TwoStageValuator {
    discount_rate: f64,
}

impl TwoStageValuator {
    /// Rates at or below the terminal growth rate make the terminal value undefined.
    pub fn new(discount_rate: f64) -> Result<Self, ValuationError> {
        if !discount_rate.is_finite() || discount_rate <= TERMINAL_GROWTH_RATE {
            return Err(ValuationError::DiscountRateTooLow {
                rate: discount_rate,
            });
        }
        Ok(Self { discount_rate })
    }

    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    /// Value one company.
    ///
    /// Non-positive free cash flow skips the DCF: intrinsic is 0 and the
    /// margin of safety is [`UNDEFINED_MOS`]. The growth estimate is still
    /// reported.
    pub fn value(&self, inputs: &ValuationInputs) -> Valuation {
        let growth = growth_from_roic(inputs.roic);
        let fcf = inputs.operating_cash_flow - inputs.capital_expenditure.abs();

        if !(fcf > 0.0) {
            return Valuation {
                free_cash_flow: fcf,
                growth,
                stage_one_pv: 0.0,
                terminal_value: 0.0,
                terminal_pv: 0.0,
                enterprise_value: 0.0,
                equity_value: 0.0,
                intrinsic_value: 0.0,
                margin_of_safety: UNDEFINED_MOS,
            };
        }

        let r = self.discount_rate;
        let stage_one_pv: f64 = (1..=EXPLICIT_YEARS)
            .map(|year| fcf * (1.0 + growth).powi(year) / (1.0 + r).powi(year))
            .sum();

        let terminal_fcf = fcf * (1.0 + growth).powi(EXPLICIT_YEARS);
        let terminal_value =
            terminal_fcf * (1.0 + TERMINAL_GROWTH_RATE) / (r - TERMINAL_GROWTH_RATE);
        let terminal_pv = terminal_value / (1.0 + r).powi(EXPLICIT_YEARS);

        let enterprise_value = stage_one_pv + terminal_pv;
        let equity_value = enterprise_value + inputs.cash - inputs.debt;

        let shares = inputs.shares_outstanding;
        let per_share = equity_value / shares;
        let intrinsic_value = if shares > 0.0 && per_share.is_finite() {
            per_share
        } else {
            0.0
        };

        Valuation {
            free_cash_flow: fcf,
            growth,
            stage_one_pv,
            terminal_value,
            terminal_pv,
            enterprise_value,
            equity_value,
            intrinsic_value,
            margin_of_safety: margin_of_safety(intrinsic_value, inputs.price),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
