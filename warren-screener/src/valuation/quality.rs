//! Quality gates: return on invested capital and a quick health score.

use serde::{Deserialize, Serialize};

/// EBIT multiplier approximating after-tax operating profit.
pub const AFTER_TAX_FACTOR: f64 = 0.79;

/// Score assigned when history is too thin to judge.
pub const NEUTRAL_HEALTH_SCORE: u8 = 5;

/// Resolved statement series for one ticker, most-recent period first.
///
/// Empty slices mean the line item could not be resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityInputs<'a> {
    pub net_income: &'a [f64],
    pub operating_cash_flow: &'a [f64],
    pub ebit: &'a [f64],
    pub equity: &'a [f64],
    pub debt: &'a [f64],
    pub cash: &'a [f64],
}

impl QualityInputs<'_> {
    /// Latest EBIT, falling back to latest net income.
    pub fn latest_ebit(&self) -> f64 {
        self.ebit
            .first()
            .or_else(|| self.net_income.first())
            .copied()
            .unwrap_or(0.0)
    }

    /// Latest debt, 0 when unreported.
    pub fn latest_debt(&self) -> f64 {
        self.debt.first().copied().unwrap_or(0.0)
    }

    /// Latest cash, 0 when unreported.
    pub fn latest_cash(&self) -> f64 {
        self.cash.first().copied().unwrap_or(0.0)
    }

    pub fn latest_equity(&self) -> f64 {
        self.equity.first().copied().unwrap_or(0.0)
    }
}

/// Equity plus debt, net of cash.
pub fn invested_capital(equity: f64, debt: f64, cash: f64) -> f64 {
    equity + debt - cash
}

/// After-tax EBIT over invested capital; 0 when invested capital is not positive.
pub fn compute_roic(ebit: f64, equity: f64, debt: f64, cash: f64) -> f64 {
    let capital = invested_capital(equity, debt, cash);
    if capital > 0.0 {
        (ebit * AFTER_TAX_FACTOR) / capital
    } else {
        0.0
    }
}

/// Five-point health test.
///
/// One point each for: positive net income, positive operating cash flow,
/// net income growth, cash flow above net income, and non-increasing debt.
/// Fewer than two periods of net income scores [`NEUTRAL_HEALTH_SCORE`].
pub fn health_score(inputs: &QualityInputs<'_>) -> u8 {
    if inputs.net_income.len() <= 1 {
        return NEUTRAL_HEALTH_SCORE;
    }
    score_points(inputs).unwrap_or(NEUTRAL_HEALTH_SCORE)
}

fn score_points(inputs: &QualityInputs<'_>) -> Option<u8> {
    let ni = *inputs.net_income.first()?;
    let ni_prior = *inputs.net_income.get(1)?;
    let ocf = *inputs.operating_cash_flow.first()?;

    let debt_not_increasing = match inputs.debt {
        [current, prior, ..] => current <= prior,
        _ => false,
    };

    let points = [
        ni > 0.0,
        ocf > 0.0,
        ni > ni_prior,
        ocf > ni,
        debt_not_increasing,
    ];

    Some(points.iter().filter(|&&p| p).count() as u8)
}

/// Outcome of the quality gates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub roic: f64,
    pub health_score: u8,
}

/// Which quality gate rejected a ticker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QualityRejection {
    Roic(f64),
    Health(u8),
}

/// ROIC and health gates with fixed thresholds.
#[derive(Debug, Clone, Copy)]
pub struct QualityScorer {
    min_roic: f64,
    min_health_score: u8,
}

impl QualityScorer {
    pub fn new(min_roic: f64, min_health_score: u8) -> Self {
        Self {
            min_roic,
            min_health_score,
        }
    }

    /// Apply gate 1 (ROIC) then gate 2 (health).
    pub fn assess(&self, inputs: &QualityInputs<'_>) -> Result<QualityAssessment, QualityRejection> {
        let roic = compute_roic(
            inputs.latest_ebit(),
            inputs.latest_equity(),
            inputs.latest_debt(),
            inputs.latest_cash(),
        );

        // NaN EBIT yields NaN ROIC, which must fail the gate.
        if !(roic >= self.min_roic) {
            return Err(QualityRejection::Roic(roic));
        }

        let score = health_score(inputs);
        if score < self.min_health_score {
            return Err(QualityRejection::Health(score));
        }

        Ok(QualityAssessment {
            roic,
            health_score: score,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
