//! Per-ticker evaluation pipeline.
//!
//! ```text
//! snapshot ─► market cap floor ─► statements ─► resolve fields
//!     ─► ROIC gate ─► health gate ─► DCF ─► margin view gate ─► sector
//! ```
//!
//! Every failure becomes a [`SkipReason`]; nothing here aborts a scan.

use std::sync::Arc;
use tracing::debug;
use warren_common::config::ScreeningConfig;
use warren_common::util::round_to;

use crate::data::statements::{fields, resolve_field, FinancialStatements};
use crate::data::FundamentalsProvider;
use crate::valuation::{
    passes_margin_view, QualityInputs, QualityRejection, QualityScorer, TwoStageValuator,
    ValuationError, ValuationInputs,
};

use super::types::{CandidateRecord, SkipReason, TickerOutcome, UNKNOWN_SECTOR};

/// Applies the admission gates and valuation to a single ticker.
pub struct TickerEvaluator {
    provider: Arc<dyn FundamentalsProvider>,
    scorer: QualityScorer,
    valuator: TwoStageValuator,
    config: ScreeningConfig,
}

impl TickerEvaluator {
    pub fn new(
        provider: Arc<dyn FundamentalsProvider>,
        config: ScreeningConfig,
    ) -> Result<Self, ValuationError> {
        let valuator = TwoStageValuator::new(config.discount_rate)?;
        let scorer = QualityScorer::new(config.min_roic, config.min_health_score);
        Ok(Self {
            provider,
            scorer,
            valuator,
            config,
        })
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Run the full pipeline for `ticker`.
    pub async fn evaluate(&self, ticker: &str) -> TickerOutcome {
        match self.try_evaluate(ticker).await {
            Ok(record) => {
                debug!(
                    ticker,
                    roic = record.roic,
                    health_score = record.health_score,
                    margin_of_safety = record.margin_of_safety,
                    "Candidate admitted"
                );
                TickerOutcome::Candidate(record)
            }
            Err(reason) => {
                debug!(ticker, reason = %reason, "Ticker skipped");
                TickerOutcome::skipped(ticker, reason)
            }
        }
    }

    async fn try_evaluate(&self, ticker: &str) -> Result<CandidateRecord, SkipReason> {
        let snapshot = self
            .provider
            .snapshot(ticker)
            .await
            .map_err(|e| SkipReason::MarketData(e.to_string()))?;

        if !(snapshot.market_cap >= self.config.min_market_cap) {
            return Err(SkipReason::BelowMarketCap {
                market_cap: snapshot.market_cap,
            });
        }

        let statements = self
            .provider
            .statements(ticker)
            .await
            .map_err(|e| SkipReason::Statements(e.to_string()))?;

        if statements.is_incomplete() {
            return Err(SkipReason::MissingStatements);
        }

        let series = ResolvedSeries::from_statements(&statements)?;
        let quality_inputs = series.quality_inputs();

        let assessment = self
            .scorer
            .assess(&quality_inputs)
            .map_err(|rejection| match rejection {
                QualityRejection::Roic(roic) => SkipReason::RoicBelowMinimum { roic },
                QualityRejection::Health(score) => SkipReason::HealthBelowMinimum { score },
            })?;

        let valuation = self.valuator.value(&ValuationInputs {
            operating_cash_flow: series.operating_cash_flow[0],
            capital_expenditure: series.capex.first().copied().unwrap_or(0.0),
            roic: assessment.roic,
            shares_outstanding: snapshot.shares_outstanding,
            cash: quality_inputs.latest_cash(),
            debt: quality_inputs.latest_debt(),
            price: snapshot.price,
        });

        if !passes_margin_view(
            valuation.margin_of_safety,
            assessment.health_score,
            self.config.margin_view_floor,
            self.config.quality_override_score,
        ) {
            return Err(SkipReason::OutsideMarginView {
                margin_of_safety: valuation.margin_of_safety,
                health_score: assessment.health_score,
            });
        }

        let sector = match self.provider.sector(ticker).await {
            Ok(Some(sector)) if !sector.trim().is_empty() => sector,
            Ok(_) => UNKNOWN_SECTOR.to_string(),
            Err(e) => {
                debug!(ticker, error = %e, "Sector lookup failed");
                UNKNOWN_SECTOR.to_string()
            }
        };

        Ok(CandidateRecord {
            ticker: ticker.to_string(),
            price: round_to(snapshot.price, 2),
            sector,
            roic: assessment.roic,
            health_score: assessment.health_score,
            growth_estimate: valuation.growth,
            intrinsic_value: valuation.intrinsic_value,
            margin_of_safety: valuation.margin_of_safety,
        })
    }
}

/// Line items resolved from the three statements.
struct ResolvedSeries<'a> {
    net_income: &'a [f64],
    ebit: &'a [f64],
    operating_cash_flow: &'a [f64],
    capex: &'a [f64],
    equity: &'a [f64],
    debt: &'a [f64],
    cash: &'a [f64],
}

impl<'a> ResolvedSeries<'a> {
    fn from_statements(statements: &'a FinancialStatements) -> Result<Self, SkipReason> {
        let series = Self {
            net_income: resolve_field(&statements.income, fields::NET_INCOME),
            ebit: resolve_field(&statements.income, fields::EBIT),
            operating_cash_flow: resolve_field(&statements.cash_flow, fields::OPERATING_CASH_FLOW),
            capex: resolve_field(&statements.cash_flow, fields::CAPEX),
            equity: resolve_field(&statements.balance, fields::EQUITY),
            debt: resolve_field(&statements.balance, fields::DEBT),
            cash: resolve_field(&statements.balance, fields::CASH),
        };

        if series.net_income.is_empty() {
            return Err(SkipReason::MissingField("net_income"));
        }
        if series.operating_cash_flow.is_empty() {
            return Err(SkipReason::MissingField("operating_cash_flow"));
        }
        if series.equity.is_empty() {
            return Err(SkipReason::MissingField("equity"));
        }

        Ok(series)
    }

    fn quality_inputs(&self) -> QualityInputs<'a> {
        QualityInputs {
            net_income: self.net_income,
            operating_cash_flow: self.operating_cash_flow,
            ebit: self.ebit,
            equity: self.equity,
            debt: self.debt,
            cash: self.cash,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
