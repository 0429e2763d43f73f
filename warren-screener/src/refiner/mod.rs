//! Portfolio refiner.
//!
//! Second-pass review of screener candidates. The raw DCF trusts a growth
//! rate derived from ROIC alone; the refiner caps that rate per sector,
//! rescales intrinsic value to match, and sorts the result into tiers.
//!
//! ```text
//! Financial Services ──────────────────────────────► BANK_INSURER
//! otherwise:
//!   growth > sector cap ? intrinsic × ((1+cap)/(1+g))^2.5 : intrinsic
//!   adjusted MOS ─► tier (GEM / OPPORTUNITY / VALUE_TRAP_SUSPECT /
//!                         FAIR_VALUE / EXPENSIVE_POST_ADJUSTMENT)
//!   adjusted MOS > 60% outside Technology/Healthcare ─► VALUE_TRAP_SUSPECT
//! ```
//!
//! Refinement is a pure function of its input; nothing is cached.

pub mod sector;
pub mod types;

pub use sector::{growth_cap, is_financial, is_growth_sector, DEFAULT_GROWTH_CAP};
pub use types::{Category, RefineError, RefinedRecord, RefinementReport, RefinementSummary};

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;
use warren_common::util::format_percent;

use crate::screener::{descending_nan_last, CandidateRecord};
use crate::valuation::UNDEFINED_MOS;

/// Exponent applied to the growth correction factor.
pub const CORRECTION_EXPONENT: f64 = 2.5;

/// Adjusted MOS above which a candidate counts as discounted.
pub const DISCOUNT_MOS: f64 = 0.15;

/// Adjusted MOS above which the discount is read as distress.
pub const DISTRESS_MOS: f64 = 0.60;

const GEM_MIN_ROIC: f64 = 0.15;
const GEM_MIN_HEALTH: u8 = 6;
const OPPORTUNITY_MIN_ROIC: f64 = 0.10;

const FINANCIAL_REASON: &str = "DCF not applicable; value by price-to-book";
const DISTRESS_REASON: &str = "discount implies market-priced distress or cyclical collapse";

/// Sector-aware reviewer of screener candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortfolioRefiner;

impl PortfolioRefiner {
    pub fn new() -> Self {
        Self
    }

    /// Review a single candidate.
    pub fn refine_record(&self, record: &CandidateRecord) -> RefinedRecord {
        let sector = record.sector.as_str();

        if is_financial(sector) {
            return RefinedRecord {
                ticker: record.ticker.clone(),
                sector: record.sector.clone(),
                category: Category::BankInsurer,
                category_label: Category::BankInsurer.label(),
                reason: FINANCIAL_REASON.to_string(),
                price: record.price,
                roic: record.roic,
                health_score: record.health_score,
                original_growth: record.growth_estimate,
                sector_growth_cap: growth_cap(sector),
                growth_adjusted: false,
                intrinsic_value: record.intrinsic_value,
                adjusted_intrinsic: record.intrinsic_value,
                original_mos: record.margin_of_safety,
                adjusted_mos: 0.0,
            };
        }

        let cap = growth_cap(sector);
        let growth_adjusted = record.growth_estimate > cap;
        let mut clauses: Vec<String> = Vec::with_capacity(2);

        let (adjusted_intrinsic, adjusted_mos) = if growth_adjusted {
            clauses.push(format!(
                "growth capped from {} to {}",
                format_percent(record.growth_estimate),
                format_percent(cap)
            ));

            let correction = (1.0 + cap) / (1.0 + record.growth_estimate);
            let adjusted = record.intrinsic_value * correction.powf(CORRECTION_EXPONENT);
            let mos = if adjusted > 0.0 && record.price > 0.0 {
                (adjusted - record.price) / adjusted
            } else {
                UNDEFINED_MOS
            };
            (adjusted, mos)
        } else {
            (record.intrinsic_value, record.margin_of_safety)
        };

        let (mut category, tier_reason) =
            classify(adjusted_mos, record.roic, record.health_score, growth_adjusted);

        if adjusted_mos > DISTRESS_MOS && !is_growth_sector(sector) {
            category = Category::ValueTrapSuspect;
            clauses.push(DISTRESS_REASON.to_string());
        } else {
            clauses.push(tier_reason.to_string());
        }

        RefinedRecord {
            ticker: record.ticker.clone(),
            sector: record.sector.clone(),
            category,
            category_label: category.label(),
            reason: clauses.join("; "),
            price: record.price,
            roic: record.roic,
            health_score: record.health_score,
            original_growth: record.growth_estimate,
            sector_growth_cap: cap,
            growth_adjusted,
            intrinsic_value: record.intrinsic_value,
            adjusted_intrinsic,
            original_mos: record.margin_of_safety,
            adjusted_mos,
        }
    }

    /// Review every candidate and assemble the report.
    pub fn refine(&self, records: &[CandidateRecord]) -> RefinementReport {
        let mut refined: Vec<RefinedRecord> =
            records.iter().map(|r| self.refine_record(r)).collect();

        refined.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| descending_nan_last(a.adjusted_mos, b.adjusted_mos))
        });

        let summary = summarize(&refined);
        let pick = |category: Category| -> Vec<RefinedRecord> {
            refined
                .iter()
                .filter(|r| r.category == category)
                .cloned()
                .collect()
        };

        let gems = pick(Category::Gem);
        let opportunities = pick(Category::Opportunity);
        let value_traps = pick(Category::ValueTrapSuspect);

        info!(
            total_reviewed = summary.total_reviewed,
            gems = summary.gems_count,
            opportunities = summary.opportunities_count,
            value_traps = summary.value_traps_count,
            growth_adjusted = summary.stocks_with_growth_adjustment,
            "Refinement complete"
        );

        RefinementReport {
            refined_results: refined,
            summary,
            gems,
            opportunities,
            value_traps,
        }
    }

    /// Refine an externally supplied `{ "results": [...] }` document.
    pub fn refine_payload(&self, payload: &Value) -> Result<RefinementReport, RefineError> {
        let results = payload.get("results").ok_or(RefineError::MissingResults)?;
        let items = results.as_array().ok_or(RefineError::ResultsNotArray)?;

        if items.is_empty() {
            return Err(RefineError::Empty);
        }

        let records = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                CandidateRecord::deserialize(item).map_err(|e| RefineError::InvalidRecord {
                    index,
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.refine(&records))
    }
}

/// Tier and its reason clause. NaN falls through to expensive.
fn classify(
    adjusted_mos: f64,
    roic: f64,
    health_score: u8,
    growth_adjusted: bool,
) -> (Category, &'static str) {
    if adjusted_mos > DISCOUNT_MOS {
        if roic > GEM_MIN_ROIC && health_score >= GEM_MIN_HEALTH {
            (Category::Gem, "high quality at a fair price")
        } else if roic > OPPORTUNITY_MIN_ROIC {
            (Category::Opportunity, "solid discount with acceptable quality")
        } else {
            (Category::ValueTrapSuspect, "high MOS but middling quality")
        }
    } else if adjusted_mos > 0.0 {
        (Category::FairValue, "reasonable valuation")
    } else if growth_adjusted {
        (
            Category::ExpensivePostAdjustment,
            "no longer attractive after adjustment",
        )
    } else {
        (Category::ExpensivePostAdjustment, "overvalued on adjusted DCF")
    }
}

fn summarize(refined: &[RefinedRecord]) -> RefinementSummary {
    let mut by_category: BTreeMap<Category, usize> = BTreeMap::new();
    for record in refined {
        *by_category.entry(record.category).or_default() += 1;
    }

    let count = |category: Category| by_category.get(&category).copied().unwrap_or(0);

    let deltas: Vec<f64> = refined
        .iter()
        .map(|r| r.adjusted_mos - r.original_mos)
        .filter(|d| d.is_finite())
        .collect();
    let avg_mos_adjustment =
        (!deltas.is_empty()).then(|| deltas.iter().sum::<f64>() / deltas.len() as f64);

    RefinementSummary {
        total_reviewed: refined.len(),
        gems_count: count(Category::Gem),
        opportunities_count: count(Category::Opportunity),
        value_traps_count: count(Category::ValueTrapSuspect),
        avg_mos_adjustment,
        stocks_with_growth_adjustment: refined.iter().filter(|r| r.growth_adjusted).count(),
        by_category,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn candidate(ticker: &str, sector: &str, growth: f64, mos: f64) -> CandidateRecord {
        CandidateRecord {
            ticker: ticker.into(),
            price: 100.0,
            sector: sector.into(),
            roic: 0.20,
            health_score: 6,
            growth_estimate: growth,
            intrinsic_value: 100.0 / (1.0 - mos),
            margin_of_safety: mos,
        }
    }

    #[test]
    fn test_financial_services_is_bank_insurer() {
        let refiner = PortfolioRefiner::new();
        for mos in [0.9, 0.3, -0.5, f64::NAN] {
            let record = CandidateRecord {
                intrinsic_value: 150.0,
                ..candidate("JPM", "Financial Services", 0.14, mos)
            };
            let refined = refiner.refine_record(&record);
            assert_eq!(refined.category, Category::BankInsurer);
            assert_eq!(refined.adjusted_mos, 0.0);
            assert_eq!(refined.adjusted_intrinsic, 150.0);
            assert_eq!(refined.sector_growth_cap, 0.0);
            assert!(!refined.growth_adjusted);
            assert_eq!(refined.reason, FINANCIAL_REASON);
        }
    }

    #[test]
    fn test_utilities_growth_cap_rescales_intrinsic() {
        let record = CandidateRecord {
            ticker: "DUK".into(),
            price: 90.0,
            sector: "Utilities".into(),
            roic: 0.24,
            health_score: 5,
            growth_estimate: 0.12,
            intrinsic_value: 200.0,
            margin_of_safety: 0.55,
        };
        let refined = PortfolioRefiner::new().refine_record(&record);

        let factor = (1.05f64 / 1.12).powf(2.5);
        assert!((factor - 0.850_997).abs() < 1e-6);
        assert!((refined.adjusted_intrinsic - 200.0 * factor).abs() < 1e-9);
        assert!(refined.adjusted_intrinsic < refined.intrinsic_value);
        assert!(refined.growth_adjusted);
        assert_eq!(refined.sector_growth_cap, 0.05);

        let expected_mos = (refined.adjusted_intrinsic - 90.0) / refined.adjusted_intrinsic;
        assert!((refined.adjusted_mos - expected_mos).abs() < 1e-12);
        assert!(refined.reason.starts_with("growth capped from 12.0% to 5.0%"));
    }

    #[test]
    fn test_energy_deep_discount_is_value_trap() {
        // Energy cap 5%, growth 4% leaves MOS untouched at 0.70
        let refined =
            PortfolioRefiner::new().refine_record(&candidate("XOM", "Energy", 0.04, 0.70));
        assert_eq!(refined.adjusted_mos, 0.70);
        assert_eq!(refined.category, Category::ValueTrapSuspect);
        assert_eq!(refined.reason, DISTRESS_REASON);
    }

    #[test]
    fn test_override_keeps_cap_clause() {
        let mut record = candidate("NUE", "Basic Materials", 0.10, 0.80);
        record.intrinsic_value = 1000.0;
        let refined = PortfolioRefiner::new().refine_record(&record);
        assert!(refined.growth_adjusted);
        assert!(refined.adjusted_mos > DISTRESS_MOS);
        assert_eq!(refined.category, Category::ValueTrapSuspect);
        assert_eq!(
            refined.reason,
            format!("growth capped from 10.0% to 7.0%; {}", DISTRESS_REASON)
        );
    }

    #[test]
    fn test_growth_sectors_exempt_from_override() {
        let refined =
            PortfolioRefiner::new().refine_record(&candidate("MSFT", "Technology", 0.14, 0.70));
        assert_eq!(refined.category, Category::Gem);
        assert_eq!(refined.reason, "high quality at a fair price");
    }

    #[test_case(0.30, 0.20, 6 => Category::Gem ; "gem")]
    #[test_case(0.30, 0.20, 5 => Category::Opportunity ; "gem roic but low health")]
    #[test_case(0.30, 0.12, 9 => Category::Opportunity ; "opportunity")]
    #[test_case(0.30, 0.10, 9 => Category::ValueTrapSuspect ; "middling quality")]
    #[test_case(0.15, 0.50, 9 => Category::FairValue ; "discount boundary")]
    #[test_case(0.01, 0.50, 9 => Category::FairValue ; "fair")]
    #[test_case(0.0, 0.50, 9 => Category::ExpensivePostAdjustment ; "zero mos")]
    #[test_case(-0.99, 0.50, 9 => Category::ExpensivePostAdjustment ; "sentinel")]
    #[test_case(f64::NAN, 0.50, 9 => Category::ExpensivePostAdjustment ; "undefined mos")]
    fn test_classification(mos: f64, roic: f64, health: u8) -> Category {
        classify(mos, roic, health, false).0
    }

    #[test]
    fn test_expensive_reason_depends_on_adjustment() {
        assert_eq!(
            classify(-0.1, 0.2, 6, true).1,
            "no longer attractive after adjustment"
        );
        assert_eq!(classify(-0.1, 0.2, 6, false).1, "overvalued on adjusted DCF");
    }

    #[test]
    fn test_cap_pushes_into_expensive() {
        let record = CandidateRecord {
            ticker: "PG".into(),
            price: 100.0,
            sector: "Consumer Defensive".into(),
            roic: 0.28,
            health_score: 5,
            growth_estimate: 0.14,
            intrinsic_value: 110.0,
            margin_of_safety: 0.0909,
        };
        let refined = PortfolioRefiner::new().refine_record(&record);
        assert_eq!(refined.category, Category::ExpensivePostAdjustment);
        assert_eq!(
            refined.reason,
            "growth capped from 14.0% to 6.0%; no longer attractive after adjustment"
        );
    }

    #[test]
    fn test_non_positive_adjusted_intrinsic_uses_sentinel() {
        let mut record = candidate("ZERO", "Industrials", 0.12, 0.5);
        record.intrinsic_value = 0.0;
        let refined = PortfolioRefiner::new().refine_record(&record);
        assert_eq!(refined.adjusted_mos, UNDEFINED_MOS);
    }

    #[test]
    fn test_report_order_and_views() {
        let records = vec![
            candidate("EXP", "Technology", 0.05, -0.3),
            candidate("BANK", "Financial Services", 0.1, 0.4),
            candidate("GEM2", "Technology", 0.05, 0.25),
            candidate("TRAP", "Energy", 0.04, 0.75),
            candidate("GEM1", "Technology", 0.05, 0.45),
            candidate("FAIR", "Technology", 0.05, 0.05),
            CandidateRecord {
                roic: 0.12,
                ..candidate("OPP", "Technology", 0.05, 0.3)
            },
        ];
        let report = PortfolioRefiner::new().refine(&records);

        let order: Vec<&str> = report
            .refined_results
            .iter()
            .map(|r| r.ticker.as_str())
            .collect();
        assert_eq!(order, vec!["GEM1", "GEM2", "OPP", "FAIR", "TRAP", "BANK", "EXP"]);

        assert_eq!(report.gems.len(), 2);
        assert_eq!(report.opportunities.len(), 1);
        assert_eq!(report.value_traps[0].ticker, "TRAP");
        assert_eq!(report.summary.total_reviewed, 7);
        assert_eq!(report.summary.by_category[&Category::Gem], 2);
        assert_eq!(report.summary.stocks_with_growth_adjustment, 0);

        // only BANK moves: 0 - 0.4
        let avg = report.summary.avg_mos_adjustment.unwrap();
        assert!((avg - (-0.4 / 7.0)).abs() < 1e-12);
    }

    #[test]
    fn test_refinement_is_idempotent_on_unadjusted_input() {
        let records = vec![
            candidate("A", "Technology", 0.05, 0.3),
            candidate("B", "Industrials", 0.05, 0.1),
        ];
        let refiner = PortfolioRefiner::new();
        let first = refiner.refine(&records);

        let again: Vec<CandidateRecord> = first
            .refined_results
            .iter()
            .map(|r| CandidateRecord {
                ticker: r.ticker.clone(),
                price: r.price,
                sector: r.sector.clone(),
                roic: r.roic,
                health_score: r.health_score,
                growth_estimate: r.original_growth,
                intrinsic_value: r.adjusted_intrinsic,
                margin_of_safety: r.adjusted_mos,
            })
            .collect();
        let second = refiner.refine(&again);

        assert_eq!(first.refined_results, second.refined_results);
    }

    #[test]
    fn test_nan_mos_sorts_last_within_category() {
        let records = vec![
            candidate("NAN", "Technology", 0.05, f64::NAN),
            candidate("NEG", "Technology", 0.05, -0.5),
        ];
        let report = PortfolioRefiner::new().refine(&records);
        assert_eq!(report.refined_results[0].ticker, "NEG");
        assert_eq!(report.refined_results[1].ticker, "NAN");
        assert_eq!(report.summary.avg_mos_adjustment, Some(0.0));
    }

    #[test]
    fn test_refine_payload_accepts_legacy_columns() {
        let payload = json!({
            "results": [
                {"Ticker": "KO", "Price": 60.0, "Sector": "Consumer Defensive", "ROIC": 0.3,
                 "Piotroski": 5, "Growth_Est": 0.05, "Intrinsic": 80.0, "MOS": 0.25},
                {"ticker": "V", "price": 250.0, "sector": "Financial Services", "roic": 0.4,
                 "health_score": 5, "growth_estimate": 0.14, "intrinsic_value": 300.0,
                 "margin_of_safety": null}
            ]
        });
        let report = PortfolioRefiner::new().refine_payload(&payload).unwrap();
        assert_eq!(report.refined_results.len(), 2);
        assert_eq!(report.refined_results[0].category, Category::Opportunity);
        assert_eq!(report.refined_results[1].category, Category::BankInsurer);

        let text = serde_json::to_string(&report).unwrap();
        assert!(text.contains("\"original_mos\":null"));
    }

    #[test]
    fn test_refine_payload_rejects_bad_shapes() {
        let refiner = PortfolioRefiner::new();
        assert!(matches!(
            refiner.refine_payload(&json!({})),
            Err(RefineError::MissingResults)
        ));
        assert!(matches!(
            refiner.refine_payload(&json!({"results": "nope"})),
            Err(RefineError::ResultsNotArray)
        ));
        assert!(matches!(
            refiner.refine_payload(&json!({"results": []})),
            Err(RefineError::Empty)
        ));
        assert!(matches!(
            refiner.refine_payload(&json!({"results": [{"ticker": "X"}]})),
            Err(RefineError::InvalidRecord { index: 0, .. })
        ));
        assert!(matches!(
            refiner.refine_payload(&json!([1, 2])),
            Err(RefineError::MissingResults)
        ));
    }
}
