//! Screener engine.
//!
//! Fans a ticker universe out over a bounded worker pool, collects the
//! per-ticker outcomes, and assembles a [`ScanOutcome`]. A single ticker can
//! never fail the scan: provider errors, gate rejections, and even panicking
//! tasks all end up as skips.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use warren_common::config::ScreeningConfig;
use warren_common::util::round_to;

use crate::data::FundamentalsProvider;
use crate::valuation::ValuationError;

use super::evaluator::TickerEvaluator;
use super::types::{
    descending_nan_last, CandidateRecord, EmptyScan, ScanOutcome, ScanResult, SkipReason,
    SkippedTicker, TickerOutcome, ZoneSummary,
};

/// Error message carried by a scan with no candidates.
pub const EMPTY_SCAN_MESSAGE: &str = "No stocks met the screening criteria";

/// The main screener engine.
pub struct ScreenerEngine {
    evaluator: Arc<TickerEvaluator>,
    max_workers: usize,
}

impl ScreenerEngine {
    /// Create an engine over `provider`. Fails when the configured discount
    /// rate cannot produce a terminal value.
    pub fn new(
        provider: Arc<dyn FundamentalsProvider>,
        config: ScreeningConfig,
    ) -> Result<Self, ValuationError> {
        let max_workers = config.max_workers.max(1);
        let evaluator = TickerEvaluator::new(provider, config)?;
        Ok(Self {
            evaluator: Arc::new(evaluator),
            max_workers,
        })
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Evaluate every ticker with at most `max_workers` in flight.
    ///
    /// Outcomes are returned in input order.
    pub async fn evaluate_all(&self, tickers: &[String]) -> Vec<TickerOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut join_set: JoinSet<(usize, TickerOutcome)> = JoinSet::new();

        for (idx, ticker) in tickers.iter().enumerate() {
            let evaluator = Arc::clone(&self.evaluator);
            let semaphore = Arc::clone(&semaphore);
            let ticker = ticker.clone();

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return (
                            idx,
                            TickerOutcome::skipped(ticker, SkipReason::TaskFailed(e.to_string())),
                        )
                    }
                };
                let outcome = evaluator.evaluate(&ticker).await;
                (idx, outcome)
            });
        }

        let mut slots: Vec<Option<TickerOutcome>> = vec![None; tickers.len()];

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(join_error) => {
                    warn!(error = %join_error, "Ticker evaluation task failed");
                }
            }
        }

        // A slot left empty belongs to a task that panicked
        slots
            .into_iter()
            .zip(tickers)
            .map(|(slot, ticker)| {
                slot.unwrap_or_else(|| {
                    TickerOutcome::skipped(
                        ticker.clone(),
                        SkipReason::TaskFailed("task panicked".into()),
                    )
                })
            })
            .collect()
    }

    /// Run a full scan over `tickers`.
    pub async fn run_scan(&self, tickers: Vec<String>) -> ScanOutcome {
        let started = Instant::now();
        let started_at = Utc::now();
        let scan_id = format!("scan_{}", started_at.format("%Y%m%d_%H%M%S"));

        info!(
            scan_id = %scan_id,
            universe = tickers.len(),
            max_workers = self.max_workers,
            provider = self.evaluator.provider_name(),
            "Starting universe scan"
        );

        let outcomes = self.evaluate_all(&tickers).await;

        let mut candidates: Vec<CandidateRecord> = Vec::new();
        let mut skipped: Vec<SkippedTicker> = Vec::new();
        for outcome in outcomes {
            match outcome {
                TickerOutcome::Candidate(record) => candidates.push(record),
                TickerOutcome::Skipped(skip) => skipped.push(skip),
            }
        }

        // sort_by is stable, so equal MOS keeps dispatch order
        candidates.sort_by(|a, b| descending_nan_last(a.margin_of_safety, b.margin_of_safety));

        let mut skip_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for skip in &skipped {
            *skip_counts.entry(skip.reason.kind()).or_default() += 1;
        }

        let execution_time_seconds = round_to(started.elapsed().as_secs_f64(), 2);
        let generated_at = Utc::now();

        info!(
            scan_id = %scan_id,
            total_analyzed = tickers.len(),
            candidates = candidates.len(),
            skipped = skipped.len(),
            skip_reasons = ?skip_counts,
            duration = format!("{:.1}s", execution_time_seconds),
            "Universe scan complete"
        );

        if candidates.is_empty() {
            return ScanOutcome::Empty(EmptyScan {
                error: EMPTY_SCAN_MESSAGE.to_string(),
                total_analyzed: tickers.len(),
                candidates_count: 0,
                generated_at,
                execution_time_seconds,
                from_cache: false,
                skipped,
            });
        }

        ScanOutcome::Completed(ScanResult {
            scan_id,
            total_analyzed: tickers.len(),
            candidates_count: candidates.len(),
            summary: ZoneSummary::from_records(&candidates),
            results: candidates,
            generated_at,
            execution_time_seconds,
            cache_enabled: false,
            from_cache: false,
            skipped,
        })
    }
}
