//! Universe screening.
//!
//! Each ticker passes through the [`TickerEvaluator`] gates; the
//! [`ScreenerEngine`] runs evaluations concurrently and assembles the
//! ranked scan.

pub mod engine;
pub mod evaluator;
pub mod types;

pub use engine::{ScreenerEngine, EMPTY_SCAN_MESSAGE};
pub use evaluator::TickerEvaluator;
pub use types::{
    descending_nan_last, CandidateRecord, EmptyScan, ScanOutcome, ScanResult, SkipReason,
    SkippedTicker, TickerOutcome, ZoneSummary, BUY_ZONE_MOS, UNKNOWN_SECTOR,
};
