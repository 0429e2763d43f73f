//! Screener result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Sector label used when the provider has no classification.
pub const UNKNOWN_SECTOR: &str = "N/A";

/// Margin of safety above which a candidate counts as "buy zone".
pub const BUY_ZONE_MOS: f64 = 0.10;

// ============================================================================
// Candidate Record
// ============================================================================

/// A ticker that passed every admission gate.
///
/// Input also accepts the column names of the legacy JSON export
/// (`Ticker`, `ROIC`, `Piotroski`, `MOS`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(alias = "Ticker")]
    pub ticker: String,

    /// Last price, rounded to cents
    #[serde(alias = "Price")]
    pub price: f64,

    #[serde(alias = "Sector", default = "default_sector")]
    pub sector: String,

    /// Return on invested capital (fraction)
    #[serde(alias = "ROIC")]
    pub roic: f64,

    /// Quick health score (0-5 populated)
    #[serde(alias = "Piotroski")]
    pub health_score: u8,

    /// Long-run growth derived from ROIC, clamped to [0.03, 0.14]
    #[serde(alias = "Growth_Est")]
    pub growth_estimate: f64,

    /// Per-share intrinsic value, 0 when the DCF was not applicable
    #[serde(alias = "Intrinsic")]
    pub intrinsic_value: f64,

    /// (intrinsic - price) / intrinsic, -0.99 when intrinsic <= 0.
    /// `null` in external payloads reads as NaN and serializes back to `null`.
    #[serde(alias = "MOS", deserialize_with = "nullable_f64")]
    pub margin_of_safety: f64,
}

fn default_sector() -> String {
    UNKNOWN_SECTOR.to_string()
}

fn nullable_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Descending order with NaN after every number.
pub fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

// ============================================================================
// Zone Summary
// ============================================================================

/// Candidate counts by margin-of-safety band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSummary {
    /// MOS > 0.10
    pub buy_zone_count: usize,
    /// 0 < MOS <= 0.10
    pub fair_zone_count: usize,
    /// MOS <= 0
    pub watch_zone_count: usize,
}

impl ZoneSummary {
    /// Partition candidates into bands. NaN MOS falls in none of them.
    pub fn from_records(records: &[CandidateRecord]) -> Self {
        let mut summary = Self::default();
        for mos in records.iter().map(|r| r.margin_of_safety) {
            if mos > BUY_ZONE_MOS {
                summary.buy_zone_count += 1;
            } else if mos > 0.0 {
                summary.fair_zone_count += 1;
            } else if mos <= 0.0 {
                summary.watch_zone_count += 1;
            }
        }
        summary
    }
}

// ============================================================================
// Per-Ticker Outcome
// ============================================================================

/// Why a ticker did not produce a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Price/market cap lookup failed
    MarketData(String),
    /// Market cap under the configured floor
    BelowMarketCap { market_cap: f64 },
    /// Statement download failed
    Statements(String),
    /// One of the three statements came back empty
    MissingStatements,
    /// A required line item could not be resolved
    MissingField(&'static str),
    /// Gate 1
    RoicBelowMinimum { roic: f64 },
    /// Gate 2
    HealthBelowMinimum { score: u8 },
    /// Gate 3
    OutsideMarginView { margin_of_safety: f64, health_score: u8 },
    /// The evaluation task panicked or was aborted
    TaskFailed(String),
}

impl SkipReason {
    /// Stable short tag for aggregate counts.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MarketData(_) => "market_data",
            Self::BelowMarketCap { .. } => "below_market_cap",
            Self::Statements(_) => "statements",
            Self::MissingStatements => "missing_statements",
            Self::MissingField(_) => "missing_field",
            Self::RoicBelowMinimum { .. } => "roic",
            Self::HealthBelowMinimum { .. } => "health",
            Self::OutsideMarginView { .. } => "margin_view",
            Self::TaskFailed(_) => "task_failed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarketData(msg) => write!(f, "market data unavailable: {}", msg),
            Self::BelowMarketCap { market_cap } => {
                write!(f, "market cap {:.0} below floor", market_cap)
            }
            Self::Statements(msg) => write!(f, "statements unavailable: {}", msg),
            Self::MissingStatements => write!(f, "incomplete financial statements"),
            Self::MissingField(field) => write!(f, "missing line item: {}", field),
            Self::RoicBelowMinimum { roic } => write!(f, "ROIC {:.4} below minimum", roic),
            Self::HealthBelowMinimum { score } => write!(f, "health score {} below minimum", score),
            Self::OutsideMarginView {
                margin_of_safety,
                health_score,
            } => write!(
                f,
                "margin of safety {:.4} below floor with health score {}",
                margin_of_safety, health_score
            ),
            Self::TaskFailed(msg) => write!(f, "evaluation task failed: {}", msg),
        }
    }
}

/// A ticker that was evaluated but excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: SkipReason,
}

/// Result of evaluating one ticker.
#[derive(Debug, Clone, PartialEq)]
pub enum TickerOutcome {
    Candidate(CandidateRecord),
    Skipped(SkippedTicker),
}

impl TickerOutcome {
    pub fn skipped(ticker: impl Into<String>, reason: SkipReason) -> Self {
        Self::Skipped(SkippedTicker {
            ticker: ticker.into(),
            reason,
        })
    }
}

// ============================================================================
// Scan Result
// ============================================================================

/// A completed scan with at least one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default)]
    pub scan_id: String,
    /// Universe size
    pub total_analyzed: usize,
    pub candidates_count: usize,
    /// Sorted by margin of safety, descending, NaN last
    pub results: Vec<CandidateRecord>,
    pub summary: ZoneSummary,
    pub generated_at: DateTime<Utc>,
    pub execution_time_seconds: f64,
    #[serde(default)]
    pub cache_enabled: bool,
    #[serde(default)]
    pub from_cache: bool,
    /// Exclusion reasons, kept in memory only
    #[serde(skip)]
    pub skipped: Vec<SkippedTicker>,
}

/// A completed scan where nothing met the bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyScan {
    pub error: String,
    pub total_analyzed: usize,
    pub candidates_count: usize,
    pub generated_at: DateTime<Utc>,
    pub execution_time_seconds: f64,
    pub from_cache: bool,
    #[serde(skip)]
    pub skipped: Vec<SkippedTicker>,
}

/// Outcome of a scan. Serializes as the inner payload.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScanOutcome {
    Completed(ScanResult),
    Empty(EmptyScan),
}

impl ScanOutcome {
    pub fn total_analyzed(&self) -> usize {
        match self {
            Self::Completed(r) => r.total_analyzed,
            Self::Empty(e) => e.total_analyzed,
        }
    }

    pub fn candidates(&self) -> &[CandidateRecord] {
        match self {
            Self::Completed(r) => &r.results,
            Self::Empty(_) => &[],
        }
    }

    pub fn skipped(&self) -> &[SkippedTicker] {
        match self {
            Self::Completed(r) => &r.skipped,
            Self::Empty(e) => &e.skipped,
        }
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        match self {
            Self::Completed(r) => r.generated_at,
            Self::Empty(e) => e.generated_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
