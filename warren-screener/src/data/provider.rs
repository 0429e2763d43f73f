//! Fundamentals provider abstraction.
//!
//! Defines the `FundamentalsProvider` trait the screener evaluates tickers
//! through. The production implementation is the Yahoo Finance adapter;
//! tests substitute in-memory providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::statements::FinancialStatements;

// ============================================================================
// Market Snapshot
// ============================================================================

/// Point-in-time market data for one ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Last trade price
    pub price: f64,
    /// Market capitalization in quote currency
    pub market_cap: f64,
    /// Shares outstanding
    pub shares_outstanding: f64,
}

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to fundamentals providers.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    Network(String),
    /// Rate limit exceeded
    RateLimited,
    /// Ticker unknown or the requested data is missing
    DataNotAvailable(String),
    /// Response could not be decoded
    Parse(String),
    /// Internal provider error
    Internal(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::RateLimited => write!(f, "Rate limited"),
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Network("Request timeout".into())
        } else if e.is_connect() {
            Self::Network("Connection failed".into())
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

// ============================================================================
// Fundamentals Provider Trait
// ============================================================================

/// Source of per-ticker market data and financial statements.
///
/// Each call is independent; implementations must be safe to call from many
/// concurrent scan tasks.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Provider name (e.g., "yahoo")
    fn name(&self) -> &'static str;

    /// Price, market cap, and share count.
    async fn snapshot(&self, ticker: &str) -> Result<MarketSnapshot, ProviderError>;

    /// Income, balance-sheet, and cash-flow tables, most-recent period first.
    async fn statements(&self, ticker: &str) -> Result<FinancialStatements, ProviderError>;

    /// Sector label, `None` when the provider does not classify the ticker.
    async fn sector(&self, ticker: &str) -> Result<Option<String>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        assert_eq!(
            ProviderError::Network("timeout".into()).to_string(),
            "Network error: timeout"
        );
        assert_eq!(ProviderError::RateLimited.to_string(), "Rate limited");
        assert_eq!(
            ProviderError::DataNotAvailable("ZZZZ".into()).to_string(),
            "Data not available: ZZZZ"
        );
    }
}
