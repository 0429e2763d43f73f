//! Ticker universe acquisition.
//!
//! The scan universe is the union of the S&P 500 and Nasdaq-100 constituent
//! lists. Each remote list is optional: when fewer than
//! [`MIN_REMOTE_TICKERS`] symbols arrive, a hardcoded list of large caps is
//! merged in so a scan always has something to evaluate.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, warn};
use warren_common::config::DataConfig;

/// Below this many remote symbols the backup list is merged in.
pub const MIN_REMOTE_TICKERS: usize = 50;

/// Large caps used when remote lists are unreachable.
pub const BACKUP_TICKERS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA", "BRK-B", "LLY", "V", "TSM", "UNH",
    "AVGO", "JPM", "NVO", "WMT", "XOM", "MA", "JNJ", "PG", "HD", "MRK", "COST", "ABBV", "ORCL",
    "ASML", "CVX", "ADBE", "AMD", "KO", "PEP", "CRM", "BAC", "ACN", "CSCO", "NFLX", "MCD", "LIN",
    "AZN", "NKE", "DIS", "TMUS", "ABT", "DHR", "WFC", "INTC", "INTU", "QCOM", "CMCSA", "TXN",
    "VZ", "UPS", "PM", "NEE", "RTX", "MS", "HON", "AMGN", "UNP", "PFE", "LOW", "SPGI", "CAT",
    "IBM", "AMAT", "DE", "GS", "GE", "LMT", "PLD", "BLK", "SYK", "T", "ISRG", "BKNG", "ELV", "MDT",
    "TJX", "ADI", "NOW", "MMC", "CVS", "ADP", "VRTX", "LRCX", "UBER", "REGN", "PYPL", "ZTS", "CI",
];

/// Source of tickers to scan.
#[async_trait]
pub trait TickerUniverse: Send + Sync {
    /// Normalized, de-duplicated tickers. Never fails; falls back instead.
    async fn tickers(&self) -> Vec<String>;
}

/// Normalize symbols (`BRK.B` -> `BRK-B`), de-duplicate, sort, and cap.
pub fn normalize_tickers<I, S>(raw: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|t| t.as_ref().trim().trim_matches('"').replace('.', "-").to_uppercase())
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(limit)
        .collect()
}

// ============================================================================
// Static Universe
// ============================================================================

/// Fixed list of tickers.
pub struct StaticUniverse {
    tickers: Vec<String>,
}

impl StaticUniverse {
    pub fn new<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
        }
    }

    /// The hardcoded backup list.
    pub fn backup() -> Self {
        Self::new(BACKUP_TICKERS.iter().copied())
    }
}

#[async_trait]
impl TickerUniverse for StaticUniverse {
    async fn tickers(&self) -> Vec<String> {
        self.tickers.clone()
    }
}

// ============================================================================
// Remote Universe
// ============================================================================

/// Index constituent lists fetched over HTTP.
pub struct RemoteUniverse {
    client: reqwest::Client,
    sp500_url: String,
    nasdaq100_url: String,
    limit: usize,
}

impl RemoteUniverse {
    pub fn new(sp500_url: impl Into<String>, nasdaq100_url: impl Into<String>, limit: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            sp500_url: sp500_url.into(),
            nasdaq100_url: nasdaq100_url.into(),
            limit,
        }
    }

    /// Create from config
    pub fn from_config(config: &DataConfig, limit: usize) -> Self {
        Self::new(config.sp500_url.clone(), config.nasdaq100_url.clone(), limit)
    }

    async fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl TickerUniverse for RemoteUniverse {
    async fn tickers(&self) -> Vec<String> {
        let mut raw: Vec<String> = Vec::new();

        match self.fetch_text(&self.sp500_url).await {
            Ok(body) => {
                let symbols = parse_symbol_column(&body);
                info!(count = symbols.len(), "Loaded S&P 500 constituents");
                raw.extend(symbols);
            }
            Err(e) => warn!(error = %e, "Failed to load S&P 500 constituents"),
        }

        match self.fetch_text(&self.nasdaq100_url).await {
            Ok(body) => {
                let symbols = parse_first_column(&body);
                info!(count = symbols.len(), "Loaded Nasdaq-100 constituents");
                raw.extend(symbols);
            }
            Err(e) => warn!(error = %e, "Failed to load Nasdaq-100 constituents"),
        }

        let distinct = normalize_tickers(&raw, usize::MAX).len();
        if distinct < MIN_REMOTE_TICKERS {
            warn!(
                remote = distinct,
                backup = BACKUP_TICKERS.len(),
                "Remote universe too small, merging backup list"
            );
            raw.extend(BACKUP_TICKERS.iter().map(|t| t.to_string()));
        }

        normalize_tickers(&raw, self.limit)
    }
}

/// Extract the `Symbol` column of a CSV with a header row.
fn parse_symbol_column(body: &str) -> Vec<String> {
    let mut lines = body.lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };

    let Some(idx) = header
        .split(',')
        .position(|h| h.trim().trim_matches('"').eq_ignore_ascii_case("symbol"))
    else {
        return Vec::new();
    };

    lines
        .filter_map(|line| line.split(',').nth(idx))
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// First column of each line, skipping header lines mentioning "Symbol".
fn parse_first_column(body: &str) -> Vec<String> {
    body.lines()
        .filter(|line| !line.trim().is_empty() && !line.contains("Symbol"))
        .filter_map(|line| line.split(',').next())
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_normalize_tickers() {
        let tickers = normalize_tickers(["brk.b", "AAPL", " AAPL ", "BF.B", ""], 10);
        assert_eq!(tickers, vec!["AAPL", "BF-B", "BRK-B"]);
    }

    #[test]
    fn test_normalize_respects_limit() {
        let tickers = normalize_tickers(BACKUP_TICKERS.iter(), 5);
        assert_eq!(tickers.len(), 5);
    }

    #[test]
    fn test_parse_symbol_column() {
        let csv = "Symbol,Security,GICS Sector\nMMM,3M,Industrials\nAOS,A. O. Smith,Industrials\n";
        assert_eq!(parse_symbol_column(csv), vec!["MMM", "AOS"]);

        let reordered = "Name,\"Symbol\"\n3M,MMM\n";
        assert_eq!(parse_symbol_column(reordered), vec!["MMM"]);

        assert!(parse_symbol_column("Name,Sector\nfoo,bar\n").is_empty());
    }

    #[test]
    fn test_parse_first_column() {
        let body = "Symbol,Name\nAAPL,Apple Inc.\n\nMSFT,Microsoft\n";
        assert_eq!(parse_first_column(body), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_static_universe() {
        let universe = StaticUniverse::new(["AAPL", "MSFT"]);
        assert_eq!(tokio_test::block_on(universe.tickers()), vec!["AAPL", "MSFT"]);
        assert_eq!(
            tokio_test::block_on(StaticUniverse::backup().tickers()).len(),
            BACKUP_TICKERS.len()
        );
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_backup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let universe = RemoteUniverse::new(
            format!("{}/sp500.csv", server.uri()),
            format!("{}/ndx.csv", server.uri()),
            500,
        );
        let tickers = universe.tickers().await;
        assert_eq!(tickers.len(), BACKUP_TICKERS.len());
        assert!(tickers.contains(&"BRK-B".to_string()));
    }

    #[tokio::test]
    async fn test_remote_lists_are_merged() {
        let server = MockServer::start().await;
        let sp500: String = std::iter::once("Symbol,Security".to_string())
            .chain((0..60).map(|i| format!("S{i:02},Company {i}")))
            .collect::<Vec<_>>()
            .join("\n");
        Mock::given(method("GET"))
            .and(path("/sp500.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sp500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ndx.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Symbol,Name\nS00,dup\nBF.B,Brown\n"))
            .mount(&server)
            .await;

        let universe = RemoteUniverse::new(
            format!("{}/sp500.csv", server.uri()),
            format!("{}/ndx.csv", server.uri()),
            500,
        );
        let tickers = universe.tickers().await;
        assert_eq!(tickers.len(), 61);
        assert!(tickers.contains(&"BF-B".to_string()));
        assert!(!tickers.contains(&"AAPL".to_string()));
    }
}
