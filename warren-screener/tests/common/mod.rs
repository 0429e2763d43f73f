//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use warren_common::config::Config;
use warren_screener::data::{
    FinancialStatements, FundamentalsProvider, MarketSnapshot, MemoryBlobStore, ProviderError,
    ResultCache, StatementTable, StaticUniverse,
};
use warren_screener::ScreenerState;

/// One scripted company.
#[derive(Clone)]
pub struct Fixture {
    pub snapshot: Result<MarketSnapshot, ProviderError>,
    pub statements: FinancialStatements,
    pub sector: Option<String>,
    pub panic_on_statements: bool,
}

/// Statements with ROIC ≈ 12.15%, health 5, and FCF 1000.
///
/// With 100 shares the two-stage DCF gives an intrinsic value near 181.
pub fn healthy_statements() -> FinancialStatements {
    FinancialStatements {
        income: StatementTable::from_rows([
            ("Net Income", vec![700.0, 600.0]),
            ("EBIT", vec![1000.0, 900.0]),
        ]),
        balance: StatementTable::from_rows([
            ("Stockholders Equity", vec![5000.0, 4800.0]),
            ("Total Debt", vec![2000.0, 2100.0]),
            ("Cash And Cash Equivalents", vec![500.0, 400.0]),
        ]),
        cash_flow: StatementTable::from_rows([
            ("Total Cash From Operating Activities", vec![1300.0, 1200.0]),
            ("Capital Expenditures", vec![-300.0, -250.0]),
        ]),
    }
}

pub fn company(price: f64, sector: &str) -> Fixture {
    Fixture {
        snapshot: Ok(MarketSnapshot {
            price,
            market_cap: 2e10,
            shares_outstanding: 100.0,
        }),
        statements: healthy_statements(),
        sector: Some(sector.to_string()),
        panic_on_statements: false,
    }
}

/// In-memory provider that tracks call counts and peak concurrency.
#[derive(Default)]
pub struct FixtureProvider {
    fixtures: HashMap<String, Fixture>,
    latency: Duration,
    snapshot_calls: AtomicU32,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ticker: &str, fixture: Fixture) -> Self {
        self.fixtures.insert(ticker.to_string(), fixture);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn snapshot_calls(&self) -> u32 {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn fixture(&self, ticker: &str) -> Result<&Fixture, ProviderError> {
        self.fixtures
            .get(ticker)
            .ok_or_else(|| ProviderError::DataNotAvailable(ticker.to_string()))
    }
}

#[async_trait]
impl FundamentalsProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn snapshot(&self, ticker: &str) -> Result<MarketSnapshot, ProviderError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.fixture(ticker)?.snapshot.clone()
    }

    async fn statements(&self, ticker: &str) -> Result<FinancialStatements, ProviderError> {
        let fixture = self.fixture(ticker)?;
        if fixture.panic_on_statements {
            panic!("fixture panic for {ticker}");
        }
        Ok(fixture.statements.clone())
    }

    async fn sector(&self, ticker: &str) -> Result<Option<String>, ProviderError> {
        Ok(self.fixture(ticker)?.sector.clone())
    }
}

/// Eight tickers: four candidates and one of each skip kind.
///
/// Expected candidate order by MOS: BBB, JPM, AAA, CCC.
pub fn mixed_provider() -> FixtureProvider {
    let mut small = company(150.0, "Industrials");
    small.snapshot = Ok(MarketSnapshot {
        price: 150.0,
        market_cap: 1e9,
        shares_outstanding: 100.0,
    });

    let mut broken = company(150.0, "Industrials");
    broken.snapshot = Err(ProviderError::RateLimited);

    let mut panicking = company(150.0, "Industrials");
    panicking.panic_on_statements = true;

    FixtureProvider::new()
        .with("AAA", company(150.0, "Industrials"))
        .with("BBB", company(100.0, "Technology"))
        .with("CCC", company(200.0, "Utilities"))
        .with("DDD", company(400.0, "Energy"))
        .with("EEE", small)
        .with("FFF", broken)
        .with("PANIC", panicking)
        .with("JPM", company(120.0, "Financial Services"))
}

pub fn mixed_tickers() -> Vec<String> {
    ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF", "PANIC", "JPM"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

pub fn memory_cache() -> ResultCache {
    ResultCache::new(
        Arc::new(MemoryBlobStore::new()),
        "screener_results",
        chrono::Duration::hours(24),
    )
}

pub fn state_with(
    provider: Arc<FixtureProvider>,
    tickers: Vec<String>,
    cache: ResultCache,
) -> ScreenerState {
    ScreenerState::with_components(
        Config::default(),
        provider,
        Arc::new(StaticUniverse::new(tickers)),
        cache,
    )
    .expect("default config is valid")
}
