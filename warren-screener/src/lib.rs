//! Warren Screener Library
//!
//! Value-stock screening over a large-cap US universe: quality gates (ROIC
//! and a quick health score), a two-stage DCF, a 24-hour result cache, and a
//! sector-aware refinement pass.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   warren-screener (HTTP service)                    │
//! │                              :8080                                  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐     │
//! │  │   Universe   │──▶│ScreenerEngine│──▶│ ResultCache (SQLite) │     │
//! │  └──────────────┘   │  JoinSet +   │   └──────────┬───────────┘     │
//! │                     │  Semaphore   │              │                 │
//! │  ┌──────────────┐   └──────┬───────┘   ┌──────────▼───────────┐     │
//! │  │ Fundamentals │◀─────────┘           │  PortfolioRefiner    │     │
//! │  │ Provider     │                      │  (sector caps, tiers)│     │
//! │  └──────────────┘                      └──────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod refiner;
pub mod routes;
pub mod screener;
pub mod valuation;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use warren_common::config::Config;

use crate::data::{
    FundamentalsProvider, RemoteUniverse, ResultCache, TickerUniverse, YahooFinanceAdapter,
};
use crate::refiner::PortfolioRefiner;
use crate::screener::{ScanOutcome, ScreenerEngine};

/// Largest accepted request body (refinement payloads).
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Where a scan served to a caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    Cache,
    FreshScan,
    Payload,
}

/// Screener service state
pub struct ScreenerState {
    /// Configuration
    pub config: Config,
    /// Concurrent per-ticker evaluation
    pub engine: ScreenerEngine,
    /// Ticker list source
    pub universe: Arc<dyn TickerUniverse>,
    /// Single-slot scan cache
    pub cache: ResultCache,
    /// Second-pass reviewer
    pub refiner: PortfolioRefiner,
}

impl ScreenerState {
    /// Build the production state: Yahoo provider, remote universe, configured cache.
    pub fn new(config: Config) -> Result<Self> {
        let provider: Arc<dyn FundamentalsProvider> =
            Arc::new(YahooFinanceAdapter::from_config(&config.data));
        let universe: Arc<dyn TickerUniverse> = Arc::new(RemoteUniverse::from_config(
            &config.data,
            config.screening.universe_limit,
        ));
        let cache = ResultCache::from_config(&config.cache);

        Self::with_components(config, provider, universe, cache)
    }

    /// Build state from explicit components.
    pub fn with_components(
        config: Config,
        provider: Arc<dyn FundamentalsProvider>,
        universe: Arc<dyn TickerUniverse>,
        cache: ResultCache,
    ) -> Result<Self> {
        let engine = ScreenerEngine::new(provider, config.screening.clone())
            .context("Invalid screening configuration")?;

        Ok(Self {
            config,
            engine,
            universe,
            cache,
            refiner: PortfolioRefiner::new(),
        })
    }

    /// Cached scan when fresh, otherwise a new scan.
    ///
    /// Completed scans are written back to the cache; empty scans are not.
    pub async fn latest_scan(&self) -> (ScanOutcome, ScanSource) {
        if let Some(cached) = self.cache.read().await {
            return (ScanOutcome::Completed(cached), ScanSource::Cache);
        }

        let tickers = self.universe.tickers().await;
        let mut outcome = self.engine.run_scan(tickers).await;

        if let ScanOutcome::Completed(result) = &mut outcome {
            result.cache_enabled = self.cache.is_enabled();
            self.cache.write(result).await;
        }

        (outcome, ScanSource::FreshScan)
    }
}

/// Build the HTTP router over shared state.
pub fn build_router(state: Arc<ScreenerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::home))
        .route("/analyze", get(routes::analyze))
        .route(
            "/refine",
            get(routes::refine_latest).post(routes::refine_payload),
        )
        .route("/post-process", post(routes::refine_payload))
        .route("/cache-status", get(routes::cache_status))
        .route("/clear-cache", get(routes::clear_cache))
        .route("/health", get(routes::health))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Main screener service
pub struct ScreenerService {
    state: Arc<ScreenerState>,
}

impl ScreenerService {
    /// Create a new screener service
    pub fn new(config: Config) -> Result<Self> {
        let state = Arc::new(ScreenerState::new(config)?);
        Ok(Self { state })
    }

    pub fn state(&self) -> Arc<ScreenerState> {
        Arc::clone(&self.state)
    }

    /// Start the screener service
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .state
            .config
            .listen_addr()
            .parse()
            .context("Invalid listen address")?;

        tracing::info!(
            address = %addr,
            cache_enabled = self.state.cache.is_enabled(),
            max_workers = self.state.engine.max_workers(),
            "Starting HTTP server"
        );

        let app = build_router(Arc::clone(&self.state));

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
