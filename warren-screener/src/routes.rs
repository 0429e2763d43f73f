//! HTTP routes for the screener service.
//!
//! Every float in a response goes through serde_json, which writes NaN and
//! infinities as `null`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{warn, Instrument};
use warren_common::config::TERMINAL_GROWTH_RATE;
use warren_common::request_span;
use warren_common::util::format_percent;

use crate::data::CacheStatus;
use crate::refiner::{RefineError, RefinementReport};
use crate::screener::ScanOutcome;
use crate::{ScanSource, ScreenerState};

/// Service name reported by `/` and `/health`.
pub const SERVICE_NAME: &str = "warren-screener";

// ============================================================================
// Error Response
// ============================================================================

/// Handler error rendered as `{ "error": "..." }` with a mapped status.
#[derive(Debug)]
pub struct ApiError(warren_common::Error);

impl From<warren_common::Error> for ApiError {
    fn from(e: warren_common::Error) -> Self {
        Self(e)
    }
}

impl From<RefineError> for ApiError {
    fn from(e: RefineError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "Request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
    pub cache_available: bool,
}

#[derive(Debug, Serialize)]
pub struct CacheInfo {
    pub enabled: bool,
    pub backend: Option<&'static str>,
    pub ttl_hours: f64,
}

#[derive(Debug, Serialize)]
pub struct FilterInfo {
    pub min_market_cap: f64,
    pub min_roic: f64,
    pub min_health_score: u8,
    pub quality_override_score: u8,
    pub margin_view_floor: f64,
    pub discount_rate: f64,
    pub terminal_growth_rate: f64,
    pub max_workers: usize,
    pub universe_limit: usize,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
    pub cache: CacheInfo,
    pub methodology: Vec<String>,
    pub filters: FilterInfo,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub struct RefineResponse {
    pub status: String,
    pub source: ScanSource,
    pub generated_at: DateTime<Utc>,
    pub refined_data: RefinementReport,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub status: String,
    pub message: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Service description.
pub async fn home(State(state): State<Arc<ScreenerState>>) -> Json<ServiceInfo> {
    let screening = &state.config.screening;

    let methodology = vec![
        format!(
            "ROIC of at least {} (after-tax EBIT over invested capital)",
            format_percent(screening.min_roic)
        ),
        format!(
            "Health score of at least {} on the five-point quick test",
            screening.min_health_score
        ),
        format!(
            "Two-stage DCF at a {} discount rate with {} terminal growth",
            format_percent(screening.discount_rate),
            format_percent(TERMINAL_GROWTH_RATE)
        ),
        "Growth estimated as half of ROIC, bounded to 3%-14%".to_string(),
        "Margin of safety measured against the current price".to_string(),
        "Sector-aware refinement caps growth per sector and tiers the results".to_string(),
    ];

    let endpoints = BTreeMap::from([
        ("/", "Service information"),
        ("/analyze", "Run the screen (cached for the TTL)"),
        ("/refine", "GET: refine the latest scan; POST: refine a supplied payload"),
        ("/post-process", "Refine a supplied payload"),
        ("/cache-status", "Inspect the result cache"),
        ("/clear-cache", "Delete the cached scan"),
        ("/health", "Health check"),
    ]);

    let status = state.cache.status().await;

    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        cache: CacheInfo {
            enabled: status.cache_enabled,
            backend: status.backend,
            ttl_hours: status.ttl_hours,
        },
        methodology,
        filters: FilterInfo {
            min_market_cap: screening.min_market_cap,
            min_roic: screening.min_roic,
            min_health_score: screening.min_health_score,
            quality_override_score: screening.quality_override_score,
            margin_view_floor: screening.margin_view_floor,
            discount_rate: screening.discount_rate,
            terminal_growth_rate: TERMINAL_GROWTH_RATE,
            max_workers: screening.max_workers,
            universe_limit: screening.universe_limit,
        },
        endpoints,
    })
}

/// Latest scan, from cache when fresh.
pub async fn analyze(State(state): State<Arc<ScreenerState>>) -> Json<ScanOutcome> {
    async move {
        let (outcome, _) = state.latest_scan().await;
        Json(outcome)
    }
    .instrument(request_span!("/analyze"))
    .await
}

/// Refine the latest scan. An empty scan is a 404 carrying the scan body.
pub async fn refine_latest(State(state): State<Arc<ScreenerState>>) -> Response {
    async move {
        let (outcome, source) = state.latest_scan().await;

        match outcome {
            ScanOutcome::Completed(scan) => {
                let report = state.refiner.refine(&scan.results);
                Json(RefineResponse {
                    status: "success".to_string(),
                    source,
                    generated_at: scan.generated_at,
                    refined_data: report,
                })
                .into_response()
            }
            empty @ ScanOutcome::Empty(_) => (StatusCode::NOT_FOUND, Json(empty)).into_response(),
        }
    }
    .instrument(request_span!("/refine"))
    .await
}

/// Refine a caller-supplied `{ "results": [...] }` payload.
pub async fn refine_payload(
    State(state): State<Arc<ScreenerState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RefineResponse>, ApiError> {
    let Json(payload) = payload
        .map_err(|rejection| warren_common::Error::InvalidInput(rejection.body_text()))?;

    let report = state.refiner.refine_payload(&payload)?;

    Ok(Json(RefineResponse {
        status: "success".to_string(),
        source: ScanSource::Payload,
        generated_at: Utc::now(),
        refined_data: report,
    }))
}

/// Cache slot inspection.
pub async fn cache_status(State(state): State<Arc<ScreenerState>>) -> Json<CacheStatus> {
    Json(state.cache.status().await)
}

/// Delete the cached scan.
pub async fn clear_cache(
    State(state): State<Arc<ScreenerState>>,
) -> Result<Json<ClearCacheResponse>, ApiError> {
    let removed = state.cache.clear().await?;
    let message = if removed {
        "Cache cleared successfully"
    } else {
        "No cache to clear"
    };

    Ok(Json(ClearCacheResponse {
        status: "success".to_string(),
        message: message.to_string(),
    }))
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<ScreenerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: SERVICE_NAME.to_string(),
        timestamp: Utc::now(),
        cache_available: state.cache.is_enabled(),
    })
}
