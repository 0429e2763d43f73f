//! Configuration management for the Warren screener.
//!
//! The service reads a single JSON file at `~/.warren/config.json`. Every
//! field has a default, so a missing file (or a partial one) is valid.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (WARREN_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `PORT` / `WARREN_PORT` → network.port (`WARREN_PORT` wins)
//! - `WARREN_BIND_ADDRESS` → network.bind
//! - `WARREN_LOG_LEVEL` → observability.log_level
//! - `WARREN_LOG_FORMAT` → observability.log_format
//! - `WARREN_CACHE_PATH` → cache.db_path
//! - `WARREN_CACHE_TTL` → cache.ttl_hours (duration string: `24h`, `90m`, `2d`)
//! - `WARREN_DISCOUNT_RATE` → screening.discount_rate
//! - `WARREN_MAX_WORKERS` → screening.max_workers

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::util::parse_duration_secs;

/// Perpetual growth rate of the DCF terminal stage.
///
/// Discount rates at or below this value make the terminal value undefined.
pub const TERMINAL_GROWTH_RATE: f64 = 0.03;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".warren"),
        |dirs| dirs.home_dir().join(".warren"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address. Default: "0.0.0.0" (container friendly)
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Listen port. Default: 8080
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets pinned to `warn`.
    ///
    /// Built-in noisy modules (hyper, reqwest, h2, rustls, rusqlite) are
    /// always filtered; this list adds to them.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Screening Configuration
// ============================================================================

/// Admission thresholds and valuation parameters for a scan.
///
/// Passed by value into the orchestrator and valuator at construction; nothing
/// reads these from global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningConfig {
    /// Concurrent per-ticker evaluations.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Minimum ROIC to enter the candidate list (fraction).
    #[serde(default = "default_min_roic")]
    pub min_roic: f64,

    /// Minimum quick health score (0-9 scale, 0-5 populated).
    #[serde(default = "default_min_health_score")]
    pub min_health_score: u8,

    /// Health score that admits a candidate regardless of its margin of safety.
    #[serde(default = "default_quality_override_score")]
    pub quality_override_score: u8,

    /// Annual discount rate for the DCF. Must exceed the 3% terminal growth.
    #[serde(default = "default_discount_rate")]
    pub discount_rate: f64,

    /// Lowest margin of safety still admitted without the quality override.
    #[serde(default = "default_margin_view_floor")]
    pub margin_view_floor: f64,

    /// Market capitalization floor, in quote currency units.
    #[serde(default = "default_min_market_cap")]
    pub min_market_cap: f64,

    /// Maximum tickers taken from the universe.
    #[serde(default = "default_universe_limit")]
    pub universe_limit: usize,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            min_roic: default_min_roic(),
            min_health_score: default_min_health_score(),
            quality_override_score: default_quality_override_score(),
            discount_rate: default_discount_rate(),
            margin_view_floor: default_margin_view_floor(),
            min_market_cap: default_min_market_cap(),
            universe_limit: default_universe_limit(),
        }
    }
}

fn default_max_workers() -> usize {
    12
}

fn default_min_roic() -> f64 {
    0.08
}

fn default_min_health_score() -> u8 {
    5
}

fn default_quality_override_score() -> u8 {
    7
}

fn default_discount_rate() -> f64 {
    0.09
}

fn default_margin_view_floor() -> f64 {
    -0.20
}

fn default_min_market_cap() -> f64 {
    5e9
}

fn default_universe_limit() -> usize {
    500
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable the result cache. When false every request rescans.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Backend: "sqlite" or "memory"
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// SQLite database path. Default: ~/.warren/cache.db
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Key of the single cache slot.
    #[serde(default = "default_cache_key")]
    pub key: String,

    /// Entry lifetime in hours.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: default_cache_backend(),
            db_path: None,
            key: default_cache_key(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

impl CacheConfig {
    /// Resolved SQLite path (configured or `~/.warren/cache.db`).
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| config_dir().join("cache.db"))
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_backend() -> String {
    "sqlite".into()
}

fn default_cache_key() -> String {
    "screener_results".into()
}

fn default_ttl_hours() -> u64 {
    24
}

// ============================================================================
// Data Source Configuration
// ============================================================================

/// Market data and universe source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Base URL of the quote/fundamentals API.
    #[serde(default = "default_quote_base_url")]
    pub quote_base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// S&P 500 constituents CSV (must contain a `Symbol` column).
    #[serde(default = "default_sp500_url")]
    pub sp500_url: String,

    /// Nasdaq-100 symbol list (symbol in the first column).
    #[serde(default = "default_nasdaq100_url")]
    pub nasdaq100_url: String,

    /// User-Agent sent to upstream APIs.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            quote_base_url: default_quote_base_url(),
            request_timeout_secs: default_request_timeout(),
            sp500_url: default_sp500_url(),
            nasdaq100_url: default_nasdaq100_url(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_quote_base_url() -> String {
    "https://query2.finance.yahoo.com".into()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_sp500_url() -> String {
    "https://raw.githubusercontent.com/datasets/s-and-p-500-companies/master/data/constituents.csv"
        .into()
}

fn default_nasdaq100_url() -> String {
    "https://raw.githubusercontent.com/nasdaq-100/nasdaq-100-symbols/master/nasdaq-100-symbols.csv"
        .into()
}

fn default_user_agent() -> String {
    concat!("warren-screener/", env!("CARGO_PKG_VERSION")).into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub screening: ScreeningConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub data: DataConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// Unparseable values are ignored with a warning and the previous value kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in ["PORT", "WARREN_PORT"] {
            if let Some(port) = lookup(key) {
                match port.parse() {
                    Ok(p) => self.network.port = p,
                    Err(_) => tracing::warn!(key, value = %port, "Ignoring invalid port override"),
                }
            }
        }

        if let Some(bind) = lookup("WARREN_BIND_ADDRESS") {
            self.network.bind = bind;
        }

        if let Some(level) = lookup("WARREN_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Some(format) = lookup("WARREN_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Some(path) = lookup("WARREN_CACHE_PATH") {
            self.cache.db_path = Some(PathBuf::from(path));
        }

        if let Some(ttl) = lookup("WARREN_CACHE_TTL") {
            match parse_duration_secs(&ttl) {
                Ok(secs) => self.cache.ttl_hours = secs.div_ceil(3600),
                Err(e) => tracing::warn!(value = %ttl, error = %e, "Ignoring invalid cache TTL"),
            }
        }

        if let Some(rate) = lookup("WARREN_DISCOUNT_RATE") {
            match rate.parse() {
                Ok(r) => self.screening.discount_rate = r,
                Err(_) => tracing::warn!(value = %rate, "Ignoring invalid discount rate"),
            }
        }

        if let Some(workers) = lookup("WARREN_MAX_WORKERS") {
            match workers.parse() {
                Ok(w) => self.screening.max_workers = w,
                Err(_) => tracing::warn!(value = %workers, "Ignoring invalid worker count"),
            }
        }
    }

    /// Socket address string for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.network.bind, self.network.port)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_screening_policy() {
        let config = Config::default();
        assert_eq!(config.network.port, 8080);
        assert_eq!(config.screening.max_workers, 12);
        assert!((config.screening.min_roic - 0.08).abs() < f64::EPSILON);
        assert_eq!(config.screening.min_health_score, 5);
        assert!((config.screening.discount_rate - 0.09).abs() < f64::EPSILON);
        assert!((config.screening.margin_view_floor + 0.20).abs() < f64::EPSILON);
        assert_eq!(config.cache.ttl_hours, 24);
        assert_eq!(config.cache.key, "screener_results");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"screening": {"discount_rate": 0.1}, "observability": {"level": "debug"}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!((config.screening.discount_rate - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.screening.max_workers, 12);
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.cache.backend, "sqlite");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "9000"),
            ("WARREN_PORT", "9100"),
            ("WARREN_CACHE_TTL", "90m"),
            ("WARREN_DISCOUNT_RATE", "0.1"),
            ("WARREN_MAX_WORKERS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.network.port, 9100);
        assert_eq!(config.cache.ttl_hours, 2);
        assert!((config.screening.discount_rate - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.screening.max_workers, 12);
    }

    #[test]
    fn test_invalid_cache_ttl_is_ignored() {
        for ttl in ["5µ", "99999999999999999999d", "213503982334602d"] {
            let mut config = Config::default();
            config.apply_overrides(|k| (k == "WARREN_CACHE_TTL").then(|| ttl.to_string()));
            assert_eq!(config.cache.ttl_hours, 24, "{ttl}");
        }
    }

    #[test]
    fn test_resolved_db_path() {
        let mut cache = CacheConfig::default();
        assert!(cache.resolved_db_path().ends_with("cache.db"));

        cache.db_path = Some(PathBuf::from("/tmp/x.db"));
        assert_eq!(cache.resolved_db_path(), PathBuf::from("/tmp/x.db"));
    }
}
