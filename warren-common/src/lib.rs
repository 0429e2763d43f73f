//! Warren Common - Shared configuration, errors, and logging for the Warren screener.
//!
//! This crate provides:
//! - Configuration types and loading (`~/.warren/config.json` + `WARREN_*` env)
//! - Configuration validation
//! - Error types and HTTP status mapping
//! - Logging setup with noise filtering
//! - Small numeric and parsing helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    CacheConfig, Config, DataConfig, NetworkConfig, ObservabilityConfig, ScreeningConfig,
};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};
