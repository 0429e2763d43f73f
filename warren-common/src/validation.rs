//! Configuration validation for the Warren screener.
//!
//! The binary validates the loaded configuration before building any
//! component, so an unusable value (a discount rate at or below the terminal
//! growth rate, a zero-sized worker pool) fails at startup instead of
//! producing undefined valuations mid-scan.

use thiserror::Error;

use crate::config::{
    CacheConfig, Config, NetworkConfig, ObservabilityConfig, ScreeningConfig, TERMINAL_GROWTH_RATE,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.network.validate() {
            errors.push(e);
        }

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if let Err(e) = self.screening.validate() {
            errors.push(e);
        }

        if let Err(e) = self.cache.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Load (with env overrides) and validate configuration.
    pub fn load_and_validate() -> anyhow::Result<Self> {
        let config = Self::load_with_env()?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(config)
    }
}

impl Validate for NetworkConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "network.port".into(),
            });
        }
        if self.bind.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "network.bind".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            });
        }

        Ok(())
    }
}

impl Validate for ScreeningConfig {
    fn validate(&self) -> ValidationResult<()> {
        let rate = self.discount_rate;
        if !rate.is_finite() || rate <= TERMINAL_GROWTH_RATE || rate >= 1.0 {
            return Err(ValidationError::InvalidValue {
                field: "screening.discount_rate".into(),
                reason: format!(
                    "must be greater than the terminal growth rate ({TERMINAL_GROWTH_RATE}) and below 1.0, got {rate}"
                ),
            });
        }

        if self.max_workers == 0 {
            return Err(ValidationError::InvalidValue {
                field: "screening.max_workers".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.min_health_score > 9 || self.quality_override_score > 9 {
            return Err(ValidationError::InvalidValue {
                field: "screening.min_health_score".into(),
                reason: "health scores range from 0 to 9".into(),
            });
        }

        if !self.min_roic.is_finite() || !self.margin_view_floor.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: "screening".into(),
                reason: "thresholds must be finite numbers".into(),
            });
        }

        if self.universe_limit == 0 {
            return Err(ValidationError::InvalidValue {
                field: "screening.universe_limit".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(())
    }
}

impl Validate for CacheConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_backends = ["sqlite", "memory"];
        if !valid_backends.contains(&self.backend.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "cache.backend".into(),
                reason: format!("must be one of: {}", valid_backends.join(", ")),
            });
        }

        if self.ttl_hours == 0 {
            return Err(ValidationError::InvalidValue {
                field: "cache.ttl_hours".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.key.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "cache.key".into(),
                reason: "must not be empty".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test_case(0.03 ; "equal to terminal growth")]
    #[test_case(0.02 ; "below terminal growth")]
    #[test_case(-0.05 ; "negative")]
    #[test_case(1.5 ; "above one")]
    #[test_case(f64::NAN ; "not a number")]
    fn test_rejects_discount_rate(rate: f64) {
        let mut config = Config::default();
        config.screening.discount_rate = rate;
        match config.validate() {
            Err(ValidationError::InvalidValue { field, .. }) => {
                assert_eq!(field, "screening.discount_rate")
            }
            other => panic!("expected discount rate rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_accepts_rate_just_above_terminal_growth() {
        let mut config = Config::default();
        config.screening.discount_rate = 0.0301;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.observability.log_level = "invalid".into();
        let result = config.validate();
        assert!(result.is_err());
        if let Err(ValidationError::InvalidValue { field, .. }) = result {
            assert_eq!(field, "observability.log_level");
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = Config::default();
        config.screening.max_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = Config::default();
        config.network.port = 0;
        config.cache.backend = "redis".into();
        match config.validate() {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }
}
