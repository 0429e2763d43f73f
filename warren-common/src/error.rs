//! Error types for the Warren screener.

use thiserror::Error;

/// Result type alias using the Warren error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type surfaced at service boundaries.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required component is disabled or unreachable
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Cache backend error
    #[error("Cache error: {0}")]
    Cache(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Unavailable(_) => 503,
            Self::Cache(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::InvalidInput("test".into()).status_code(), 400);
        assert_eq!(Error::Unavailable("test".into()).status_code(), 503);
        assert_eq!(Error::Cache("test".into()).status_code(), 500);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::InvalidInput("missing results".into()).to_string(),
            "Invalid input: missing results"
        );
    }
}
