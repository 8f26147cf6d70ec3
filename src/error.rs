//! Error types and handling for the TRON weather server

use thiserror::Error;

use crate::providers::{ProviderError, ResolutionError};

/// Main error type for the TRON application
#[derive(Error, Debug)]
pub enum TronError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Location could not be resolved
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Weather provider failed to deliver a forecast
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TronError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Stable machine readable code, used in API error bodies
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            TronError::Config { .. } => "CONFIG",
            TronError::Resolution(ResolutionError::UnknownProvider(_)) => "UNKNOWN_PROVIDER",
            TronError::Resolution(ResolutionError::UnknownLocation(_)) => "UNKNOWN_LOCATION",
            TronError::Resolution(ResolutionError::EmptyQuery) => "EMPTY_QUERY",
            TronError::Resolution(_) => "LOCATION_SOURCE",
            TronError::Provider(ProviderError::RateLimited(_)) => "RATE_LIMITED",
            TronError::Provider(_) => "PROVIDER",
            TronError::Validation { .. } => "VALIDATION",
            TronError::Cache { .. } => "CACHE",
            TronError::Io { .. } => "IO",
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TronError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            TronError::Resolution(ResolutionError::UnknownLocation(name)) => {
                format!("Location not found: {name}")
            }
            TronError::Resolution(ResolutionError::UnknownProvider(id)) => {
                format!("Unknown weather provider: {id}")
            }
            TronError::Resolution(ResolutionError::EmptyQuery) => {
                "Please specify a location.".to_string()
            }
            TronError::Resolution(_) | TronError::Provider(_) => {
                "Unable to connect to the weather provider. Please try again later.".to_string()
            }
            TronError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            TronError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            TronError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = TronError::config("missing export dir");
        assert!(matches!(config_err, TronError::Config { .. }));

        let validation_err = TronError::validation("empty location");
        assert!(matches!(validation_err, TronError::Validation { .. }));

        let resolution_err: TronError = ResolutionError::UnknownLocation("Х".into()).into();
        assert_eq!(resolution_err.code(), "UNKNOWN_LOCATION");
    }

    #[test]
    fn test_user_messages() {
        let config_err = TronError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let provider_err: TronError = ProviderError::Network("timeout".into()).into();
        assert!(provider_err.user_message().contains("Unable to connect"));

        let location_err: TronError = ResolutionError::UnknownLocation("Атлантида".into()).into();
        assert!(location_err.user_message().contains("Атлантида"));
    }

    #[test]
    fn test_rate_limit_code() {
        let err: TronError = ProviderError::RateLimited("slow down".into()).into();
        assert_eq!(err.code(), "RATE_LIMITED");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let tron_err: TronError = io_err.into();
        assert!(matches!(tron_err, TronError::Io { .. }));
    }
}
