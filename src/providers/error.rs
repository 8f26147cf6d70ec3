use thiserror::Error;

/// Failure to turn a location query into a known `Location`
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Location not found: {0}")]
    UnknownLocation(String),

    #[error("No location specified and no default location configured")]
    EmptyQuery,

    #[error("Location source unreachable: {0}")]
    SourceUnreachable(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Failure while downloading forecast data from a provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider responded with HTTP {status}: {url}")]
    Http { status: u16, url: String },

    #[error("Rate limit error: {0}")]
    RateLimited(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No location ID specified")]
    MissingLocationId,
}

impl From<reqwest_middleware::Error> for ProviderError {
    fn from(err: reqwest_middleware::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

impl From<ProviderError> for ResolutionError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Parse(message) => ResolutionError::Parse(message),
            other => ResolutionError::SourceUnreachable(other.to_string()),
        }
    }
}
