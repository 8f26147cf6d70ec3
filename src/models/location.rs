//! Location model: a place known to a weather provider

use serde::{Deserialize, Serialize};

/// A resolved location from a provider's catalog
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Location {
    /// Provider specific identifier (e.g. `sofia-bulgaria-100727011`)
    pub id: String,
    /// Human readable name (e.g. `София`)
    pub name: String,
    /// ID of the provider that knows this location
    pub provider: String,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider: provider.into(),
        }
    }

    /// Whether `name` refers to this location, ignoring case and surrounding whitespace
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }

    /// Generate cache key for this location
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("forecast:{}:{}", self.provider, self.id)
    }
}

/// How a caller identifies a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationQuery {
    /// Provider specific location ID
    Id(String),
    /// Human readable name
    Name(String),
}

impl LocationQuery {
    /// The raw text of the query
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            LocationQuery::Id(id) => id,
            LocationQuery::Name(name) => name,
        }
    }
}
