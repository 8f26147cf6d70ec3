//! Location Resolution Module
//!
//! This module handles resolving location inputs (provider specific IDs or
//! human readable names) into catalog `Location`s and the provider serving them.

use std::sync::Arc;

use tracing::{debug, info};

use crate::models::{Location, LocationQuery};
use crate::providers::{ProviderRegistry, ResolutionError, WeatherProvider};

/// What a caller asked for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationInput {
    /// Provider ID; found through location coverage when absent
    pub provider: Option<String>,
    /// Location to look up; the configured default when absent
    pub query: Option<LocationQuery>,
}

impl LocationInput {
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            provider: None,
            query: Some(LocationQuery::Name(name.into())),
        }
    }

    #[must_use]
    pub fn id(provider: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            query: Some(LocationQuery::Id(id.into())),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }
}

/// Service for resolving location inputs
#[derive(Debug, Clone)]
pub struct LocationResolver {
    registry: ProviderRegistry,
    default_location: Option<String>,
    default_provider: Option<String>,
    refresh_on_miss: bool,
}

impl LocationResolver {
    #[must_use]
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            default_location: None,
            default_provider: None,
            refresh_on_miss: false,
        }
    }

    /// Location (and provider) used when an input names none
    #[must_use]
    pub fn with_defaults(mut self, location: Option<String>, provider: Option<String>) -> Self {
        self.default_location = location.filter(|l| !l.trim().is_empty());
        self.default_provider = provider.filter(|p| !p.trim().is_empty());
        self
    }

    /// Re-scrape a provider's catalog once when a location is missing from it
    #[must_use]
    pub fn refresh_on_miss(mut self, enabled: bool) -> Self {
        self.refresh_on_miss = enabled;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Resolve a location input into a catalog Location and its provider
    pub async fn resolve(
        &self,
        input: &LocationInput,
    ) -> Result<(Arc<dyn WeatherProvider>, Location), ResolutionError> {
        debug!("Resolving location input: {:?}", input);

        let query = match &input.query {
            Some(query) if !query.as_str().trim().is_empty() => query.clone(),
            Some(_) => return Err(ResolutionError::EmptyQuery),
            None => LocationQuery::Name(
                self.default_location
                    .clone()
                    .ok_or(ResolutionError::EmptyQuery)?,
            ),
        };
        let provider_id = input
            .provider
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .or(self.default_provider.as_deref());

        let provider = self.resolve_provider(provider_id, &query)?;

        let location = match provider.covers_location(&query) {
            Some(location) => location,
            None => self.resolve_after_refresh(provider.as_ref(), &query).await?,
        };

        debug!(
            "Resolved location: {} ({}) via {}",
            location.name,
            location.id,
            provider.id()
        );

        Ok((provider, location))
    }

    /// An explicit provider ID must exist; otherwise use the first provider covering the name
    fn resolve_provider(
        &self,
        provider_id: Option<&str>,
        query: &LocationQuery,
    ) -> Result<Arc<dyn WeatherProvider>, ResolutionError> {
        if let Some(id) = provider_id {
            return self
                .registry
                .get(id)
                .ok_or_else(|| ResolutionError::UnknownProvider(id.to_string()));
        }

        let covering = match query {
            LocationQuery::Name(name) => self.registry.find_provider(None, Some(name)),
            LocationQuery::Id(_) => self
                .registry
                .iter()
                .find(|p| p.covers_location(query).is_some())
                .cloned(),
        };

        match covering {
            Some(provider) => Ok(provider),
            // With a single provider a catalog refresh may still find it
            None if self.refresh_on_miss => self
                .registry
                .iter()
                .next()
                .cloned()
                .ok_or_else(|| ResolutionError::UnknownLocation(query.as_str().to_string())),
            None => Err(ResolutionError::UnknownLocation(query.as_str().to_string())),
        }
    }

    async fn resolve_after_refresh(
        &self,
        provider: &dyn WeatherProvider,
        query: &LocationQuery,
    ) -> Result<Location, ResolutionError> {
        if !self.refresh_on_miss {
            return Err(ResolutionError::UnknownLocation(query.as_str().to_string()));
        }

        info!(
            "{} not in {} catalog, refreshing locations",
            query.as_str(),
            provider.id()
        );
        provider.scrape_locations().await?;

        provider
            .covers_location(query)
            .ok_or_else(|| ResolutionError::UnknownLocation(query.as_str().to_string()))
    }
}
