//! Weather providers
//!
//! A provider knows a catalog of locations (scraped from its website) and
//! downloads hourly forecasts for them. Providers are registered once in a
//! [`ProviderRegistry`] and looked up by ID or by the locations they cover.

pub mod error;
pub mod sinoptik;

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{Forecast, Location, LocationQuery};

pub use error::{ProviderError, ResolutionError};
pub use sinoptik::SinoptikProvider;

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Unique ID of the provider
    fn id(&self) -> &str;

    /// The catalog entry matching `query`, if this provider has data for it
    fn covers_location(&self, query: &LocationQuery) -> Option<Location>;

    /// Snapshot of the location catalog
    fn locations(&self) -> Vec<Location>;

    /// Size of the location catalog
    fn location_count(&self) -> usize {
        self.locations().len()
    }

    /// Scrape the provider website for locations and replace the catalog
    async fn scrape_locations(&self) -> Result<Vec<Location>, ResolutionError>;

    /// Download the hourly forecast for the next 24 hours
    async fn download_forecast(&self, location: &Location) -> Result<Forecast, ProviderError>;
}

/// All registered providers, in registration order
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn WeatherProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.id()))
            .finish()
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider; a provider with the same ID is replaced
    pub fn register(&mut self, provider: Arc<dyn WeatherProvider>) {
        self.providers.retain(|p| p.id() != provider.id());
        self.providers.push(provider);
    }

    /// Builder style [`register`](Self::register)
    #[must_use]
    pub fn with(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.register(provider);
        self
    }

    #[must_use]
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn WeatherProvider>> {
        self.providers.iter().find(|p| p.id() == provider_id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn WeatherProvider>> {
        self.providers.iter()
    }

    /// Find a provider by ID, falling back to the first one covering `location_name`
    #[must_use]
    pub fn find_provider(
        &self,
        provider_id: Option<&str>,
        location_name: Option<&str>,
    ) -> Option<Arc<dyn WeatherProvider>> {
        if let Some(provider) = provider_id.and_then(|id| self.get(id)) {
            return Some(provider);
        }

        let query = LocationQuery::Name(location_name?.to_string());
        self.providers
            .iter()
            .find(|p| p.covers_location(&query).is_some())
            .cloned()
    }
}
