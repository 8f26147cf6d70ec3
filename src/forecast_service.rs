//! Forecast aggregation
//!
//! Resolves the requested location, serves the forecast from the persistent
//! cache when possible and downloads it from the provider otherwise.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info, instrument, warn};

use crate::cache::{self, PersistentCache};
use crate::config::TronConfig;
use crate::location_resolver::{LocationInput, LocationResolver};
use crate::models::{Forecast, Location};
use crate::providers::{ProviderRegistry, ResolutionError, SinoptikProvider};
use crate::Result;

#[derive(Clone)]
pub struct ForecastService {
    resolver: LocationResolver,
    cache: Option<PersistentCache>,
    forecast_ttl: Duration,
}

impl ForecastService {
    #[must_use]
    pub fn new(resolver: LocationResolver, cache: Option<PersistentCache>, forecast_ttl: Duration) -> Self {
        Self {
            resolver,
            cache,
            forecast_ttl,
        }
    }

    /// Registry with every built-in provider
    pub fn default_registry(config: &TronConfig) -> Result<ProviderRegistry> {
        let sinoptik = SinoptikProvider::new(config.provider.sinoptik.clone())?;
        Ok(ProviderRegistry::new().with(Arc::new(sinoptik)))
    }

    /// Wire up providers, resolver and cache from configuration.
    ///
    /// The cache database is locked by the process that opened it (usually
    /// `tron serve`); other processes run without the persistent cache.
    pub fn from_config(config: &TronConfig) -> Result<Self> {
        let resolver = LocationResolver::new(Self::default_registry(config)?)
            .with_defaults(config.defaults.location.clone(), config.defaults.provider.clone())
            .refresh_on_miss(config.provider.sinoptik.refresh_locations_on_miss);

        let cache = if config.cache.enabled {
            let path = config.cache_path();
            debug!("Opening forecast cache at {}", path.display());
            match PersistentCache::open(&path) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    warn!(
                        "Forecast cache at {} unavailable, continuing without it: {e}",
                        path.display()
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::new(
            resolver,
            cache,
            Duration::from_secs(u64::from(config.cache.forecast_ttl_minutes) * 60),
        ))
    }

    #[must_use]
    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        self.resolver.registry()
    }

    /// Hour labels start at the current hour, so cached entries are per hour
    fn cache_key(location: &Location) -> String {
        format!("{}:{}", location.cache_key(), Local::now().format("%Y%m%d%H"))
    }

    /// Forecast for the requested location
    #[instrument(skip(self))]
    pub async fn forecast(&self, input: &LocationInput) -> Result<Forecast> {
        let (provider, location) = self.resolver.resolve(input).await?;
        let key = Self::cache_key(&location);

        if let Some(cache) = &self.cache {
            match cache.get::<Forecast>(&key).await {
                Ok(Some(forecast)) => {
                    debug!("Serving cached forecast for {}", location.name);
                    return Ok(forecast);
                }
                Ok(None) => {}
                Err(e) => warn!("Forecast cache lookup failed: {e}"),
            }
        }

        let forecast = provider.download_forecast(&location).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache
                .put(&key, forecast.clone(), cache::jittered(self.forecast_ttl))
                .await
            {
                warn!("Failed to cache forecast for {}: {e}", location.name);
            }
        }

        Ok(forecast)
    }

    /// Locations known to a provider
    pub fn locations(&self, provider_id: &str) -> Result<Vec<Location>> {
        let provider = self
            .registry()
            .get(provider_id)
            .ok_or_else(|| ResolutionError::UnknownProvider(provider_id.to_string()))?;
        Ok(provider.locations())
    }

    /// Re-scrape a provider's location catalog
    #[instrument(skip(self))]
    pub async fn refresh_locations(&self, provider_id: &str) -> Result<Vec<Location>> {
        let provider = self
            .registry()
            .get(provider_id)
            .ok_or_else(|| ResolutionError::UnknownProvider(provider_id.to_string()))?;
        let locations = provider.scrape_locations().await?;
        info!("{} now knows {} locations", provider_id, locations.len());
        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TronError;
    use crate::models::{HourlyForecast, LocationQuery};
    use crate::providers::{ProviderError, WeatherProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Provider with a fixed catalog that counts downloads
    struct CountingProvider {
        downloads: AtomicUsize,
    }

    #[async_trait]
    impl WeatherProvider for CountingProvider {
        fn id(&self) -> &str {
            "counting"
        }

        fn covers_location(&self, query: &LocationQuery) -> Option<Location> {
            let location = Location::new("here-1", "Тук", "counting");
            match query {
                LocationQuery::Id(id) if *id == location.id => Some(location),
                LocationQuery::Name(name) if location.matches_name(name) => Some(location),
                _ => None,
            }
        }

        fn locations(&self) -> Vec<Location> {
            vec![Location::new("here-1", "Тук", "counting")]
        }

        async fn scrape_locations(&self) -> std::result::Result<Vec<Location>, ResolutionError> {
            Err(ResolutionError::SourceUnreachable("offline".into()))
        }

        async fn download_forecast(
            &self,
            location: &Location,
        ) -> std::result::Result<Forecast, ProviderError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(Forecast::new(
                location.clone(),
                vec![HourlyForecast::from_raw("9:00".into(), "3°", "60%", "1.2 mm")],
            ))
        }
    }

    fn service(cache: Option<PersistentCache>) -> (ForecastService, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider {
            downloads: AtomicUsize::new(0),
        });
        let registry = ProviderRegistry::new().with(provider.clone());
        let service = ForecastService::new(
            LocationResolver::new(registry),
            cache,
            Duration::from_secs(600),
        );
        (service, provider)
    }

    #[tokio::test]
    async fn test_forecast_without_cache_downloads_every_time() {
        let (service, provider) = service(None);
        let input = LocationInput::name("Тук");

        service.forecast(&input).await.unwrap();
        service.forecast(&input).await.unwrap();
        assert_eq!(provider.downloads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_forecast_is_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let cache = PersistentCache::open(dir.path()).unwrap();
        let (service, provider) = service(Some(cache));
        let input = LocationInput::name("Тук");

        let first = service.forecast(&input).await.unwrap();
        let second = service.forecast(&input).await.unwrap();
        assert_eq!(provider.downloads.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(second.hours[0].precipitation_probability, Some(60));
    }

    #[tokio::test]
    async fn test_from_config_with_locked_cache_runs_uncached() {
        let dir = TempDir::new().unwrap();
        let _held = PersistentCache::open(dir.path()).unwrap();

        let mut config = TronConfig::default();
        config.cache.location = dir.path().to_string_lossy().into_owned();

        let service = ForecastService::from_config(&config).unwrap();
        assert!(service.cache.is_none());
        assert!(service.locations("sinoptik").is_ok());
    }

    #[tokio::test]
    async fn test_from_config_opens_cache() {
        let dir = TempDir::new().unwrap();
        let mut config = TronConfig::default();
        config.cache.location = dir.path().join("db").to_string_lossy().into_owned();

        let service = ForecastService::from_config(&config).unwrap();
        assert!(service.cache.is_some());
    }

    #[tokio::test]
    async fn test_unknown_location_is_resolution_error() {
        let (service, _) = service(None);
        let result = service.forecast(&LocationInput::name("Там")).await;
        assert!(matches!(
            result,
            Err(TronError::Resolution(ResolutionError::UnknownLocation(_)))
        ));
    }

    #[tokio::test]
    async fn test_locations_of_unknown_provider() {
        let (service, _) = service(None);
        assert!(service.locations("counting").is_ok());
        assert!(matches!(
            service.locations("missing"),
            Err(TronError::Resolution(ResolutionError::UnknownProvider(_)))
        ));
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported() {
        let (service, _) = service(None);
        let result = service.refresh_locations("counting").await;
        assert!(matches!(
            result,
            Err(TronError::Resolution(ResolutionError::SourceUnreachable(_)))
        ));
    }
}
