//! Weather data scraped from sinoptik.bg, a Bulgarian weather website.
//!
//! Acquire permission from sinoptik before using their data.

pub mod catalog;
pub mod html;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, Timelike};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, info, instrument};

use super::{ProviderError, ResolutionError, WeatherProvider};
use crate::config::SinoptikConfig;
use crate::http;
use crate::models::{FORECAST_HOURS, Forecast, HourlyForecast, Location, LocationQuery};
use crate::models::weather::hour_label;
use catalog::LocationCatalog;

pub const PROVIDER_ID: &str = "sinoptik";

/// Letters that have a location list page on sinoptik.bg
pub const LOCATION_LETTERS: [char; 23] = [
    'А', 'Б', 'В', 'Г', 'Д', 'Е', 'З', 'И', 'К', 'Л', 'М', 'Н', 'О', 'П', 'Р', 'С', 'Т', 'У',
    'Х', 'Ц', 'Ч', 'Ш', 'Я',
];

pub struct SinoptikProvider {
    client: ClientWithMiddleware,
    config: SinoptikConfig,
    catalog: LocationCatalog,
    mobile_headers: HeaderMap,
    desktop_headers: HeaderMap,
}

fn header_value(value: &str) -> Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(value)
        .map_err(|e| ProviderError::Network(format!("Invalid header value '{value}': {e}")))
}

impl SinoptikProvider {
    /// Create a provider with the built-in location catalog
    pub fn new(config: SinoptikConfig) -> Result<Self, ProviderError> {
        let client = http::build_client(
            Duration::from_secs(u64::from(config.timeout_seconds)),
            config.max_retries,
        )?;
        let catalog = LocationCatalog::with_defaults()
            .map_err(|e| ProviderError::Parse(format!("Built-in location list is invalid: {e}")))?;

        let mut mobile_headers = HeaderMap::new();
        mobile_headers.insert(USER_AGENT, header_value(&config.mobile_user_agent)?);

        // The location lists are only served to ajax requests
        let mut desktop_headers = HeaderMap::new();
        desktop_headers.insert(USER_AGENT, header_value(&config.desktop_user_agent)?);
        desktop_headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        desktop_headers.insert(
            REFERER,
            header_value(&format!("{}/locations/europe/bulgaria", config.base_url))?,
        );

        Ok(Self {
            client,
            config,
            catalog,
            mobile_headers,
            desktop_headers,
        })
    }

    /// Mobile page with the hourly forecast of a location
    #[must_use]
    pub fn hourly_url(&self, location_id: &str) -> String {
        format!("{}/{}/hourly", self.config.mobile_base_url, location_id)
    }

    /// Location list page for one initial letter
    #[must_use]
    pub fn locations_url(&self, letter: char) -> String {
        format!(
            "{}/locations/europe/bulgaria/{}?locations",
            self.config.base_url, letter
        )
    }

    /// Build the forecast from an hourly page; hour labels start at `start_hour`
    pub fn forecast_from_html(
        location: &Location,
        page: &str,
        start_hour: u32,
    ) -> Result<Forecast, ProviderError> {
        let columns = html::parse_hourly(page);
        let rows = columns.rows().min(FORECAST_HOURS);
        debug!(
            "Hourly page for {}: {} temperatures, {} chances, {} intensities",
            location.name,
            columns.temperatures.len(),
            columns.chances.len(),
            columns.intensities.len()
        );

        if rows == 0 {
            return Err(ProviderError::Parse(format!(
                "No hourly data found for {}",
                location.name
            )));
        }

        let hours = (0..FORECAST_HOURS as u32)
            .zip(
                columns
                    .temperatures
                    .iter()
                    .zip(&columns.chances)
                    .zip(&columns.intensities),
            )
            .map(|(offset, ((temperature, chance), intensity))| {
                HourlyForecast::from_raw(hour_label(start_hour, offset), temperature, chance, intensity)
            })
            .collect();

        Ok(Forecast::new(location.clone(), hours))
    }
}

#[async_trait]
impl WeatherProvider for SinoptikProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn covers_location(&self, query: &LocationQuery) -> Option<Location> {
        self.catalog.find(query)
    }

    fn locations(&self) -> Vec<Location> {
        self.catalog.all()
    }

    fn location_count(&self) -> usize {
        self.catalog.count()
    }

    #[instrument(skip(self), fields(provider = PROVIDER_ID))]
    async fn scrape_locations(&self) -> Result<Vec<Location>, ResolutionError> {
        let mut seen = HashSet::new();
        let mut locations = Vec::new();

        for (i, letter) in LOCATION_LETTERS.iter().enumerate() {
            if i > 0 && self.config.scrape_delay_ms > 0 {
                // Pace requests like a human clicking through the letters
                tokio::time::sleep(Duration::from_millis(self.config.scrape_delay_ms)).await;
            }

            let url = self.locations_url(*letter);
            let page = http::get_text(&self.client, &url, self.desktop_headers.clone()).await?;
            let links = html::parse_location_links(&page);
            debug!("Letter {}: {} locations", letter, links.len());

            for link in links {
                let id = link.id().to_string();
                if !id.is_empty() && seen.insert(id.clone()) {
                    locations.push(Location::new(id, link.name, PROVIDER_ID));
                }
            }
        }

        if locations.is_empty() {
            return Err(ResolutionError::Parse(
                "No locations found on sinoptik location pages".to_string(),
            ));
        }

        info!("Scraped {} locations from sinoptik", locations.len());
        self.catalog.replace(locations.clone());
        Ok(locations)
    }

    #[instrument(skip(self, location), fields(location = %location.name, id = %location.id))]
    async fn download_forecast(&self, location: &Location) -> Result<Forecast, ProviderError> {
        if location.id.trim().is_empty() {
            return Err(ProviderError::MissingLocationId);
        }

        let url = self.hourly_url(&location.id);
        let page = http::get_text(&self.client, &url, self.mobile_headers.clone()).await?;
        let forecast = Self::forecast_from_html(location, &page, Local::now().hour())?;

        info!("Downloaded {} hours for {}", forecast.hours.len(), location.name);
        Ok(forecast)
    }
}
