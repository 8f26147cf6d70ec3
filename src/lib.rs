//! `TRON` (ToRainOrNot) - hourly weather forecasts scraped from weather sites
//!
//! This library resolves locations against provider catalogs, downloads and
//! parses hourly forecasts, exports them as daily JSON files and serves
//! them over HTTP.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod forecast_service;
pub mod http;
pub mod location_resolver;
pub mod models;
pub mod providers;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use cache::PersistentCache;
pub use config::TronConfig;
pub use error::TronError;
pub use export::{DailyExporter, ExportOutcome, ExportStatus};
pub use forecast_service::ForecastService;
pub use location_resolver::{LocationInput, LocationResolver};
pub use models::{Forecast, HourlyForecast, Location, LocationQuery};
pub use providers::{ProviderError, ProviderRegistry, ResolutionError, SinoptikProvider, WeatherProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TronError>;
