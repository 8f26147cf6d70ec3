//! Data models for the TRON weather server
//!
//! - Location: a place known to a provider, and how callers query it
//! - Weather: one hour of forecast data
//! - Forecast: the hourly forecast for a location

pub mod forecast;
pub mod location;
pub mod weather;

// Re-export all public types for convenient access
pub use forecast::{FORECAST_HOURS, Forecast, HourlyTable};
pub use location::{Location, LocationQuery};
pub use weather::HourlyForecast;
