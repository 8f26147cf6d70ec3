//! Weather forecast model and the hourly table export format

use super::{HourlyForecast, Location};
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

/// Maximum number of hours a forecast covers
pub const FORECAST_HOURS: usize = 24;

/// Weather forecast for one location over the next hours
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Forecast {
    /// Location for this forecast
    pub location: Location,
    /// ID of the provider that produced it
    pub provider: String,
    /// When this forecast was retrieved
    pub retrieved_at: DateTime<Utc>,
    /// Hourly data, ordered from the current hour onwards
    pub hours: Vec<HourlyForecast>,
}

impl Forecast {
    /// Create new forecast, retrieved now
    #[must_use]
    pub fn new(location: Location, hours: Vec<HourlyForecast>) -> Self {
        Self {
            provider: location.provider.clone(),
            location,
            retrieved_at: Utc::now(),
            hours,
        }
    }

    /// Hourly table view: `{"18:00": ["6°", "17%", "0.0 mm"], ...}`
    #[must_use]
    pub fn table(&self) -> HourlyTable<'_> {
        HourlyTable(&self.hours)
    }
}

/// Ordered `hour -> [temperature, chance, intensity]` JSON object.
///
/// This is the format of the daily export files read by the clients.
#[derive(Debug, Clone, Copy)]
pub struct HourlyTable<'a>(pub &'a [HourlyForecast]);

struct RawValues<'a>(&'a HourlyForecast);

impl Serialize for RawValues<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values = self.0.raw_values();
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl Serialize for HourlyTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for hour in self.0 {
            map.serialize_entry(&hour.hour, &RawValues(hour))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_forecast() -> Forecast {
        let location = Location::new("sofia-bulgaria-100727011", "София", "sinoptik");
        Forecast::new(
            location,
            vec![
                HourlyForecast::from_raw("22:00".into(), "6°", "3%", "0.0 mm"),
                HourlyForecast::from_raw("23:00".into(), "5°", "40%", "0.3 mm"),
                HourlyForecast::from_raw("0:00".into(), "4°", "12%", "0.0 mm"),
            ],
        )
    }

    #[test]
    fn test_forecast_takes_provider_from_location() {
        let forecast = sample_forecast();
        assert_eq!(forecast.provider, "sinoptik");
        assert_eq!(forecast.hours[0].hour, "22:00");
    }

    #[test]
    fn test_table_keeps_hour_order() {
        let forecast = sample_forecast();
        let json = serde_json::to_string(&forecast.table()).unwrap();
        assert_eq!(
            json,
            r#"{"22:00":["6°","3%","0.0 mm"],"23:00":["5°","40%","0.3 mm"],"0:00":["4°","12%","0.0 mm"]}"#
        );
    }

    #[test]
    fn test_table_hours_are_well_formed() {
        let forecast = sample_forecast();
        let value = serde_json::to_value(forecast.table()).unwrap();
        let object = value.as_object().unwrap();
        for (hour, values) in object {
            assert!(hour.len() > 3 && hour.len() < 6 && hour.contains(':'));
            assert_eq!(values.as_array().unwrap().len(), 3);
        }
    }

    #[test]
    fn test_empty_forecast() {
        let location = Location::new("x", "X", "sinoptik");
        let forecast = Forecast::new(location, Vec::new());
        assert_eq!(serde_json::to_string(&forecast.table()).unwrap(), "{}");
    }
}
