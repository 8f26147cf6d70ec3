//! Hourly weather data model and value parsing

use serde::{Deserialize, Serialize};

/// Weather conditions for one hour, as published by the provider
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HourlyForecast {
    /// Hour label, `H:00` (e.g. `7:00`, `18:00`)
    pub hour: String,
    /// Temperature as shown by the provider (e.g. `6°`)
    pub temperature: String,
    /// Chance of precipitation as shown by the provider (e.g. `17%`)
    pub precipitation_chance: String,
    /// Amount of precipitation as shown by the provider (e.g. `0.0 mm`)
    pub precipitation_intensity: String,
    /// Temperature in Celsius, when the raw value is numeric
    pub temperature_c: Option<f32>,
    /// Chance of precipitation in percent (0-100)
    pub precipitation_probability: Option<u8>,
    /// Precipitation amount in mm
    pub precipitation_mm: Option<f32>,
}

impl HourlyForecast {
    /// Build an hourly entry from the raw scraped strings
    #[must_use]
    pub fn from_raw(hour: String, temperature: &str, chance: &str, intensity: &str) -> Self {
        let temperature = temperature.trim().to_string();
        let precipitation_chance = chance.trim().to_string();
        let precipitation_intensity = intensity.trim().to_string();

        Self {
            temperature_c: leading_number(&temperature),
            precipitation_probability: leading_number(&precipitation_chance)
                .map(|p| p.round().clamp(0.0, 100.0) as u8),
            precipitation_mm: leading_number(&precipitation_intensity),
            hour,
            temperature,
            precipitation_chance,
            precipitation_intensity,
        }
    }

    /// Raw values in the order clients expect: temperature, chance, intensity
    #[must_use]
    pub fn raw_values(&self) -> [&str; 3] {
        [
            &self.temperature,
            &self.precipitation_chance,
            &self.precipitation_intensity,
        ]
    }
}

/// Label for the hour `offset` hours after `start_hour`, wrapping at midnight
#[must_use]
pub fn hour_label(start_hour: u32, offset: u32) -> String {
    format!("{}:00", (start_hour + offset) % 24)
}

/// Parse the number a provider value starts with.
///
/// Accepts ASCII and Unicode minus signs and a decimal comma, ignores any
/// trailing unit (`°`, `%`, `mm`).
#[must_use]
pub fn leading_number(raw: &str) -> Option<f32> {
    let mut number = String::new();
    for c in raw.trim().chars() {
        match c {
            '-' | '−' | '–' if number.is_empty() => number.push('-'),
            '+' if number.is_empty() => {}
            '0'..='9' => number.push(c),
            '.' | ',' if !number.contains('.') => number.push('.'),
            _ => break,
        }
    }
    number.parse().ok()
}
