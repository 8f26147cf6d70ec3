//! Configuration management for the TRON weather server
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TronError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the TRON application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TronConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Weather provider configuration
    pub provider: ProviderConfig,
    /// Cache and daily export configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Default application settings
    pub defaults: DefaultsConfig,
}

/// HTTP server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u32,
}

/// Weather provider configuration settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// sinoptik.bg scraping settings
    pub sinoptik: SinoptikConfig,
}

/// Settings for scraping sinoptik.bg
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinoptikConfig {
    /// Desktop site, used for the location lists
    pub base_url: String,
    /// Mobile site, used for the hourly forecast pages
    pub mobile_base_url: String,
    /// User agent presenting us as a mobile web browser
    pub mobile_user_agent: String,
    /// User agent presenting us as a desktop web browser
    pub desktop_user_agent: String,
    /// Pause between location list requests, in milliseconds
    pub scrape_delay_ms: u64,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    pub max_retries: u32,
    /// Re-scrape the location lists once when a location is not in the catalog
    pub refresh_locations_on_miss: bool,
}

/// One entry of the daily export list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedLocation {
    /// Location name as used in the provider catalog
    pub name: String,
    /// Provider ID; looked up by location name when absent
    #[serde(default)]
    pub provider: Option<String>,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether forecasts are cached between requests
    pub enabled: bool,
    /// Forecast cache TTL in minutes
    pub forecast_ttl_minutes: u32,
    /// Cache database directory
    pub location: String,
    /// Directory receiving the daily JSON files
    pub export_dir: String,
    /// Locations exported by `update-cache`
    pub locations_to_cache: Vec<CachedLocation>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

/// Default application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Location used when a request names none
    pub location: Option<String>,
    /// Provider used when a request names none
    pub provider: Option<String>,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u32 {
    60
}

fn default_sinoptik_base_url() -> String {
    "http://sinoptik.bg".to_string()
}

fn default_sinoptik_mobile_base_url() -> String {
    "http://m.sinoptik.bg".to_string()
}

fn default_mobile_user_agent() -> String {
    "Mozilla/5.0 (Linux; U; Android 4.0.3; ko-kr; LG-L160L Build/IML74K) AppleWebkit/534.30 (KHTML, like Gecko) Version/4.0 Mobile Safari/534.30".to_string()
}

fn default_desktop_user_agent() -> String {
    "Mozilla/5.0 (Windows NT x.y; rv:10.0) Gecko/20100101 Firefox/10.0".to_string()
}

fn default_scrape_delay() -> u64 {
    500
}

fn default_provider_timeout() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_forecast_ttl() -> u32 {
    60
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("tron").to_string_lossy().into_owned())
        .unwrap_or_else(|| "~/.cache/tron".to_string())
}

fn default_export_dir() -> String {
    "data/".to_string()
}

fn default_locations_to_cache() -> Vec<CachedLocation> {
    ["Велико Търново", "София"]
        .into_iter()
        .map(|name| CachedLocation {
            name: name.to_string(),
            provider: None,
        })
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for SinoptikConfig {
    fn default() -> Self {
        Self {
            base_url: default_sinoptik_base_url(),
            mobile_base_url: default_sinoptik_mobile_base_url(),
            mobile_user_agent: default_mobile_user_agent(),
            desktop_user_agent: default_desktop_user_agent(),
            scrape_delay_ms: default_scrape_delay(),
            timeout_seconds: default_provider_timeout(),
            max_retries: default_max_retries(),
            refresh_locations_on_miss: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            forecast_ttl_minutes: default_forecast_ttl(),
            location: default_cache_location(),
            export_dir: default_export_dir(),
            locations_to_cache: default_locations_to_cache(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            location: Some("Велико Търново".to_string()),
            provider: None,
        }
    }
}

impl TronConfig {
    /// Load configuration from `config_path` (or the default locations) and
    /// environment variables
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides such as TRON_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("TRON")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TronConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tron").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        let sinoptik = &mut self.provider.sinoptik;
        if sinoptik.base_url.is_empty() {
            sinoptik.base_url = default_sinoptik_base_url();
        }
        if sinoptik.mobile_base_url.is_empty() {
            sinoptik.mobile_base_url = default_sinoptik_mobile_base_url();
        }
        if sinoptik.mobile_user_agent.is_empty() {
            sinoptik.mobile_user_agent = default_mobile_user_agent();
        }
        if sinoptik.desktop_user_agent.is_empty() {
            sinoptik.desktop_user_agent = default_desktop_user_agent();
        }
        if sinoptik.timeout_seconds == 0 {
            sinoptik.timeout_seconds = default_provider_timeout();
        }
        if self.cache.forecast_ttl_minutes == 0 {
            self.cache.forecast_ttl_minutes = default_forecast_ttl();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.cache.export_dir.is_empty() {
            self.cache.export_dir = default_export_dir();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        let sinoptik = &self.provider.sinoptik;
        if sinoptik.timeout_seconds > 300 {
            return Err(
                TronError::config("Provider timeout cannot exceed 300 seconds").into(),
            );
        }

        if sinoptik.max_retries > 10 {
            return Err(TronError::config("Provider max retries cannot exceed 10").into());
        }

        if sinoptik.scrape_delay_ms > 10_000 {
            return Err(TronError::config("Scrape delay cannot exceed 10000 ms").into());
        }

        if self.cache.forecast_ttl_minutes > 24 * 60 {
            return Err(TronError::config(
                "Forecast cache TTL cannot exceed 1440 minutes (1 day)",
            )
            .into());
        }

        if self.server.request_timeout_seconds > 600 {
            return Err(
                TronError::config("Request timeout cannot exceed 600 seconds").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TronError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TronError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let sinoptik = &self.provider.sinoptik;
        for url in [&sinoptik.base_url, &sinoptik.mobile_base_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TronError::config(format!(
                    "Provider URL must be a valid HTTP or HTTPS URL, got '{url}'"
                ))
                .into());
            }
        }

        if self
            .cache
            .locations_to_cache
            .iter()
            .any(|location| location.name.trim().is_empty())
        {
            return Err(TronError::config("Cached location names cannot be empty").into());
        }

        Ok(())
    }

    /// Cache database directory with `~/` expanded
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        expand_home(&self.cache.location)
    }

    /// Daily export directory with `~/` expanded
    #[must_use]
    pub fn export_path(&self) -> PathBuf {
        expand_home(&self.cache.export_dir)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = TronConfig::default();
        assert_eq!(config.provider.sinoptik.base_url, "http://sinoptik.bg");
        assert_eq!(config.provider.sinoptik.mobile_base_url, "http://m.sinoptik.bg");
        assert_eq!(config.provider.sinoptik.scrape_delay_ms, 500);
        assert_eq!(config.cache.forecast_ttl_minutes, 60);
        assert_eq!(config.cache.export_dir, "data/");
        assert_eq!(config.cache.locations_to_cache.len(), 2);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = TronConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = TronConfig::default();
        config.provider.sinoptik.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_bad_url() {
        let mut config = TronConfig::default();
        config.provider.sinoptik.mobile_base_url = "m.sinoptik.bg".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_cached_location() {
        let mut config = TronConfig::default();
        config.cache.locations_to_cache.push(CachedLocation {
            name: "  ".to_string(),
            provider: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_fills_empty_values() {
        let mut config = TronConfig::default();
        config.logging.format = String::new();
        config.cache.forecast_ttl_minutes = 0;
        config.apply_defaults();
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.cache.forecast_ttl_minutes, 60);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            file,
            r#"
[server]
port = 9090

[provider.sinoptik]
scrape_delay_ms = 0

[cache]
export_dir = "/tmp/tron-export"
locations_to_cache = [{{ name = "Варна", provider = "sinoptik" }}]

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = TronConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.provider.sinoptik.scrape_delay_ms, 0);
        assert_eq!(config.provider.sinoptik.max_retries, 3);
        assert_eq!(config.logging.format, "json");
        assert_eq!(
            config.cache.locations_to_cache,
            vec![CachedLocation {
                name: "Варна".to_string(),
                provider: Some("sinoptik".to_string()),
            }]
        );
        assert_eq!(config.export_path(), PathBuf::from("/tmp/tron-export"));
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = TronConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("tron"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
