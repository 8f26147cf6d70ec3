//! Daily forecast export
//!
//! Writes `<export dir>/<location>/<YYYYMMDD>.json` for each configured
//! location. The files hold the hourly table for the next 24 hours and are
//! consumed by the web and mobile clients. Meant to run once a day, any time
//! after midnight.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::CachedLocation;
use crate::forecast_service::ForecastService;
use crate::location_resolver::LocationInput;
use crate::{Result, TronError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ExportStatus {
    Written,
    AlreadyExists,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportOutcome {
    pub location: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: ExportStatus,
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            ExportStatus::Written => write!(
                f,
                "Cached data for {} to file {}",
                self.location,
                self.path.display()
            ),
            ExportStatus::AlreadyExists => {
                write!(f, "Data for {} already exists", self.location)
            }
            ExportStatus::Failed(reason) => {
                write!(f, "Failed to cache data for {}: {}", self.location, reason)
            }
        }
    }
}

pub struct DailyExporter {
    service: ForecastService,
    export_dir: PathBuf,
}

impl DailyExporter {
    #[must_use]
    pub fn new(service: ForecastService, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            service,
            export_dir: export_dir.into(),
        }
    }

    /// File holding the data of `location` for `date`
    pub fn export_path(&self, location: &str, date: NaiveDate) -> Result<PathBuf> {
        let location = location.trim();
        if location.is_empty()
            || location.contains(['/', '\\'])
            || location == "."
            || location == ".."
        {
            return Err(TronError::validation(format!(
                "'{location}' cannot be used as a directory name"
            )));
        }

        Ok(self
            .export_dir
            .join(location)
            .join(format!("{}.json", date.format("%Y%m%d"))))
    }

    /// Export every target; a failing location does not stop the others
    pub async fn export(&self, targets: &[CachedLocation], date: NaiveDate) -> Vec<ExportOutcome> {
        let mut outcomes = Vec::with_capacity(targets.len());

        for target in targets {
            let path = self
                .export_path(&target.name, date)
                .unwrap_or_else(|_| self.export_dir.clone());

            let status = match self.export_one(target, date).await {
                Ok(status) => status,
                Err(e) => {
                    warn!("Export for {} failed: {}", target.name, e);
                    ExportStatus::Failed(e.to_string())
                }
            };

            let outcome = ExportOutcome {
                location: target.name.clone(),
                path,
                status,
            };
            info!("{}", outcome);
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn export_one(&self, target: &CachedLocation, date: NaiveDate) -> Result<ExportStatus> {
        let path = self.export_path(&target.name, date)?;

        // Data for today was already downloaded
        if tokio::fs::try_exists(&path).await? {
            return Ok(ExportStatus::AlreadyExists);
        }

        let input = LocationInput::name(target.name.clone()).with_provider(target.provider.clone());
        let forecast = self.service.forecast(&input).await?;
        let json = serde_json::to_vec(&forecast.table())
            .map_err(|e| TronError::validation(format!("Failed to encode forecast: {e}")))?;

        if let Some(dir) = path.parent() {
            create_dir(dir).await?;
        }
        // Only complete files may appear under the final name
        let partial = partial_path(&path);
        tokio::fs::write(&partial, json).await?;
        tokio::fs::rename(&partial, &path).await?;

        Ok(ExportStatus::Written)
    }
}

/// `20261019.json` is written as `20261019.json.part` first
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

async fn create_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);
    builder.create(dir).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location_resolver::LocationResolver;
    use crate::models::{Forecast, HourlyForecast, Location, LocationQuery};
    use crate::providers::{ProviderError, ProviderRegistry, ResolutionError, WeatherProvider};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct FixedProvider;

    #[async_trait]
    impl WeatherProvider for FixedProvider {
        fn id(&self) -> &str {
            "fixed"
        }

        fn covers_location(&self, query: &LocationQuery) -> Option<Location> {
            match query.as_str() {
                "София" => Some(Location::new("sofia", "София", "fixed")),
                "Счупено" => Some(Location::new("broken", "Счупено", "fixed")),
                _ => None,
            }
        }

        fn locations(&self) -> Vec<Location> {
            Vec::new()
        }

        async fn scrape_locations(&self) -> std::result::Result<Vec<Location>, ResolutionError> {
            Ok(Vec::new())
        }

        async fn download_forecast(
            &self,
            location: &Location,
        ) -> std::result::Result<Forecast, ProviderError> {
            if location.id == "broken" {
                return Err(ProviderError::Http {
                    status: 500,
                    url: "http://example.invalid".into(),
                });
            }
            Ok(Forecast::new(
                location.clone(),
                vec![
                    HourlyForecast::from_raw("18:00".into(), "2°", "17%", "0.0 mm"),
                    HourlyForecast::from_raw("19:00".into(), "1°", "20%", "0.1 mm"),
                ],
            ))
        }
    }

    fn exporter(dir: &Path) -> DailyExporter {
        let registry = ProviderRegistry::new().with(Arc::new(FixedProvider));
        let service = ForecastService::new(LocationResolver::new(registry), None, Duration::from_secs(60));
        DailyExporter::new(service, dir)
    }

    fn target(name: &str) -> CachedLocation {
        CachedLocation {
            name: name.to_string(),
            provider: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_export_path() {
        let exporter = exporter(Path::new("data"));
        let path = exporter.export_path("Велико Търново", date()).unwrap();
        assert_eq!(path, Path::new("data/Велико Търново/20261019.json"));
    }

    #[test]
    fn test_export_path_rejects_traversal() {
        let exporter = exporter(Path::new("data"));
        assert!(exporter.export_path("..", date()).is_err());
        assert!(exporter.export_path("a/b", date()).is_err());
        assert!(exporter.export_path(" ", date()).is_err());
    }

    #[tokio::test]
    async fn test_export_writes_hourly_table() {
        let dir = TempDir::new().unwrap();
        let exporter = exporter(dir.path());

        let outcomes = exporter.export(&[target("София")], date()).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, ExportStatus::Written);

        let written = std::fs::read_to_string(dir.path().join("София").join("20261019.json")).unwrap();
        assert_eq!(
            written,
            r#"{"18:00":["2°","17%","0.0 mm"],"19:00":["1°","20%","0.1 mm"]}"#
        );
    }

    #[tokio::test]
    async fn test_existing_file_is_not_downloaded_again() {
        let dir = TempDir::new().unwrap();
        let exporter = exporter(dir.path());
        let path = exporter.export_path("София", date()).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{}").unwrap();

        let outcomes = exporter.export(&[target("София")], date()).await;
        assert_eq!(outcomes[0].status, ExportStatus::AlreadyExists);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_interrupted_write_is_not_an_existing_export() {
        let dir = TempDir::new().unwrap();
        let exporter = exporter(dir.path());
        let path = exporter.export_path("София", date()).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(partial_path(&path), r#"{"18:00":["2°""#).unwrap();

        let outcomes = exporter.export(&[target("София")], date()).await;
        assert_eq!(outcomes[0].status, ExportStatus::Written);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.as_object().unwrap().len(), 2);
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("data/София/20261019.json")),
            Path::new("data/София/20261019.json.part")
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_locations() {
        let dir = TempDir::new().unwrap();
        let exporter = exporter(dir.path());

        let outcomes = exporter
            .export(&[target("Счупено"), target("Никъде"), target("София")], date())
            .await;
        assert!(matches!(outcomes[0].status, ExportStatus::Failed(_)));
        assert!(matches!(outcomes[1].status, ExportStatus::Failed(_)));
        assert_eq!(outcomes[2].status, ExportStatus::Written);
        assert!(!dir.path().join("Счупено").exists());
    }

    #[test]
    fn test_outcome_display() {
        let outcome = ExportOutcome {
            location: "София".into(),
            path: PathBuf::from("data/София/20261019.json"),
            status: ExportStatus::AlreadyExists,
        };
        assert_eq!(outcome.to_string(), "Data for София already exists");
    }
}
