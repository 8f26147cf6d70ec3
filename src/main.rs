//! TRON CLI
//!
//! Serves forecasts over HTTP, prints them for a single location and writes
//! the daily export files.

#![allow(clippy::print_stdout)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;

use tron::config::TronConfig;
use tron::models::LocationQuery;
use tron::providers::sinoptik::PROVIDER_ID;
use tron::{DailyExporter, ExportStatus, ForecastService, LocationInput, telemetry, web};

/// TRON (ToRainOrNot) weather data server
#[derive(Parser)]
#[command(name = "tron")]
#[command(author, version, about = "ToRainOrNot: hourly weather forecasts as JSON", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "TRON_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on, overrides the configuration
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the forecast for one location as JSON
    Forecast {
        /// Location name, e.g. "Велико Търново"
        #[arg(short, long, conflicts_with = "location_id")]
        location: Option<String>,

        /// Provider specific location ID
        #[arg(long)]
        location_id: Option<String>,

        /// Provider ID
        #[arg(short, long)]
        provider: Option<String>,

        /// Print the hourly table instead of the full forecast
        #[arg(long)]
        table: bool,
    },

    /// List the locations known to a provider
    Locations {
        /// Provider ID
        #[arg(short, long)]
        provider: Option<String>,

        /// Scrape the provider website for locations first
        #[arg(long)]
        refresh: bool,
    },

    /// Write today's forecast files for the configured locations
    UpdateCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = TronConfig::load_from_path(cli.config.clone())
        .context("Failed to load configuration")?;
    telemetry::init_tracing(&config.logging, cli.verbose);

    match cli.command {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Forecast {
            location,
            location_id,
            provider,
            table,
        } => {
            let query = match (location_id, location) {
                (Some(id), _) => Some(LocationQuery::Id(id)),
                (None, Some(name)) => Some(LocationQuery::Name(name)),
                (None, None) => None,
            };
            forecast(&config, LocationInput { provider, query }, table).await
        }
        Commands::Locations { provider, refresh } => locations(&config, provider, refresh).await,
        Commands::UpdateCache => update_cache(&config).await,
    }
}

async fn serve(mut config: TronConfig, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    let service = ForecastService::from_config(&config)?;
    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting TRON v{}",
        tron::VERSION
    );
    web::run(&config, service).await
}

async fn forecast(config: &TronConfig, input: LocationInput, table: bool) -> Result<()> {
    let service = ForecastService::from_config(config)?;
    let forecast = service.forecast(&input).await?;

    let json = if table {
        serde_json::to_string_pretty(&forecast.table())?
    } else {
        serde_json::to_string_pretty(&forecast)?
    };
    println!("{json}");
    Ok(())
}

async fn locations(config: &TronConfig, provider: Option<String>, refresh: bool) -> Result<()> {
    let service = ForecastService::from_config(config)?;
    let provider = provider
        .or_else(|| config.defaults.provider.clone())
        .unwrap_or_else(|| PROVIDER_ID.to_string());

    let locations = if refresh {
        service.refresh_locations(&provider).await?
    } else {
        service.locations(&provider)?
    };

    println!("{}", serde_json::to_string_pretty(&locations)?);
    Ok(())
}

async fn update_cache(config: &TronConfig) -> Result<()> {
    let service = ForecastService::from_config(config)?;
    let exporter = DailyExporter::new(service, config.export_path());

    let outcomes = exporter
        .export(&config.cache.locations_to_cache, Local::now().date_naive())
        .await;
    for outcome in &outcomes {
        println!("{outcome}");
    }

    let failed = outcomes
        .iter()
        .filter(|o| matches!(o.status, ExportStatus::Failed(_)))
        .count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} locations could not be cached", outcomes.len());
    }
    Ok(())
}
