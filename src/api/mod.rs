use axum::{
    Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    TronError, VERSION,
    forecast_service::ForecastService,
    location_resolver::LocationInput,
    models::{Location, LocationQuery},
    providers::{ProviderError, ResolutionError},
};

#[derive(Serialize, Deserialize)]
pub struct ApiHealth {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, Deserialize)]
pub struct ApiProvider {
    pub id: String,
    pub locations: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ApiRefresh {
    pub provider: String,
    pub count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastFormat {
    /// The `Forecast` model
    #[default]
    Full,
    /// Hourly table, same as the daily export files
    Table,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastParams {
    pub location: Option<String>,
    pub location_id: Option<String>,
    pub provider: Option<String>,
    #[serde(default)]
    pub format: ForecastFormat,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Blank parameters (as sent by an empty form field) count as absent
impl From<ForecastParams> for LocationInput {
    fn from(params: ForecastParams) -> Self {
        let query = match (non_blank(params.location_id), non_blank(params.location)) {
            (Some(id), _) => Some(LocationQuery::Id(id)),
            (None, Some(name)) => Some(LocationQuery::Name(name)),
            (None, None) => None,
        };
        LocationInput {
            provider: non_blank(params.provider),
            query,
        }
    }
}

/// Error returned by handlers, rendered as JSON with a matching status code
#[derive(Debug)]
pub struct ApiError(pub TronError);

impl<E: Into<TronError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TronError::Resolution(
                ResolutionError::UnknownProvider(_) | ResolutionError::UnknownLocation(_),
            ) => StatusCode::NOT_FOUND,
            TronError::Resolution(ResolutionError::EmptyQuery)
            | TronError::Provider(ProviderError::MissingLocationId)
            | TronError::Validation { .. } => StatusCode::BAD_REQUEST,
            TronError::Provider(ProviderError::RateLimited(_)) => StatusCode::SERVICE_UNAVAILABLE,
            TronError::Resolution(_) | TronError::Provider(_) => StatusCode::BAD_GATEWAY,
            TronError::Config { .. } | TronError::Cache { .. } | TronError::Io { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }
        let body = ApiErrorBody {
            error: self.0.user_message(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(service: ForecastService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/providers", get(get_providers))
        .route("/providers/{id}/locations", get(get_locations))
        .route("/providers/{id}/locations/refresh", post(refresh_locations))
        .route("/forecast", get(get_forecast))
        .with_state(service)
}

async fn health() -> Json<ApiHealth> {
    Json(ApiHealth {
        status: "ok".to_string(),
        version: VERSION.to_string(),
    })
}

async fn get_providers(State(service): State<ForecastService>) -> Json<Vec<ApiProvider>> {
    let providers = service
        .registry()
        .iter()
        .map(|p| ApiProvider {
            id: p.id().to_string(),
            locations: p.location_count(),
        })
        .collect();
    Json(providers)
}

async fn get_locations(
    State(service): State<ForecastService>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(service.locations(&id)?))
}

async fn refresh_locations(
    State(service): State<ForecastService>,
    Path(id): Path<String>,
) -> Result<Json<ApiRefresh>, ApiError> {
    let locations = service.refresh_locations(&id).await?;
    Ok(Json(ApiRefresh {
        provider: id,
        count: locations.len(),
    }))
}

async fn get_forecast(
    State(service): State<ForecastService>,
    params: Result<Query<ForecastParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|e| TronError::validation(e.body_text()))?;
    let format = params.format;
    let forecast = service.forecast(&params.into()).await?;
    let response = match format {
        ForecastFormat::Full => Json(&forecast).into_response(),
        ForecastFormat::Table => Json(forecast.table()).into_response(),
    };
    Ok(response)
}
