//! Shared HTTP client with retry on transient failures

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use tracing::{debug, instrument};

use crate::providers::ProviderError;

/// Build a client that retries transient errors up to `max_retries` times
pub fn build_client(timeout: Duration, max_retries: u32) -> Result<ClientWithMiddleware, ProviderError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {e}")))?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// GET `url` and return the body as text, mapping HTTP failures to `ProviderError`
#[instrument(level = "debug", skip(client, headers))]
pub async fn get_text(
    client: &ClientWithMiddleware,
    url: &str,
    headers: HeaderMap,
) -> Result<String, ProviderError> {
    let response = client.get(url).headers(headers).send().await?;

    let status = response.status();
    debug!("GET {} -> {}", url, status);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited(format!(
            "{url} asked us to slow down"
        )));
    }
    if !status.is_success() {
        return Err(ProviderError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    Ok(response.text().await?)
}
