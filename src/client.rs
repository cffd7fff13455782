//! Shared HTTP plumbing for provider clients.
//!
//! One reqwest client (rustls, crate user agent, per-request timeout) is
//! shared by the geocoder, station network and weather clients.

use std::time::Duration;

use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::errors::ConditionsError;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("riverwatch/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be initialized.
pub fn build_http_client(timeout: Duration) -> Result<Client, ConditionsError> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Send a GET, retrying transport timeouts and connect failures.
///
/// Status errors are returned as responses; the caller decides what they
/// mean for its provider.
pub(crate) async fn get_with_retry(
    http: &Client,
    url: &str,
    query: &[(&str, String)],
    retry: RetryPolicy,
) -> Result<Response, ConditionsError> {
    let mut attempt = 0u32;
    loop {
        match http.get(url).query(query).send().await {
            Ok(response) => return Ok(response),
            Err(e) if (e.is_timeout() || e.is_connect()) && attempt < retry.max_retries => {
                attempt += 1;
                warn!(
                    "request to {} failed, will retry ({}/{}): {}",
                    url,
                    attempt,
                    retry.max_retries,
                    e.without_url()
                );
                tokio::time::sleep(retry.backoff).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Turn a non-success response into an `Api` error.
pub(crate) async fn ensure_success(
    response: Response,
    service: &'static str,
) -> Result<Response, ConditionsError> {
    // Check status before parsing
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!("{} returned HTTP {}: {}", service, status.as_u16(), body.trim());
    Err(ConditionsError::api(service, status.as_u16()))
}
