//! Forward geocoding client.
//!
//! Resolves a zip code or free-text address against a positionstack-style
//! `/v1/forward` endpoint. Several matches are handed back for the caller
//! to choose from; we never guess.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::{ensure_success, get_with_retry};
use crate::config::{ProviderConfig, RetryPolicy};
use crate::errors::ConditionsError;
use crate::models::{Coordinate, GeocodeOption, GeocodeResult};

const SERVICE: &str = "geocoder";

/// Candidates requested per query.
const RESULT_LIMIT: u8 = 10;

/// Top-level forward geocoding response.
#[derive(Debug, Deserialize)]
struct ForwardResponse {
    /// The provider sends `[[]]` instead of `[]` for no results, so
    /// entries are decoded one at a time.
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// One geocoder candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub label: Option<String>,
    pub name: Option<String>,
    /// City
    pub locality: Option<String>,
    /// Two-letter state code
    pub region_code: Option<String>,
    pub county: Option<String>,
}

impl Place {
    fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(Coordinate::new(lat, lon))
            }
            _ => None,
        }
    }

    /// `"<city>, <state> (<county>)"`, or `"<city> (<county>)"` without a state.
    fn option_label(&self) -> String {
        let city = self
            .locality
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown");
        let county = self.county.as_deref().unwrap_or("Unknown county");
        match self.region_code.as_deref().map(str::trim) {
            Some(state) if !state.is_empty() => format!("{city}, {state} ({county})"),
            _ => format!("{city} ({county})"),
        }
    }
}

/// Client for the geocoding provider.
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    http: Client,
    provider: ProviderConfig,
    retry: RetryPolicy,
}

impl GeocodeClient {
    #[must_use]
    pub fn new(http: Client, provider: ProviderConfig, retry: RetryPolicy) -> Self {
        Self {
            http,
            provider,
            retry,
        }
    }

    /// Resolve a location to one coordinate or a list of options.
    ///
    /// # Errors
    ///
    /// `InvalidQuery` for a blank query or one the provider rejects,
    /// `NoMatch` when nothing matches, upstream errors otherwise.
    #[instrument(skip(self))]
    pub async fn resolve(&self, query: &str) -> Result<GeocodeResult, ConditionsError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ConditionsError::InvalidQuery("location is empty".into()));
        }

        let url = format!("{}/v1/forward", self.provider.base_url);
        let mut params = vec![
            ("query", query.to_string()),
            ("country", "US".to_string()),
            ("limit", RESULT_LIMIT.to_string()),
        ];
        if let Some(key) = &self.provider.api_key {
            params.push(("access_key", key.clone()));
        }

        debug!("geocoding '{}'", query);
        let response = get_with_retry(&self.http, &url, &params, self.retry).await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            debug!("geocoder rejected query: {}", body);
            return Err(ConditionsError::InvalidQuery(format!(
                "geocoder rejected '{query}'"
            )));
        }
        let response = ensure_success(response, SERVICE).await?;

        let body = response.text().await?;
        let parsed: ForwardResponse = serde_json::from_str(&body)?;
        let places: Vec<Place> = parsed
            .data
            .into_iter()
            .filter(serde_json::Value::is_object)
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;

        interpret(query, &places)
    }
}

/// Decide between a single coordinate and a disambiguation list.
///
/// # Errors
///
/// `NoMatch` when no candidate carries a usable coordinate.
pub fn interpret(query: &str, places: &[Place]) -> Result<GeocodeResult, ConditionsError> {
    let usable: Vec<(&Place, Coordinate)> = places
        .iter()
        .filter_map(|p| p.coordinate().map(|c| (p, c)))
        .collect();

    match usable.as_slice() {
        [] => Err(ConditionsError::NoMatch(query.to_string())),
        [(place, coordinate)] => Ok(GeocodeResult::Single {
            coordinate: *coordinate,
            display: place.label.clone(),
            county: place.county.clone(),
        }),
        many => Ok(GeocodeResult::Options {
            options: many
                .iter()
                .map(|(place, coordinate)| GeocodeOption {
                    display: place.option_label(),
                    coordinate: *coordinate,
                    county: place
                        .county
                        .clone()
                        .unwrap_or_else(|| "Unknown county".into()),
                })
                .collect(),
        }),
    }
}
