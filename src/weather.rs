//! Current weather: One Call client and enrichment.
//!
//! Raw telemetry (cloud percentage, wind bearing) is turned into the labels
//! people actually read.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::{ensure_success, get_with_retry};
use crate::config::{ProviderConfig, RetryPolicy, Units};
use crate::errors::ConditionsError;
use crate::models::Coordinate;

const SERVICE: &str = "weather";

/// Sections of the One Call response we do not use.
const EXCLUDE: &str = "minutely,hourly,daily,alerts";

/// Provider payload. Only `current` matters.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherPayload {
    pub current: Option<CurrentConditions>,
}

/// Raw current conditions.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentConditions {
    pub temp: f64,
    /// hPa
    pub pressure: f64,
    /// Percent
    pub humidity: f64,
    pub wind_speed: f64,
    /// Degrees, meteorological (direction the wind comes from)
    pub wind_deg: f64,
    pub wind_gust: Option<f64>,
    /// Cloud cover percent
    pub clouds: f64,
}

/// 16-point compass.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompassPoint {
    N,
    NNE,
    NE,
    ENE,
    E,
    ESE,
    SE,
    SSE,
    S,
    SSW,
    SW,
    WSW,
    W,
    WNW,
    NW,
    NNW,
}

impl CompassPoint {
    const ALL: [Self; 16] = [
        Self::N,
        Self::NNE,
        Self::NE,
        Self::ENE,
        Self::E,
        Self::ESE,
        Self::SE,
        Self::SSE,
        Self::S,
        Self::SSW,
        Self::SW,
        Self::WSW,
        Self::W,
        Self::WNW,
        Self::NW,
        Self::NNW,
    ];

    /// Degrees per compass sector.
    const SECTOR: f64 = 22.5;

    /// Label for a bearing in degrees.
    ///
    /// Each sector is centred on its label: N covers
    /// `[348.75, 360) ∪ [0, 11.25)`.
    #[must_use]
    pub fn from_bearing(degrees: f64) -> Self {
        let normalized = degrees.rem_euclid(360.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = ((normalized + Self::SECTOR / 2.0) / Self::SECTOR).floor() as usize % 16;
        Self::ALL[index]
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::N => "N",
            Self::NNE => "NNE",
            Self::NE => "NE",
            Self::ENE => "ENE",
            Self::E => "E",
            Self::ESE => "ESE",
            Self::SE => "SE",
            Self::SSE => "SSE",
            Self::S => "S",
            Self::SSW => "SSW",
            Self::SW => "SW",
            Self::WSW => "WSW",
            Self::W => "W",
            Self::WNW => "WNW",
            Self::NW => "NW",
            Self::NNW => "NNW",
        }
    }
}

/// Label for a cloud-cover percentage (upper bounds inclusive).
#[must_use]
pub fn cloud_cover_label(percent: f64) -> &'static str {
    match percent {
        p if p <= 0.0 => "Clear skies",
        p if p <= 25.0 => "Mostly sunny",
        p if p <= 50.0 => "Partly cloudy",
        p if p <= 75.0 => "Mostly cloudy",
        _ => "Overcast",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wind {
    pub speed: f64,
    pub direction: CompassPoint,
    /// Raw bearing in degrees
    pub bearing: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

/// Normalized current weather.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    pub temperature: f64,
    pub wind: Wind,
    pub pressure: f64,
    pub humidity: f64,
    pub cloud_cover: String,
}

/// Build the normalized record from a provider payload.
///
/// # Errors
///
/// Returns `InvalidResponse` if the payload has no current conditions.
pub fn enrich(payload: &WeatherPayload) -> Result<CurrentWeather, ConditionsError> {
    let current = payload.current.as_ref().ok_or_else(|| {
        ConditionsError::InvalidResponse("weather payload has no current conditions".into())
    })?;

    Ok(CurrentWeather {
        temperature: current.temp,
        wind: Wind {
            speed: current.wind_speed,
            direction: CompassPoint::from_bearing(current.wind_deg),
            bearing: current.wind_deg,
            gust: current.wind_gust,
        },
        pressure: current.pressure,
        humidity: current.humidity,
        cloud_cover: cloud_cover_label(current.clouds).to_string(),
    })
}

/// Client for the weather provider.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: Client,
    provider: ProviderConfig,
    retry: RetryPolicy,
    units: Units,
}

impl WeatherClient {
    #[must_use]
    pub fn new(http: Client, provider: ProviderConfig, retry: RetryPolicy, units: Units) -> Self {
        Self {
            http,
            provider,
            retry,
            units,
        }
    }

    /// Fetch and enrich current conditions at `coordinate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload is unusable.
    #[instrument(skip(self), fields(lat = coordinate.latitude, lon = coordinate.longitude))]
    pub async fn current(&self, coordinate: Coordinate) -> Result<CurrentWeather, ConditionsError> {
        let url = format!("{}/data/3.0/onecall", self.provider.base_url);
        let mut params = vec![
            ("lat", coordinate.latitude.to_string()),
            ("lon", coordinate.longitude.to_string()),
            ("exclude", EXCLUDE.to_string()),
            ("units", self.units.as_str().to_string()),
        ];
        if let Some(key) = &self.provider.api_key {
            params.push(("appid", key.clone()));
        }

        let response = get_with_retry(&self.http, &url, &params, self.retry).await?;
        let response = ensure_success(response, SERVICE).await?;
        let body = response.text().await?;
        let payload: WeatherPayload = serde_json::from_str(&body)?;

        let weather = enrich(&payload)?;
        debug!(
            "{}° wind {} {}",
            weather.temperature,
            weather.wind.direction.as_str(),
            weather.cloud_cover
        );
        Ok(weather)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn conditions(clouds: f64, wind_deg: f64) -> CurrentConditions {
        CurrentConditions {
            temp: 88.5,
            pressure: 1012.0,
            humidity: 54.0,
            wind_speed: 9.2,
            wind_deg,
            wind_gust: Some(17.0),
            clouds,
        }
    }

    #[test]
    fn test_cloud_boundaries() {
        assert_eq!(cloud_cover_label(0.0), "Clear skies");
        assert_eq!(cloud_cover_label(1.0), "Mostly sunny");
        assert_eq!(cloud_cover_label(25.0), "Mostly sunny");
        assert_eq!(cloud_cover_label(26.0), "Partly cloudy");
        assert_eq!(cloud_cover_label(50.0), "Partly cloudy");
        assert_eq!(cloud_cover_label(75.0), "Mostly cloudy");
        assert_eq!(cloud_cover_label(75.5), "Overcast");
        assert_eq!(cloud_cover_label(100.0), "Overcast");
    }

    #[test]
    fn test_cloud_labels_are_monotonic() {
        let order = [
            "Clear skies",
            "Mostly sunny",
            "Partly cloudy",
            "Mostly cloudy",
            "Overcast",
        ];
        let rank = |p: f64| {
            order
                .iter()
                .position(|l| *l == cloud_cover_label(p))
                .unwrap()
        };
        for p in 0..100 {
            assert!(rank(f64::from(p)) <= rank(f64::from(p + 1)));
        }
    }

    #[test]
    fn test_compass_sectors_are_symmetric() {
        assert_eq!(CompassPoint::from_bearing(0.0), CompassPoint::N);
        assert_eq!(CompassPoint::from_bearing(11.24), CompassPoint::N);
        assert_eq!(CompassPoint::from_bearing(11.25), CompassPoint::NNE);
        assert_eq!(CompassPoint::from_bearing(348.75), CompassPoint::N);
        assert_eq!(CompassPoint::from_bearing(348.74), CompassPoint::NNW);
        assert_eq!(CompassPoint::from_bearing(90.0), CompassPoint::E);
        assert_eq!(CompassPoint::from_bearing(180.0), CompassPoint::S);
        assert_eq!(CompassPoint::from_bearing(247.5), CompassPoint::WSW);
        assert_eq!(CompassPoint::from_bearing(360.0), CompassPoint::N);
        assert_eq!(CompassPoint::from_bearing(-90.0), CompassPoint::W);
    }

    #[test]
    fn test_enrich_assembles_record() {
        let payload = WeatherPayload {
            current: Some(conditions(40.0, 200.0)),
        };
        let weather = enrich(&payload).unwrap();
        assert!((weather.temperature - 88.5).abs() < f64::EPSILON);
        assert_eq!(weather.wind.direction, CompassPoint::SSW);
        assert_eq!(weather.wind.gust, Some(17.0));
        assert_eq!(weather.cloud_cover, "Partly cloudy");
    }

    #[test]
    fn test_missing_current_section_is_upstream_error() {
        let err = enrich(&WeatherPayload { current: None }).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::UpstreamError);
    }

    #[tokio::test]
    async fn test_client_requests_onecall() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .and(query_param("units", "imperial"))
            .and(query_param("appid", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lat": 30.24,
                "lon": -97.77,
                "timezone": "America/Chicago",
                "current": {
                    "dt": 1_714_582_800,
                    "temp": 84.2,
                    "pressure": 1009,
                    "humidity": 61,
                    "clouds": 0,
                    "wind_speed": 12.66,
                    "wind_deg": 170
                }
            })))
            .mount(&server)
            .await;

        let http = crate::client::build_http_client(Duration::from_secs(2)).unwrap();
        let client = WeatherClient::new(
            http,
            ProviderConfig::new(server.uri(), Some("key".into())),
            RetryPolicy::default(),
            Units::Imperial,
        );
        let weather = client.current(Coordinate::new(30.24, -97.77)).await.unwrap();
        assert_eq!(weather.cloud_cover, "Clear skies");
        assert_eq!(weather.wind.direction, CompassPoint::S);
        assert_eq!(weather.wind.gust, None);
    }
}
