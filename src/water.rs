//! USGS NWIS Instantaneous Values (IV) client.
//!
//! Handles URL construction and WaterML-as-JSON decoding for
//!   https://waterservices.usgs.gov/nwis/iv/
//!
//! Each `timeSeries` entry (one site, one parameter) becomes one
//! `RawTimeSeriesRecord`.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::{ensure_success, get_with_retry};
use crate::config::{ProviderConfig, RetryPolicy};
use crate::errors::ConditionsError;
use crate::geo::BoundingBox;
use crate::models::{
    Coordinate, PARAM_DISCHARGE, PARAM_GAGE_HEIGHT, PARAM_LAKE_ELEVATION, RawSample,
    RawTimeSeriesRecord, SiteType,
};

const SERVICE: &str = "USGS";

/// Site types queried around a location: lakes and streams.
const SITE_TYPES: &str = "LK,ST";

// ---------------------------------------------------------------------------
// WaterML JSON envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IvResponse {
    value: IvValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IvValue {
    #[serde(default)]
    time_series: Vec<TimeSeries>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSeries {
    source_info: SourceInfo,
    variable: Variable,
    #[serde(default)]
    values: Vec<ValueBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceInfo {
    site_name: String,
    #[serde(default)]
    site_code: Vec<CodeValue>,
    geo_location: GeoLocation,
    #[serde(default)]
    site_property: Vec<SiteProperty>,
}

#[derive(Debug, Deserialize)]
struct CodeValue {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoLocation {
    geog_location: GeogLocation,
}

#[derive(Debug, Deserialize)]
struct GeogLocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct SiteProperty {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Variable {
    #[serde(default)]
    variable_code: Vec<CodeValue>,
    variable_name: String,
    no_data_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ValueBlock {
    #[serde(default)]
    value: Vec<ValuePoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValuePoint {
    value: String,
    date_time: String,
}

impl From<TimeSeries> for RawTimeSeriesRecord {
    fn from(ts: TimeSeries) -> Self {
        let site_type = ts
            .source_info
            .site_property
            .iter()
            .find(|p| p.name == "siteTypeCd")
            .and_then(|p| p.value.as_deref())
            .map_or_else(|| SiteType::Other(String::new()), SiteType::from_tag);

        // A series may carry several method blocks; the first with data wins.
        let samples = ts
            .values
            .into_iter()
            .find(|block| !block.value.is_empty())
            .map(|block| {
                block
                    .value
                    .into_iter()
                    .map(|p| RawSample {
                        timestamp: p.date_time,
                        value: p.value,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let geog = ts.source_info.geo_location.geog_location;
        Self {
            site_name: ts.source_info.site_name,
            site_code: ts
                .source_info
                .site_code
                .into_iter()
                .next()
                .map(|c| c.value)
                .unwrap_or_default(),
            coordinate: Coordinate::new(geog.latitude, geog.longitude),
            site_type,
            variable_code: ts
                .variable
                .variable_code
                .into_iter()
                .next()
                .map(|c| c.value)
                .unwrap_or_default(),
            variable_name: ts.variable.variable_name,
            no_data_value: ts.variable.no_data_value,
            samples,
        }
    }
}

/// Decode an IV response body into raw records, in response order.
///
/// # Errors
///
/// Returns `Parse` for malformed or unexpected JSON.
pub fn parse_iv_response(json: &str) -> Result<Vec<RawTimeSeriesRecord>, ConditionsError> {
    let response: IvResponse = serde_json::from_str(json)?;
    Ok(response
        .value
        .time_series
        .into_iter()
        .map(RawTimeSeriesRecord::from)
        .collect())
}

/// Comma-separated parameter codes we ask the network for.
fn parameter_codes() -> String {
    let mut codes = vec![PARAM_DISCHARGE, PARAM_GAGE_HEIGHT];
    codes.extend(PARAM_LAKE_ELEVATION);
    codes.join(",")
}

/// Client for the USGS station network.
#[derive(Debug, Clone)]
pub struct WaterClient {
    http: Client,
    provider: ProviderConfig,
    retry: RetryPolicy,
}

impl WaterClient {
    #[must_use]
    pub fn new(http: Client, provider: ProviderConfig, retry: RetryPolicy) -> Self {
        Self {
            http,
            provider,
            retry,
        }
    }

    /// Latest readings for every active lake and stream site in `bbox`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self), fields(bbox = %bbox.query_value()))]
    pub async fn fetch_in_box(
        &self,
        bbox: &BoundingBox,
    ) -> Result<Vec<RawTimeSeriesRecord>, ConditionsError> {
        let params = [
            ("format", "json".to_string()),
            ("siteStatus", "active".to_string()),
            ("bBox", bbox.query_value()),
            ("siteType", SITE_TYPES.to_string()),
            ("parameterCd", parameter_codes()),
        ];
        self.fetch(&params).await
    }

    /// Every reading for one site over the past `range_days` days.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn fetch_station(
        &self,
        site_code: &str,
        range_days: u32,
    ) -> Result<Vec<RawTimeSeriesRecord>, ConditionsError> {
        let params = [
            ("format", "json".to_string()),
            ("sites", site_code.to_string()),
            ("period", format!("P{range_days}D")),
            ("parameterCd", parameter_codes()),
        ];
        self.fetch(&params).await
    }

    async fn fetch(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<RawTimeSeriesRecord>, ConditionsError> {
        let url = format!("{}/nwis/iv/", self.provider.base_url);
        let response = get_with_retry(&self.http, &url, params, self.retry).await?;

        // NWIS answers "no sites found matching all criteria" with a 404
        if response.status() == StatusCode::NOT_FOUND {
            debug!("no matching sites");
            return Ok(Vec::new());
        }
        let response = ensure_success(response, SERVICE).await?;

        let body = response.text().await?;
        let records = parse_iv_response(&body)?;
        debug!("fetched {} time series", records.len());
        Ok(records)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{Value, json};

    /// One `timeSeries` entry in NWIS IV shape.
    pub fn time_series(
        site_name: &str,
        site_code: &str,
        site_type: &str,
        variable_code: &str,
        variable_name: &str,
        values: &[&str],
    ) -> Value {
        let points: Vec<Value> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                json!({
                    "value": v,
                    "qualifiers": ["P"],
                    "dateTime": format!(
                        "2024-05-{:02}T{:02}:{:02}:00.000-05:00",
                        1 + i / 96,
                        (i / 4) % 24,
                        (i % 4) * 15
                    )
                })
            })
            .collect();
        json!({
            "sourceInfo": {
                "siteName": site_name,
                "siteCode": [{ "value": site_code, "network": "NWIS", "agencyCode": "USGS" }],
                "geoLocation": {
                    "geogLocation": { "srs": "EPSG:4326", "latitude": 30.2446, "longitude": -97.8036 }
                },
                "siteProperty": [
                    { "value": site_type, "name": "siteTypeCd" },
                    { "value": "12090205", "name": "hucCd" }
                ]
            },
            "variable": {
                "variableCode": [{ "value": variable_code, "network": "NWIS" }],
                "variableName": variable_name,
                "noDataValue": -999999.0
            },
            "values": [{ "value": points }],
            "name": format!("USGS:{site_code}:{variable_code}:00000")
        })
    }

    /// Wrap entries in the IV envelope.
    pub fn envelope(series: Vec<Value>) -> Value {
        json!({
            "name": "ns1:timeSeriesResponseType",
            "value": { "queryInfo": {}, "timeSeries": series }
        })
    }
}
