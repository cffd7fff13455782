//! Conditions pipeline.
//!
//! Wires geocoding, the search box, the station network and the weather
//! provider together. Every operation is stateless and runs under the
//! configured deadline; when it expires, outstanding calls are dropped.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::client::build_http_client;
use crate::config::PipelineConfig;
use crate::errors::ConditionsError;
use crate::geo::BoundingBox;
use crate::geocode::GeocodeClient;
use crate::models::{
    BulkStation, Coordinate, GeocodeResult, Lookup, RawTimeSeriesRecord, StationWithRange,
};
use crate::request::{normalize, LocationRequest, StationRangeRequest, ZipRequest};
use crate::sampler::sample;
use crate::stations::aggregate;
use crate::water::WaterClient;
use crate::weather::{CurrentWeather, WeatherClient};

/// A location the pipeline settled on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub coordinate: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Weather and nearby stations for one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionsReport {
    pub location: Location,
    pub weather: CurrentWeather,
    pub stations: BulkStation,
}

/// Named pipeline operations, for payload-driven invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Geocode,
    Weather,
    Stations,
    Station,
    Conditions,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Geocode => "geocode",
            Self::Weather => "weather",
            Self::Stations => "stations",
            Self::Station => "station",
            Self::Conditions => "conditions",
        }
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "geocode" => Ok(Self::Geocode),
            "weather" => Ok(Self::Weather),
            "stations" => Ok(Self::Stations),
            "station" => Ok(Self::Station),
            "conditions" => Ok(Self::Conditions),
            _ => Err(format!(
                "unknown operation: {s} (expected: geocode, weather, stations, station, conditions)"
            )),
        }
    }
}

/// The pipeline service. Cheap to clone; holds no per-request state.
#[derive(Debug, Clone)]
pub struct Conditions {
    geocoder: GeocodeClient,
    water: WaterClient,
    weather: WeatherClient,
    radius_miles: f64,
    deadline: Duration,
}

impl Conditions {
    /// Build the service and its provider clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &PipelineConfig) -> Result<Self, ConditionsError> {
        let http = build_http_client(config.request_timeout)?;
        Ok(Self {
            geocoder: GeocodeClient::new(http.clone(), config.geocoder.clone(), config.retry),
            water: WaterClient::new(http.clone(), config.water.clone(), config.retry),
            weather: WeatherClient::new(http, config.weather.clone(), config.retry, config.units),
            radius_miles: config.radius_miles,
            deadline: config.deadline,
        })
    }

    /// Resolve free text to a coordinate or a list of options.
    ///
    /// # Errors
    ///
    /// See [`GeocodeClient::resolve`]; `Timeout` past the deadline.
    pub async fn geocode(&self, location: &str) -> Result<GeocodeResult, ConditionsError> {
        self.within_deadline(self.geocoder.resolve(location)).await
    }

    /// Lakes and streams around a zip code.
    ///
    /// # Errors
    ///
    /// Geocoding, box and upstream errors; `Timeout` past the deadline.
    #[instrument(skip(self))]
    pub async fn bulk_stations(&self, zip: &str) -> Result<Lookup<BulkStation>, ConditionsError> {
        self.within_deadline(self.for_location(zip, |location| async move {
            let bbox = BoundingBox::around(location.coordinate, self.radius_miles)?;
            let records = self.water.fetch_in_box(&bbox).await?;
            Ok(stations_in(&bbox, records))
        }))
        .await
    }

    /// Current weather at a zip code.
    ///
    /// # Errors
    ///
    /// Geocoding and upstream errors; `Timeout` past the deadline.
    #[instrument(skip(self))]
    pub async fn weather(&self, zip: &str) -> Result<Lookup<CurrentWeather>, ConditionsError> {
        self.within_deadline(self.for_location(zip, |location| async move {
            self.weather.current(location.coordinate).await
        }))
        .await
    }

    /// Chart-sized history for one station.
    ///
    /// # Errors
    ///
    /// `StationNotFound` when the network has no series for `site_code`.
    #[instrument(skip(self))]
    pub async fn station_history(
        &self,
        site_code: &str,
        range_days: u32,
    ) -> Result<StationWithRange, ConditionsError> {
        self.within_deadline(async {
            let mut records = self.water.fetch_station(site_code, range_days).await?;
            records.retain(|r| r.site_code == site_code);

            let first = records
                .first()
                .ok_or_else(|| ConditionsError::StationNotFound(site_code.to_string()))?;
            Ok(StationWithRange {
                name: first.site_name.clone(),
                external_id: first.site_code.clone(),
                coordinate: first.coordinate,
                values: sample(&records),
            })
        })
        .await
    }

    /// Weather and nearby stations, fetched concurrently.
    ///
    /// Either branch failing fails the request; no partial report.
    ///
    /// # Errors
    ///
    /// Geocoding, box and upstream errors; `Timeout` past the deadline.
    #[instrument(skip(self))]
    pub async fn conditions(&self, zip: &str) -> Result<Lookup<ConditionsReport>, ConditionsError> {
        self.within_deadline(self.for_location(zip, |location| async move {
            // Reject the box before either outbound call starts
            let bbox = BoundingBox::around(location.coordinate, self.radius_miles)?;
            let (weather, records) = tokio::try_join!(
                self.weather.current(location.coordinate),
                self.water.fetch_in_box(&bbox),
            )?;
            Ok(ConditionsReport {
                location,
                weather,
                stations: stations_in(&bbox, records),
            })
        }))
        .await
    }

    /// Run `operation` on a raw invocation payload.
    ///
    /// # Errors
    ///
    /// `MalformedRequest` if the payload lacks the operation's fields,
    /// otherwise whatever the operation returns.
    pub async fn dispatch(&self, operation: Operation, event: &Value) -> Result<Value, ConditionsError> {
        info!("dispatching {}", operation.as_str());
        let value = match operation {
            Operation::Geocode => {
                let req: LocationRequest = normalize(event)?;
                serde_json::to_value(self.geocode(&req.location).await?)?
            }
            Operation::Weather => {
                let req: ZipRequest = normalize(event)?;
                serde_json::to_value(self.weather(&req.zip).await?)?
            }
            Operation::Stations => {
                let req: ZipRequest = normalize(event)?;
                serde_json::to_value(self.bulk_stations(&req.zip).await?)?
            }
            Operation::Station => {
                let req: StationRangeRequest = normalize(event)?;
                serde_json::to_value(self.station_history(req.id.trim(), req.range).await?)?
            }
            Operation::Conditions => {
                let req: ZipRequest = normalize(event)?;
                serde_json::to_value(self.conditions(&req.zip).await?)?
            }
        };
        Ok(value)
    }

    /// Geocode `query` and run `f` on a single match.
    async fn for_location<T, F, Fut>(&self, query: &str, f: F) -> Result<Lookup<T>, ConditionsError>
    where
        F: FnOnce(Location) -> Fut,
        Fut: Future<Output = Result<T, ConditionsError>>,
    {
        match self.geocoder.resolve(query).await? {
            GeocodeResult::Single {
                coordinate, display, ..
            } => Ok(Lookup::Found(f(Location { coordinate, display }).await?)),
            GeocodeResult::Options { options } => {
                info!("'{}' matched {} locations", query, options.len());
                Ok(Lookup::Ambiguous(options))
            }
        }
    }

    async fn within_deadline<T>(
        &self,
        operation: impl Future<Output = Result<T, ConditionsError>>,
    ) -> Result<T, ConditionsError> {
        tokio::time::timeout(self.deadline, operation)
            .await
            .map_err(|_| {
                warn!("deadline of {:?} expired", self.deadline);
                ConditionsError::Timeout(self.deadline)
            })?
    }
}

/// Aggregate the records whose site lies inside `bbox`.
fn stations_in(bbox: &BoundingBox, mut records: Vec<RawTimeSeriesRecord>) -> BulkStation {
    let before = records.len();
    records.retain(|r| bbox.contains(r.coordinate));
    if records.len() < before {
        debug!("dropped {} series outside the search box", before - records.len());
    }
    aggregate(&records)
}
