//! Domain models shared across the pipeline.
//!
//! Raw records mirror what the station network reports; summaries and
//! series are the normalized shapes we emit.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// USGS parameter code for discharge (streamflow), cubic feet per second.
pub const PARAM_DISCHARGE: &str = "00060";

/// USGS parameter code for discharge (daily mean), cubic feet per second.
pub const PARAM_DISCHARGE_MEAN: &str = "00061";

/// USGS parameter code for gage height, feet.
pub const PARAM_GAGE_HEIGHT: &str = "00065";

/// Lake or reservoir elevation codes (NGVD 1929, NAVD 1988, local datum).
pub const PARAM_LAKE_ELEVATION: [&str; 3] = ["62614", "62615", "00062"];

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One candidate location offered for disambiguation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeOption {
    /// `"<city>, <state> (<county>)"`
    pub display: String,
    pub coordinate: Coordinate,
    pub county: String,
}

/// Outcome of resolving a free-text location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeocodeResult {
    /// Exactly one candidate matched.
    Single {
        coordinate: Coordinate,
        #[serde(skip_serializing_if = "Option::is_none")]
        display: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        county: Option<String>,
    },
    /// Several candidates matched, in provider order.
    Options { options: Vec<GeocodeOption> },
}

/// Success type of every operation that starts from a location.
///
/// An ambiguous location is not an error: the caller picks an option and
/// asks again.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Lookup<T> {
    Found(T),
    Ambiguous(Vec<GeocodeOption>),
}

/// Upstream classification of a monitoring site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteType {
    Lake,
    Stream,
    Other(String),
}

impl SiteType {
    /// Classify a USGS `siteTypeCd` value (`LK`, `ST`, `ST-CA`, ...).
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        if tag.starts_with("LK") {
            Self::Lake
        } else if tag.starts_with("ST") {
            Self::Stream
        } else {
            Self::Other(tag.to_string())
        }
    }
}

/// Which quantity a series measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingKind {
    GageHeight,
    FlowRate,
}

impl ReadingKind {
    /// Classify by variable name, e.g. `"Gage height, ft"`.
    #[must_use]
    pub fn from_variable_name(name: &str) -> Option<Self> {
        let name = name.trim_start().to_lowercase();
        if name.starts_with("gage height") {
            Some(Self::GageHeight)
        } else if name.starts_with("streamflow") || name.starts_with("discharge") {
            Some(Self::FlowRate)
        } else {
            None
        }
    }

    /// Classify by USGS parameter code.
    #[must_use]
    pub fn from_parameter_code(code: &str) -> Option<Self> {
        match code {
            PARAM_GAGE_HEIGHT => Some(Self::GageHeight),
            PARAM_DISCHARGE | PARAM_DISCHARGE_MEAN => Some(Self::FlowRate),
            c if PARAM_LAKE_ELEVATION.contains(&c) => Some(Self::GageHeight),
            _ => None,
        }
    }
}

/// A single `(timestamp, value)` pair as the network reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// ISO 8601, e.g. `"2024-05-01T12:00:00.000-05:00"`
    pub timestamp: String,
    /// Values arrive as strings
    pub value: String,
}

/// One site + variable series from the station network.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTimeSeriesRecord {
    pub site_name: String,
    pub site_code: String,
    pub coordinate: Coordinate,
    pub site_type: SiteType,
    pub variable_code: String,
    pub variable_name: String,
    /// Sentinel the network uses for a missing value (usually -999999)
    pub no_data_value: Option<f64>,
    /// Ascending by time
    pub samples: Vec<RawSample>,
}

impl RawTimeSeriesRecord {
    /// Parse a sample value, treating the sentinel and junk as missing.
    #[must_use]
    pub fn reading(&self, sample: &RawSample) -> Option<f64> {
        let value = sample.value.trim().parse::<f64>().ok()?;
        if !value.is_finite() {
            return None;
        }
        match self.no_data_value {
            Some(sentinel) if (value - sentinel).abs() < f64::EPSILON => None,
            _ => Some(value),
        }
    }

    /// Earliest reading, if the first sample holds one.
    #[must_use]
    pub fn first_value(&self) -> Option<f64> {
        self.samples.first().and_then(|s| self.reading(s))
    }

    /// Most recent reading, if the last sample holds one.
    #[must_use]
    pub fn latest_value(&self) -> Option<f64> {
        self.samples.last().and_then(|s| self.reading(s))
    }
}

/// Normalized station with its current readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSummary {
    pub name: String,
    pub external_id: String,
    pub coordinate: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gage_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_rate: Option<f64>,
}

impl StationSummary {
    /// Summary carrying identity only.
    #[must_use]
    pub fn from_record(record: &RawTimeSeriesRecord) -> Self {
        Self {
            name: record.site_name.clone(),
            external_id: record.site_code.clone(),
            coordinate: record.coordinate,
            gage_height: None,
            flow_rate: None,
        }
    }
}

/// Stations found around a location, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StationCollection {
    pub lakes: Vec<StationSummary>,
    pub streams: Vec<StationSummary>,
}

impl StationCollection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lakes.is_empty() && self.streams.is_empty()
    }
}

/// Outbound name for a bulk station lookup.
pub type BulkStation = StationCollection;

/// One decimated sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub timestamp: DateTime<FixedOffset>,
    pub value: f64,
}

/// Chart-sized history for one station.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecimatedSeries {
    pub gage: Vec<TimePoint>,
    pub flow: Vec<TimePoint>,
}

/// A station with its decimated history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationWithRange {
    pub name: String,
    pub external_id: String,
    pub coordinate: Coordinate,
    pub values: DecimatedSeries,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(values: &[&str]) -> RawTimeSeriesRecord {
        RawTimeSeriesRecord {
            site_name: "Barton Creek at Loop 360".into(),
            site_code: "08155500".into(),
            coordinate: Coordinate::new(30.24, -97.80),
            site_type: SiteType::Stream,
            variable_code: PARAM_DISCHARGE.into(),
            variable_name: "Streamflow, ft&#179;/s".into(),
            no_data_value: Some(-999_999.0),
            samples: values
                .iter()
                .map(|v| RawSample {
                    timestamp: "2024-05-01T12:00:00.000-05:00".into(),
                    value: (*v).into(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_site_type_tags() {
        assert_eq!(SiteType::from_tag("LK"), SiteType::Lake);
        assert_eq!(SiteType::from_tag("ST"), SiteType::Stream);
        assert_eq!(SiteType::from_tag("ST-CA"), SiteType::Stream);
        assert_eq!(SiteType::from_tag("GW"), SiteType::Other("GW".into()));
    }

    #[test]
    fn test_reading_kind_by_name_and_code() {
        assert_eq!(
            ReadingKind::from_variable_name("Gage height, ft"),
            Some(ReadingKind::GageHeight)
        );
        assert_eq!(
            ReadingKind::from_variable_name("Streamflow, ft&#179;/s"),
            Some(ReadingKind::FlowRate)
        );
        assert_eq!(ReadingKind::from_variable_name("Temperature, water"), None);
        assert_eq!(
            ReadingKind::from_parameter_code("00060"),
            Some(ReadingKind::FlowRate)
        );
        assert_eq!(
            ReadingKind::from_parameter_code("62614"),
            Some(ReadingKind::GageHeight)
        );
        assert_eq!(ReadingKind::from_parameter_code("00010"), None);
    }

    #[test]
    fn test_sentinel_and_junk_are_missing() {
        let r = record(&["1.2", "-999999", "Ice"]);
        assert_eq!(r.reading(&r.samples[0]), Some(1.2));
        assert_eq!(r.reading(&r.samples[1]), None);
        assert_eq!(r.reading(&r.samples[2]), None);
        assert_eq!(r.latest_value(), None);
        assert_eq!(record(&["1.2", "1.3"]).latest_value(), Some(1.3));
    }

    #[test]
    fn test_lookup_serializes_with_status_tag() {
        let found: Lookup<u8> = Lookup::Found(3);
        let json = serde_json::to_value(&found).unwrap();
        assert_eq!(json["status"], "found");
        assert_eq!(json["data"], 3);
    }
}
