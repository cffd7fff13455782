//! Output formatters for pipeline results.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::models::{
    GeocodeOption, GeocodeResult, Lookup, StationCollection, StationSummary, StationWithRange,
    TimePoint,
};
use crate::pipeline::ConditionsReport;
use crate::weather::CurrentWeather;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[96m";
const YELLOW: &str = "\x1b[93m";

// Icons
const ICON_PIN: &str = "📍";
const ICON_LAKE: &str = "🏞️";
const ICON_STREAM: &str = "🌊";
const ICON_WEATHER: &str = "🌤️";
const ICON_CHOICE: &str = "🔀";

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// Pretty-printed JSON document
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// A result that can be written in every [`Format`].
pub trait Render: Serialize {
    /// Write for a terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_human<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    /// Records for NDJSON output, one line each.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn records(&self) -> serde_json::Result<Vec<Value>> {
        Ok(vec![serde_json::to_value(self)?])
    }
}

fn invalid_data(e: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Write `value` as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(invalid_data)?;
    writeln!(writer, "{json}")
}

/// Write `value` as newline-delimited JSON records.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write, T: Render>(writer: &mut W, value: &T) -> io::Result<()> {
    for record in value.records().map_err(invalid_data)? {
        let json = serde_json::to_string(&record).map_err(invalid_data)?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write a result in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_result<W: Write, T: Render>(writer: &mut W, value: &T, format: Format) -> io::Result<()> {
    match format {
        Format::Human => value.write_human(writer),
        Format::Json => write_json(writer, value),
        Format::Ndjson => write_ndjson(writer, value),
    }
}

fn reading(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| format!("{DIM}-{RESET}"), |v| format!("{v:.2} {unit}"))
}

fn write_station<W: Write>(writer: &mut W, station: &StationSummary) -> io::Result<()> {
    writeln!(
        writer,
        "  {BOLD}{:<40}{RESET} {DIM}{}{RESET} │ gage {} │ flow {}",
        station.name,
        station.external_id,
        reading(station.gage_height, "ft"),
        reading(station.flow_rate, "ft³/s"),
    )
}

fn write_options<W: Write>(writer: &mut W, options: &[GeocodeOption]) -> io::Result<()> {
    writeln!(
        writer,
        "{ICON_CHOICE} {YELLOW}{BOLD}{} matching locations{RESET}, pick one:",
        options.len()
    )?;
    for (i, option) in options.iter().enumerate() {
        writeln!(
            writer,
            "  {}. {} {DIM}({:.4}, {:.4}){RESET}",
            i + 1,
            option.display,
            option.coordinate.latitude,
            option.coordinate.longitude
        )?;
    }
    Ok(())
}

/// One-line sparkline of a series.
fn sparkline(points: &[TimePoint]) -> String {
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.value), hi.max(p.value))
        });
    let span = max - min;
    points
        .iter()
        .map(|p| {
            if span <= 0.0 {
                return SPARKS[0];
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let level = (((p.value - min) / span) * 7.0).round() as usize;
            SPARKS[level.min(7)]
        })
        .collect()
}

fn write_series<W: Write>(writer: &mut W, label: &str, unit: &str, points: &[TimePoint]) -> io::Result<()> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return writeln!(writer, "  {label:<12} {DIM}no data{RESET}");
    };
    writeln!(
        writer,
        "  {label:<12} {CYAN}{}{RESET} {:.2} {unit} {DIM}({} → {}, {} points){RESET}",
        sparkline(points),
        last.value,
        first.timestamp.format("%Y-%m-%d %H:%M"),
        last.timestamp.format("%Y-%m-%d %H:%M"),
        points.len()
    )
}

impl Render for GeocodeResult {
    fn write_human<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Self::Single {
                coordinate,
                display,
                county,
            } => {
                writeln!(
                    writer,
                    "{ICON_PIN} {BOLD}{}{RESET} {DIM}({:.4}, {:.4}){RESET}{}",
                    display.as_deref().unwrap_or("Resolved location"),
                    coordinate.latitude,
                    coordinate.longitude,
                    county
                        .as_deref()
                        .map(|c| format!(" │ {c}"))
                        .unwrap_or_default()
                )
            }
            Self::Options { options } => write_options(writer, options),
        }
    }

    fn records(&self) -> serde_json::Result<Vec<Value>> {
        match self {
            Self::Single { .. } => Ok(vec![serde_json::to_value(self)?]),
            Self::Options { options } => options.iter().map(serde_json::to_value).collect(),
        }
    }
}

impl Render for StationCollection {
    fn write_human<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.is_empty() {
            return writeln!(writer, "{DIM}No lakes or streams reporting nearby{RESET}");
        }
        writeln!(writer, "{ICON_LAKE} {BOLD}Lakes ({}){RESET}", self.lakes.len())?;
        for lake in &self.lakes {
            write_station(writer, lake)?;
        }
        writeln!(writer, "{ICON_STREAM} {BOLD}Streams ({}){RESET}", self.streams.len())?;
        for stream in &self.streams {
            write_station(writer, stream)?;
        }
        Ok(())
    }

    /// One line per station, tagged with its kind.
    fn records(&self) -> serde_json::Result<Vec<Value>> {
        let tagged = |kind: &str, station: &StationSummary| -> serde_json::Result<Value> {
            let mut value = serde_json::to_value(station)?;
            if let Value::Object(map) = &mut value {
                map.insert("type".into(), Value::from(kind));
            }
            Ok(value)
        };
        self.lakes
            .iter()
            .map(|s| tagged("lake", s))
            .chain(self.streams.iter().map(|s| tagged("stream", s)))
            .collect()
    }
}

impl Render for CurrentWeather {
    fn write_human<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let gust = self
            .wind
            .gust
            .map(|g| format!(" gusting {g:.0}"))
            .unwrap_or_default();
        writeln!(
            writer,
            "{ICON_WEATHER} {BOLD}{:.0}°{RESET} │ {} │ wind {:.0} {}{gust} │ {:.0}% humidity │ {:.0} hPa",
            self.temperature,
            self.cloud_cover,
            self.wind.speed,
            self.wind.direction.as_str(),
            self.humidity,
            self.pressure
        )
    }
}

impl Render for StationWithRange {
    fn write_human<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "{ICON_STREAM} {BOLD}{}{RESET} {DIM}{} ({:.4}, {:.4}){RESET}",
            self.name, self.external_id, self.coordinate.latitude, self.coordinate.longitude
        )?;
        write_series(writer, "gage height", "ft", &self.values.gage)?;
        write_series(writer, "flow rate", "ft³/s", &self.values.flow)
    }

    /// One line per kept point.
    fn records(&self) -> serde_json::Result<Vec<Value>> {
        let line = |series: &str, point: &TimePoint| -> serde_json::Result<Value> {
            Ok(serde_json::json!({
                "externalId": self.external_id,
                "series": series,
                "timestamp": point.timestamp,
                "value": point.value,
            }))
        };
        self.values
            .gage
            .iter()
            .map(|p| line("gage", p))
            .chain(self.values.flow.iter().map(|p| line("flow", p)))
            .collect()
    }
}

impl Render for ConditionsReport {
    fn write_human<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "{ICON_PIN} {BOLD}{}{RESET} {DIM}({:.4}, {:.4}){RESET}",
            self.location.display.as_deref().unwrap_or("Resolved location"),
            self.location.coordinate.latitude,
            self.location.coordinate.longitude
        )?;
        self.weather.write_human(writer)?;
        self.stations.write_human(writer)
    }
}

impl<T: Render> Render for Lookup<T> {
    fn write_human<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Self::Found(value) => value.write_human(writer),
            Self::Ambiguous(options) => write_options(writer, options),
        }
    }

    fn records(&self) -> serde_json::Result<Vec<Value>> {
        match self {
            Self::Found(value) => value.records(),
            Self::Ambiguous(options) => options.iter().map(serde_json::to_value).collect(),
        }
    }
}
