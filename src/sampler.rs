//! Fixed-budget decimation of station history.
//!
//! A week of 15-minute readings is ~670 points per series; charts only need
//! a few dozen. Every `interval`-th sample is kept, starting at index 0.

use chrono::DateTime;
use tracing::debug;

use crate::models::{
    DecimatedSeries, RawSample, RawTimeSeriesRecord, ReadingKind, SiteType, TimePoint,
};

/// Target number of points per series.
pub const SAMPLE_BUDGET: usize = 30;

/// Stride that keeps a series of `len` samples within [`SAMPLE_BUDGET`].
///
/// Rounds up rather than down so lengths 31..=59 still stay within the
/// budget. Never zero: short series keep every point.
#[must_use]
pub fn interval(len: usize) -> usize {
    len.div_ceil(SAMPLE_BUDGET).max(1)
}

/// Decimate all series reported for a single station.
///
/// Lakes use only their first series, routed to `gage`. Other stations
/// route each series by parameter code; a second series of the same kind
/// is ignored.
#[must_use]
pub fn sample(records: &[RawTimeSeriesRecord]) -> DecimatedSeries {
    let mut series = DecimatedSeries::default();
    let Some(first) = records.first() else {
        return series;
    };

    if first.site_type == SiteType::Lake {
        series.gage = decimate(first);
        return series;
    }

    for record in records {
        let target = match ReadingKind::from_parameter_code(&record.variable_code) {
            Some(ReadingKind::GageHeight) => &mut series.gage,
            Some(ReadingKind::FlowRate) => &mut series.flow,
            None => {
                debug!("skipping parameter {}", record.variable_code);
                continue;
            }
        };
        if !target.is_empty() {
            debug!("duplicate series for parameter {}", record.variable_code);
            continue;
        }
        *target = decimate(record);
    }
    series
}

fn decimate(record: &RawTimeSeriesRecord) -> Vec<TimePoint> {
    record
        .samples
        .iter()
        .step_by(interval(record.samples.len()))
        .filter_map(|s| time_point(record, s))
        .collect()
}

fn time_point(record: &RawTimeSeriesRecord, sample: &RawSample) -> Option<TimePoint> {
    let value = record.reading(sample)?;
    let timestamp = DateTime::parse_from_rfc3339(&sample.timestamp).ok()?;
    Some(TimePoint { timestamp, value })
}
