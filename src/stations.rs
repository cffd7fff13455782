//! Station aggregation.
//!
//! The network reports gage height and flow rate as separate series for
//! the same physical stream station. Aggregation folds them back into one
//! summary per station; lakes pass straight through with their first
//! reading.

use tracing::debug;

use crate::models::{
    RawTimeSeriesRecord, ReadingKind, SiteType, StationCollection, StationSummary,
};

/// Key two stream records must share to be the same station.
///
/// Display names are all we have; trimming and case-folding absorbs the
/// formatting drift seen between parameter series.
#[must_use]
pub fn merge_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Group raw records into lake and stream summaries.
///
/// Single pass, first-seen order. Lakes are never merged. Stream records
/// with the same [`merge_key`] fill in whichever reading the summary is
/// still missing.
#[must_use]
pub fn aggregate(records: &[RawTimeSeriesRecord]) -> StationCollection {
    let mut collection = StationCollection::default();

    for record in records {
        match &record.site_type {
            SiteType::Lake => {
                let mut summary = StationSummary::from_record(record);
                summary.gage_height = record.first_value();
                collection.lakes.push(summary);
            }
            SiteType::Stream => {
                let Some(kind) = ReadingKind::from_variable_name(&record.variable_name) else {
                    debug!(
                        "skipping {} series '{}'",
                        record.site_code, record.variable_name
                    );
                    continue;
                };
                let value = record.latest_value();
                let key = merge_key(&record.site_name);

                match collection
                    .streams
                    .iter_mut()
                    .find(|s| merge_key(&s.name) == key)
                {
                    Some(existing) => fill_missing(existing, kind, value),
                    None => {
                        let mut summary = StationSummary::from_record(record);
                        fill_missing(&mut summary, kind, value);
                        collection.streams.push(summary);
                    }
                }
            }
            SiteType::Other(tag) => {
                debug!("skipping site {} with type '{}'", record.site_code, tag);
            }
        }
    }

    debug!(
        "aggregated {} lakes, {} streams from {} series",
        collection.lakes.len(),
        collection.streams.len(),
        records.len()
    );
    collection
}

fn fill_missing(summary: &mut StationSummary, kind: ReadingKind, value: Option<f64>) {
    let slot = match kind {
        ReadingKind::GageHeight => &mut summary.gage_height,
        ReadingKind::FlowRate => &mut summary.flow_rate,
    };
    if slot.is_none() {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, RawSample};

    fn record(
        name: &str,
        code: &str,
        site_type: SiteType,
        variable_name: &str,
        values: &[&str],
    ) -> RawTimeSeriesRecord {
        RawTimeSeriesRecord {
            site_name: name.into(),
            site_code: code.into(),
            coordinate: Coordinate::new(30.24, -97.80),
            site_type,
            variable_code: String::new(),
            variable_name: variable_name.into(),
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

    const FLOW: &str = "Streamflow, ft&#179;/s";
    const GAGE: &str = "Gage height, ft";
    const LAKE: &str = "Lake or reservoir water surface elevation above NGVD 1929, ft";

    #[test]
    fn test_barton_creek_merges_into_one_station() {
        let records = [
            record("Barton Creek", "08155300", SiteType::Stream, FLOW, &["1.2", "1.3", "1.4"]),
            record("Barton Creek", "08155300", SiteType::Stream, GAGE, &["5.0", "5.1", "5.2"]),
        ];

        let collection = aggregate(&records);
        assert!(collection.lakes.is_empty());
        assert_eq!(collection.streams.len(), 1);
        let barton = &collection.streams[0];
        assert_eq!(barton.name, "Barton Creek");
        assert_eq!(barton.flow_rate, Some(1.4));
        assert_eq!(barton.gage_height, Some(5.2));
    }

    #[test]
    fn test_merge_ignores_case_and_whitespace() {
        let records = [
            record("Onion Ck nr Driftwood, TX", "08158700", SiteType::Stream, GAGE, &["3.1"]),
            record(" ONION CK NR DRIFTWOOD, TX ", "08158700", SiteType::Stream, FLOW, &["44"]),
        ];
        let collection = aggregate(&records);
        assert_eq!(collection.streams.len(), 1);
        assert_eq!(collection.streams[0].gage_height, Some(3.1));
        assert_eq!(collection.streams[0].flow_rate, Some(44.0));
    }

    #[test]
    fn test_merge_keeps_first_reading_of_a_kind() {
        let records = [
            record("Bull Creek", "08154700", SiteType::Stream, GAGE, &["2.0"]),
            record("Bull Creek", "08154700", SiteType::Stream, GAGE, &["9.9"]),
        ];
        let collection = aggregate(&records);
        assert_eq!(collection.streams.len(), 1);
        assert_eq!(collection.streams[0].gage_height, Some(2.0));
        assert_eq!(collection.streams[0].flow_rate, None);
    }

    #[test]
    fn test_stream_with_single_metric() {
        let records = [record("Walnut Creek", "08158200", SiteType::Stream, FLOW, &["7.5"])];
        let collection = aggregate(&records);
        assert_eq!(collection.streams[0].flow_rate, Some(7.5));
        assert_eq!(collection.streams[0].gage_height, None);
    }

    #[test]
    fn test_lakes_never_merge() {
        let records = [
            record("Lake Austin", "08154700", SiteType::Lake, LAKE, &["492.6"]),
            record("Lake Austin", "08154700", SiteType::Lake, LAKE, &["492.7"]),
            record("Lake Austin", "08154701", SiteType::Stream, GAGE, &["4.0"]),
        ];
        let collection = aggregate(&records);
        assert_eq!(collection.lakes.len(), 2);
        assert_eq!(collection.lakes[0].gage_height, Some(492.6));
        assert_eq!(collection.lakes[1].gage_height, Some(492.7));
        assert_eq!(collection.streams.len(), 1);
    }

    #[test]
    fn test_lake_reports_first_sample() {
        let records = [record("Lake Travis", "08154500", SiteType::Lake, LAKE, &["670.1", "670.4"])];
        let collection = aggregate(&records);
        assert_eq!(collection.lakes[0].gage_height, Some(670.1));
    }

    #[test]
    fn test_first_seen_order_and_skips() {
        let records = [
            record("Shoal Creek", "08156800", SiteType::Stream, GAGE, &["1.0"]),
            record("Well 12", "3015", SiteType::Other("GW".into()), GAGE, &["1.0"]),
            record("Shoal Creek", "08156800", SiteType::Stream, "Temperature, water, C", &["20"]),
            record("Boggy Creek", "08158100", SiteType::Stream, FLOW, &["-999999"]),
        ];
        let collection = aggregate(&records);
        let names: Vec<&str> = collection.streams.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Shoal Creek", "Boggy Creek"]);
        assert_eq!(collection.streams[1].flow_rate, None);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[]).is_empty());
    }
}
