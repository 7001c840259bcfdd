//! # Categorizer
//!
//! Partitions a record batch into per-subsystem buckets by id range.

use std::collections::BTreeMap;
use tracing::warn;

use super::record::TelemetryRecord;
use super::subsystem::Subsystem;

/// Records grouped by owning subsystem.
///
/// Only subsystems that received at least one record are present.
pub type Categorized = BTreeMap<Subsystem, Vec<TelemetryRecord>>;

/// Partition records by subsystem id range.
///
/// Records whose id falls outside every known range are dropped with a
/// warning; they never reach a sink. Input order is preserved inside each
/// bucket so later duplicates still win at upsert time.
///
/// # Examples
///
/// ```
/// use satlog_ingest::telemetry::{categorize, Subsystem, TelemetryRecord};
///
/// let record = |id| TelemetryRecord {
///     received_time: 0,
///     id,
///     parameter: "p".into(),
///     value: None,
///     processed_at: 0,
///     local_date_time: None,
/// };
///
/// let buckets = categorize(vec![record(210), record(999), record(850)]);
/// assert_eq!(buckets[&Subsystem::Eps].len(), 1);
/// assert_eq!(buckets[&Subsystem::Uhf].len(), 1);
/// assert!(!buckets.contains_key(&Subsystem::Obc));
/// ```
pub fn categorize(records: Vec<TelemetryRecord>) -> Categorized {
    let mut buckets = Categorized::new();

    for record in records {
        match Subsystem::for_id(record.id) {
            Some(subsystem) => buckets.entry(subsystem).or_default().push(record),
            None => warn!(
                "Unknown TM id range for id {} (parameter '{}'), record dropped",
                record.id, record.parameter
            ),
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryValue;

    fn record(id: u32, parameter: &str, value: i64) -> TelemetryRecord {
        TelemetryRecord {
            received_time: 1_695_700_000,
            id,
            parameter: parameter.to_string(),
            value: Some(TelemetryValue::Int(value)),
            processed_at: 1_695_700_000,
            local_date_time: None,
        }
    }

    #[test]
    fn test_partition_by_range() {
        let buckets = categorize(vec![
            record(210, "a", 1),
            record(520, "b", 2),
            record(801, "c", 3),
            record(300, "d", 4),
        ]);

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[&Subsystem::Eps].len(), 2);
        assert_eq!(buckets[&Subsystem::Obc].len(), 1);
        assert_eq!(buckets[&Subsystem::Uhf].len(), 1);
    }

    #[test]
    fn test_unknown_ids_are_dropped() {
        let buckets = categorize(vec![record(999, "x", 1), record(100, "y", 2)]);
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_bucket_preserves_input_order() {
        let buckets = categorize(vec![
            record(210, "same", 1),
            record(999, "gone", 0),
            record(210, "same", 2),
        ]);

        let eps = &buckets[&Subsystem::Eps];
        assert_eq!(eps[0].value, Some(TelemetryValue::Int(1)));
        assert_eq!(eps[1].value, Some(TelemetryValue::Int(2)));
    }

    #[test]
    fn test_empty_input() {
        assert!(categorize(Vec::new()).is_empty());
    }
}
