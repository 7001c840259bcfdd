//! # Ingestion Sink Module
//!
//! Idempotent per-subsystem record stores.
//!
//! This module handles:
//! - The `IngestionSink` trait the pipeline writes through
//! - Upsert keyed by the natural key `(received_time, id, parameter)`
//! - An in-memory sink for tests and dry runs
//! - A SQLite sink with a unique index per subsystem table

pub mod sqlite;

use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::telemetry::{RecordKey, Subsystem, TelemetryRecord};

pub use sqlite::SqliteSink;

/// Outcome of one upsert call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Rows created
    pub inserted: usize,
    /// Existing rows whose value was replaced
    pub updated: usize,
    /// Rows rejected by the store; the rest of the call still ran
    pub failed: usize,
}

impl UpsertSummary {
    /// Add another summary's counts to this one.
    pub fn merge(&mut self, other: UpsertSummary) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.failed += other.failed;
    }
}

/// A store accepting telemetry records per subsystem.
///
/// Implementations must insert records whose natural key is absent and
/// replace the stored record when it is present, so replaying the same
/// records is harmless. Records are applied in order; within one call a
/// later record with the same key wins.
#[cfg_attr(test, mockall::automock)]
pub trait IngestionSink {
    /// Upsert records into the subsystem's collection.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable; individual rejected rows
    /// or batches are counted in [`UpsertSummary::failed`] instead.
    fn upsert(
        &mut self,
        subsystem: Subsystem,
        records: &[TelemetryRecord],
    ) -> Result<UpsertSummary>;
}

/// Sink keeping every collection in memory.
///
/// # Examples
///
/// ```
/// use satlog_ingest::sink::{IngestionSink, MemorySink};
/// use satlog_ingest::telemetry::{Subsystem, TelemetryRecord, TelemetryValue};
///
/// let record = TelemetryRecord {
///     received_time: 1_695_700_000,
///     id: 210,
///     parameter: "btry_temp_1".into(),
///     value: Some(TelemetryValue::Float(24.5)),
///     processed_at: 1_695_700_001,
///     local_date_time: None,
/// };
///
/// let mut sink = MemorySink::new();
/// sink.upsert(Subsystem::Eps, &[record.clone()])?;
/// let again = sink.upsert(Subsystem::Eps, &[record])?;
///
/// assert_eq!(again.updated, 1);
/// assert_eq!(sink.len(Subsystem::Eps), 1);
/// # Ok::<(), satlog_ingest::error::IngestError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    collections: HashMap<Subsystem, BTreeMap<RecordKey, TelemetryRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records for a subsystem.
    pub fn len(&self, subsystem: Subsystem) -> usize {
        self.collections.get(&subsystem).map_or(0, BTreeMap::len)
    }

    /// True if nothing has been stored for any subsystem.
    pub fn is_empty(&self) -> bool {
        self.collections.values().all(BTreeMap::is_empty)
    }

    /// Look up a stored record by natural key.
    pub fn get(&self, subsystem: Subsystem, key: &RecordKey) -> Option<&TelemetryRecord> {
        self.collections.get(&subsystem)?.get(key)
    }

    /// Stored records of a subsystem in key order.
    pub fn records(&self, subsystem: Subsystem) -> Vec<TelemetryRecord> {
        self.collections
            .get(&subsystem)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl IngestionSink for MemorySink {
    fn upsert(
        &mut self,
        subsystem: Subsystem,
        records: &[TelemetryRecord],
    ) -> Result<UpsertSummary> {
        let collection = self.collections.entry(subsystem).or_default();
        let mut summary = UpsertSummary::default();

        for record in records {
            match collection.insert(record.key(), record.clone()) {
                Some(_) => summary.updated += 1,
                None => summary.inserted += 1,
            }
        }

        Ok(summary)
    }
}
