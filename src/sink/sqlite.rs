//! # SQLite Sink
//!
//! One table per subsystem collection, each with a unique index on the
//! natural key so replayed deliveries overwrite instead of duplicating.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, error, info};

use super::{IngestionSink, UpsertSummary};
use crate::error::Result;
use crate::telemetry::{RecordKey, Subsystem, TelemetryRecord, TelemetryValue};

impl ToSql for TelemetryValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            TelemetryValue::Int(v) => ToSqlOutput::from(*v),
            TelemetryValue::Float(v) => ToSqlOutput::from(*v),
            TelemetryValue::Text(v) => ToSqlOutput::from(v.as_str()),
        })
    }
}

impl FromSql for TelemetryValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(v) => Ok(TelemetryValue::Int(v)),
            ValueRef::Real(v) => Ok(TelemetryValue::Float(v)),
            ValueRef::Text(_) => value.as_str().map(|s| TelemetryValue::Text(s.to_string())),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// SQLite-backed ingestion sink.
pub struct SqliteSink {
    conn: Connection,
    batch_size: usize,
}

impl std::fmt::Debug for SqliteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSink")
            .field("path", &self.conn.path())
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl SqliteSink {
    /// Open (or create) the database file and its subsystem tables.
    ///
    /// # Errors
    ///
    /// Returns error if the parent directory cannot be created or the
    /// database cannot be opened or initialized.
    pub fn open<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("Failed to enable WAL mode: {}", e);
        }

        let sink = Self::with_connection(conn, batch_size)?;
        info!("Opened telemetry database at {}", path.display());
        Ok(sink)
    }

    /// In-memory database, mainly for tests.
    pub fn open_in_memory(batch_size: usize) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, batch_size)
    }

    fn with_connection(conn: Connection, batch_size: usize) -> Result<Self> {
        let sink = Self {
            conn,
            batch_size: batch_size.max(1),
        };
        sink.ensure_tables()?;
        Ok(sink)
    }

    fn ensure_tables(&self) -> Result<()> {
        for subsystem in Subsystem::ALL {
            let table = subsystem.collection();
            self.conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    tm_received_time INTEGER NOT NULL,
                    tm_id INTEGER NOT NULL,
                    parameter TEXT NOT NULL,
                    value,
                    processed_at INTEGER NOT NULL,
                    local_date_time TEXT
                );
                CREATE UNIQUE INDEX IF NOT EXISTS {table}_telemetry_index
                    ON {table} (tm_received_time, tm_id, parameter);"
            ))?;
            debug!("Ensured table and unique index for {}", table);
        }
        Ok(())
    }

    /// Number of stored records for a subsystem.
    pub fn count(&self, subsystem: Subsystem) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", subsystem.collection()),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Look up a stored record by natural key.
    pub fn get(&self, subsystem: Subsystem, key: &RecordKey) -> Result<Option<TelemetryRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT tm_received_time, tm_id, parameter, value, processed_at, local_date_time
                     FROM {}
                     WHERE tm_received_time = ?1 AND tm_id = ?2 AND parameter = ?3",
                    subsystem.collection()
                ),
                params![key.received_time, key.id, key.parameter],
                |row| {
                    Ok(TelemetryRecord {
                        received_time: row.get(0)?,
                        id: row.get(1)?,
                        parameter: row.get(2)?,
                        value: row.get(3)?,
                        processed_at: row.get(4)?,
                        local_date_time: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn upsert_chunk(
        &mut self,
        table: &str,
        records: &[TelemetryRecord],
    ) -> Result<UpsertSummary> {
        let tx = self.conn.transaction()?;
        let mut summary = UpsertSummary::default();
        {
            let mut insert = tx.prepare_cached(&format!(
                "INSERT OR IGNORE INTO {table}
                    (tm_received_time, tm_id, parameter, value, processed_at, local_date_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ))?;
            let mut update = tx.prepare_cached(&format!(
                "UPDATE {table}
                 SET value = ?4, processed_at = ?5, local_date_time = ?6
                 WHERE tm_received_time = ?1 AND tm_id = ?2 AND parameter = ?3"
            ))?;

            for record in records {
                let values: [&dyn ToSql; 6] = [
                    &record.received_time,
                    &record.id,
                    &record.parameter,
                    &record.value,
                    &record.processed_at,
                    &record.local_date_time,
                ];

                let result = match insert.execute(&values[..]) {
                    Ok(0) => update.execute(&values[..]).map(|_| false),
                    Ok(_) => Ok(true),
                    Err(e) => Err(e),
                };

                match result {
                    Ok(true) => summary.inserted += 1,
                    Ok(false) => summary.updated += 1,
                    Err(e) => {
                        error!(
                            "Failed to upsert {} (tm_id {}, time {}): {}",
                            record.parameter, record.id, record.received_time, e
                        );
                        summary.failed += 1;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(summary)
    }
}

impl IngestionSink for SqliteSink {
    fn upsert(
        &mut self,
        subsystem: Subsystem,
        records: &[TelemetryRecord],
    ) -> Result<UpsertSummary> {
        let table = subsystem.collection();
        let mut summary = UpsertSummary::default();

        // A failed batch is rolled back as a whole; later batches still run
        for chunk in records.chunks(self.batch_size) {
            match self.upsert_chunk(table, chunk) {
                Ok(chunk_summary) => summary.merge(chunk_summary),
                Err(e) => {
                    error!("Batch of {} {} records failed: {}", chunk.len(), table, e);
                    summary.failed += chunk.len();
                }
            }
        }

        Ok(summary)
    }
}
