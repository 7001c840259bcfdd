//! # Ingest Pipeline
//!
//! One read cycle: new bytes → chunk processing → categorization →
//! per-subsystem upsert → notification.
//!
//! The bookmark is committed as soon as the chunk has been processed, before
//! any sink call, so sink or notification failures never hold the log back.
//! Replaying uncommitted bytes after a crash is harmless because upserts are
//! idempotent.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::allow_list::AllowLists;
use crate::error::Result;
use crate::notifier::{notify_best_effort, Notifier};
use crate::parser::{ChunkProcessor, ParserState};
use crate::sink::{IngestionSink, UpsertSummary};
use crate::source::{LogSource, RunFlag, TriggerSources};
use crate::telemetry::{categorize, Subsystem};

/// What one read cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub start_offset: u64,
    pub end_offset: u64,
    pub rotated: bool,
    /// Non-blank lines processed
    pub lines: usize,
    /// Lines dropped as malformed
    pub parse_errors: usize,
    /// Records produced by the parsers
    pub records: usize,
    /// Records outside every subsystem id range
    pub unknown: usize,
    /// Records whose id is not in the subsystem's allow-list
    pub filtered: usize,
    /// Upsert outcome per subsystem that reached the sink successfully
    pub upserts: BTreeMap<Subsystem, UpsertSummary>,
    /// Subsystem batches the sink rejected as a whole
    pub sink_failures: usize,
    /// Notifications delivered
    pub notified: usize,
}

/// Single-writer ingest pipeline over one log file.
pub struct Pipeline<S, N> {
    source: LogSource,
    processor: ChunkProcessor,
    allow_lists: AllowLists,
    sink: S,
    notifier: N,
    state: ParserState,
}

impl<S: IngestionSink, N: Notifier> Pipeline<S, N> {
    pub fn new(
        source: LogSource,
        processor: ChunkProcessor,
        allow_lists: AllowLists,
        sink: S,
        notifier: N,
    ) -> Self {
        Self {
            source,
            processor,
            allow_lists,
            sink,
            notifier,
            state: ParserState::default(),
        }
    }

    pub fn source(&self) -> &LogSource {
        &self.source
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Parser state carried into the next cycle.
    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Run one read cycle.
    ///
    /// Returns `Ok(None)` when there was nothing new to read.
    ///
    /// # Errors
    ///
    /// Returns error only if the log file exists but cannot be read. Parse,
    /// sink and notification failures are logged and reflected in the report.
    pub async fn run_cycle(&mut self) -> Result<Option<CycleReport>> {
        let started = Instant::now();

        let Some(chunk) = self.source.read_new().await? else {
            return Ok(None);
        };

        let state = if chunk.rotated {
            ParserState::default()
        } else {
            self.state.carry_section()
        };
        let output = self.processor.process(state, &chunk.text);
        self.state = output.state;
        self.source.commit(chunk.end_offset);

        let mut report = CycleReport {
            start_offset: chunk.start_offset,
            end_offset: chunk.end_offset,
            rotated: chunk.rotated,
            lines: output.lines,
            parse_errors: output.errors,
            records: output.records.len(),
            ..CycleReport::default()
        };

        let buckets = categorize(output.records);
        report.unknown = report.records - buckets.values().map(Vec::len).sum::<usize>();

        for (subsystem, records) in buckets {
            let before = records.len();
            let records: Vec<_> = records
                .into_iter()
                .filter(|r| self.allow_lists.accepts_id(subsystem, r.id))
                .collect();
            if records.len() < before {
                debug!(
                    "Dropped {} {} records with ids outside the allow-list",
                    before - records.len(),
                    subsystem
                );
                report.filtered += before - records.len();
            }
            if records.is_empty() {
                continue;
            }

            match self.sink.upsert(subsystem, &records) {
                Ok(summary) => {
                    report.upserts.insert(subsystem, summary);
                    if summary.inserted + summary.updated > 0
                        && notify_best_effort(&self.notifier, subsystem, &records).await
                    {
                        report.notified += 1;
                    }
                }
                Err(e) => {
                    error!("Upsert into {} failed: {}", subsystem.collection(), e);
                    report.sink_failures += 1;
                }
            }
        }

        info!(
            "Cycle {}..{}: {} lines, {} records ({} errors, {} unknown, {} filtered), \
             upserts {:?} in {:?}",
            report.start_offset,
            report.end_offset,
            report.lines,
            report.records,
            report.parse_errors,
            report.unknown,
            report.filtered,
            report.upserts,
            started.elapsed()
        );

        Ok(Some(report))
    }

    /// Run one cycle under `flag`. Returns true if new bytes were processed.
    async fn run_guarded(&mut self, flag: &RunFlag) -> bool {
        if !flag.try_begin() {
            return false;
        }

        let ran = match self.run_cycle().await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                error!("Read cycle failed: {}", e);
                false
            }
        };

        flag.finish();
        ran
    }

    /// Run a startup cycle, then one cycle per trigger until `shutdown` resolves.
    ///
    /// `shutdown` is polled before the first cycle starts, so a signal
    /// listener behind it is registered from the very beginning. A shutdown
    /// arriving mid-cycle is noted and the cycle runs to completion before
    /// this returns. Failed cycles are logged and the loop keeps going.
    ///
    /// Returns the number of cycles that processed new bytes.
    pub async fn run_until_shutdown<F>(
        &mut self,
        triggers: &mut TriggerSources,
        flag: &RunFlag,
        shutdown: F,
    ) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles: u64 = 0;

        loop {
            let mut stopping = false;
            {
                let cycle = self.run_guarded(flag);
                tokio::pin!(cycle);

                loop {
                    tokio::select! {
                        biased;

                        _ = &mut shutdown, if !stopping => {
                            info!("Shutdown requested, finishing the current cycle");
                            stopping = true;
                        }

                        ran = &mut cycle => {
                            if ran {
                                cycles += 1;
                            }
                            break;
                        }
                    }
                }
            }

            if stopping {
                break;
            }

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }

                trigger = triggers.next() => {
                    if trigger.is_none() {
                        warn!("Trigger sources stopped unexpectedly");
                        break;
                    }
                }
            }
        }

        cycles
    }
}
