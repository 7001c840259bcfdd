//! Trigger sources deciding when a read cycle runs.
//!
//! A size watcher and a fallback poll both feed one bounded channel. While a
//! cycle is running, or while a trigger is already queued, further triggers
//! are dropped, so bursts collapse into at most one follow-up cycle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, trace};

/// Why a read cycle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The watched file changed size
    Changed,
    /// The fallback poll interval elapsed
    Poll,
}

/// Run-in-progress flag shared between the ingest loop and the triggers.
#[derive(Debug, Clone, Default)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a cycle as started. Returns false if one is already running.
    pub fn try_begin(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Mark the running cycle as finished.
    pub fn finish(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The spawned watcher and poll tasks plus the channel they feed.
#[derive(Debug)]
pub struct TriggerSources {
    receiver: mpsc::Receiver<Trigger>,
    handles: Vec<JoinHandle<()>>,
}

impl TriggerSources {
    /// Spawn the size watcher for `path` and the fallback poll.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        path: PathBuf,
        watch_interval: Duration,
        poll_interval: Duration,
        flag: RunFlag,
    ) -> Self {
        let (tx, receiver) = mpsc::channel(1);

        let handles = vec![
            tokio::spawn(watch_size(path, watch_interval, tx.clone(), flag.clone())),
            tokio::spawn(poll(poll_interval, tx, flag)),
        ];

        Self { receiver, handles }
    }

    /// Wait for the next trigger, discarding any others already queued.
    ///
    /// Returns `None` once every trigger task has stopped.
    pub async fn next(&mut self) -> Option<Trigger> {
        let trigger = self.receiver.recv().await?;
        while let Ok(extra) = self.receiver.try_recv() {
            trace!("Coalesced queued {:?} trigger", extra);
        }
        Some(trigger)
    }

    /// Stop the trigger tasks.
    pub fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        debug!("Trigger sources stopped");
    }
}

/// Queue a trigger unless a cycle is running or one is already pending.
///
/// Returns false once the receiving side is gone.
fn offer(tx: &mpsc::Sender<Trigger>, trigger: Trigger, flag: &RunFlag) -> bool {
    if flag.is_running() {
        trace!("Cycle in progress, dropping {:?} trigger", trigger);
        return true;
    }

    match tx.try_send(trigger) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            trace!("Trigger already pending, dropping {:?}", trigger);
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

async fn file_len(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path).await.ok().map(|m| m.len())
}

async fn watch_size(path: PathBuf, period: Duration, tx: mpsc::Sender<Trigger>, flag: RunFlag) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_len = file_len(&path).await;
    loop {
        ticker.tick().await;

        let len = file_len(&path).await;
        if len != last_len {
            debug!("Log size changed: {:?} -> {:?}", last_len, len);
            last_len = len;
            if !offer(&tx, Trigger::Changed, &flag) {
                break;
            }
        }
    }
}

async fn poll(period: Duration, tx: mpsc::Sender<Trigger>, flag: RunFlag) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately; the startup cycle covers it
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if !offer(&tx, Trigger::Poll, &flag) {
            break;
        }
    }
}
