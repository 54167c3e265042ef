//! Walk progress reporting.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

/// Point-in-time progress counters.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// Entries recorded so far.
    pub entries_discovered: u64,
    /// Directory being processed when the snapshot was taken.
    pub current_path: PathBuf,
    /// Work units created so far.
    pub units_spawned: u64,
    /// Work units that have finished.
    pub units_completed: u64,
    /// Time since the walk started.
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Units still queued or running.
    pub fn units_pending(&self) -> u64 {
        self.units_spawned.saturating_sub(self.units_completed)
    }

    /// Entries per second since the walk began.
    pub fn entries_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.entries_discovered as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Receiver of progress snapshots (display only).
pub trait ProgressSink: Send + Sync {
    fn emit(&self, snapshot: &ProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressSnapshot) + Send + Sync,
{
    fn emit(&self, snapshot: &ProgressSnapshot) {
        self(snapshot)
    }
}

impl ProgressSink for broadcast::Sender<ProgressSnapshot> {
    fn emit(&self, snapshot: &ProgressSnapshot) {
        // No subscribers is fine.
        let _ = self.send(snapshot.clone());
    }
}

/// Time-gated notifier.
///
/// At most one snapshot is emitted per interval no matter how many units
/// race the check: the timestamp of the last emission is swapped with a
/// compare-and-exchange, and only the winner emits.
pub struct ProgressReporter {
    interval: Duration,
    origin: Instant,
    last_emit_ms: AtomicU64,
    emitted: AtomicU64,
    sink: Box<dyn ProgressSink>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("interval", &self.interval)
            .field("emitted", &self.emitted())
            .finish_non_exhaustive()
    }
}

impl ProgressReporter {
    /// Create a reporter whose clock started at `origin`.
    pub fn starting_at(
        origin: Instant,
        interval: Duration,
        sink: impl ProgressSink + 'static,
    ) -> Self {
        Self {
            interval,
            origin,
            last_emit_ms: AtomicU64::new(0),
            emitted: AtomicU64::new(0),
            sink: Box::new(sink),
        }
    }

    /// Emit a snapshot if the interval has elapsed since the last one.
    ///
    /// `snapshot` is only built when this call wins the emission.
    /// Returns `true` if a snapshot was emitted.
    pub fn maybe_emit(&self, snapshot: impl FnOnce(Duration) -> ProgressSnapshot) -> bool {
        let elapsed = self.origin.elapsed();
        let now_ms = elapsed.as_millis() as u64;
        let interval_ms = self.interval.as_millis() as u64;

        let last = self.last_emit_ms.load(Ordering::Acquire);
        if now_ms.saturating_sub(last) < interval_ms {
            return false;
        }
        if self
            .last_emit_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Another unit emitted for this crossing.
            return false;
        }

        self.emitted.fetch_add(1, Ordering::Relaxed);
        self.sink.emit(&snapshot(elapsed));
        true
    }

    /// Number of snapshots emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}
