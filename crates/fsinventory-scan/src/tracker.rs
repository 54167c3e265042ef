//! Tracking of in-flight work units.
//!
//! Every unit is counted *before* it is handed to the runtime and uncounted
//! only after it finishes, so a parent that is still registering children
//! always holds the in-flight count above zero. The decrement that brings
//! the count to zero wakes the coordinator.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use fsinventory_core::ScanError;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::error;

/// Shared bookkeeping for the dynamically growing set of work units.
#[derive(Debug)]
pub struct WorkTracker {
    runtime: Handle,
    in_flight: AtomicUsize,
    spawned: AtomicU64,
    completed: AtomicU64,
    idle: Notify,
    failed: AtomicBool,
    failure: Mutex<Option<ScanError>>,
}

impl WorkTracker {
    /// Create a tracker that spawns onto the given runtime.
    pub fn new(runtime: Handle) -> Arc<Self> {
        Arc::new(Self {
            runtime,
            in_flight: AtomicUsize::new(0),
            spawned: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            idle: Notify::new(),
            failed: AtomicBool::new(false),
            failure: Mutex::new(None),
        })
    }

    /// Run `unit` on the blocking pool and track it until it finishes.
    ///
    /// There is no cap on how many units may be queued.
    pub fn spawn<F>(self: &Arc<Self>, unit: F)
    where
        F: FnOnce() -> Result<(), ScanError> + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.spawned.fetch_add(1, Ordering::SeqCst);

        let guard = UnitGuard {
            tracker: Arc::clone(self),
            finished: false,
        };
        self.runtime.spawn_blocking(move || {
            let mut guard = guard;
            let result = unit();
            guard.finish(result);
        });
    }

    /// Units currently queued or running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Units ever created.
    pub fn spawned(&self) -> u64 {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Units that have finished, successfully or not.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Check whether a fatal error has been recorded.
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Take the first fatal error, if any.
    pub fn take_failure(&self) -> Option<ScanError> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Wait until no unit is queued or running.
    pub async fn drained(&self) {
        // notify_one stores a permit if nobody is waiting yet, so a
        // decrement that lands between the check and the await is not lost.
        while self.in_flight() > 0 {
            self.idle.notified().await;
        }
    }

    fn record_failure(&self, err: ScanError) {
        // First failure wins; later ones were already logged by the policy.
        let mut slot = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() && !self.failed.swap(true, Ordering::SeqCst) {
            *slot = Some(err);
        }
    }

    fn unit_finished(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_one();
        }
    }
}

/// Marks a unit finished on every exit path, including panics and the
/// runtime dropping the task unrun.
struct UnitGuard {
    tracker: Arc<WorkTracker>,
    finished: bool,
}

impl UnitGuard {
    fn finish(&mut self, result: Result<(), ScanError>) {
        if let Err(err) = result {
            self.tracker.record_failure(err);
        }
        self.finished = true;
        self.tracker.unit_finished();
    }
}

impl Drop for UnitGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let reason = if std::thread::panicking() {
            "work unit panicked"
        } else {
            "work unit dropped before running"
        };
        error!(reason, "Work unit did not complete");
        self.tracker.record_failure(ScanError::UnitFailed {
            message: reason.to_string(),
        });
        self.tracker.unit_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drains_after_nested_spawns() {
        let tracker = WorkTracker::new(Handle::current());

        let outer = Arc::clone(&tracker);
        tracker.spawn(move || {
            for _ in 0..4 {
                let inner = Arc::clone(&outer);
                outer.spawn(move || {
                    std::thread::sleep(Duration::from_millis(20));
                    inner.spawn(|| Ok(()));
                    Ok(())
                });
            }
            Ok(())
        });

        tracker.drained().await;
        assert_eq!(tracker.in_flight(), 0);
        assert_eq!(tracker.spawned(), 9);
        assert_eq!(tracker.completed(), 9);
        assert!(!tracker.is_failed());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_first_failure_is_kept() {
        let tracker = WorkTracker::new(Handle::current());
        tracker.spawn(|| {
            Err(ScanError::NotADirectory {
                path: "/first".into(),
            })
        });
        tracker.drained().await;
        tracker.spawn(|| {
            Err(ScanError::NotADirectory {
                path: "/second".into(),
            })
        });
        tracker.drained().await;

        assert!(tracker.is_failed());
        match tracker.take_failure() {
            Some(ScanError::NotADirectory { path }) => assert_eq!(path, std::path::Path::new("/first")),
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_panicking_unit_is_counted() {
        let tracker = WorkTracker::new(Handle::current());
        tracker.spawn(|| panic!("boom"));
        tracker.drained().await;

        assert_eq!(tracker.completed(), 1);
        assert!(tracker.is_failed());
    }
}
