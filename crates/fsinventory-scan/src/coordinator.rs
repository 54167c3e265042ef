//! Termination detection for the unit set.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::tracker::WorkTracker;

/// Where the coordinator is in its wait loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Waiting for every known unit to finish.
    Running { known: u64 },
    /// Known units finished; waiting out the grace interval.
    Settling { observed: u64 },
    /// No unit is running and none can appear. Terminal.
    Done { units: u64 },
}

/// Waits until the walk is quiescent.
///
/// Units register their children before they finish, so the in-flight count
/// can only reach zero once nothing is left to run. The settling step then
/// confirms the total number of spawned units did not move while waiting.
#[derive(Debug)]
pub struct Coordinator {
    tracker: Arc<WorkTracker>,
    settle_interval: Duration,
}

impl Coordinator {
    pub fn new(tracker: Arc<WorkTracker>, settle_interval: Duration) -> Self {
        Self {
            tracker,
            settle_interval,
        }
    }

    /// Drive the state machine to `Done`.
    pub async fn wait_for_quiescence(&self) -> CoordinatorState {
        let mut state = CoordinatorState::Running {
            known: self.tracker.spawned(),
        };

        loop {
            state = self.step(state).await;
            debug!(?state, "Coordinator transition");
            if let CoordinatorState::Done { .. } = state {
                return state;
            }
        }
    }

    async fn step(&self, state: CoordinatorState) -> CoordinatorState {
        match state {
            CoordinatorState::Running { .. } => {
                self.tracker.drained().await;
                CoordinatorState::Settling {
                    observed: self.tracker.spawned(),
                }
            }
            CoordinatorState::Settling { observed } => {
                if !self.settle_interval.is_zero() {
                    tokio::time::sleep(self.settle_interval).await;
                }
                let now = self.tracker.spawned();
                if now == observed && self.tracker.in_flight() == 0 {
                    CoordinatorState::Done { units: now }
                } else {
                    CoordinatorState::Running { known: now }
                }
            }
            done @ CoordinatorState::Done { .. } => done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::runtime::Handle;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_done_only_after_late_spawns() {
        let tracker = WorkTracker::new(Handle::current());

        // Each level sleeps before spawning the next, so a single
        // wait-for-current-set would return early.
        fn chain(tracker: Arc<WorkTracker>, depth: u32) {
            if depth == 0 {
                return;
            }
            let next = Arc::clone(&tracker);
            tracker.spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                chain(next, depth - 1);
                Ok(())
            });
        }
        chain(Arc::clone(&tracker), 6);

        let coordinator = Coordinator::new(Arc::clone(&tracker), Duration::ZERO);
        let state = coordinator.wait_for_quiescence().await;

        assert_eq!(state, CoordinatorState::Done { units: 6 });
        assert_eq!(tracker.completed(), 6);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_settle_interval_is_waited() {
        let tracker = WorkTracker::new(Handle::current());
        tracker.spawn(|| Ok(()));

        let coordinator = Coordinator::new(Arc::clone(&tracker), Duration::from_millis(50));
        let start = std::time::Instant::now();
        let state = coordinator.wait_for_quiescence().await;

        assert_eq!(state, CoordinatorState::Done { units: 1 });
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
