//! Continue-or-abort decisions for traversal errors.

use std::sync::atomic::{AtomicU64, Ordering};

use fsinventory_core::{ErrorClass, ScanError, WalkConfig};
use tracing::{error, warn};

/// What a unit should do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Skip the offending node and carry on with its siblings.
    Continue,
    /// Propagate the error and end the walk.
    Abort,
}

/// Per-class continuation flags plus a counter of skipped errors.
#[derive(Debug, Default)]
pub struct ErrorPolicy {
    continue_on_permission_denied: bool,
    continue_on_path_too_long: bool,
    skipped: AtomicU64,
}

impl ErrorPolicy {
    /// Create a policy with explicit flags.
    pub fn new(continue_on_permission_denied: bool, continue_on_path_too_long: bool) -> Self {
        Self {
            continue_on_permission_denied,
            continue_on_path_too_long,
            skipped: AtomicU64::new(0),
        }
    }

    /// Create a policy from the walk configuration.
    pub fn from_config(config: &WalkConfig) -> Self {
        Self::new(
            config.continue_on_permission_denied,
            config.continue_on_path_too_long,
        )
    }

    /// Decide what to do with an error of the given class.
    pub fn decide(&self, class: ErrorClass) -> Disposition {
        let keep_going = match class {
            ErrorClass::PermissionDenied => self.continue_on_permission_denied,
            ErrorClass::PathTooLong => self.continue_on_path_too_long,
            ErrorClass::Other => false,
        };
        if keep_going {
            Disposition::Continue
        } else {
            Disposition::Abort
        }
    }

    /// Log `err` and either swallow it or hand it back for propagation.
    ///
    /// `method` names the operation that failed. The log line is always
    /// written before the error is returned.
    pub fn handle(&self, err: ScanError, method: &'static str) -> Result<(), ScanError> {
        let class = err.class();
        let current = std::thread::current();
        let thread_name = current.name().unwrap_or("<unnamed>");
        let path = err
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        match self.decide(class) {
            Disposition::Continue => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    thread = ?current.id(),
                    thread_name,
                    method,
                    path = %path,
                    class = %class,
                    error = %err.chain_message(),
                    "Skipping entry"
                );
                Ok(())
            }
            Disposition::Abort => {
                error!(
                    thread = ?current.id(),
                    thread_name,
                    method,
                    path = %path,
                    class = %class,
                    error = %err.chain_message(),
                    "Aborting walk"
                );
                Err(err)
            }
        }
    }

    /// Number of errors that were logged and skipped.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}
