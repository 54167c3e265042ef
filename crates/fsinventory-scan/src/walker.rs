//! Per-directory enumeration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fsinventory_core::{ExclusionMatcher, FileSystemEntry, ScanError};
use tracing::{debug, trace};

use crate::policy::ErrorPolicy;
use crate::progress::{ProgressReporter, ProgressSnapshot};
use crate::store::EntryStore;
use crate::tracker::WorkTracker;

/// State shared by every unit of one walk.
#[derive(Debug)]
pub struct WalkContext {
    pub store: Arc<EntryStore>,
    pub tracker: Arc<WorkTracker>,
    pub policy: ErrorPolicy,
    pub exclusions: ExclusionMatcher,
    pub progress: Option<ProgressReporter>,
}

/// Queue a unit that enumerates `dir`.
pub fn spawn_unit(dir: PathBuf, ctx: &Arc<WalkContext>) {
    let unit_ctx = Arc::clone(ctx);
    ctx.tracker.spawn(move || enumerate(&dir, &unit_ctx));
}

/// List the immediate children of `dir`, record each one and queue a unit
/// for every subdirectory that should be descended into.
///
/// Child units are fire-and-forget: this returns once they are queued.
pub fn enumerate(dir: &Path, ctx: &Arc<WalkContext>) -> Result<(), ScanError> {
    report_progress(dir, ctx);

    let listing = match std::fs::read_dir(dir) {
        Ok(listing) => listing,
        Err(err) => return ctx.policy.handle(ScanError::io(dir, err), "enumerate"),
    };

    for item in listing {
        let dirent = match item {
            Ok(dirent) => dirent,
            Err(err) => {
                ctx.policy.handle(ScanError::io(dir, err), "enumerate")?;
                continue;
            }
        };

        let path = dirent.path();
        let entry = match FileSystemEntry::from_path(&path) {
            Ok(entry) => entry,
            Err(err) => {
                ctx.policy.handle(err, "describe")?;
                continue;
            }
        };

        let is_reparse_point = entry.is_reparse_point();
        let traversable = entry.is_traversable();
        ctx.store.insert_or_ignore(entry);

        if is_reparse_point {
            trace!(path = %path.display(), "Not following reparse point");
            continue;
        }
        if !traversable {
            continue;
        }
        if let Some(fragment) = ctx.exclusions.matching_fragment(&path) {
            debug!(path = %path.display(), fragment, "Excluded from recursion");
            continue;
        }
        if ctx.tracker.is_failed() {
            // The walk is unwinding; stop fanning out.
            return Ok(());
        }
        spawn_unit(path, ctx);
    }

    Ok(())
}

fn report_progress(dir: &Path, ctx: &WalkContext) {
    let Some(reporter) = ctx.progress.as_ref() else {
        return;
    };
    if ctx.store.is_empty() {
        return;
    }
    reporter.maybe_emit(|elapsed| ProgressSnapshot {
        entries_discovered: ctx.store.len() as u64,
        current_path: dir.to_path_buf(),
        units_spawned: ctx.tracker.spawned(),
        units_completed: ctx.tracker.completed(),
        elapsed,
    });
}
