//! Concurrent tree walker.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fsinventory_core::{FileSystemEntry, ScanError, WalkConfig};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::coordinator::Coordinator;
use crate::policy::ErrorPolicy;
use crate::progress::{ProgressReporter, ProgressSink, ProgressSnapshot};
use crate::store::EntryStore;
use crate::tracker::WorkTracker;
use crate::walker::{WalkContext, spawn_unit};

/// Totals for a finished walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Distinct entries recorded.
    pub entries: u64,
    /// Regular files (and other non-directory nodes).
    pub files: u64,
    /// Directories, excluding reparse points.
    pub directories: u64,
    /// Symlinks, junctions and other reparse points.
    pub reparse_points: u64,
    /// Nodes that vanished before they could be described.
    pub missing: u64,
    /// Sum of file sizes in bytes.
    pub total_bytes: u64,
    /// Work units created, the root unit included.
    pub units: u64,
    /// Errors logged and skipped under the continuation policy.
    pub skipped_errors: u64,
    /// Wall-clock duration of the walk.
    pub elapsed: Duration,
}

impl WalkSummary {
    fn from_entries(entries: &[FileSystemEntry]) -> Self {
        let mut summary = Self {
            entries: entries.len() as u64,
            ..Self::default()
        };
        for entry in entries {
            if entry.is_missing() {
                summary.missing += 1;
            } else if entry.is_reparse_point() {
                summary.reparse_points += 1;
            } else if entry.is_directory() {
                summary.directories += 1;
            } else {
                summary.files += 1;
                summary.total_bytes += u64::try_from(entry.size).unwrap_or(0);
            }
        }
        summary
    }
}

/// Result of a completed walk.
#[derive(Debug)]
pub struct WalkOutcome {
    /// Root that was walked.
    pub root: PathBuf,
    /// Every recorded entry, sorted by path.
    pub entries: Vec<FileSystemEntry>,
    /// Totals.
    pub summary: WalkSummary,
}

/// Walks a tree with one concurrent unit per directory.
pub struct TreeWalker {
    progress_tx: broadcast::Sender<ProgressSnapshot>,
}

impl TreeWalker {
    /// Create a new walker.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(16);
        Self { progress_tx }
    }

    /// Subscribe to progress snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressSnapshot> {
        self.progress_tx.subscribe()
    }

    /// Walk `config.root`, publishing progress to subscribers.
    pub async fn walk(&self, config: &WalkConfig) -> Result<WalkOutcome, ScanError> {
        self.walk_with_sink(config, self.progress_tx.clone()).await
    }

    /// Walk `config.root`, sending progress to `sink`.
    pub async fn walk_with_sink(
        &self,
        config: &WalkConfig,
        sink: impl ProgressSink + 'static,
    ) -> Result<WalkOutcome, ScanError> {
        let start = Instant::now();
        let root = resolve_root(&config.root)?;

        info!(
            root = %root.display(),
            exclusions = config.exclusions.len(),
            "Starting walk"
        );

        let tracker = WorkTracker::new(Handle::current());
        let ctx = Arc::new(WalkContext {
            store: Arc::new(EntryStore::new()),
            tracker: Arc::clone(&tracker),
            policy: ErrorPolicy::from_config(config),
            exclusions: config.exclusion_matcher(),
            progress: config
                .progress_interval
                .map(|interval| ProgressReporter::starting_at(start, interval, sink)),
        });

        spawn_unit(root.clone(), &ctx);

        let coordinator = Coordinator::new(Arc::clone(&tracker), config.settle_interval);
        let state = coordinator.wait_for_quiescence().await;
        debug!(?state, "Walk quiescent");

        if let Some(err) = tracker.take_failure() {
            return Err(err);
        }

        let entries = ctx.store.snapshot();
        let mut summary = WalkSummary::from_entries(&entries);
        summary.units = tracker.spawned();
        summary.skipped_errors = ctx.policy.skipped();
        summary.elapsed = start.elapsed();

        info!(
            entries = summary.entries,
            files = summary.files,
            directories = summary.directories,
            reparse_points = summary.reparse_points,
            missing = summary.missing,
            skipped_errors = summary.skipped_errors,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Walk completed"
        );

        Ok(WalkOutcome {
            root,
            entries,
            summary,
        })
    }
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self::new()
    }
}

/// Make the root absolute and check it is an existing directory.
fn resolve_root(root: &Path) -> Result<PathBuf, ScanError> {
    let root = std::path::absolute(root).map_err(|e| ScanError::io(root, e))?;
    let metadata = std::fs::metadata(&root).map_err(|e| ScanError::io(&root, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory { path: root });
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "another file here").unwrap();

        temp
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_basic_walk() {
        let temp = create_test_tree();
        let config = WalkConfig::new(temp.path());

        let outcome = TreeWalker::new().walk(&config).await.unwrap();

        assert_eq!(outcome.summary.entries, 7);
        assert_eq!(outcome.summary.files, 4);
        assert_eq!(outcome.summary.directories, 3);
        assert_eq!(outcome.summary.total_bytes, 5 + 17 + 4 + 17);
        // root + dir1 + dir2 + subdir
        assert_eq!(outcome.summary.units, 4);
    }

    #[test]
    fn test_summary_counts_vanished_nodes_apart() {
        let mut file = FileSystemEntry::missing(PathBuf::from("/r/kept"));
        file.size = 10;
        let entries = vec![file, FileSystemEntry::missing(PathBuf::from("/r/gone"))];

        let summary = WalkSummary::from_entries(&entries);
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.files, 1);
        assert_eq!(summary.total_bytes, 10);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_root_is_not_recorded() {
        let temp = create_test_tree();
        let config = WalkConfig::new(temp.path());

        let outcome = TreeWalker::new().walk(&config).await.unwrap();
        assert!(outcome.entries.iter().all(|e| e.path != outcome.root));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_file_root_is_rejected() {
        let temp = create_test_tree();
        let config = WalkConfig::new(temp.path().join("file1.txt"));

        let err = TreeWalker::new().walk(&config).await.unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_root_is_rejected() {
        let temp = TempDir::new().unwrap();
        let config = WalkConfig::new(temp.path().join("nope"));

        let err = TreeWalker::new().walk(&config).await.unwrap_err();
        assert!(matches!(err, ScanError::NotFound { .. }));
    }
}
