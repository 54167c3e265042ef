//! Concurrent directory traversal engine for fsinventory.
//!
//! # Overview
//!
//! `fsinventory-scan` walks a subtree and records every file, directory and
//! reparse point beneath the root. Key features:
//!
//! - **One unit per directory**: each directory is listed by its own unit
//!   on the tokio blocking pool; units queue their subdirectories as new
//!   units without waiting for them
//! - **Quiescence detection**: an in-flight counter plus a settling check
//!   tells "finished" apart from "momentarily idle"
//! - **Deduplicating store**: case-insensitive, first-writer-wins map that
//!   is safe for concurrent writers
//! - **Error policy**: permission and path-length failures can be skipped
//!   or made fatal independently; anything else is fatal
//! - **Throttled progress** via a callback or broadcast channel
//!
//! # Example
//!
//! ```rust,no_run
//! use fsinventory_scan::{TreeWalker, WalkConfig};
//!
//! # async fn run() -> Result<(), fsinventory_scan::ScanError> {
//! let config = WalkConfig::new("/path/to/walk");
//! let outcome = TreeWalker::new().walk(&config).await?;
//!
//! println!("{} entries", outcome.summary.entries);
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod policy;
mod progress;
mod scanner;
mod store;
mod tracker;
mod walker;

pub use coordinator::{Coordinator, CoordinatorState};
pub use policy::{Disposition, ErrorPolicy};
pub use progress::{ProgressReporter, ProgressSink, ProgressSnapshot};
pub use scanner::{TreeWalker, WalkOutcome, WalkSummary};
pub use store::EntryStore;
pub use tracker::WorkTracker;
pub use walker::{WalkContext, enumerate, spawn_unit};

// Re-export core types for convenience
pub use fsinventory_core::{
    Attributes, DEFAULT_PROGRESS_INTERVAL, ErrorClass, ExclusionMatcher, FileSystemEntry,
    ScanError, WalkConfig, WalkConfigBuilder, normalize_root,
};
