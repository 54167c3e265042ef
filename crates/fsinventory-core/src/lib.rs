//! Core types for fsinventory.
//!
//! This crate provides the data structures shared by the traversal engine
//! and its front ends: discovered entries, the error taxonomy, walk
//! configuration and exclusion matching.

mod config;
mod entry;
mod error;
mod exclusion;

pub use config::{DEFAULT_PROGRESS_INTERVAL, WalkConfig, WalkConfigBuilder, normalize_root};
pub use entry::{Attributes, FileSystemEntry};
pub use error::{ErrorClass, ScanError};
pub use exclusion::ExclusionMatcher;
