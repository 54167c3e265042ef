//! Walk configuration types.

use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::exclusion::ExclusionMatcher;

/// Default time between two progress emissions.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for a traversal.
///
/// Built once at startup and shared read-only by every work unit.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct WalkConfig {
    /// Root directory to walk.
    pub root: PathBuf,

    /// Case-insensitive path fragments that stop recursion.
    #[builder(default)]
    #[serde(default)]
    pub exclusions: Vec<String>,

    /// Log and skip permission errors instead of aborting.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub continue_on_permission_denied: bool,

    /// Log and skip path-too-long errors instead of aborting.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub continue_on_path_too_long: bool,

    /// Minimum time between progress snapshots (None = disabled).
    #[builder(default = "Some(DEFAULT_PROGRESS_INTERVAL)")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: Option<Duration>,

    /// Grace period the coordinator waits after the work set drains
    /// before re-checking that no new unit appeared.
    #[builder(default)]
    #[serde(default)]
    pub settle_interval: Duration,
}

fn default_true() -> bool {
    true
}

fn default_progress_interval() -> Option<Duration> {
    Some(DEFAULT_PROGRESS_INTERVAL)
}

impl WalkConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        Ok(())
    }
}

impl WalkConfig {
    /// Create a new walk config builder.
    pub fn builder() -> WalkConfigBuilder {
        WalkConfigBuilder::default()
    }

    /// Create a default config for walking a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclusions: Vec::new(),
            continue_on_permission_denied: true,
            continue_on_path_too_long: true,
            progress_interval: Some(DEFAULT_PROGRESS_INTERVAL),
            settle_interval: Duration::ZERO,
        }
    }

    /// Build the exclusion matcher for this config.
    pub fn exclusion_matcher(&self) -> ExclusionMatcher {
        ExclusionMatcher::new(&self.exclusions)
    }
}

/// Clean up a user-supplied root path: trim whitespace and strip one layer
/// of matching quotes.
pub fn normalize_root(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|&q| {
            trimmed
                .strip_prefix(q)
                .and_then(|s| s.strip_suffix(q))
        })
        .unwrap_or(trimmed);
    PathBuf::from(unquoted.trim())
}
