//! Settings file and command-line merging.

use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, Result};
use serde::Deserialize;

use fsinventory_scan::WalkConfig;

/// Optional TOML settings file.
///
/// ```toml
/// exclusions = ["$Recycle.Bin", "node_modules"]
/// continue_on_permission_denied = true
/// continue_on_path_too_long = true
/// progress_interval_secs = 60
/// settle_interval_secs = 0
/// output_dir = "/var/reports"
/// ```
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub exclusions: Vec<String>,
    pub continue_on_permission_denied: Option<bool>,
    pub continue_on_path_too_long: Option<bool>,
    pub progress_interval_secs: Option<u64>,
    pub settle_interval_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

/// Command-line values that override the settings file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub exclusions: Vec<String>,
    pub abort_on_permission_denied: bool,
    pub abort_on_path_too_long: bool,
    pub progress_secs: Option<u64>,
    pub settle_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from `path`, or return defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read settings file {}", path.display()))?;
        Self::parse(&content)
            .wrap_err_with(|| format!("Invalid settings file {}", path.display()))
    }

    /// Parse settings from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Build the walk configuration for `root`.
    ///
    /// File exclusions come first, command-line ones are appended in order.
    pub fn walk_config(&self, root: PathBuf, overrides: &Overrides) -> Result<WalkConfig> {
        let exclusions: Vec<String> = self
            .exclusions
            .iter()
            .chain(&overrides.exclusions)
            .cloned()
            .collect();

        let continue_on_permission_denied = !overrides.abort_on_permission_denied
            && self.continue_on_permission_denied.unwrap_or(true);
        let continue_on_path_too_long =
            !overrides.abort_on_path_too_long && self.continue_on_path_too_long.unwrap_or(true);

        let progress_interval = match overrides.progress_secs.or(self.progress_interval_secs) {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(fsinventory_scan::DEFAULT_PROGRESS_INTERVAL),
        };
        let settle_interval = Duration::from_secs(
            overrides
                .settle_secs
                .or(self.settle_interval_secs)
                .unwrap_or(0),
        );

        let config = WalkConfig::builder()
            .root(root)
            .exclusions(exclusions)
            .continue_on_permission_denied(continue_on_permission_denied)
            .continue_on_path_too_long(continue_on_path_too_long)
            .progress_interval(progress_interval)
            .settle_interval(settle_interval)
            .build()
            .wrap_err("Invalid walk configuration")?;
        Ok(config)
    }

    /// Directory the report is written to.
    pub fn output_dir(&self, overrides: &Overrides) -> PathBuf {
        overrides
            .output_dir
            .clone()
            .or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load(None).unwrap();
        let config = settings
            .walk_config(PathBuf::from("/r"), &Overrides::default())
            .unwrap();

        assert!(config.exclusions.is_empty());
        assert!(config.continue_on_permission_denied);
        assert!(config.continue_on_path_too_long);
        assert_eq!(
            config.progress_interval,
            Some(fsinventory_scan::DEFAULT_PROGRESS_INTERVAL)
        );
        assert_eq!(settings.output_dir(&Overrides::default()), PathBuf::from("."));
    }

    #[test]
    fn test_file_values_and_overrides() {
        let settings = Settings::parse(
            r#"
            exclusions = ["cache", "tmp"]
            continue_on_path_too_long = false
            progress_interval_secs = 60
            output_dir = "/reports"
            "#,
        )
        .unwrap();
        let overrides = Overrides {
            exclusions: vec!["build".to_string()],
            abort_on_permission_denied: true,
            progress_secs: Some(0),
            ..Overrides::default()
        };

        let config = settings.walk_config(PathBuf::from("/r"), &overrides).unwrap();
        assert_eq!(config.exclusions, vec!["cache", "tmp", "build"]);
        assert!(!config.continue_on_permission_denied);
        assert!(!config.continue_on_path_too_long);
        assert_eq!(config.progress_interval, None);
        assert_eq!(settings.output_dir(&overrides), PathBuf::from("/reports"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Settings::parse("exclude = [\"x\"]").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("fsinv.toml");
        std::fs::write(&path, "settle_interval_secs = 3\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        let config = settings
            .walk_config(PathBuf::from("/r"), &Overrides::default())
            .unwrap();
        assert_eq!(config.settle_interval, Duration::from_secs(3));
    }
}
