//! Path exclusion matching.

use std::path::Path;

/// Case-insensitive substring matcher over full paths.
///
/// Any directory whose path contains one of the configured fragments is
/// recorded but not descended into.
#[derive(Debug, Clone, Default)]
pub struct ExclusionMatcher {
    fragments: Vec<String>,
}

impl ExclusionMatcher {
    /// Build a matcher from an ordered list of fragments.
    ///
    /// Empty fragments are dropped; they would otherwise match every path.
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fragments = fragments
            .into_iter()
            .map(|s| s.as_ref().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { fragments }
    }

    /// Returns `true` if any fragment occurs in `path`, ignoring case.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.fragments.is_empty() {
            return false;
        }
        let candidate = path.to_string_lossy().to_lowercase();
        self.fragments.iter().any(|f| candidate.contains(f.as_str()))
    }

    /// The first fragment that matches `path`, for diagnostics.
    pub fn matching_fragment(&self, path: &Path) -> Option<&str> {
        let candidate = path.to_string_lossy().to_lowercase();
        self.fragments
            .iter()
            .find(|f| candidate.contains(f.as_str()))
            .map(String::as_str)
    }

    /// Number of active fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Check if no fragments are configured.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_never_excludes() {
        let matcher = ExclusionMatcher::default();
        assert!(!matcher.is_excluded(Path::new("/anything/at/all")));
    }

    #[test]
    fn test_case_insensitive_substring() {
        let matcher = ExclusionMatcher::new(["node_modules", "$RECYCLE.BIN"]);
        assert!(matcher.is_excluded(Path::new("/srv/app/Node_Modules/lodash")));
        assert!(matcher.is_excluded(Path::new("C:/$Recycle.Bin")));
        assert!(!matcher.is_excluded(Path::new("/srv/app/src")));
    }

    #[test]
    fn test_matches_anywhere_in_path() {
        let matcher = ExclusionMatcher::new(["b"]);
        assert!(matcher.is_excluded(Path::new("/r/b")));
        assert!(!matcher.is_excluded(Path::new("/r/a")));
        assert_eq!(matcher.matching_fragment(Path::new("/r/B")), Some("b"));
    }

    #[test]
    fn test_blank_fragments_are_dropped() {
        let matcher = ExclusionMatcher::new(["", "tmp"]);
        assert_eq!(matcher.len(), 1);
        assert!(!matcher.is_excluded(Path::new("/home/user")));
    }
}
