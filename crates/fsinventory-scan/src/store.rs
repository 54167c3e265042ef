//! Concurrent entry store.

use std::path::Path;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use fsinventory_core::FileSystemEntry;

/// Shared destination for every discovered entry.
///
/// Keys are full paths compared case-insensitively. The first entry stored
/// for a key wins; later inserts for the same key are ignored, so an entry's
/// identity never changes once recorded.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: DashMap<String, FileSystemEntry>,
}

impl EntryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Insert `entry` unless its path is already present.
    ///
    /// Returns `true` if this call stored the entry.
    pub fn insert_or_ignore(&self, entry: FileSystemEntry) -> bool {
        match self.entries.entry(store_key(&entry.path)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    /// Number of distinct entries. May lag concurrent inserts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy out every entry, sorted by path.
    ///
    /// Intended for use after the walk has finished.
    pub fn snapshot(&self) -> Vec<FileSystemEntry> {
        let mut entries: Vec<FileSystemEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

fn store_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;

    fn entry(path: &str, size: i64) -> FileSystemEntry {
        let mut e = FileSystemEntry::missing(PathBuf::from(path));
        e.size = size;
        e
    }

    fn find(store: &EntryStore, path: &str) -> Option<FileSystemEntry> {
        let wanted = path.to_lowercase();
        store
            .snapshot()
            .into_iter()
            .find(|e| e.path.to_string_lossy().to_lowercase() == wanted)
    }

    #[test]
    fn test_first_insert_wins() {
        let store = EntryStore::new();
        assert!(store.insert_or_ignore(entry("/r/a", 1)));
        assert!(!store.insert_or_ignore(entry("/r/a", 2)));

        assert_eq!(store.len(), 1);
        assert_eq!(find(&store, "/r/a").unwrap().size, 1);
    }

    #[test]
    fn test_keys_ignore_case() {
        let store = EntryStore::new();
        assert!(store.insert_or_ignore(entry("/R/Docs", 7)));
        assert!(!store.insert_or_ignore(entry("/r/docs", 8)));

        assert!(find(&store, "/r/DOCS").is_some());
        let kept = find(&store, "/r/docs").unwrap();
        assert_eq!(kept.path, PathBuf::from("/R/Docs"));
        assert_eq!(kept.size, 7);
    }

    #[test]
    fn test_concurrent_inserts_converge() {
        let store = Arc::new(EntryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..500 {
                        store.insert_or_ignore(entry(&format!("/r/{i}"), t));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 500);
        let winner = find(&store, "/r/42").unwrap().size;
        assert!((0..8).contains(&winner));
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let store = EntryStore::new();
        store.insert_or_ignore(entry("/r/c", 0));
        store.insert_or_ignore(entry("/r/a", 0));
        store.insert_or_ignore(entry("/r/b", 0));

        let paths: Vec<_> = store.snapshot().into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/r/a"),
                PathBuf::from("/r/b"),
                PathBuf::from("/r/c")
            ]
        );
    }
}
