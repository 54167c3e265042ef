//! File system entry types.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Node attribute bitset.
///
/// Bit values follow the Windows `FILE_ATTRIBUTE_*` constants so reports look
/// the same whichever platform produced them. On Windows the raw OS value is
/// kept verbatim; elsewhere the common bits are synthesized from metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(pub u32);

impl Attributes {
    pub const READONLY: u32 = 0x0000_0001;
    pub const HIDDEN: u32 = 0x0000_0002;
    pub const DIRECTORY: u32 = 0x0000_0010;
    pub const ARCHIVE: u32 = 0x0000_0020;
    pub const NORMAL: u32 = 0x0000_0080;
    pub const REPARSE_POINT: u32 = 0x0000_0400;

    /// Empty attribute set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bit value.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check whether every bit in `flag` is set.
    pub const fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    /// Return a copy with `flag` set.
    pub const fn with(self, flag: u32) -> Self {
        Self(self.0 | flag)
    }

    /// Check if the directory bit is set.
    pub fn is_directory(self) -> bool {
        self.contains(Self::DIRECTORY)
    }

    /// Check if the reparse-point bit is set.
    pub fn is_reparse_point(self) -> bool {
        self.contains(Self::REPARSE_POINT)
    }

    /// Derive attributes from metadata obtained without following links.
    #[cfg(windows)]
    pub fn from_metadata(_path: &Path, metadata: &Metadata) -> Self {
        use std::os::windows::fs::MetadataExt;
        Self(metadata.file_attributes())
    }

    /// Derive attributes from metadata obtained without following links.
    #[cfg(not(windows))]
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        let mut attrs = Self::empty();

        if file_type.is_symlink() {
            attrs = attrs.with(Self::REPARSE_POINT);
            // A link that resolves to a directory is reported as both,
            // the same way a directory junction is.
            if std::fs::metadata(path).is_ok_and(|m| m.is_dir()) {
                attrs = attrs.with(Self::DIRECTORY);
            }
        } else if file_type.is_dir() {
            attrs = attrs.with(Self::DIRECTORY);
        }

        if metadata.permissions().readonly() {
            attrs = attrs.with(Self::READONLY);
        }
        if path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'))
        {
            attrs = attrs.with(Self::HIDDEN);
        }
        if attrs == Self::empty() {
            attrs = attrs.with(Self::NORMAL);
        }
        attrs
    }
}

/// One discovered file system node.
///
/// Entries are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemEntry {
    /// Full path (unique key, compared case-insensitively).
    pub path: PathBuf,
    /// Parent directory path.
    pub parent: PathBuf,
    /// Creation time, when the platform reports one.
    pub created: Option<DateTime<Utc>>,
    /// Last write time.
    pub modified: Option<DateTime<Utc>>,
    /// Size in bytes; `-1` if the node vanished before it could be described.
    pub size: i64,
    /// Node attribute bitset.
    pub attributes: Attributes,
}

impl FileSystemEntry {
    /// Size sentinel for nodes that no longer exist at read time.
    pub const MISSING_SIZE: i64 = -1;

    /// Describe the node at `path` without following links.
    ///
    /// A node that disappeared between listing and stat is not an error: it
    /// is recorded with [`Self::MISSING_SIZE`] and no timestamps.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ScanError> {
        let path = path.into();
        match std::fs::symlink_metadata(&path) {
            Ok(metadata) => Ok(Self::from_metadata(path, &metadata)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::missing(path)),
            Err(err) => Err(ScanError::io(path, err)),
        }
    }

    /// Build an entry from already-fetched metadata.
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let attributes = Attributes::from_metadata(&path, metadata);
        let size = if metadata.is_dir() {
            0
        } else {
            i64::try_from(metadata.len()).unwrap_or(i64::MAX)
        };

        Self {
            parent: parent_of(&path),
            created: metadata.created().ok().map(to_utc),
            modified: metadata.modified().ok().map(to_utc),
            size,
            attributes,
            path,
        }
    }

    /// Entry for a node that vanished before it could be described.
    pub fn missing(path: PathBuf) -> Self {
        Self {
            parent: parent_of(&path),
            created: None,
            modified: None,
            size: Self::MISSING_SIZE,
            attributes: Attributes::empty(),
            path,
        }
    }

    /// Check if this entry is a directory.
    pub fn is_directory(&self) -> bool {
        self.attributes.is_directory()
    }

    /// Check if this entry is a reparse point (symlink, junction).
    pub fn is_reparse_point(&self) -> bool {
        self.attributes.is_reparse_point()
    }

    /// Whether traversal should descend into this entry.
    pub fn is_traversable(&self) -> bool {
        self.is_directory() && !self.is_reparse_point()
    }

    /// Check if the node was gone at read time.
    pub fn is_missing(&self) -> bool {
        self.size == Self::MISSING_SIZE
    }
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
