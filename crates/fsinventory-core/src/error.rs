//! Error types for traversal operations.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while walking a tree.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Path exceeds the platform's length limit.
    #[error("Path too long: {path}")]
    PathTooLong {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A directory was expected but something else was found.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A work unit panicked or was dropped before it finished.
    #[error("Work unit failed: {message}")]
    UnitFailed { message: String },
}

/// Classification of a failure for continue-or-abort decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Access to a node was refused.
    PermissionDenied,
    /// A node's path exceeded the platform limit.
    PathTooLong,
    /// Anything else. Always fatal.
    Other,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorClass::PermissionDenied => "permission-denied",
            ErrorClass::PathTooLong => "path-too-long",
            ErrorClass::Other => "other",
        };
        f.write_str(name)
    }
}

impl ScanError {
    /// Create an I/O error with path context, classifying the OS error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if is_name_too_long(&source) {
            return Self::PathTooLong { path, source };
        }
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::NotADirectory => Self::NotADirectory { path },
            _ => Self::Io { path, source },
        }
    }

    /// The class used by the error policy.
    pub fn class(&self) -> ErrorClass {
        match self {
            ScanError::PermissionDenied { .. } => ErrorClass::PermissionDenied,
            ScanError::PathTooLong { .. } => ErrorClass::PathTooLong,
            _ => ErrorClass::Other,
        }
    }

    /// The path the error refers to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            ScanError::PermissionDenied { path, .. }
            | ScanError::PathTooLong { path, .. }
            | ScanError::NotADirectory { path }
            | ScanError::NotFound { path }
            | ScanError::Io { path, .. } => Some(path),
            ScanError::InvalidConfig { .. } | ScanError::UnitFailed { .. } => None,
        }
    }

    /// Render the error followed by every source in its chain.
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}

#[cfg(unix)]
fn is_name_too_long(err: &io::Error) -> bool {
    // ENAMETOOLONG
    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    const NAME_TOO_LONG: i32 = 63;
    #[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "freebsd")))]
    const NAME_TOO_LONG: i32 = 36;
    err.raw_os_error() == Some(NAME_TOO_LONG)
}

#[cfg(windows)]
fn is_name_too_long(err: &io::Error) -> bool {
    // ERROR_FILENAME_EXCED_RANGE, ERROR_BUFFER_OVERFLOW
    matches!(err.raw_os_error(), Some(206) | Some(111))
}

#[cfg(not(any(unix, windows)))]
fn is_name_too_long(_err: &io::Error) -> bool {
    false
}
