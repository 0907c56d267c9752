//! Error types for scanning operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while configuring, running or draining a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Configuration or filters were mutated while a scan was running.
    #[error("Illegal state: cannot {operation} while a scan is running")]
    IllegalState { operation: &'static str },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Path exists but is not a directory where one was required.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Non-blocking pop on an empty queue.
    #[error("Found queue is empty")]
    Empty,

    /// A blocking wait was interrupted.
    #[error("Wait cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The background worker thread could not be spawned.
    #[error("Failed to spawn scan worker: {source}")]
    Worker {
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Create an illegal state error for the named operation.
    pub fn illegal_state(operation: &'static str) -> Self {
        Self::IllegalState { operation }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory.
    ReadError,
}

/// Non-fatal warning encountered during a scan.
///
/// A warning marks a subtree that was skipped; the scan itself carries on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a permission denied warning.
    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let message = format!("Permission denied: {}", path.display());
        Self::new(path, message, WarningKind::PermissionDenied)
    }

    /// Create a read error warning.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(path, format!("Read error: {error}"), WarningKind::ReadError)
    }

    /// Classify a directory listing failure.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::read_error(path, error),
        }
    }
}
