//! Error types for sync operations
//!
//! The dirty cache itself never fails: caller bookkeeping mistakes are soft
//! and go to the [`crate::InvariantReporter`]. Errors only arise when a sync
//! plan is handed to a dataplane.

use std::path::PathBuf;

use thiserror::Error;

/// Sync error types with detailed context
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// I/O operation failed while committing a sync plan
    #[error("I/O error{}: {message} ({kind})", path_suffix(.path))]
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// The dataplane rejected an operation
    #[error("Dataplane rejected {operation} on set {set}: {reason}")]
    Dataplane {
        /// Operation that failed (create, add, del, flush, destroy)
        operation: String,
        /// Set the operation targeted
        set: String,
        /// Description from the dataplane
        reason: String,
    },
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in {}", path.display()),
        None => String::new(),
    }
}

/// Convert std::io::Error to SyncError::Io
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
