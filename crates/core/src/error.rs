//! Error types shared by the store, codec and configuration layers.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors surfaced by [`ItemStore`](crate::store::ItemStore) and its codec.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has been disposed and can no longer be used.
    #[error("item store has been disposed")]
    Disposed,

    /// `load` was given a path that does not exist.
    #[error("no such file: {}", path.display())]
    NotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The persisted document is structurally invalid.
    #[error("malformed document at {position}: {reason}")]
    Malformed {
        /// Offending element (`records[2]`) or parser line/column.
        position: String,
        /// Human readable description of the problem.
        reason: String,
    },

    /// A record element carried a tag outside the known variant set.
    #[error("unsupported record variant '{tag}' at {position}")]
    UnsupportedVariant {
        /// Offending element.
        position: String,
        /// Tag found in the document.
        tag: String,
    },

    /// A record failed field validation at construction time.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The audit log destination could not be opened.
    #[error("failed to open audit log {}: {source}", path.display())]
    AuditSink {
        /// Configured audit log destination.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// I/O failure while reading or writing a file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Encoding the record collection failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(position: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            position: position.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
