//! Error types for the setup wizard.

use std::path::PathBuf;

/// Result type alias for wizard operations.
pub type FlowResult<T> = std::result::Result<T, FlowError>;

/// Errors that can occur while building, restoring or persisting a flow.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// A page with the same id or key is already in the list.
    ///
    /// This is a configuration error, not something to recover from at
    /// runtime.
    #[error("Duplicate page {field} '{value}'")]
    DuplicateKey { field: &'static str, value: String },

    /// A second terminal page was added.
    #[error("Flow already has a terminal page '{existing}'")]
    TerminalPageExists { existing: String },

    /// Snapshot data is malformed or from an incompatible version.
    #[error("Snapshot is corrupt: {0}")]
    SnapshotCorrupt(String),

    /// Configuration could not be parsed or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Preference data could not be parsed.
    #[error("Preferences error in '{path}': {message}")]
    Preferences { path: PathBuf, message: String },

    /// File I/O error.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FlowError {
    /// Create a duplicate-id error.
    pub fn duplicate_id(value: impl Into<String>) -> Self {
        Self::DuplicateKey {
            field: "id",
            value: value.into(),
        }
    }

    /// Create a duplicate-key error.
    pub fn duplicate_key(value: impl Into<String>) -> Self {
        Self::DuplicateKey {
            field: "key",
            value: value.into(),
        }
    }

    /// Create a snapshot corruption error.
    pub fn snapshot_corrupt(message: impl Into<String>) -> Self {
        Self::SnapshotCorrupt(message.into())
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this is a duplicate id/key error.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Check if this is a snapshot corruption error.
    pub fn is_snapshot_corrupt(&self) -> bool {
        matches!(self, Self::SnapshotCorrupt(_))
    }
}
