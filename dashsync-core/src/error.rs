//! Error types for dashsync

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while synchronizing dashboards
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The history file exists but could not be parsed.
    #[error("Failed to decode history file {path}: {source}")]
    HistoryDecode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode history: {0}")]
    HistoryEncode(#[source] serde_json::Error),

    /// Network or protocol failure talking to a remote service.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The dashboard source failed to list or fetch dashboards.
    #[error("Source error: {0}")]
    Source(String),

    /// The remote repository refused or failed to apply a commit.
    #[error("Commit failed: {0}")]
    Commit(String),

    /// A commit batch was inconsistent with the repository contents.
    #[error("Commit rejected: {0}")]
    Rejected(String),
}
