//! Manifest synchronization error types.

use thiserror::Error;

use super::{FetchError, TransferError};

/// Failures of the manifest read-modify-write cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to fetch manifest: {0}")]
    Fetch(#[from] FetchError),

    #[error("manifest is malformed: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("manifest io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to upload manifest: {0}")]
    Transfer(#[from] TransferError),
}

impl SyncError {
    /// Returns whether the remote manifest itself is broken.
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
