//! Local cache error types.

use std::path::PathBuf;

use thiserror::Error;

/// Local cache failures. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to create cache directory {}: {source}", .path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache path {} exists but is not a directory", .path.display())]
    NotADirectory { path: PathBuf },
}

impl CacheError {
    #[must_use]
    pub fn directory_creation(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreation {
            path: path.into(),
            source,
        }
    }
}
