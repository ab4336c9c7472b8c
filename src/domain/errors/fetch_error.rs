//! Remote fetch error types.

use thiserror::Error;

/// Failures while downloading a remote resource to disk.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("download of {url} interrupted: {message}")]
    Stream { url: String, message: String },

    #[error("failed to write download: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    #[must_use]
    pub fn request(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            url: url.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn stream(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns whether error came from the network rather than the disk.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(
            self,
            Self::Request { .. } | Self::Status { .. } | Self::Stream { .. }
        )
    }
}
