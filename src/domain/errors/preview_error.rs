//! Preview generation error types.

use thiserror::Error;

/// Failures while producing a compressed preview.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("unsupported image format: {filename}")]
    UnsupportedFormat { filename: String },

    #[error("compression of {filename} failed: {message}")]
    Compression { filename: String, message: String },

    #[error("preview io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PreviewError {
    #[must_use]
    pub fn unsupported(filename: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            filename: filename.into(),
        }
    }

    #[must_use]
    pub fn compression(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compression {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Returns whether the file was rejected before any codec work.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. })
    }
}
