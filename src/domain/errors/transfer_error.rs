//! Remote transfer session error types.

use thiserror::Error;

/// Failures of a remote file-transfer session.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to connect to {host}: {message}")]
    Connect { host: String, message: String },

    #[error("login rejected for {user}: {message}")]
    Login { user: String, message: String },

    #[error("{command} failed: {message}")]
    Command { command: String, message: String },

    #[error("transfer io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer session is not connected")]
    NotConnected,
}

impl TransferError {
    #[must_use]
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Returns whether the session should be reconnected before reuse.
    #[must_use]
    pub const fn needs_reset(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Io(_) | Self::NotConnected
        )
    }
}
