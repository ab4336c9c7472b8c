//! Chat platform error types.

use thiserror::Error;

/// Failures talking to the chat platform's REST API.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("network error talking to Discord: {message}")]
    Network { message: String },

    #[error("request rejected by Discord: {message}")]
    Rejected { message: String },

    #[error("rate limited by Discord, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("unexpected Discord error: {message}")]
    Unexpected { message: String },
}

impl ChatError {
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::RateLimited { .. })
    }
}
