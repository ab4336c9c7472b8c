use std::io;
use thiserror::Error;

use super::constants::GatewayOpcode;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Close codes after which identifying again cannot succeed
/// (bad token, sharding, API version, intents).
const FATAL_CLOSE_CODES: [u16; 6] = [4004, 4010, 4011, 4012, 4013, 4014];

/// Close codes that drop the session but allow a fresh identify.
const SESSION_LOST_CLOSE_CODES: [u16; 2] = [4007, 4009];

/// What the connection loop does after a gateway error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Dial again and resume the existing session.
    Resume,
    /// Dial again with a new identify.
    Reidentify,
    /// Stop the loop.
    Stop,
}

impl Recovery {
    #[must_use]
    pub fn for_close_code(code: u16) -> Self {
        if FATAL_CLOSE_CODES.contains(&code) {
            Self::Stop
        } else if SESSION_LOST_CLOSE_CODES.contains(&code) {
            Self::Reidentify
        } else {
            Self::Resume
        }
    }

    #[must_use]
    pub const fn reconnects(self) -> bool {
        !matches!(self, Self::Stop)
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("connection closed with code {code}: {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("websocket error: {message}")]
    WebSocket { message: String },

    #[error("session invalidated, resumable: {resumable}")]
    SessionInvalidated { resumable: bool },

    #[error("gateway asked for a reconnect")]
    ReconnectRequested,

    #[error("heartbeat not acknowledged")]
    HeartbeatTimeout,

    #[error("gave up after {attempts} reconnect attempts")]
    ReconnectionLimitExceeded { attempts: u32 },

    #[error("zlib stream error: {message}")]
    CompressionError { message: String },

    #[error("malformed payload: {message}")]
    SerializationError { message: String },

    #[error("unexpected opcode {opcode:?}")]
    UnexpectedOpcode { opcode: Option<GatewayOpcode> },

    #[error("protocol error: {message}")]
    ProtocolError { message: String },

    #[error("timed out waiting for {operation}")]
    Timeout { operation: String },

    #[error("not connected to gateway")]
    NotConnected,

    #[error("gateway loop already running")]
    AlreadyConnected,

    #[error("gateway shutting down")]
    ShuttingDown,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl GatewayError {
    #[must_use]
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn compression(message: impl Into<String>) -> Self {
        Self::CompressionError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// How the connection loop should continue after this error.
    #[must_use]
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::ConnectionClosed { code, .. } => Recovery::for_close_code(*code),
            Self::SessionInvalidated { resumable: true }
            | Self::ReconnectRequested
            | Self::WebSocket { .. }
            | Self::HeartbeatTimeout
            | Self::Io(_) => Recovery::Resume,
            Self::SessionInvalidated { resumable: false }
            | Self::ConnectionFailed { .. }
            | Self::CompressionError { .. }
            | Self::Timeout { .. } => Recovery::Reidentify,
            Self::ReconnectionLimitExceeded { .. }
            | Self::ShuttingDown
            | Self::NotConnected
            | Self::AlreadyConnected
            | Self::ProtocolError { .. }
            | Self::SerializationError { .. }
            | Self::UnexpectedOpcode { .. } => Recovery::Stop,
        }
    }
}
