use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    WaitingForHello,
    Identifying,
    Resuming,
    Connected,
    ShuttingDown,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub const fn is_handshaking(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::WaitingForHello | Self::Identifying | Self::Resuming
        )
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::WaitingForHello => "Waiting for Hello",
            Self::Identifying => "Identifying",
            Self::Resuming => "Resuming",
            Self::Connected => "Connected",
            Self::ShuttingDown => "Shutting Down",
        };
        f.write_str(label)
    }
}

/// Per-connection bookkeeping.
#[derive(Debug, Default)]
pub struct GatewayState {
    connection: ConnectionState,
    heartbeat_interval_ms: Option<u64>,
    last_heartbeat_sent: Option<Instant>,
    latency_ms: Option<u64>,
}

impl GatewayState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            heartbeat_interval_ms: None,
            last_heartbeat_sent: None,
            latency_ms: None,
        }
    }

    #[must_use]
    pub const fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub const fn transition_to(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    pub const fn set_heartbeat_interval(&mut self, interval_ms: u64) {
        self.heartbeat_interval_ms = Some(interval_ms);
    }

    #[must_use]
    pub const fn heartbeat_interval_ms(&self) -> Option<u64> {
        self.heartbeat_interval_ms
    }

    pub fn record_heartbeat_sent(&mut self) {
        self.last_heartbeat_sent = Some(Instant::now());
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn record_heartbeat_ack(&mut self) {
        if let Some(sent) = self.last_heartbeat_sent.take() {
            self.latency_ms = Some(sent.elapsed().as_millis() as u64);
        }
    }

    #[must_use]
    pub const fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::WaitingForHello.to_string(), "Waiting for Hello");
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
    }

    #[test]
    fn test_handshake_states() {
        assert!(ConnectionState::Identifying.is_handshaking());
        assert!(!ConnectionState::Connected.is_handshaking());
        assert!(ConnectionState::Connected.is_connected());
    }

    #[test]
    fn test_latency_needs_a_sent_heartbeat() {
        let mut state = GatewayState::new();
        state.record_heartbeat_ack();
        assert_eq!(state.latency_ms(), None);

        state.record_heartbeat_sent();
        state.record_heartbeat_ack();
        assert!(state.latency_ms().is_some());
    }
}
