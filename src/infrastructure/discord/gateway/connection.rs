use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use super::codec::{EventParser, GatewayCodec};
use super::constants::{
    CONNECTION_TIMEOUT, GATEWAY_URL, GatewayIntents, GatewayOpcode, HELLO_TIMEOUT,
    IDENTIFY_TIMEOUT,
};
use super::error::{GatewayError, GatewayResult};
use super::events::{BotPresence, DispatchEvent, GatewayEventKind};
use super::heartbeat::{HeartbeatManager, HeartbeatSignal, NO_SEQUENCE};
use super::payloads::{GatewayMessage, GatewayPayload};
use super::session::SessionInfo;
use super::state::{ConnectionState, GatewayState};
use crate::domain::entities::Secret;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Frame-level transport to the gateway.
#[async_trait]
pub trait GatewayConnection: Send + Sync {
    async fn connect(&mut self, gateway_url: Option<&str>) -> GatewayResult<()>;
    async fn disconnect(&mut self) -> GatewayResult<()>;
    async fn send(&mut self, payload: &GatewayPayload) -> GatewayResult<()>;
    async fn receive(&mut self) -> GatewayResult<Option<GatewayMessage>>;
    fn is_connected(&self) -> bool;
}

pub struct WebSocketConnection {
    writer: Option<WsWriter>,
    reader: Option<WsReader>,
    codec: GatewayCodec,
    connected: bool,
}

impl WebSocketConnection {
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: None,
            reader: None,
            codec: GatewayCodec::new(),
            connected: false,
        }
    }
}

impl Default for WebSocketConnection {
    fn default() -> Self {
        Self::new()
    }
}

/// Resume URLs come bare, without the query the first dial carries.
fn resume_url(base: &str) -> String {
    let query = GATEWAY_URL.split_once('?').map_or("", |(_, q)| q);
    format!("{}/?{query}", base.trim_end_matches('/'))
}

#[async_trait]
impl GatewayConnection for WebSocketConnection {
    async fn connect(&mut self, gateway_url: Option<&str>) -> GatewayResult<()> {
        let url = gateway_url.map_or_else(|| GATEWAY_URL.to_string(), resume_url);
        debug!(url = %url, "Dialing gateway");

        let (ws_stream, _) = timeout(CONNECTION_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| GatewayError::timeout("connection"))?
            .map_err(|e| GatewayError::connection_failed(e.to_string()))?;

        let (writer, reader) = ws_stream.split();
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.connected = true;
        self.codec.reset();
        Ok(())
    }

    async fn disconnect(&mut self) -> GatewayResult<()> {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.close().await;
        }
        self.reader = None;
        self.connected = false;
        self.codec.reset();
        debug!("WebSocket connection closed");
        Ok(())
    }

    async fn send(&mut self, payload: &GatewayPayload) -> GatewayResult<()> {
        let writer = self.writer.as_mut().ok_or(GatewayError::NotConnected)?;
        let json =
            serde_json::to_string(payload).map_err(|e| GatewayError::serialization(e.to_string()))?;

        writer
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(|e| GatewayError::websocket(e.to_string()))
    }

    async fn receive(&mut self) -> GatewayResult<Option<GatewayMessage>> {
        let reader = self.reader.as_mut().ok_or(GatewayError::NotConnected)?;

        loop {
            match reader.next().await {
                Some(Ok(WsMessage::Binary(data))) => {
                    if let Some(json) = self.codec.decode_binary(&data)? {
                        return EventParser::parse_message(&json).map(Some);
                    }
                }
                Some(Ok(WsMessage::Text(text))) => {
                    return EventParser::parse_message(&text).map(Some);
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    self.connected = false;
                    let (code, reason) = frame.map_or_else(
                        || (1000, "Normal closure".to_string()),
                        |f| (f.code.into(), f.reason.to_string()),
                    );
                    return Err(GatewayError::ConnectionClosed { code, reason });
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Some(writer) = self.writer.as_mut() {
                        let _ = writer.send(WsMessage::Pong(data)).await;
                    }
                }
                Some(Ok(WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(e)) => {
                    self.connected = false;
                    return Err(GatewayError::websocket(e.to_string()));
                }
                None => {
                    self.connected = false;
                    return Err(GatewayError::ConnectionClosed {
                        code: 1000,
                        reason: "Stream ended".to_string(),
                    });
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Identity a connection announces itself with.
#[derive(Debug, Clone)]
pub struct Identity {
    pub token: Secret,
    pub intents: GatewayIntents,
    pub presence: BotPresence,
}

/// Drives one websocket through handshake, heartbeats and dispatch.
pub struct GatewayConnectionHandler {
    connection: Box<dyn GatewayConnection>,
    state: GatewayState,
    session: SessionInfo,
    identity: Arc<Identity>,
    sequence: Arc<AtomicU64>,
    event_tx: mpsc::UnboundedSender<GatewayEventKind>,
}

impl GatewayConnectionHandler {
    pub fn new(
        connection: Box<dyn GatewayConnection>,
        session: SessionInfo,
        identity: Arc<Identity>,
        event_tx: mpsc::UnboundedSender<GatewayEventKind>,
    ) -> Self {
        let sequence = Arc::new(AtomicU64::new(session.sequence().unwrap_or(NO_SEQUENCE)));
        Self {
            connection,
            state: GatewayState::new(),
            session,
            identity,
            sequence,
            event_tx,
        }
    }

    /// Opens the socket, waits for HELLO, then resumes or identifies.
    pub async fn connect(&mut self) -> GatewayResult<()> {
        self.state.transition_to(ConnectionState::Connecting);
        let resume_url = self.session.resume_gateway_url().map(String::from);
        self.connection.connect(resume_url.as_deref()).await?;

        self.state.transition_to(ConnectionState::WaitingForHello);
        self.await_hello().await?;

        if self.session.can_resume() {
            self.resume().await
        } else {
            self.identify().await
        }
    }

    async fn receive_within(
        &mut self,
        limit: std::time::Duration,
        what: &str,
    ) -> GatewayResult<GatewayMessage> {
        timeout(limit, self.connection.receive())
            .await
            .map_err(|_| GatewayError::timeout(what))??
            .ok_or_else(|| GatewayError::protocol(format!("expected {what}")))
    }

    async fn await_hello(&mut self) -> GatewayResult<()> {
        let message = self.receive_within(HELLO_TIMEOUT, "Hello").await?;

        let opcode = GatewayOpcode::from_u8(message.op);
        if opcode != Some(GatewayOpcode::Hello) {
            return Err(GatewayError::UnexpectedOpcode { opcode });
        }
        let data = message
            .d
            .ok_or_else(|| GatewayError::protocol("Hello missing data"))?;

        let hello = EventParser::parse_hello(&data)?;
        self.state.set_heartbeat_interval(hello.heartbeat_interval);
        debug!(interval_ms = hello.heartbeat_interval, "Received Hello");
        Ok(())
    }

    async fn identify(&mut self) -> GatewayResult<()> {
        self.state.transition_to(ConnectionState::Identifying);
        let payload = GatewayPayload::identify(
            self.identity.token.expose(),
            self.identity.intents.as_u32(),
            &self.identity.presence,
        );
        self.connection.send(&payload).await?;
        debug!(intents = self.identity.intents.as_u32(), "Sent Identify");

        let message = self.receive_within(IDENTIFY_TIMEOUT, "Ready").await?;
        match GatewayOpcode::from_u8(message.op) {
            Some(GatewayOpcode::Dispatch) if message.t.as_deref() == Some("READY") => {
                self.handle_ready(&message)
            }
            Some(GatewayOpcode::InvalidSession) => Err(self.invalidate(&message)),
            opcode => Err(GatewayError::UnexpectedOpcode { opcode }),
        }
    }

    async fn resume(&mut self) -> GatewayResult<()> {
        self.state.transition_to(ConnectionState::Resuming);
        let (Some(session_id), Some(sequence)) =
            (self.session.session_id().map(String::from), self.session.sequence())
        else {
            return Err(GatewayError::protocol("no session to resume"));
        };

        let payload = GatewayPayload::resume(self.identity.token.expose(), &session_id, sequence);
        self.connection.send(&payload).await?;
        debug!(session_id = %session_id, sequence, "Sent Resume");

        // Missed dispatches replay before RESUMED arrives.
        loop {
            let message = self.receive_within(IDENTIFY_TIMEOUT, "Resumed").await?;
            match GatewayOpcode::from_u8(message.op) {
                Some(GatewayOpcode::Dispatch) if message.t.as_deref() == Some("RESUMED") => {
                    self.observe_sequence(message.s);
                    self.state.transition_to(ConnectionState::Connected);
                    info!("Session resumed");
                    let _ = self.event_tx.send(GatewayEventKind::Resumed);
                    return Ok(());
                }
                Some(GatewayOpcode::Dispatch) => self.handle_message(message).await?,
                Some(GatewayOpcode::InvalidSession) => return Err(self.invalidate(&message)),
                _ => trace!(op = message.op, "Ignoring frame while resuming"),
            }
        }
    }

    fn handle_ready(&mut self, message: &GatewayMessage) -> GatewayResult<()> {
        self.observe_sequence(message.s);
        let data = message
            .d
            .as_ref()
            .ok_or_else(|| GatewayError::protocol("READY missing data"))?;
        let dispatch = EventParser::parse_dispatch("READY", data)?;

        if let DispatchEvent::Ready {
            session_id,
            resume_gateway_url,
            user_id,
            username,
            ..
        } = &dispatch
        {
            self.session
                .record_ready(session_id.clone(), resume_gateway_url.clone(), *user_id);
            info!(session_id = %session_id, username = %username, "Gateway ready");

            let _ = self.event_tx.send(GatewayEventKind::Connected {
                session_id: session_id.clone(),
                resume_url: resume_gateway_url.clone(),
            });
        }

        self.state.transition_to(ConnectionState::Connected);
        let _ = self.event_tx.send(GatewayEventKind::Dispatch(dispatch));
        Ok(())
    }

    /// Pumps frames until the socket fails or `shutdown` flips.
    ///
    /// Returns `Ok` only for a requested shutdown.
    pub async fn run(&mut self, shutdown: &mut watch::Receiver<bool>) -> GatewayResult<()> {
        let interval = self
            .state
            .heartbeat_interval_ms()
            .ok_or_else(|| GatewayError::protocol("no heartbeat interval"))?;
        let heartbeat = HeartbeatManager::new(interval, Arc::clone(&self.sequence));
        let (beat_tx, mut beat_rx) = mpsc::channel(4);
        let _beats = heartbeat.start(beat_tx);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                signal = beat_rx.recv() => match signal {
                    Some(HeartbeatSignal::Beat(seq)) => {
                        self.connection.send(&GatewayPayload::heartbeat(seq)).await?;
                        self.state.record_heartbeat_sent();
                    }
                    Some(HeartbeatSignal::Missed) | None => return Err(GatewayError::HeartbeatTimeout),
                },

                message = self.connection.receive() => {
                    if let Some(message) = message? {
                        if GatewayOpcode::from_u8(message.op) == Some(GatewayOpcode::HeartbeatAck) {
                            heartbeat.acknowledge();
                        }
                        self.handle_message(message).await?;
                    }
                }
            }
        }

        heartbeat.stop();
        self.state.transition_to(ConnectionState::ShuttingDown);
        self.connection.disconnect().await?;
        info!("Gateway connection closed");
        Ok(())
    }

    fn observe_sequence(&mut self, sequence: Option<u64>) {
        self.session.observe_sequence(sequence);
        if let Some(seq) = self.session.sequence() {
            self.sequence.store(seq, Ordering::SeqCst);
        }
    }

    fn invalidate(&mut self, message: &GatewayMessage) -> GatewayError {
        let resumable = message
            .d
            .as_ref()
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        warn!(resumable, "Session invalidated");
        if !resumable {
            self.session.invalidate();
            self.sequence.store(NO_SEQUENCE, Ordering::SeqCst);
        }
        GatewayError::SessionInvalidated { resumable }
    }

    async fn handle_message(&mut self, message: GatewayMessage) -> GatewayResult<()> {
        self.observe_sequence(message.s);

        match GatewayOpcode::from_u8(message.op) {
            Some(GatewayOpcode::Dispatch) => {
                if let (Some(event_type), Some(data)) = (message.t.as_deref(), message.d.as_ref()) {
                    trace!(event = event_type, "Dispatch received");
                    self.handle_dispatch(event_type, data);
                }
            }
            Some(GatewayOpcode::HeartbeatAck) => {
                self.state.record_heartbeat_ack();
                if let Some(latency_ms) = self.state.latency_ms() {
                    let _ = self.event_tx.send(GatewayEventKind::HeartbeatAck { latency_ms });
                }
            }
            Some(GatewayOpcode::Heartbeat) => {
                debug!("Gateway requested an immediate heartbeat");
                let sequence = self.session.sequence();
                self.connection.send(&GatewayPayload::heartbeat(sequence)).await?;
                self.state.record_heartbeat_sent();
            }
            Some(GatewayOpcode::Reconnect) => {
                info!("Gateway requested reconnect");
                return Err(GatewayError::ReconnectRequested);
            }
            Some(GatewayOpcode::InvalidSession) => return Err(self.invalidate(&message)),
            opcode => debug!(opcode = ?opcode, "Unhandled opcode"),
        }

        Ok(())
    }

    fn handle_dispatch(&self, event_type: &str, data: &serde_json::Value) {
        match EventParser::parse_dispatch(event_type, data) {
            Ok(DispatchEvent::Unknown { .. }) => {}
            Ok(event) => {
                debug!(event = event_type, "Dispatching event");
                let _ = self.event_tx.send(GatewayEventKind::Dispatch(event));
            }
            Err(e) => warn!(event = event_type, error = %e, "Failed to parse dispatch event"),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Hands the session back so the next connection can resume it.
    #[must_use]
    pub fn into_session(self) -> SessionInfo {
        self.session
    }
}
