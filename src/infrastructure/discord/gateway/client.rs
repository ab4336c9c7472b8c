use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::connection::{GatewayConnectionHandler, Identity, WebSocketConnection};
use super::constants::{
    GatewayIntents, MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY_BASE, RECONNECT_DELAY_MAX,
    RECONNECT_JITTER_MAX,
};
use super::error::{GatewayError, GatewayResult, Recovery};
use super::events::{BotPresence, GatewayEventKind};
use super::session::SessionInfo;
use crate::domain::entities::Secret;

#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    pub intents: GatewayIntents,
    pub presence: BotPresence,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
}

impl Default for GatewayClientConfig {
    fn default() -> Self {
        Self {
            intents: GatewayIntents::reaction_bot(),
            presence: BotPresence::default(),
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl GatewayClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_presence(mut self, presence: BotPresence) -> Self {
        self.presence = presence;
        self
    }

    #[must_use]
    pub const fn with_intents(mut self, intents: GatewayIntents) -> Self {
        self.intents = intents;
        self
    }

    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

/// Keeps one gateway session alive across reconnects.
pub struct GatewayClient {
    config: GatewayClientConfig,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl GatewayClient {
    #[must_use]
    pub fn new(config: GatewayClientConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            shutdown_tx,
            task: None,
        }
    }

    /// Starts the connection loop. The returned stream ends once the loop
    /// gives up or [`disconnect`](Self::disconnect) is called.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::AlreadyConnected` if the loop is already running.
    pub fn connect(
        &mut self,
        token: &Secret,
    ) -> GatewayResult<mpsc::UnboundedReceiver<GatewayEventKind>> {
        if self.is_running() {
            return Err(GatewayError::AlreadyConnected);
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let identity = Arc::new(Identity {
            token: token.clone(),
            intents: self.config.intents,
            presence: self.config.presence.clone(),
        });

        self.shutdown_tx.send_replace(false);
        let shutdown = self.shutdown_tx.subscribe();
        self.task = Some(tokio::spawn(run_gateway_loop(
            self.config.clone(),
            identity,
            event_tx,
            shutdown,
        )));

        Ok(event_rx)
    }

    /// Closes the socket and stops reconnecting.
    pub fn disconnect(&self) {
        self.shutdown_tx.send_replace(true);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn run_gateway_loop(
    config: GatewayClientConfig,
    identity: Arc<Identity>,
    event_tx: mpsc::UnboundedSender<GatewayEventKind>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut reconnect_attempts: u32 = 0;
    let mut session = SessionInfo::new();

    while !*shutdown.borrow() {
        let mut handler = GatewayConnectionHandler::new(
            Box::new(WebSocketConnection::new()),
            session,
            Arc::clone(&identity),
            event_tx.clone(),
        );

        let outcome = tokio::select! {
            connected = handler.connect() => match connected {
                Ok(()) => {
                    reconnect_attempts = 0;
                    handler.run(&mut shutdown).await
                }
                Err(e) => Err(e),
            },
            _ = shutdown.changed() => Ok(()),
        };
        session = handler.into_session();

        let error = match outcome {
            Ok(()) => break,
            Err(e) => e,
        };

        warn!(error = %error, "Gateway connection lost");
        let recovery = error.recovery();
        if recovery != Recovery::Resume {
            session.invalidate();
        }
        let _ = event_tx.send(GatewayEventKind::Disconnected {
            reason: error.to_string(),
            can_resume: session.can_resume(),
        });

        if !recovery.reconnects() || !config.auto_reconnect {
            error!(error = %error, "Gateway will not reconnect");
            let _ = event_tx.send(GatewayEventKind::Error {
                message: error.to_string(),
                recoverable: false,
            });
            break;
        }

        reconnect_attempts += 1;
        if reconnect_attempts > config.max_reconnect_attempts {
            let exhausted = GatewayError::ReconnectionLimitExceeded {
                attempts: config.max_reconnect_attempts,
            };
            error!(error = %exhausted, "Giving up on the gateway");
            let _ = event_tx.send(GatewayEventKind::Error {
                message: exhausted.to_string(),
                recoverable: false,
            });
            break;
        }

        let delay = calculate_backoff_delay(reconnect_attempts - 1);
        info!(
            attempt = reconnect_attempts,
            delay_ms = delay.as_millis(),
            "Reconnecting to gateway"
        );
        let _ = event_tx.send(GatewayEventKind::Reconnecting {
            attempt: reconnect_attempts,
        });

        tokio::select! {
            () = sleep(delay) => {}
            _ = shutdown.changed() => {}
        }
    }

    info!("Gateway loop terminated");
}

#[allow(clippy::cast_possible_truncation)]
fn calculate_backoff_delay(attempt: u32) -> Duration {
    let base_delay = RECONNECT_DELAY_BASE.as_millis() as u64;
    let max_delay = RECONNECT_DELAY_MAX.as_millis() as u64;
    let jitter_max = RECONNECT_JITTER_MAX.as_millis() as u64;

    let exponential_delay = base_delay.saturating_mul(2_u64.saturating_pow(attempt.min(6)));
    let capped_delay = exponential_delay.min(max_delay);

    Duration::from_millis(capped_delay.saturating_add(rand_jitter(jitter_max)))
}

fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);

    nanos % max.max(1)
}
