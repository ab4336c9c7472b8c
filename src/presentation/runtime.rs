use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::application::dto::TriggerOutcome;
use crate::application::services::WorkerHandle;
use crate::application::use_cases::TriggerListener;
use crate::infrastructure::discord::{DispatchEvent, GatewayEventKind};

/// Why [`BotRuntime::serve`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeEnd {
    /// The shutdown signal fired.
    Shutdown,
    /// The gateway stopped delivering events. Carries the last fatal error
    /// if one was reported.
    GatewayClosed(Option<String>),
}

/// Owns the publication worker and every reaction currently being handled.
pub struct BotRuntime {
    listener: TriggerListener,
    worker: WorkerHandle,
    worker_task: JoinHandle<()>,
    in_flight: JoinSet<TriggerOutcome>,
    fatal: Option<String>,
}

impl BotRuntime {
    #[must_use]
    pub fn new(listener: TriggerListener, worker: WorkerHandle, worker_task: JoinHandle<()>) -> Self {
        Self {
            listener,
            worker,
            worker_task,
            in_flight: JoinSet::new(),
            fatal: None,
        }
    }

    /// Number of reactions still being processed.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Handles gateway events until `shutdown` resolves or the event stream ends.
    pub async fn serve<F>(
        &mut self,
        events: &mut mpsc::UnboundedReceiver<GatewayEventKind>,
        shutdown: F,
    ) -> ServeEnd
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    return ServeEnd::Shutdown;
                }

                event = events.recv() => {
                    let Some(event) = event else {
                        warn!("Gateway event stream closed");
                        return ServeEnd::GatewayClosed(self.fatal.take());
                    };
                    self.handle_gateway_event(event);
                }

                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    match joined {
                        Ok(outcome) => log_outcome(&outcome),
                        Err(e) => error!(error = %e, "Reaction handler panicked"),
                    }
                }
            }
        }
    }

    /// Stops the worker after the running publication and waits for the
    /// remaining reaction handlers so their replies get posted.
    pub async fn drain(mut self) {
        self.worker.shutdown();

        while let Some(joined) = self.in_flight.join_next().await {
            match joined {
                Ok(outcome) => log_outcome(&outcome),
                Err(e) => error!(error = %e, "Reaction handler panicked"),
            }
        }

        if let Err(e) = self.worker_task.await {
            error!(error = %e, "Publication worker panicked");
        }
        info!("Runtime drained");
    }

    fn handle_gateway_event(&mut self, event: GatewayEventKind) {
        match event {
            GatewayEventKind::Connected { session_id, .. } => {
                info!(session_id = %session_id, "Gateway connected");
            }
            GatewayEventKind::Disconnected { reason, can_resume } => {
                warn!(reason = %reason, can_resume, "Gateway disconnected");
            }
            GatewayEventKind::Reconnecting { attempt } => {
                info!(attempt, "Gateway reconnecting");
            }
            GatewayEventKind::Resumed => {
                info!("Gateway session resumed");
            }
            GatewayEventKind::HeartbeatAck { latency_ms } => {
                debug!(latency_ms, "Heartbeat acknowledged");
            }
            GatewayEventKind::Dispatch(dispatch) => {
                self.handle_dispatch_event(dispatch);
            }
            GatewayEventKind::Error {
                message,
                recoverable,
            } => {
                if recoverable {
                    warn!(error = %message, "Recoverable gateway error");
                } else {
                    error!(error = %message, "Fatal gateway error");
                    self.fatal = Some(message);
                }
            }
        }
    }

    fn handle_dispatch_event(&mut self, event: DispatchEvent) {
        match event {
            DispatchEvent::Ready {
                user_id,
                username,
                guild_count,
                ..
            } => {
                info!(user_id = %user_id, username = %username, guild_count, "Bot ready");
            }
            DispatchEvent::MessageReactionAdd { trigger, guild_id } => {
                debug!(
                    message_id = %trigger.message_id,
                    user_id = %trigger.user_id,
                    guild_id = ?guild_id,
                    "Reaction added"
                );
                let listener = self.listener.clone();
                self.in_flight
                    .spawn(async move { listener.handle_reaction(trigger).await });
            }
            DispatchEvent::Unknown { event_type } => {
                debug!(event_type = %event_type, "Ignoring dispatch");
            }
        }
    }
}

fn log_outcome(outcome: &TriggerOutcome) {
    match outcome {
        TriggerOutcome::Ignored(reason) => debug!(reason = ?reason, "Reaction ignored"),
        TriggerOutcome::Rejected(reason) => info!(reason = %reason, "Publication refused"),
        TriggerOutcome::Published(report) => info!(
            filename = %report.filename,
            image_count = report.image_count,
            "Publication finished"
        ),
        TriggerOutcome::Failed(error) => warn!(error = %error, "Publication failed"),
    }
}
