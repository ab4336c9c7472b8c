use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, warn};

use super::constants::HEARTBEAT_JITTER_PERCENT;

/// Sentinel meaning "no dispatch received yet".
pub const NO_SEQUENCE: u64 = u64::MAX;

/// What the heartbeat task asks the connection to do.
#[derive(Debug, PartialEq, Eq)]
pub enum HeartbeatSignal {
    /// Send a heartbeat carrying this sequence.
    Beat(Option<u64>),
    /// The previous beat was never acknowledged.
    Missed,
}

/// Beats at the interval from HELLO, reading the last sequence the
/// connection observed.
pub struct HeartbeatManager {
    interval_ms: u64,
    sequence: Arc<AtomicU64>,
    ack_received: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl HeartbeatManager {
    #[must_use]
    pub fn new(interval_ms: u64, sequence: Arc<AtomicU64>) -> Self {
        Self {
            interval_ms,
            sequence,
            ack_received: Arc::new(AtomicBool::new(true)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn acknowledge(&self) {
        self.ack_received.store(true, Ordering::SeqCst);
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn start(&self, signal_tx: mpsc::Sender<HeartbeatSignal>) -> JoinHandle<()> {
        let interval_ms = self.interval_ms.max(1);
        let sequence = Arc::clone(&self.sequence);
        let running = Arc::clone(&self.running);
        let ack_received = Arc::clone(&self.ack_received);

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let jitter = (interval_ms as f64 * HEARTBEAT_JITTER_PERCENT) as u64;
            let mut ticker = interval_at(
                Instant::now() + Duration::from_millis(interval_ms - jitter),
                Duration::from_millis(interval_ms),
            );

            while running.load(Ordering::SeqCst) {
                ticker.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                if !ack_received.swap(false, Ordering::SeqCst) {
                    warn!("Heartbeat ACK not received, connection looks dead");
                    let _ = signal_tx.send(HeartbeatSignal::Missed).await;
                    break;
                }

                let seq = current_sequence(&sequence);
                if signal_tx.send(HeartbeatSignal::Beat(seq)).await.is_err() {
                    debug!("Heartbeat channel closed");
                    break;
                }
                debug!(sequence = ?seq, "Sent heartbeat");
            }

            debug!("Heartbeat loop stopped");
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for HeartbeatManager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[must_use]
pub fn current_sequence(sequence: &AtomicU64) -> Option<u64> {
    match sequence.load(Ordering::SeqCst) {
        NO_SEQUENCE => None,
        seq => Some(seq),
    }
}
