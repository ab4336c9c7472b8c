use std::io;

use tracing::info;

/// Which process signal asked the bot to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

/// Listens for Ctrl-C and, on Unix, SIGTERM.
pub struct ShutdownListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownListener {
    /// Registers the handlers. Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// Returns the io error from the signal driver.
    pub fn install() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Waits for the next shutdown signal.
    pub async fn recv(&mut self) -> ShutdownSignal {
        #[cfg(unix)]
        let signal = tokio::select! {
            _ = self.interrupt.recv() => ShutdownSignal::Interrupt,
            _ = self.terminate.recv() => ShutdownSignal::Terminate,
        };

        #[cfg(not(unix))]
        let signal = {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            ShutdownSignal::Interrupt
        };

        info!(signal = ?signal, "Shutdown signal received");
        signal
    }
}
