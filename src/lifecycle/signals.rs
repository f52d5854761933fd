//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGINT and, on unix, SIGTERM
//! - Translate the first signal into a [`Shutdown`] trigger
//!
//! Handlers are registered in [`SignalForwarder::install`], before any runner
//! starts, so a signal arriving during startup is not lost.

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Registered interrupt/termination handlers.
pub struct SignalForwarder {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl SignalForwarder {
    /// Register the signal handlers. Must be called inside a Tokio runtime.
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next interrupt or termination signal and return its name.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c",
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending().await
            }
        }
    }

    /// Trigger `shutdown` on the first signal.
    pub fn forward_to(mut self, shutdown: Shutdown) -> JoinHandle<()> {
        tokio::spawn(async move {
            let name = self.recv().await;
            tracing::info!(signal = name, "Shutdown signal received");
            shutdown.trigger();
        })
    }
}
