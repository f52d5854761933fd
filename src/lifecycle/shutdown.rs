//! Shutdown coordination for the web node.

use std::sync::Arc;

use tokio::sync::watch;

/// Process-wide cancellation signal.
///
/// Cloned into the signal forwarder and the group supervisor instead of
/// living in a global, so tests can trigger it directly. The signal is
/// latched: subscribers created after [`Shutdown::trigger`] still observe it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new, untriggered shutdown signal.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal. Later calls are no-ops.
    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            tracing::debug!("Shutdown triggered");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the signal is triggered.
    pub async fn triggered(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so this only returns once triggered.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
