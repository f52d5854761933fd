//! Runners and the group that supervises them.
//!
//! A [`Runner`] is one long-lived subsystem. Spawning the future returned by
//! [`Runner::run`] starts it, awaiting that future observes its termination,
//! and the [`StopRequest`] it receives is how it is asked to stop.
//!
//! # Data Flow
//! ```text
//! DispatchConfig ─┐                      ┌─ "dispatch" ─┐
//!                 ├─ RunnerFactory ─→ Group               ├─→ first error / Ok
//! GatewayConfig ──┘                      └─ "gateway" ──┘
//! ```

pub mod group;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio::sync::watch;

pub use group::{Group, GroupError, GroupState, MemberState};

/// Future driving a runner until it stops.
pub type RunFuture = Pin<Box<dyn Future<Output = Result<(), RunnerError>> + Send + 'static>>;

/// Errors produced while building or running a subsystem.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The subsystem refused its configuration.
    #[error("{0}")]
    Construction(String),

    #[error("panicked: {0}")]
    Panicked(String),

    /// The subsystem stopped on its own with an error.
    #[error("{0}")]
    Failed(String),
}

/// A startable, stoppable unit of execution.
pub trait Runner: Send + 'static {
    /// Serve until `stop` fires or the runner fails.
    fn run(self: Box<Self>, stop: StopRequest) -> RunFuture;
}

/// Capability of a subsystem configuration to produce its runner.
pub trait RunnerFactory {
    fn runner(&self, args: &[String]) -> Result<Box<dyn Runner>, RunnerError>;
}

/// Runner backed by a closure, mostly useful for tests and small tasks.
pub struct FnRunner<F>(F);

/// Wrap `f` into a [`Runner`].
pub fn from_fn<F, Fut>(f: F) -> Box<dyn Runner>
where
    F: FnOnce(StopRequest) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), RunnerError>> + Send + 'static,
{
    Box::new(FnRunner(f))
}

impl<F, Fut> Runner for FnRunner<F>
where
    F: FnOnce(StopRequest) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), RunnerError>> + Send + 'static,
{
    fn run(self: Box<Self>, stop: StopRequest) -> RunFuture {
        Box::pin((self.0)(stop))
    }
}

/// Sending half of a member's stop channel, held by the group.
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

/// Receiving half of a member's stop channel, handed to the runner.
///
/// The request is latched: a stop issued before the runner first waits is
/// still observed.
#[derive(Debug, Clone)]
pub struct StopRequest {
    rx: watch::Receiver<bool>,
}

/// Create a connected stop handle and request.
pub fn stop_channel() -> (StopHandle, StopRequest) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopRequest { rx })
}

impl StopHandle {
    /// Ask the runner to stop. Returns false if it had already been asked.
    pub fn stop(&self) -> bool {
        !self.tx.send_replace(true)
    }
}

impl StopRequest {
    /// Wait until a stop is requested.
    ///
    /// Also returns if the handle was dropped, since nobody can observe the
    /// runner any more.
    pub async fn requested(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    /// Owned variant of [`StopRequest::requested`] for `'static` futures.
    pub async fn into_requested(mut self) {
        self.requested().await
    }
}
