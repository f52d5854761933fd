//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Stage assets → Reconcile config → Build runners → Run group
//!
//! Shutdown (shutdown.rs):
//!     Signal or member exit → Stop every member → Wait for all → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: nothing runs until every pre-start step succeeded
//! - One member exiting stops the whole group
//! - No shutdown deadline: the group waits for every member

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::SignalForwarder;
pub use startup::{prepare, run, Prepared};
