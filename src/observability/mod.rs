//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Supervisor, dispatch and gateway produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
