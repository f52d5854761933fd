//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line / WEB_* environment
//!     → schema.rs (clap parse, relaxed by relax.rs)
//!     → WebCommand { dispatch, gateway }
//!     → assets stager sets dispatch.cli_artifacts_dir
//!     → reconcile.rs derives GatewayOverrides from dispatch
//!     → overrides applied once, config immutable afterwards
//! ```
//!
//! # Design Decisions
//! - Gateway flags with a dispatch fallback are optional by construction
//! - Reconciliation is a pure function returning a value
//! - Any derivation error is fatal before a runner exists

pub mod reconcile;
pub mod relax;
pub mod schema;

pub use reconcile::{reconcile, ConfigError, GatewayOverrides};
pub use relax::{relax_requirements, DerivedField, FallbackSource, DERIVED_FIELDS};
pub use schema::{DispatchConfig, GatewayConfig, MetricsCredentials, WebCommand};
