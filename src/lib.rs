//! Web node: dispatch API and worker registration gateway in one process.

pub mod assets;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod observability;
pub mod runner;

pub use config::WebCommand;
pub use error::{WebError, WebResult};
pub use lifecycle::Shutdown;
pub use runner::{Group, Runner, RunnerFactory};
