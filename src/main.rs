//! Web node (v1)
//!
//! Runs the dispatch API and the worker registration gateway as one
//! supervised process.
//!
//! # Architecture Overview
//!
//! ```text
//!   argv / WEB_* env
//!         │
//!         ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ WebCommand   │──▶│ AssetStager  │──▶│  reconcile   │
//!   │ (relaxed)    │   │ cli-artifacts│   │ dispatch→gw  │
//!   └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                                │
//!                                                ▼
//!                      ┌───────────────────────────────────┐
//!   SIGINT/SIGTERM ───▶│              Group                │
//!                      │  ┌──────────┐      ┌──────────┐   │
//!                      │  │ dispatch │      │ gateway  │   │
//!                      │  └──────────┘      └──────────┘   │
//!                      │   one exits → all are stopped     │
//!                      └───────────────────────────────────┘
//!                                     │
//!                                     ▼
//!                          first error → exit code
//! ```

use std::process::ExitCode;

use web_node::assets::AssetStager;
use web_node::lifecycle::{self, Shutdown, SignalForwarder};
use web_node::observability::{logging, metrics};
use web_node::{WebCommand, WebError};

#[tokio::main]
async fn main() -> ExitCode {
    let cmd = WebCommand::parse_relaxed();
    logging::init(&cmd.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "web node starting");

    match run(cmd).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "web node failed");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cmd: WebCommand) -> Result<(), WebError> {
    if let Some(addr) = cmd.metrics_address {
        metrics::init_metrics(addr, cmd.dispatch.metrics.environment.as_deref())?;
    }

    let shutdown = Shutdown::new();
    SignalForwarder::install()
        .map_err(WebError::Signals)?
        .forward_to(shutdown.clone());

    lifecycle::run(cmd, &AssetStager::embedded(), shutdown).await
}
