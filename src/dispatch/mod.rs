//! Dispatch API runner.
//!
//! # Responsibilities
//! - Serve node information on `/api/v1/info`
//! - Serve the staged CLI artifacts on `/api/v1/cli/`
//! - Stop accepting and drain in-flight requests on a stop request
//!
//! Only the surface the supervisor needs; scheduling and storage live
//! elsewhere.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::DispatchConfig;
use crate::runner::{RunFuture, Runner, RunnerError, RunnerFactory, StopRequest};
use self::handlers::{count_requests, get_info, NodeInfo};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Runner serving the dispatch API.
pub struct DispatchRunner {
    bind_address: SocketAddr,
    router: Router,
}

impl RunnerFactory for DispatchConfig {
    fn runner(&self, args: &[String]) -> Result<Box<dyn Runner>, RunnerError> {
        if !args.is_empty() {
            return Err(RunnerError::Construction(format!(
                "unexpected arguments: {}",
                args.join(" ")
            )));
        }

        let cli_artifacts_dir = self.cli_artifacts_dir.as_ref().ok_or_else(|| {
            RunnerError::Construction("CLI artifacts have not been staged".to_string())
        })?;

        if !self.session_signing_key.exists() {
            return Err(RunnerError::Construction(format!(
                "session signing key not found: {}",
                self.session_signing_key.display()
            )));
        }

        let info = NodeInfo {
            version: env!("CARGO_PKG_VERSION"),
            external_url: self
                .external_url
                .as_ref()
                .map(|url| url.to_string())
                .unwrap_or_else(|| self.peer_url.clone()),
            peer_url: self.peer_url.clone(),
        };

        Ok(Box::new(DispatchRunner {
            bind_address: self.bind_address,
            router: build_router(Arc::new(info), ServeDir::new(cli_artifacts_dir)),
        }))
    }
}

#[allow(deprecated)]
fn build_router(info: Arc<NodeInfo>, cli_artifacts: ServeDir) -> Router {
    Router::new()
        .route("/api/v1/info", get(get_info))
        .nest_service("/api/v1/cli", cli_artifacts)
        .with_state(info)
        .layer(middleware::from_fn(count_requests))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}

impl Runner for DispatchRunner {
    fn run(self: Box<Self>, stop: StopRequest) -> RunFuture {
        Box::pin(async move {
            let listener = TcpListener::bind(self.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Dispatch API listening");

            axum::serve(listener, self.router)
                .with_graceful_shutdown(stop.into_requested())
                .await?;

            tracing::info!("Dispatch API stopped");
            Ok::<(), RunnerError>(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebCommand;

    fn config(key: &std::path::Path) -> DispatchConfig {
        WebCommand::try_parse_relaxed_from([
            "web",
            "--peer-url",
            "http://127.0.0.1:8080",
            "--session-signing-key",
            key.to_str().unwrap(),
        ])
        .unwrap()
        .dispatch
    }

    #[test]
    fn test_requires_staged_assets() {
        let key = tempfile::NamedTempFile::new().unwrap();
        let dispatch = config(key.path());

        let err = dispatch.runner(&[]).err().unwrap();
        assert_eq!(err.to_string(), "CLI artifacts have not been staged");
    }

    #[test]
    fn test_requires_existing_signing_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatch = config(&dir.path().join("missing_key"));
        dispatch.cli_artifacts_dir = Some(dir.path().to_path_buf());

        let err = dispatch.runner(&[]).err().unwrap();
        assert!(err.to_string().starts_with("session signing key not found"));
    }

    #[test]
    fn test_rejects_extra_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let key = tempfile::NamedTempFile::new().unwrap();
        let mut dispatch = config(key.path());
        dispatch.cli_artifacts_dir = Some(dir.path().to_path_buf());

        let err = dispatch.runner(&["serve".to_string()]).err().unwrap();
        assert_eq!(err.to_string(), "unexpected arguments: serve");
    }

    #[test]
    fn test_builds_when_staged() {
        let dir = tempfile::tempdir().unwrap();
        let key = tempfile::NamedTempFile::new().unwrap();
        let mut dispatch = config(key.path());
        dispatch.cli_artifacts_dir = Some(dir.path().to_path_buf());

        assert!(dispatch.runner(&[]).is_ok());
    }
}
