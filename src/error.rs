//! Top-level error type of the web node.

use thiserror::Error;

use crate::assets::AssetError;
use crate::config::ConfigError;
use crate::runner::{GroupError, RunnerError};

/// Errors that end the process.
#[derive(Debug, Error)]
pub enum WebError {
    #[error(transparent)]
    Assets(#[from] AssetError),

    #[error("failed to derive gateway configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to construct {subsystem} runner: {source}")]
    RunnerConstruction {
        subsystem: &'static str,
        #[source]
        source: RunnerError,
    },

    #[error(transparent)]
    RunnerExecution(#[from] GroupError),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("failed to start metrics endpoint: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Result type of startup and supervision.
pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    /// Process exit status: 1 when a member failed at runtime, 2 when startup
    /// failed before any runner was started.
    pub fn exit_code(&self) -> u8 {
        match self {
            WebError::RunnerExecution(_) => 1,
            WebError::Assets(_)
            | WebError::Config(_)
            | WebError::RunnerConstruction { .. }
            | WebError::Signals(_)
            | WebError::Metrics(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WebError::from(ConfigError::InvalidHostPort {
            url: "file:///x".into(),
        });
        assert_eq!(
            err.to_string(),
            "failed to derive gateway configuration: invalid host in peer URL \"file:///x\""
        );

        let err = WebError::RunnerConstruction {
            subsystem: "gateway",
            source: RunnerError::Construction("no dispatch URL to trust".into()),
        };
        assert_eq!(
            err.to_string(),
            "failed to construct gateway runner: no dispatch URL to trust"
        );

        let err = WebError::from(GroupError {
            member: "dispatch".into(),
            source: RunnerError::Failed("crashed".into()),
        });
        assert_eq!(err.to_string(), "dispatch exited with error: crashed");
    }

    #[test]
    fn test_exit_codes_are_non_zero() {
        let runtime = WebError::from(GroupError {
            member: "dispatch".into(),
            source: RunnerError::Failed("crashed".into()),
        });
        let startup = WebError::from(ConfigError::MalformedUrl {
            url: String::new(),
            reason: "empty".into(),
        });
        assert_eq!(runtime.exit_code(), 1);
        assert_eq!(startup.exit_code(), 2);
    }
}
