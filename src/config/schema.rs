//! Configuration schema definitions.
//!
//! This module defines the composite command line of the web node. The
//! dispatch and gateway blocks are declared the way each subsystem would
//! declare them on its own; [`WebCommand`] flattens both into one parser.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, CommandFactory, FromArgMatches, Parser};
use url::Url;

use crate::config::relax::relax_requirements;

/// Root command for the web node: dispatch and gateway in one process.
#[derive(Debug, Clone, Parser)]
#[command(name = "web")]
#[command(about = "Run the dispatch API and the worker registration gateway as one process", long_about = None)]
pub struct WebCommand {
    #[command(flatten)]
    pub dispatch: DispatchConfig,

    #[command(flatten)]
    pub gateway: GatewayConfig,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, env = "WEB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Bind address for the Prometheus metrics endpoint. Disabled when unset.
    #[arg(long, env = "WEB_METRICS_ADDRESS")]
    pub metrics_address: Option<SocketAddr>,

    /// Extra arguments handed to both runner factories.
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl WebCommand {
    /// The clap command with derived gateway flags no longer required.
    pub fn relaxed_command() -> clap::Command {
        relax_requirements(Self::command())
    }

    /// Parse from the process arguments using the relaxed command.
    pub fn parse_relaxed() -> Self {
        let matches = Self::relaxed_command().get_matches();
        match Self::from_arg_matches(&matches) {
            Ok(cmd) => cmd,
            Err(e) => e.exit(),
        }
    }

    /// Parse from an explicit argument list using the relaxed command.
    pub fn try_parse_relaxed_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::relaxed_command().try_get_matches_from(itr)?;
        Self::from_arg_matches(&matches)
    }
}

/// Configuration of the public-facing dispatch API.
#[derive(Debug, Clone, Args)]
#[command(next_help_heading = "Dispatch Configuration")]
pub struct DispatchConfig {
    /// Address the API listens on.
    #[arg(long, env = "WEB_BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    pub bind_address: SocketAddr,

    /// URL at which this node is reachable by its peers (e.g. the gateway).
    #[arg(long, env = "WEB_PEER_URL")]
    pub peer_url: String,

    /// URL at which the API is reachable by users. Defaults to the peer URL.
    #[arg(long, env = "WEB_EXTERNAL_URL")]
    pub external_url: Option<Url>,

    /// Key file used to sign user sessions.
    #[arg(long, env = "WEB_SESSION_SIGNING_KEY")]
    pub session_signing_key: PathBuf,

    #[command(flatten)]
    pub metrics: DispatchMetrics,

    /// Directory holding the staged CLI artifacts. Set by the asset stager.
    #[arg(skip)]
    pub cli_artifacts_dir: Option<PathBuf>,
}

/// Configuration of the worker registration gateway.
#[derive(Debug, Clone, Args)]
#[command(next_help_heading = "Gateway Configuration")]
pub struct GatewayConfig {
    /// IP address the gateway listens on.
    #[arg(id = "gateway-bind-ip", long = "gateway-bind-ip", env = "WEB_GATEWAY_BIND_IP", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_ip: IpAddr,

    /// Port the gateway listens on.
    #[arg(id = "gateway-bind-port", long = "gateway-bind-port", env = "WEB_GATEWAY_BIND_PORT", default_value_t = 2222)]
    pub bind_port: u16,

    /// Address handed to registering workers to reach this node.
    #[arg(id = "gateway-peer-ip", long = "gateway-peer-ip", env = "WEB_GATEWAY_PEER_IP", required = true)]
    pub peer_ip: Option<String>,

    /// Dispatch API URLs the gateway trusts and forwards registrations to.
    #[arg(id = "gateway-dispatch-url", long = "gateway-dispatch-url", env = "WEB_GATEWAY_DISPATCH_URL", required = true)]
    pub dispatch_urls: Vec<Url>,

    /// Key file used to sign tokens presented to the dispatch API.
    #[arg(id = "gateway-session-signing-key", long = "gateway-session-signing-key", env = "WEB_GATEWAY_SESSION_SIGNING_KEY", required = true)]
    pub session_signing_key: Option<PathBuf>,

    #[command(flatten)]
    pub metrics: GatewayMetrics,
}

/// Error-reporting credentials shared by both subsystems.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsCredentials {
    /// API key of the error-reporting service.
    pub api_key: Option<String>,
    /// Environment name reported alongside errors and metrics.
    pub environment: Option<String>,
}

/// Dispatch-side metrics flags.
#[derive(Debug, Clone, Default, Args)]
pub struct DispatchMetrics {
    /// API key of the error-reporting service.
    #[arg(id = "metrics-api-key", long = "metrics-api-key", env = "WEB_METRICS_API_KEY")]
    pub api_key: Option<String>,

    /// Environment name reported with errors and metrics.
    #[arg(id = "metrics-environment", long = "metrics-environment", env = "WEB_METRICS_ENVIRONMENT")]
    pub environment: Option<String>,
}

/// Gateway-side metrics flags.
#[derive(Debug, Clone, Default, Args)]
pub struct GatewayMetrics {
    /// API key of the error-reporting service.
    #[arg(id = "gateway-metrics-api-key", long = "gateway-metrics-api-key", env = "WEB_GATEWAY_METRICS_API_KEY")]
    pub api_key: Option<String>,

    /// Environment name reported with errors and metrics.
    #[arg(id = "gateway-metrics-environment", long = "gateway-metrics-environment", env = "WEB_GATEWAY_METRICS_ENVIRONMENT")]
    pub environment: Option<String>,
}

impl DispatchMetrics {
    pub fn credentials(&self) -> MetricsCredentials {
        MetricsCredentials {
            api_key: self.api_key.clone(),
            environment: self.environment.clone(),
        }
    }
}

impl GatewayMetrics {
    pub fn credentials(&self) -> MetricsCredentials {
        MetricsCredentials {
            api_key: self.api_key.clone(),
            environment: self.environment.clone(),
        }
    }

    pub fn set_credentials(&mut self, credentials: MetricsCredentials) {
        self.api_key = credentials.api_key;
        self.environment = credentials.environment;
    }
}
