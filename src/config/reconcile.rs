//! Gateway configuration derived from the resolved dispatch configuration.
//!
//! # Steps
//! ```text
//! peer URL      → parse          → trusted dispatch URL (only if none given)
//! signing key   → copy           → gateway signing key
//! peer URL host → strip port     → gateway peer IP
//! metrics creds → copy           → gateway metrics creds
//! ```
//!
//! [`reconcile`] is pure: it computes [`GatewayOverrides`] and never touches
//! either config. [`GatewayOverrides::apply`] writes them once.

use std::path::PathBuf;

use thiserror::Error;
use url::{Host, ParseError, Url};

use crate::config::relax::{FallbackSource, DERIVED_FIELDS};
use crate::config::schema::{DispatchConfig, GatewayConfig, MetricsCredentials};

/// Errors deriving gateway configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The dispatch peer URL is not a valid absolute URL.
    #[error("malformed peer URL {url:?}: {reason}")]
    MalformedUrl { url: String, reason: String },

    /// The dispatch peer URL authority has no usable host.
    #[error("invalid host in peer URL {url:?}")]
    InvalidHostPort { url: String },
}

/// Values the gateway takes over from the dispatch configuration.
///
/// Each optional field is the fallback of one entry in [`DERIVED_FIELDS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOverrides {
    /// `Some` only when the gateway trusted no dispatch URL of its own.
    pub dispatch_urls: Option<Vec<Url>>,
    pub session_signing_key: Option<PathBuf>,
    pub peer_ip: Option<String>,
    pub metrics: MetricsCredentials,
}

/// Derive the gateway overrides from the dispatch configuration.
pub fn reconcile(
    dispatch: &DispatchConfig,
    gateway: &GatewayConfig,
) -> Result<GatewayOverrides, ConfigError> {
    let peer_url = parse_peer_url(&dispatch.peer_url)?;

    let mut overrides = GatewayOverrides {
        dispatch_urls: None,
        session_signing_key: None,
        peer_ip: None,
        metrics: dispatch.metrics.credentials(),
    };

    for field in DERIVED_FIELDS {
        match field.source {
            FallbackSource::DispatchPeerUrl => {
                if gateway.dispatch_urls.is_empty() {
                    overrides.dispatch_urls = Some(vec![peer_url.clone()]);
                }
            }
            FallbackSource::DispatchSessionSigningKey => {
                overrides.session_signing_key = Some(dispatch.session_signing_key.clone());
            }
            FallbackSource::DispatchPeerHost => {
                let host = peer_host(&peer_url).ok_or_else(|| ConfigError::InvalidHostPort {
                    url: dispatch.peer_url.clone(),
                })?;
                overrides.peer_ip = Some(host);
            }
        }
    }

    Ok(overrides)
}

impl GatewayOverrides {
    /// Write the overrides into `gateway`.
    pub fn apply(self, gateway: &mut GatewayConfig) {
        if let Some(urls) = self.dispatch_urls {
            gateway.dispatch_urls = urls;
        }
        if self.session_signing_key.is_some() {
            gateway.session_signing_key = self.session_signing_key;
        }
        if self.peer_ip.is_some() {
            gateway.peer_ip = self.peer_ip;
        }
        gateway.metrics.set_credentials(self.metrics);
    }
}

fn parse_peer_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| match e {
        ParseError::EmptyHost => ConfigError::InvalidHostPort {
            url: raw.to_string(),
        },
        e => ConfigError::MalformedUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        },
    })?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::MalformedUrl {
            url: raw.to_string(),
            reason: "not a hierarchical URL".to_string(),
        });
    }

    Ok(url)
}

/// Host of `url` without port, and without brackets for IPv6.
fn peer_host(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) if !domain.is_empty() => Some(domain.to_string()),
        Host::Domain(_) => None,
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}
