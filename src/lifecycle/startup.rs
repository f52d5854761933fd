//! Startup orchestration.
//!
//! # Responsibilities
//! - Stage the CLI artifacts
//! - Derive the gateway configuration from the dispatch configuration
//! - Build both runners, dispatch first
//! - Hand both to the runner group
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing has been started
//! - Steps run in order, not concurrently
//! - The dispatch runner is only built after staging returned

use crate::assets::AssetStager;
use crate::config::{reconcile, WebCommand};
use crate::error::{WebError, WebResult};
use crate::lifecycle::Shutdown;
use crate::runner::{Group, RunnerFactory};

/// Both runners, built and ready to be started.
pub struct Prepared {
    group: Group,
}

/// Run every pre-start step and build the runner group.
///
/// Nothing is started here; an error means no runner exists.
pub fn prepare(mut cmd: WebCommand, stager: &AssetStager) -> WebResult<Prepared> {
    let staged = stager.stage()?;
    cmd.dispatch.cli_artifacts_dir = Some(staged);

    let overrides = reconcile(&cmd.dispatch, &cmd.gateway)?;
    overrides.apply(&mut cmd.gateway);
    tracing::debug!(
        peer_ip = ?cmd.gateway.peer_ip,
        dispatch_urls = ?cmd.gateway.dispatch_urls,
        "Gateway configuration derived"
    );

    let dispatch = cmd
        .dispatch
        .runner(&cmd.args)
        .map_err(|source| WebError::RunnerConstruction {
            subsystem: "dispatch",
            source,
        })?;
    let gateway = cmd
        .gateway
        .runner(&cmd.args)
        .map_err(|source| WebError::RunnerConstruction {
            subsystem: "gateway",
            source,
        })?;

    Ok(Prepared {
        group: Group::new().member("dispatch", dispatch).member("gateway", gateway),
    })
}

impl Prepared {
    /// Start both runners and wait until the group terminated.
    pub async fn run(self, shutdown: Shutdown) -> WebResult<()> {
        self.group.run(shutdown).await?;
        Ok(())
    }
}

/// Prepare and run the web node until it stops.
pub async fn run(cmd: WebCommand, stager: &AssetStager, shutdown: Shutdown) -> WebResult<()> {
    prepare(cmd, stager)?.run(shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetError;
    use crate::config::ConfigError;

    fn command(peer_url: &str, key: &str) -> WebCommand {
        WebCommand::try_parse_relaxed_from([
            "web",
            "--peer-url",
            peer_url,
            "--session-signing-key",
            key,
        ])
        .unwrap()
    }

    #[test]
    fn test_staging_failure_builds_no_runner() {
        let root = tempfile::tempdir().unwrap();
        let occupied = root.path().join("occupied");
        std::fs::write(&occupied, b"file").unwrap();

        let err = prepare(
            command("http://127.0.0.1:8080", "/tmp/key"),
            &AssetStager::embedded().with_root(&occupied),
        )
        .err()
        .unwrap();

        assert!(matches!(err, WebError::Assets(AssetError::Extraction { .. })));
    }

    #[test]
    fn test_malformed_peer_url_builds_no_runner() {
        let root = tempfile::tempdir().unwrap();
        let key = tempfile::NamedTempFile::new().unwrap();

        let err = prepare(
            command("", key.path().to_str().unwrap()),
            &AssetStager::embedded().with_root(root.path()),
        )
        .err()
        .unwrap();

        assert!(matches!(err, WebError::Config(ConfigError::MalformedUrl { .. })));
    }

    #[test]
    fn test_dispatch_failure_skips_gateway() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("missing_key");

        let err = prepare(
            command("http://127.0.0.1:8080", missing.to_str().unwrap()),
            &AssetStager::embedded().with_root(root.path()),
        )
        .err()
        .unwrap();

        assert!(matches!(
            err,
            WebError::RunnerConstruction { subsystem: "dispatch", .. }
        ));
    }

    #[test]
    fn test_prepare_builds_both_runners() {
        let root = tempfile::tempdir().unwrap();
        let key = tempfile::NamedTempFile::new().unwrap();

        let prepared = prepare(
            command("http://127.0.0.1:8080", key.path().to_str().unwrap()),
            &AssetStager::embedded().with_root(root.path()),
        )
        .unwrap();

        assert_eq!(prepared.group.len(), 2);
    }
}
