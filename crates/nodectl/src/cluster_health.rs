//! Cluster health collaborator.

use std::sync::Arc;

use camino::Utf8PathBuf;
use tracing::{debug, info};

use nodectl_config::{CommandLine, Config};
use nodectl_os::OsHelper;

const HEALTH_TARGET: &str = "nodectl::cluster_health";

/// Reports whether a healthy cluster exists for this node to join.
pub trait ClusterHealthChecker: Send + Sync {
    /// Whether at least one peer belongs to a healthy cluster.
    fn healthy_cluster(&self) -> bool;
}

/// [`ClusterHealthChecker`] that runs a probe command against each peer.
///
/// The peer address is appended to the configured arguments. The first peer
/// whose probe exits successfully makes the cluster healthy; without a
/// configured probe the cluster is never considered healthy.
pub struct CommandHealthChecker {
    os: Arc<dyn OsHelper>,
    probe: Option<CommandLine>,
    peers: Vec<String>,
    output: Utf8PathBuf,
    timeout_secs: u64,
}

impl CommandHealthChecker {
    /// Builds the checker from configuration.
    #[must_use]
    pub fn from_config(config: &Config, os: Arc<dyn OsHelper>) -> Self {
        Self {
            os,
            probe: config.health_check_command(),
            peers: config.topology().peers().map(str::to_owned).collect(),
            output: config.command_log_path("cluster-health"),
            timeout_secs: config.command_timeout_secs(),
        }
    }
}

impl ClusterHealthChecker for CommandHealthChecker {
    fn healthy_cluster(&self) -> bool {
        let Some(probe) = &self.probe else {
            debug!(
                target: HEALTH_TARGET,
                "no health probe configured; treating cluster as unhealthy"
            );
            return false;
        };

        for peer in &self.peers {
            let command = probe.with_arg(peer.as_str());
            match self.os.run_command_with_timeout(
                self.timeout_secs,
                self.output.as_std_path(),
                &command.program,
                &command.args,
            ) {
                Ok(()) => {
                    info!(target: HEALTH_TARGET, peer = %peer, "found healthy cluster member");
                    return true;
                }
                Err(error) => {
                    debug!(
                        target: HEALTH_TARGET,
                        peer = %peer,
                        error = %error,
                        "peer health probe failed"
                    );
                }
            }
        }

        info!(
            target: HEALTH_TARGET,
            peers = ?self.peers,
            "no healthy cluster member found"
        );
        false
    }
}
