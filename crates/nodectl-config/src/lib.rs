//! Shared configuration for the `nodectl` cluster node controller.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults, then a
//! configuration file (`--config-path` or `NODECTL_CONFIG_PATH`), then
//! `NODECTL_*` environment variables, then command-line flags. Optional
//! settings are stored as `Option` values and resolved through accessors so
//! every layer can leave them unset.

mod command;
mod defaults;
mod logging;
mod topology;

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use command::CommandLine;
pub use defaults::{
    DEFAULT_COMMAND_LOG_DIR, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_DB_DAEMON,
    DEFAULT_DB_LOG_FILE, DEFAULT_DB_PID_FILE, DEFAULT_DB_PING_ARGS, DEFAULT_DB_PING_COMMAND,
    DEFAULT_DB_STOP_ARGS, DEFAULT_DB_STOP_COMMAND, DEFAULT_LOG_FILTER,
    DEFAULT_STARTUP_POLL_INTERVAL_SECS, DEFAULT_STATE_FILE, default_command_log_dir,
    default_log_filter, default_log_format, default_state_file,
};
pub use logging::LogFormat;
pub use topology::ClusterTopology;

/// Controller configuration resolved from every configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "NODECTL")]
pub struct Config {
    /// Addresses of every cluster member; the first entry is the seed.
    #[serde(default)]
    pub cluster_ips: Vec<String>,
    /// Address of the node managed by this controller.
    #[serde(default)]
    pub my_ip: String,
    /// File holding the persisted node state.
    pub state_file_location: Option<Utf8PathBuf>,
    /// `tracing` filter expression.
    pub log_filter: Option<String>,
    /// Log output format.
    pub log_format: Option<LogFormat>,
    /// Directory receiving the output of probe and management commands.
    pub command_log_dir: Option<Utf8PathBuf>,
    /// Wall-clock budget for each probe or management command.
    pub command_timeout_secs: Option<u64>,
    /// Pause between reachability probes while a joining engine starts.
    pub startup_poll_interval_secs: Option<u64>,
    /// Engine launcher started in join mode.
    pub db_daemon_path: Option<String>,
    /// Arguments passed to the engine launcher in join mode.
    #[serde(default)]
    pub db_join_args: Vec<String>,
    /// PID file written by the engine.
    pub db_pid_file: Option<Utf8PathBuf>,
    /// Log receiving the output of the join-mode engine process.
    pub db_log_file: Option<Utf8PathBuf>,
    /// Command probing whether the engine accepts connections.
    pub db_ping_command: Option<String>,
    /// Arguments for the reachability probe.
    #[serde(default)]
    pub db_ping_args: Vec<String>,
    /// Command performing an orderly engine shutdown.
    pub db_stop_command: Option<String>,
    /// Arguments for the shutdown command.
    #[serde(default)]
    pub db_stop_args: Vec<String>,
    /// Command probing a peer's cluster health; the peer address is appended.
    pub health_check_command: Option<String>,
    /// Leading arguments for the health probe.
    #[serde(default)]
    pub health_check_args: Vec<String>,
    /// Version of the installed engine package.
    pub package_version: Option<String>,
    /// File recording the version the data directory was last upgraded to.
    pub version_file: Option<Utf8PathBuf>,
    /// Command migrating the data directory to the package version.
    pub upgrade_command: Option<String>,
    /// Arguments for the upgrade command.
    #[serde(default)]
    pub upgrade_args: Vec<String>,
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns the aggregated [`OrthoError`] when any layer fails to parse or
    /// merge.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// # Errors
    ///
    /// Returns the aggregated [`OrthoError`] when any layer fails to parse or
    /// merge.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Cluster membership as seen by this node.
    #[must_use]
    pub fn topology(&self) -> ClusterTopology<'_> {
        ClusterTopology::new(&self.cluster_ips, &self.my_ip)
    }

    /// Path of the persisted node state.
    #[must_use]
    pub fn state_file_location(&self) -> Utf8PathBuf {
        self.state_file_location
            .clone()
            .unwrap_or_else(default_state_file)
    }

    /// Active `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Active log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }

    /// Directory receiving command output files.
    #[must_use]
    pub fn command_log_dir(&self) -> Utf8PathBuf {
        self.command_log_dir
            .clone()
            .unwrap_or_else(default_command_log_dir)
    }

    /// Path of the output file for a named management command.
    #[must_use]
    pub fn command_log_path(&self, name: &str) -> Utf8PathBuf {
        self.command_log_dir().join(format!("{name}.log"))
    }

    /// Timeout applied to probe and management commands.
    #[must_use]
    pub fn command_timeout_secs(&self) -> u64 {
        self.command_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS)
    }

    /// Pause between reachability probes.
    #[must_use]
    pub fn startup_poll_interval_secs(&self) -> u64 {
        self.startup_poll_interval_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_STARTUP_POLL_INTERVAL_SECS)
    }

    /// Engine launcher used for join-mode starts.
    #[must_use]
    pub fn db_daemon_path(&self) -> &str {
        self.db_daemon_path.as_deref().unwrap_or(DEFAULT_DB_DAEMON)
    }

    /// Engine PID file.
    #[must_use]
    pub fn db_pid_file(&self) -> &Utf8Path {
        self.db_pid_file
            .as_deref()
            .unwrap_or_else(|| Utf8Path::new(DEFAULT_DB_PID_FILE))
    }

    /// Engine log receiving join-mode output.
    #[must_use]
    pub fn db_log_file(&self) -> &Utf8Path {
        self.db_log_file
            .as_deref()
            .unwrap_or_else(|| Utf8Path::new(DEFAULT_DB_LOG_FILE))
    }

    /// Probe reporting whether the engine accepts connections.
    #[must_use]
    pub fn db_ping_command(&self) -> CommandLine {
        CommandLine::configured_or(
            self.db_ping_command.as_deref(),
            &self.db_ping_args,
            DEFAULT_DB_PING_COMMAND,
            DEFAULT_DB_PING_ARGS,
        )
    }

    /// Orderly engine shutdown command.
    #[must_use]
    pub fn db_stop_command(&self) -> CommandLine {
        CommandLine::configured_or(
            self.db_stop_command.as_deref(),
            &self.db_stop_args,
            DEFAULT_DB_STOP_COMMAND,
            DEFAULT_DB_STOP_ARGS,
        )
    }

    /// Peer health probe, when one is configured.
    #[must_use]
    pub fn health_check_command(&self) -> Option<CommandLine> {
        self.health_check_command
            .as_deref()
            .map(|program| CommandLine::new(program, self.health_check_args.clone()))
    }

    /// Data directory upgrade command, when one is configured.
    #[must_use]
    pub fn upgrade_command(&self) -> Option<CommandLine> {
        self.upgrade_command
            .as_deref()
            .map(|program| CommandLine::new(program, self.upgrade_args.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_values_fall_back_to_defaults() {
        let config = Config::default();
        assert_eq!(config.state_file_location(), default_state_file());
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.command_timeout_secs(), DEFAULT_COMMAND_TIMEOUT_SECS);
        assert_eq!(
            config.startup_poll_interval_secs(),
            DEFAULT_STARTUP_POLL_INTERVAL_SECS
        );
        assert_eq!(config.db_daemon_path(), DEFAULT_DB_DAEMON);
    }

    #[test]
    fn zero_command_timeout_is_ignored() {
        let config = Config {
            command_timeout_secs: Some(0),
            ..Config::default()
        };
        assert_eq!(config.command_timeout_secs(), DEFAULT_COMMAND_TIMEOUT_SECS);
    }

    #[test]
    fn zero_poll_interval_is_ignored() {
        let config = Config {
            startup_poll_interval_secs: Some(0),
            ..Config::default()
        };
        assert_eq!(
            config.startup_poll_interval_secs(),
            DEFAULT_STARTUP_POLL_INTERVAL_SECS
        );
    }

    #[test]
    fn command_logs_live_in_the_command_log_dir() {
        let config = Config {
            command_log_dir: Some(Utf8PathBuf::from("/tmp/nodectl")),
            ..Config::default()
        };
        assert_eq!(
            config.command_log_path("ping"),
            Utf8PathBuf::from("/tmp/nodectl/ping.log")
        );
    }

    #[test]
    fn ping_command_defaults_to_mysqladmin_ping() {
        let config = Config::default();
        let ping = config.db_ping_command();
        assert_eq!(ping.program, DEFAULT_DB_PING_COMMAND);
        assert_eq!(ping.args, vec!["ping".to_owned()]);
    }

    #[test]
    fn configured_stop_command_keeps_its_arguments() {
        let config = Config {
            db_stop_command: Some("/usr/local/bin/engine-stop".to_owned()),
            db_stop_args: vec!["--graceful".to_owned()],
            ..Config::default()
        };
        let stop = config.db_stop_command();
        assert_eq!(stop.program, "/usr/local/bin/engine-stop");
        assert_eq!(stop.args, vec!["--graceful".to_owned()]);
    }

    #[test]
    fn health_probe_is_optional() {
        assert!(Config::default().health_check_command().is_none());
    }

    #[test]
    fn topology_reflects_configured_members() {
        let config = Config {
            cluster_ips: vec!["10.0.0.1".to_owned(), "10.0.0.2".to_owned()],
            my_ip: "10.0.0.2".to_owned(),
            ..Config::default()
        };
        let topology = config.topology();
        assert!(!topology.is_single_node());
        assert!(!topology.is_seed());
    }
}
