use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression used by the controller.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default location of the persisted node state.
pub const DEFAULT_STATE_FILE: &str = "/var/lib/nodectl/node_state.txt";

/// Default directory receiving the output of management commands.
pub const DEFAULT_COMMAND_LOG_DIR: &str = "/var/log/nodectl";

/// Default wall-clock budget, in seconds, for management commands.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Default pause, in seconds, between reachability probes during startup.
pub const DEFAULT_STARTUP_POLL_INTERVAL_SECS: u64 = 1;

/// Default database engine launcher.
pub const DEFAULT_DB_DAEMON: &str = "mysqld_safe";

/// Default engine PID file.
pub const DEFAULT_DB_PID_FILE: &str = "/var/run/mysqld/mysqld.pid";

/// Default engine log receiving the join-mode process output.
pub const DEFAULT_DB_LOG_FILE: &str = "/var/log/mysql/mysql.err.log";

/// Default reachability probe.
pub const DEFAULT_DB_PING_COMMAND: &str = "mysqladmin";

/// Arguments for the default reachability probe.
pub const DEFAULT_DB_PING_ARGS: &[&str] = &["ping"];

/// Default orderly shutdown command.
pub const DEFAULT_DB_STOP_COMMAND: &str = "mysqladmin";

/// Arguments for the default shutdown command.
pub const DEFAULT_DB_STOP_ARGS: &[&str] = &["shutdown"];

/// Default log filter expression used by the controller.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the controller.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default state file path.
#[must_use]
pub fn default_state_file() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_STATE_FILE)
}

/// Default command log directory.
#[must_use]
pub fn default_command_log_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_COMMAND_LOG_DIR)
}
