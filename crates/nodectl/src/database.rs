//! Database engine collaborator.
//!
//! [`DatabaseHelper`] is the capability set the controller needs from the
//! engine. [`CommandDatabase`] implements it by shelling out: liveness comes
//! from the engine PID file, reachability and shutdown from management
//! commands run under the timeout-bounded executor, and the join-mode start
//! spawns the engine launcher directly.

use std::sync::Arc;

use camino::Utf8PathBuf;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use thiserror::Error;
use tracing::{debug, info, warn};

use nodectl_config::{CommandLine, Config};
use nodectl_os::{CommandError, ManagedProcess, OsHelper};

const DATABASE_TARGET: &str = "nodectl::database";

/// Errors raised by the database collaborator.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The engine could not be started in join mode.
    #[error("failed to start database in join mode: {source}")]
    Start {
        /// Underlying command failure.
        #[source]
        source: CommandError,
    },

    /// The orderly shutdown command failed.
    #[error("failed to stop database: {source}")]
    Stop {
        /// Underlying command failure.
        #[source]
        source: CommandError,
    },
}

/// Operations the controller performs against the database engine.
pub trait DatabaseHelper: Send + Sync {
    /// Whether an engine process is alive on this node.
    fn is_process_running(&self) -> bool;

    /// Whether the engine answers a connectivity probe.
    fn is_database_reachable(&self) -> bool;

    /// Starts the engine so it joins the existing cluster.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Start`] when the engine cannot be launched.
    fn start_in_join_mode(&self) -> Result<ManagedProcess, DatabaseError>;

    /// Performs an orderly engine shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Stop`] when the shutdown command fails.
    fn stop(&self) -> Result<(), DatabaseError>;
}

/// [`DatabaseHelper`] driven by configured external commands.
pub struct CommandDatabase {
    os: Arc<dyn OsHelper>,
    daemon: CommandLine,
    pid_file: Utf8PathBuf,
    engine_log: Utf8PathBuf,
    ping: CommandLine,
    ping_log: Utf8PathBuf,
    stop: CommandLine,
    stop_log: Utf8PathBuf,
    timeout_secs: u64,
}

impl CommandDatabase {
    /// Builds the collaborator from configuration.
    #[must_use]
    pub fn from_config(config: &Config, os: Arc<dyn OsHelper>) -> Self {
        Self {
            os,
            daemon: CommandLine::new(config.db_daemon_path(), config.db_join_args.clone()),
            pid_file: config.db_pid_file().to_path_buf(),
            engine_log: config.db_log_file().to_path_buf(),
            ping: config.db_ping_command(),
            ping_log: config.command_log_path("ping"),
            stop: config.db_stop_command(),
            stop_log: config.command_log_path("stop"),
            timeout_secs: config.command_timeout_secs(),
        }
    }

    fn recorded_pid(&self) -> Option<i32> {
        if !self.os.file_exists(self.pid_file.as_std_path()) {
            return None;
        }
        match self.os.read_file(self.pid_file.as_std_path()) {
            Ok(contents) => match contents.trim().parse::<i32>() {
                Ok(pid) if pid > 0 => Some(pid),
                _ => {
                    warn!(
                        target: DATABASE_TARGET,
                        pid_file = %self.pid_file,
                        contents = contents.trim(),
                        "ignoring malformed pid file"
                    );
                    None
                }
            },
            Err(error) => {
                warn!(
                    target: DATABASE_TARGET,
                    pid_file = %self.pid_file,
                    error = %error,
                    "failed to read pid file"
                );
                None
            }
        }
    }
}

impl DatabaseHelper for CommandDatabase {
    fn is_process_running(&self) -> bool {
        let Some(pid) = self.recorded_pid() else {
            return false;
        };
        match kill(Pid::from_raw(pid), None) {
            Ok(()) | Err(Errno::EPERM) => true,
            Err(Errno::ESRCH) => false,
            Err(errno) => {
                warn!(
                    target: DATABASE_TARGET,
                    pid,
                    error = %errno,
                    "failed to probe database process"
                );
                false
            }
        }
    }

    fn is_database_reachable(&self) -> bool {
        match self.os.run_command_with_timeout(
            self.timeout_secs,
            self.ping_log.as_std_path(),
            &self.ping.program,
            &self.ping.args,
        ) {
            Ok(()) => true,
            Err(error) => {
                debug!(
                    target: DATABASE_TARGET,
                    error = %error,
                    output = %self.ping_log,
                    "database probe failed"
                );
                false
            }
        }
    }

    fn start_in_join_mode(&self) -> Result<ManagedProcess, DatabaseError> {
        info!(
            target: DATABASE_TARGET,
            program = %self.daemon.program,
            args = ?self.daemon.args,
            log = %self.engine_log,
            "starting database in join mode"
        );
        self.os
            .start_command(
                self.engine_log.as_std_path(),
                &self.daemon.program,
                &self.daemon.args,
            )
            .map_err(|source| DatabaseError::Start { source })
    }

    fn stop(&self) -> Result<(), DatabaseError> {
        info!(
            target: DATABASE_TARGET,
            program = %self.stop.program,
            output = %self.stop_log,
            "stopping database"
        );
        self.os
            .run_command_with_timeout(
                self.timeout_secs,
                self.stop_log.as_std_path(),
                &self.stop.program,
                &self.stop.args,
            )
            .map_err(|source| DatabaseError::Stop { source })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use nodectl_os::SystemOsHelper;

    use super::*;

    struct Harness {
        dir: TempDir,
        config: Config,
    }

    impl Harness {
        fn database(&self) -> CommandDatabase {
            CommandDatabase::from_config(&self.config, Arc::new(SystemOsHelper::new()))
        }

        fn write_pid(&self, contents: &str) {
            fs::write(self.dir.path().join("engine.pid"), contents).expect("write pid file");
        }
    }

    fn utf8(dir: &TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("temp path is UTF-8")
    }

    #[fixture]
    fn harness() -> Harness {
        let dir = TempDir::new().expect("temp dir");
        let config = Config {
            db_pid_file: Some(utf8(&dir, "engine.pid")),
            db_log_file: Some(utf8(&dir, "engine.log")),
            command_log_dir: Some(utf8(&dir, "commands")),
            command_timeout_secs: Some(3),
            db_ping_command: Some("true".to_owned()),
            db_stop_command: Some("sh".to_owned()),
            db_stop_args: vec!["-c".to_owned(), "echo stopping; exit 1".to_owned()],
            db_daemon_path: Some("echo".to_owned()),
            db_join_args: vec!["--wsrep-new-cluster=off".to_owned()],
            ..Config::default()
        };
        Harness { dir, config }
    }

    #[rstest]
    fn missing_pid_file_means_not_running(harness: Harness) {
        assert!(!harness.database().is_process_running());
    }

    #[rstest]
    fn live_pid_means_running(harness: Harness) {
        harness.write_pid(&format!("{}\n", std::process::id()));
        assert!(harness.database().is_process_running());
    }

    #[rstest]
    fn malformed_pid_means_not_running(harness: Harness) {
        harness.write_pid("not-a-pid");
        assert!(!harness.database().is_process_running());
    }

    #[rstest]
    fn successful_probe_means_reachable(harness: Harness) {
        assert!(harness.database().is_database_reachable());
    }

    #[rstest]
    fn failing_probe_means_unreachable(mut harness: Harness) {
        harness.config.db_ping_command = Some("false".to_owned());
        assert!(!harness.database().is_database_reachable());
    }

    #[rstest]
    fn stop_failures_keep_the_command_output(harness: Harness) {
        let error = harness.database().stop().expect_err("stop should fail");
        assert!(matches!(error, DatabaseError::Stop { .. }));
        let output = fs::read_to_string(harness.dir.path().join("commands").join("stop.log"))
            .expect("stop output captured");
        assert_eq!(output, "stopping\n");
    }

    #[rstest]
    fn join_mode_start_appends_to_the_engine_log(harness: Harness) {
        let process = harness
            .database()
            .start_in_join_mode()
            .expect("engine starts");
        nodectl_os::wait_for_command(&process)
            .recv()
            .expect("waiter reports exit")
            .expect("echo succeeds");
        let log = fs::read_to_string(harness.dir.path().join("engine.log")).expect("engine log");
        assert_eq!(log, "--wsrep-new-cluster=off\n");
    }
}
