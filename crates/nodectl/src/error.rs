//! Errors surfaced by a controller invocation.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

use nodectl_os::CommandError;

use crate::database::DatabaseError;
use crate::upgrader::UpgradeError;

/// Failures that abort node startup or shutdown.
#[derive(Debug, Error)]
pub enum StartError {
    /// The configured topology lists no members.
    #[error("cluster_ips is empty; at least this node's address must be configured")]
    EmptyTopology,

    /// A state literal is not one of the recognised node states.
    #[error("unsupported state file contents: '{contents}'")]
    UnsupportedState {
        /// Trimmed contents that failed to parse.
        contents: String,
    },

    /// The state file exists but could not be read.
    #[error("failed to read state file {path}: {source}")]
    StateFileUnreadable {
        /// State file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The resolved state could not be persisted.
    #[error("failed to write state file {path}: {source}")]
    StateFileWrite {
        /// State file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The engine exited before it accepted connections.
    #[error("database process '{program}' stopped before becoming reachable; check {error_log}")]
    PrematureExit {
        /// Program that was started.
        program: String,
        /// Engine error log to inspect.
        error_log: Utf8PathBuf,
        /// Failure reported by the waiter, absent for a clean exit.
        #[source]
        source: Option<CommandError>,
    },

    /// A join-mode start was requested while a process is still tracked.
    #[error("database process {pid} was already started by this controller")]
    ProcessAlreadyStarted {
        /// Identifier of the tracked process.
        pid: u32,
    },

    /// The resolved state requires a process but none was started.
    #[error("database process has not been started")]
    ProcessNotStarted,

    /// The database collaborator failed.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The upgrade collaborator failed.
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),
}
