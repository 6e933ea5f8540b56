//! Errors raised while running external commands.
//!
//! I/O errors are wrapped in `Arc` to keep the enum small enough for the
//! `result_large_err` lint.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;

use thiserror::Error;

/// Failure modes of a timeout-bounded or supervised command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The output file could not be created or opened.
    #[error("failed to open command output file {path:?}: {source}")]
    OutputFile {
        /// Output file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The command could not be started.
    #[error("failed to start '{program}': {source}")]
    SpawnFailed {
        /// Program that was launched.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The command outlived its timeout and was killed.
    #[error("command '{program}' timed out after {timeout_secs}s")]
    TimedOut {
        /// Program that was launched.
        program: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The command ran to completion with a non-zero status.
    #[error("command '{program}' failed with {status}")]
    Failed {
        /// Program that was launched.
        program: String,
        /// Exit status reported by the operating system.
        status: ExitStatus,
    },

    /// Waiting on the process failed.
    #[error("failed to wait for '{program}': {source}")]
    Wait {
        /// Program that was launched.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

impl CommandError {
    /// Whether the failure was caused by the timeout elapsing.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    pub(crate) fn spawn(program: &str, source: io::Error) -> Self {
        Self::SpawnFailed {
            program: program.to_owned(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn wait(program: &str, source: io::Error) -> Self {
        Self::Wait {
            program: program.to_owned(),
            source: Arc::new(source),
        }
    }
}
