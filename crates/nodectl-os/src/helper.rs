//! Injectable operating system surface used by the controller.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;

use crate::error::CommandError;
use crate::executor;
use crate::files;
use crate::managed::ManagedProcess;
use crate::waiter;

/// Filesystem, process and clock operations the controller depends on.
///
/// The production implementation is [`SystemOsHelper`]. Tests substitute
/// doubles to observe sleeps or to fake the state file.
pub trait OsHelper: Send + Sync {
    /// Whether a file exists at `path`.
    fn file_exists(&self, path: &Path) -> bool;

    /// Reads the whole file as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Replaces the file contents with `contents`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write_string_to_file(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Runs a command to completion under a timeout, capturing its output.
    ///
    /// # Errors
    ///
    /// See [`crate::run_command_with_timeout`].
    fn run_command_with_timeout(
        &self,
        timeout_secs: u64,
        output_path: &Path,
        program: &str,
        args: &[String],
    ) -> Result<(), CommandError>;

    /// Starts a long-running command with its output appended to a log.
    ///
    /// # Errors
    ///
    /// See [`crate::start_command`].
    fn start_command(
        &self,
        output_path: &Path,
        program: &str,
        args: &[String],
    ) -> Result<ManagedProcess, CommandError>;

    /// Reports the exit of an already started process on a one-shot channel.
    fn wait_for_command(&self, process: &ManagedProcess) -> Receiver<Result<(), CommandError>>;

    /// Blocks the calling thread.
    fn sleep(&self, duration: Duration);
}

/// [`OsHelper`] backed by the real filesystem, processes and clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOsHelper;

impl SystemOsHelper {
    /// Builds a new helper.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl OsHelper for SystemOsHelper {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_string_to_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        files::atomic_write(path, contents.as_bytes())
    }

    fn run_command_with_timeout(
        &self,
        timeout_secs: u64,
        output_path: &Path,
        program: &str,
        args: &[String],
    ) -> Result<(), CommandError> {
        executor::run_command_with_timeout(timeout_secs, output_path, program, args)
    }

    fn start_command(
        &self,
        output_path: &Path,
        program: &str,
        args: &[String],
    ) -> Result<ManagedProcess, CommandError> {
        executor::start_command(output_path, program, args)
    }

    fn wait_for_command(&self, process: &ManagedProcess) -> Receiver<Result<(), CommandError>> {
        waiter::wait_for_command(process)
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
