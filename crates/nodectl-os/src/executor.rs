//! Timeout-bounded command execution with output captured to a file.
//!
//! Both standard output and standard error of the child are redirected into
//! the same file so the interleaving seen by an operator matches what the
//! command printed. The file handles are moved into the [`Command`] and are
//! released when it goes out of scope, whichever way the call returns.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::CommandError;
use crate::managed::ManagedProcess;

const EXECUTOR_TARGET: &str = "nodectl_os::executor";

/// Interval between exit checks while a command runs.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How an output file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Truncate,
    Append,
}

/// Runs `program` with `args`, killing it once `timeout_secs` have elapsed.
///
/// The output file is created (or truncated) before the command starts, so it
/// exists after every call, including when the program cannot be spawned.
/// Partial output is left in place on failure.
///
/// # Errors
///
/// Returns [`CommandError::TimedOut`] when the deadline passes,
/// [`CommandError::Failed`] for a non-zero exit, and
/// [`CommandError::SpawnFailed`] or [`CommandError::OutputFile`] when the
/// command cannot be started.
pub fn run_command_with_timeout(
    timeout_secs: u64,
    output_path: &Path,
    program: &str,
    args: &[String],
) -> Result<(), CommandError> {
    let mut command = redirected_command(output_path, OutputMode::Truncate, program, args)?;

    debug!(
        target: EXECUTOR_TARGET,
        program,
        ?args,
        timeout_secs,
        output = %output_path.display(),
        "running command"
    );

    let mut child = command
        .spawn()
        .map_err(|source| CommandError::spawn(program, source))?;
    drop(command);

    wait_with_timeout(program, &mut child, timeout_secs)
}

/// Starts `program` with its output appended to `output_path` and returns
/// without waiting for it.
///
/// # Errors
///
/// Returns [`CommandError::SpawnFailed`] or [`CommandError::OutputFile`] when
/// the command cannot be started.
pub fn start_command(
    output_path: &Path,
    program: &str,
    args: &[String],
) -> Result<ManagedProcess, CommandError> {
    let mut command = redirected_command(output_path, OutputMode::Append, program, args)?;
    let child = command
        .spawn()
        .map_err(|source| CommandError::spawn(program, source))?;

    debug!(
        target: EXECUTOR_TARGET,
        program,
        ?args,
        pid = child.id(),
        output = %output_path.display(),
        "started command"
    );

    Ok(ManagedProcess::new(program, child))
}

fn redirected_command(
    output_path: &Path,
    mode: OutputMode,
    program: &str,
    args: &[String],
) -> Result<Command, CommandError> {
    let output_error = |source: io::Error| CommandError::OutputFile {
        path: output_path.to_path_buf(),
        source: Arc::new(source),
    };
    let stdout = open_output(output_path, mode).map_err(output_error)?;
    let stderr = stdout.try_clone().map_err(output_error)?;

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr);
    Ok(command)
}

fn open_output(path: &Path, mode: OutputMode) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        OutputMode::Truncate => options.write(true).truncate(true),
        OutputMode::Append => options.append(true),
    };
    options.open(path)
}

/// Polls the child until it exits or the timeout elapses.
fn wait_with_timeout(program: &str, child: &mut Child, timeout_secs: u64) -> Result<(), CommandError> {
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: EXECUTOR_TARGET, program, ?status, "command exited");
                if status.success() {
                    return Ok(());
                }
                return Err(CommandError::Failed {
                    program: program.to_owned(),
                    status,
                });
            }
            Ok(None) if Instant::now() >= deadline => {
                warn!(
                    target: EXECUTOR_TARGET,
                    program,
                    timeout_secs,
                    "command timed out, killing process"
                );
                drop(child.kill());
                drop(child.wait());
                return Err(CommandError::TimedOut {
                    program: program.to_owned(),
                    timeout_secs,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                drop(child.kill());
                drop(child.wait());
                return Err(CommandError::wait(program, source));
            }
        }
    }
}
