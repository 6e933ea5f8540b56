//! Background observation of a started process.

use std::sync::mpsc::{self, Receiver};
use std::thread;

use tracing::debug;

use crate::error::CommandError;
use crate::executor::POLL_INTERVAL;
use crate::managed::ManagedProcess;

const WAITER_TARGET: &str = "nodectl_os::waiter";

/// Watches `process` on a background thread and reports its exit once.
///
/// The receiver yields exactly one value: `Ok(())` for a zero exit status,
/// otherwise the error describing the failure. The channel has a single
/// buffered slot, so the waiter thread finishes even if nobody reads it.
#[must_use]
pub fn wait_for_command(process: &ManagedProcess) -> Receiver<Result<(), CommandError>> {
    let (sender, receiver) = mpsc::sync_channel(1);
    let process = process.clone();
    thread::spawn(move || {
        let outcome = wait_for_exit(&process);
        // The receiver may already be gone once a race has been decided.
        drop(sender.send(outcome));
    });
    receiver
}

fn wait_for_exit(process: &ManagedProcess) -> Result<(), CommandError> {
    loop {
        match process.try_wait() {
            Ok(Some(status)) => {
                debug!(
                    target: WAITER_TARGET,
                    program = process.program(),
                    pid = process.id(),
                    ?status,
                    "process exited"
                );
                if status.success() {
                    return Ok(());
                }
                return Err(CommandError::Failed {
                    program: process.program().to_owned(),
                    status,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => return Err(CommandError::wait(process.program(), source)),
        }
    }
}
