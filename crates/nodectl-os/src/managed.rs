//! Shared handle to a supervised child process.

use std::io;
use std::process::{Child, ExitStatus};
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle to a started process.
///
/// Clones share the same underlying [`Child`], so one clone can be observed
/// by a background waiter while another stays with its owner. The lock is
/// only held for the duration of a single non-blocking call.
#[derive(Debug, Clone)]
pub struct ManagedProcess {
    program: String,
    pid: u32,
    child: Arc<Mutex<Child>>,
}

impl ManagedProcess {
    /// Wraps a freshly spawned child.
    #[must_use]
    pub fn new(program: impl Into<String>, child: Child) -> Self {
        Self {
            program: program.into(),
            pid: child.id(),
            child: Arc::new(Mutex::new(child)),
        }
    }

    /// Program the process was started from.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Operating system process identifier.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.pid
    }

    /// Reports the exit status if the process has terminated.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be collected.
    pub fn try_wait(&self) -> io::Result<Option<ExitStatus>> {
        self.lock()?.try_wait()
    }

    /// Sends `SIGKILL` and reaps the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal cannot be delivered or the process
    /// cannot be reaped.
    pub fn kill(&self) -> io::Result<()> {
        let mut child = self.lock()?;
        child.kill()?;
        child.wait().map(drop)
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Child>> {
        self.child
            .lock()
            .map_err(|_| io::Error::other("process handle lock poisoned"))
    }
}
