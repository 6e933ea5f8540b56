//! Collaborator doubles shared by the unit tests.
//!
//! The doubles here are hand-written because they are shared with background
//! threads or hand out borrowed process handles; plain expectation mocks live
//! next to the tests that use them.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use nodectl_os::{CommandError, ManagedProcess, OsHelper, SystemOsHelper};

use crate::cluster_health::ClusterHealthChecker;
use crate::database::{DatabaseError, DatabaseHelper};
use crate::error::StartError;
use crate::node_starter::Starter;
use crate::state::NodeState;

/// Database double that spawns a real engine stand-in.
///
/// Reachability is scripted by the number of failed probes before success;
/// `stop` kills the most recently started stand-in.
pub(crate) struct FakeDatabase {
    dir: TempDir,
    program: String,
    args: Vec<String>,
    failed_probes: Option<usize>,
    check_delay: Option<Duration>,
    probes: AtomicUsize,
    in_flight: AtomicUsize,
    starts: AtomicUsize,
    stops: AtomicUsize,
    started: Mutex<Option<ManagedProcess>>,
}

impl FakeDatabase {
    /// Engine stand-in that never becomes reachable.
    pub(crate) fn spawning(program: &str, args: &[&str]) -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
            program: program.to_owned(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            failed_probes: None,
            check_delay: None,
            probes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            started: Mutex::new(None),
        }
    }

    /// Makes the engine reachable once `failed` probes have failed.
    pub(crate) fn reachable_after(mut self, failed: usize) -> Self {
        self.failed_probes = Some(failed);
        self
    }

    /// Makes every reachability check take `delay` before answering.
    pub(crate) fn slow_checks(mut self, delay: Duration) -> Self {
        self.check_delay = Some(delay);
        self
    }

    /// Reachability checks that have started but not yet answered.
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub(crate) fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl DatabaseHelper for FakeDatabase {
    fn is_process_running(&self) -> bool {
        false
    }

    fn is_database_reachable(&self) -> bool {
        let attempt = self.probes.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.check_delay {
            std::thread::sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.failed_probes.is_some_and(|failed| attempt >= failed)
    }

    fn start_in_join_mode(&self) -> Result<ManagedProcess, DatabaseError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let process = nodectl_os::start_command(
            &self.dir.path().join("engine.log"),
            &self.program,
            &self.args,
        )
        .map_err(|source| DatabaseError::Start { source })?;
        *self.started.lock().expect("started lock") = Some(process.clone());
        Ok(process)
    }

    fn stop(&self) -> Result<(), DatabaseError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(process) = self.started.lock().expect("started lock").take() {
            process.kill().expect("stand-in stops");
        }
        Ok(())
    }
}

/// Health checker with a fixed answer.
pub(crate) struct FixedHealth {
    healthy: bool,
    checks: AtomicUsize,
}

impl FixedHealth {
    pub(crate) fn new(healthy: bool) -> Self {
        Self {
            healthy,
            checks: AtomicUsize::new(0),
        }
    }

    pub(crate) fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl ClusterHealthChecker for FixedHealth {
    fn healthy_cluster(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.healthy
    }
}

/// System helper that records every requested sleep.
#[derive(Default)]
pub(crate) struct RecordingOs {
    inner: SystemOsHelper,
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingOs {
    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("sleeps lock").clone()
    }
}

impl OsHelper for RecordingOs {
    fn file_exists(&self, path: &Path) -> bool {
        self.inner.file_exists(path)
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.inner.read_file(path)
    }

    fn write_string_to_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.inner.write_string_to_file(path, contents)
    }

    fn run_command_with_timeout(
        &self,
        timeout_secs: u64,
        output_path: &Path,
        program: &str,
        args: &[String],
    ) -> Result<(), CommandError> {
        self.inner
            .run_command_with_timeout(timeout_secs, output_path, program, args)
    }

    fn start_command(
        &self,
        output_path: &Path,
        program: &str,
        args: &[String],
    ) -> Result<ManagedProcess, CommandError> {
        self.inner.start_command(output_path, program, args)
    }

    fn wait_for_command(&self, process: &ManagedProcess) -> Receiver<Result<(), CommandError>> {
        self.inner.wait_for_command(process)
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().expect("sleeps lock").push(duration);
        self.inner.sleep(duration);
    }
}

/// Scripted behaviour of a [`RecordingStarter`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum Script {
    /// Resolve to the classified state unchanged.
    Echo,
    /// Resolve to a fixed state.
    Resolve(NodeState),
    /// Fail as if the engine died during startup.
    PrematureExit,
}

/// Starter double recording every classified state it receives.
pub(crate) struct RecordingStarter {
    script: Script,
    received: Arc<Mutex<Vec<NodeState>>>,
}

impl RecordingStarter {
    pub(crate) fn new(script: Script) -> Self {
        Self {
            script,
            received: Arc::default(),
        }
    }

    /// Shared view of the received states, valid after the starter is moved.
    pub(crate) fn received(&self) -> Arc<Mutex<Vec<NodeState>>> {
        Arc::clone(&self.received)
    }
}

impl Starter for RecordingStarter {
    fn start_node_from_state(&mut self, state: NodeState) -> Result<NodeState, StartError> {
        self.received.lock().expect("received lock").push(state);
        match self.script {
            Script::Echo => Ok(state),
            Script::Resolve(resolved) => Ok(resolved),
            Script::PrematureExit => Err(StartError::PrematureExit {
                program: "mysqld_safe".to_owned(),
                error_log: "/var/log/mysql/mysql.err.log".into(),
                source: None,
            }),
        }
    }

    fn managed_process(&self) -> Result<Option<&ManagedProcess>, StartError> {
        Ok(None)
    }
}
