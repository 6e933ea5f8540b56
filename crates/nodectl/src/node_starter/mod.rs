//! Node startup state machine.
//!
//! A [`Starter`] receives the classified [`NodeState`] and decides whether the
//! database engine must be started in join mode. When it is, the started
//! process is raced against a reachability poller: the engine either answers
//! its probe, after which the prestart instance is stopped again, or it exits
//! first and the attempt fails with [`StartError::PrematureExit`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camino::Utf8PathBuf;
use tracing::{debug, info, warn};

use nodectl_os::{CommandError, ManagedProcess, OsHelper};

use crate::cluster_health::ClusterHealthChecker;
use crate::database::DatabaseHelper;
use crate::error::StartError;
use crate::state::NodeState;

const STARTER_TARGET: &str = "nodectl::node_starter";

/// How long the race waits on the reachability signal before checking for an
/// exited process again.
const RACE_TICK: Duration = Duration::from_millis(50);

/// Starts the database engine according to a classified node state.
pub trait Starter: Send {
    /// Applies the transition for `state` and returns the resolved state.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine cannot be started, dies before it
    /// becomes reachable, or cannot be stopped after a successful prestart.
    fn start_node_from_state(&mut self, state: NodeState) -> Result<NodeState, StartError>;

    /// Process started during this invocation, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StartError::ProcessNotStarted`] when the resolved state was
    /// [`NodeState::Clustered`] but no process was started.
    fn managed_process(&self) -> Result<Option<&ManagedProcess>, StartError>;
}

/// [`Starter`] running a transient join-mode prestart of the engine.
pub struct PreStarter {
    database: Arc<dyn DatabaseHelper>,
    os: Arc<dyn OsHelper>,
    health: Arc<dyn ClusterHealthChecker>,
    poll_interval: Duration,
    error_log: Utf8PathBuf,
    process: Option<ManagedProcess>,
    resolved: Option<NodeState>,
}

enum RaceOutcome {
    Reachable,
    Exited(Option<CommandError>),
}

impl PreStarter {
    /// Creates a starter polling reachability every `poll_interval`.
    ///
    /// `error_log` is the engine log operators are pointed at when the engine
    /// dies during startup.
    #[must_use]
    pub fn new(
        database: Arc<dyn DatabaseHelper>,
        os: Arc<dyn OsHelper>,
        health: Arc<dyn ClusterHealthChecker>,
        poll_interval: Duration,
        error_log: Utf8PathBuf,
    ) -> Self {
        Self {
            database,
            os,
            health,
            poll_interval,
            error_log,
            process: None,
            resolved: None,
        }
    }

    fn prestart(&mut self) -> Result<(), StartError> {
        if let Some(existing) = &self.process {
            return Err(StartError::ProcessAlreadyStarted { pid: existing.id() });
        }

        let process = self.database.start_in_join_mode()?;
        info!(
            target: STARTER_TARGET,
            program = process.program(),
            pid = process.id(),
            "database started in join mode; waiting for it to become reachable"
        );
        self.process = Some(process.clone());

        let exited = self.os.wait_for_command(&process);
        let cancelled = Arc::new(AtomicBool::new(false));
        let (reachable, poller) = self.spawn_reachability_poller(Arc::clone(&cancelled));
        let outcome = race(&reachable, &exited);
        cancelled.store(true, Ordering::Release);
        // An in-flight reachability check finishes under its own timeout.
        if poller.join().is_err() {
            warn!(target: STARTER_TARGET, "reachability poller panicked");
        }

        match outcome {
            RaceOutcome::Reachable => {
                info!(
                    target: STARTER_TARGET,
                    pid = process.id(),
                    "database reachable; stopping prestart instance"
                );
                self.database.stop()?;
                Ok(())
            }
            RaceOutcome::Exited(source) => {
                warn!(
                    target: STARTER_TARGET,
                    program = process.program(),
                    error_log = %self.error_log,
                    "database process exited before becoming reachable"
                );
                Err(StartError::PrematureExit {
                    program: process.program().to_owned(),
                    error_log: self.error_log.clone(),
                    source,
                })
            }
        }
    }

    fn spawn_reachability_poller(
        &self,
        cancelled: Arc<AtomicBool>,
    ) -> (Receiver<()>, JoinHandle<()>) {
        let (sender, receiver) = mpsc::sync_channel(1);
        let database = Arc::clone(&self.database);
        let os = Arc::clone(&self.os);
        let interval = self.poll_interval;
        let poller = thread::spawn(move || {
            let mut attempt: u64 = 0;
            while !cancelled.load(Ordering::Acquire) {
                attempt += 1;
                if database.is_database_reachable() {
                    drop(sender.send(()));
                    return;
                }
                info!(
                    target: STARTER_TARGET,
                    attempt,
                    "database not reachable yet; retrying"
                );
                if cancelled.load(Ordering::Acquire) {
                    break;
                }
                os.sleep(interval);
            }
            debug!(target: STARTER_TARGET, attempt, "reachability poller cancelled");
        });
        (receiver, poller)
    }
}

/// Blocks until either the engine is reachable or its process has exited.
fn race(reachable: &Receiver<()>, exited: &Receiver<Result<(), CommandError>>) -> RaceOutcome {
    loop {
        match exited.try_recv() {
            Ok(result) => return RaceOutcome::Exited(result.err()),
            Err(TryRecvError::Disconnected) => return RaceOutcome::Exited(None),
            Err(TryRecvError::Empty) => {}
        }
        match reachable.recv_timeout(RACE_TICK) {
            // An exit that landed during the wait still wins.
            Ok(()) => {
                return match exited.try_recv() {
                    Ok(result) => RaceOutcome::Exited(result.err()),
                    Err(_) => RaceOutcome::Reachable,
                };
            }
            Err(RecvTimeoutError::Timeout) => {}
            // Only the exit branch can still resolve the race.
            Err(RecvTimeoutError::Disconnected) => {
                return RaceOutcome::Exited(exited.recv().ok().and_then(Result::err));
            }
        }
    }
}

impl Starter for PreStarter {
    fn start_node_from_state(&mut self, state: NodeState) -> Result<NodeState, StartError> {
        let resolved = match state {
            NodeState::SingleNode => {
                info!(target: STARTER_TARGET, "single node; no prestart required");
                NodeState::SingleNode
            }
            NodeState::NeedsBootstrap => {
                if self.health.healthy_cluster() {
                    info!(
                        target: STARTER_TARGET,
                        "healthy cluster found; joining instead of bootstrapping"
                    );
                    self.prestart()?;
                    NodeState::Clustered
                } else {
                    info!(
                        target: STARTER_TARGET,
                        "no healthy cluster found; bootstrap deferred"
                    );
                    NodeState::NeedsBootstrap
                }
            }
            NodeState::Clustered => {
                self.prestart()?;
                NodeState::Clustered
            }
        };
        self.resolved = Some(resolved);
        Ok(resolved)
    }

    fn managed_process(&self) -> Result<Option<&ManagedProcess>, StartError> {
        match (&self.process, self.resolved) {
            (Some(process), _) => Ok(Some(process)),
            (None, Some(NodeState::Clustered)) => Err(StartError::ProcessNotStarted),
            (None, _) => Ok(None),
        }
    }
}
