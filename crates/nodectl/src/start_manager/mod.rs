//! Top-level startup orchestration.
//!
//! [`StartManager::execute`] runs once per controller invocation. It stops a
//! stale engine, applies any pending upgrade, classifies the node from the
//! topology and the persisted state file, delegates to a [`Starter`] and
//! finally persists the resolved state. Every step fails fast; the state file
//! is only written after a successful start.

use std::sync::Arc;

use tracing::{error, info};

use nodectl_config::Config;
use nodectl_os::{ManagedProcess, OsHelper};

use crate::database::DatabaseHelper;
use crate::error::StartError;
use crate::node_starter::Starter;
use crate::state::NodeState;
use crate::upgrader::Upgrader;

const MANAGER_TARGET: &str = "nodectl::start_manager";

/// Drives a single controller invocation.
pub struct StartManager {
    config: Config,
    os: Arc<dyn OsHelper>,
    database: Arc<dyn DatabaseHelper>,
    upgrader: Arc<dyn Upgrader>,
    starter: Box<dyn Starter>,
    classified: Option<NodeState>,
}

impl StartManager {
    /// Wires the manager to its collaborators.
    #[must_use]
    pub fn new(
        config: Config,
        os: Arc<dyn OsHelper>,
        database: Arc<dyn DatabaseHelper>,
        upgrader: Arc<dyn Upgrader>,
        starter: Box<dyn Starter>,
    ) -> Self {
        Self {
            config,
            os,
            database,
            upgrader,
            starter,
            classified: None,
        }
    }

    /// Resolves and persists the node state.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any step. Nothing is persisted when
    /// an error is returned.
    pub fn execute(&mut self) -> Result<NodeState, StartError> {
        let result = self.run();
        if let Err(failure) = &result {
            error!(
                target: MANAGER_TARGET,
                cluster_ips = ?self.config.cluster_ips,
                my_ip = %self.config.my_ip,
                from_state = ?self.classified,
                error = %failure,
                "node startup failed"
            );
        }
        result
    }

    /// Process started by the delegated starter.
    ///
    /// # Errors
    ///
    /// See [`Starter::managed_process`].
    pub fn managed_process(&self) -> Result<Option<&ManagedProcess>, StartError> {
        self.starter.managed_process()
    }

    /// Performs an orderly shutdown of the database engine.
    ///
    /// # Errors
    ///
    /// Returns [`StartError::Database`] when the stop command fails.
    pub fn shutdown(&self) -> Result<(), StartError> {
        info!(target: MANAGER_TARGET, "shutting down database");
        self.database.stop()?;
        Ok(())
    }

    fn run(&mut self) -> Result<NodeState, StartError> {
        if self.config.cluster_ips.is_empty() {
            return Err(StartError::EmptyTopology);
        }

        if self.database.is_process_running() {
            info!(
                target: MANAGER_TARGET,
                "database process already running; stopping it first"
            );
            self.shutdown()?;
        }

        if self.upgrader.needs_upgrade()? {
            info!(target: MANAGER_TARGET, "upgrade required");
            self.upgrader.upgrade()?;
        }

        let topology = self.config.topology();
        info!(
            target: MANAGER_TARGET,
            cluster_ips = ?topology.members(),
            my_ip = topology.own_address(),
            "determining bootstrap procedure"
        );
        let state = self.current_state()?;
        self.classified = Some(state);

        let resolved = self.starter.start_node_from_state(state)?;
        info!(
            target: MANAGER_TARGET,
            from_state = %state,
            to_state = %resolved,
            "node state resolved"
        );
        self.persist(resolved)?;
        Ok(resolved)
    }

    fn current_state(&self) -> Result<NodeState, StartError> {
        let topology = self.config.topology();
        if topology.is_single_node() {
            return Ok(NodeState::SingleNode);
        }

        let path = self.config.state_file_location();
        if !self.os.file_exists(path.as_std_path()) {
            info!(
                target: MANAGER_TARGET,
                state_file = %path,
                seed = topology.is_seed(),
                "no state file; treating as first deploy"
            );
            return Ok(if topology.is_seed() {
                NodeState::NeedsBootstrap
            } else {
                NodeState::Clustered
            });
        }

        let contents = self
            .os
            .read_file(path.as_std_path())
            .map_err(|source| StartError::StateFileUnreadable {
                path: path.clone(),
                source: Arc::new(source),
            })?;
        info!(
            target: MANAGER_TARGET,
            state_file = %path,
            contents = contents.trim(),
            "read persisted node state"
        );
        match NodeState::from_persisted(&contents)? {
            NodeState::SingleNode => {
                info!(
                    target: MANAGER_TARGET,
                    members = topology.members().len(),
                    "topology grew beyond a single node; bootstrap required"
                );
                Ok(NodeState::NeedsBootstrap)
            }
            persisted => Ok(persisted),
        }
    }

    fn persist(&self, state: NodeState) -> Result<(), StartError> {
        let path = self.config.state_file_location();
        self.os
            .write_string_to_file(path.as_std_path(), state.as_str())
            .map_err(|source| StartError::StateFileWrite {
                path,
                source: Arc::new(source),
            })
    }
}
