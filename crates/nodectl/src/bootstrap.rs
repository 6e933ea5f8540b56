//! Controller bootstrap: configuration, telemetry and collaborator wiring.

use std::sync::Arc;
use std::time::Duration;

use ortho_config::OrthoError;
use thiserror::Error;
use tracing::info;

use nodectl_config::Config;
use nodectl_os::{OsHelper, SystemOsHelper};

use crate::cluster_health::{ClusterHealthChecker, CommandHealthChecker};
use crate::database::{CommandDatabase, DatabaseHelper};
use crate::error::StartError;
use crate::node_starter::PreStarter;
use crate::start_manager::StartManager;
use crate::state::NodeState;
use crate::telemetry::{self, TelemetryError};
use crate::upgrader::{Upgrader, VersionFileUpgrader};

const BOOTSTRAP_TARGET: &str = "nodectl::bootstrap";

/// Source of the controller configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the controller configuration.
    ///
    /// # Errors
    ///
    /// Returns the aggregated configuration error.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning an already resolved configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced by a controller invocation.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Node startup failed.
    #[error("node startup failed: {source}")]
    Startup {
        /// Underlying startup error.
        #[source]
        source: StartError,
    },
}

/// Builds a [`StartManager`] backed by the production collaborators.
#[must_use]
pub fn start_manager(config: Config) -> StartManager {
    let os: Arc<dyn OsHelper> = Arc::new(SystemOsHelper::new());
    let database: Arc<dyn DatabaseHelper> =
        Arc::new(CommandDatabase::from_config(&config, Arc::clone(&os)));
    let health: Arc<dyn ClusterHealthChecker> =
        Arc::new(CommandHealthChecker::from_config(&config, Arc::clone(&os)));
    let upgrader: Arc<dyn Upgrader> =
        Arc::new(VersionFileUpgrader::from_config(&config, Arc::clone(&os)));
    let starter = PreStarter::new(
        Arc::clone(&database),
        Arc::clone(&os),
        health,
        Duration::from_secs(config.startup_poll_interval_secs()),
        config.db_log_file().to_path_buf(),
    );
    StartManager::new(config, os, database, upgrader, Box::new(starter))
}

/// Runs one controller invocation with configuration from `loader`.
///
/// # Errors
///
/// Returns an error when configuration or telemetry cannot be set up, or
/// when node startup fails.
pub fn run_with(loader: &dyn ConfigLoader) -> Result<NodeState, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    info!(
        target: BOOTSTRAP_TARGET,
        state_file = %config.state_file_location(),
        "controller starting"
    );

    let state = start_manager(config)
        .execute()
        .map_err(|source| BootstrapError::Startup { source })?;
    info!(target: BOOTSTRAP_TARGET, state = %state, "controller finished");
    Ok(state)
}
