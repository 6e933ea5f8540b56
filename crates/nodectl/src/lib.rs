//! Startup controller for one node of a replicated database cluster.
//!
//! Every invocation decides whether the node runs standalone, must bootstrap
//! a new cluster, or joins an existing one, and persists that decision in a
//! state file for the next invocation:
//!
//! - [`StartManager`] stops a stale engine, applies pending upgrades,
//!   classifies the node into a [`NodeState`] and persists the result.
//! - [`PreStarter`] starts the engine in join mode when the state calls for
//!   it and races reachability against the engine's exit.
//! - [`DatabaseHelper`], [`ClusterHealthChecker`] and [`Upgrader`] are the
//!   collaborator seams; the `Command*` and [`VersionFileUpgrader`] types are
//!   their production implementations.
//!
//! [`run_with`] wires everything from configuration and is what the `nodectl`
//! binary runs.

mod bootstrap;
mod cluster_health;
mod database;
mod error;
mod node_starter;
mod start_manager;
mod state;
mod telemetry;
mod upgrader;

#[cfg(test)]
mod test_support;

pub use bootstrap::{
    BootstrapError, ConfigLoader, StaticConfigLoader, SystemConfigLoader, run_with, start_manager,
};
pub use cluster_health::{ClusterHealthChecker, CommandHealthChecker};
pub use database::{CommandDatabase, DatabaseError, DatabaseHelper};
pub use error::StartError;
pub use node_starter::{PreStarter, Starter};
pub use start_manager::StartManager;
pub use state::NodeState;
pub use telemetry::{TelemetryError, initialise as initialise_telemetry};
pub use upgrader::{UpgradeError, Upgrader, VersionFileUpgrader};
