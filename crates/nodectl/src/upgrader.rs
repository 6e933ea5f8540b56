//! Data directory upgrade collaborator.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::info;

use nodectl_config::{CommandLine, Config};
use nodectl_os::{CommandError, OsHelper};

const UPGRADE_TARGET: &str = "nodectl::upgrader";

/// Errors raised while detecting or running an upgrade.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// An upgrade was requested without a version marker to record it in.
    #[error("package_version is set but version_file is not configured")]
    MissingVersionFile,

    /// The recorded data version could not be read.
    #[error("failed to read data version from {path}: {source}")]
    ReadVersion {
        /// Version marker path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The upgrade command failed.
    #[error("upgrade command failed: {source}")]
    Command {
        /// Underlying command failure.
        #[source]
        source: CommandError,
    },

    /// The new data version could not be recorded.
    #[error("failed to record data version in {path}: {source}")]
    RecordVersion {
        /// Version marker path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Detects and performs schema or data directory upgrades.
pub trait Upgrader: Send + Sync {
    /// Whether the data directory must be upgraded before startup.
    ///
    /// # Errors
    ///
    /// Returns an error when the upgrade status cannot be determined.
    fn needs_upgrade(&self) -> Result<bool, UpgradeError>;

    /// Upgrades the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the upgrade does not complete.
    fn upgrade(&self) -> Result<(), UpgradeError>;
}

/// [`Upgrader`] comparing a recorded data version with the package version.
///
/// Without a configured package version no upgrade is ever needed. An absent
/// version marker counts as out of date.
pub struct VersionFileUpgrader {
    os: Arc<dyn OsHelper>,
    package_version: Option<String>,
    version_file: Option<Utf8PathBuf>,
    command: Option<CommandLine>,
    output: Utf8PathBuf,
    timeout_secs: u64,
}

impl VersionFileUpgrader {
    /// Builds the upgrader from configuration.
    #[must_use]
    pub fn from_config(config: &Config, os: Arc<dyn OsHelper>) -> Self {
        Self {
            os,
            package_version: config.package_version.clone(),
            version_file: config.version_file.clone(),
            command: config.upgrade_command(),
            output: config.command_log_path("upgrade"),
            timeout_secs: config.command_timeout_secs(),
        }
    }

    fn version_file(&self) -> Result<&Utf8PathBuf, UpgradeError> {
        self.version_file
            .as_ref()
            .ok_or(UpgradeError::MissingVersionFile)
    }
}

impl Upgrader for VersionFileUpgrader {
    fn needs_upgrade(&self) -> Result<bool, UpgradeError> {
        let Some(package_version) = self.package_version.as_deref() else {
            return Ok(false);
        };
        let path = self.version_file()?;
        if !self.os.file_exists(path.as_std_path()) {
            info!(
                target: UPGRADE_TARGET,
                version_file = %path,
                package_version,
                "no recorded data version"
            );
            return Ok(true);
        }
        let contents = self
            .os
            .read_file(path.as_std_path())
            .map_err(|source| UpgradeError::ReadVersion {
                path: path.clone(),
                source: Arc::new(source),
            })?;
        let recorded = contents.trim();
        info!(
            target: UPGRADE_TARGET,
            recorded,
            package_version,
            "compared data version with package version"
        );
        Ok(recorded != package_version)
    }

    fn upgrade(&self) -> Result<(), UpgradeError> {
        let path = self.version_file()?;
        if let Some(command) = &self.command {
            info!(
                target: UPGRADE_TARGET,
                program = %command.program,
                output = %self.output,
                "running data directory upgrade"
            );
            self.os
                .run_command_with_timeout(
                    self.timeout_secs,
                    self.output.as_std_path(),
                    &command.program,
                    &command.args,
                )
                .map_err(|source| UpgradeError::Command { source })?;
        }
        let version = self.package_version.as_deref().unwrap_or_default();
        self.os
            .write_string_to_file(path.as_std_path(), version)
            .map_err(|source| UpgradeError::RecordVersion {
                path: path.clone(),
                source: Arc::new(source),
            })
    }
}
