//! `nodectl` entry point.

use std::io::{self, Write};
use std::process::ExitCode;

use nodectl::{BootstrapError, SystemConfigLoader, run_with};

fn main() -> ExitCode {
    match run_with(&SystemConfigLoader) {
        Ok(_) => ExitCode::SUCCESS,
        // Startup failures are already logged with their context.
        Err(BootstrapError::Startup { .. }) => ExitCode::FAILURE,
        Err(error) => {
            // Telemetry is not available yet, so report directly.
            drop(writeln!(io::stderr(), "nodectl: {error}"));
            ExitCode::FAILURE
        }
    }
}
