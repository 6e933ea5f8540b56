//! Operating system primitives for the `nodectl` controller.
//!
//! The crate provides the two process primitives the controller is built on:
//!
//! - [`run_command_with_timeout`] runs a probe or management command with its
//!   standard output and standard error captured to a file, killing it once a
//!   wall-clock budget is spent.
//! - [`wait_for_command`] observes an already started [`ManagedProcess`] on a
//!   background thread and reports its exit exactly once on a one-shot
//!   channel.
//!
//! [`OsHelper`] bundles these with the few filesystem operations the
//! controller needs so collaborators can be exercised against doubles.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use nodectl_os::run_command_with_timeout;
//!
//! let result = run_command_with_timeout(
//!     3,
//!     Path::new("/tmp/ping.log"),
//!     "mysqladmin",
//!     &["ping".to_owned()],
//! );
//! assert!(result.is_ok());
//! ```

mod error;
mod executor;
mod files;
mod helper;
mod managed;
mod waiter;

pub use self::error::CommandError;
pub use self::executor::{run_command_with_timeout, start_command};
pub use self::helper::{OsHelper, SystemOsHelper};
pub use self::managed::ManagedProcess;
pub use self::waiter::wait_for_command;
