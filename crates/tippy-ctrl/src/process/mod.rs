//! Supervision of one external program.
//!
//! A [`ManagedProcess`] owns the child handle for one [`ProcessKind`] and the
//! relay threads that copy its output into the project's log stream.
//!
//! [`ProcessKind`]: tippy_config::ProcessKind

mod command;
mod lifecycle;
mod managed;
mod relay;

pub use command::ProcessCommand;
pub use managed::{ManagedProcess, StartOutcome};

/// Log target for process operations.
pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
