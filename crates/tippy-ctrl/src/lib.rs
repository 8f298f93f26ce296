//! Process supervision for a local Tippy devnet.
//!
//! A [`ProcessSupervisor`] runs one project's node, miner and indexer as
//! child processes. It relays their output into a tagged [`LogHub`], gates
//! mining operations on the chain type and node liveness, drives timed
//! block production through a [`MiningScheduler`], and audits the project's
//! ports before start.

mod error;
mod guard;
mod log;
mod ports;
mod process;
mod reporter;
mod scheduler;
mod supervisor;

pub use error::{ProcessError, SupervisorError};
pub use guard::{MiningOutcome, NotApplicable, mining_precondition};
pub use log::{LogHub, LogLine, LogSource, LogSubscription};
pub use ports::{PortAuditor, PortProbe, SystemPortProbe};
pub use process::{ManagedProcess, ProcessCommand, StartOutcome};
pub use reporter::{LifecycleReporter, StructuredLifecycleReporter};
pub use scheduler::MiningScheduler;
pub use supervisor::{ProcessSupervisor, SupervisorSettings, SupervisorState};

#[cfg(test)]
mod tests;
