//! Test suites for the devnet process supervisor.

mod support;
#[cfg(unix)]
mod supervisor_behaviour;
