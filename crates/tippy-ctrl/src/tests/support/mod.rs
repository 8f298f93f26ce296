//! Shared fixtures and doubles for the controller test suites.

mod probe;
mod project;
mod reporter;

pub use probe::{MockProbe, quiet_auditor};
pub use project::{Harness, TestProject, fast_settings, harness, sleeper, wait_until};
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
