//! Test double for [`LifecycleReporter`] that records events for assertions.

use std::sync::Mutex;
use std::time::Duration;

use tippy_config::ProcessKind;

use crate::{LifecycleReporter, ProcessError, SupervisorState};

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    State(SupervisorState),
    Started(ProcessKind),
    AlreadyRunning(ProcessKind),
    Stopped(ProcessKind),
    Failed { kind: ProcessKind, message: String },
    NodeReady,
    NodeNotReady(String),
    PortsInUse(Vec<u16>),
    AdvancedMiningStarted(u64),
    AdvancedMiningStopped,
    BlockMined(String),
    MiningFailed(String),
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    /// Process kinds in the order they were stopped.
    pub fn stopped(&self) -> Vec<ProcessKind> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::Stopped(kind) => Some(kind),
                _ => None,
            })
            .collect()
    }

    /// Whether any recorded event satisfies `predicate`.
    pub fn any(&self, predicate: impl Fn(&LifecycleEvent) -> bool) -> bool {
        self.events().iter().any(predicate)
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn state_changed(&self, state: SupervisorState) {
        self.record(LifecycleEvent::State(state));
    }

    fn process_started(&self, kind: ProcessKind, _pid: u32) {
        self.record(LifecycleEvent::Started(kind));
    }

    fn process_already_running(&self, kind: ProcessKind, _pid: u32) {
        self.record(LifecycleEvent::AlreadyRunning(kind));
    }

    fn process_stopped(&self, kind: ProcessKind) {
        self.record(LifecycleEvent::Stopped(kind));
    }

    fn process_failed(&self, kind: ProcessKind, error: &ProcessError) {
        self.record(LifecycleEvent::Failed {
            kind,
            message: error.to_string(),
        });
    }

    fn node_ready(&self, _elapsed: Duration) {
        self.record(LifecycleEvent::NodeReady);
    }

    fn node_not_ready(&self, reason: &str) {
        self.record(LifecycleEvent::NodeNotReady(reason.to_owned()));
    }

    fn ports_in_use(&self, ports: &[u16]) {
        self.record(LifecycleEvent::PortsInUse(ports.to_vec()));
    }

    fn advanced_mining_started(&self, block_count: u64, _interval: Duration) {
        self.record(LifecycleEvent::AdvancedMiningStarted(block_count));
    }

    fn advanced_mining_stopped(&self) {
        self.record(LifecycleEvent::AdvancedMiningStopped);
    }

    fn block_mined(&self, hash: &str) {
        self.record(LifecycleEvent::BlockMined(hash.to_owned()));
    }

    fn mining_failed(&self, message: &str) {
        self.record(LifecycleEvent::MiningFailed(message.to_owned()));
    }
}
