//! Structured reporting for supervisor lifecycle events.

use std::sync::Arc;
use std::time::Duration;

use tippy_config::ProcessKind;

use crate::error::ProcessError;
use crate::supervisor::SupervisorState;

const REPORTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// Observer trait used to surface supervisor events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// The supervisor moved to `state`.
    fn state_changed(&self, state: SupervisorState);

    /// A process was spawned.
    fn process_started(&self, kind: ProcessKind, pid: u32);

    /// A start was requested for a process that was already running.
    fn process_already_running(&self, kind: ProcessKind, pid: u32);

    /// A running process was stopped.
    fn process_stopped(&self, kind: ProcessKind);

    /// Starting or stopping a process failed.
    fn process_failed(&self, kind: ProcessKind, error: &ProcessError);

    /// The node answered its first RPC call after `elapsed`.
    fn node_ready(&self, elapsed: Duration);

    /// The node did not become ready; `reason` says why.
    fn node_not_ready(&self, reason: &str);

    /// Some of the project's ports were already taken before start.
    fn ports_in_use(&self, ports: &[u16]);

    /// Advanced mining began.
    fn advanced_mining_started(&self, block_count: u64, interval: Duration);

    /// Advanced mining was cancelled before it finished.
    fn advanced_mining_stopped(&self);

    /// A block was mined.
    fn block_mined(&self, hash: &str);

    /// Mining a block failed.
    fn mining_failed(&self, message: &str);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn state_changed(&self, state: SupervisorState) {
        (**self).state_changed(state);
    }

    fn process_started(&self, kind: ProcessKind, pid: u32) {
        (**self).process_started(kind, pid);
    }

    fn process_already_running(&self, kind: ProcessKind, pid: u32) {
        (**self).process_already_running(kind, pid);
    }

    fn process_stopped(&self, kind: ProcessKind) {
        (**self).process_stopped(kind);
    }

    fn process_failed(&self, kind: ProcessKind, error: &ProcessError) {
        (**self).process_failed(kind, error);
    }

    fn node_ready(&self, elapsed: Duration) {
        (**self).node_ready(elapsed);
    }

    fn node_not_ready(&self, reason: &str) {
        (**self).node_not_ready(reason);
    }

    fn ports_in_use(&self, ports: &[u16]) {
        (**self).ports_in_use(ports);
    }

    fn advanced_mining_started(&self, block_count: u64, interval: Duration) {
        (**self).advanced_mining_started(block_count, interval);
    }

    fn advanced_mining_stopped(&self) {
        (**self).advanced_mining_stopped();
    }

    fn block_mined(&self, hash: &str) {
        (**self).block_mined(hash);
    }

    fn mining_failed(&self, message: &str) {
        (**self).mining_failed(message);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn state_changed(&self, state: SupervisorState) {
        tracing::debug!(
            target: REPORTER_TARGET,
            event = "state_changed",
            state = ?state,
            "supervisor state changed"
        );
    }

    fn process_started(&self, kind: ProcessKind, pid: u32) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "process_started",
            process = %kind,
            pid,
            "process started"
        );
    }

    fn process_already_running(&self, kind: ProcessKind, pid: u32) {
        tracing::debug!(
            target: REPORTER_TARGET,
            event = "process_already_running",
            process = %kind,
            pid,
            "process already running"
        );
    }

    fn process_stopped(&self, kind: ProcessKind) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "process_stopped",
            process = %kind,
            "process stopped"
        );
    }

    fn process_failed(&self, kind: ProcessKind, error: &ProcessError) {
        tracing::error!(
            target: REPORTER_TARGET,
            event = "process_failed",
            process = %kind,
            error = %error,
            "process operation failed"
        );
    }

    fn node_ready(&self, elapsed: Duration) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "node_ready",
            elapsed_ms = elapsed.as_millis(),
            "node is answering RPC"
        );
    }

    fn node_not_ready(&self, reason: &str) {
        tracing::warn!(
            target: REPORTER_TARGET,
            event = "node_not_ready",
            reason,
            "node did not become ready"
        );
    }

    fn ports_in_use(&self, ports: &[u16]) {
        tracing::warn!(
            target: REPORTER_TARGET,
            event = "ports_in_use",
            ports = ?ports,
            "project ports already in use"
        );
    }

    fn advanced_mining_started(&self, block_count: u64, interval: Duration) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "advanced_mining_started",
            block_count,
            interval_ms = interval.as_millis(),
            "advanced mining started"
        );
    }

    fn advanced_mining_stopped(&self) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "advanced_mining_stopped",
            "advanced mining stopped"
        );
    }

    fn block_mined(&self, hash: &str) {
        tracing::info!(
            target: REPORTER_TARGET,
            event = "block_mined",
            hash,
            "block mined"
        );
    }

    fn mining_failed(&self, message: &str) {
        tracing::warn!(
            target: REPORTER_TARGET,
            event = "mining_failed",
            message,
            "block generation failed"
        );
    }
}
