//! The per-project process supervisor.
//!
//! [`ProcessSupervisor`] owns at most one [`ManagedProcess`] of each kind and
//! at most one [`MiningScheduler`]. Control operations take `&mut self` and
//! run to completion on the caller's thread. Mining operations are guarded by
//! [`mining_precondition`] and report typed [`MiningOutcome`]s.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use tippy_config::{
    Config, DEFAULT_LOG_BUFFER, DEFAULT_READY_POLL_MS, DEFAULT_READY_TIMEOUT_MS,
    DEFAULT_STOP_GRACE_MS, ProcessKind, ProjectRuntimeConfig,
};
use tippy_rpc::{ChainRpc, PageQuery, RpcClient, RpcError, TransactionPage, TransactionPaginator};
use tracing::{debug, warn};

use crate::error::{ProcessError, SupervisorError};
use crate::guard::{MiningOutcome, NotApplicable, mining_precondition};
use crate::log::{LogHub, LogSubscription};
use crate::ports::PortAuditor;
use crate::process::{ManagedProcess, ProcessCommand, StartOutcome};
use crate::reporter::{LifecycleReporter, StructuredLifecycleReporter};
use crate::scheduler::{MiningScheduler, mine_block};

const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// Coarse lifecycle state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    /// No node is running.
    Stopped,
    /// Processes are being launched.
    Starting,
    /// The node is running.
    Running,
    /// Processes are being shut down.
    Stopping,
}

/// Timing and buffering knobs for a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Upper bound on the wait for the node's first RPC answer.
    pub ready_timeout: Duration,
    /// Interval between readiness probes.
    pub ready_poll_interval: Duration,
    /// Grace period between SIGTERM and SIGKILL.
    pub stop_grace: Duration,
    /// Lines buffered per log subscriber.
    pub log_buffer: usize,
}

impl SupervisorSettings {
    /// Extracts the supervisor's settings from loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            ready_timeout: config.ready_timeout(),
            ready_poll_interval: config.ready_poll_interval(),
            stop_grace: config.stop_grace(),
            log_buffer: config.log_buffer,
        }
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_millis(DEFAULT_READY_TIMEOUT_MS),
            ready_poll_interval: Duration::from_millis(DEFAULT_READY_POLL_MS),
            stop_grace: Duration::from_millis(DEFAULT_STOP_GRACE_MS),
            log_buffer: DEFAULT_LOG_BUFFER,
        }
    }
}

/// Lifecycle owner for one project's node, miner and indexer.
///
/// Dropping the supervisor stops everything it started.
pub struct ProcessSupervisor {
    project: ProjectRuntimeConfig,
    settings: SupervisorSettings,
    rpc: Arc<dyn ChainRpc>,
    auditor: PortAuditor,
    hub: Arc<LogHub>,
    reporter: Arc<dyn LifecycleReporter>,
    phase: SupervisorState,
    node: Option<ManagedProcess>,
    miner: Option<ManagedProcess>,
    indexer: Option<ManagedProcess>,
    scheduler: Option<MiningScheduler>,
}

impl ProcessSupervisor {
    /// Creates a supervisor for `project` talking to the node through `rpc`.
    #[must_use]
    pub fn new(
        project: ProjectRuntimeConfig,
        settings: SupervisorSettings,
        rpc: Arc<dyn ChainRpc>,
    ) -> Self {
        Self {
            project,
            hub: Arc::new(LogHub::new(settings.log_buffer)),
            settings,
            rpc,
            auditor: PortAuditor::system(),
            reporter: Arc::new(StructuredLifecycleReporter::new()),
            phase: SupervisorState::Stopped,
            node: None,
            miner: None,
            indexer: None,
            scheduler: None,
        }
    }

    /// Creates a supervisor from loaded configuration with an HTTP RPC client.
    pub fn from_config(config: &Config) -> Result<Self, SupervisorError> {
        let rpc = RpcClient::for_port(config.node_rpc_port, config.rpc_timeout())?;
        Ok(Self::new(
            config.project(),
            SupervisorSettings::from_config(config),
            Arc::new(rpc),
        ))
    }

    /// Replaces the lifecycle reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn LifecycleReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replaces the port auditor.
    #[must_use]
    pub fn with_port_auditor(mut self, auditor: PortAuditor) -> Self {
        self.auditor = auditor;
        self
    }

    /// The project being supervised.
    #[must_use]
    pub const fn project(&self) -> &ProjectRuntimeConfig {
        &self.project
    }

    /// Starts the node, waits for it to answer RPC, then starts the indexer.
    ///
    /// The miner is never started here. Processes that are already running
    /// are left alone.
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        self.set_phase(SupervisorState::Starting);
        self.hub.control("Starting child processes...");
        if !self.is_running() {
            let busy = self.ports_in_use();
            if !busy.is_empty() {
                self.reporter.ports_in_use(&busy);
                self.hub.control(format!("Ports already in use: {}", join_ports(&busy)));
            }
        }

        let result = self.start_stack();
        self.settle_phase();
        if result.is_ok() {
            self.hub.control("Child processes started");
        }
        result
    }

    fn start_stack(&mut self) -> Result<(), SupervisorError> {
        if let StartOutcome::Started { .. } = self.start_process(ProcessKind::Node)? {
            self.wait_for_node_ready();
        }
        self.start_process(ProcessKind::Indexer)?;
        Ok(())
    }

    /// Stops the scheduler, then the miner, the indexer and the node.
    ///
    /// Every step is attempted; the first failure is returned.
    pub fn stop(&mut self) -> Result<(), SupervisorError> {
        self.set_phase(SupervisorState::Stopping);
        self.hub.control("Stopping child processes...");
        let mut first_error = self.stop_advanced_mining().err();
        for kind in [ProcessKind::Miner, ProcessKind::Indexer, ProcessKind::Node] {
            if let Err(error) = self.stop_process(kind) {
                self.reporter.process_failed(kind, &error);
                first_error.get_or_insert(error.into());
            }
        }
        self.settle_phase();
        match first_error {
            Some(error) => Err(error),
            None => {
                self.hub.control("Child processes stopped");
                Ok(())
            }
        }
    }

    /// Stops then starts the project.
    pub fn restart(&mut self) -> Result<(), SupervisorError> {
        self.stop()?;
        self.start()
    }

    /// Starts the continuous miner.
    pub fn start_miner(&mut self) -> Result<MiningOutcome, SupervisorError> {
        if let Err(reason) = self.mining_guard() {
            return Ok(reason.into());
        }
        Ok(match self.start_process(ProcessKind::Miner)? {
            StartOutcome::Started { .. } => MiningOutcome::Started,
            StartOutcome::AlreadyRunning { .. } => MiningOutcome::AlreadyActive,
        })
    }

    /// Stops the continuous miner. Returns whether it was running.
    pub fn stop_miner(&mut self) -> Result<bool, SupervisorError> {
        self.stop_process(ProcessKind::Miner).map_err(|error| {
            self.reporter.process_failed(ProcessKind::Miner, &error);
            error.into()
        })
    }

    /// Asks the node for a single block.
    #[must_use]
    pub fn mine_one_block(&self) -> MiningOutcome {
        if let Err(reason) = self.mining_guard() {
            return reason.into();
        }
        mine_block(self.rpc.as_ref(), &self.hub, self.reporter.as_ref())
    }

    /// Mines `block_count` blocks, one every `interval`, on a worker thread.
    pub fn start_advanced_mining(
        &mut self,
        block_count: u64,
        interval: Duration,
    ) -> Result<MiningOutcome, SupervisorError> {
        if let Err(reason) = self.mining_guard() {
            return Ok(reason.into());
        }
        let Some(count) = NonZeroU64::new(block_count) else {
            return Ok(NotApplicable::ZeroBlocks.into());
        };
        if self.is_advanced_mining() {
            return Ok(MiningOutcome::AlreadyActive);
        }
        if let Some(finished) = self.scheduler.take() {
            finished.join()?;
        }

        let scheduler = MiningScheduler::spawn(
            count,
            interval,
            Arc::clone(&self.rpc),
            Arc::clone(&self.hub),
            Arc::clone(&self.reporter),
        )?;
        self.scheduler = Some(scheduler);
        self.reporter.advanced_mining_started(block_count, interval);
        self.hub.control(format!(
            "Advanced mining started: {block_count} blocks every {}ms",
            interval.as_millis()
        ));
        Ok(MiningOutcome::Started)
    }

    /// Cancels advanced mining. Returns whether a run was in progress.
    pub fn stop_advanced_mining(&mut self) -> Result<bool, SupervisorError> {
        let Some(scheduler) = self.scheduler.take() else {
            return Ok(false);
        };
        let was_active = scheduler.is_active();
        scheduler.cancel()?;
        if was_active {
            self.reporter.advanced_mining_stopped();
            self.hub.control("Advanced mining stopped");
        }
        Ok(was_active)
    }

    /// The project's ports that something is already listening on.
    #[must_use]
    pub fn ports_in_use(&self) -> Vec<u16> {
        self.auditor.ports_in_use(&self.project.ports())
    }

    /// Deletes the node's data directory and recreates it empty.
    ///
    /// # Panics
    ///
    /// Panics if the node is running.
    #[expect(
        clippy::panic_in_result_fn,
        reason = "resetting a live node's data is caller misuse"
    )]
    pub fn reset_data(&mut self) -> Result<(), SupervisorError> {
        assert!(
            !self.is_running(),
            "reset_data called while the node is running"
        );
        self.ensure_process(ProcessKind::Node).reset_data()?;
        self.hub.control("Node data reset");
        Ok(())
    }

    /// Subscribes to the merged, tagged log stream.
    #[must_use]
    pub fn subscribe_logs(&self) -> LogSubscription {
        self.hub.subscribe()
    }

    /// A page of user transactions, or `None` while the node is stopped.
    pub fn transactions(&self, query: PageQuery) -> Result<Option<TransactionPage>, RpcError> {
        if !self.is_running() {
            return Ok(None);
        }
        TransactionPaginator::new(self.rpc.as_ref())
            .page(query)
            .map(Some)
    }

    /// Whether the node is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_process_running(ProcessKind::Node)
    }

    /// Whether the continuous miner is running.
    #[must_use]
    pub fn is_miner_running(&self) -> bool {
        self.is_process_running(ProcessKind::Miner)
    }

    /// Whether the indexer is running.
    #[must_use]
    pub fn is_indexer_running(&self) -> bool {
        self.is_process_running(ProcessKind::Indexer)
    }

    /// Whether advanced mining is producing blocks.
    #[must_use]
    pub fn is_advanced_mining(&self) -> bool {
        self.scheduler
            .as_ref()
            .is_some_and(MiningScheduler::is_active)
    }

    /// Whether a mining operation could start right now: the mining guard
    /// passes and neither the miner nor a scheduler is active.
    #[must_use]
    pub fn can_start_mining(&self) -> bool {
        self.mining_guard().is_ok() && !(self.is_miner_running() || self.is_advanced_mining())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SupervisorState {
        match self.phase {
            SupervisorState::Starting | SupervisorState::Stopping => self.phase,
            SupervisorState::Running | SupervisorState::Stopped => self.observed_state(),
        }
    }

    /// OS process id of `kind` while running.
    #[must_use]
    pub fn pid(&self, kind: ProcessKind) -> Option<u32> {
        self.process(kind).and_then(ManagedProcess::pid)
    }

    /// Directory where the node writes its own log files.
    #[must_use]
    pub fn log_folder(&self) -> Utf8PathBuf {
        self.project.log_folder()
    }

    fn mining_guard(&self) -> Result<(), NotApplicable> {
        mining_precondition(self.project.chain, self.is_running())
    }

    fn wait_for_node_ready(&self) {
        let started = Instant::now();
        loop {
            if !self.is_running() {
                self.report_not_ready("the node exited before answering RPC".to_owned());
                return;
            }
            match self.rpc.tip_block_number() {
                Ok(tip) => {
                    debug!(target: SUPERVISOR_TARGET, tip, "node answered readiness probe");
                    self.reporter.node_ready(started.elapsed());
                    return;
                }
                Err(error) => {
                    let elapsed = started.elapsed();
                    if elapsed >= self.settings.ready_timeout {
                        self.report_not_ready(format!(
                            "no RPC answer within {}ms: {error}",
                            self.settings.ready_timeout.as_millis()
                        ));
                        return;
                    }
                    let remaining = self.settings.ready_timeout.saturating_sub(elapsed);
                    thread::sleep(self.settings.ready_poll_interval.min(remaining));
                }
            }
        }
    }

    fn report_not_ready(&self, reason: String) {
        warn!(target: SUPERVISOR_TARGET, %reason, "continuing start without a ready node");
        self.reporter.node_not_ready(&reason);
        self.hub.control(format!("Node not ready: {reason}"));
    }

    fn start_process(&mut self, kind: ProcessKind) -> Result<StartOutcome, SupervisorError> {
        let reporter = Arc::clone(&self.reporter);
        let hub = Arc::clone(&self.hub);
        match self.ensure_process(kind).start() {
            Ok(outcome @ StartOutcome::Started { pid }) => {
                reporter.process_started(kind, pid);
                hub.control(format!("Started {kind} (pid {pid})"));
                Ok(outcome)
            }
            Ok(outcome @ StartOutcome::AlreadyRunning { pid }) => {
                reporter.process_already_running(kind, pid);
                Ok(outcome)
            }
            Err(error) => {
                reporter.process_failed(kind, &error);
                hub.control(format!("Failed to start {kind}: {error}"));
                Err(error.into())
            }
        }
    }

    fn stop_process(&self, kind: ProcessKind) -> Result<bool, ProcessError> {
        let Some(process) = self.process(kind) else {
            return Ok(false);
        };
        let stopped = process.stop()?;
        if stopped {
            self.reporter.process_stopped(kind);
            self.hub.control(format!("Stopped {kind}"));
        }
        Ok(stopped)
    }

    fn is_process_running(&self, kind: ProcessKind) -> bool {
        self.process(kind).is_some_and(ManagedProcess::is_running)
    }

    const fn process(&self, kind: ProcessKind) -> Option<&ManagedProcess> {
        match kind {
            ProcessKind::Node => self.node.as_ref(),
            ProcessKind::Miner => self.miner.as_ref(),
            ProcessKind::Indexer => self.indexer.as_ref(),
        }
    }

    fn ensure_process(&mut self, kind: ProcessKind) -> &ManagedProcess {
        let command = ProcessCommand::for_project(&self.project, kind);
        let hub = Arc::clone(&self.hub);
        let stop_grace = self.settings.stop_grace;
        let slot = match kind {
            ProcessKind::Node => &mut self.node,
            ProcessKind::Miner => &mut self.miner,
            ProcessKind::Indexer => &mut self.indexer,
        };
        slot.get_or_insert_with(|| ManagedProcess::new(kind, command, hub, stop_grace))
    }

    fn observed_state(&self) -> SupervisorState {
        if self.is_running() {
            SupervisorState::Running
        } else {
            SupervisorState::Stopped
        }
    }

    fn set_phase(&mut self, phase: SupervisorState) {
        self.phase = phase;
        self.reporter.state_changed(phase);
    }

    fn settle_phase(&mut self) {
        let observed = self.observed_state();
        self.set_phase(observed);
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(target: SUPERVISOR_TARGET, %error, "failed to stop project on drop");
        }
    }
}

fn join_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
