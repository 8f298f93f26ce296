//! Temporary projects whose processes are plain shell sleepers.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use rstest::fixture;
use tempfile::TempDir;
use tippy_config::{ChainType, CommandTemplate, ProcessKind, ProjectRuntimeConfig};
use tippy_rpc::ChainRpc;
use tippy_rpc::testing::SyntheticChain;

use super::quiet_auditor;
use super::reporter::RecordingLifecycleReporter;
use crate::{ProcessSupervisor, SupervisorSettings};

/// A shell command that prints `banner` and then sleeps until signalled.
pub fn sleeper(banner: &str) -> CommandTemplate {
    CommandTemplate::new(
        "sh",
        vec!["-c".to_owned(), format!("echo {banner}; exec sleep 30")],
    )
}

/// Settings tuned so that scenarios finish quickly.
pub fn fast_settings() -> SupervisorSettings {
    SupervisorSettings {
        ready_timeout: Duration::from_secs(2),
        ready_poll_interval: Duration::from_millis(20),
        stop_grace: Duration::from_millis(500),
        log_buffer: 256,
    }
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// A project rooted in a temporary directory.
pub struct TestProject {
    pub config: ProjectRuntimeConfig,
    root: TempDir,
}

impl TestProject {
    /// A project on `chain` whose three processes are sleepers.
    pub fn new(chain: ChainType) -> Self {
        let root = TempDir::new().expect("create project root");
        let path = Utf8PathBuf::from_path_buf(root.path().to_path_buf()).expect("utf-8 root");
        let config = ProjectRuntimeConfig::new(chain, 18_114, 18_115, 18_116, path)
            .with_command(ProcessKind::Node, sleeper("node booted"))
            .with_command(ProcessKind::Miner, sleeper("miner booted"))
            .with_command(ProcessKind::Indexer, sleeper("indexer booted"));
        Self { config, root }
    }

    /// Replaces the command for `kind`.
    #[must_use]
    pub fn with_command(mut self, kind: ProcessKind, command: CommandTemplate) -> Self {
        self.config = self.config.with_command(kind, command);
        self
    }

    /// Filesystem root of the project.
    pub fn root(&self) -> &std::path::Path {
        self.root.path()
    }
}

/// A supervisor wired to a synthetic chain and a recording reporter.
///
/// Fields drop in declaration order, so processes stop before the project
/// directory is removed.
pub struct Harness {
    pub supervisor: ProcessSupervisor,
    pub chain: Arc<SyntheticChain>,
    pub reporter: Arc<RecordingLifecycleReporter>,
    pub project: TestProject,
}

impl Harness {
    /// Builds a harness around `project` with `settings`.
    pub fn with_project(project: TestProject, settings: SupervisorSettings) -> Self {
        let chain = Arc::new(SyntheticChain::with_user_transactions(5));
        let reporter = Arc::new(RecordingLifecycleReporter::default());
        let rpc: Arc<dyn ChainRpc> = chain.clone();
        let supervisor = ProcessSupervisor::new(project.config.clone(), settings, rpc)
            .with_reporter(reporter.clone())
            .with_port_auditor(quiet_auditor());
        Self {
            supervisor,
            chain,
            reporter,
            project,
        }
    }
}

/// A dev-chain harness with sleeper processes.
#[fixture]
pub fn harness() -> Harness {
    Harness::with_project(TestProject::new(ChainType::Dev), fast_settings())
}
