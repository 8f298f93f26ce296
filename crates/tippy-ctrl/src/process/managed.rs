use std::fs;
use std::io;
use std::mem;
use std::process::Child;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use camino::Utf8PathBuf;
use tippy_config::ProcessKind;
use tracing::{debug, info, warn};

use super::PROCESS_TARGET;
use super::command::ProcessCommand;
use super::lifecycle::{join_relays, terminate_child};
use super::relay::spawn_relay;
use crate::error::ProcessError;
use crate::log::LogHub;

/// Internal state of a managed process.
enum ProcessState {
    /// Never started.
    NotStarted,
    /// Spawned and not yet observed to exit.
    Running {
        child: Child,
        relays: Vec<JoinHandle<()>>,
    },
    /// Stopped by request or observed to have exited.
    Stopped,
}

/// Result of [`ManagedProcess::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new child was spawned.
    Started {
        /// OS process id.
        pid: u32,
    },
    /// A child was already running; nothing was spawned.
    AlreadyRunning {
        /// OS process id of the existing child.
        pid: u32,
    },
}

impl StartOutcome {
    /// OS process id of the running child.
    #[must_use]
    pub const fn pid(self) -> u32 {
        match self {
            Self::Started { pid } | Self::AlreadyRunning { pid } => pid,
        }
    }
}

/// One supervised external program.
///
/// The wrapper survives stop/start cycles; only the OS process comes and goes.
/// Dropping it stops the child.
pub struct ManagedProcess {
    kind: ProcessKind,
    command: ProcessCommand,
    hub: Arc<LogHub>,
    stop_grace: Duration,
    state: Mutex<ProcessState>,
}

impl ManagedProcess {
    /// Creates a stopped process that will run `command`.
    #[must_use]
    pub fn new(
        kind: ProcessKind,
        command: ProcessCommand,
        hub: Arc<LogHub>,
        stop_grace: Duration,
    ) -> Self {
        Self {
            kind,
            command,
            hub,
            stop_grace,
            state: Mutex::new(ProcessState::NotStarted),
        }
    }

    /// The kind of program supervised.
    #[must_use]
    pub const fn kind(&self) -> ProcessKind {
        self.kind
    }

    /// The invocation used on every start.
    #[must_use]
    pub const fn command(&self) -> &ProcessCommand {
        &self.command
    }

    /// Spawns the program unless it is already running.
    ///
    /// The working directory is created if missing. Both output streams are
    /// relayed to the log hub line by line.
    pub fn start(&self) -> Result<StartOutcome, ProcessError> {
        let mut state = self.lock();
        if let Some(pid) = self.observe(&mut state) {
            debug!(target: PROCESS_TARGET, kind = %self.kind, pid, "process already running");
            return Ok(StartOutcome::AlreadyRunning { pid });
        }

        let working_dir = self.command.working_dir();
        fs::create_dir_all(working_dir).map_err(|source| ProcessError::Directory {
            path: working_dir.to_owned(),
            source,
        })?;

        info!(
            target: PROCESS_TARGET,
            kind = %self.kind,
            program = %self.command.program,
            args = ?self.command.args,
            working_dir = %working_dir,
            "spawning process"
        );
        let mut child = self.command.to_command().spawn().map_err(|source| {
            let program = self.command.program.clone();
            if source.kind() == io::ErrorKind::NotFound {
                ProcessError::BinaryNotFound {
                    kind: self.kind,
                    program,
                    source,
                }
            } else {
                ProcessError::SpawnFailed {
                    kind: self.kind,
                    program,
                    source,
                }
            }
        })?;

        let relays = match self.spawn_relays(&mut child) {
            Ok(relays) => relays,
            Err(error) => {
                if let Err(kill_error) = child.kill().and_then(|()| child.wait().map(drop)) {
                    warn!(target: PROCESS_TARGET, kind = %self.kind, %kill_error, "failed to discard child");
                }
                return Err(error);
            }
        };

        let pid = child.id();
        info!(target: PROCESS_TARGET, kind = %self.kind, pid, "process spawned");
        *state = ProcessState::Running { child, relays };
        Ok(StartOutcome::Started { pid })
    }

    fn spawn_relays(&self, child: &mut Child) -> Result<Vec<JoinHandle<()>>, ProcessError> {
        let stdout = child
            .stdout
            .take()
            .ok_or(ProcessError::StreamUnavailable {
                kind: self.kind,
                stream: "stdout",
            })?;
        let stderr = child
            .stderr
            .take()
            .ok_or(ProcessError::StreamUnavailable {
                kind: self.kind,
                stream: "stderr",
            })?;
        let relay_error = |source: io::Error| ProcessError::RelaySpawn {
            kind: self.kind,
            source,
        };
        let stdout_relay =
            spawn_relay(self.kind, "stdout", stdout, Arc::clone(&self.hub)).map_err(relay_error)?;
        let stderr_relay =
            spawn_relay(self.kind, "stderr", stderr, Arc::clone(&self.hub)).map_err(relay_error)?;
        Ok(vec![stdout_relay, stderr_relay])
    }

    /// Stops the program if it is running. Returns whether a child was stopped.
    ///
    /// Sends SIGTERM to the child's process group, waits up to the grace
    /// period, then kills the group and reaps the child. Descendants still
    /// holding the output pipes a grace period later are killed too.
    pub fn stop(&self) -> Result<bool, ProcessError> {
        let mut state = self.lock();
        match mem::replace(&mut *state, ProcessState::Stopped) {
            ProcessState::Running { mut child, relays } => {
                let pid = child.id();
                if let Err(error) = terminate_child(&mut child, self.kind, self.stop_grace) {
                    *state = ProcessState::Running { child, relays };
                    return Err(error);
                }
                join_relays(relays, pid, self.kind, self.stop_grace);
                info!(target: PROCESS_TARGET, kind = %self.kind, "process stopped");
                Ok(true)
            }
            previous => {
                *state = previous;
                Ok(false)
            }
        }
    }

    /// Whether the child is alive right now. An exited child is reaped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.pid().is_some()
    }

    /// OS process id while running.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        let mut state = self.lock();
        self.observe(&mut state)
    }

    /// Directory where the program keeps its data.
    #[must_use]
    pub fn data_dir(&self) -> Utf8PathBuf {
        self.command.working_dir().join("data")
    }

    /// Directory where the program writes its own log files.
    #[must_use]
    pub fn log_folder(&self) -> Utf8PathBuf {
        self.data_dir().join("logs")
    }

    /// Deletes the data directory and recreates it empty.
    pub fn reset_data(&self) -> Result<(), ProcessError> {
        let mut state = self.lock();
        if self.observe(&mut state).is_some() {
            return Err(ProcessError::ResetWhileRunning { kind: self.kind });
        }
        let data_dir = self.data_dir();
        let directory_error = |source: io::Error| ProcessError::Directory {
            path: data_dir.clone(),
            source,
        };
        match fs::remove_dir_all(&data_dir) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(directory_error(error)),
        }
        fs::create_dir_all(&data_dir).map_err(directory_error)?;
        info!(target: PROCESS_TARGET, kind = %self.kind, path = %data_dir, "data reset");
        Ok(())
    }

    /// Returns the pid if still running, moving an exited child to `Stopped`.
    fn observe(&self, state: &mut ProcessState) -> Option<u32> {
        let ProcessState::Running { child, .. } = state else {
            return None;
        };
        let pid = child.id();
        match child.try_wait() {
            Ok(None) => Some(pid),
            Ok(Some(status)) => {
                warn!(target: PROCESS_TARGET, kind = %self.kind, pid, ?status, "process exited");
                // Relays finish on their own once the pipes reach EOF.
                *state = ProcessState::Stopped;
                None
            }
            Err(error) => {
                warn!(target: PROCESS_TARGET, kind = %self.kind, pid, %error, "failed to check process status");
                Some(pid)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProcessState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(target: PROCESS_TARGET, kind = %self.kind, %error, "failed to stop process on drop");
        }
    }
}
