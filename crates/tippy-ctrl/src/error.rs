//! Error types for process supervision.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;
use tippy_config::ProcessKind;
use tippy_rpc::RpcError;

/// Errors raised by a single managed process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The executable could not be found.
    #[error("{kind} binary '{program}' not found")]
    BinaryNotFound {
        /// Process kind being spawned.
        kind: ProcessKind,
        /// Program that was looked up.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Spawning failed for a reason other than a missing binary.
    #[error("failed to spawn {kind} ('{program}'): {source}")]
    SpawnFailed {
        /// Process kind being spawned.
        kind: ProcessKind,
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A standard stream was not captured after spawning.
    #[error("{kind} {stream} was not captured")]
    StreamUnavailable {
        /// Process kind whose stream is missing.
        kind: ProcessKind,
        /// `stdout` or `stderr`.
        stream: &'static str,
    },

    /// A log relay thread could not be started.
    #[error("failed to start {kind} log relay: {source}")]
    RelaySpawn {
        /// Process kind whose output is relayed.
        kind: ProcessKind,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The working directory could not be prepared.
    #[error("failed to prepare directory {path}: {source}")]
    Directory {
        /// Directory that failed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The data directory was reset while the process was running.
    #[error("cannot reset {kind} data while it is running")]
    ResetWhileRunning {
        /// Process kind that is still running.
        kind: ProcessKind,
    },

    /// Signalling, killing or reaping the child failed.
    #[error("failed to stop {kind} (pid {pid}): {source}")]
    Terminate {
        /// Process kind being stopped.
        kind: ProcessKind,
        /// OS process id.
        pid: u32,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the process supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A managed process failed.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The RPC client could not be constructed.
    #[error("failed to build node RPC client: {0}")]
    Rpc(#[from] RpcError),

    /// The mining scheduler thread could not be spawned.
    #[error("failed to spawn mining scheduler: {source}")]
    SchedulerSpawn {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The mining scheduler thread panicked.
    #[error("mining scheduler thread panicked")]
    SchedulerPanicked,
}
