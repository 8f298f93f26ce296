//! Shared configuration for the Tippy devnet controller.
//!
//! [`Config`] is loaded in layers by `ortho_config`: built-in defaults, then a
//! configuration file, then `TIPPY_*` environment variables, then command-line
//! flags. The resolved value is converted into a [`ProjectRuntimeConfig`],
//! the only view of configuration the supervisor consumes.

mod chain;
mod defaults;
mod logging;
mod project;

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use chain::{ChainType, ChainTypeParseError};
pub use defaults::{
    DEFAULT_INDEXER_BINARY, DEFAULT_INDEXER_RPC_PORT, DEFAULT_LOG_BUFFER, DEFAULT_LOG_FILTER,
    DEFAULT_NODE_BINARY, DEFAULT_NODE_NETWORK_PORT, DEFAULT_NODE_RPC_PORT,
    DEFAULT_READY_POLL_MS, DEFAULT_READY_TIMEOUT_MS, DEFAULT_RPC_TIMEOUT_MS,
    DEFAULT_STOP_GRACE_MS, default_chain, default_indexer_binary, default_log_filter,
    default_log_filter_string, default_log_format, default_node_binary, default_project_root,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use project::{CommandTemplate, ProcessKind, ProcessKindParseError, ProjectRuntimeConfig};

/// Command-line flags consumed by the configuration loader.
///
/// The CLI forwards these (and their values) to [`Config::load_from_iter`]
/// and parses everything after them as a command.
pub const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--chain",
    "--node-rpc-port",
    "--node-network-port",
    "--indexer-rpc-port",
    "--project-root",
    "--node-binary",
    "--miner-binary",
    "--indexer-binary",
    "--log-filter",
    "--log-format",
    "--rpc-timeout-ms",
    "--ready-timeout-ms",
    "--ready-poll-ms",
    "--stop-grace-ms",
    "--log-buffer",
];

/// Resolved configuration shared by the CLI and the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TIPPY")]
pub struct Config {
    /// Chain the project runs.
    #[ortho_config(default = default_chain())]
    pub chain: ChainType,
    /// Node JSON-RPC port.
    #[ortho_config(default = DEFAULT_NODE_RPC_PORT)]
    pub node_rpc_port: u16,
    /// Node peer-to-peer port.
    #[ortho_config(default = DEFAULT_NODE_NETWORK_PORT)]
    pub node_network_port: u16,
    /// Indexer JSON-RPC port.
    #[ortho_config(default = DEFAULT_INDEXER_RPC_PORT)]
    pub indexer_rpc_port: u16,
    /// Project root holding the `data` directory.
    #[ortho_config(default = default_project_root())]
    pub project_root: Utf8PathBuf,
    /// Node executable.
    #[ortho_config(default = default_node_binary())]
    pub node_binary: String,
    /// Miner executable.
    #[ortho_config(default = default_node_binary())]
    pub miner_binary: String,
    /// Indexer executable.
    #[ortho_config(default = default_indexer_binary())]
    pub indexer_binary: String,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for diagnostics.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Per-request JSON-RPC timeout in milliseconds.
    #[ortho_config(default = DEFAULT_RPC_TIMEOUT_MS)]
    pub rpc_timeout_ms: u64,
    /// Upper bound on the node readiness wait in milliseconds.
    #[ortho_config(default = DEFAULT_READY_TIMEOUT_MS)]
    pub ready_timeout_ms: u64,
    /// Interval between readiness probes in milliseconds.
    #[ortho_config(default = DEFAULT_READY_POLL_MS)]
    pub ready_poll_ms: u64,
    /// Grace period between SIGTERM and SIGKILL in milliseconds.
    #[ortho_config(default = DEFAULT_STOP_GRACE_MS)]
    pub stop_grace_ms: u64,
    /// Buffered log lines per subscriber before the oldest are dropped.
    #[ortho_config(default = DEFAULT_LOG_BUFFER)]
    pub log_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain: default_chain(),
            node_rpc_port: DEFAULT_NODE_RPC_PORT,
            node_network_port: DEFAULT_NODE_NETWORK_PORT,
            indexer_rpc_port: DEFAULT_INDEXER_RPC_PORT,
            project_root: default_project_root(),
            node_binary: default_node_binary(),
            miner_binary: default_node_binary(),
            indexer_binary: default_indexer_binary(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            ready_timeout_ms: DEFAULT_READY_TIMEOUT_MS,
            ready_poll_ms: DEFAULT_READY_POLL_MS,
            stop_grace_ms: DEFAULT_STOP_GRACE_MS,
            log_buffer: DEFAULT_LOG_BUFFER,
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments, environment and files.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument list (argv[0] first).
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// JSON-RPC request timeout.
    #[must_use]
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Upper bound on the node readiness wait.
    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Interval between readiness probes.
    #[must_use]
    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms)
    }

    /// Grace period granted to a process after SIGTERM.
    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    /// Builds the runtime view consumed by the supervisor.
    #[must_use]
    pub fn project(&self) -> ProjectRuntimeConfig {
        ProjectRuntimeConfig::new(
            self.chain,
            self.node_rpc_port,
            self.node_network_port,
            self.indexer_rpc_port,
            self.project_root.clone(),
        )
        .with_command(
            ProcessKind::Node,
            CommandTemplate::default_for(ProcessKind::Node, self.node_binary.clone()),
        )
        .with_command(
            ProcessKind::Miner,
            CommandTemplate::default_for(ProcessKind::Miner, self.miner_binary.clone()),
        )
        .with_command(
            ProcessKind::Indexer,
            CommandTemplate::default_for(ProcessKind::Indexer, self.indexer_binary.clone()),
        )
    }

    /// Rejects configurations the supervisor cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ports = [
            ("node_rpc_port", self.node_rpc_port),
            ("node_network_port", self.node_network_port),
            ("indexer_rpc_port", self.indexer_rpc_port),
        ];
        let mut seen: BTreeMap<u16, &'static str> = BTreeMap::new();
        for (name, port) in ports {
            if port == 0 {
                return Err(ConfigError::ZeroPort { name });
            }
            if let Some(first) = seen.insert(port, name) {
                return Err(ConfigError::DuplicatePort {
                    port,
                    first,
                    second: name,
                });
            }
        }
        if self.log_buffer == 0 {
            return Err(ConfigError::ZeroLogBuffer);
        }
        Ok(())
    }
}

/// Semantic configuration errors detected after loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A port was configured as zero.
    #[error("{name} must be a non-zero port")]
    ZeroPort { name: &'static str },
    /// Two services were configured to share one port.
    #[error("port {port} is assigned to both {first} and {second}")]
    DuplicatePort {
        port: u16,
        first: &'static str,
        second: &'static str,
    },
    /// The per-subscriber log buffer was configured as zero.
    #[error("log_buffer must hold at least one line")]
    ZeroLogBuffer,
}
