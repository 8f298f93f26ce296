use camino::Utf8PathBuf;

use crate::chain::ChainType;
use crate::logging::LogFormat;

/// Default node JSON-RPC port.
pub const DEFAULT_NODE_RPC_PORT: u16 = 8114;

/// Default node peer-to-peer port.
pub const DEFAULT_NODE_NETWORK_PORT: u16 = 8115;

/// Default indexer JSON-RPC port.
pub const DEFAULT_INDEXER_RPC_PORT: u16 = 8116;

/// Default executable for the node and the miner.
pub const DEFAULT_NODE_BINARY: &str = "ckb";

/// Default executable for the indexer.
pub const DEFAULT_INDEXER_BINARY: &str = "ckb-indexer";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default per-request RPC timeout in milliseconds.
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 5_000;

/// Default upper bound on the node readiness wait in milliseconds.
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 10_000;

/// Default interval between readiness probes in milliseconds.
pub const DEFAULT_READY_POLL_MS: u64 = 200;

/// Default grace period between SIGTERM and SIGKILL in milliseconds.
pub const DEFAULT_STOP_GRACE_MS: u64 = 2_000;

/// Default number of buffered log lines per subscriber.
pub const DEFAULT_LOG_BUFFER: usize = 1_024;

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default chain for freshly created projects.
pub fn default_chain() -> ChainType {
    ChainType::Dev
}

/// Default project root: the current working directory.
pub fn default_project_root() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

/// Owned default node binary name.
pub fn default_node_binary() -> String {
    DEFAULT_NODE_BINARY.to_string()
}

/// Owned default indexer binary name.
pub fn default_indexer_binary() -> String {
    DEFAULT_INDEXER_BINARY.to_string()
}
