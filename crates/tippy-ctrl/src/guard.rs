//! Preconditions and typed outcomes for mining operations.

use std::fmt;

use thiserror::Error;
use tippy_config::ChainType;

/// Why a mining operation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotApplicable {
    /// Manual mining only exists on development chains.
    #[error("mining is only available on dev chains, not {0}")]
    NotDevChain(ChainType),
    /// The node must be running before blocks can be produced.
    #[error("the node is not running")]
    NodeNotRunning,
    /// Advanced mining was asked to produce no blocks.
    #[error("advanced mining needs at least one block")]
    ZeroBlocks,
}

/// Checks the conditions shared by every mining operation.
pub const fn mining_precondition(chain: ChainType, node_running: bool) -> Result<(), NotApplicable> {
    if !chain.allows_manual_mining() {
        return Err(NotApplicable::NotDevChain(chain));
    }
    if !node_running {
        return Err(NotApplicable::NodeNotRunning);
    }
    Ok(())
}

/// Result of a mining request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    /// Mining began.
    Started,
    /// The requested mining activity was already in progress.
    AlreadyActive,
    /// One block was produced with this hash.
    Mined(String),
    /// The node rejected or failed the request.
    Failed(String),
    /// The request was refused before any side effect.
    NotApplicable(NotApplicable),
}

impl From<NotApplicable> for MiningOutcome {
    fn from(reason: NotApplicable) -> Self {
        Self::NotApplicable(reason)
    }
}

impl fmt::Display for MiningOutcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => formatter.write_str("mining started"),
            Self::AlreadyActive => formatter.write_str("mining already active"),
            Self::Mined(hash) => write!(formatter, "Generated block {hash}"),
            Self::Failed(message) => write!(formatter, "Failed to generate block: {message}"),
            Self::NotApplicable(reason) => write!(formatter, "not applicable: {reason}"),
        }
    }
}
