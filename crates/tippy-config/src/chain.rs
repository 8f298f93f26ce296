use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Chain configuration a project runs against.
///
/// Only [`ChainType::Dev`] allows manual block production, so mining
/// controls are inert for the other variants.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ChainType {
    /// Permissive local chain with trivial difficulty.
    #[default]
    Dev,
    /// Public test network.
    Testnet,
    /// Public main network.
    Mainnet,
}

impl ChainType {
    /// Returns `true` when blocks can be generated on demand.
    #[must_use]
    pub const fn allows_manual_mining(self) -> bool {
        matches!(self, Self::Dev)
    }
}

/// Errors encountered while parsing a [`ChainType`] from text.
pub type ChainTypeParseError = strum::ParseError;
