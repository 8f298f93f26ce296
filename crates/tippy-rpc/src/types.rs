//! Wire types returned by the node's JSON-RPC interface.
//!
//! Field names follow the node's snake_case JSON. Numeric values stay as the
//! `0x`-prefixed strings the node sends; accessors such as
//! [`Header::number`] decode the ones the controller needs. Collections
//! default to empty so that a sparse payload from a development node still
//! deserialises.

use serde::{Deserialize, Serialize};

use crate::error::RpcError;
use crate::hex::parse_u64;

/// A block with its header, proposals, transactions and uncles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Block {
    /// Block header.
    pub header: Header,
    /// Proposed transaction short ids.
    #[serde(default)]
    pub proposals: Vec<String>,
    /// Transactions in block order; index 0 is the coinbase.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Uncle blocks.
    #[serde(default)]
    pub uncles: Vec<Uncle>,
}

/// A block header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Header {
    /// Difficulty target in compact form.
    pub compact_target: String,
    /// DAO field.
    pub dao: String,
    /// Packed epoch number, index and length.
    pub epoch: String,
    /// Block hash.
    pub hash: String,
    /// Proof-of-work nonce.
    pub nonce: String,
    /// Block height.
    pub number: String,
    /// Parent block hash.
    pub parent_hash: String,
    /// Hash of the proposals.
    pub proposals_hash: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: String,
    /// Merkle root of the transactions.
    pub transactions_root: String,
    /// Hash of the uncles.
    pub uncles_hash: String,
    /// Block version.
    pub version: String,
}

impl Header {
    /// Decoded block height.
    pub fn number(&self) -> Result<u64, RpcError> {
        parse_u64(&self.number).map_err(RpcError::invalid_hex("header.number"))
    }

    /// Decoded block timestamp in milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> Result<u64, RpcError> {
        parse_u64(&self.timestamp).map_err(RpcError::invalid_hex("header.timestamp"))
    }
}

/// A transaction as embedded in a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Transaction {
    /// Cells this transaction depends on.
    pub cell_deps: Vec<CellDep>,
    /// Transaction hash; some node versions omit it.
    pub hash: Option<String>,
    /// Headers this transaction depends on.
    pub header_deps: Vec<String>,
    /// Consumed cells.
    pub inputs: Vec<Input>,
    /// Created cells.
    pub outputs: Vec<Output>,
    /// Data attached to each output.
    pub outputs_data: Vec<String>,
    /// Transaction version.
    pub version: String,
    /// Witnesses.
    pub witnesses: Vec<String>,
}

impl Transaction {
    /// Net change in live cells: outputs created minus inputs consumed.
    #[must_use]
    pub fn live_cell_changes(&self) -> i64 {
        let outputs = i64::try_from(self.outputs.len()).unwrap_or(i64::MAX);
        let inputs = i64::try_from(self.inputs.len()).unwrap_or(i64::MAX);
        outputs - inputs
    }
}

/// A cell dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CellDep {
    /// `code` or `dep_group`.
    pub dep_type: String,
    /// The referenced cell.
    pub out_point: OutPoint,
}

/// Reference to a transaction output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutPoint {
    /// Output index.
    pub index: String,
    /// Hash of the transaction holding the output.
    pub tx_hash: String,
}

/// A transaction input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Input {
    /// The consumed output.
    pub previous_output: OutPoint,
    /// Relative or absolute lock time.
    pub since: String,
}

/// A transaction output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Output {
    /// Capacity in shannons.
    pub capacity: String,
    /// Lock script.
    pub lock: Script,
    /// Optional type script.
    #[serde(rename = "type")]
    pub type_script: Option<Script>,
}

/// A lock or type script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Script {
    /// Script arguments.
    pub args: String,
    /// Hash of the script code.
    pub code_hash: String,
    /// How `code_hash` is matched.
    pub hash_type: String,
}

/// An uncle block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Uncle {
    /// Uncle header.
    pub header: Header,
    /// Proposals carried by the uncle.
    #[serde(default)]
    pub proposals: Vec<String>,
}

/// Rewards and fees finalised for a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockEconomicState {
    /// Hash of the block in which the rewards were finalised.
    pub finalized_at: String,
    /// Issuance for the block.
    pub issuance: BlockIssuance,
    /// Reward paid to the miner.
    pub miner_reward: MinerReward,
    /// Total transaction fees.
    pub txs_fee: String,
}

/// Primary and secondary issuance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockIssuance {
    /// Primary issuance.
    pub primary: String,
    /// Secondary issuance.
    pub secondary: String,
}

/// Breakdown of a miner's reward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MinerReward {
    /// Committed-transaction fee share.
    pub committed: String,
    /// Primary reward.
    pub primary: String,
    /// Proposal fee share.
    pub proposal: String,
    /// Secondary reward.
    pub secondary: String,
}

/// The node's current epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EpochView {
    /// Difficulty target in compact form.
    pub compact_target: String,
    /// Number of blocks in the epoch.
    pub length: String,
    /// Epoch number.
    pub number: String,
    /// Height of the epoch's first block.
    pub start_number: String,
}

impl EpochView {
    /// Decoded epoch number.
    pub fn number(&self) -> Result<u64, RpcError> {
        parse_u64(&self.number).map_err(RpcError::invalid_hex("epoch.number"))
    }
}
