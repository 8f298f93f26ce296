//! JSON-RPC access to a local chain node.
//!
//! [`RpcClient`] speaks JSON-RPC 2.0 over HTTP to the node and implements the
//! [`ChainRpc`] seam that the controller depends on. [`TransactionPaginator`]
//! builds transaction pages on top of any [`ChainRpc`].

mod client;
mod error;
pub mod hex;
mod jsonrpc;
mod pagination;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use client::{ChainRpc, RpcClient};
pub use error::RpcError;
pub use hex::HexError;
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, next_request_id};
pub use pagination::{
    ArrayResult, CapacityInvolved, DEFAULT_PAGE_SIZE, MISSING_HASH, PageMeta, PageQuery, Resource,
    TRANSACTION_LIST_TYPE, TransactionPage, TransactionPaginator, TransactionSummary,
};
pub use types::Block;

#[cfg(test)]
mod tests;
