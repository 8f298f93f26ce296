//! In-memory chain used by tests across the workspace.
//!
//! [`SyntheticChain`] holds blocks `0..=tip` where block `k` carries a
//! coinbase followed by `k` user transactions. Blocks can be removed or
//! replaced to exercise absent-block handling, block generation can be made
//! to fail, and the node can be marked unreachable.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::client::ChainRpc;
use crate::error::RpcError;
use crate::hex::format_u64;
use crate::types::{Block, Header, Input, OutPoint, Output, Transaction};

/// Timestamp step between synthetic blocks, in milliseconds.
pub const BLOCK_INTERVAL_MS: u64 = 1_000;

/// Deterministic hash of user transaction `index` in block `height`.
#[must_use]
pub fn transaction_hash(height: u64, index: usize) -> String {
    format!("0x{height:032x}{index:032x}")
}

/// Deterministic hash of block `height`.
#[must_use]
pub fn block_hash(height: u64) -> String {
    format!("0x{height:064x}")
}

/// Builds block `height` holding a coinbase and `user_transactions` others.
///
/// Coinbases consume one input and create one output; user transactions
/// consume one input and create two outputs.
#[must_use]
pub fn synthetic_block(height: u64, user_transactions: usize) -> Block {
    let coinbase = Transaction {
        hash: Some(transaction_hash(height, 0)),
        inputs: vec![Input::default()],
        outputs: vec![Output::default()],
        ..Transaction::default()
    };
    let users = (1..=user_transactions).map(|index| Transaction {
        hash: Some(transaction_hash(height, index)),
        inputs: vec![Input {
            previous_output: OutPoint {
                index: "0x0".to_owned(),
                tx_hash: block_hash(height),
            },
            since: "0x0".to_owned(),
        }],
        outputs: vec![Output::default(), Output::default()],
        ..Transaction::default()
    });
    Block {
        header: Header {
            hash: block_hash(height),
            number: format_u64(height),
            timestamp: format_u64(height.saturating_mul(BLOCK_INTERVAL_MS)),
            ..Header::default()
        },
        proposals: Vec::new(),
        transactions: std::iter::once(coinbase).chain(users).collect(),
        uncles: Vec::new(),
    }
}

/// A fake node serving synthetic blocks.
#[derive(Debug)]
pub struct SyntheticChain {
    blocks: Mutex<Vec<Option<Block>>>,
    block_requests: AtomicUsize,
    generated: AtomicUsize,
    fail_generation: AtomicBool,
    unreachable: AtomicBool,
}

impl SyntheticChain {
    /// A chain with blocks `0..=tip`, block `k` holding `k` user transactions.
    #[must_use]
    pub fn with_user_transactions(tip: u64) -> Self {
        let blocks = (0..=tip)
            .map(|height| {
                let count = usize::try_from(height).unwrap_or(usize::MAX);
                Some(synthetic_block(height, count))
            })
            .collect();
        Self::from_blocks(blocks)
    }

    /// A chain holding only the genesis block.
    #[must_use]
    pub fn genesis_only() -> Self {
        Self::from_blocks(vec![Some(synthetic_block(0, 0))])
    }

    fn from_blocks(blocks: Vec<Option<Block>>) -> Self {
        Self {
            blocks: Mutex::new(blocks),
            block_requests: AtomicUsize::new(0),
            generated: AtomicUsize::new(0),
            fail_generation: AtomicBool::new(false),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Replaces block `height`; `None` makes the node report it as absent.
    pub fn replace_block(&self, height: u64, block: Option<Block>) {
        let mut blocks = self.lock();
        if let Some(slot) = usize::try_from(height)
            .ok()
            .and_then(|index| blocks.get_mut(index))
        {
            *slot = block;
        }
    }

    /// Makes later `generate_block` calls fail.
    pub fn fail_generation(&self, fail: bool) {
        self.fail_generation.store(fail, Ordering::SeqCst);
    }

    /// Makes every call fail as if the node were not listening.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of successful `generate_block` calls.
    #[must_use]
    pub fn generated_blocks(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    /// Number of `block_by_number` calls served.
    #[must_use]
    pub fn block_requests(&self) -> usize {
        self.block_requests.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Option<Block>>> {
        self.blocks
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn check_reachable(&self, method: &str) -> Result<(), RpcError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RpcError::Server {
                method: method.to_owned(),
                code: -32_000,
                message: "node unreachable".to_owned(),
            });
        }
        Ok(())
    }
}

impl ChainRpc for SyntheticChain {
    fn tip_block_number(&self) -> Result<u64, RpcError> {
        self.check_reachable("get_tip_block_number")?;
        let len = self.lock().len();
        Ok(u64::try_from(len.saturating_sub(1)).unwrap_or(u64::MAX))
    }

    fn block_by_number(&self, number: u64) -> Result<Option<Block>, RpcError> {
        self.check_reachable("get_block_by_number")?;
        self.block_requests.fetch_add(1, Ordering::SeqCst);
        let blocks = self.lock();
        Ok(usize::try_from(number)
            .ok()
            .and_then(|index| blocks.get(index))
            .cloned()
            .flatten())
    }

    fn generate_block(&self) -> Result<String, RpcError> {
        self.check_reachable("generate_block")?;
        if self.fail_generation.load(Ordering::SeqCst) {
            return Err(RpcError::Server {
                method: "generate_block".to_owned(),
                code: -32_601,
                message: "generation disabled".to_owned(),
            });
        }
        let mut blocks = self.lock();
        let height = u64::try_from(blocks.len()).unwrap_or(u64::MAX);
        blocks.push(Some(synthetic_block(height, 0)));
        self.generated.fetch_add(1, Ordering::SeqCst);
        Ok(block_hash(height))
    }
}
