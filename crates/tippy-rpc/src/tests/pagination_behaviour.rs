//! Behaviour of [`TransactionPaginator`] over a synthetic chain.

use rstest::{fixture, rstest};

use crate::testing::{BLOCK_INTERVAL_MS, SyntheticChain, synthetic_block, transaction_hash};
use crate::{
    CapacityInvolved, MISSING_HASH, PageMeta, PageQuery, RpcError, TransactionPaginator,
    TransactionSummary,
};

#[fixture]
fn chain() -> SyntheticChain {
    SyntheticChain::with_user_transactions(10)
}

fn located(summaries: &[TransactionSummary]) -> Vec<String> {
    summaries
        .iter()
        .map(|summary| summary.transaction_hash.clone())
        .collect()
}

#[rstest]
fn skips_coinbase_and_takes_block_order(chain: SyntheticChain) {
    let page = TransactionPaginator::new(&chain)
        .paginate(2, 3)
        .expect("paginate");

    assert_eq!(
        located(&page),
        vec![
            transaction_hash(10, 3),
            transaction_hash(10, 4),
            transaction_hash(10, 5),
        ]
    );
    assert!(page.iter().all(|summary| summary.block_number == 10));
}

#[rstest]
fn skip_counter_spans_blocks(chain: SyntheticChain) {
    let page = TransactionPaginator::new(&chain)
        .paginate(9, 3)
        .expect("paginate");

    assert_eq!(
        located(&page),
        vec![
            transaction_hash(10, 10),
            transaction_hash(9, 1),
            transaction_hash(9, 2),
        ]
    );
}

#[rstest]
fn summaries_decode_header_fields(chain: SyntheticChain) {
    let page = TransactionPaginator::new(&chain)
        .paginate(0, 1)
        .expect("paginate");

    assert_eq!(
        page,
        vec![TransactionSummary {
            transaction_hash: transaction_hash(10, 1),
            block_number: 10,
            block_timestamp: 10 * BLOCK_INTERVAL_MS,
            live_cell_changes: 1,
            capacity_involved: CapacityInvolved::NotComputed,
        }]
    );
}

#[rstest]
fn zero_size_reads_no_blocks(chain: SyntheticChain) {
    let page = TransactionPaginator::new(&chain)
        .paginate(0, 0)
        .expect("paginate");

    assert!(page.is_empty());
    assert_eq!(chain.block_requests(), 0);
}

#[rstest]
fn absent_blocks_are_passed_over(chain: SyntheticChain) {
    chain.replace_block(10, None);
    chain.replace_block(9, None);

    let page = TransactionPaginator::new(&chain)
        .paginate(0, 2)
        .expect("paginate");

    assert_eq!(
        located(&page),
        vec![transaction_hash(8, 1), transaction_hash(8, 2)]
    );
}

#[rstest]
fn scan_stops_at_genesis(chain: SyntheticChain) {
    // Blocks 1..=10 hold 55 user transactions in total.
    let page = TransactionPaginator::new(&chain)
        .paginate(54, 5)
        .expect("paginate");

    assert_eq!(located(&page), vec![transaction_hash(1, 1)]);
    assert_eq!(chain.block_requests(), 11);
}

#[rstest]
fn skipping_past_the_chain_yields_empty_page(chain: SyntheticChain) {
    let page = TransactionPaginator::new(&chain)
        .paginate(1_000, 10)
        .expect("paginate");

    assert!(page.is_empty());
}

#[rstest]
fn genesis_only_chain_has_no_user_transactions() {
    let chain = SyntheticChain::genesis_only();

    let page = TransactionPaginator::new(&chain)
        .paginate(0, 10)
        .expect("paginate");

    assert!(page.is_empty());
}

#[rstest]
fn missing_hash_uses_sentinel(chain: SyntheticChain) {
    let mut block = synthetic_block(10, 1);
    if let Some(transaction) = block.transactions.get_mut(1) {
        transaction.hash = None;
    }
    chain.replace_block(10, Some(block));

    let page = TransactionPaginator::new(&chain)
        .paginate(0, 1)
        .expect("paginate");

    assert_eq!(located(&page), vec![MISSING_HASH.to_owned()]);
}

#[rstest]
fn rpc_failures_abort_the_scan(chain: SyntheticChain) {
    chain.set_unreachable(true);

    let error = TransactionPaginator::new(&chain)
        .paginate(0, 5)
        .expect_err("scan should fail");

    assert!(matches!(error, RpcError::Server { .. }));
}

#[rstest]
fn page_echoes_query_metadata(chain: SyntheticChain) {
    let query = PageQuery::from_page(Some(2), Some(4)).expect("valid page");

    let page = TransactionPaginator::new(&chain)
        .page(query)
        .expect("page");

    assert_eq!(
        located(&page.transactions),
        vec![
            transaction_hash(10, 5),
            transaction_hash(10, 6),
            transaction_hash(10, 7),
            transaction_hash(10, 8),
        ]
    );
    assert_eq!(
        page.meta,
        Some(PageMeta {
            total: None,
            page_size: 4
        })
    );
}
