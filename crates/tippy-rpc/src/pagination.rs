//! Backward scan over the chain that slices user transactions into pages.
//!
//! The paginator walks from the tip towards genesis, skipping absent blocks
//! and each block's coinbase. Transactions within a block are taken in block
//! order. A single skip counter spans blocks, so `skip` counts user
//! transactions, not blocks.

use serde::Serialize;
use tracing::trace;

use crate::client::{CLIENT_TARGET, ChainRpc};
use crate::error::RpcError;
use crate::types::{Header, Transaction};

/// Page size used when the caller supplies no paging parameters.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Resource type tag carried by every entry of a transaction page document.
pub const TRANSACTION_LIST_TYPE: &str = "ckb_transaction_list";

/// Placeholder hash used when the node omitted a transaction's hash.
pub const MISSING_HASH: &str = "0x";

/// Marker for a value the controller does not compute yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityInvolved {
    /// Not computed; consumers must not treat this as zero.
    #[default]
    NotComputed,
}

/// One user transaction as presented in a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    /// Transaction hash, or [`MISSING_HASH`].
    pub transaction_hash: String,
    /// Height of the containing block.
    pub block_number: u64,
    /// Timestamp of the containing block in milliseconds.
    pub block_timestamp: u64,
    /// Outputs created minus inputs consumed.
    pub live_cell_changes: i64,
    /// Capacity moved by the transaction.
    pub capacity_involved: CapacityInvolved,
}

impl TransactionSummary {
    fn new(block_number: u64, block_timestamp: u64, transaction: &Transaction) -> Self {
        Self {
            transaction_hash: transaction
                .hash
                .clone()
                .unwrap_or_else(|| MISSING_HASH.to_owned()),
            block_number,
            block_timestamp,
            live_cell_changes: transaction.live_cell_changes(),
            capacity_involved: CapacityInvolved::NotComputed,
        }
    }
}

/// Paging metadata attached to page-numbered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    /// Total number of transactions; `None` until the controller counts them.
    pub total: Option<u64>,
    /// Requested page size.
    pub page_size: u64,
}

/// A resolved page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    /// User transactions to skip from the tip.
    pub skip: u64,
    /// Maximum transactions to return.
    pub size: u64,
    /// Metadata to echo back, present for explicit page numbers.
    pub meta: Option<PageMeta>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            size: DEFAULT_PAGE_SIZE,
            meta: None,
        }
    }
}

impl PageQuery {
    /// Maps 1-based page parameters onto a scan request.
    ///
    /// Without both parameters the first [`DEFAULT_PAGE_SIZE`] transactions
    /// are requested and no metadata is attached. Returns `None` when either
    /// value is below one.
    #[must_use]
    pub fn from_page(page: Option<u64>, page_size: Option<u64>) -> Option<Self> {
        let (Some(page), Some(page_size)) = (page, page_size) else {
            return Some(Self::default());
        };
        if page < 1 || page_size < 1 {
            return None;
        }
        Some(Self {
            skip: (page - 1).saturating_mul(page_size),
            size: page_size,
            meta: Some(PageMeta {
                total: None,
                page_size,
            }),
        })
    }
}

/// Transactions collected for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPage {
    /// Summaries ordered from the tip downward.
    pub transactions: Vec<TransactionSummary>,
    /// Metadata echoed from the query.
    pub meta: Option<PageMeta>,
}

impl TransactionPage {
    /// Wraps the page in its API document form.
    #[must_use]
    pub fn into_document(self) -> ArrayResult<TransactionSummary> {
        ArrayResult::new(
            TRANSACTION_LIST_TYPE,
            self.transactions
                .into_iter()
                .map(|summary| (summary.transaction_hash.clone(), summary)),
            self.meta,
        )
    }
}

/// A typed resource entry in an [`ArrayResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource<T> {
    /// Resource identifier.
    pub id: String,
    /// Resource type tag.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Resource body.
    pub attributes: T,
}

/// A list document: typed resources plus optional metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayResult<T> {
    /// Resources in order.
    pub data: Vec<Resource<T>>,
    /// Paging metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T> ArrayResult<T> {
    /// Builds a document of `kind` resources from `(id, attributes)` pairs.
    pub fn new<I>(kind: &'static str, items: I, meta: Option<PageMeta>) -> Self
    where
        I: IntoIterator<Item = (String, T)>,
    {
        Self {
            data: items
                .into_iter()
                .map(|(id, attributes)| Resource {
                    id,
                    kind,
                    attributes,
                })
                .collect(),
            meta,
        }
    }
}

/// Slices user transactions into pages by scanning from the tip.
pub struct TransactionPaginator<'a> {
    rpc: &'a dyn ChainRpc,
}

impl<'a> TransactionPaginator<'a> {
    /// Creates a paginator over `rpc`.
    #[must_use]
    pub const fn new(rpc: &'a dyn ChainRpc) -> Self {
        Self { rpc }
    }

    /// Runs `query` and attaches its metadata.
    pub fn page(&self, query: PageQuery) -> Result<TransactionPage, RpcError> {
        Ok(TransactionPage {
            transactions: self.paginate(query.skip, query.size)?,
            meta: query.meta,
        })
    }

    /// Collects up to `size` user transactions after skipping `skip`.
    ///
    /// Scans from the tip down to block 0 inclusive. Blocks the node reports
    /// as absent are passed over. RPC failures abort the scan.
    pub fn paginate(&self, skip: u64, size: u64) -> Result<Vec<TransactionSummary>, RpcError> {
        let tip = self.rpc.tip_block_number()?;
        let limit = usize::try_from(size).unwrap_or(usize::MAX);
        let mut collected = Vec::new();
        if limit == 0 {
            return Ok(collected);
        }

        let mut skipped = 0_u64;
        let mut next = Some(tip);
        while let Some(number) = next {
            next = number.checked_sub(1);
            let Some(block) = self.rpc.block_by_number(number)? else {
                trace!(target: CLIENT_TARGET, number, "skipping absent block");
                continue;
            };
            let user_transactions = block.transactions.get(1..).unwrap_or_default();
            if user_transactions.is_empty() {
                continue;
            }
            let (block_number, block_timestamp) = decode_header(&block.header)?;

            for transaction in user_transactions {
                if skipped < skip {
                    skipped += 1;
                    continue;
                }
                collected.push(TransactionSummary::new(
                    block_number,
                    block_timestamp,
                    transaction,
                ));
                if collected.len() >= limit {
                    return Ok(collected);
                }
            }
        }
        Ok(collected)
    }
}

fn decode_header(header: &Header) -> Result<(u64, u64), RpcError> {
    Ok((header.number()?, header.timestamp()?))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn missing_parameters_request_first_page() {
        assert_eq!(PageQuery::from_page(None, None), Some(PageQuery::default()));
        assert_eq!(PageQuery::from_page(Some(3), None), Some(PageQuery::default()));
    }

    #[rstest]
    #[case(Some(0), Some(10))]
    #[case(Some(1), Some(0))]
    fn rejects_pages_below_one(#[case] page: Option<u64>, #[case] size: Option<u64>) {
        assert_eq!(PageQuery::from_page(page, size), None);
    }

    #[rstest]
    fn maps_page_numbers_to_skip() {
        let query = PageQuery::from_page(Some(3), Some(25)).expect("valid page");

        assert_eq!(query.skip, 50);
        assert_eq!(query.size, 25);
        assert_eq!(
            query.meta,
            Some(PageMeta {
                total: None,
                page_size: 25
            })
        );
    }

    #[rstest]
    fn document_uses_list_type_and_hash_ids() {
        let page = TransactionPage {
            transactions: vec![TransactionSummary {
                transaction_hash: "0xabc".to_owned(),
                block_number: 4,
                block_timestamp: 1_000,
                live_cell_changes: -1,
                capacity_involved: CapacityInvolved::NotComputed,
            }],
            meta: Some(PageMeta {
                total: None,
                page_size: 1,
            }),
        };

        let json = serde_json::to_value(page.into_document()).expect("serialise document");
        assert_eq!(
            json,
            json!({
                "data": [{
                    "id": "0xabc",
                    "type": "ckb_transaction_list",
                    "attributes": {
                        "transaction_hash": "0xabc",
                        "block_number": 4,
                        "block_timestamp": 1000,
                        "live_cell_changes": -1,
                        "capacity_involved": "not_computed",
                    },
                }],
                "meta": {"total": null, "page_size": 1},
            })
        );
    }
}
