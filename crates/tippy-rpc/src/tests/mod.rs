//! Test suites for the node RPC client and transaction paginator.

mod pagination_behaviour;
mod support;
