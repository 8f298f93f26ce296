//! Test harness utilities for the RPC suites.

mod fake_node;

pub use fake_node::{CannedResponse, FakeNode};
