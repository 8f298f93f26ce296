//! HTTP JSON-RPC client for the node.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::RpcError;
use crate::hex::{format_u64, parse_u64};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::types::{Block, BlockEconomicState, EpochView};

/// Log target for RPC traffic.
pub(crate) const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Chain queries the supervisor, scheduler and paginator depend on.
///
/// Implementations must be shareable across the control thread and the
/// scheduler's worker thread.
pub trait ChainRpc: Send + Sync {
    /// Height of the current tip block.
    fn tip_block_number(&self) -> Result<u64, RpcError>;

    /// The block at `number`, or `None` when the node does not have it.
    fn block_by_number(&self, number: u64) -> Result<Option<Block>, RpcError>;

    /// Asks a development node to mine one block and returns its hash.
    fn generate_block(&self) -> Result<String, RpcError>;
}

/// Blocking JSON-RPC client bound to one node endpoint.
///
/// Every call is a single HTTP POST bounded by the configured timeout. Calls
/// are never retried.
#[derive(Debug, Clone)]
pub struct RpcClient {
    url: String,
    http: Client,
}

impl RpcClient {
    /// Creates a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let url = base_url.into();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| RpcError::Transport {
                method: "<client>".to_owned(),
                url: url.clone(),
                source,
            })?;
        Ok(Self { url, http })
    }

    /// Creates a client for a node listening on `localhost:<port>`.
    pub fn for_port(port: u16, timeout: Duration) -> Result<Self, RpcError> {
        Self::new(format!("http://localhost:{port}"), timeout)
    }

    /// Endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The node's current epoch.
    pub fn current_epoch(&self) -> Result<EpochView, RpcError> {
        self.send_request("get_current_epoch", json!([]))
    }

    /// Rewards and fees for the block with `block_hash`, if finalised.
    pub fn block_economic_state(
        &self,
        block_hash: &str,
    ) -> Result<Option<BlockEconomicState>, RpcError> {
        self.send_request_optional("get_block_economic_state", [block_hash])
    }

    /// Sends a request and returns the raw response, mapping JSON-RPC errors.
    fn send_request_raw<P>(&self, method: &str, params: P) -> Result<JsonRpcResponse, RpcError>
    where
        P: Serialize,
    {
        let params_value = serde_json::to_value(params).map_err(|source| RpcError::Codec {
            method: method.to_owned(),
            source,
        })?;
        let request = JsonRpcRequest::new(method, params_value);

        debug!(
            target: CLIENT_TARGET,
            method,
            id = request.id,
            url = %self.url,
            "sending request"
        );

        let transport = |source: reqwest::Error| RpcError::Transport {
            method: method.to_owned(),
            url: self.url.clone(),
            source,
        };
        let body = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::bytes)
            .map_err(transport)?;

        let response: JsonRpcResponse =
            serde_json::from_slice(&body).map_err(|source| RpcError::Codec {
                method: method.to_owned(),
                source,
            })?;

        if let Some(error) = response.error {
            debug!(
                target: CLIENT_TARGET,
                method,
                code = error.code,
                message = %error.message,
                "node returned an error"
            );
            return Err(RpcError::Server {
                method: method.to_owned(),
                code: error.code,
                message: error.message,
            });
        }

        Ok(response)
    }

    /// Sends a request whose result must be present.
    fn send_request<P, R>(&self, method: &str, params: P) -> Result<R, RpcError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let response = self.send_request_raw(method, params)?;
        let result = response.result.ok_or_else(|| RpcError::MissingResult {
            method: method.to_owned(),
        })?;
        decode(method, result)
    }

    /// Sends a request that may return null as a valid response.
    fn send_request_optional<P, R>(&self, method: &str, params: P) -> Result<Option<R>, RpcError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let response = self.send_request_raw(method, params)?;
        match response.result {
            Some(Value::Null) | None => Ok(None),
            Some(value) => decode(method, value).map(Some),
        }
    }
}

fn decode<R: DeserializeOwned>(method: &str, value: Value) -> Result<R, RpcError> {
    serde_json::from_value(value).map_err(|source| RpcError::Codec {
        method: method.to_owned(),
        source,
    })
}

impl ChainRpc for RpcClient {
    fn tip_block_number(&self) -> Result<u64, RpcError> {
        let tip: String = self.send_request("get_tip_block_number", json!([]))?;
        parse_u64(&tip).map_err(RpcError::invalid_hex("tip_block_number"))
    }

    fn block_by_number(&self, number: u64) -> Result<Option<Block>, RpcError> {
        self.send_request_optional("get_block_by_number", [format_u64(number)])
    }

    fn generate_block(&self) -> Result<String, RpcError> {
        self.send_request("generate_block", json!([]))
    }
}
