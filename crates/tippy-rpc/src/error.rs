//! Error types for node JSON-RPC calls.

use thiserror::Error;

use crate::hex::HexError;

/// Errors that can occur while talking to the node.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The HTTP exchange failed: connection refused, timeout, or a non-success
    /// status.
    #[error("transport failure calling {method} at {url}: {source}")]
    Transport {
        /// JSON-RPC method being invoked.
        method: String,
        /// Endpoint URL.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not valid JSON or did not match the expected shape.
    #[error("failed to decode {method} response: {source}")]
    Codec {
        /// JSON-RPC method being invoked.
        method: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The node answered with a JSON-RPC error object.
    #[error("{method} failed with code {code}: {message}")]
    Server {
        /// JSON-RPC method being invoked.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The node answered with neither a result nor an error.
    #[error("{method} returned no result")]
    MissingResult {
        /// JSON-RPC method being invoked.
        method: String,
    },

    /// A hexadecimal quantity in the response could not be decoded.
    #[error("invalid {field}: {source}")]
    InvalidHex {
        /// Name of the wire field that held the value.
        field: &'static str,
        /// The decode failure, including the offending text.
        #[source]
        source: HexError,
    },
}

impl RpcError {
    /// Returns true when a later attempt might succeed without any change on
    /// the caller's side (connection refused, timeout, HTTP failure).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub(crate) fn invalid_hex(field: &'static str) -> impl FnOnce(HexError) -> Self {
        move |source| Self::InvalidHex { field, source }
    }
}
