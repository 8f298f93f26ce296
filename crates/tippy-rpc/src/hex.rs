//! Decoding of the node's `0x`-prefixed hexadecimal quantities.

use std::num::ParseIntError;

use thiserror::Error;

/// Errors raised while decoding a hexadecimal quantity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HexError {
    /// The value did not start with `0x`.
    #[error("missing 0x prefix in '{0}'")]
    MissingPrefix(String),
    /// The value had no digits after the prefix.
    #[error("no digits after 0x prefix")]
    Empty,
    /// The digits were not valid base-16 or overflowed 64 bits.
    #[error("invalid hexadecimal quantity '{value}': {source}")]
    Invalid {
        /// The offending text.
        value: String,
        /// Underlying integer parse failure.
        #[source]
        source: ParseIntError,
    },
}

/// Parses a `0x`-prefixed hexadecimal string into a `u64`.
pub fn parse_u64(value: &str) -> Result<u64, HexError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| HexError::MissingPrefix(value.to_owned()))?;
    if digits.is_empty() {
        return Err(HexError::Empty);
    }
    u64::from_str_radix(digits, 16).map_err(|source| HexError::Invalid {
        value: value.to_owned(),
        source,
    })
}

/// Formats a `u64` as a `0x`-prefixed lowercase hexadecimal string.
#[must_use]
pub fn format_u64(value: u64) -> String {
    format!("{value:#x}")
}
