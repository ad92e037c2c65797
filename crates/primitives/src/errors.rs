//! Errors that arise when parsing the chain-level primitives.

use thiserror::Error;

/// Errors returned when a textual representation cannot be turned into a primitive.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The input is not valid hexadecimal.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The decoded byte length does not match the expected width.
    #[error("expected {expected} bytes but got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The input is not a valid unsigned 256-bit integer.
    #[error("invalid uint256: {0}")]
    InvalidInteger(String),

    /// The input does not name a known variant.
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}
