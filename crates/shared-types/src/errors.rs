//! # Error Types
//!
//! Errors raised while decoding shared entities.

use thiserror::Error;

/// Errors produced when building shared entities from external input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Input was not valid hexadecimal.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded bytes had the wrong length.
    #[error("Invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}
