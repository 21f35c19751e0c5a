//! # Domain Errors
//!
//! Error types for the mainnet watcher.
//!
//! Transient variants are absorbed inside the pipeline; fatal variants end
//! the watcher task and are surfaced to the process supervisor.

use thiserror::Error;

/// Block height on the source chain.
pub type Height = i64;

/// Watcher error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatcherError {
    /// A height inside the closing epoch is absent from the block window.
    /// Emitting an epoch without it would diverge across nodes.
    #[error("Missing block at height {height} while building epoch starting at {epoch_start}")]
    MissingBlock {
        /// Absent height
        height: Height,
        /// Start of the epoch being built
        epoch_start: Height,
    },

    /// A block was offered to the window out of sequence.
    #[error("Out-of-order block: expected height {expected}, got {got}")]
    OutOfOrderBlock {
        /// Next height the window accepts
        expected: Height,
        /// Height that was offered
        got: Height,
    },

    /// Startup liveness probe failed.
    #[error("Sanity check failed: {0}")]
    SanityCheck(String),

    /// The consumer dropped an output channel.
    #[error("Output channel closed: {0}")]
    OutputClosed(&'static str),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The source chain did not return a block for this height.
    #[error("Block unavailable at height {0}")]
    BlockUnavailable(Height),

    /// Transport or JSON-RPC failure.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The speedup peer could not be reached.
    #[error("Peer unavailable: {0}")]
    PeerUnavailable(String),

    /// The remote returned something that could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl WatcherError {
    /// Whether this error must stop the watcher.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WatcherError::MissingBlock { .. }
                | WatcherError::OutOfOrderBlock { .. }
                | WatcherError::SanityCheck(_)
                | WatcherError::OutputClosed(_)
                | WatcherError::InvalidConfig(_)
        )
    }
}
