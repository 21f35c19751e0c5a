//! # Domain Invariants
//!
//! Rules that must hold on every node for epochs to stay identical.

use super::errors::{Height, WatcherError};
use shared_types::Epoch;

/// Blocks a height must sit behind the tip before it is final.
pub const FINALITY_CONFIRMATIONS: Height = 9;

/// Number of closed epochs kept in memory.
pub const RETAINED_EPOCHS: usize = 5;

/// Default epoch size (one BCH difficulty period).
pub const DEFAULT_BLOCKS_IN_EPOCH: Height = 2016;

/// Default CC-epoch size.
pub const DEFAULT_BLOCKS_IN_CC_EPOCH: Height = 7;

/// Default width of a parallel fetch batch.
pub const DEFAULT_PARALLEL_NUM: usize = 10;

/// Invariant: a height is final only once the tip is far enough ahead.
pub fn invariant_finalized(height: Height, tip: Height) -> bool {
    tip >= height + FINALITY_CONFIRMATIONS
}

/// Invariant: epochs cover contiguous, non-overlapping height ranges.
pub fn invariant_contiguous(epochs: &[Epoch], num_blocks_in_epoch: Height) -> Result<(), WatcherError> {
    for pair in epochs.windows(2) {
        let expected = pair[0].end_height(num_blocks_in_epoch) + 1;
        if pair[1].start_height != expected {
            return Err(WatcherError::OutOfOrderBlock {
                expected,
                got: pair[1].start_height,
            });
        }
    }
    Ok(())
}

/// Number of CC-epochs that span the same heights as the retained epochs.
pub fn retained_cc_epochs(num_blocks_in_epoch: Height, num_blocks_in_cc_epoch: Height) -> usize {
    let ratio = (num_blocks_in_epoch / num_blocks_in_cc_epoch.max(1)).max(1);
    RETAINED_EPOCHS * ratio as usize
}
