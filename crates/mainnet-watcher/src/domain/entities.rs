//! # Domain Entities
//!
//! Confirmed blocks, the window that buffers them until their epoch closes,
//! and the process-local watcher state.

use super::errors::Height;
use serde::{Deserialize, Serialize};
use shared_types::{CcTransferInfo, Nomination};
use std::collections::HashMap;

/// A mainnet block that has reached confirmation depth.
///
/// Timestamps may regress between consecutive blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedBlock {
    /// Block height.
    pub height: Height,
    /// Block timestamp (unix seconds).
    pub timestamp: i64,
    /// Nominations found in this block, in block order.
    pub nominations: Vec<Nomination>,
    /// Bridge transfers found in this block.
    pub cc_transfer_infos: Vec<CcTransferInfo>,
}

impl ConfirmedBlock {
    /// Create a block without bridge transfers.
    pub fn new(height: Height, timestamp: i64, nominations: Vec<Nomination>) -> Self {
        Self {
            height,
            timestamp,
            nominations,
            cc_transfer_infos: Vec::new(),
        }
    }
}

/// Confirmed blocks not yet folded into a closed epoch.
///
/// Each height is stored at most once; later puts for the same height are
/// ignored.
#[derive(Clone, Debug, Default)]
pub struct FinalizedBlockWindow {
    blocks: HashMap<Height, ConfirmedBlock>,
}

impl FinalizedBlockWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a block. Returns `false` if the height was already present.
    pub fn put(&mut self, block: ConfirmedBlock) -> bool {
        match self.blocks.entry(block.height) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(block);
                true
            }
        }
    }

    /// Get the block at a height.
    pub fn get(&self, height: Height) -> Option<&ConfirmedBlock> {
        self.blocks.get(&height)
    }

    /// Whether a height is buffered.
    pub fn contains(&self, height: Height) -> bool {
        self.blocks.contains_key(&height)
    }

    /// Number of buffered blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Remove `from` and every contiguous lower height, stopping at the
    /// first gap. Returns the number of evicted blocks.
    pub fn evict_down_from(&mut self, from: Height) -> usize {
        let mut height = from;
        let mut evicted = 0;
        while self.blocks.remove(&height).is_some() {
            evicted += 1;
            height -= 1;
        }
        evicted
    }

    /// Lowest buffered height.
    pub fn lowest_height(&self) -> Option<Height> {
        self.blocks.keys().min().copied()
    }
}

/// Durable resume point supplied by the consensus component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherCheckpoint {
    /// Last mainnet height covered by a closed epoch.
    pub last_epoch_end_height: Height,
    /// Last mainnet height covered by a closed CC-epoch.
    pub last_cc_epoch_end_height: Height,
    /// Number of the last epoch the consumer has seen.
    pub last_known_epoch_num: i64,
    /// Number of the last CC-epoch the consumer has seen.
    pub last_known_cc_epoch_num: i64,
}

/// Process-local watcher state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WatcherState {
    /// High-water mark of confirmed blocks.
    pub latest_finalized_height: Height,
    /// Last height folded into an epoch.
    pub last_epoch_end_height: Height,
    /// Number of the last epoch emitted.
    pub last_known_epoch_num: i64,
    /// Last height folded into a CC-epoch.
    pub last_cc_epoch_end_height: Height,
    /// Number of the last CC-epoch emitted.
    pub last_known_cc_epoch_num: i64,
    /// Catch-up signal already sent.
    pub caught_up: bool,
}

impl From<WatcherCheckpoint> for WatcherState {
    fn from(cp: WatcherCheckpoint) -> Self {
        Self {
            latest_finalized_height: cp.last_epoch_end_height,
            last_epoch_end_height: cp.last_epoch_end_height,
            last_known_epoch_num: cp.last_known_epoch_num,
            last_cc_epoch_end_height: cp.last_cc_epoch_end_height,
            last_known_cc_epoch_num: cp.last_known_cc_epoch_num,
            caught_up: false,
        }
    }
}

impl WatcherState {
    /// Next height the pipeline will try to finalize.
    pub fn next_height(&self) -> Height {
        self.latest_finalized_height + 1
    }

    /// Number of finalized blocks not yet folded into an epoch.
    pub fn pending_epoch_blocks(&self) -> Height {
        self.latest_finalized_height - self.last_epoch_end_height
    }
}
