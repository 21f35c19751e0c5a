//! # Outbound Ports
//!
//! Traits for the two remote endpoints the watcher depends on: the mainnet
//! node and, in speedup mode, a peer running this same watcher.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{CcEpoch, Epoch};
use std::collections::{HashMap, VecDeque};

use crate::domain::{ConfirmedBlock, Height, WatcherError};

/// Source chain connection - outbound port.
#[async_trait]
pub trait SourceChainClient: Send + Sync {
    /// Current tip height. `allow_cached` permits a recently cached value.
    async fn get_latest_height(&self, allow_cached: bool) -> Result<Height, WatcherError>;

    /// Block at `height`. An error means the block is not available right now.
    async fn get_block_by_height(
        &self,
        height: Height,
        allow_cached: bool,
    ) -> Result<ConfirmedBlock, WatcherError>;

    /// Endpoint identifier (for logging).
    fn endpoint(&self) -> &str;
}

/// Speedup peer connection - outbound port.
///
/// Ranges are half-open: `[from_number, to_number)`. An empty result means
/// the peer has nothing more.
#[async_trait]
pub trait EpochPeerClient: Send + Sync {
    /// Precomputed epochs by number.
    async fn get_epochs(&self, from_number: i64, to_number: i64) -> Result<Vec<Epoch>, WatcherError>;

    /// Precomputed CC-epochs by number.
    async fn get_cc_epochs(
        &self,
        from_number: i64,
        to_number: i64,
    ) -> Result<Vec<CcEpoch>, WatcherError>;

    /// Endpoint identifier (for logging).
    fn endpoint(&self) -> &str;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Scriptable in-memory mainnet.
///
/// Tip heights are served from a script; once it runs out, the last value
/// sticks. Every block fetch is logged with the tip last served, so tests
/// can check confirmation gating.
#[derive(Default)]
pub struct MockChainClient {
    blocks: Mutex<HashMap<Height, ConfirmedBlock>>,
    tips: Mutex<VecDeque<Height>>,
    last_tip: Mutex<Height>,
    failures: Mutex<HashMap<Height, u32>>,
    fetch_log: Mutex<Vec<(Height, Height)>>,
}

impl MockChainClient {
    /// Chain with the given blocks and a fixed tip.
    pub fn with_blocks(blocks: Vec<ConfirmedBlock>, tip: Height) -> Self {
        let client = Self::default();
        {
            let mut map = client.blocks.lock();
            for block in blocks {
                map.insert(block.height, block);
            }
        }
        *client.last_tip.lock() = tip;
        client
    }

    /// Chain of empty blocks `1..=count` with timestamps `1000 + h`.
    pub fn with_empty_blocks(count: Height, tip: Height) -> Self {
        let blocks = (1..=count)
            .map(|h| ConfirmedBlock::new(h, 1000 + h, vec![]))
            .collect();
        Self::with_blocks(blocks, tip)
    }

    /// Queue tip heights to serve before the sticky value.
    pub fn script_tips(&self, tips: impl IntoIterator<Item = Height>) {
        self.tips.lock().extend(tips);
    }

    /// Set the sticky tip.
    pub fn set_tip(&self, tip: Height) {
        let mut last = self.last_tip.lock();
        self.tips.lock().clear();
        *last = tip;
    }

    /// Add or replace a block.
    pub fn insert_block(&self, block: ConfirmedBlock) {
        self.blocks.lock().insert(block.height, block);
    }

    /// Make the next `times` fetches of `height` fail.
    pub fn fail_height(&self, height: Height, times: u32) {
        self.failures.lock().insert(height, times);
    }

    /// `(height, tip served before the fetch)` for every block request.
    pub fn fetch_log(&self) -> Vec<(Height, Height)> {
        self.fetch_log.lock().clone()
    }
}

#[async_trait]
impl SourceChainClient for MockChainClient {
    async fn get_latest_height(&self, _allow_cached: bool) -> Result<Height, WatcherError> {
        let mut last = self.last_tip.lock();
        if let Some(next) = self.tips.lock().pop_front() {
            *last = next;
        }
        if *last <= 0 {
            return Err(WatcherError::Rpc("Mock tip unavailable".to_string()));
        }
        Ok(*last)
    }

    async fn get_block_by_height(
        &self,
        height: Height,
        _allow_cached: bool,
    ) -> Result<ConfirmedBlock, WatcherError> {
        self.fetch_log.lock().push((height, *self.last_tip.lock()));

        {
            let mut failures = self.failures.lock();
            if let Some(remaining) = failures.get_mut(&height) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(WatcherError::BlockUnavailable(height));
                }
            }
        }

        self.blocks
            .lock()
            .get(&height)
            .cloned()
            .ok_or(WatcherError::BlockUnavailable(height))
    }

    fn endpoint(&self) -> &str {
        "mock-mainnet"
    }
}

/// In-memory speedup peer serving a fixed list of epochs.
#[derive(Default)]
pub struct MockEpochPeer {
    /// Epochs served, looked up by `number`.
    pub epochs: Vec<Epoch>,
    /// CC-epochs served, looked up by `number`.
    pub cc_epochs: Vec<CcEpoch>,
    /// Fail every request as if the peer were down.
    pub unreachable: bool,
    requests: Mutex<Vec<(i64, i64)>>,
}

impl MockEpochPeer {
    /// Peer serving the given epochs.
    pub fn with_epochs(epochs: Vec<Epoch>) -> Self {
        Self {
            epochs,
            ..Self::default()
        }
    }

    /// Peer serving the given CC-epochs and no epochs.
    pub fn with_cc_epochs(cc_epochs: Vec<CcEpoch>) -> Self {
        Self {
            cc_epochs,
            ..Self::default()
        }
    }

    /// Peer that fails every request.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Epoch ranges requested so far.
    pub fn requests(&self) -> Vec<(i64, i64)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl EpochPeerClient for MockEpochPeer {
    async fn get_epochs(&self, from_number: i64, to_number: i64) -> Result<Vec<Epoch>, WatcherError> {
        self.requests.lock().push((from_number, to_number));
        if self.unreachable {
            return Err(WatcherError::PeerUnavailable("Mock peer down".to_string()));
        }
        Ok(self
            .epochs
            .iter()
            .filter(|e| e.number >= from_number && e.number < to_number)
            .cloned()
            .collect())
    }

    async fn get_cc_epochs(
        &self,
        from_number: i64,
        to_number: i64,
    ) -> Result<Vec<CcEpoch>, WatcherError> {
        if self.unreachable {
            return Err(WatcherError::PeerUnavailable("Mock peer down".to_string()));
        }
        Ok(self
            .cc_epochs
            .iter()
            .filter(|e| e.number >= from_number && e.number < to_number)
            .cloned()
            .collect())
    }

    fn endpoint(&self) -> &str {
        "mock-peer"
    }
}
