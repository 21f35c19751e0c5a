//! # Test Fixtures
//!
//! A simulated mainnet whose tip grows as it is polled, and helpers to run
//! a watcher until it has produced a given number of epochs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mainnet_watcher::{
    ConfirmedBlock, Epoch, EpochPeerClient, Height, Nomination, SourceChainClient,
    WatcherCheckpoint, WatcherConfig, WatcherError, WatcherOutputs, WatcherService,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{oneshot, watch};

/// Validators that nominate in simulated blocks.
pub const VALIDATORS: usize = 6;

/// Deterministic chain of `length` blocks with a tip that advances by
/// `step` on every poll.
///
/// Timestamps jitter around a 600s spacing, so they are not monotonic.
pub struct GrowingChain {
    blocks: Vec<ConfirmedBlock>,
    tip: Mutex<Height>,
    step: Height,
    fetch_log: Mutex<Vec<(Height, Height)>>,
}

impl GrowingChain {
    /// Generate a chain from `seed`.
    pub fn new(seed: u64, length: Height, start_tip: Height, step: Height) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let blocks = (1..=length)
            .map(|height| {
                let timestamp = 1_600_000_000 + height * 600 + rng.gen_range(-900..900);
                let nominations = if rng.gen_bool(0.8) {
                    let validator = rng.gen_range(0..VALIDATORS) as u8;
                    vec![Nomination::new([validator; 32], 1)]
                } else {
                    vec![]
                };
                ConfirmedBlock::new(height, timestamp, nominations)
            })
            .collect();

        Self {
            blocks,
            tip: Mutex::new(start_tip.min(length)),
            step,
            fetch_log: Mutex::new(Vec::new()),
        }
    }

    /// Chain whose tip is already at its last block.
    pub fn complete(seed: u64, length: Height) -> Self {
        Self::new(seed, length, length, 0)
    }

    /// `(height, tip at fetch time)` for every block request.
    pub fn fetch_log(&self) -> Vec<(Height, Height)> {
        self.fetch_log.lock().clone()
    }

    /// Blocks `start..=end`, for computing expected epochs.
    pub fn blocks(&self, start: Height, end: Height) -> &[ConfirmedBlock] {
        &self.blocks[(start - 1) as usize..end as usize]
    }

    fn length(&self) -> Height {
        self.blocks.len() as Height
    }
}

#[async_trait]
impl SourceChainClient for GrowingChain {
    async fn get_latest_height(&self, _allow_cached: bool) -> Result<Height, WatcherError> {
        let mut tip = self.tip.lock();
        *tip = (*tip + self.step).min(self.length());
        Ok(*tip)
    }

    async fn get_block_by_height(
        &self,
        height: Height,
        _allow_cached: bool,
    ) -> Result<ConfirmedBlock, WatcherError> {
        let tip = *self.tip.lock();
        self.fetch_log.lock().push((height, tip));
        if height < 1 || height > tip {
            return Err(WatcherError::BlockUnavailable(height));
        }
        Ok(self.blocks[(height - 1) as usize].clone())
    }

    fn endpoint(&self) -> &str {
        "simulated-mainnet"
    }
}

/// Config with small epochs for integration runs.
pub fn small_epochs(num_blocks_in_epoch: Height, parallel_num: usize) -> WatcherConfig {
    WatcherConfig {
        num_blocks_in_epoch,
        parallel_num,
        ..WatcherConfig::for_testing()
    }
}

/// Run a watcher until it emits `count` epochs, then shut it down.
///
/// Panics if the epochs do not arrive within an hour of (virtual) time.
pub async fn run_for_epochs<S, P>(
    config: WatcherConfig,
    checkpoint: WatcherCheckpoint,
    source: Arc<S>,
    peer: Arc<P>,
    count: usize,
) -> Vec<Epoch>
where
    S: SourceChainClient + 'static,
    P: EpochPeerClient + 'static,
{
    let (mut service, outputs) = WatcherService::new(config, checkpoint, source, peer)
        .expect("valid config");
    let WatcherOutputs {
        mut epochs,
        cc_epochs: _cc_epochs,
    } = outputs;

    let (catchup_tx, _catchup_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { service.run(catchup_tx, shutdown_rx).await });

    let mut received = Vec::with_capacity(count);
    let collect = async {
        while received.len() < count {
            match epochs.recv().await {
                Some(epoch) => received.push(epoch),
                None => break,
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(3600), collect)
        .await
        .expect("epochs did not arrive in time");

    let _ = shutdown_tx.send(true);
    handle
        .await
        .expect("watcher task panicked")
        .expect("watcher stopped on fatal error");
    received
}
