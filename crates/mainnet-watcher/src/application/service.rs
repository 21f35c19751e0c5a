//! # Watcher Service
//!
//! Owns all aggregation state: the block window, epoch histories and
//! heights. Only the task running the service mutates it, so none of it is
//! locked.

use std::sync::Arc;

use shared_types::{CcEpoch, Epoch};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::algorithms::{build_cc_epoch, build_epoch, reclaim_memory};
use crate::config::WatcherConfig;
use crate::domain::{
    ConfirmedBlock, FinalizedBlockWindow, Height, WatcherCheckpoint, WatcherError, WatcherState,
};
use crate::metrics;
use crate::ports::{EpochPeerClient, SourceChainClient, WatcherApi};

/// Receiving ends handed to the staking component.
pub struct WatcherOutputs {
    /// Epochs in ascending, contiguous order.
    pub epochs: mpsc::UnboundedReceiver<Epoch>,
    /// CC-epochs (only fed while the bridge is enabled).
    pub cc_epochs: mpsc::UnboundedReceiver<CcEpoch>,
}

/// Mainnet Watcher Service - fetches confirmed blocks and emits epochs.
pub struct WatcherService<S: SourceChainClient, P: EpochPeerClient> {
    /// Configuration.
    pub(super) config: WatcherConfig,
    /// Mainnet node.
    pub(super) source: Arc<S>,
    /// Speedup peer.
    pub(super) peer: Arc<P>,
    /// Heights and epoch numbers.
    pub(super) state: WatcherState,
    /// Confirmed blocks awaiting their epoch.
    pub(super) window: FinalizedBlockWindow,
    /// Recently closed epochs, oldest first.
    pub(super) epochs: Vec<Epoch>,
    /// Recently closed CC-epochs, oldest first.
    pub(super) cc_epochs: Vec<CcEpoch>,
    /// Epoch feed.
    pub(super) epoch_tx: mpsc::UnboundedSender<Epoch>,
    /// CC-epoch feed.
    pub(super) cc_epoch_tx: mpsc::UnboundedSender<CcEpoch>,
}

impl<S, P> WatcherService<S, P>
where
    S: SourceChainClient + 'static,
    P: EpochPeerClient + 'static,
{
    /// Create a watcher resuming from `checkpoint`.
    ///
    /// # Errors
    /// - `InvalidConfig` if the configuration does not validate
    pub fn new(
        config: WatcherConfig,
        checkpoint: WatcherCheckpoint,
        source: Arc<S>,
        peer: Arc<P>,
    ) -> Result<(Self, WatcherOutputs), WatcherError> {
        config.validate()?;
        let (epoch_tx, epochs) = mpsc::unbounded_channel();
        let (cc_epoch_tx, cc_epochs) = mpsc::unbounded_channel();

        let service = Self {
            config,
            source,
            peer,
            state: WatcherState::from(checkpoint),
            window: FinalizedBlockWindow::new(),
            epochs: Vec::with_capacity(10),
            cc_epochs: Vec::new(),
            epoch_tx,
            cc_epoch_tx,
        };
        Ok((service, WatcherOutputs { epochs, cc_epochs }))
    }

    /// Run the watcher until shutdown or a fatal error.
    ///
    /// Speedup (if enabled) runs first, then the fetch pipeline. `catchup_tx`
    /// fires once, the first time the pipeline is within confirmation depth
    /// of the tip.
    pub async fn run(
        &mut self,
        catchup_tx: oneshot::Sender<()>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), WatcherError> {
        let tip = self.latest_height(true).await;
        let report = self.epoch_speedup(tip).await?;
        debug!("[watcher] Speedup finished: {:?}", report);

        let result = self.fetch_blocks(catchup_tx, shutdown).await;
        if let Err(e) = &result {
            error!(
                latest_finalized = self.state.latest_finalized_height,
                "[watcher] Stopping on fatal error: {}", e
            );
        }
        result
    }

    /// Configuration in use.
    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Blocks currently buffered.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Whether a height is buffered.
    pub fn window_contains(&self, height: Height) -> bool {
        self.window.contains(height)
    }

    /// Most recent closed CC-epochs, oldest first.
    pub fn retained_cc_epochs(&self) -> &[CcEpoch] {
        &self.cc_epochs
    }

    /// Tip height, or 0 when the node cannot tell.
    pub(super) async fn latest_height(&self, allow_cached: bool) -> Height {
        match self.source.get_latest_height(allow_cached).await {
            Ok(height) if height > 0 => height,
            Ok(height) => {
                warn!("[watcher] Non-positive tip height {} from {}", height, self.source.endpoint());
                0
            }
            Err(e) => {
                warn!("[watcher] Failed to get tip from {}: {}", self.source.endpoint(), e);
                0
            }
        }
    }

    /// Record the block at `height` (absent if a batch slot could not be
    /// fetched) and close an epoch when the window reaches epoch size.
    ///
    /// # Errors
    /// - `OutOfOrderBlock` if `height` is not the next expected height
    /// - `MissingBlock` if the closing epoch has a hole
    /// - `OutputClosed` if the consumer is gone
    pub fn add_finalized_block(
        &mut self,
        height: Height,
        block: Option<ConfirmedBlock>,
    ) -> Result<(), WatcherError> {
        let expected = self.state.next_height();
        if height != expected {
            return Err(WatcherError::OutOfOrderBlock {
                expected,
                got: height,
            });
        }

        match block {
            Some(block) if block.height != height => {
                return Err(WatcherError::OutOfOrderBlock {
                    expected: height,
                    got: block.height,
                });
            }
            Some(block) => {
                self.window.put(block);
            }
            None => {
                warn!("[watcher] Block {} absent after batch fetch", height);
            }
        }

        self.state.latest_finalized_height = height;
        metrics::record_block_finalized(height);
        metrics::set_window_blocks(self.window.len());

        if self.state.pending_epoch_blocks() == self.config.num_blocks_in_epoch {
            self.generate_new_epoch()?;
        }
        if self.config.cc_bridge_enabled
            && self.state.latest_finalized_height - self.state.last_cc_epoch_end_height
                == self.config.num_blocks_in_cc_epoch
        {
            self.generate_new_cc_epoch()?;
        }
        Ok(())
    }

    fn generate_new_epoch(&mut self) -> Result<(), WatcherError> {
        let start = self.state.last_epoch_end_height + 1;
        let end = self.state.latest_finalized_height;
        let mut epoch = build_epoch(&self.window, start, end)?;
        epoch.number = self.state.last_known_epoch_num + 1;

        info!(
            epoch_number = epoch.number,
            start_height = epoch.start_height,
            end_time = epoch.end_time,
            nominations = epoch.nominations.len(),
            "[watcher] Generated new epoch"
        );

        self.epochs.push(epoch.clone());
        self.epoch_tx
            .send(epoch)
            .map_err(|_| WatcherError::OutputClosed("epoch"))?;
        metrics::record_epoch_emitted("derived");

        self.state.last_known_epoch_num += 1;
        self.state.last_epoch_end_height = end;
        self.clear_old_data();
        Ok(())
    }

    fn generate_new_cc_epoch(&mut self) -> Result<(), WatcherError> {
        let start = self.state.last_cc_epoch_end_height + 1;
        let end = self.state.latest_finalized_height;
        let mut cc_epoch = build_cc_epoch(&self.window, start, end)?;
        cc_epoch.number = self.state.last_known_cc_epoch_num + 1;

        debug!(
            epoch_number = cc_epoch.number,
            start_height = cc_epoch.start_height,
            "[watcher] Generated new cc epoch"
        );

        self.cc_epochs.push(cc_epoch.clone());
        self.cc_epoch_tx
            .send(cc_epoch)
            .map_err(|_| WatcherError::OutputClosed("cc epoch"))?;
        metrics::record_cc_epoch_emitted();

        self.state.last_known_cc_epoch_num += 1;
        self.state.last_cc_epoch_end_height = end;
        Ok(())
    }

    /// Evict old window entries and trim histories.
    pub(super) fn clear_old_data(&mut self) {
        let stats = reclaim_memory(
            &mut self.window,
            &mut self.epochs,
            &mut self.cc_epochs,
            self.config.num_blocks_in_epoch,
            self.config.num_blocks_in_cc_epoch,
        );
        if stats.blocks_evicted > 0 {
            debug!(
                evicted = stats.blocks_evicted,
                remaining = self.window.len(),
                "[watcher] Cleared old blocks"
            );
        }
        if self.window.len() > self.config.num_blocks_to_clear_memory {
            warn!(
                window = self.window.len(),
                threshold = self.config.num_blocks_to_clear_memory,
                "[watcher] Block window above memory threshold"
            );
        }
        metrics::set_window_blocks(self.window.len());
    }
}

#[async_trait::async_trait]
impl<S, P> WatcherApi for WatcherService<S, P>
where
    S: SourceChainClient + 'static,
    P: EpochPeerClient + 'static,
{
    async fn check_sanity(&self, skip_check: bool) -> Result<(), WatcherError> {
        if skip_check {
            return Ok(());
        }
        let height = self
            .source
            .get_latest_height(false)
            .await
            .map_err(|e| WatcherError::SanityCheck(format!("get latest height failed: {}", e)))?;
        if height <= 0 {
            return Err(WatcherError::SanityCheck(format!(
                "get latest height returned {}",
                height
            )));
        }
        self.source
            .get_block_by_height(height, false)
            .await
            .map_err(|e| {
                WatcherError::SanityCheck(format!("get block at tip {} failed: {}", height, e))
            })?;
        info!(tip = height, "[watcher] Sanity check passed");
        Ok(())
    }

    fn current_epoch(&self) -> Result<Epoch, WatcherError> {
        let mut epoch = build_epoch(
            &self.window,
            self.state.last_epoch_end_height + 1,
            self.state.latest_finalized_height,
        )?;
        epoch.number = self.state.last_known_epoch_num + 1;
        Ok(epoch)
    }

    fn state(&self) -> WatcherState {
        self.state.clone()
    }

    fn retained_epochs(&self) -> &[Epoch] {
        &self.epochs
    }
}
