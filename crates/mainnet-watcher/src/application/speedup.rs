//! # Epoch Speedup
//!
//! Before fetching blocks, a watcher may pull already-closed epochs from a
//! peer and skip the blocks they cover.

use shared_types::Epoch;
use tracing::{info, warn};

use super::service::WatcherService;
use crate::algorithms::trim_front;
use crate::domain::{
    invariant_contiguous, retained_cc_epochs, Height, WatcherError, RETAINED_EPOCHS,
};
use crate::metrics;
use crate::ports::{EpochPeerClient, SourceChainClient};

/// Why speedup stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeedupOutcome {
    /// Speedup is switched off.
    Disabled,
    /// Fewer than one epoch of blocks left before the tip.
    CaughtUp,
    /// The peer returned an empty page.
    Exhausted,
    /// The peer could not be reached.
    PeerUnavailable,
    /// The peer's epochs did not continue our finalized height or our
    /// epoch numbering.
    Diverged,
}

/// Result of a speedup pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpeedupReport {
    /// Why the pass stopped.
    pub outcome: SpeedupOutcome,
    /// Epochs accepted from the peer.
    pub epochs_received: usize,
    /// CC-epochs accepted from the peer.
    pub cc_epochs_received: usize,
}

impl SpeedupReport {
    fn disabled() -> Self {
        Self {
            outcome: SpeedupOutcome::Disabled,
            epochs_received: 0,
            cc_epochs_received: 0,
        }
    }
}

impl<S, P> WatcherService<S, P>
where
    S: SourceChainClient + 'static,
    P: EpochPeerClient + 'static,
{
    /// Page epochs from the peer until it runs dry or we are within one
    /// epoch of `tip`, then hand off to block fetching.
    ///
    /// Peer failures end speedup without failing the watcher.
    ///
    /// # Errors
    /// - `OutputClosed` if the epoch consumer is gone
    pub async fn epoch_speedup(&mut self, tip: Height) -> Result<SpeedupReport, WatcherError> {
        if !self.config.speedup {
            return Ok(SpeedupReport::disabled());
        }

        let epoch_size = self.config.num_blocks_in_epoch;
        let page_size = self.config.speedup_page_size as i64;
        let mut start = self.state.last_known_epoch_num + 1;
        let mut epochs_received = 0;

        let outcome = loop {
            if tip < self.state.latest_finalized_height + epoch_size {
                break SpeedupOutcome::CaughtUp;
            }
            let page = match self.peer.get_epochs(start, start + page_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("[watcher] Speedup peer {} failed: {}", self.peer.endpoint(), e);
                    break SpeedupOutcome::PeerUnavailable;
                }
            };
            if page.is_empty() {
                break SpeedupOutcome::Exhausted;
            }
            if !self.continues_finalized(&page, start) {
                warn!(
                    first_number = page[0].number,
                    expected_number = start,
                    first_start = page[0].start_height,
                    latest_finalized = self.state.latest_finalized_height,
                    "[watcher] Speedup page does not continue local chain, ignoring"
                );
                break SpeedupOutcome::Diverged;
            }

            info!(
                from = start,
                count = page.len(),
                "[watcher] Got epochs from speedup peer"
            );
            start += page.len() as i64;
            epochs_received += page.len();
            for epoch in page {
                self.accept_peer_epoch(epoch)?;
            }
        };

        let cc_epochs_received = self.cc_epoch_speedup().await?;

        self.state.last_epoch_end_height = self.state.latest_finalized_height;
        trim_front(&mut self.epochs, RETAINED_EPOCHS);
        info!(
            ?outcome,
            latest_finalized = self.state.latest_finalized_height,
            last_known_epoch = self.state.last_known_epoch_num,
            "[watcher] Speedup finished"
        );
        Ok(SpeedupReport {
            outcome,
            epochs_received,
            cc_epochs_received,
        })
    }

    /// Pull CC-epochs from the peer while the bridge is enabled.
    ///
    /// # Errors
    /// - `OutputClosed` if the CC-epoch consumer is gone
    pub async fn cc_epoch_speedup(&mut self) -> Result<usize, WatcherError> {
        if !self.config.cc_bridge_enabled {
            return Ok(0);
        }

        let page_size = self.config.speedup_page_size as i64;
        let mut start = self.state.last_known_cc_epoch_num + 1;
        let mut received = 0;
        loop {
            let page = match self.peer.get_cc_epochs(start, start + page_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("[watcher] CC speedup peer {} failed: {}", self.peer.endpoint(), e);
                    break;
                }
            };
            if page.is_empty() {
                break;
            }
            start += page.len() as i64;
            received += page.len();
            for cc_epoch in page {
                self.state.last_known_cc_epoch_num = cc_epoch.number;
                self.state.last_cc_epoch_end_height =
                    cc_epoch.start_height + self.config.num_blocks_in_cc_epoch - 1;
                self.cc_epochs.push(cc_epoch.clone());
                self.cc_epoch_tx
                    .send(cc_epoch)
                    .map_err(|_| WatcherError::OutputClosed("cc epoch"))?;
                metrics::record_cc_epoch_emitted();
            }
        }

        trim_front(
            &mut self.cc_epochs,
            retained_cc_epochs(self.config.num_blocks_in_epoch, self.config.num_blocks_in_cc_epoch),
        );
        if received > 0 {
            info!(count = received, "[watcher] Got cc epochs from speedup peer");
        }
        Ok(received)
    }

    /// A page is usable if it is internally contiguous, its first epoch
    /// starts right after our finalized height and it is numbered
    /// `first_number, first_number + 1, ...`.
    fn continues_finalized(&self, page: &[Epoch], first_number: i64) -> bool {
        page[0].start_height == self.state.latest_finalized_height + 1
            && invariant_contiguous(page, self.config.num_blocks_in_epoch).is_ok()
            && page
                .iter()
                .zip(first_number..)
                .all(|(epoch, number)| epoch.number == number)
    }

    fn accept_peer_epoch(&mut self, epoch: Epoch) -> Result<(), WatcherError> {
        self.state.latest_finalized_height += self.config.num_blocks_in_epoch;
        self.state.last_known_epoch_num = epoch.number;
        self.epochs.push(epoch.clone());
        metrics::record_block_finalized(self.state.latest_finalized_height);

        // Peers may report a placeholder for an epoch they have not closed
        if epoch.is_closed() {
            self.epoch_tx
                .send(epoch)
                .map_err(|_| WatcherError::OutputClosed("epoch"))?;
            metrics::record_epoch_emitted("speedup");
        }
        Ok(())
    }
}
