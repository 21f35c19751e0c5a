//! # Fetch Pipeline
//!
//! Confirmation-gated block fetching. Heights are finalized strictly in
//! order; a batch is only used when the whole batch is already final.

use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use super::service::WatcherService;
use crate::algorithms::{is_caught_up, plan_fetch, FetchStep};
use crate::domain::{ConfirmedBlock, Height, WatcherError};
use crate::metrics;
use crate::ports::{EpochPeerClient, SourceChainClient};

impl<S, P> WatcherService<S, P>
where
    S: SourceChainClient + 'static,
    P: EpochPeerClient + 'static,
{
    /// Fetch confirmed blocks forever, closing epochs as they fill.
    ///
    /// Returns `Ok(())` once `shutdown` flips to `true`, or the first fatal
    /// error.
    pub async fn fetch_blocks(
        &mut self,
        catchup_tx: oneshot::Sender<()>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), WatcherError> {
        let mut catchup_tx = Some(catchup_tx);
        self.align_cc_window();

        loop {
            if *shutdown.borrow() {
                info!(
                    latest_finalized = self.state.latest_finalized_height,
                    "[watcher] Shutdown requested, stopping fetch loop"
                );
                return Ok(());
            }

            // 0 means the tip is unknown, which says nothing about the gap
            let tip = self.latest_height(true).await;
            if !self.state.caught_up
                && tip > 0
                && is_caught_up(self.state.latest_finalized_height, tip)
            {
                self.signal_catchup(&mut catchup_tx, tip);
            }

            let progressed = match plan_fetch(self.state.next_height(), tip, self.config.parallel_num) {
                FetchStep::Wait => false,
                _ => self.drain_confirmed(tip, &shutdown).await?,
            };
            if !progressed {
                self.suspend(&mut shutdown).await;
            }
        }
    }

    /// Finalize every height that is confirmed against `tip`.
    ///
    /// Returns `false` if a single fetch failed; the loop then backs off and
    /// retries the same height against a fresh tip.
    async fn drain_confirmed(
        &mut self,
        tip: Height,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<bool, WatcherError> {
        loop {
            if *shutdown.borrow() {
                return Ok(true);
            }
            match plan_fetch(self.state.next_height(), tip, self.config.parallel_num) {
                FetchStep::Wait => return Ok(true),
                FetchStep::Single(height) => {
                    match self.source.get_block_by_height(height, true).await {
                        Ok(block) => self.add_finalized_block(height, Some(block))?,
                        Err(e) => {
                            warn!("[watcher] Failed to fetch block {}: {}", height, e);
                            metrics::record_fetch_retry();
                            return Ok(false);
                        }
                    }
                }
                FetchStep::Batch { from, count } => {
                    let blocks = self.fetch_batch(from, count).await;
                    for (offset, block) in blocks.into_iter().enumerate() {
                        self.add_finalized_block(from + offset as Height, block)?;
                    }
                }
            }
        }
    }

    /// Fetch `count` heights from `from` concurrently.
    ///
    /// Each slot is retried `batch_slot_retries` times. Slots that still
    /// fail come back as `None`, in height order.
    async fn fetch_batch(&self, from: Height, count: usize) -> Vec<Option<ConfirmedBlock>> {
        let attempts = self.config.batch_slot_retries + 1;
        let handles = (0..count as Height).map(|offset| {
            let source = Arc::clone(&self.source);
            let height = from + offset;
            tokio::spawn(async move {
                for attempt in 1..=attempts {
                    match source.get_block_by_height(height, true).await {
                        Ok(block) => return Some(block),
                        Err(e) => {
                            debug!(
                                "[watcher] Batch fetch of {} failed (attempt {}/{}): {}",
                                height, attempt, attempts, e
                            );
                            metrics::record_fetch_retry();
                        }
                    }
                }
                None
            })
        });

        futures::future::join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(offset, joined)| match joined {
                Ok(block) => block,
                Err(e) => {
                    warn!(
                        "[watcher] Batch task for {} aborted: {}",
                        from + offset as Height,
                        e
                    );
                    None
                }
            })
            .collect()
    }

    /// Sleep for the waiting-block delay, waking early on a shutdown change.
    async fn suspend(&self, shutdown: &mut watch::Receiver<bool>) {
        let delay = self.config.waiting_block_delay();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                // Sender gone: nobody can request shutdown any more
                if changed.is_err() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn signal_catchup(&mut self, catchup_tx: &mut Option<oneshot::Sender<()>>, tip: Height) {
        self.state.caught_up = true;
        metrics::set_caught_up(true);
        info!(
            latest_finalized = self.state.latest_finalized_height,
            tip, "[watcher] Caught up with mainnet"
        );
        if let Some(tx) = catchup_tx.take() {
            if tx.send(()).is_err() {
                debug!("[watcher] Catch-up receiver dropped");
            }
        }
    }

    /// CC-epochs can only be derived from blocks the window will hold. If the
    /// CC boundary lags the pipeline start, skip ahead to it.
    fn align_cc_window(&mut self) {
        if !self.config.cc_bridge_enabled {
            return;
        }
        if self.state.last_cc_epoch_end_height < self.state.latest_finalized_height {
            warn!(
                last_cc_epoch_end = self.state.last_cc_epoch_end_height,
                latest_finalized = self.state.latest_finalized_height,
                "[watcher] CC-epoch boundary behind pipeline start, realigning"
            );
            self.state.last_cc_epoch_end_height = self.state.latest_finalized_height;
        }
    }
}
