//! Watcher runtime: wires clients into the service, drives it on its own
//! task and drains its output feeds.

use std::sync::Arc;

use anyhow::{Context, Result};
use mainnet_watcher::{
    EpochPeerClient, MainnetRpcClient, PeerRpcClient, SourceChainClient, WatcherApi,
    WatcherError, WatcherOutputs, WatcherService,
};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};
use watcher_telemetry::log_epoch_event;

use crate::config::NodeConfig;

/// What the consumer saw before the feeds closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Epochs received.
    pub epochs: usize,
    /// CC-epochs received.
    pub cc_epochs: usize,
    /// Number of the last epoch received.
    pub last_epoch_number: Option<i64>,
}

/// Handles of a started watcher.
pub struct RunningWatcher {
    /// Watcher task; resolves with the fatal error, if any.
    pub watcher: JoinHandle<Result<(), WatcherError>>,
    /// Epoch consumer task.
    pub consumer: JoinHandle<ConsumerStats>,
    /// Fires once the pipeline has caught up with the mainnet tip.
    pub caught_up: oneshot::Receiver<()>,
}

/// The watcher node runtime.
pub struct WatcherNode {
    config: NodeConfig,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl WatcherNode {
    /// Create a node runtime with configuration.
    pub fn new(config: NodeConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Start against the configured JSON-RPC endpoints.
    pub async fn start(&self) -> Result<RunningWatcher> {
        let source = MainnetRpcClient::new(&self.config.watcher)
            .context("Failed to create mainnet client")?;
        let peer = PeerRpcClient::new(&self.config.watcher)
            .context("Failed to create speedup peer client")?;
        self.start_with(Arc::new(source), Arc::new(peer)).await
    }

    /// Start against the given clients.
    ///
    /// ## Startup Sequence
    ///
    /// 1. Build the service from the checkpoint
    /// 2. Probe the mainnet node (unless skipped)
    /// 3. Spawn the watcher and the epoch consumer
    pub async fn start_with<S, P>(&self, source: Arc<S>, peer: Arc<P>) -> Result<RunningWatcher>
    where
        S: SourceChainClient + 'static,
        P: EpochPeerClient + 'static,
    {
        info!("===========================================");
        info!("  Mainnet Watcher v{}", mainnet_watcher::VERSION);
        info!("===========================================");
        info!("Mainnet RPC: {}", source.endpoint());
        if self.config.watcher.speedup {
            info!("Speedup peer: {}", peer.endpoint());
        }

        let (mut service, outputs) = WatcherService::new(
            self.config.watcher.clone(),
            self.config.checkpoint,
            source,
            peer,
        )
        .context("Failed to create watcher service")?;

        service
            .check_sanity(self.config.watcher.skip_sanity_check)
            .await
            .context("Mainnet sanity check failed")?;

        let (catchup_tx, caught_up) = oneshot::channel();
        let shutdown = self.shutdown_rx.clone();
        let watcher = tokio::spawn(async move { service.run(catchup_tx, shutdown).await });
        let consumer = tokio::spawn(consume_outputs(outputs));

        info!(
            last_epoch_end_height = self.config.checkpoint.last_epoch_end_height,
            last_epoch_num = self.config.checkpoint.last_known_epoch_num,
            "Watcher started"
        );
        Ok(RunningWatcher {
            watcher,
            consumer,
            caught_up,
        })
    }

    /// Signal the watcher to stop at its next loop turn.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }
}

/// Drain both feeds until the watcher drops them.
///
/// Stands in for the staking component: every epoch is logged.
pub async fn consume_outputs(mut outputs: WatcherOutputs) -> ConsumerStats {
    let mut stats = ConsumerStats::default();
    let mut cc_open = true;
    loop {
        tokio::select! {
            epoch = outputs.epochs.recv() => match epoch {
                Some(epoch) => {
                    log_epoch_event!(
                        info,
                        "consumer",
                        "Epoch received",
                        epoch,
                        nominations = epoch.nominations.len()
                    );
                    stats.epochs += 1;
                    stats.last_epoch_number = Some(epoch.number);
                }
                None => break,
            },
            cc_epoch = outputs.cc_epochs.recv(), if cc_open => match cc_epoch {
                Some(cc_epoch) => {
                    log_epoch_event!(
                        debug,
                        "consumer",
                        "CC epoch received",
                        cc_epoch,
                        transfers = cc_epoch.transfer_infos.len()
                    );
                    stats.cc_epochs += 1;
                }
                None => cc_open = false,
            },
        }
    }
    // Both senders live in the service, so the CC feed is closed too
    while let Ok(cc_epoch) = outputs.cc_epochs.try_recv() {
        log_epoch_event!(debug, "consumer", "CC epoch received", cc_epoch);
        stats.cc_epochs += 1;
    }
    stats
}
