//! # Speedup Handoff
//!
//! A watcher bootstrapping from a peer must end up emitting exactly what a
//! watcher deriving everything locally emits:
//!
//! 1. **Handoff**: peer epochs first, then local derivation from the next height
//! 2. **Degraded peer**: unreachable or inconsistent peers fall back to derivation
//! 3. **Node runtime**: the same flow driven through `WatcherNode`

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mainnet_watcher::{Epoch, MockEpochPeer, WatcherCheckpoint, WatcherConfig};
    use watcher_node::{NodeConfig, WatcherNode};

    use crate::integration::fixtures::{run_for_epochs, small_epochs, GrowingChain};

    fn speedup_config() -> WatcherConfig {
        WatcherConfig {
            speedup: true,
            speedup_page_size: 5,
            ..small_epochs(10, 4)
        }
    }

    async fn local_run(chain: &Arc<GrowingChain>, count: usize) -> Vec<Epoch> {
        run_for_epochs(
            small_epochs(10, 4),
            WatcherCheckpoint::default(),
            Arc::clone(chain),
            Arc::new(MockEpochPeer::default()),
            count,
        )
        .await
    }

    // =============================================================================
    // HANDOFF
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_speedup_then_derivation_matches_local_run() {
        let chain = Arc::new(GrowingChain::complete(5, 300));
        let local = local_run(&chain, 20).await;

        // same seed, fresh fetch log
        let fresh = Arc::new(GrowingChain::complete(5, 300));
        let peer = Arc::new(MockEpochPeer::with_epochs(local[..12].to_vec()));
        let bootstrapped = run_for_epochs(
            speedup_config(),
            WatcherCheckpoint::default(),
            Arc::clone(&fresh),
            Arc::clone(&peer),
            20,
        )
        .await;

        assert_eq!(bootstrapped, local);
        // pages [1,6), [6,11), [11,16), then an empty [13,18)
        assert_eq!(peer.requests(), vec![(1, 6), (6, 11), (11, 16), (13, 18)]);
        // nothing covered by the peer was fetched
        assert!(fresh.fetch_log().iter().all(|(height, _)| *height > 120));
    }

    // =============================================================================
    // DEGRADED PEER
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_peer_falls_back_to_derivation() {
        let chain = Arc::new(GrowingChain::complete(9, 200));
        let local = local_run(&chain, 10).await;

        let derived = run_for_epochs(
            speedup_config(),
            WatcherCheckpoint::default(),
            Arc::clone(&chain),
            Arc::new(MockEpochPeer::unreachable()),
            10,
        )
        .await;

        assert_eq!(derived, local);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inconsistent_peer_is_ignored() {
        let chain = Arc::new(GrowingChain::complete(13, 200));
        let local = local_run(&chain, 10).await;

        let shifted: Vec<Epoch> = local
            .iter()
            .map(|epoch| Epoch {
                start_height: epoch.start_height + 1,
                ..epoch.clone()
            })
            .collect();
        let derived = run_for_epochs(
            speedup_config(),
            WatcherCheckpoint::default(),
            Arc::clone(&chain),
            Arc::new(MockEpochPeer::with_epochs(shifted)),
            10,
        )
        .await;

        assert_eq!(derived, local);
    }

    // =============================================================================
    // NODE RUNTIME
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_node_runtime_with_speedup() {
        let chain = Arc::new(GrowingChain::complete(17, 100));
        let local = local_run(&chain, 9).await;

        let node = WatcherNode::new(NodeConfig {
            watcher: speedup_config(),
            checkpoint: WatcherCheckpoint::default(),
        });
        let running = node
            .start_with(
                Arc::clone(&chain),
                Arc::new(MockEpochPeer::with_epochs(local[..5].to_vec())),
            )
            .await
            .expect("node starts");

        // tip 100 -> heights up to 91 are final -> 9 epochs in total
        running.caught_up.await.expect("caught up");
        node.shutdown();
        running
            .watcher
            .await
            .expect("watcher task")
            .expect("no fatal error");

        let stats = running.consumer.await.expect("consumer task");
        assert_eq!(stats.epochs, 9);
        assert_eq!(stats.last_epoch_number, Some(9));
    }
}
