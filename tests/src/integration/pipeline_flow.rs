//! # Pipeline Flow
//!
//! End-to-end runs of the fetch pipeline against a simulated mainnet:
//!
//! 1. **Determinism**: batched and sequential fetching emit identical epochs
//! 2. **Finality gating**: no block is requested before 9 confirmations
//! 3. **Resume**: a restart from a checkpoint continues the same sequence

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use mainnet_watcher::{
        build_epoch, Epoch, FinalizedBlockWindow, Height, MockEpochPeer, WatcherCheckpoint,
    };

    use crate::integration::fixtures::{run_for_epochs, small_epochs, GrowingChain};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Epochs computed directly from the chain's blocks.
    fn expected_epochs(chain: &GrowingChain, size: Height, count: usize) -> Vec<Epoch> {
        let mut window = FinalizedBlockWindow::new();
        (0..count)
            .map(|i| {
                let start = 1 + i as Height * size;
                let end = start + size - 1;
                for block in chain.blocks(start, end) {
                    window.put(block.clone());
                }
                let mut epoch = build_epoch(&window, start, end).expect("blocks present");
                epoch.number = i as i64 + 1;
                epoch
            })
            .collect()
    }

    fn no_peer() -> Arc<MockEpochPeer> {
        Arc::new(MockEpochPeer::default())
    }

    // =============================================================================
    // DETERMINISM
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_sequential_and_batched_fetch_agree() {
        let chain = Arc::new(GrowingChain::complete(7, 200));

        let sequential = run_for_epochs(
            small_epochs(10, 1),
            WatcherCheckpoint::default(),
            Arc::clone(&chain),
            no_peer(),
            15,
        )
        .await;
        let batched = run_for_epochs(
            small_epochs(10, 8),
            WatcherCheckpoint::default(),
            Arc::clone(&chain),
            no_peer(),
            15,
        )
        .await;

        assert_eq!(sequential.len(), 15);
        assert_eq!(sequential, batched);
        assert_eq!(sequential, expected_epochs(&chain, 10, 15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_epoch_contents_match_blocks() {
        let chain = Arc::new(GrowingChain::complete(21, 120));
        let epochs = run_for_epochs(
            small_epochs(10, 4),
            WatcherCheckpoint::default(),
            Arc::clone(&chain),
            no_peer(),
            8,
        )
        .await;

        for epoch in &epochs {
            let blocks = chain.blocks(epoch.start_height, epoch.start_height + 9);

            let max_time = blocks.iter().map(|b| b.timestamp).max().unwrap();
            assert_eq!(epoch.end_time, max_time);

            let mut tally: HashMap<[u8; 32], i64> = HashMap::new();
            for nomination in blocks.iter().flat_map(|b| &b.nominations) {
                *tally.entry(nomination.pubkey).or_default() += nomination.nominated_count;
            }
            assert_eq!(epoch.nominations.len(), tally.len());
            for nomination in &epoch.nominations {
                assert_eq!(tally[&nomination.pubkey], nomination.nominated_count);
            }

            for pair in epoch.nominations.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                assert!(
                    a.nominated_count > b.nominated_count
                        || (a.nominated_count == b.nominated_count && a.pubkey < b.pubkey)
                );
            }
        }
    }

    // =============================================================================
    // FINALITY GATING
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_growing_chain_respects_confirmations() {
        let chain = Arc::new(GrowingChain::new(11, 150, 20, 2));
        let epochs = run_for_epochs(
            small_epochs(10, 4),
            WatcherCheckpoint::default(),
            Arc::clone(&chain),
            no_peer(),
            10,
        )
        .await;

        for (i, epoch) in epochs.iter().enumerate() {
            assert_eq!(epoch.number, i as i64 + 1);
            assert_eq!(epoch.start_height, 1 + 10 * i as Height);
        }
        for (height, tip) in chain.fetch_log() {
            assert!(tip >= height + 9, "block {} fetched at tip {}", height, tip);
        }
    }

    // =============================================================================
    // RESUME
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_resume_from_checkpoint_matches_full_run() {
        let chain = Arc::new(GrowingChain::complete(3, 200));
        let full = run_for_epochs(
            small_epochs(10, 4),
            WatcherCheckpoint::default(),
            Arc::clone(&chain),
            no_peer(),
            12,
        )
        .await;

        let checkpoint = WatcherCheckpoint {
            last_epoch_end_height: 50,
            last_known_epoch_num: 5,
            ..Default::default()
        };
        let resumed = run_for_epochs(
            small_epochs(10, 4),
            checkpoint,
            Arc::clone(&chain),
            no_peer(),
            7,
        )
        .await;

        assert_eq!(resumed, full[5..].to_vec());
    }
}
