//! # Memory Reclaim
//!
//! Bounds the block window and the retained epoch histories after an
//! epoch closes.

use shared_types::{CcEpoch, Epoch};

use crate::domain::{retained_cc_epochs, FinalizedBlockWindow, Height, RETAINED_EPOCHS};

/// What a reclaim pass removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReclaimStats {
    /// Blocks evicted from the window.
    pub blocks_evicted: usize,
    /// Epochs dropped from history.
    pub epochs_trimmed: usize,
    /// CC-epochs dropped from history.
    pub cc_epochs_trimmed: usize,
}

/// Evict window entries at and below
/// `newest_epoch.start_height - 5 * num_blocks_in_epoch` (contiguous
/// backward sweep), then trim both histories.
pub fn reclaim_memory(
    window: &mut FinalizedBlockWindow,
    epochs: &mut Vec<Epoch>,
    cc_epochs: &mut Vec<CcEpoch>,
    num_blocks_in_epoch: Height,
    num_blocks_in_cc_epoch: Height,
) -> ReclaimStats {
    let mut stats = ReclaimStats::default();
    let Some(newest) = epochs.last() else {
        return stats;
    };

    let horizon = newest.start_height - RETAINED_EPOCHS as Height * num_blocks_in_epoch;
    stats.blocks_evicted = window.evict_down_from(horizon);
    stats.epochs_trimmed = trim_front(epochs, RETAINED_EPOCHS);
    stats.cc_epochs_trimmed = trim_front(
        cc_epochs,
        retained_cc_epochs(num_blocks_in_epoch, num_blocks_in_cc_epoch),
    );
    stats
}

/// Keep only the last `keep` entries. Returns how many were dropped.
pub fn trim_front<T>(items: &mut Vec<T>, keep: usize) -> usize {
    if items.len() <= keep {
        return 0;
    }
    let excess = items.len() - keep;
    items.drain(..excess);
    excess
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfirmedBlock;

    fn epoch_at(start_height: Height) -> Epoch {
        Epoch {
            start_height,
            end_time: 1,
            ..Default::default()
        }
    }

    fn filled_window(upto: Height) -> FinalizedBlockWindow {
        let mut window = FinalizedBlockWindow::new();
        for h in 1..=upto {
            window.put(ConfirmedBlock::new(h, h, vec![]));
        }
        window
    }

    #[test]
    fn test_no_epochs_no_op() {
        let mut window = filled_window(10);
        let stats = reclaim_memory(&mut window, &mut vec![], &mut vec![], 2, 1);
        assert_eq!(stats, ReclaimStats::default());
        assert_eq!(window.len(), 10);
    }

    #[test]
    fn test_evicts_below_horizon() {
        // epoch size 2, newest epoch starts at 13 -> horizon 13 - 10 = 3
        let mut window = filled_window(14);
        let mut epochs = vec![epoch_at(11), epoch_at(13)];
        let stats = reclaim_memory(&mut window, &mut epochs, &mut vec![], 2, 1);
        assert_eq!(stats.blocks_evicted, 3);
        assert_eq!(window.lowest_height(), Some(4));
    }

    #[test]
    fn test_trims_epoch_history_to_five() {
        let mut window = FinalizedBlockWindow::new();
        let mut epochs: Vec<Epoch> = (0..8).map(|i| epoch_at(1 + i * 3)).collect();
        let stats = reclaim_memory(&mut window, &mut epochs, &mut vec![], 3, 1);
        assert_eq!(stats.epochs_trimmed, 3);
        assert_eq!(epochs.len(), RETAINED_EPOCHS);
        assert_eq!(epochs[0].start_height, 10);
    }

    #[test]
    fn test_trims_cc_history_by_ratio() {
        let mut window = FinalizedBlockWindow::new();
        let mut epochs = vec![epoch_at(1)];
        let mut cc_epochs: Vec<CcEpoch> = (0..25).map(|_| CcEpoch::default()).collect();
        // ratio 4 / 2 = 2 -> keep 10
        let stats = reclaim_memory(&mut window, &mut epochs, &mut cc_epochs, 4, 2);
        assert_eq!(stats.cc_epochs_trimmed, 15);
        assert_eq!(cc_epochs.len(), 10);
    }

    #[test]
    fn test_trim_front() {
        let mut items = vec![1, 2, 3, 4];
        assert_eq!(trim_front(&mut items, 2), 2);
        assert_eq!(items, vec![3, 4]);
        assert_eq!(trim_front(&mut items, 5), 0);
    }
}
