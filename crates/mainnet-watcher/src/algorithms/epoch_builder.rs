//! # Epoch Builder
//!
//! Folds a closed run of confirmed blocks into one [`Epoch`].
//!
//! The output is a pure function of the blocks in `[start, end]`: insertion
//! order into the window and map iteration order do not leak into it.

use std::collections::HashMap;

use shared_types::{CcEpoch, Epoch, Nomination, Pubkey};

use crate::domain::{FinalizedBlockWindow, Height, WatcherError};

/// Build the epoch covering `start..=end`.
///
/// # Errors
/// - `MissingBlock` if any height in the range is absent from the window
pub fn build_epoch(
    window: &FinalizedBlockWindow,
    start: Height,
    end: Height,
) -> Result<Epoch, WatcherError> {
    let mut epoch = Epoch {
        number: 0,
        start_height: start,
        end_time: 0,
        nominations: Vec::with_capacity(10),
    };

    let mut by_pubkey: HashMap<Pubkey, Nomination> = HashMap::new();
    for height in start..=end {
        let block = window.get(height).ok_or(WatcherError::MissingBlock {
            height,
            epoch_start: start,
        })?;

        // Mainnet timestamps are not monotonic
        if epoch.end_time < block.timestamp {
            epoch.end_time = block.timestamp;
        }

        for nomination in &block.nominations {
            by_pubkey
                .entry(nomination.pubkey)
                .or_insert_with(|| Nomination::new(nomination.pubkey, 0))
                .nominated_count += nomination.nominated_count;
        }
    }

    epoch.nominations.extend(by_pubkey.into_values());
    sort_epoch_nominations(&mut epoch.nominations);
    Ok(epoch)
}

/// Canonical nomination order: count descending, smaller pubkey first on ties.
///
/// Two passes: an unstable sort by pubkey gives a deterministic base order,
/// then a stable sort by count keeps that order among equal counts.
pub fn sort_epoch_nominations(nominations: &mut [Nomination]) {
    nominations.sort_unstable_by(|a, b| a.pubkey.cmp(&b.pubkey));
    nominations.sort_by(|a, b| b.nominated_count.cmp(&a.nominated_count));
}

/// Build the CC-epoch covering `start..=end`.
///
/// # Errors
/// - `MissingBlock` if any height in the range is absent from the window
pub fn build_cc_epoch(
    window: &FinalizedBlockWindow,
    start: Height,
    end: Height,
) -> Result<CcEpoch, WatcherError> {
    let mut epoch = CcEpoch {
        number: 0,
        start_height: start,
        end_time: 0,
        transfer_infos: Vec::new(),
    };
    for height in start..=end {
        let block = window.get(height).ok_or(WatcherError::MissingBlock {
            height,
            epoch_start: start,
        })?;
        if epoch.end_time < block.timestamp {
            epoch.end_time = block.timestamp;
        }
        epoch
            .transfer_infos
            .extend(block.cc_transfer_infos.iter().cloned());
    }
    Ok(epoch)
}
