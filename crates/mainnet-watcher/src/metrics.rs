//! # Watcher Metrics
//!
//! Prometheus metrics for the fetch pipeline and epoch output.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! mainnet-watcher = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `watcher_blocks_finalized_total` - Counter of blocks added to the window
//! - `watcher_fetch_retries_total` - Counter of failed block fetches that were retried
//! - `watcher_epochs_emitted_total` - Counter of epochs emitted (by source)
//! - `watcher_cc_epochs_emitted_total` - Counter of CC-epochs emitted
//! - `watcher_finalized_height` - Gauge of the latest finalized height
//! - `watcher_window_blocks` - Gauge of blocks buffered in the window
//! - `watcher_caught_up` - Gauge set to 1 once the pipeline reached the tip

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Blocks added to the window
    pub static ref BLOCKS_FINALIZED: IntCounter = register_int_counter!(
        "watcher_blocks_finalized_total",
        "Total number of confirmed blocks added to the window"
    )
    .expect("Failed to create BLOCKS_FINALIZED metric");

    /// Retried block fetches
    pub static ref FETCH_RETRIES: IntCounter = register_int_counter!(
        "watcher_fetch_retries_total",
        "Total number of block fetches that failed and were retried"
    )
    .expect("Failed to create FETCH_RETRIES metric");

    /// Epochs emitted, labeled by source
    pub static ref EPOCHS_EMITTED: IntCounterVec = register_int_counter_vec!(
        "watcher_epochs_emitted_total",
        "Total number of epochs emitted",
        &["source"]
    )
    .expect("Failed to create EPOCHS_EMITTED metric");

    /// CC-epochs emitted
    pub static ref CC_EPOCHS_EMITTED: IntCounter = register_int_counter!(
        "watcher_cc_epochs_emitted_total",
        "Total number of CC-epochs emitted"
    )
    .expect("Failed to create CC_EPOCHS_EMITTED metric");

    /// Latest finalized height
    pub static ref FINALIZED_HEIGHT: IntGauge = register_int_gauge!(
        "watcher_finalized_height",
        "Latest finalized mainnet height"
    )
    .expect("Failed to create FINALIZED_HEIGHT metric");

    /// Buffered window size
    pub static ref WINDOW_BLOCKS: IntGauge = register_int_gauge!(
        "watcher_window_blocks",
        "Blocks currently buffered in the finalized block window"
    )
    .expect("Failed to create WINDOW_BLOCKS metric");

    /// Catch-up flag
    pub static ref CAUGHT_UP: IntGauge = register_int_gauge!(
        "watcher_caught_up",
        "Whether the pipeline has caught up with the mainnet tip (0=no, 1=yes)"
    )
    .expect("Failed to create CAUGHT_UP metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a block added to the window
#[cfg(feature = "metrics")]
pub fn record_block_finalized(height: i64) {
    BLOCKS_FINALIZED.inc();
    FINALIZED_HEIGHT.set(height);
}

/// Record a retried fetch
#[cfg(feature = "metrics")]
pub fn record_fetch_retry() {
    FETCH_RETRIES.inc();
}

/// Record an emitted epoch (`source` is `derived` or `speedup`)
#[cfg(feature = "metrics")]
pub fn record_epoch_emitted(source: &str) {
    EPOCHS_EMITTED.with_label_values(&[source]).inc();
}

/// Record an emitted CC-epoch
#[cfg(feature = "metrics")]
pub fn record_cc_epoch_emitted() {
    CC_EPOCHS_EMITTED.inc();
}

/// Update window size gauge
#[cfg(feature = "metrics")]
pub fn set_window_blocks(blocks: usize) {
    WINDOW_BLOCKS.set(blocks as i64);
}

/// Set the catch-up flag
#[cfg(feature = "metrics")]
pub fn set_caught_up(caught_up: bool) {
    CAUGHT_UP.set(if caught_up { 1 } else { 0 });
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_block_finalized(_height: i64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_fetch_retry() {}

#[cfg(not(feature = "metrics"))]
pub fn record_epoch_emitted(_source: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_cc_epoch_emitted() {}

#[cfg(not(feature = "metrics"))]
pub fn set_window_blocks(_blocks: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn set_caught_up(_caught_up: bool) {}
