//! # Inbound Ports
//!
//! API the watcher offers to the staking component besides its output
//! channels.

use async_trait::async_trait;
use shared_types::Epoch;

use crate::domain::{WatcherError, WatcherState};

/// Mainnet Watcher API - inbound port.
#[async_trait]
pub trait WatcherApi: Send + Sync {
    /// Startup liveness probe against the mainnet node.
    ///
    /// Fails if the tip height is not positive or the tip block cannot be
    /// fetched. Does nothing when `skip_check` is set.
    async fn check_sanity(&self, skip_check: bool) -> Result<(), WatcherError>;

    /// Epoch that would close if the buffered blocks were final now.
    ///
    /// Introspection only; never emitted.
    fn current_epoch(&self) -> Result<Epoch, WatcherError>;

    /// Snapshot of the watcher's heights and epoch numbers.
    fn state(&self) -> WatcherState;

    /// Most recent closed epochs, oldest first.
    fn retained_epochs(&self) -> &[Epoch];
}
