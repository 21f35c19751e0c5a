//! # Mainnet Watcher
//!
//! Follows a proof-of-work mainnet and turns its confirmed blocks into
//! epochs of validator nominations for the side chain's staking logic.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Fetch blocks only once they are 9 confirmations deep
//! - Fold each run of `num_blocks_in_epoch` blocks into one [`Epoch`] whose
//!   nomination order is identical on every honest node
//! - Optionally bootstrap from a peer's precomputed epochs (speedup)
//! - Signal once when the pipeline has caught up with the tip
//!
//! ## Guarantees
//!
//! | Property | Description |
//! |----------|-------------|
//! | Finality | No height is fetched until `tip >= height + 9` |
//! | Determinism | Epoch contents are a pure function of the blocks covered |
//! | Contiguity | Emitted epochs cover consecutive, non-overlapping ranges |
//! | Bounded memory | Window and histories are reclaimed after every epoch |
//!
//! ## Module Structure
//!
//! ```text
//! mainnet-watcher/
//! ├── domain/          # Blocks, window, state, errors, invariants
//! ├── algorithms/      # Epoch builder, fetch planning, memory reclaim
//! ├── ports/           # API trait (inbound) + chain/peer traits (outbound)
//! ├── adapters/        # JSON-RPC clients for mainnet and peers
//! ├── application/     # WatcherService: pipeline, speedup, epoch closing
//! ├── config.rs        # WatcherConfig
//! └── metrics.rs       # Prometheus metrics (feature `metrics`)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;

// Re-exports
pub use adapters::{MainnetRpcClient, PeerRpcClient};
pub use algorithms::{build_cc_epoch, build_epoch, plan_fetch, sort_epoch_nominations, FetchStep};
pub use application::{SpeedupOutcome, SpeedupReport, WatcherOutputs, WatcherService};
pub use config::{RpcEndpointConfig, WatcherConfig};
pub use domain::{
    ConfirmedBlock, FinalizedBlockWindow, Height, WatcherCheckpoint, WatcherError, WatcherState,
    FINALITY_CONFIRMATIONS, RETAINED_EPOCHS,
};
pub use ports::{EpochPeerClient, MockChainClient, MockEpochPeer, SourceChainClient, WatcherApi};
pub use shared_types::{CcEpoch, CcTransferInfo, Epoch, Nomination, Pubkey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
