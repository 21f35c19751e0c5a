//! # Watcher Node Library
//!
//! This library exposes the node's configuration loader and runtime for
//! testing. The main entry point is the `main.rs` binary.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (from `WATCHER_*` environment)
//! 2. Load configuration and checkpoint
//! 3. Probe the mainnet node
//! 4. Spawn the watcher and the epoch consumer
//! 5. Run until Ctrl+C or a fatal watcher error

#![warn(missing_docs)]

pub mod config;
pub mod runtime;

pub use config::{load_config, load_config_from, NodeConfig};
pub use runtime::{consume_outputs, ConsumerStats, RunningWatcher, WatcherNode};
