//! # Application Module
//!
//! The watcher service: fetch pipeline, speedup and epoch closing.

mod pipeline;
pub mod service;
pub mod speedup;

pub use service::{WatcherOutputs, WatcherService};
pub use speedup::{SpeedupOutcome, SpeedupReport};
