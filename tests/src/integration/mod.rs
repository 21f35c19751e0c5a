//! # Integration Scenarios
//!
//! Full `WatcherService` runs against simulated mainnets and peers.

pub mod fixtures;
pub mod pipeline_flow;
pub mod speedup_handoff;
