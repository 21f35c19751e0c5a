//! # Mainnet Watcher Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Whole-pipeline scenarios against simulated chains
//!     ├── fixtures.rs       # Growing mainnet simulator, run helpers
//!     ├── pipeline_flow.rs  # Determinism, gating, resume
//!     └── speedup_handoff.rs  # Peer bootstrap then local derivation
//!
//! benches/
//! └── epoch_benchmarks.rs   # Epoch folding and window reclaim
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p watcher-tests
//!
//! # Benchmarks
//! cargo bench -p watcher-tests
//! ```

#![allow(dead_code)]

pub mod integration;
