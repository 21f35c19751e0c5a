//! # Shared Types Crate
//!
//! Entities exchanged between the mainnet watcher and the staking component,
//! and between peers during epoch speedup.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Epoch`, `Nomination` and `CcEpoch` are
//!   defined once and re-used by producers and consumers.
//! - **Deterministic Encoding**: field order and hex encoding of keys are
//!   fixed; nothing here depends on node-local state.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
