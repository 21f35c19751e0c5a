//! # Algorithms Module
//!
//! Pure functions behind the watcher: fetch planning, epoch folding and
//! memory reclaim.

pub mod epoch_builder;
pub mod fetch_plan;
pub mod reclaim;

pub use epoch_builder::{build_cc_epoch, build_epoch, sort_epoch_nominations};
pub use fetch_plan::{is_caught_up, plan_fetch, FetchStep};
pub use reclaim::{reclaim_memory, trim_front, ReclaimStats};
