//! # Fetch Planning
//!
//! Decides what the pipeline does next given the next height to finalize
//! and the current mainnet tip.

use crate::domain::{invariant_finalized, Height, FINALITY_CONFIRMATIONS};

/// Next action of the fetch pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchStep {
    /// Tip is not far enough ahead; suspend and poll again.
    Wait,
    /// Fetch a single height.
    Single(Height),
    /// Fetch `count` consecutive heights starting at `from` concurrently.
    Batch {
        /// First height of the batch
        from: Height,
        /// Batch width
        count: usize,
    },
}

/// Plan the next fetch for height `next` against tip `tip`.
///
/// A batch is used whenever every height in it, plus `parallel_num` more,
/// is already final.
pub fn plan_fetch(next: Height, tip: Height, parallel_num: usize) -> FetchStep {
    if !invariant_finalized(next, tip) {
        return FetchStep::Wait;
    }
    if parallel_num > 1 && next + FINALITY_CONFIRMATIONS + parallel_num as Height <= tip {
        return FetchStep::Batch {
            from: next,
            count: parallel_num,
        };
    }
    FetchStep::Single(next)
}

/// Whether the pipeline has caught up with the tip.
pub fn is_caught_up(latest_finalized: Height, tip: Height) -> bool {
    tip <= latest_finalized + FINALITY_CONFIRMATIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wait_when_not_confirmed() {
        assert_eq!(plan_fetch(101, 109, 10), FetchStep::Wait);
    }

    #[test]
    fn test_single_at_threshold() {
        assert_eq!(plan_fetch(100, 109, 10), FetchStep::Single(100));
    }

    #[test]
    fn test_batch_when_far_behind() {
        assert_eq!(
            plan_fetch(100, 119, 10),
            FetchStep::Batch { from: 100, count: 10 }
        );
        assert_eq!(plan_fetch(100, 118, 10), FetchStep::Single(100));
    }

    #[test]
    fn test_batch_disabled_with_width_one() {
        assert_eq!(plan_fetch(1, 1_000, 1), FetchStep::Single(1));
    }

    #[test]
    fn test_caught_up() {
        assert!(is_caught_up(100, 109));
        assert!(!is_caught_up(100, 110));
    }

    proptest! {
        #[test]
        fn prop_never_plans_unconfirmed_height(next in 0i64..10_000, tip in 0i64..10_000, width in 1usize..20) {
            match plan_fetch(next, tip, width) {
                FetchStep::Wait => prop_assert!(tip < next + FINALITY_CONFIRMATIONS),
                FetchStep::Single(h) => prop_assert!(tip >= h + FINALITY_CONFIRMATIONS),
                FetchStep::Batch { from, count } => {
                    let last = from + count as Height - 1;
                    prop_assert!(tip >= last + FINALITY_CONFIRMATIONS);
                }
            }
        }
    }
}
