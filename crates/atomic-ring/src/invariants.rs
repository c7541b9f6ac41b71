//! Debug assertion macros for the ring protocol invariants.
//!
//! These are runtime checks only active under `debug_assertions`, so release
//! builds pay nothing for them. Used by both `mpsc::ManyToOneRing` and
//! `spsc::OneToOneRing`.

// =============================================================================
// Head/tail bound: a consumer never reads past what a producer has committed.
// =============================================================================

/// Assert that `head` has not advanced past `tail`.
///
/// **Invariant**: `head <= tail` at all times.
///
/// Used in: `read()`/`controlled_read()` before advancing the head counter.
macro_rules! debug_assert_head_tail_bound {
    ($head:expr, $tail:expr) => {
        debug_assert!(
            $head <= $tail,
            "head {} advanced past tail {}",
            $head,
            $tail
        )
    };
}

// =============================================================================
// Monotonic progress of a position counter.
// =============================================================================

/// Assert that a position counter only increases.
///
/// **Invariant**: `new >= old` for `tail`, `head`, and `correlation_id`.
///
/// Used in: `commit()`, `read()`'s head advance, `next_correlation_id()`.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "{} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// Claim/commit lifecycle: a claimed record is committed or aborted exactly once.
// =============================================================================

/// Assert that a record's encoded length is negative (claimed, not yet
/// committed) before `commit`/`abort` flips its sign.
///
/// **Invariant**: a record transitions claimed -> committed exactly once.
///
/// Used in: `commit()`, `abort()` before the release store that negates the
/// length back to positive.
macro_rules! debug_assert_claimed {
    ($length:expr) => {
        debug_assert!(
            $length < 0,
            "record length {} was not in the claimed (negative) state",
            $length
        )
    };
}

pub(crate) use debug_assert_claimed;
pub(crate) use debug_assert_head_tail_bound;
pub(crate) use debug_assert_monotonic;
