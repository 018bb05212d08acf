//! Debug assertion macros for ring index invariants.
//!
//! Active only in debug builds, so release builds pay nothing for them.
//! Used by `RingIndex` after every index mutation.

// =============================================================================
// Size/index consistency
// =============================================================================

/// Assert that head, tail and size describe the same occupancy.
///
/// **Invariant**: `head < C`, `tail < C`, `size <= C` and
/// `(tail + size) mod C == head`
macro_rules! debug_assert_ring_consistent {
    ($ring:expr) => {
        debug_assert!(
            $ring.head < $ring.capacity
                && $ring.tail < $ring.capacity
                && $ring.size <= $ring.capacity
                && ($ring.tail + $ring.size) % $ring.capacity == $ring.head,
            "ring index inconsistent: head {} tail {} size {} capacity {}",
            $ring.head,
            $ring.tail,
            $ring.size,
            $ring.capacity
        )
    };
}

// =============================================================================
// Bounded advance
// =============================================================================

/// Assert that an advance of `n` slots fits in `limit` slots.
///
/// Used before moving head (limit = free slots) and tail (limit = size).
macro_rules! debug_assert_advance_within {
    ($name:literal, $n:expr, $limit:expr) => {
        debug_assert!(
            $n <= $limit,
            "advancing {} by {} slots exceeds limit {}",
            $name,
            $n,
            $limit
        )
    };
}

pub(crate) use debug_assert_advance_within;
pub(crate) use debug_assert_ring_consistent;
