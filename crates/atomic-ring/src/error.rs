//! Error taxonomy for `atomic-ring`.
//!
//! Precondition violations (bad offsets, misalignment, invalid message
//! types, double commit/abort) are programmer errors, not runtime conditions
//! a caller retries past. They are still expressed as a typed `Result`
//! rather than a bare `panic!` so that a caller sitting at a trust boundary
//! (e.g. deserializing an untrusted shared-memory region) can choose to
//! handle one instead of aborting the process. Internal call sites that
//! already know an offset is valid `.expect()` these results rather than
//! propagating them, the same way the Aeron Rust port `.unwrap()`s offsets
//! it computed itself during construction.
//!
//! Capacity exhaustion is *not* part of this enum: `write` returns `bool`
//! and `try_claim` returns a sentinel — a full ring is an expected,
//! recoverable condition, not an error.

use thiserror::Error;

/// Errors raised by `AtomicBuffer` accessors and ring construction/commit paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// An access at `index` of `width` bytes falls outside `[0, capacity)`.
    #[error("index {index} + width {width} exceeds capacity {capacity}")]
    OutOfBounds {
        index: usize,
        width: usize,
        capacity: usize,
    },

    /// An ordered/atomic access at `index` is not aligned to `width` bytes.
    #[error("index {index} is not aligned to {width} bytes")]
    Misaligned { index: usize, width: usize },

    /// A ring's data-area capacity was not a positive power of two.
    #[error("capacity {capacity} is not a positive power of two")]
    CapacityNotPowerOfTwo { capacity: usize },

    /// A user message `type` id was less than 1.
    #[error("message type id {type_id} is invalid (must be >= 1)")]
    InvalidMessageType { type_id: i32 },

    /// A message payload exceeded the ring's `max_msg_length`.
    #[error("message length {length} exceeds max_msg_length {max}")]
    MessageTooLarge { length: usize, max: usize },

    /// `commit`/`abort` was called on a record that is no longer claimed.
    #[error("record at index {index} was already finalized (previously {was})")]
    AlreadyFinalized { index: usize, was: &'static str },
}

pub type Result<T> = std::result::Result<T, RingError>;
