//! Ring Descriptor: the fixed trailer appended after a ring's power-of-two
//! data area.
//!
//! Layout (the crate's one wire format):
//!
//! ```text
//! offset 0 .. capacity-1      : data area (records)
//! offset capacity + 0         : TAIL counter             (i64, native order)
//! offset capacity + 128       : HEAD_CACHE counter       (i64)
//! offset capacity + 256       : HEAD counter             (i64)
//! offset capacity + 384       : CORRELATION counter      (i64)
//! offset capacity + 512       : CONSUMER_HEARTBEAT ts    (i64)
//! offset capacity + 640       : end of trailer
//! ```
//!
//! Each field occupies two cache lines (`pad = 2 * CACHE_LINE_LENGTH`) so
//! that no two counters share a cache line — the same effect a
//! `#[repr(align(128))] struct CacheAligned<T>` wrapper gets around a hot
//! field in an in-process struct; here the padding is baked directly into
//! the wire layout instead, since the fields live in a byte buffer that may
//! be shared across a process boundary rather than in a Rust struct.
//!
//! The assumed line size (64 bytes) is a crate constant, not negotiated at
//! runtime: two peers attaching to the same region out-of-band must agree
//! on it independently.

use crate::error::{Result, RingError};

/// Assumed cache-line size in bytes. Two peers sharing a ring must agree on
/// this value; it is not encoded in the region itself.
pub const CACHE_LINE_LENGTH: usize = 64;

const FIELD_PAD: usize = CACHE_LINE_LENGTH * 2;

/// Offset of the `tail` counter, relative to the start of the trailer.
pub const TAIL_OFFSET: usize = 0;
/// Offset of the producer-side `head-cache` hint, relative to the trailer start.
pub const HEAD_CACHE_OFFSET: usize = FIELD_PAD;
/// Offset of the `head` counter, relative to the trailer start.
pub const HEAD_OFFSET: usize = FIELD_PAD * 2;
/// Offset of the correlation-id counter, relative to the trailer start.
pub const CORRELATION_OFFSET: usize = FIELD_PAD * 3;
/// Offset of the consumer heartbeat timestamp, relative to the trailer start.
pub const CONSUMER_HEARTBEAT_OFFSET: usize = FIELD_PAD * 4;
/// Total size of the trailer (5 fields, each 2 cache lines).
pub const TRAILER_LENGTH: usize = FIELD_PAD * 5;

/// Precomputed absolute offsets of a ring's trailer fields within its
/// backing [`AtomicBuffer`](crate::buffer::AtomicBuffer).
///
/// Computed once at ring construction, mirroring `ManyToOneRingBuffer::new`
/// in the Aeron Rust port, which precomputes `tail_position_index` etc.
/// rather than re-deriving `capacity + OFFSET` on every access.
#[derive(Debug, Clone, Copy)]
pub struct RingDescriptor {
    pub capacity: usize,
    pub mask: usize,
    pub tail_index: usize,
    pub head_cache_index: usize,
    pub head_index: usize,
    pub correlation_index: usize,
    pub consumer_heartbeat_index: usize,
}

impl RingDescriptor {
    /// Builds a descriptor for a ring whose data area is `capacity` bytes,
    /// given the total length of the backing buffer (data area + trailer).
    ///
    /// # Errors
    ///
    /// Returns [`RingError::CapacityNotPowerOfTwo`] if `capacity` is not a
    /// positive power of two, or [`RingError::OutOfBounds`] if the buffer is
    /// too small to hold `capacity + TRAILER_LENGTH` bytes.
    pub fn new(capacity: usize, buffer_len: usize) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(RingError::CapacityNotPowerOfTwo { capacity });
        }
        let required = capacity + TRAILER_LENGTH;
        if buffer_len < required {
            return Err(RingError::OutOfBounds {
                index: capacity,
                width: TRAILER_LENGTH,
                capacity: buffer_len,
            });
        }
        Ok(Self {
            capacity,
            mask: capacity - 1,
            tail_index: capacity + TAIL_OFFSET,
            head_cache_index: capacity + HEAD_CACHE_OFFSET,
            head_index: capacity + HEAD_OFFSET,
            correlation_index: capacity + CORRELATION_OFFSET,
            consumer_heartbeat_index: capacity + CONSUMER_HEARTBEAT_OFFSET,
        })
    }

    /// Total buffer length this descriptor expects: data area + trailer.
    #[inline]
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.capacity + TRAILER_LENGTH
    }
}
