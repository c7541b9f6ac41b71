//! `atomic-ring` — lock-free, shared-memory primitives for in-process and
//! cross-process message passing.
//!
//! Built from a flat, byte-addressable [`AtomicBuffer`] upward: a [`mpsc`]
//! many-producer/single-consumer ring and a lighter-weight [`spsc`]
//! single-producer/single-consumer ring, both exchanging framed binary
//! messages with FIFO, wrap-around, zero-copy and claim/commit/abort
//! semantics, plus a [`snowflake`] 64-bit composite ID generator as an
//! illustrative consumer of the buffer's read-modify-write accessors.
//!
//! This is a Rust port of the `Agrona`/`Aeron` ring buffer family
//! (`ManyToOneRingBuffer`, `OneToOneRingBuffer`) onto a `MemoryRegion` that
//! may be process-local or, under the `shared-mmap` feature, an anonymous
//! `MAP_SHARED` mapping handed to another process.
//!
//! # Example
//!
//! ```
//! use atomic_ring::{AtomicBuffer, MemoryRegion, ManyToOneRing};
//!
//! let region = MemoryRegion::new(1024 + atomic_ring::trailer::TRAILER_LENGTH);
//! let buffer = AtomicBuffer::new(&region);
//! let ring = ManyToOneRing::new(buffer, 1024).unwrap();
//!
//! ring.write(7, &5i32.to_ne_bytes()).unwrap();
//! let mut received = None;
//! ring.read(
//!     |msg_type, buf, offset, _len| received = Some((msg_type, buf.get_i32(offset).unwrap())),
//!     usize::MAX,
//! );
//! assert_eq!(received, Some((7, 5)));
//! ```
//!
//! # Feature flags
//!
//! - `shared-mmap`: adds [`MemoryRegion::new_shared`], an anonymous
//!   `MAP_SHARED` mapping usable across a `fork()` boundary.
//! - `disable_bounds_checks`: elides `AtomicBuffer`'s index/alignment
//!   precondition checks on the plain/opaque accessor hot path for release
//!   builds. Alignment checks on CAS/RMW accessors and the
//!   claim/commit/abort state checks are never elided: a misaligned atomic
//!   is undefined behavior, not merely an incorrect result.
//! - `loom`: compiles the crate against `loom`'s model-checked atomics
//!   instead of `std::sync::atomic`, for `tests/loom_tests.rs`.

pub mod backoff;
pub mod buffer;
pub mod error;
mod invariants;
pub mod mpsc;
pub mod record;
pub mod region;
pub mod snowflake;
pub mod spsc;
pub mod trailer;

pub use buffer::{AtomicBuffer, ByteOrder};
pub use error::{Result, RingError};
pub use mpsc::{ControlledReadAction, ManyToOneRing};
pub use record::{HEADER_LENGTH, INSUFFICIENT_CAPACITY, PADDING_TYPE};
pub use region::MemoryRegion;
pub use snowflake::{ClockSource, SnowflakeIdGenerator, SystemClock};
pub use spsc::OneToOneRing;
pub use trailer::{RingDescriptor, CACHE_LINE_LENGTH, TRAILER_LENGTH};
