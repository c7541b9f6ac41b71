//! Snowflake-style 64-bit composite ID generator: `(timestamp || node ||
//! sequence)`, a read-modify-write consumer of [`AtomicBuffer`] built on the
//! same CAS primitives the ring protocols use.
//!
//! The CAS retry loop mirrors the same idiom `mpsc::claim_capacity` and
//! `next_correlation_id` already use elsewhere in this crate.

use crate::buffer::AtomicBuffer;
use std::sync::atomic::{AtomicU64, Ordering};

/// A source of milliseconds-since-epoch, pluggable so tests can stall the
/// clock or supply a process-agreed wall clock across hosts.
pub trait ClockSource {
    fn now_ms(&self) -> i64;
}

/// The real-time clock, backed by [`std::time::SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock is after the Unix epoch")
            .as_millis() as i64
    }
}

/// Where a generator's single ordered 64-bit slot lives.
enum Slot<'a> {
    /// A standalone atomic, for a generator that does not otherwise share
    /// a [`AtomicBuffer`]-backed region with anything else.
    Owned(AtomicU64),
    /// A caller-chosen offset inside an existing `AtomicBuffer`, for a
    /// generator that lives alongside a ring's trailer or other shared
    /// state.
    Buffer(AtomicBuffer<'a>, usize),
}

impl<'a> Slot<'a> {
    #[inline]
    fn load(&self) -> i64 {
        match self {
            Slot::Owned(a) => a.load(Ordering::Acquire) as i64,
            Slot::Buffer(buf, off) => buf.get_i64_acquire(*off).expect("slot offset is valid"),
        }
    }

    #[inline]
    fn compare_exchange(&self, current: i64, new: i64) -> bool {
        match self {
            Slot::Owned(a) => a
                .compare_exchange(
                    current as u64,
                    new as u64,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok(),
            Slot::Buffer(buf, off) => buf.cas_i64(*off, current, new).expect("slot offset is valid"),
        }
    }
}

/// Generates strictly monotonically increasing 64-bit IDs composed of a
/// timestamp, a node id, and a per-millisecond sequence number.
pub struct SnowflakeIdGenerator<'a, C: ClockSource = SystemClock> {
    slot: Slot<'a>,
    clock: C,
    node_id: u64,
    epoch_ms: i64,
    node_bits: u32,
    sequence_bits: u32,
}

impl<'a> SnowflakeIdGenerator<'a, SystemClock> {
    /// A generator backed by its own standalone atomic, using the real clock.
    #[must_use]
    pub fn new(node_id: u64, node_bits: u32, sequence_bits: u32, epoch_ms: i64) -> Self {
        Self::with_clock(node_id, node_bits, sequence_bits, epoch_ms, SystemClock)
    }
}

impl<'a, C: ClockSource> SnowflakeIdGenerator<'a, C> {
    /// A generator backed by its own standalone atomic, using `clock`.
    #[must_use]
    pub fn with_clock(
        node_id: u64,
        node_bits: u32,
        sequence_bits: u32,
        epoch_ms: i64,
        clock: C,
    ) -> Self {
        assert!(
            node_bits + sequence_bits < 64,
            "node_bits + sequence_bits must leave room for a timestamp"
        );
        assert!(
            node_id < (1u64 << node_bits),
            "node_id does not fit in node_bits"
        );
        Self {
            slot: Slot::Owned(AtomicU64::new(0)),
            clock,
            node_id,
            epoch_ms,
            node_bits,
            sequence_bits,
        }
    }

    /// A generator whose last-issued value lives at `offset` inside `buffer`,
    /// so it can share a region with a ring's trailer or be observed from
    /// another process.
    #[must_use]
    pub fn in_buffer(
        buffer: AtomicBuffer<'a>,
        offset: usize,
        node_id: u64,
        node_bits: u32,
        sequence_bits: u32,
        epoch_ms: i64,
        clock: C,
    ) -> Self {
        assert!(
            node_bits + sequence_bits < 64,
            "node_bits + sequence_bits must leave room for a timestamp"
        );
        assert!(
            node_id < (1u64 << node_bits),
            "node_id does not fit in node_bits"
        );
        Self {
            slot: Slot::Buffer(buffer, offset),
            clock,
            node_id,
            epoch_ms,
            node_bits,
            sequence_bits,
        }
    }

    #[inline]
    fn sequence_mask(&self) -> u64 {
        (1u64 << self.sequence_bits) - 1
    }

    // The timestamp field is stored biased by +1 so that the all-zero slot
    // value is never a legitimate composite id, only the "never issued"
    // sentinel. Without this bias, `epoch_ms == 0, node == 0` composes to
    // the literal value 0 on the first tick, indistinguishable from an
    // empty slot, which lets two racing CASes both "succeed" against an
    // unchanged 0 and return the same id.
    #[inline]
    fn compose(&self, timestamp_ms: i64, sequence: u64) -> i64 {
        let ts_field = (timestamp_ms - self.epoch_ms) as u64 + 1;
        let composite = (ts_field << (self.node_bits + self.sequence_bits))
            | (self.node_id << self.sequence_bits)
            | sequence;
        composite as i64
    }

    #[inline]
    fn decompose(&self, value: i64) -> (i64, u64) {
        let value = value as u64;
        let ts_field = value >> (self.node_bits + self.sequence_bits);
        let sequence = value & self.sequence_mask();
        ((ts_field - 1) as i64 + self.epoch_ms, sequence)
    }

    /// Produces the next unique, strictly increasing id. Busy-spins on the
    /// clock when the sequence space for the current millisecond is
    /// exhausted.
    pub fn next_id(&self) -> i64 {
        loop {
            let last = self.slot.load();
            let (last_ts, last_seq) = if last == 0 {
                (self.epoch_ms - 1, 0u64)
            } else {
                self.decompose(last)
            };

            let now = self.clock.now_ms().max(self.epoch_ms);
            let (candidate_ts, candidate_seq) = if now > last_ts {
                (now, 0u64)
            } else {
                let next_seq = last_seq.wrapping_add(1) & self.sequence_mask();
                if next_seq == 0 {
                    // Sequence space exhausted for this millisecond; spin
                    // until the clock advances.
                    continue;
                }
                (last_ts, next_seq)
            };

            let candidate = self.compose(candidate_ts, candidate_seq);
            if self.slot.compare_exchange(last, candidate) {
                return candidate;
            }
        }
    }
}
