//! Single-producer/single-consumer ring: a lighter-weight variant of the
//! MPSC protocol that exploits having exactly one producer.
//!
//! Grounded in the same `bspeice-aeron-rs` port's `OneToOneRingBuffer`
//! shape and in `examples/other_examples/...bearcove-rapace__crates-shm-primitives-src-spsc.rs.rs`
//! for the combined-header publish idiom (pack length+type into one 8-byte
//! slot rather than two 4-byte stores), which a single producer can do
//! safely because it never races itself for the `tail` CAS.

use crate::buffer::AtomicBuffer;
use crate::error::{Result, RingError};
use crate::invariants::{debug_assert_head_tail_bound, debug_assert_monotonic};
use crate::record::{self, HEADER_LENGTH, PADDING_TYPE};
use crate::trailer::RingDescriptor;

/// Packs `length` (low 32 bits) and `type` (high 32 bits) into one 8-byte
/// header word.
#[inline]
fn pack_header(length: i32, msg_type: i32) -> i64 {
    (length as u32 as i64) | ((msg_type as u32 as i64) << 32)
}

#[inline]
fn unpack_header(word: i64) -> (i32, i32) {
    (word as i32, (word >> 32) as i32)
}

/// A single-producer/single-consumer ring of framed binary records.
///
/// Unlike [`ManyToOneRing`](crate::mpsc::ManyToOneRing), the producer owns
/// `tail` outright: no CAS is needed, publication is one release store of
/// the combined length+type header after the payload has been written.
#[derive(Clone, Copy)]
pub struct OneToOneRing<'a> {
    buffer: AtomicBuffer<'a>,
    descriptor: RingDescriptor,
    max_msg_length: usize,
}

impl<'a> OneToOneRing<'a> {
    /// # Errors
    ///
    /// As [`ManyToOneRing::new`](crate::mpsc::ManyToOneRing::new).
    pub fn new(buffer: AtomicBuffer<'a>, capacity: usize) -> Result<Self> {
        let descriptor = RingDescriptor::new(capacity, buffer.len())?;
        let max_msg_length = (capacity / 8).max(HEADER_LENGTH);
        Ok(Self {
            buffer,
            descriptor,
            max_msg_length,
        })
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.descriptor.capacity
    }

    #[inline]
    #[must_use]
    pub fn max_msg_length(&self) -> usize {
        self.max_msg_length
    }

    #[inline]
    fn mask(&self) -> usize {
        self.descriptor.mask
    }

    #[must_use]
    pub fn producer_position(&self) -> i64 {
        self.buffer
            .get_i64_acquire(self.descriptor.tail_index)
            .expect("tail_index is valid")
    }

    #[must_use]
    pub fn consumer_position(&self) -> i64 {
        self.buffer
            .get_i64_acquire(self.descriptor.head_index)
            .expect("head_index is valid")
    }

    #[must_use]
    pub fn size(&self) -> usize {
        loop {
            let before = self.consumer_position();
            let tail = self.producer_position();
            let after = self.consumer_position();
            if before == after {
                let raw = tail - after;
                return raw.clamp(0, self.descriptor.capacity as i64) as usize;
            }
        }
    }

    #[must_use]
    pub fn next_correlation_id(&self) -> i64 {
        self.buffer
            .get_and_add_i64(self.descriptor.correlation_index, 1)
            .expect("correlation_index is valid")
    }

    #[must_use]
    pub fn consumer_heartbeat_time(&self) -> i64 {
        self.buffer
            .get_i64_acquire(self.descriptor.consumer_heartbeat_index)
            .expect("consumer_heartbeat_index is valid")
    }

    pub fn set_consumer_heartbeat_time(&self, time_ms: i64) {
        self.buffer
            .put_i64_release(self.descriptor.consumer_heartbeat_index, time_ms)
            .expect("consumer_heartbeat_index is valid");
    }

    /// Claims space and publishes a user record in one call. Since there is
    /// a single producer, this never contends: it only fails when the
    /// consumer has not freed enough space.
    ///
    /// # Errors
    ///
    /// As [`ManyToOneRing::write`](crate::mpsc::ManyToOneRing::write).
    pub fn write(&mut self, msg_type: i32, src: &[u8]) -> Result<bool> {
        if !record::is_valid_user_type(msg_type) {
            return Err(RingError::InvalidMessageType { type_id: msg_type });
        }
        let record_len = HEADER_LENGTH + src.len();
        if record_len > self.max_msg_length {
            return Err(RingError::MessageTooLarge {
                length: record_len,
                max: self.max_msg_length,
            });
        }
        let required = record::aligned(record_len);
        let capacity = self.descriptor.capacity;
        let mask = self.mask();

        let tail = self
            .buffer
            .get_i64(self.descriptor.tail_index)
            .expect("tail_index is valid");
        let mut head = self
            .buffer
            .get_i64_acquire(self.descriptor.head_index)
            .expect("head_index is valid");

        if capacity as i64 - (tail - head) < required as i64 {
            head = self
                .buffer
                .get_i64_acquire(self.descriptor.head_index)
                .expect("head_index is valid");
            if capacity as i64 - (tail - head) < required as i64 {
                return Ok(false);
            }
        }

        let tail_index = (tail as usize) & mask;
        let to_end = capacity - tail_index;
        let (write_index, new_tail) = if required > to_end {
            let head_wrapped = (head as usize) & mask;
            if required > head_wrapped {
                return Ok(false);
            }
            // Zero the dead tail-end bytes, then publish a padding header
            // there, before writing the real record at offset 0.
            self.buffer
                .set_memory(tail_index, to_end, 0)
                .expect("tail_index..to_end is within bounds");
            let padding_header = pack_header(to_end as i32, PADDING_TYPE);
            self.buffer
                .put_i64_release(tail_index, padding_header)
                .expect("tail_index is valid");
            (0usize, tail + to_end as i64 + required as i64)
        } else {
            (tail_index, tail + required as i64)
        };

        self.buffer
            .put_bytes(record::payload_offset(write_index), src)
            .expect("payload_off is valid");

        let header = pack_header(record_len as i32, msg_type);
        self.buffer
            .put_i64_release(write_index, header)
            .expect("write_index is valid");

        debug_assert_monotonic!("tail", tail, new_tail);
        self.buffer
            .put_i64_release(self.descriptor.tail_index, new_tail)
            .expect("tail_index is valid");
        Ok(true)
    }

    /// Drains up to `limit` contiguous records starting at `head`. Reads
    /// the combined length+type header with a single 8-byte acquire load
    /// instead of two separate 4-byte loads.
    pub fn read<F>(&mut self, mut handler: F, limit: usize) -> usize
    where
        F: FnMut(i32, &AtomicBuffer<'_>, usize, usize),
    {
        let head = self
            .buffer
            .get_i64(self.descriptor.head_index)
            .expect("head_index is valid");
        let head_index = (head as usize) & self.mask();
        let max_block = self.descriptor.capacity - head_index;

        let mut bytes_read = 0usize;
        let mut messages_read = 0usize;

        while bytes_read < max_block && messages_read < limit {
            let record_offset = head_index + bytes_read;
            let header = self
                .buffer
                .get_i64_acquire(record_offset)
                .expect("record_offset is valid");
            let (length, msg_type) = unpack_header(header);
            if length <= 0 || (length as usize) < HEADER_LENGTH {
                break;
            }
            bytes_read += record::aligned(length as usize);
            if msg_type == PADDING_TYPE {
                continue;
            }
            handler(
                msg_type,
                &self.buffer,
                record::payload_offset(record_offset),
                length as usize - HEADER_LENGTH,
            );
            messages_read += 1;
        }

        if bytes_read > 0 {
            self.buffer
                .set_memory(head_index, bytes_read, 0)
                .expect("consumed range is within bounds");
            let new_head = head + bytes_read as i64;
            debug_assert_head_tail_bound!(new_head, self.producer_position());
            debug_assert_monotonic!("head", head, new_head);
            self.buffer
                .put_i64_release(self.descriptor.head_index, new_head)
                .expect("head_index is valid");
        }
        messages_read
    }

    /// Unsupported for the single-producer variant: there is no way for a
    /// producer to die mid-claim when claims are never contended, since the
    /// header is only ever visible once fully formed and released.
    #[must_use]
    pub fn unblock(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::MemoryRegion;
    use crate::trailer::TRAILER_LENGTH;

    fn make_region(capacity: usize) -> MemoryRegion {
        MemoryRegion::new(capacity + TRAILER_LENGTH)
    }

    #[test]
    fn write_then_read_single_message() {
        let region = make_region(1024);
        let buf = AtomicBuffer::new(&region);
        let mut ring = OneToOneRing::new(buf, 1024).unwrap();

        assert!(ring.write(7, &5i32.to_ne_bytes()).unwrap());

        let mut seen = Vec::new();
        let count = ring.read(
            |t, b, off, len| seen.push((t, b.get_i32(off).unwrap(), len)),
            usize::MAX,
        );
        assert_eq!(count, 1);
        assert_eq!(seen, vec![(7, 5, 4)]);
    }

    #[test]
    fn unblock_is_always_false() {
        let region = make_region(128);
        let buf = AtomicBuffer::new(&region);
        let ring = OneToOneRing::new(buf, 128).unwrap();
        assert!(!ring.unblock());
    }

    #[test]
    fn wrap_around_inserts_padding() {
        let region = make_region(32);
        let buf = AtomicBuffer::new(&region);
        let mut ring = OneToOneRing::new(buf, 32).unwrap();

        assert!(ring.write(1, &[0u8; 11]).unwrap());
        ring.read(|_, _, _, _| {}, 1);

        assert!(ring.write(2, &[0u8; 3]).unwrap());

        let padding_count = ring.read(|_, _, _, _| {}, usize::MAX);
        assert_eq!(padding_count, 0);

        let mut seen = Vec::new();
        let count = ring.read(|t, _b, _off, len| seen.push((t, len)), usize::MAX);
        assert_eq!(count, 1);
        assert_eq!(seen, vec![(2, 3)]);
    }

    #[test]
    fn write_rejects_oversized_message() {
        let region = make_region(64);
        let buf = AtomicBuffer::new(&region);
        let mut ring = OneToOneRing::new(buf, 64).unwrap();
        assert!(matches!(
            ring.write(1, &[0u8; 100]),
            Err(RingError::MessageTooLarge { .. })
        ));
    }
}
