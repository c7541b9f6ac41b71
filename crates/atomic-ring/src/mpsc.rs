//! Many-producer/single-consumer ring: the claim/write/commit/abort/read/
//! unblock protocol.
//!
//! Grounded directly in `ManyToOneRingBuffer` from the Aeron Rust port
//! (`examples/other_examples/...aeron-rs-src-concurrent-ringbuffer.rs.rs`):
//! same claim loop shape (load head-cache, loop on tail CAS, refresh head on
//! starvation), same wrap-padding handshake, same unblock scan. The trailer
//! offsets and the mandatory "advance tail to end even when starved" variant
//! of `claim_capacity` are this crate's own, following `trailer.rs`'s layout.

use crate::buffer::AtomicBuffer;
use crate::error::{Result, RingError};
use crate::invariants::{debug_assert_claimed, debug_assert_head_tail_bound, debug_assert_monotonic};
use crate::record::{self, HEADER_LENGTH, INSUFFICIENT_CAPACITY, PADDING_TYPE};
use crate::trailer::RingDescriptor;

/// Outcome driving a [`ManyToOneRing::controlled_read`] loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlledReadAction {
    /// Count this record, keep reading.
    Continue,
    /// Do not count this record; stop before advancing past it.
    Abort,
    /// Count this record, then stop.
    Break,
    /// Count this record, publish `head` immediately, and keep reading.
    Commit,
}

impl Default for ControlledReadAction {
    fn default() -> Self {
        Self::Continue
    }
}

/// A many-producer/single-consumer ring of framed binary records over an
/// [`AtomicBuffer`].
///
/// Cheap to copy (it borrows its buffer the same way `AtomicBuffer` does);
/// producer handles are created by copying a `ManyToOneRing` into each
/// producer thread, the same way the Aeron port hands out
/// `ManyToOneRingBuffer` by reference to multiple writer threads.
#[derive(Clone, Copy)]
pub struct ManyToOneRing<'a> {
    buffer: AtomicBuffer<'a>,
    descriptor: RingDescriptor,
    max_msg_length: usize,
}

impl<'a> ManyToOneRing<'a> {
    /// Builds a ring over `buffer`'s first `capacity` bytes plus trailer.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::CapacityNotPowerOfTwo`] or
    /// [`RingError::OutOfBounds`] if `capacity` is invalid or `buffer` is too
    /// small to hold `capacity + trailer_length`.
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

    /// Raw `tail` position (bytes since ring inception), acquire-loaded.
    #[must_use]
    pub fn producer_position(&self) -> i64 {
        self.buffer
            .get_i64_acquire(self.descriptor.tail_index)
            .expect("tail_index is valid and 8-byte aligned")
    }

    /// Raw `head` position (bytes since ring inception), acquire-loaded.
    #[must_use]
    pub fn consumer_position(&self) -> i64 {
        self.buffer
            .get_i64_acquire(self.descriptor.head_index)
            .expect("head_index is valid and 8-byte aligned")
    }

    /// Approximate occupancy: `tail - head`, clamped to `[0, capacity]`,
    /// obtained by reading head -> tail -> head and retrying if head moved.
    #[must_use]
    pub fn size(&self) -> usize {
        loop {
            let before = self.consumer_position();
            let tail = self.producer_position();
            let after = self.consumer_position();
            if before == after {
                let raw = tail - after;
                let capacity = self.descriptor.capacity as i64;
                return raw.clamp(0, capacity) as usize;
            }
        }
    }

    #[must_use]
    pub fn next_correlation_id(&self) -> i64 {
        self.buffer
            .get_and_add_i64(self.descriptor.correlation_index, 1)
            .expect("correlation_index is valid and 8-byte aligned")
    }

    #[must_use]
    pub fn consumer_heartbeat_time(&self) -> i64 {
        self.buffer
            .get_i64_acquire(self.descriptor.consumer_heartbeat_index)
            .expect("consumer_heartbeat_index is valid and 8-byte aligned")
    }

    pub fn set_consumer_heartbeat_time(&self, time_ms: i64) {
        self.buffer
            .put_i64_release(self.descriptor.consumer_heartbeat_index, time_ms)
            .expect("consumer_heartbeat_index is valid and 8-byte aligned");
    }

    /// Claims `required` (already §3-aligned) bytes for a record, returning
    /// the data-area offset to write at, or `INSUFFICIENT_CAPACITY`.
    ///
    /// A wrap-starved claim still advances `tail` to the buffer end as a
    /// pure-padding claim before returning `INSUFFICIENT_CAPACITY`, so that
    /// a racing producer at the wrap point is never livelocked waiting on a
    /// `tail` that never moves.
    fn claim_capacity(&self, required: usize) -> isize {
        let capacity = self.descriptor.capacity;
        let mask = self.mask();
        let mut head = self
            .buffer
            .get_i64_acquire(self.descriptor.head_cache_index)
            .expect("head_cache_index is valid");

        loop {
            let tail = self
                .buffer
                .get_i64_acquire(self.descriptor.tail_index)
                .expect("tail_index is valid");

            let available = capacity as i64 - (tail - head);
            if available < required as i64 {
                head = self.refresh_head_or_return(tail, required);
                if let RefreshOutcome::StillInsufficient = self.check_capacity(tail, head, required) {
                    return INSUFFICIENT_CAPACITY;
                }
            }

            let tail_index = (tail as usize) & mask;
            let to_end = capacity - tail_index;
            let mut padding = 0usize;
            let mut new_tail = tail + required as i64;
            let mut write_index = tail_index;

            if required > to_end {
                head = self
                    .buffer
                    .get_i64_acquire(self.descriptor.head_cache_index)
                    .expect("head_cache_index is valid");
                let head_wrapped = (head as usize) & mask;
                if required > head_wrapped {
                    head = self
                        .buffer
                        .get_i64_acquire(self.descriptor.head_index)
                        .expect("head_index is valid");
                    self.buffer
                        .put_i64_release(self.descriptor.head_cache_index, head)
                        .expect("head_cache_index is valid");
                    let head_wrapped = (head as usize) & mask;
                    if required > head_wrapped {
                        // Starved at the wrap point: still advance tail to
                        // the buffer end as pure padding.
                        let pad_new_tail = tail + to_end as i64;
                        if self.cas_tail(tail, pad_new_tail) {
                            self.publish_padding(tail_index, to_end);
                        }
                        return INSUFFICIENT_CAPACITY;
                    }
                }
                padding = to_end;
                new_tail = tail + (required + padding) as i64;
                write_index = 0;
            }

            if self.cas_tail(tail, new_tail) {
                debug_assert_monotonic!("tail", tail, new_tail);
                if padding != 0 {
                    self.publish_padding(tail_index, padding);
                }
                return write_index as isize;
            }
            // CAS lost the race; retry from the top without re-reading
            // head-cache unless this iteration already refreshed it.
        }
    }

    #[inline]
    fn cas_tail(&self, expected: i64, new: i64) -> bool {
        self.buffer
            .cas_i64(self.descriptor.tail_index, expected, new)
            .expect("tail_index is valid")
    }

    #[inline]
    fn refresh_head_or_return(&self, _tail: i64, _required: usize) -> i64 {
        let head = self
            .buffer
            .get_i64_acquire(self.descriptor.head_index)
            .expect("head_index is valid");
        self.buffer
            .put_i64_release(self.descriptor.head_cache_index, head)
            .expect("head_cache_index is valid");
        head
    }

    #[inline]
    fn check_capacity(&self, tail: i64, head: i64, required: usize) -> RefreshOutcome {
        let available = self.descriptor.capacity as i64 - (tail - head);
        if available < required as i64 {
            RefreshOutcome::StillInsufficient
        } else {
            RefreshOutcome::Ok
        }
    }

    /// Writes a padding record spanning `[index, index + len)`, making it
    /// immediately consumable.
    fn publish_padding(&self, index: usize, len: usize) {
        let length_off = record::length_offset(index);
        let type_off = record::type_offset(index);
        self.buffer
            .put_i32_release(length_off, -(len as i32))
            .expect("length_off is valid");
        std::sync::atomic::fence(std::sync::atomic::Ordering::Release);
        self.buffer
            .put_i32(type_off, PADDING_TYPE)
            .expect("type_off is valid");
        self.buffer
            .put_i32_release(length_off, len as i32)
            .expect("length_off is valid");
    }

    /// Claims space, then publishes a user record in one call.
    ///
    /// Returns `false` only when the ring cannot satisfy the claim after a
    /// fresh observation of `head`.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::InvalidMessageType`] if `msg_type < 1`, or
    /// [`RingError::MessageTooLarge`] if `src.len()` exceeds
    /// [`Self::max_msg_length`] minus the header.
    pub fn write(&self, msg_type: i32, src: &[u8]) -> Result<bool> {
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
        let index = self.claim_capacity(required);
        if index == INSUFFICIENT_CAPACITY {
            return Ok(false);
        }
        let index = index as usize;
        let length_off = record::length_offset(index);
        let type_off = record::type_offset(index);
        let payload_off = record::payload_offset(index);

        self.buffer
            .put_i32_release(length_off, -(record_len as i32))
            .expect("length_off is valid");
        std::sync::atomic::fence(std::sync::atomic::Ordering::Release);
        self.buffer.put_i32(type_off, msg_type).expect("type_off is valid");
        self.buffer
            .put_bytes(payload_off, src)
            .expect("payload_off is valid");
        self.buffer
            .put_i32_release(length_off, record_len as i32)
            .expect("length_off is valid");
        Ok(true)
    }

    /// Claims `len` bytes of payload space, leaving the record claimed.
    /// Returns the payload offset, or `INSUFFICIENT_CAPACITY`.
    ///
    /// # Errors
    ///
    /// As [`Self::write`], for an invalid `msg_type` or oversized `len`.
    pub fn try_claim(&self, msg_type: i32, len: usize) -> Result<isize> {
        if !record::is_valid_user_type(msg_type) {
            return Err(RingError::InvalidMessageType { type_id: msg_type });
        }
        let record_len = HEADER_LENGTH + len;
        if record_len > self.max_msg_length {
            return Err(RingError::MessageTooLarge {
                length: record_len,
                max: self.max_msg_length,
            });
        }
        let required = record::aligned(record_len);
        let index = self.claim_capacity(required);
        if index == INSUFFICIENT_CAPACITY {
            return Ok(INSUFFICIENT_CAPACITY);
        }
        let index = index as usize;
        let length_off = record::length_offset(index);
        let type_off = record::type_offset(index);

        self.buffer
            .put_i32_release(length_off, -(record_len as i32))
            .expect("length_off is valid");
        std::sync::atomic::fence(std::sync::atomic::Ordering::Release);
        self.buffer.put_i32(type_off, msg_type).expect("type_off is valid");
        Ok(record::payload_offset(index) as isize)
    }

    fn finalize(&self, index: usize, as_padding: bool) -> Result<()> {
        let length_off = record::length_offset(index);
        let current = self
            .buffer
            .get_i32(length_off)
            .expect("length_off is valid");
        if current >= 0 {
            let type_off = record::type_offset(index);
            let stored_type = self.buffer.get_i32(type_off).expect("type_off is valid");
            let was = if stored_type == PADDING_TYPE {
                "previously aborted"
            } else {
                "previously committed"
            };
            return Err(RingError::AlreadyFinalized { index, was });
        }
        debug_assert_claimed!(current);
        let record_len = -current;
        if as_padding {
            let type_off = record::type_offset(index);
            self.buffer
                .put_i32(type_off, PADDING_TYPE)
                .expect("type_off is valid");
        }
        self.buffer
            .put_i32_release(length_off, record_len)
            .expect("length_off is valid");
        Ok(())
    }

    /// Flips a claimed record to committed.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::AlreadyFinalized`] if the record at `index` is
    /// no longer claimed (already committed or aborted — the stored `type`
    /// field distinguishes which).
    pub fn commit(&self, index: usize) -> Result<()> {
        self.finalize(record_header_index(index), false)
    }

    /// Flips a claimed record to a committed padding record; the consumer
    /// will skip it.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::AlreadyFinalized`] if the record at `index` is
    /// no longer claimed (already committed or aborted — the stored `type`
    /// field distinguishes which).
    pub fn abort(&self, index: usize) -> Result<()> {
        self.finalize(record_header_index(index), true)
    }

    /// Drains up to `limit` contiguous records starting at `head`, invoking
    /// `handler(type, buffer, payload_offset, payload_len)` for each user
    /// message. Returns the number of user messages processed.
    ///
    /// `head` is advanced past every byte examined on every exit path,
    /// including a panicking handler via the drop guard in
    /// [`HeadAdvanceGuard`]: a handler failure still advances head past the
    /// failing record.
    pub fn read<F>(&self, mut handler: F, limit: usize) -> usize
    where
        F: FnMut(i32, &AtomicBuffer<'_>, usize, usize),
    {
        let head = self
            .buffer
            .get_i64(self.descriptor.head_index)
            .expect("head_index is valid");
        let head_index = (head as usize) & self.mask();
        let max_block = self.descriptor.capacity - head_index;

        let mut guard = HeadAdvanceGuard::new(self, head, head_index);
        let mut messages_read = 0usize;

        while guard.bytes_read < max_block && messages_read < limit {
            let record_offset = head_index + guard.bytes_read;
            let length_off = record::length_offset(record_offset);
            let length = self
                .buffer
                .get_i32_acquire(length_off)
                .expect("length_off is valid");
            if length <= 0 || (length as usize) < HEADER_LENGTH {
                break;
            }
            guard.bytes_read += record::aligned(length as usize);

            let type_off = record::type_offset(record_offset);
            let msg_type = self.buffer.get_i32(type_off).expect("type_off is valid");
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
        guard.commit();
        messages_read
    }

    /// As [`Self::read`], but `handler` returns a [`ControlledReadAction`]
    /// driving counting/publication: `Abort` un-counts the current record
    /// and stops before advancing; `Break` counts it and stops; `Commit`
    /// counts it, publishes `head` immediately, and continues; `Continue`
    /// is the default.
    pub fn controlled_read<F>(&self, mut handler: F, limit: usize) -> usize
    where
        F: FnMut(i32, &AtomicBuffer<'_>, usize, usize) -> ControlledReadAction,
    {
        let head = self
            .buffer
            .get_i64(self.descriptor.head_index)
            .expect("head_index is valid");
        let head_index = (head as usize) & self.mask();
        let max_block = self.descriptor.capacity - head_index;

        let mut guard = HeadAdvanceGuard::new(self, head, head_index);
        let mut messages_read = 0usize;

        while guard.bytes_read < max_block && messages_read < limit {
            let record_offset = head_index + guard.bytes_read;
            let length_off = record::length_offset(record_offset);
            let length = self
                .buffer
                .get_i32_acquire(length_off)
                .expect("length_off is valid");
            if length <= 0 || (length as usize) < HEADER_LENGTH {
                break;
            }
            let aligned_len = record::aligned(length as usize);

            let type_off = record::type_offset(record_offset);
            let msg_type = self.buffer.get_i32(type_off).expect("type_off is valid");

            if msg_type == PADDING_TYPE {
                guard.bytes_read += aligned_len;
                continue;
            }

            let action = handler(
                msg_type,
                &self.buffer,
                record::payload_offset(record_offset),
                length as usize - HEADER_LENGTH,
            );
            match action {
                ControlledReadAction::Continue => {
                    guard.bytes_read += aligned_len;
                    messages_read += 1;
                }
                ControlledReadAction::Abort => {
                    break;
                }
                ControlledReadAction::Break => {
                    guard.bytes_read += aligned_len;
                    messages_read += 1;
                    break;
                }
                ControlledReadAction::Commit => {
                    guard.bytes_read += aligned_len;
                    messages_read += 1;
                    guard.commit_partial();
                }
            }
        }
        guard.commit();
        messages_read
    }

    /// Recovers a stranded claim left behind by a dead producer.
    ///
    /// Returns `true` if a recovery action was taken (a stranded claim was
    /// converted to padding, or a zero-length gap was bridged), `false` if
    /// the ring is not blocked or the slot under inspection is genuinely
    /// still in flight.
    pub fn unblock(&self) -> bool {
        let head = self
            .buffer
            .get_i64_acquire(self.descriptor.head_index)
            .expect("head_index is valid");
        let tail = self
            .buffer
            .get_i64_acquire(self.descriptor.tail_index)
            .expect("tail_index is valid");
        if head == tail {
            return false;
        }

        let mask = self.mask();
        let capacity = self.descriptor.capacity;
        let ci = (head as usize) & mask;
        let pi = (tail as usize) & mask;

        let length_off = record::length_offset(ci);
        let length = self.buffer.get_i32_acquire(length_off).expect("length_off is valid");

        if length < 0 {
            let type_off = record::type_offset(ci);
            self.buffer
                .put_i32(type_off, PADDING_TYPE)
                .expect("type_off is valid");
            self.buffer
                .put_i32_release(length_off, -length)
                .expect("length_off is valid");
            return true;
        }

        if length == 0 {
            let scan_end = if pi > ci { pi } else { capacity };
            let mut scan = ci + HEADER_LENGTH;
            while scan < scan_end {
                let candidate_len = self
                    .buffer
                    .get_i32_acquire(record::length_offset(scan))
                    .expect("scan offset is valid");
                if candidate_len != 0 {
                    let mut all_zero = true;
                    let mut back = ci;
                    while back < scan {
                        if self
                            .buffer
                            .get_i32_acquire(record::length_offset(back))
                            .expect("back offset is valid")
                            != 0
                        {
                            all_zero = false;
                            break;
                        }
                        back += HEADER_LENGTH;
                    }
                    if all_zero {
                        self.publish_padding(ci, scan - ci);
                        return true;
                    }
                    return false;
                }
                scan += HEADER_LENGTH;
            }
            return false;
        }

        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Ok,
    StillInsufficient,
}

/// `commit`/`abort` accept the payload offset returned by `try_claim`;
/// normalize it back to the record's header offset.
#[inline]
fn record_header_index(payload_index: usize) -> usize {
    payload_index - HEADER_LENGTH
}

/// Ensures `head` is published past everything examined by a `read`/
/// `controlled_read` call, on every exit path — including an early return
/// via a panicking handler — by publishing in `Drop`.
///
/// Zeroes the consumed bytes (so `unblock` can tell unclaimed regions from
/// stale claims), then release-stores the new `head`.
struct HeadAdvanceGuard<'r, 'a> {
    ring: &'r ManyToOneRing<'a>,
    head: i64,
    head_index: usize,
    bytes_read: usize,
    published: usize,
    committed: bool,
}

impl<'r, 'a> HeadAdvanceGuard<'r, 'a> {
    fn new(ring: &'r ManyToOneRing<'a>, head: i64, head_index: usize) -> Self {
        Self {
            ring,
            head,
            head_index,
            bytes_read: 0,
            published: 0,
            committed: false,
        }
    }

    /// Publishes everything read so far without ending the loop — used by
    /// `ControlledReadAction::Commit`.
    fn commit_partial(&mut self) {
        self.publish_up_to(self.bytes_read);
    }

    /// Final publish, called once the read loop has finished.
    fn commit(mut self) {
        self.publish_up_to(self.bytes_read);
        self.committed = true;
    }

    fn publish_up_to(&mut self, bytes_read: usize) {
        if bytes_read <= self.published {
            return;
        }
        let start = self.head_index + self.published;
        let len = bytes_read - self.published;
        self.ring
            .buffer
            .set_memory(start, len, 0)
            .expect("consumed range is within bounds");
        let new_head = self.head + bytes_read as i64;
        debug_assert_head_tail_bound!(new_head, self.ring.producer_position());
        debug_assert_monotonic!("head", self.head, new_head);
        self.ring
            .buffer
            .put_i64_release(self.ring.descriptor.head_index, new_head)
            .expect("head_index is valid");
        self.published = bytes_read;
        self.head = new_head;
        self.head_index = (new_head as usize) & self.ring.mask();
        self.bytes_read = 0;
    }
}

impl<'r, 'a> Drop for HeadAdvanceGuard<'r, 'a> {
    fn drop(&mut self) {
        if !self.committed && self.bytes_read > self.published {
            self.publish_up_to(self.bytes_read);
        }
    }
}
