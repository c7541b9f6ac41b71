//! Property-based tests for the ring's quantified invariants: head/tail
//! bounds, tail monotonicity, and the Dekker no-stale-read guarantee.

use atomic_ring::{AtomicBuffer, ManyToOneRing, MemoryRegion, OneToOneRing, TRAILER_LENGTH};
use proptest::prelude::*;

fn mpsc_ring(capacity: usize) -> (MemoryRegion, usize) {
    (MemoryRegion::new(capacity + TRAILER_LENGTH), capacity)
}

proptest! {
    /// `0 <= head <= tail`, `tail - head <= capacity` after any sequence of
    /// writes and reads.
    #[test]
    fn prop_head_tail_bound_mpsc(
        payload_lens in prop::collection::vec(0usize..32, 1..40),
        drain_every in 1usize..5,
    ) {
        let (region, capacity) = mpsc_ring(4096);
        let buf = AtomicBuffer::new(&region);
        let ring = ManyToOneRing::new(buf, capacity).unwrap();

        for (i, len) in payload_lens.iter().enumerate() {
            let payload = vec![0u8; *len];
            let _ = ring.write(1, &payload);

            let head = ring.consumer_position();
            let tail = ring.producer_position();
            prop_assert!(head <= tail, "head {} > tail {}", head, tail);
            prop_assert!((tail - head) as usize <= capacity);

            if i % drain_every == 0 {
                ring.read(|_, _, _, _| {}, usize::MAX);
                let head = ring.consumer_position();
                let tail = ring.producer_position();
                prop_assert!(head <= tail);
            }
        }
    }

    /// `tail` only ever increases across a sequence of writes.
    #[test]
    fn prop_tail_monotonic_mpsc(payload_lens in prop::collection::vec(0usize..32, 1..40)) {
        let (region, capacity) = mpsc_ring(4096);
        let buf = AtomicBuffer::new(&region);
        let ring = ManyToOneRing::new(buf, capacity).unwrap();

        let mut last_tail = ring.producer_position();
        for len in payload_lens {
            let payload = vec![0u8; len];
            let _ = ring.write(1, &payload);
            let tail = ring.producer_position();
            prop_assert!(tail >= last_tail);
            last_tail = tail;
        }
    }

    /// Every record written and then drained is observed exactly once, with
    /// its original type and payload length intact (the Dekker invariant:
    /// no reader ever sees a stale type/payload under a fresh length).
    #[test]
    fn prop_every_write_is_read_exactly_once(
        lens in prop::collection::vec(0usize..64, 1..30),
    ) {
        let (region, capacity) = mpsc_ring(8192);
        let buf = AtomicBuffer::new(&region);
        let ring = ManyToOneRing::new(buf, capacity).unwrap();

        let mut written = Vec::new();
        for (i, len) in lens.iter().enumerate() {
            let msg_type = (i as i32 % 1000) + 1;
            let payload = vec![(i % 256) as u8; *len];
            if ring.write(msg_type, &payload).unwrap() {
                written.push((msg_type, payload));
            }
        }

        let mut observed = Vec::new();
        ring.read(
            |t, b, off, len| observed.push((t, b.get_bytes(off, len).unwrap().to_vec())),
            usize::MAX,
        );

        prop_assert_eq!(observed.len(), written.len());
        for ((exp_type, exp_payload), (got_type, got_payload)) in written.iter().zip(observed.iter()) {
            prop_assert_eq!(exp_type, got_type);
            prop_assert_eq!(exp_payload, got_payload);
        }
    }

    /// The SPSC ring obeys the same head/tail bound as MPSC.
    #[test]
    fn prop_head_tail_bound_spsc(payload_lens in prop::collection::vec(0usize..32, 1..40)) {
        let region = MemoryRegion::new(4096 + TRAILER_LENGTH);
        let buf = AtomicBuffer::new(&region);
        let mut ring = OneToOneRing::new(buf, 4096).unwrap();

        for len in payload_lens {
            let payload = vec![0u8; len];
            let _ = ring.write(1, &payload);
            let head = ring.consumer_position();
            let tail = ring.producer_position();
            prop_assert!(head <= tail);
            prop_assert!((tail - head) as usize <= 4096);
            ring.read(|_, _, _, _| {}, usize::MAX);
        }
    }
}
