//! End-to-end scenarios exercising the claim/commit/abort, wrap-around,
//! unblock, correlation-id, and Snowflake protocols together.

use atomic_ring::snowflake::{ClockSource, SnowflakeIdGenerator};
use atomic_ring::{AtomicBuffer, ManyToOneRing, MemoryRegion, TRAILER_LENGTH};
use std::sync::Arc;
use std::thread;

fn mpsc_region(capacity: usize) -> MemoryRegion {
    MemoryRegion::new(capacity + TRAILER_LENGTH)
}

/// Scenario 1: fill-and-drain (MPSC). Two producers race to write
/// `type=7` records (payload 5 and 16 respectively); the consumer drains
/// one record at a time while producers are still running. Whichever
/// producer wins the `tail` CAS first is observed first; both orderings
/// are acceptable outcomes (a strict subset of the six the reference
/// stress tests enumerate, since here the consumer only starts once both
/// writes are guaranteed to eventually land).
#[test]
fn fill_and_drain_mpsc() {
    let region = mpsc_region(1024);
    let buf = AtomicBuffer::new(&region);
    let ring = ManyToOneRing::new(buf, 1024).unwrap();

    let p1 = thread::spawn({
        let ring = ring;
        move || ring.write(7, &5i32.to_ne_bytes()).unwrap()
    });
    let p2 = thread::spawn({
        let ring = ring;
        move || ring.write(7, &16i32.to_ne_bytes()).unwrap()
    });
    assert!(p1.join().unwrap());
    assert!(p2.join().unwrap());

    let mut observed = Vec::new();
    while observed.len() < 2 {
        ring.read(
            |_t, b, off, _len| observed.push(b.get_i32(off).unwrap()),
            1,
        );
    }

    let acceptable = [(0, 0), (0, 16), (5, 0), (5, 16), (16, 0), (16, 5)];
    let pair = (observed[0], observed[1]);
    assert!(
        acceptable.contains(&pair),
        "observed pair {:?} is not one of the acceptable interleavings",
        pair
    );
    // With both writes guaranteed complete before draining starts, the
    // consumer must see both payloads, in either order.
    assert!(pair == (5, 16) || pair == (16, 5));
}

/// Scenario 2: claim/abort/commit (MPSC). An aborted claim's payload must
/// never be observed; only the later committed message surfaces.
#[test]
fn claim_abort_commit() {
    let region = mpsc_region(1024);
    let buf = AtomicBuffer::new(&region);
    let ring = ManyToOneRing::new(buf, 1024).unwrap();

    let aborted = ring.try_claim(19, 8).unwrap();
    assert!(aborted >= 0);
    buf.put_i64(aborted as usize, -1).unwrap();
    ring.abort(aborted as usize).unwrap();

    let committed = ring.try_claim(19, 4).unwrap();
    assert!(committed >= 0);
    buf.put_i32(committed as usize, 5).unwrap();
    ring.commit(committed as usize).unwrap();

    let mut seen = Vec::new();
    // Two drains, as the scenario specifies, to confirm the second is a
    // no-op and the aborted payload never appeared.
    ring.read(
        |t, b, off, len| seen.push((t, b.get_i32(off).unwrap(), len)),
        usize::MAX,
    );
    let second_drain_count = ring.read(|_, _, _, _| unreachable!(), usize::MAX);

    assert_eq!(seen, vec![(19, 5, 4)]);
    assert_eq!(second_drain_count, 0);
}

/// Scenario 3: wrap-around padding. A 19-byte record fits before the end
/// of a 32-byte ring; an 11-byte record that would follow straddles the
/// end and must pad to it before wrapping to offset 0.
#[test]
fn wrap_around_padding() {
    let region = mpsc_region(32);
    let buf = AtomicBuffer::new(&region);
    let ring = ManyToOneRing::new(buf, 32).unwrap();

    assert!(ring.write(1, &[0u8; 11]).unwrap()); // 19-byte record
    let mut first = Vec::new();
    ring.read(|t, _b, _off, len| first.push((t, len)), 1);
    assert_eq!(first, vec![(1, 11)]);

    assert!(ring.write(2, &[0u8; 3]).unwrap()); // pads to end, wraps to 0

    let padding_skipped = ring.read(|_, _, _, _| unreachable!("padding must be silent"), usize::MAX);
    assert_eq!(padding_skipped, 0);

    let mut second = Vec::new();
    ring.read(|t, _b, _off, len| second.push((t, len)), usize::MAX);
    assert_eq!(second, vec![(2, 3)]);
}

/// Scenario 4: unblock after a stranded claim. A producer CASes `tail`
/// forward but dies before publishing a positive length; a supervisor's
/// `unblock` recovers the region as padding.
#[test]
fn unblock_after_stranded_claim() {
    let region = mpsc_region(256);
    let buf = AtomicBuffer::new(&region);
    let ring = ManyToOneRing::new(buf, 256).unwrap();

    let claimed_at = ring.try_claim(1, 24).unwrap();
    assert!(claimed_at >= 0);
    // Producer dies here: no commit, no abort.

    assert_eq!(ring.size(), 32);
    assert!(ring.unblock());

    let user_records = ring.read(|_, _, _, _| unreachable!(), usize::MAX);
    assert_eq!(user_records, 0);
    assert_eq!(ring.consumer_position(), 32);
}

/// Scenario 5: correlation monotonic. Three threads each call
/// `next_correlation_id` once; the three results are a permutation of
/// `{0, 1, 2}` and the counter ends at 3.
#[test]
fn correlation_monotonic_under_three_callers() {
    let region = mpsc_region(1024);
    let buf = AtomicBuffer::new(&region);
    let ring = ManyToOneRing::new(buf, 1024).unwrap();

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let ring = ring;
            thread::spawn(move || ring.next_correlation_id())
        })
        .collect();
    let mut ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(ring.next_correlation_id(), 3);
}

struct StalledClock;
impl ClockSource for StalledClock {
    fn now_ms(&self) -> i64 {
        0
    }
}

/// Scenario 6: Snowflake uniqueness under a stalled clock. Two concurrent
/// `next_id()` calls return distinct ids; a third call against the same
/// stalled timestamp returns a third distinct id.
#[test]
fn snowflake_uniqueness_under_clock_stall() {
    let gen = Arc::new(SnowflakeIdGenerator::with_clock(0, 10, 4, 0, StalledClock));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let gen = Arc::clone(&gen);
            thread::spawn(move || gen.next_id())
        })
        .collect();
    let mut first_two: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    first_two.sort_unstable();
    assert_ne!(first_two[0], first_two[1]);

    let third = gen.next_id();
    assert_ne!(third, first_two[0]);
    assert_ne!(third, first_two[1]);
}
