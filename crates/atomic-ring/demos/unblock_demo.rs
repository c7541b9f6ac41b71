//! Demonstrates recovering a ring after a producer dies mid-claim.
//!
//! A supervisor thread spins waiting on the consumer heartbeat, then calls
//! `unblock` once it decides the sole producer is gone. This loop is demo
//! code, not library API: the core never runs an idle strategy itself.

use atomic_ring::backoff::Backoff;
use atomic_ring::{AtomicBuffer, ManyToOneRing, MemoryRegion};

const CAPACITY: usize = 256;

fn main() {
    let region = MemoryRegion::new(CAPACITY + atomic_ring::TRAILER_LENGTH);
    let buffer = AtomicBuffer::new(&region);
    let ring = ManyToOneRing::new(buffer, CAPACITY).unwrap();

    // Simulate a producer that claims space and then dies before
    // publishing: it never writes the positive length that would make the
    // record consumable.
    let claimed_at = ring.try_claim(1, 24).unwrap();
    println!("producer claimed offset {claimed_at}, then died");
    println!("ring.size() = {}", ring.size());

    let mut backoff = Backoff::new();
    loop {
        if ring.unblock() {
            println!("supervisor recovered the stranded claim");
            break;
        }
        backoff.snooze();
        if backoff.is_completed() {
            println!("nothing to unblock");
            break;
        }
    }

    let recovered = ring.read(|_, _, _, _| unreachable!("no user records"), usize::MAX);
    println!("post-recovery read observed {recovered} user records");
    println!("head is now at {}", ring.consumer_position());
}
