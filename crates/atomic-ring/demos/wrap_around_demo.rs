//! Demonstrates the wrap-around padding protocol on a small ring: a record
//! that would straddle the physical end of the buffer forces a padding
//! record to the end first, then wraps to offset 0.

use atomic_ring::{AtomicBuffer, ManyToOneRing, MemoryRegion};

const CAPACITY: usize = 32;

fn main() {
    let region = MemoryRegion::new(CAPACITY + atomic_ring::TRAILER_LENGTH);
    let buffer = AtomicBuffer::new(&region);
    let ring = ManyToOneRing::new(buffer, CAPACITY).unwrap();

    ring.write(1, &[0u8; 11]).unwrap();
    let consumed = ring.read(|t, _b, _off, len| println!("record: type={t} len={len}"), 1);
    println!("consumed {consumed} record(s) from the first write");

    // This record's 16 aligned bytes don't fit in the remaining 8 bytes
    // before the buffer end, so the ring pads to the end and wraps.
    ring.write(2, &[0u8; 3]).unwrap();

    let padding_skipped = ring.read(|_, _, _, _| unreachable!("padding is never handed to the handler"), usize::MAX);
    println!("padding-only read observed {padding_skipped} user records (expected 0)");

    ring.read(
        |t, _b, _off, len| println!("record after wrap: type={t} len={len}"),
        usize::MAX,
    );
}
