//! `AtomicBuffer`: the sole gateway to a [`MemoryRegion`](crate::region::MemoryRegion).
//!
//! Exposes width-typed accessors at byte offsets, grouped by access kind:
//! plain, opaque/relaxed, acquire, release, volatile, compare-and-set,
//! get-and-add/get-and-set, block copy, and `set_memory`. `AtomicBuffer` is
//! itself `Copy` — it is a `(ptr, len)` view, not an owner — so cloning one
//! to hand to another producer thread is free; the view simply borrows the
//! region for `'a`.
//!
//! The atomic accessors reinterpret bytes in place as `AtomicI32`/`AtomicU32`/
//! `AtomicI64`/`AtomicU64` — the same technique the Aeron Rust port
//! (`bspeice/aeron-rs`) uses to implement `get_i64_volatile`/`put_i64_ordered`/
//! `compare_and_set_i64` over a `&[u8]`, rather than storing `AtomicU64`
//! fields directly in a struct. This buffer only borrows a view into bytes
//! it does not own the Rust type of, so the reinterpret-in-place approach is
//! the only one available.

use crate::error::{Result, RingError};
use crate::region::MemoryRegion;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};

/// Byte order for plain integer/float accessors. Ring and trailer metadata
/// always use [`ByteOrder::Native`]; this exists for payload bytes a caller
/// chooses to interpret as integers in a specific order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Native,
    Little,
    Big,
}

/// A bounds-checked, ordered/atomic view `(base, length)` over a byte region.
///
/// `base` is guaranteed 8-byte aligned by construction (it is borrowed from
/// a [`MemoryRegion`], which enforces that). Every accessor checks
/// `0 <= index` and `index + width <= length`; ordered/atomic accessors
/// additionally check that `index` is aligned to `width`.
#[derive(Clone, Copy)]
pub struct AtomicBuffer<'a> {
    ptr: *mut u8,
    len: usize,
    _region: std::marker::PhantomData<&'a MemoryRegion>,
}

// SAFETY: AtomicBuffer does not own its bytes; Send/Sync are sound under the
// same discipline as the region it borrows (exclusive-writer-per-slot,
// enforced by the ring protocols built on top, not by this type itself).
unsafe impl<'a> Send for AtomicBuffer<'a> {}
unsafe impl<'a> Sync for AtomicBuffer<'a> {}

macro_rules! bounds_check {
    ($self:ident, $index:expr, $width:expr) => {
        #[cfg(not(feature = "disable_bounds_checks"))]
        if $index.checked_add($width).map_or(true, |end| end > $self.len) {
            return Err(RingError::OutOfBounds {
                index: $index,
                width: $width,
                capacity: $self.len,
            });
        }
    };
}

macro_rules! align_check {
    ($index:expr, $width:expr) => {
        if $index % $width != 0 {
            return Err(RingError::Misaligned {
                index: $index,
                width: $width,
            });
        }
    };
}

impl<'a> AtomicBuffer<'a> {
    /// Borrows the whole of `region` as a buffer view.
    #[must_use]
    pub fn new(region: &'a MemoryRegion) -> Self {
        Self {
            ptr: region.as_ptr(),
            len: region.len(),
            _region: std::marker::PhantomData,
        }
    }

    /// Total length of this view in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn byte_ptr(&self, index: usize) -> *mut u8 {
        // SAFETY: caller has already bounds-checked `index` against `self.len`.
        unsafe { self.ptr.add(index) }
    }

    // -------------------------------------------------------------------
    // Plain accessors (no cross-thread ordering guarantees)
    // -------------------------------------------------------------------

    /// Reads `N` raw bytes at `index` with no ordering guarantees.
    #[inline]
    pub fn get_bytes(&self, index: usize, len: usize) -> Result<&'a [u8]> {
        bounds_check!(self, index, len);
        // SAFETY: bounds-checked above; lifetime tied to the borrowed region.
        Ok(unsafe { std::slice::from_raw_parts(self.byte_ptr(index), len) })
    }

    /// Writes `src` at `index` with a single contiguous store, no ordering.
    #[inline]
    pub fn put_bytes(&self, index: usize, src: &[u8]) -> Result<()> {
        bounds_check!(self, index, src.len());
        // SAFETY: bounds-checked above; regions do not alias Rust references.
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), self.byte_ptr(index), src.len());
        }
        Ok(())
    }

    /// Copies `len` bytes from `src` at `src_off` into `self` at `index`.
    /// A single contiguous memcpy; not required to be atomic.
    pub fn copy_from(&self, index: usize, src: &AtomicBuffer<'_>, src_off: usize, len: usize) -> Result<()> {
        bounds_check!(self, index, len);
        if src_off + len > src.len {
            return Err(RingError::OutOfBounds {
                index: src_off,
                width: len,
                capacity: src.len,
            });
        }
        // SAFETY: both ranges bounds-checked; `copy` tolerates overlap.
        unsafe {
            std::ptr::copy(src.byte_ptr(src_off), self.byte_ptr(index), len);
        }
        Ok(())
    }

    /// Copies `len` bytes from `self` at `index` into `dst` at `dst_off`.
    pub fn copy_to(&self, index: usize, dst: &AtomicBuffer<'_>, dst_off: usize, len: usize) -> Result<()> {
        dst.copy_from(dst_off, self, index, len)
    }

    /// Fills `len` bytes starting at `index` with `value`.
    pub fn set_memory(&self, index: usize, len: usize, value: u8) -> Result<()> {
        bounds_check!(self, index, len);
        // SAFETY: bounds-checked above.
        unsafe {
            std::ptr::write_bytes(self.byte_ptr(index), value, len);
        }
        Ok(())
    }

    #[inline]
    fn swap_on_write<T: SwapBytes>(v: T, order: ByteOrder) -> T {
        match order {
            ByteOrder::Native => v,
            ByteOrder::Little => v.to_le(),
            ByteOrder::Big => v.to_be(),
        }
    }

    #[inline]
    fn swap_on_read<T: SwapBytes>(v: T, order: ByteOrder) -> T {
        match order {
            ByteOrder::Native => v,
            ByteOrder::Little => T::from_le(v),
            ByteOrder::Big => T::from_be(v),
        }
    }
}

trait SwapBytes: Copy {
    fn to_le(self) -> Self;
    fn to_be(self) -> Self;
    fn from_le(self) -> Self;
    fn from_be(self) -> Self;
}

macro_rules! impl_swap_bytes {
    ($($t:ty),*) => {
        $(
            impl SwapBytes for $t {
                #[inline] fn to_le(self) -> Self { <$t>::to_le(self) }
                #[inline] fn to_be(self) -> Self { <$t>::to_be(self) }
                #[inline] fn from_le(self) -> Self { <$t>::from_le(self) }
                #[inline] fn from_be(self) -> Self { <$t>::from_be(self) }
            }
        )*
    };
}
impl_swap_bytes!(i16, u16, i32, u32, i64, u64);

macro_rules! plain_accessor {
    ($get:ident, $put:ident, $get_order:ident, $put_order:ident, $t:ty) => {
        impl<'a> AtomicBuffer<'a> {
            #[doc = concat!("Plain (unordered) read of a ", stringify!($t), " with a caller-chosen byte order.")]
            pub fn $get_order(&self, index: usize, order: ByteOrder) -> Result<$t> {
                bounds_check!(self, index, std::mem::size_of::<$t>());
                // SAFETY: bounds-checked above; unaligned reads are legal for plain access.
                let v = unsafe { self.byte_ptr(index).cast::<$t>().read_unaligned() };
                Ok(Self::swap_on_read(v, order))
            }

            #[doc = concat!("Plain (unordered) read of a ", stringify!($t), " in native byte order.")]
            #[inline]
            pub fn $get(&self, index: usize) -> Result<$t> {
                self.$get_order(index, ByteOrder::Native)
            }

            #[doc = concat!("Plain (unordered) write of a ", stringify!($t), " with a caller-chosen byte order.")]
            pub fn $put_order(&self, index: usize, value: $t, order: ByteOrder) -> Result<()> {
                bounds_check!(self, index, std::mem::size_of::<$t>());
                let v = Self::swap_on_write(value, order);
                // SAFETY: bounds-checked above.
                unsafe { self.byte_ptr(index).cast::<$t>().write_unaligned(v) };
                Ok(())
            }

            #[doc = concat!("Plain (unordered) write of a ", stringify!($t), " in native byte order.")]
            #[inline]
            pub fn $put(&self, index: usize, value: $t) -> Result<()> {
                self.$put_order(index, value, ByteOrder::Native)
            }
        }
    };
}

plain_accessor!(get_i16, put_i16, get_i16_with_order, put_i16_with_order, i16);
plain_accessor!(get_u16, put_u16, get_u16_with_order, put_u16_with_order, u16);
plain_accessor!(get_i32, put_i32, get_i32_with_order, put_i32_with_order, i32);
plain_accessor!(get_u32, put_u32, get_u32_with_order, put_u32_with_order, u32);
plain_accessor!(get_i64, put_i64, get_i64_with_order, put_i64_with_order, i64);
plain_accessor!(get_u64, put_u64, get_u64_with_order, put_u64_with_order, u64);

impl<'a> AtomicBuffer<'a> {
    /// Plain read of an `i8`.
    pub fn get_i8(&self, index: usize) -> Result<i8> {
        bounds_check!(self, index, 1);
        Ok(unsafe { self.byte_ptr(index).cast::<i8>().read() })
    }

    /// Plain write of an `i8`.
    pub fn put_i8(&self, index: usize, value: i8) -> Result<()> {
        bounds_check!(self, index, 1);
        unsafe { self.byte_ptr(index).cast::<i8>().write(value) };
        Ok(())
    }

    /// Plain read of an `f64` in native byte order.
    pub fn get_f64(&self, index: usize) -> Result<f64> {
        Ok(f64::from_bits(self.get_u64(index)?))
    }

    /// Plain write of an `f64` in native byte order.
    pub fn put_f64(&self, index: usize, value: f64) -> Result<()> {
        self.put_u64(index, value.to_bits())
    }

    /// Plain read of an `f32` in native byte order.
    pub fn get_f32(&self, index: usize) -> Result<f32> {
        Ok(f32::from_bits(self.get_u32(index)?))
    }

    /// Plain write of an `f32` in native byte order.
    pub fn put_f32(&self, index: usize, value: f32) -> Result<()> {
        self.put_u32(index, value.to_bits())
    }
}

// -------------------------------------------------------------------
// Ordered/atomic accessors — natural-width slots only, native order only.
// -------------------------------------------------------------------

macro_rules! atomic_accessor {
    ($width:expr, $t:ty, $atomic:ty,
     $get_opaque:ident, $put_opaque:ident,
     $get_acquire:ident, $put_release:ident,
     $get_volatile:ident, $put_volatile:ident,
     $cas:ident, $get_and_add:ident, $get_and_set:ident) => {
        impl<'a> AtomicBuffer<'a> {
            #[doc = "Opaque (relaxed) load — ordered relative to no other access."]
            #[inline]
            pub fn $get_opaque(&self, index: usize) -> Result<$t> {
                bounds_check!(self, index, $width);
                align_check!(index, $width);
                // SAFETY: bounds/alignment checked above; the slot is
                // natural-width and reinterpreted as its matching atomic.
                let a = unsafe { &*self.byte_ptr(index).cast::<$atomic>() };
                Ok(a.load(Ordering::Relaxed))
            }

            #[doc = "Opaque (relaxed) store — ordered relative to no other access."]
            #[inline]
            pub fn $put_opaque(&self, index: usize, value: $t) -> Result<()> {
                bounds_check!(self, index, $width);
                align_check!(index, $width);
                let a = unsafe { &*self.byte_ptr(index).cast::<$atomic>() };
                a.store(value, Ordering::Relaxed);
                Ok(())
            }

            #[doc = "Acquire load — synchronizes with a paired release store at the same offset."]
            pub fn $get_acquire(&self, index: usize) -> Result<$t> {
                bounds_check!(self, index, $width);
                align_check!(index, $width);
                let a = unsafe { &*self.byte_ptr(index).cast::<$atomic>() };
                Ok(a.load(Ordering::Acquire))
            }

            #[doc = "Release store — publishes all prior writes to a paired acquire load."]
            pub fn $put_release(&self, index: usize, value: $t) -> Result<()> {
                bounds_check!(self, index, $width);
                align_check!(index, $width);
                let a = unsafe { &*self.byte_ptr(index).cast::<$atomic>() };
                a.store(value, Ordering::Release);
                Ok(())
            }

            #[doc = "Sequentially consistent load."]
            pub fn $get_volatile(&self, index: usize) -> Result<$t> {
                bounds_check!(self, index, $width);
                align_check!(index, $width);
                let a = unsafe { &*self.byte_ptr(index).cast::<$atomic>() };
                Ok(a.load(Ordering::SeqCst))
            }

            #[doc = "Sequentially consistent store."]
            pub fn $put_volatile(&self, index: usize, value: $t) -> Result<()> {
                bounds_check!(self, index, $width);
                align_check!(index, $width);
                let a = unsafe { &*self.byte_ptr(index).cast::<$atomic>() };
                a.store(value, Ordering::SeqCst);
                Ok(())
            }

            #[doc = "Strong compare-and-set (acquire+release); no spurious failure."]
            pub fn $cas(&self, index: usize, expected: $t, new: $t) -> Result<bool> {
                bounds_check!(self, index, $width);
                align_check!(index, $width);
                let a = unsafe { &*self.byte_ptr(index).cast::<$atomic>() };
                Ok(a
                    .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok())
            }

            #[doc = "Atomic fetch-and-add; returns the prior value."]
            pub fn $get_and_add(&self, index: usize, delta: $t) -> Result<$t> {
                bounds_check!(self, index, $width);
                align_check!(index, $width);
                let a = unsafe { &*self.byte_ptr(index).cast::<$atomic>() };
                Ok(a.fetch_add(delta, Ordering::AcqRel))
            }

            #[doc = "Atomic swap; returns the prior value."]
            pub fn $get_and_set(&self, index: usize, value: $t) -> Result<$t> {
                bounds_check!(self, index, $width);
                align_check!(index, $width);
                let a = unsafe { &*self.byte_ptr(index).cast::<$atomic>() };
                Ok(a.swap(value, Ordering::AcqRel))
            }
        }
    };
}

atomic_accessor!(
    4, i32, AtomicI32,
    get_i32_opaque, put_i32_opaque,
    get_i32_acquire, put_i32_release,
    get_i32_volatile, put_i32_volatile,
    cas_i32, get_and_add_i32, get_and_set_i32
);

atomic_accessor!(
    4, u32, AtomicU32,
    get_u32_opaque, put_u32_opaque,
    get_u32_acquire, put_u32_release,
    get_u32_volatile, put_u32_volatile,
    cas_u32, get_and_add_u32, get_and_set_u32
);

atomic_accessor!(
    8, i64, AtomicI64,
    get_i64_opaque, put_i64_opaque,
    get_i64_acquire, put_i64_release,
    get_i64_volatile, put_i64_volatile,
    cas_i64, get_and_add_i64, get_and_set_i64
);

atomic_accessor!(
    8, u64, AtomicU64,
    get_u64_opaque, put_u64_opaque,
    get_u64_acquire, put_u64_release,
    get_u64_volatile, put_u64_volatile,
    cas_u64, get_and_add_u64, get_and_set_u64
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::MemoryRegion;

    #[test]
    fn plain_round_trip() {
        let region = MemoryRegion::new(64);
        let buf = AtomicBuffer::new(&region);
        buf.put_i32(0, -7).unwrap();
        assert_eq!(buf.get_i32(0).unwrap(), -7);
        buf.put_i64(8, 123_456_789).unwrap();
        assert_eq!(buf.get_i64(8).unwrap(), 123_456_789);
    }

    #[test]
    fn byte_order_round_trip() {
        let region = MemoryRegion::new(64);
        let buf = AtomicBuffer::new(&region);
        buf.put_i32_with_order(0, 0x0102_0304, ByteOrder::Big).unwrap();
        let raw = buf.get_bytes(0, 4).unwrap();
        assert_eq!(raw, &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(
            buf.get_i32_with_order(0, ByteOrder::Big).unwrap(),
            0x0102_0304
        );
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let region = MemoryRegion::new(8);
        let buf = AtomicBuffer::new(&region);
        assert!(matches!(
            buf.get_i64(4),
            Err(RingError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn misaligned_ordered_access_is_rejected() {
        let region = MemoryRegion::new(64);
        let buf = AtomicBuffer::new(&region);
        assert!(matches!(
            buf.get_i64_acquire(4),
            Err(RingError::Misaligned { .. })
        ));
        // Plain access at the same offset is fine.
        assert!(buf.get_i32(4).is_ok());
    }

    #[test]
    fn opaque_round_trip() {
        let region = MemoryRegion::new(64);
        let buf = AtomicBuffer::new(&region);
        buf.put_i32_opaque(0, -9).unwrap();
        assert_eq!(buf.get_i32_opaque(0).unwrap(), -9);
        buf.put_i64_opaque(8, 1234).unwrap();
        assert_eq!(buf.get_i64_opaque(8).unwrap(), 1234);
    }

    #[test]
    fn acquire_release_round_trip() {
        let region = MemoryRegion::new(64);
        let buf = AtomicBuffer::new(&region);
        buf.put_i64_release(0, 42).unwrap();
        assert_eq!(buf.get_i64_acquire(0).unwrap(), 42);
    }

    #[test]
    fn cas_succeeds_only_on_match() {
        let region = MemoryRegion::new(64);
        let buf = AtomicBuffer::new(&region);
        buf.put_i64(0, 1).unwrap();
        assert!(!buf.cas_i64(0, 2, 3).unwrap());
        assert!(buf.cas_i64(0, 1, 3).unwrap());
        assert_eq!(buf.get_i64(0).unwrap(), 3);
    }

    #[test]
    fn get_and_add_returns_prior_value() {
        let region = MemoryRegion::new(64);
        let buf = AtomicBuffer::new(&region);
        buf.put_i64(0, 10).unwrap();
        assert_eq!(buf.get_and_add_i64(0, 5).unwrap(), 10);
        assert_eq!(buf.get_i64(0).unwrap(), 15);
    }

    #[test]
    fn copy_from_and_set_memory() {
        let src_region = MemoryRegion::new(32);
        let dst_region = MemoryRegion::new(32);
        let src = AtomicBuffer::new(&src_region);
        let dst = AtomicBuffer::new(&dst_region);

        src.put_bytes(0, b"hello world").unwrap();
        dst.copy_from(4, &src, 0, 11).unwrap();
        assert_eq!(dst.get_bytes(4, 11).unwrap(), b"hello world");

        dst.set_memory(0, 4, 0xAB).unwrap();
        assert_eq!(dst.get_bytes(0, 4).unwrap(), &[0xAB; 4]);
    }

    #[test]
    fn get_put_round_trip_all_widths() {
        let region = MemoryRegion::new(64);
        let buf = AtomicBuffer::new(&region);
        buf.put_i16(0, -5).unwrap();
        assert_eq!(buf.get_i16(0).unwrap(), -5);
        buf.put_u32(8, 999).unwrap();
        assert_eq!(buf.get_u32(8).unwrap(), 999);
        buf.put_f64(16, 3.25).unwrap();
        assert_eq!(buf.get_f64(16).unwrap(), 3.25);
    }
}
