//! Owned, zero-initialized, 8-byte-aligned byte regions.
//!
//! A `MemoryRegion` is the sole owner of the bytes an `AtomicBuffer` views.
//! Its lifetime is independent of any view over it — callers borrow an
//! `AtomicBuffer<'_>` from a region the same way the Aeron Rust port borrows
//! `&[u8]`/`&mut [u8]` from a `Vec<u8>` it owns, except here alignment is
//! guaranteed explicitly rather than left to the allocator's default for `u8`.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Minimum alignment required by every `AtomicBuffer` view.
pub const MIN_ALIGN: usize = 8;

enum Backing {
    /// Heap allocation owned exclusively by this process.
    Heap { layout: Layout },
    /// Anonymous shared mapping, inheritable across `fork()` or otherwise
    /// shareable with cooperating processes that receive the same fd/address.
    #[cfg(feature = "shared-mmap")]
    Mmap,
}

/// A contiguous, 8-byte-aligned, zero-initialized byte region.
///
/// Process-local by default ([`MemoryRegion::new`]); under the `shared-mmap`
/// feature, [`MemoryRegion::new_shared`] produces an anonymous `MAP_SHARED`
/// mapping instead, so the region can be handed to another process.
pub struct MemoryRegion {
    ptr: NonNull<u8>,
    len: usize,
    backing: Backing,
}

// SAFETY: the region owns its bytes exclusively; any interior mutation that
// crosses threads is mediated by the atomic accessors built on top of it.
unsafe impl Send for MemoryRegion {}
unsafe impl Sync for MemoryRegion {}

impl MemoryRegion {
    /// Allocates a new process-local region of `len` bytes, zero-initialized.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero or the allocation fails.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "MemoryRegion length must be non-zero");
        let layout = Layout::from_size_align(len, MIN_ALIGN)
            .expect("len/align must form a valid Layout");
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout));
        Self {
            ptr,
            len,
            backing: Backing::Heap { layout },
        }
    }

    /// Allocates a new anonymous shared-memory region of `len` bytes.
    ///
    /// The mapping is `MAP_SHARED | MAP_ANONYMOUS`: it is not backed by a
    /// filesystem path, but survives a `fork()` and can be handed to a child
    /// process (e.g. before spawning it), so the region can be process-local
    /// or shared across cooperating processes.
    ///
    /// # Errors
    ///
    /// Returns the raw `errno` value if `mmap(2)` fails.
    #[cfg(feature = "shared-mmap")]
    pub fn new_shared(len: usize) -> std::io::Result<Self> {
        assert!(len > 0, "MemoryRegion length must be non-zero");
        // SAFETY: fixed set of well-understood mmap flags; null addr hint
        // lets the kernel choose; failure is checked via MAP_FAILED below.
        let raw = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(std::io::Error::last_os_error());
        }
        // mmap(2) returns page-aligned memory, always >= MIN_ALIGN.
        let ptr = NonNull::new(raw.cast::<u8>()).expect("mmap returned a non-null pointer");
        Ok(Self {
            ptr,
            len,
            backing: Backing::Mmap,
        })
    }

    /// Total length of the region in bytes.
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

    /// Raw pointer to the start of the region. Valid for `self.len()` bytes
    /// for the lifetime of `self`.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for MemoryRegion {
    fn drop(&mut self) {
        match self.backing {
            Backing::Heap { layout } => {
                // SAFETY: ptr/layout are exactly what we allocated with.
                unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
            }
            #[cfg(feature = "shared-mmap")]
            Backing::Mmap => {
                // SAFETY: ptr/len are exactly what we mapped with.
                unsafe {
                    libc::munmap(self.ptr.as_ptr().cast(), self.len);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_region_is_zeroed_and_aligned() {
        let region = MemoryRegion::new(256);
        assert_eq!(region.len(), 256);
        assert_eq!(region.as_ptr() as usize % MIN_ALIGN, 0);
        // SAFETY: just-allocated region, reading within bounds.
        let bytes = unsafe { std::slice::from_raw_parts(region.as_ptr(), 256) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_length_panics() {
        let _ = MemoryRegion::new(0);
    }

    #[cfg(feature = "shared-mmap")]
    #[test]
    fn shared_region_is_zeroed() {
        let region = MemoryRegion::new_shared(4096).unwrap();
        assert_eq!(region.len(), 4096);
        let bytes = unsafe { std::slice::from_raw_parts(region.as_ptr(), 4096) };
        assert!(bytes.iter().all(|&b| b == 0));
    }
}
