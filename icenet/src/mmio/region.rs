//! Volatile access to a mapped register window.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicU32, Ordering};

use super::{RegisterIo, REGION_SIZE};

/// A mapped IceNet register window.
///
/// Mapping the window (device tree lookup, ioremap) is the platform's job;
/// this type only performs the accesses.
pub struct MmioRegion {
    base: NonNull<u8>,
}

impl MmioRegion {
    /// Wrap an already mapped register window.
    ///
    /// # Safety
    /// - `base` must point to at least [`REGION_SIZE`] bytes of device
    ///   registers mapped uncached for the lifetime of the returned value
    /// - `base` must be 8-byte aligned
    /// - the mapping must support atomic read-modify-write on the
    ///   interrupt mask word
    pub unsafe fn new(base: NonNull<u8>) -> Self {
        debug_assert_eq!(base.as_ptr() as usize % 8, 0, "MMIO base must be 8-byte aligned");
        Self { base }
    }

    /// Base address of the window.
    pub fn base(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    #[inline]
    fn ptr<T>(&self, offset: usize) -> *mut T {
        debug_assert!(offset + core::mem::size_of::<T>() <= REGION_SIZE);
        // SAFETY: offset stays inside the window promised by `new`.
        unsafe { self.base.as_ptr().add(offset).cast() }
    }
}

impl RegisterIo for MmioRegion {
    #[inline]
    fn read16(&self, offset: usize) -> u16 {
        // SAFETY: `ptr` keeps the access inside the mapped window.
        unsafe { self.ptr::<u16>(offset).read_volatile() }
    }

    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: as for `read16`.
        unsafe { self.ptr::<u32>(offset).read_volatile() }
    }

    #[inline]
    fn read64(&self, offset: usize) -> u64 {
        // SAFETY: as for `read16`; the window is 8-byte aligned.
        unsafe { self.ptr::<u64>(offset).read_volatile() }
    }

    #[inline]
    fn write64(&self, offset: usize, value: u64) {
        // SAFETY: as for `read64`.
        unsafe { self.ptr::<u64>(offset).write_volatile(value) }
    }

    #[inline]
    fn fetch_or32(&self, offset: usize, bits: u32) {
        // SAFETY: the constructor requires the word to support atomic RMW.
        let word = unsafe { &*(self.ptr::<u32>(offset) as *const AtomicU32) };
        word.fetch_or(bits, Ordering::SeqCst);
    }

    #[inline]
    fn fetch_and32(&self, offset: usize, mask: u32) {
        // SAFETY: as for `fetch_or32`.
        let word = unsafe { &*(self.ptr::<u32>(offset) as *const AtomicU32) };
        word.fetch_and(mask, Ordering::SeqCst);
    }
}

// The window is plain device memory; callers serialize per direction.
unsafe impl Send for MmioRegion {}
unsafe impl Sync for MmioRegion {}
