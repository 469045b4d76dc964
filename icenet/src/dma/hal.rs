//! CPU-to-bus address translation.
//!
//! The device sees physical addresses; the driver holds CPU pointers. How the
//! two relate is a platform decision, so the engines ask a [`DmaHal`].

/// Translates CPU pointers into addresses the device can DMA to.
pub trait DmaHal {
    /// Bus address of the byte at `ptr`.
    fn virt_to_phys(&self, ptr: *const u8) -> u64;
}

impl<T: DmaHal + ?Sized> DmaHal for &T {
    fn virt_to_phys(&self, ptr: *const u8) -> u64 {
        (**self).virt_to_phys(ptr)
    }
}

/// Physical address equals CPU address.
///
/// The usual arrangement in co-simulation, where host and device share one
/// flat address space.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHal;

impl DmaHal for IdentityHal {
    #[inline]
    fn virt_to_phys(&self, ptr: *const u8) -> u64 {
        ptr as usize as u64
    }
}

/// Linear map: `phys = virt - virt_base + phys_base`.
#[derive(Debug, Clone, Copy)]
pub struct OffsetHal {
    virt_base: usize,
    phys_base: u64,
}

impl OffsetHal {
    pub const fn new(virt_base: usize, phys_base: u64) -> Self {
        Self { virt_base, phys_base }
    }
}

impl DmaHal for OffsetHal {
    #[inline]
    fn virt_to_phys(&self, ptr: *const u8) -> u64 {
        let off = (ptr as usize).wrapping_sub(self.virt_base) as u64;
        self.phys_base.wrapping_add(off)
    }
}
