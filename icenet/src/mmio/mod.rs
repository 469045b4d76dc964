//! Register file access.
//!
//! The NIC exposes its whole state through a small register window. All
//! driver logic goes through [`RegisterIo`] so the same engines run against
//! a real mapping ([`MmioRegion`]) or a software model of the device.
//!
//! # Register map
//! ```text
//! off  width  meaning
//!   0   64    transmit descriptor submit
//!   8   64    receive descriptor submit
//!  16   16    transmit completion (read consumes one event)
//!  18   16    receive completion (read consumes one event, yields length)
//!  20   32    availability counters send_req|recv_req|send_comp|recv_comp
//!  24   64    MAC address, low 48 bits
//!  32   32    interrupt mask, bit0 TX, bit1 RX
//!  36   16    checksum engine counters, low byte depth, high byte ready
//!  38   16    checksum result
//!  40   64    checksum descriptor submit
//! ```

pub mod barriers;
pub mod region;

pub use barriers::{rmb, wmb};
pub use region::MmioRegion;

use alloc::sync::Arc;

pub const SEND_REQ: usize = 0;
pub const RECV_REQ: usize = 8;
pub const SEND_COMP: usize = 16;
pub const RECV_COMP: usize = 18;
pub const COUNTS: usize = 20;
pub const MACADDR: usize = 24;
pub const INTMASK: usize = 32;
pub const CKSUM_COUNTS: usize = 36;
pub const CKSUM_RESP: usize = 38;
pub const CKSUM_REQ: usize = 40;

/// Size of the register window in bytes.
pub const REGION_SIZE: usize = 48;

/// Access to the NIC register file.
///
/// Every method takes `&self`: the transmit and receive contexts share one
/// register file and serialize only on their own shadow queues.
/// Reads of the completion registers have side effects (they consume an
/// event), so implementations must never cache or merge accesses.
pub trait RegisterIo {
    fn read16(&self, offset: usize) -> u16;
    fn read32(&self, offset: usize) -> u32;
    fn read64(&self, offset: usize) -> u64;
    fn write64(&self, offset: usize, value: u64);

    /// Atomically OR `bits` into the 32-bit register at `offset`.
    fn fetch_or32(&self, offset: usize, bits: u32);

    /// Atomically AND the 32-bit register at `offset` with `mask`.
    fn fetch_and32(&self, offset: usize, mask: u32);
}

impl<T: RegisterIo + ?Sized> RegisterIo for &T {
    fn read16(&self, offset: usize) -> u16 {
        (**self).read16(offset)
    }
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }
    fn read64(&self, offset: usize) -> u64 {
        (**self).read64(offset)
    }
    fn write64(&self, offset: usize, value: u64) {
        (**self).write64(offset, value)
    }
    fn fetch_or32(&self, offset: usize, bits: u32) {
        (**self).fetch_or32(offset, bits)
    }
    fn fetch_and32(&self, offset: usize, mask: u32) {
        (**self).fetch_and32(offset, mask)
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for Arc<T> {
    fn read16(&self, offset: usize) -> u16 {
        (**self).read16(offset)
    }
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }
    fn read64(&self, offset: usize) -> u64 {
        (**self).read64(offset)
    }
    fn write64(&self, offset: usize, value: u64) {
        (**self).write64(offset, value)
    }
    fn fetch_or32(&self, offset: usize, bits: u32) {
        (**self).fetch_or32(offset, bits)
    }
    fn fetch_and32(&self, offset: usize, mask: u32) {
        (**self).fetch_and32(offset, mask)
    }
}
