//! Availability counters.
//!
//! The hardware packs four saturating 8-bit counters into the `COUNTS`
//! register and two more into `CKSUM_COUNTS`. They are read fresh on every
//! query; nothing here caches a snapshot beyond the call that took it.

use crate::mmio::{RegisterIo, CKSUM_COUNTS, COUNTS};

/// One read of the ring availability register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingCounts {
    /// Free transmit request slots.
    pub send_req: u8,
    /// Free receive request slots.
    pub recv_req: u8,
    /// Unread transmit completion events.
    pub send_comp: u8,
    /// Unread receive completion events.
    pub recv_comp: u8,
}

impl RingCounts {
    /// Decode a raw `COUNTS` value.
    pub const fn decode(raw: u32) -> Self {
        Self {
            send_req: raw as u8,
            recv_req: (raw >> 8) as u8,
            send_comp: (raw >> 16) as u8,
            recv_comp: (raw >> 24) as u8,
        }
    }

    /// Pack back into register layout.
    pub const fn encode(self) -> u32 {
        (self.send_req as u32)
            | (self.recv_req as u32) << 8
            | (self.send_comp as u32) << 16
            | (self.recv_comp as u32) << 24
    }

    /// Take a snapshot from the device.
    #[inline]
    pub fn read<R: RegisterIo + ?Sized>(regs: &R) -> Self {
        Self::decode(regs.read32(COUNTS))
    }
}

/// One read of the checksum engine counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChecksumCounts {
    /// Request descriptors the engine can still accept.
    pub depth: u8,
    /// Results waiting to be read.
    pub ready: u8,
}

impl ChecksumCounts {
    pub const fn decode(raw: u16) -> Self {
        Self {
            depth: raw as u8,
            ready: (raw >> 8) as u8,
        }
    }

    pub const fn encode(self) -> u16 {
        (self.depth as u16) | (self.ready as u16) << 8
    }

    #[inline]
    pub fn read<R: RegisterIo + ?Sized>(regs: &R) -> Self {
        Self::decode(regs.read16(CKSUM_COUNTS))
    }
}
