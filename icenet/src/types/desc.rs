//! Descriptor wire format.
//!
//! ```text
//!  63  62            48 47                                   0
//! ┌───┬────────────────┬──────────────────────────────────────┐
//! │ C │     length     │           physical address           │
//! └───┴────────────────┴──────────────────────────────────────┘
//! ```
//! `C` (continuation) is set when more segments of the same buffer follow.
//! The same format is used by the transmit, receive and checksum submit
//! registers; receive descriptors leave the length field zero.

use crate::error::{NicError, Result};

/// Bits available for the physical address.
pub const ADDR_BITS: u32 = 48;
pub const ADDR_MASK: u64 = (1 << ADDR_BITS) - 1;

pub const LEN_SHIFT: u32 = 48;
pub const LEN_BITS: u32 = 15;
/// Largest length a descriptor can carry.
pub const MAX_SEGMENT_LEN: usize = (1 << LEN_BITS) - 1;

pub const CONTINUATION: u64 = 1 << 63;

/// One encoded 64-bit descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor(u64);

impl Descriptor {
    /// Encode a segment.
    ///
    /// # Errors
    /// - `AddressOutOfRange` if `addr` needs more than 48 bits
    /// - `LengthOutOfRange` if `len` needs more than 15 bits
    ///
    /// Either error means the platform handed us memory the device cannot
    /// describe; the caller must not submit anything for the buffer.
    pub fn encode(addr: u64, len: usize, is_last: bool) -> Result<Self> {
        if addr & !ADDR_MASK != 0 {
            return Err(NicError::AddressOutOfRange { addr });
        }
        if len > MAX_SEGMENT_LEN {
            return Err(NicError::LengthOutOfRange { len });
        }

        let mut word = ((len as u64) << LEN_SHIFT) | addr;
        if !is_last {
            word |= CONTINUATION;
        }
        Ok(Self(word))
    }

    /// Receive descriptor: address only, the device reports the length.
    pub fn receive(addr: u64) -> Result<Self> {
        Self::encode(addr, 0, true)
    }

    /// Raw register value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Reinterpret a raw word (device models, diagnostics).
    #[inline]
    pub const fn from_raw(word: u64) -> Self {
        Self(word)
    }

    pub const fn address(self) -> u64 {
        self.0 & ADDR_MASK
    }

    pub const fn length(self) -> usize {
        ((self.0 >> LEN_SHIFT) as usize) & MAX_SEGMENT_LEN
    }

    pub const fn is_last(self) -> bool {
        self.0 & CONTINUATION == 0
    }
}

impl From<Descriptor> for u64 {
    fn from(desc: Descriptor) -> u64 {
        desc.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_field_positions() {
        let desc = Descriptor::encode(0x1234_5678_9abc, 0x5ea, false).unwrap();
        assert_eq!(desc.raw(), (1 << 63) | (0x5ea << 48) | 0x1234_5678_9abc);

        let last = Descriptor::encode(0x1000, 64, true).unwrap();
        assert_eq!(last.raw(), (64 << 48) | 0x1000);
    }

    #[test]
    fn test_rejects_wide_address() {
        assert_eq!(
            Descriptor::encode(1 << 48, 10, true),
            Err(NicError::AddressOutOfRange { addr: 1 << 48 })
        );
        assert!(Descriptor::encode(ADDR_MASK, 10, true).is_ok());
    }

    #[test]
    fn test_rejects_long_segment() {
        assert!(Descriptor::encode(0, MAX_SEGMENT_LEN, true).is_ok());
        assert_eq!(
            Descriptor::encode(0, MAX_SEGMENT_LEN + 1, true),
            Err(NicError::LengthOutOfRange { len: MAX_SEGMENT_LEN + 1 })
        );
    }

    #[test]
    fn test_receive_descriptor_is_address_only() {
        assert_eq!(Descriptor::receive(0x8000_0040).unwrap().raw(), 0x8000_0040);
    }

    proptest! {
        #[test]
        fn fields_survive_encoding(
            addr in 0u64..(1 << 48),
            len in 0usize..=MAX_SEGMENT_LEN,
            is_last in any::<bool>(),
        ) {
            let desc = Descriptor::encode(addr, len, is_last).unwrap();
            prop_assert_eq!(desc.address(), addr);
            prop_assert_eq!(desc.length(), len);
            prop_assert_eq!(desc.is_last(), is_last);
        }

        #[test]
        fn wide_addresses_never_encode(addr in (1u64 << 48)..=u64::MAX) {
            prop_assert!(Descriptor::encode(addr, 1, true).is_err());
        }
    }
}
