//! Ethernet framing constants and the MAC address type.

use core::fmt;

pub const ETH_ALEN: usize = 6;
pub const ETH_HLEN: usize = 14;
pub const ETH_MTU: usize = 1500;
pub const ETH_FRAME_MAX: usize = ETH_HLEN + ETH_MTU;

/// Hardware address of the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; ETH_ALEN]);

impl MacAddress {
    /// Decode the `MACADDR` register: low 48 bits, first byte least
    /// significant.
    pub fn from_register(raw: u64) -> Self {
        let bytes = raw.to_le_bytes();
        let mut mac = [0u8; ETH_ALEN];
        mac.copy_from_slice(&bytes[..ETH_ALEN]);
        Self(mac)
    }

    pub const fn octets(&self) -> [u8; ETH_ALEN] {
        self.0
    }

    /// Neither multicast nor all zeros.
    pub fn is_valid_unicast(&self) -> bool {
        self.0[0] & 0x01 == 0 && self.0 != [0; ETH_ALEN]
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}
