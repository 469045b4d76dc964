//! Interrupt mask and offload feature flags.

use bitflags::bitflags;

bitflags! {
    /// Bits of the `INTMASK` register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IntMask: u32 {
        /// Notify on transmit completion progress.
        const TX = 1 << 0;
        /// Notify on receive completion progress.
        const RX = 1 << 1;
    }
}

bitflags! {
    /// Offloads the device provides to the network stack.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NicFeatures: u32 {
        /// Received frames arrive with checksums already validated.
        const RX_CSUM = 1 << 0;
        /// Transmit checksums can be computed by the checksum engine.
        const HW_CSUM = 1 << 1;
        /// Transmit buffers may be scattered across fragments.
        const SG = 1 << 2;
    }
}
