//! Interface to the network stack above the driver.

use crate::dma::Packet;

/// Receiver of driver events.
///
/// Called from the receive poll task and the transmit paths, possibly
/// concurrently. No driver lock is held across `tx_queue_stopped` or
/// `tx_queue_woken`, so implementations may transmit from them.
pub trait Upstream {
    /// A received frame, trimmed and checksum-validated by the device.
    fn deliver(&self, packet: Packet);

    /// The transmit queue was suspended: a packet was dropped for lack of
    /// ring space and further transmits fail until it wakes.
    fn tx_queue_stopped(&self) {}

    /// Completions freed ring space; transmits are accepted again.
    fn tx_queue_woken(&self) {}
}

impl<T: Upstream + ?Sized> Upstream for &T {
    fn deliver(&self, packet: Packet) {
        (**self).deliver(packet)
    }
    fn tx_queue_stopped(&self) {
        (**self).tx_queue_stopped()
    }
    fn tx_queue_woken(&self) {
        (**self).tx_queue_woken()
    }
}
