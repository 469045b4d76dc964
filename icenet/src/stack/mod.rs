//! smoltcp integration layer.
//!
//! Bridges an [`Icenet`] handle to smoltcp's `phy::Device`:
//!
//! ```text
//!   smoltcp Interface
//!          │ receive / transmit tokens
//!   DeviceAdapter ──────────────► Icenet::transmit
//!          ▲
//!   FrameQueue  ◄── Icenet::poll delivers here
//! ```
//!
//! The adapter does not drive the device. The platform still calls
//! `rx_interrupt`/`poll` and `tx_interrupt`; delivered frames wait in the
//! [`FrameQueue`] until smoltcp asks for them.

use alloc::collections::VecDeque;

use smoltcp::phy::{Checksum, Device, DeviceCapabilities, Medium, RxToken, TxToken};
use smoltcp::time::Instant;
use spin::Mutex;
use tracing::debug;

use crate::dma::{DmaHal, Packet, NET_IP_ALIGN};
use crate::driver::{Icenet, Upstream};
use crate::mmio::RegisterIo;
use crate::types::ETH_FRAME_MAX;

/// Default number of received frames held before new ones are dropped.
pub const DEFAULT_BACKLOG: usize = 256;

/// [`Upstream`] that buffers received frames for a polling stack.
pub struct FrameQueue {
    frames: Mutex<VecDeque<Packet>>,
    limit: usize,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_BACKLOG)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            limit,
        }
    }

    /// Oldest buffered frame.
    pub fn pop(&self) -> Option<Packet> {
        self.frames.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Upstream for FrameQueue {
    fn deliver(&self, packet: Packet) {
        let mut frames = self.frames.lock();
        if frames.len() >= self.limit {
            debug!(len = packet.len(), "rx backlog full, frame dropped");
            return;
        }
        frames.push_back(packet);
    }
}

/// Thin adapter that exposes an [`Icenet`] to smoltcp.
pub struct DeviceAdapter<'a, R, H> {
    nic: &'a Icenet<R, H, FrameQueue>,
}

impl<'a, R, H> DeviceAdapter<'a, R, H>
where
    R: RegisterIo,
    H: DmaHal,
{
    pub fn new(nic: &'a Icenet<R, H, FrameQueue>) -> Self {
        Self { nic }
    }

    pub fn nic(&self) -> &'a Icenet<R, H, FrameQueue> {
        self.nic
    }
}

impl<'a, R, H> Device for DeviceAdapter<'a, R, H>
where
    R: RegisterIo,
    H: DmaHal,
{
    type RxToken<'b> = AdapterRxToken where Self: 'b;
    type TxToken<'b> = AdapterTxToken<'b, R, H> where Self: 'b;

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.max_transmission_unit = ETH_FRAME_MAX;
        caps.medium = Medium::Ethernet;
        // Received frames are validated by the device.
        caps.checksum.ipv4 = Checksum::Tx;
        caps.checksum.udp = Checksum::Tx;
        caps.checksum.tcp = Checksum::Tx;
        caps
    }

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        let packet = self.nic.upstream().pop()?;
        Some((AdapterRxToken { packet }, AdapterTxToken { nic: self.nic }))
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        if self.nic.is_open() && !self.nic.is_queue_stopped() {
            Some(AdapterTxToken { nic: self.nic })
        } else {
            None
        }
    }
}

pub struct AdapterRxToken {
    packet: Packet,
}

impl RxToken for AdapterRxToken {
    fn consume<T, F>(mut self, f: F) -> T
    where
        F: FnOnce(&mut [u8]) -> T,
    {
        if self.packet.frags().is_empty() {
            f(self.packet.data_mut())
        } else {
            f(&mut self.packet.to_vec())
        }
    }
}

pub struct AdapterTxToken<'a, R, H> {
    nic: &'a Icenet<R, H, FrameQueue>,
}

impl<'a, R, H> TxToken for AdapterTxToken<'a, R, H>
where
    R: RegisterIo,
    H: DmaHal,
{
    fn consume<T, F>(self, len: usize, f: F) -> T
    where
        F: FnOnce(&mut [u8]) -> T,
    {
        let mut packet = Packet::new(NET_IP_ALIGN, len);
        let result = f(packet.put(len));

        // smoltcp has no error channel here; the drop is already counted.
        if let Err(err) = self.nic.transmit(packet) {
            debug!(%err, len, "smoltcp frame not sent");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NicConfig;
    use crate::dma::IdentityHal;
    use crate::sim::SimNic;

    #[test]
    fn test_frame_queue_respects_limit() {
        let queue = FrameQueue::with_limit(2);
        for _ in 0..3 {
            queue.deliver(Packet::from_frame(&[0; 60]));
        }
        assert_eq!(queue.len(), 2);
        assert!(queue.pop().is_some());
        assert!(queue.pop().is_some());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_no_tx_token_while_closed() {
        let sim = SimNic::new(8, 8);
        let config = NicConfig::new().with_ring_size(8).with_tx_irq_threshold(2);
        let nic = Icenet::new(&sim, IdentityHal, FrameQueue::new(), config).unwrap();
        let mut adapter = DeviceAdapter::new(&nic);
        assert!(adapter.transmit(Instant::from_millis(0)).is_none());

        nic.open();
        assert!(adapter.transmit(Instant::from_millis(0)).is_some());
        assert_eq!(adapter.capabilities().max_transmission_unit, ETH_FRAME_MAX);
    }
}
