//! IceNet device handle.
//!
//! Ties the engines together into the entry points the platform calls:
//!
//! ```text
//!   upper layer ── transmit() ─┐
//!   TX interrupt ─ tx_interrupt()├─ tx lock ─ send shadow queue
//!                               ┘
//!   RX interrupt ─ rx_interrupt() ── schedules ─ poll() ─ rx lock ─ recv shadow queue
//! ```
//!
//! The two locks are independent. Both directions touch the interrupt mask,
//! but only through atomic set/clear on the device register.

use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;
use tracing::{debug, info, warn};

use crate::config::NicConfig;
use crate::dma::{DmaHal, Packet, ShadowQueue};
use crate::error::{NicError, Result};
use crate::mmio::{RegisterIo, MACADDR};
use crate::types::{IntMask, MacAddress, NicFeatures, RingCounts};

use super::intmask::{clear_intmask, set_intmask};
use super::poll::{PollState, PollStatus};
use super::stats::{NicStats, StatsSnapshot};
use super::traits::Upstream;
use super::{cksum, rx, tx};

/// One attached IceNet NIC.
pub struct Icenet<R, H, U> {
    regs: R,
    hal: H,
    upstream: U,
    config: NicConfig,
    mac: MacAddress,
    tx: Mutex<ShadowQueue<Packet>>,
    rx: Mutex<ShadowQueue<Packet>>,
    poll: PollState,
    open: AtomicBool,
    tx_stopped: AtomicBool,
    stats: NicStats,
}

impl<R, H, U> Icenet<R, H, U>
where
    R: RegisterIo,
    H: DmaHal,
    U: Upstream,
{
    /// Attach to a device whose register window is already mapped.
    ///
    /// Reads the MAC address and leaves the device closed: no receive
    /// buffers posted, interrupts untouched, polling disabled.
    ///
    /// # Errors
    /// Any [`NicConfig::validate`] failure, or `InvalidConfig` if the TX
    /// interrupt threshold exceeds the send slots the device reports.
    pub fn new(regs: R, hal: H, upstream: U, config: NicConfig) -> Result<Self> {
        config.validate()?;

        let mac = MacAddress::from_register(regs.read64(MACADDR));
        if !mac.is_valid_unicast() {
            warn!(%mac, "invalid MAC address");
        }

        let counts = RingCounts::read(&regs);
        // A stopped queue wakes only at the threshold, which must be reachable.
        if config.tx_irq_threshold > counts.send_req as usize {
            return Err(NicError::InvalidConfig(
                "tx interrupt threshold exceeds hardware send slots",
            ));
        }

        info!(
            %mac,
            send_queue = counts.send_req,
            recv_queue = counts.recv_req,
            ring_size = config.ring_size,
            "icenet attached"
        );

        Ok(Self {
            tx: Mutex::new(ShadowQueue::new(config.ring_size)?),
            rx: Mutex::new(ShadowQueue::new(config.ring_size)?),
            regs,
            hal,
            upstream,
            config,
            mac,
            poll: PollState::new(),
            open: AtomicBool::new(false),
            tx_stopped: AtomicBool::new(true),
            stats: NicStats::new(),
        })
    }

    /// Bring the interface up.
    ///
    /// Fills the receive ring, starts the transmit queue, enables polling
    /// and arms the receive interrupt. Opening an open device does nothing.
    pub fn open(&self) {
        if self.open.swap(true, Ordering::AcqRel) {
            warn!("icenet already open");
            return;
        }

        let posted = {
            let mut rx = self.rx.lock();
            rx::refill(&self.regs, &self.hal, &mut rx, self.config.ring_size)
        };

        self.tx_stopped.store(false, Ordering::Release);
        self.poll.enable();
        set_intmask(&self.regs, IntMask::RX);

        info!(posted, "icenet opened");
    }

    /// Take the interface down.
    ///
    /// Disables both interrupts, waits for an in-flight poll to finish and
    /// stops the transmit queue. Buffers stay with the shadow queues, since
    /// the device may still own them; they are released by [`detach`].
    ///
    /// [`detach`]: Icenet::detach
    pub fn stop(&self) {
        clear_intmask(&self.regs, IntMask::all());
        self.poll.disable();

        self.open.store(false, Ordering::Release);
        self.tx_stopped.store(true, Ordering::Release);

        info!("icenet stopped");
    }

    /// Detach from the device, releasing every buffer it still holds.
    ///
    /// Returns the register file so the platform can unmap it.
    pub fn detach(self) -> R {
        if self.open.load(Ordering::Acquire) {
            self.stop();
        }

        let mut released = 0;
        for queue in [&self.tx, &self.rx] {
            let mut queue = queue.lock();
            while queue.pop().is_some() {
                released += 1;
            }
        }
        info!(released, "icenet detached");

        self.regs
    }

    /// Queue a packet for transmission.
    ///
    /// Arms the TX interrupt when free space is below the configured
    /// threshold. If the packet does not fit, completions are reclaimed once;
    /// if it still does not fit the packet is dropped and the queue is
    /// stopped until [`tx_interrupt`] sees the threshold reached again.
    ///
    /// Packets marked [`ChecksumState::Partial`](crate::dma::ChecksumState::Partial) go through the checksum
    /// engine first.
    ///
    /// # Errors
    /// `NotOpen`, `QueueStopped`, `RingFull`, checksum errors, or
    /// descriptor encoding errors. The packet is dropped and counted in
    /// every case.
    ///
    /// [`tx_interrupt`]: Icenet::tx_interrupt
    pub fn transmit(&self, mut pkt: Packet) -> Result<()> {
        if !self.is_open() {
            self.stats.record_tx_drop();
            return Err(NicError::NotOpen);
        }

        let mut tx = self.tx.lock();

        if self.tx_stopped.load(Ordering::Acquire) {
            self.stats.record_tx_drop();
            return Err(NicError::QueueStopped);
        }

        let needed = pkt.segment_count();
        let threshold = self.config.tx_irq_threshold;
        let mut space = tx::send_space(&self.regs, &tx);

        if space < threshold {
            set_intmask(&self.regs, IntMask::TX);
        }

        if space < needed {
            tx::complete(&self.regs, &mut tx);
            space = tx::send_space(&self.regs, &tx);
        }

        if space < needed {
            warn!(needed, space, "not enough space in tx ring");
            self.tx_stopped.store(true, Ordering::Release);
            set_intmask(&self.regs, IntMask::TX);
            self.stats.record_tx_drop();
            drop(tx);
            self.upstream.tx_queue_stopped();
            return Err(NicError::RingFull {
                needed,
                available: space,
            });
        }

        let len = pkt.len();
        let sent = cksum::offload(&self.regs, &self.hal, &mut pkt, self.config.checksum_spin_limit)
            .and_then(|()| tx::submit(&self.regs, &self.hal, &mut tx, pkt));

        match sent {
            Ok(()) => {
                self.stats.record_tx(len);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "tx packet dropped");
                self.stats.record_tx_drop();
                Err(err)
            }
        }
    }

    /// Transmit interrupt handler.
    ///
    /// Reclaims completed buffers. Once free space is back at the threshold
    /// the TX interrupt is disarmed and a stopped queue is woken.
    pub fn tx_interrupt(&self) {
        let mut tx = self.tx.lock();

        let released = tx::complete(&self.regs, &mut tx);
        let space = tx::send_space(&self.regs, &tx);
        let plenty = space >= self.config.tx_irq_threshold;

        if plenty {
            clear_intmask(&self.regs, IntMask::TX);
        }

        let wake = plenty
            && space > 0
            && self.is_open()
            && self
                .tx_stopped
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
        drop(tx);

        debug!(released, space, wake, "tx interrupt");
        if wake {
            self.upstream.tx_queue_woken();
        }
    }

    /// Receive interrupt handler.
    ///
    /// Masks the receive interrupt and claims the poll. Returns `true` if
    /// the caller must now run [`poll`] (until it reports
    /// [`PollStatus::Complete`]).
    ///
    /// [`poll`]: Icenet::poll
    pub fn rx_interrupt(&self) -> bool {
        clear_intmask(&self.regs, IntMask::RX);
        self.poll.schedule_prep()
    }

    /// One budgeted receive poll.
    ///
    /// Delivers up to `rx_budget` frames and posts exactly as many fresh
    /// buffers. When fewer than the budget were available the poll
    /// completes and the receive interrupt is re-armed.
    ///
    /// # Panics
    /// Panics if the ring could not be refilled by as many buffers as were
    /// delivered, which means receive buffer allocation is exhausted.
    pub fn poll(&self) -> PollStatus {
        debug_assert!(self.poll.is_scheduled(), "BUG: poll without schedule");

        let budget = self.config.rx_budget;
        let (completed, allocated) = {
            let mut rx = self.rx.lock();
            let completed = rx::drain(&self.regs, &mut rx, budget, |pkt| {
                self.stats.record_rx(pkt.len());
                self.upstream.deliver(pkt);
            });
            let allocated = rx::refill(&self.regs, &self.hal, &mut rx, completed);
            (completed, allocated)
        };

        assert_eq!(
            allocated, completed,
            "BUG: refilled {allocated} receive buffers after delivering {completed}"
        );

        if completed < budget {
            // Re-arm while SCHED is held so `stop` cannot slip in between.
            set_intmask(&self.regs, IntMask::RX);
            if !self.poll.complete_if_enabled() {
                clear_intmask(&self.regs, IntMask::RX);
                self.poll.complete();
            }
            PollStatus::Complete(completed)
        } else {
            PollStatus::Pending(completed)
        }
    }

    /// Free send slots right now.
    pub fn send_space(&self) -> usize {
        tx::send_space(&self.regs, &self.tx.lock())
    }

    /// Buffers currently owned by the send and receive shadow queues.
    pub fn in_flight(&self) -> (usize, usize) {
        (self.tx.lock().count(), self.rx.lock().count())
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn is_queue_stopped(&self) -> bool {
        self.tx_stopped.load(Ordering::Acquire)
    }

    pub fn mac_address(&self) -> MacAddress {
        self.mac
    }

    pub fn features(&self) -> NicFeatures {
        NicFeatures::RX_CSUM | NicFeatures::HW_CSUM | NicFeatures::SG
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &NicConfig {
        &self.config
    }

    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dma::IdentityHal;
    use crate::sim::SimNic;
    use alloc::sync::Arc;

    struct Discard;

    impl Upstream for Discard {
        fn deliver(&self, _packet: Packet) {}
    }

    fn attach(sim: &Arc<SimNic>, config: NicConfig) -> Icenet<Arc<SimNic>, IdentityHal, Discard> {
        Icenet::new(Arc::clone(sim), IdentityHal, Discard, config).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_ring_size() {
        let sim = Arc::new(SimNic::new(16, 16));
        let result = Icenet::new(sim, IdentityHal, Discard, NicConfig::new().with_ring_size(24));
        assert!(matches!(result, Err(NicError::InvalidRingSize(24))));
    }

    #[test]
    fn test_mac_read_at_attach() {
        let sim = Arc::new(SimNic::new(16, 16).with_mac([0x00, 0x12, 0x6d, 0x00, 0x00, 0x02]));
        let nic = attach(&sim, NicConfig::new().with_ring_size(16));
        assert_eq!(nic.mac_address().octets(), [0x00, 0x12, 0x6d, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn test_open_fills_receive_ring_and_arms_rx() {
        let sim = Arc::new(SimNic::new(16, 8));
        let nic = attach(&sim, NicConfig::new().with_ring_size(16).with_tx_irq_threshold(4));
        assert!(!nic.is_open());
        assert_eq!(sim.intmask(), IntMask::empty());

        nic.open();
        // Bounded by the eight hardware receive slots.
        assert_eq!(nic.in_flight(), (0, 8));
        assert_eq!(sim.posted_rx(), 8);
        assert_eq!(sim.intmask(), IntMask::RX);
    }

    #[test]
    fn test_new_rejects_threshold_above_send_slots() {
        let sim = Arc::new(SimNic::new(4, 16));
        let config = NicConfig::new().with_ring_size(16).with_tx_irq_threshold(8);
        let result = Icenet::new(Arc::clone(&sim), IdentityHal, Discard, config);
        assert!(matches!(result, Err(NicError::InvalidConfig(_))));

        let nic = attach(&sim, config.with_tx_irq_threshold(4));
        assert_eq!(nic.config().tx_irq_threshold, 4);
    }

    #[test]
    fn test_open_twice_keeps_scheduled_poll() {
        let sim = Arc::new(SimNic::new(16, 16));
        let nic = attach(&sim, NicConfig::new().with_ring_size(16).with_tx_irq_threshold(4));
        nic.open();
        assert!(nic.rx_interrupt());

        nic.open();
        assert!(!nic.rx_interrupt(), "second open reset the poll handshake");
        assert_eq!(sim.posted_rx(), 16);
        assert_eq!(nic.poll(), PollStatus::Complete(0));
    }

    #[test]
    fn test_transmit_requires_open() {
        let sim = Arc::new(SimNic::new(16, 16));
        let nic = attach(&sim, NicConfig::new().with_ring_size(16));
        assert_eq!(nic.transmit(Packet::from_frame(&[0; 60])), Err(NicError::NotOpen));
        assert_eq!(nic.stats().tx_dropped, 1);
        assert!(sim.tx_log().is_empty());
    }

    #[test]
    fn test_stop_masks_interrupts_and_blocks_polls() {
        let sim = Arc::new(SimNic::new(16, 16));
        let nic = attach(&sim, NicConfig::new().with_ring_size(16));
        nic.open();
        nic.stop();

        assert_eq!(sim.intmask(), IntMask::empty());
        assert!(!nic.rx_interrupt());
        assert!(nic.is_queue_stopped());

        let sim_back = nic.detach();
        assert!(Arc::ptr_eq(&sim_back, &sim));
    }
}
