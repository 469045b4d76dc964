//! Receive path: budgeted polling, refill and interrupt re-arming.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use common::{frame, init_tracing, open, Recorder};
use icenet::mmio::INTMASK;
use icenet::sim::SimNic;
use icenet::{ChecksumState, Icenet, IdentityHal, IntMask, NicConfig, PollStatus, RegisterIo};

fn config() -> NicConfig {
    NicConfig::new().with_ring_size(16).with_rx_budget(4).with_tx_irq_threshold(4)
}

#[test]
fn test_open_posts_aligned_buffers() {
    let sim = SimNic::new(16, 16);
    let nic = open(&sim, config());

    assert_eq!(sim.posted_rx(), 16);
    assert_eq!(nic.in_flight().1, 16);
    assert!(sim.posted_rx_addrs().iter().all(|addr| addr % 8 == 0));
    assert_eq!(sim.intmask(), IntMask::RX);
}

#[test]
fn test_poll_respects_budget_and_refills() {
    let sim = SimNic::new(16, 16);
    let nic = open(&sim, config());

    let frames: Vec<Vec<u8>> = (0..6).map(|i| frame(60 + i, i as u8)).collect();
    for f in &frames {
        assert!(sim.receive_frame(f));
    }

    assert!(nic.rx_interrupt());
    assert!(!sim.intmask().contains(IntMask::RX));
    assert!(!nic.rx_interrupt(), "poll already scheduled");

    assert_eq!(nic.poll(), PollStatus::Pending(4));
    assert_eq!(nic.upstream().frames(), frames[..4].to_vec());
    assert_eq!(sim.unread_rx_completions(), 2);
    // Four consumed buffers replaced one for one.
    assert_eq!(sim.posted_rx(), 16 - 6 + 4);
    assert_eq!(nic.in_flight().1, 16);
    assert!(!sim.intmask().contains(IntMask::RX), "not re-armed while pending");

    assert_eq!(nic.poll(), PollStatus::Complete(2));
    assert_eq!(nic.upstream().frames(), frames);
    assert_eq!(sim.posted_rx(), 16);
    assert!(sim.intmask().contains(IntMask::RX));

    let stats = nic.stats();
    assert_eq!(stats.rx_packets, 6);
    assert_eq!(stats.rx_bytes, frames.iter().map(|f| f.len() as u64).sum::<u64>());
}

#[test]
fn test_delivered_frames_marked_validated() {
    let sim = SimNic::new(16, 16);
    let nic = open(&sim, config());

    assert!(sim.receive_frame(&frame(64, 7)));
    assert!(nic.rx_interrupt());
    assert_eq!(nic.poll(), PollStatus::Complete(1));

    let delivered = nic.upstream().delivered.lock().unwrap();
    assert_eq!(delivered[0].checksum(), ChecksumState::Unnecessary);
    assert_eq!(delivered[0].segment_count(), 1);
}

#[test]
fn test_exact_budget_stays_pending() {
    let sim = SimNic::new(16, 16);
    let nic = open(&sim, config());

    for i in 0..4 {
        assert!(sim.receive_frame(&frame(60, i)));
    }
    assert!(nic.rx_interrupt());
    assert_eq!(nic.poll(), PollStatus::Pending(4));
    assert_eq!(nic.poll(), PollStatus::Complete(0));
    assert!(sim.intmask().contains(IntMask::RX));
}

#[test]
fn test_stop_waits_for_running_poll() {
    let sim = SimNic::new(16, 16);
    let nic = open(&sim, config());

    assert!(sim.receive_frame(&frame(60, 1)));
    assert!(nic.rx_interrupt());

    thread::scope(|s| {
        let stopper = s.spawn(|| nic.stop());
        thread::sleep(Duration::from_millis(20));
        assert!(!stopper.is_finished(), "stop returned with a poll scheduled");

        assert_eq!(nic.poll(), PollStatus::Complete(1));
        stopper.join().unwrap();
    });

    assert_eq!(sim.intmask(), IntMask::empty(), "finished poll must not re-arm");
    assert!(!nic.rx_interrupt());
}

#[test]
#[should_panic(expected = "BUG: refilled")]
fn test_refill_shortfall_is_fatal() {
    let sim = SimNic::new(16, 16);
    let nic = open(&sim, config());

    assert!(sim.receive_frame(&frame(60, 1)));
    assert!(sim.receive_frame(&frame(60, 2)));
    sim.withhold_recv_slots(16);

    assert!(nic.rx_interrupt());
    nic.poll();
}

/// Register file that parks the caller inside the RX re-arm until released.
struct ParkOnRearm<'a> {
    sim: &'a SimNic,
    armed: AtomicBool,
    parked: AtomicBool,
    release: AtomicBool,
}

impl<'a> ParkOnRearm<'a> {
    fn new(sim: &'a SimNic) -> Self {
        Self {
            sim,
            armed: AtomicBool::new(false),
            parked: AtomicBool::new(false),
            release: AtomicBool::new(false),
        }
    }
}

impl RegisterIo for ParkOnRearm<'_> {
    fn read16(&self, offset: usize) -> u16 {
        self.sim.read16(offset)
    }
    fn read32(&self, offset: usize) -> u32 {
        self.sim.read32(offset)
    }
    fn read64(&self, offset: usize) -> u64 {
        self.sim.read64(offset)
    }
    fn write64(&self, offset: usize, value: u64) {
        self.sim.write64(offset, value)
    }
    fn fetch_or32(&self, offset: usize, bits: u32) {
        if offset == INTMASK && bits & IntMask::RX.bits() != 0 && self.armed.load(Ordering::SeqCst) {
            self.parked.store(true, Ordering::SeqCst);
            while !self.release.load(Ordering::SeqCst) {
                thread::yield_now();
            }
        }
        self.sim.fetch_or32(offset, bits)
    }
    fn fetch_and32(&self, offset: usize, mask: u32) {
        self.sim.fetch_and32(offset, mask)
    }
}

#[test]
fn test_stop_never_returns_with_rx_rearmed() {
    init_tracing();
    let sim = SimNic::new(16, 16);
    let regs = ParkOnRearm::new(&sim);
    let nic = Icenet::new(&regs, IdentityHal, Recorder::default(), config()).unwrap();
    nic.open();

    assert!(sim.receive_frame(&frame(60, 1)));
    assert!(nic.rx_interrupt());
    regs.armed.store(true, Ordering::SeqCst);

    thread::scope(|s| {
        let poller = s.spawn(|| nic.poll());
        while !regs.parked.load(Ordering::SeqCst) {
            thread::yield_now();
        }

        let stopper = s.spawn(|| nic.stop());
        thread::sleep(Duration::from_millis(20));
        assert!(!stopper.is_finished(), "stop returned while the poll was re-arming");

        regs.release.store(true, Ordering::SeqCst);
        assert_eq!(poller.join().unwrap(), PollStatus::Complete(1));
        stopper.join().unwrap();
    });

    assert_eq!(sim.intmask(), IntMask::empty());
    assert!(!nic.rx_interrupt());
}
