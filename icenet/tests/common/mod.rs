//! Shared fixtures for the device-level tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use icenet::sim::SimNic;
use icenet::{Icenet, IdentityHal, NicConfig, Packet, Upstream};

pub type SimIcenet<'a> = Icenet<&'a SimNic, IdentityHal, Recorder>;

/// Log to the test harness's captured output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Upstream that remembers everything the driver told it.
#[derive(Default)]
pub struct Recorder {
    pub delivered: Mutex<Vec<Packet>>,
    pub stopped: AtomicUsize,
    pub woken: AtomicUsize,
}

impl Recorder {
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.delivered.lock().unwrap().iter().map(Packet::to_vec).collect()
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn woken(&self) -> usize {
        self.woken.load(Ordering::SeqCst)
    }
}

impl Upstream for Recorder {
    fn deliver(&self, packet: Packet) {
        self.delivered.lock().unwrap().push(packet);
    }

    fn tx_queue_stopped(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }

    fn tx_queue_woken(&self) {
        self.woken.fetch_add(1, Ordering::SeqCst);
    }
}

/// Attach and open a driver on `sim`.
pub fn open(sim: &SimNic, config: NicConfig) -> SimIcenet<'_> {
    init_tracing();
    let nic = Icenet::new(sim, IdentityHal, Recorder::default(), config)
        .expect("attach to simulated device");
    nic.open();
    nic
}

/// Deterministic frame contents.
pub fn frame(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}
