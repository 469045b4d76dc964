//! Software model of the IceNet register file.
//!
//! [`SimNic`] implements [`RegisterIo`] the way the device behaves on the
//! bus, so the driver can run against it unchanged:
//!
//! - descriptors written to `SEND_REQ` are fetched (copied) immediately and
//!   stay pending until the test calls [`SimNic::complete_tx`]
//! - `RECV_REQ` addresses are queued until [`SimNic::receive_frame`] writes a
//!   frame into the oldest one
//! - the checksum engine sums the described bytes once the last descriptor
//!   of a request arrives
//!
//! Addresses in descriptors are dereferenced as host pointers, so the driver
//! under test must use [`IdentityHal`](crate::dma::IdentityHal).

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use spin::Mutex;

use crate::dma::{MAX_FRAME_SIZE, NET_IP_ALIGN};
use crate::mmio::{
    RegisterIo, CKSUM_COUNTS, CKSUM_REQ, CKSUM_RESP, COUNTS, INTMASK, MACADDR, RECV_COMP,
    RECV_REQ, SEND_COMP, SEND_REQ,
};
use crate::types::{ChecksumCounts, Descriptor, IntMask, RingCounts};

/// Default checksum engine request depth.
pub const DEFAULT_CKSUM_DEPTH: usize = 8;

/// One segment as the device fetched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSegment {
    pub desc: Descriptor,
    pub bytes: Vec<u8>,
}

struct SimState {
    send_slots: usize,
    recv_slots: usize,

    tx_log: Vec<FetchedSegment>,
    tx_pending: VecDeque<FetchedSegment>,
    tx_sent: VecDeque<FetchedSegment>,
    send_comp: VecDeque<u16>,

    rx_posted: VecDeque<u64>,
    recv_comp: VecDeque<u16>,
    recv_withheld: usize,

    cksum_depth: usize,
    cksum_stalled: bool,
    cksum_log: Vec<Descriptor>,
    cksum_pending: Vec<Vec<u8>>,
    cksum_result: Option<u16>,
}

/// In-memory IceNet device.
pub struct SimNic {
    state: Mutex<SimState>,
    intmask: AtomicU32,
    mac: u64,
}

fn saturate(n: usize) -> u8 {
    n.min(u8::MAX as usize) as u8
}

/// Read `len` bytes the device was pointed at.
///
/// # Safety
/// `addr..addr + len` must be readable host memory.
unsafe fn fetch(addr: u64, len: usize) -> Vec<u8> {
    core::slice::from_raw_parts(addr as usize as *const u8, len).to_vec()
}

/// Internet checksum over the concatenated chunks, as a big-endian value.
fn internet_checksum<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> u16 {
    let mut sum: u32 = 0;
    let mut odd: Option<u8> = None;
    for chunk in chunks {
        for &b in chunk {
            match odd.take() {
                Some(hi) => sum += u32::from(u16::from_be_bytes([hi, b])),
                None => odd = Some(b),
            }
        }
    }
    if let Some(hi) = odd {
        sum += u32::from(u16::from_be_bytes([hi, 0]));
    }
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

impl SimNic {
    /// Device with `send_slots` transmit and `recv_slots` receive request
    /// slots.
    pub fn new(send_slots: usize, recv_slots: usize) -> Self {
        Self {
            state: Mutex::new(SimState {
                send_slots,
                recv_slots,
                tx_log: Vec::new(),
                tx_pending: VecDeque::new(),
                tx_sent: VecDeque::new(),
                send_comp: VecDeque::new(),
                rx_posted: VecDeque::new(),
                recv_comp: VecDeque::new(),
                recv_withheld: 0,
                cksum_depth: DEFAULT_CKSUM_DEPTH,
                cksum_stalled: false,
                cksum_log: Vec::new(),
                cksum_pending: Vec::new(),
                cksum_result: None,
            }),
            intmask: AtomicU32::new(0),
            mac: 0,
        }
    }

    pub fn with_mac(mut self, mac: [u8; 6]) -> Self {
        let mut raw = [0u8; 8];
        raw[..6].copy_from_slice(&mac);
        self.mac = u64::from_le_bytes(raw);
        self
    }

    /// Checksum engine that accepts at most `depth` descriptors per request.
    pub fn with_checksum_depth(self, depth: usize) -> Self {
        self.state.lock().cksum_depth = depth;
        self
    }

    /// Make the checksum engine accept requests but never answer.
    pub fn stall_checksum(&self, stalled: bool) {
        self.state.lock().cksum_stalled = stalled;
    }

    // ═══════════════════════════════════════════════════════════════════
    // Transmit side
    // ═══════════════════════════════════════════════════════════════════

    /// Finish up to `n` pending transmit descriptors, oldest first.
    ///
    /// Each one frees its request slot and produces a completion event.
    /// Returns how many were completed.
    pub fn complete_tx(&self, n: usize) -> usize {
        let mut st = self.state.lock();
        let n = n.min(st.tx_pending.len());
        for _ in 0..n {
            if let Some(seg) = st.tx_pending.pop_front() {
                st.send_comp.push_back(seg.desc.length() as u16);
                st.tx_sent.push_back(seg);
            }
        }
        n
    }

    /// Complete every pending transmit descriptor.
    pub fn complete_all_tx(&self) -> usize {
        self.complete_tx(usize::MAX)
    }

    /// Frames whose segments have all completed, with the IP-align prefix
    /// stripped. Segments of an unfinished frame stay queued.
    pub fn take_sent_frames(&self) -> Vec<Vec<u8>> {
        let mut st = self.state.lock();
        let mut frames = Vec::new();
        while let Some(end) = st.tx_sent.iter().position(|s| s.desc.is_last()) {
            let mut frame = Vec::new();
            for seg in st.tx_sent.drain(..=end) {
                frame.extend_from_slice(&seg.bytes);
            }
            frame.drain(..NET_IP_ALIGN.min(frame.len()));
            frames.push(frame);
        }
        frames
    }

    /// Every transmit descriptor submitted so far.
    pub fn tx_log(&self) -> Vec<Descriptor> {
        self.state.lock().tx_log.iter().map(|s| s.desc).collect()
    }

    /// Transmit descriptors submitted but not yet completed.
    pub fn pending_tx(&self) -> usize {
        self.state.lock().tx_pending.len()
    }

    /// Completion events not yet read by the driver.
    pub fn unread_tx_completions(&self) -> usize {
        self.state.lock().send_comp.len()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Receive side
    // ═══════════════════════════════════════════════════════════════════

    /// Deliver `frame` into the oldest posted receive buffer.
    ///
    /// The device writes `NET_IP_ALIGN` zero bytes ahead of the frame and
    /// reports the length including them. Returns `false` if no buffer is
    /// posted or the frame does not fit.
    pub fn receive_frame(&self, frame: &[u8]) -> bool {
        let total = frame.len() + NET_IP_ALIGN;
        if total > MAX_FRAME_SIZE {
            return false;
        }
        let mut st = self.state.lock();
        let Some(addr) = st.rx_posted.pop_front() else {
            return false;
        };

        // SAFETY: the address came from a posted receive buffer of at least
        // MAX_FRAME_SIZE bytes that the driver keeps alive until it reads
        // the completion.
        unsafe {
            let dst = addr as usize as *mut u8;
            core::ptr::write_bytes(dst, 0, NET_IP_ALIGN);
            core::ptr::copy_nonoverlapping(frame.as_ptr(), dst.add(NET_IP_ALIGN), frame.len());
        }
        st.recv_comp.push_back(total as u16);
        true
    }

    /// Stop advertising `n` of the free receive request slots.
    pub fn withhold_recv_slots(&self, n: usize) {
        self.state.lock().recv_withheld = n;
    }

    /// Receive buffers currently posted and unused.
    pub fn posted_rx(&self) -> usize {
        self.state.lock().rx_posted.len()
    }

    /// Addresses of the posted receive buffers, oldest first.
    pub fn posted_rx_addrs(&self) -> Vec<u64> {
        self.state.lock().rx_posted.iter().copied().collect()
    }

    /// Receive completion events not yet read by the driver.
    pub fn unread_rx_completions(&self) -> usize {
        self.state.lock().recv_comp.len()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Checksum engine and interrupt mask
    // ═══════════════════════════════════════════════════════════════════

    /// Every checksum descriptor submitted so far.
    pub fn checksum_log(&self) -> Vec<Descriptor> {
        self.state.lock().cksum_log.clone()
    }

    pub fn intmask(&self) -> IntMask {
        IntMask::from_bits_truncate(self.intmask.load(Ordering::Acquire))
    }

    fn counts(st: &SimState) -> RingCounts {
        let in_flight = st.tx_pending.len();
        RingCounts {
            send_req: saturate(st.send_slots.saturating_sub(in_flight)),
            recv_req: saturate(
                st.recv_slots
                    .saturating_sub(st.rx_posted.len())
                    .saturating_sub(st.recv_withheld),
            ),
            send_comp: saturate(st.send_comp.len()),
            recv_comp: saturate(st.recv_comp.len()),
        }
    }

    fn cksum_counts(st: &SimState) -> ChecksumCounts {
        ChecksumCounts {
            depth: saturate(st.cksum_depth.saturating_sub(st.cksum_pending.len())),
            ready: u8::from(st.cksum_result.is_some()),
        }
    }

    fn cksum_request(st: &mut SimState, desc: Descriptor) {
        st.cksum_log.push(desc);
        // SAFETY: the driver only describes live packet memory.
        let bytes = unsafe { fetch(desc.address(), desc.length()) };
        st.cksum_pending.push(bytes);

        if desc.is_last() && !st.cksum_stalled {
            let sum = internet_checksum(st.cksum_pending.iter().map(Vec::as_slice));
            st.cksum_pending.clear();
            // The driver stores the register little-endian; hand back the
            // value whose LE bytes are the checksum in network order.
            st.cksum_result = Some(u16::from_le_bytes(sum.to_be_bytes()));
        }
    }
}

impl RegisterIo for SimNic {
    fn read16(&self, offset: usize) -> u16 {
        let mut st = self.state.lock();
        match offset {
            SEND_COMP => st.send_comp.pop_front().unwrap_or(0),
            RECV_COMP => st.recv_comp.pop_front().unwrap_or(0),
            CKSUM_COUNTS => Self::cksum_counts(&st).encode(),
            CKSUM_RESP => st.cksum_result.take().unwrap_or(0),
            _ => 0,
        }
    }

    fn read32(&self, offset: usize) -> u32 {
        match offset {
            COUNTS => Self::counts(&self.state.lock()).encode(),
            INTMASK => self.intmask.load(Ordering::Acquire),
            _ => 0,
        }
    }

    fn read64(&self, offset: usize) -> u64 {
        match offset {
            MACADDR => self.mac,
            _ => 0,
        }
    }

    fn write64(&self, offset: usize, value: u64) {
        let desc = Descriptor::from_raw(value);
        let mut st = self.state.lock();
        match offset {
            SEND_REQ => {
                // SAFETY: the driver only describes live packet memory.
                let bytes = unsafe { fetch(desc.address(), desc.length()) };
                let seg = FetchedSegment { desc, bytes };
                st.tx_log.push(seg.clone());
                st.tx_pending.push_back(seg);
            }
            RECV_REQ => st.rx_posted.push_back(desc.address()),
            CKSUM_REQ => Self::cksum_request(&mut st, desc),
            _ => {}
        }
    }

    fn fetch_or32(&self, offset: usize, bits: u32) {
        if offset == INTMASK {
            self.intmask.fetch_or(bits, Ordering::AcqRel);
        }
    }

    fn fetch_and32(&self, offset: usize, mask: u32) {
        if offset == INTMASK {
            self.intmask.fetch_and(mask, Ordering::AcqRel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_of_known_header() {
        // IPv4 header from RFC 1071 style examples, checksum field zeroed.
        let hdr = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        assert_eq!(internet_checksum([&hdr[..]]), 0xb861);
    }

    #[test]
    fn test_checksum_odd_split_across_chunks() {
        let whole = [1u8, 2, 3, 4, 5, 6, 7];
        let split = internet_checksum([&whole[..3], &whole[3..]]);
        assert_eq!(split, internet_checksum([&whole[..]]));
    }

    #[test]
    fn test_counts_follow_queues() {
        let sim = SimNic::new(4, 2);
        let counts = RingCounts::read(&sim);
        assert_eq!((counts.send_req, counts.recv_req), (4, 2));

        let buf = [0u8; 64];
        let desc = Descriptor::encode(buf.as_ptr() as u64, 64, true).unwrap();
        sim.write64(SEND_REQ, desc.raw());
        assert_eq!(RingCounts::read(&sim).send_req, 3);

        sim.complete_tx(1);
        let counts = RingCounts::read(&sim);
        assert_eq!((counts.send_req, counts.send_comp), (4, 1));
        assert_eq!(sim.read16(SEND_COMP), 64);
        assert_eq!(RingCounts::read(&sim).send_comp, 0);
    }

    #[test]
    fn test_mac_register_layout() {
        let sim = SimNic::new(1, 1).with_mac([0x02, 0, 0, 0, 0, 0x01]);
        assert_eq!(sim.read64(MACADDR), 0x0100_0000_0002);
    }
}
