//! Packet buffers.
//!
//! A [`Packet`] is one owned head region plus an ordered list of owned
//! fragments. Each region is a separate allocation, so each one becomes its
//! own descriptor.
//!
//! ```text
//! head allocation
//! ┌──────────┬──────────────────────┬──────────────┐
//! │ headroom │   data (head_len)    │   tailroom   │
//! └──────────┴──────────────────────┴──────────────┘
//!            ▲ data offset
//! fragments: [frag0][frag1]...   (whole Vec is payload)
//! ```
//!
//! The head allocation is sized once and never grows, so bus addresses taken
//! from it stay valid while the device owns the packet.

use alloc::vec;
use alloc::vec::Vec;

/// Bytes the transmit path prepends to the head segment and the receive
/// path strips from every frame.
pub const NET_IP_ALIGN: usize = 2;

/// Receive buffers must start on this boundary.
pub const DMA_ALIGN: usize = 8;

/// Bytes the device may write into one receive buffer.
pub const MAX_FRAME_SIZE: usize = 190 * DMA_ALIGN;

/// Checksum handling requested for, or known about, a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumState {
    /// Nothing known; software handles it.
    #[default]
    None,
    /// Hardware must compute the checksum over `[start, end)` and store it
    /// at `start + offset`. Both are relative to the first data byte.
    Partial { start: usize, offset: usize },
    /// Checksum has been filled in; nobody should recompute it.
    Complete,
    /// Received frame already validated by the device.
    Unnecessary,
}

/// An owned, possibly scattered packet buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    head: Vec<u8>,
    data: usize,
    len: usize,
    frags: Vec<Vec<u8>>,
    checksum: ChecksumState,
}

impl Packet {
    /// Empty packet with `headroom` bytes reserved before the data and
    /// `capacity` bytes available for it.
    pub fn new(headroom: usize, capacity: usize) -> Self {
        Self {
            head: vec![0u8; headroom + capacity],
            data: headroom,
            len: 0,
            frags: Vec::new(),
            checksum: ChecksumState::None,
        }
    }

    /// Linear transmit packet holding a copy of `frame`.
    pub fn from_frame(frame: &[u8]) -> Self {
        let mut pkt = Self::new(NET_IP_ALIGN, frame.len());
        pkt.put(frame.len()).copy_from_slice(frame);
        pkt
    }

    /// Fresh receive buffer, or `None` if the allocator is exhausted.
    ///
    /// Sized so that at least [`MAX_FRAME_SIZE`] bytes remain after the data
    /// start is moved to a [`DMA_ALIGN`] boundary.
    pub fn try_alloc_receive() -> Option<Self> {
        let size = MAX_FRAME_SIZE + DMA_ALIGN;
        let mut head = Vec::new();
        head.try_reserve_exact(size).ok()?;
        head.resize(size, 0);
        Some(Self {
            head,
            data: 0,
            len: 0,
            frags: Vec::new(),
            checksum: ChecksumState::None,
        })
    }

    /// Bytes before the data start.
    pub fn headroom(&self) -> usize {
        self.data
    }

    /// Bytes after the head data.
    pub fn tailroom(&self) -> usize {
        self.head.len() - self.data - self.len
    }

    /// Length of the head segment's data.
    pub fn head_len(&self) -> usize {
        self.len
    }

    /// Total payload length across head and fragments.
    pub fn len(&self) -> usize {
        self.len + self.frags.iter().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptors this packet needs: the head plus one per fragment.
    pub fn segment_count(&self) -> usize {
        1 + self.frags.len()
    }

    /// Head segment data.
    pub fn data(&self) -> &[u8] {
        &self.head[self.data..self.data + self.len]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.head[self.data..self.data + self.len]
    }

    pub fn frags(&self) -> &[Vec<u8>] {
        &self.frags
    }

    /// Append a fragment after the current ones.
    pub fn push_fragment(&mut self, frag: Vec<u8>) {
        self.frags.push(frag);
    }

    /// Move the (empty) data start `n` bytes into the tailroom.
    ///
    /// # Panics
    /// Panics if data is present or `n` exceeds the tailroom.
    pub fn reserve(&mut self, n: usize) {
        assert_eq!(self.len, 0, "reserve on non-empty packet");
        assert!(n <= self.tailroom(), "reserve past end of buffer");
        self.data += n;
    }

    /// Extend the head data by `n` bytes and return the new region.
    ///
    /// # Panics
    /// Panics if `n` exceeds the tailroom.
    pub fn put(&mut self, n: usize) -> &mut [u8] {
        assert!(n <= self.tailroom(), "put past end of buffer");
        let start = self.data + self.len;
        self.len += n;
        &mut self.head[start..start + n]
    }

    /// Drop `n` bytes from the front of the head data.
    ///
    /// # Panics
    /// Panics if `n` exceeds the head length.
    pub fn pull(&mut self, n: usize) {
        assert!(n <= self.len, "pull past end of data");
        self.data += n;
        self.len -= n;
    }

    pub fn checksum(&self) -> ChecksumState {
        self.checksum
    }

    pub fn set_checksum(&mut self, state: ChecksumState) {
        self.checksum = state;
    }

    /// Ask the device to fill in a checksum before transmission.
    pub fn set_checksum_partial(&mut self, start: usize, offset: usize) {
        self.checksum = ChecksumState::Partial { start, offset };
    }

    /// Copy the whole payload (head then fragments) into a new vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.data());
        for frag in &self.frags {
            out.extend_from_slice(frag);
        }
        out
    }

    /// Pointer to the first data byte.
    pub(crate) fn data_ptr(&self) -> *const u8 {
        // SAFETY: data <= head.len() always holds.
        unsafe { self.head.as_ptr().add(self.data) }
    }

    /// Pointer `back` bytes before the first data byte.
    ///
    /// Caller must have checked `back <= headroom()`.
    pub(crate) fn data_ptr_minus(&self, back: usize) -> *const u8 {
        debug_assert!(back <= self.data);
        // SAFETY: back <= data, so the pointer stays inside the head.
        unsafe { self.head.as_ptr().add(self.data - back) }
    }

    /// Mutable head storage for `[data + at, data + at + 2)`.
    pub(crate) fn head_u16_mut(&mut self, at: usize) -> &mut [u8] {
        let start = self.data + at;
        &mut self.head[start..start + 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_frame_keeps_ip_align_headroom() {
        let pkt = Packet::from_frame(&[1, 2, 3, 4]);
        assert_eq!(pkt.headroom(), NET_IP_ALIGN);
        assert_eq!(pkt.data(), &[1, 2, 3, 4]);
        assert_eq!(pkt.segment_count(), 1);
        assert_eq!(pkt.tailroom(), 0);
    }

    #[test]
    fn test_fragments_count_toward_length() {
        let mut pkt = Packet::from_frame(&[0; 14]);
        pkt.push_fragment(vec![1; 100]);
        pkt.push_fragment(vec![2; 50]);
        assert_eq!(pkt.head_len(), 14);
        assert_eq!(pkt.len(), 164);
        assert_eq!(pkt.segment_count(), 3);
        assert_eq!(pkt.to_vec().len(), 164);
    }

    #[test]
    fn test_receive_trim_sequence() {
        let mut pkt = Packet::try_alloc_receive().unwrap();
        pkt.reserve(3);
        assert!(pkt.tailroom() >= MAX_FRAME_SIZE);
        pkt.put(64);
        pkt.pull(NET_IP_ALIGN);
        assert_eq!(pkt.head_len(), 62);
        assert_eq!(pkt.headroom(), 3 + NET_IP_ALIGN);
    }

    #[test]
    #[should_panic]
    fn test_put_past_tailroom_panics() {
        let mut pkt = Packet::new(0, 4);
        pkt.put(5);
    }
}
