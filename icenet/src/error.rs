//! Driver error types.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, NicError>;

/// Errors reported by the IceNet driver core.
///
/// Invariant violations that can only come from a driver bug (popping an
/// empty shadow queue, a refill that does not match the preceding drain) are
/// not represented here; they panic with a `BUG:` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NicError {
    /// Ring capacity is not a nonzero power of two, or exceeds the 8-bit
    /// hardware counters.
    #[error("ring size {0} must be a power of two between 1 and 256")]
    InvalidRingSize(usize),
    /// Some other attach-time parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Physical address does not fit the 48-bit descriptor field.
    #[error("physical address {addr:#x} does not fit in 48 bits")]
    AddressOutOfRange { addr: u64 },
    /// Segment length does not fit the 15-bit descriptor field.
    #[error("segment length {len} does not fit in 15 bits")]
    LengthOutOfRange { len: usize },
    /// Not enough send slots even after reclaiming completions.
    #[error("send ring full: need {needed} slots, {available} available")]
    RingFull { needed: usize, available: usize },
    /// Transmit queue is suspended until completions free space.
    #[error("transmit queue stopped")]
    QueueStopped,
    /// Transmit head segment lacks the bytes the IP-align prefix needs.
    #[error("head segment has {available} bytes of headroom, {needed} required")]
    NoHeadroom { needed: usize, available: usize },
    /// Checksum start/offset lie outside the head segment.
    #[error("checksum span invalid: start {start}, offset {offset}, head length {head_len}")]
    ChecksumSpan {
        start: usize,
        offset: usize,
        head_len: usize,
    },
    /// The checksum engine did not answer within the configured spin limit.
    #[error("checksum engine did not respond after {spins} polls")]
    ChecksumTimeout { spins: u32 },
    /// The device has not been opened, or has been stopped.
    #[error("device not open")]
    NotOpen,
}
