//! Memory barriers around descriptor submission and completion.
//!
//! Descriptors are plain MMIO writes and completions plain MMIO reads, so
//! nothing orders them against the packet bytes the device moves by DMA.
//! The engines call these at the two points where that ordering matters:
//! - `wmb()` after the CPU finishes writing a buffer and before its first
//!   descriptor is submitted.
//! - `rmb()` after completion events are consumed and before the CPU reads
//!   what the device wrote.

use core::sync::atomic::{fence, Ordering};

/// Order prior buffer writes before subsequent descriptor writes.
#[inline]
pub fn wmb() {
    fence(Ordering::Release);
}

/// Order completion reads before subsequent buffer reads.
#[inline]
pub fn rmb() {
    fence(Ordering::Acquire);
}
