//! DMA-facing buffers and bookkeeping.
//!
//! - [`packet`]: owned, possibly scattered packet buffers
//! - [`shadow`]: software mirror of a hardware ring
//! - [`hal`]: CPU-to-bus address translation

pub mod hal;
pub mod packet;
pub mod shadow;

pub use hal::{DmaHal, IdentityHal, OffsetHal};
pub use packet::{ChecksumState, Packet, DMA_ALIGN, MAX_FRAME_SIZE, NET_IP_ALIGN};
pub use shadow::{ShadowEntry, ShadowQueue};
