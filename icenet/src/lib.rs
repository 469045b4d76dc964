//! IceNet NIC driver
//!
//! Driver for the IceNet DMA network controller: descriptor rings, shadow
//! queues for in-flight buffers, a budgeted receive poll, and the
//! checksum offload engine.
//!
//! ```text
//!   stack::DeviceAdapter (smoltcp)
//!            │
//!   driver::Icenet ── tx / rx / cksum engines
//!            │
//!   mmio::RegisterIo ── MmioRegion | sim::SimNic
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod dma;
pub mod driver;
pub mod error;
pub mod mmio;
pub mod stack;
pub mod types;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use config::NicConfig;
pub use dma::{ChecksumState, DmaHal, IdentityHal, Packet};
pub use driver::{Icenet, PollStatus, StatsSnapshot, Upstream};
pub use error::{NicError, Result};
pub use mmio::{MmioRegion, RegisterIo};
pub use types::{IntMask, MacAddress, NicFeatures};
