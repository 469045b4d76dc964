//! IceNet driver.
//!
//! The engines ([`tx`], [`rx`], [`cksum`]) are free functions over a
//! [`RegisterIo`](crate::mmio::RegisterIo) and a shadow queue; [`device`]
//! wires them into the interrupt and poll entry points under the locks.

pub mod cksum;
pub mod device;
pub mod intmask;
pub mod poll;
pub mod rx;
pub mod stats;
pub mod traits;
pub mod tx;

pub use device::Icenet;
pub use intmask::{clear_intmask, set_intmask};
pub use poll::{PollState, PollStatus};
pub use stats::{NicStats, StatsSnapshot};
pub use traits::Upstream;
