//! Wire and register encodings.

pub mod counts;
pub mod desc;
pub mod ethernet;
pub mod flags;

pub use counts::{ChecksumCounts, RingCounts};
pub use desc::{Descriptor, MAX_SEGMENT_LEN};
pub use ethernet::{MacAddress, ETH_ALEN, ETH_FRAME_MAX, ETH_HLEN, ETH_MTU};
pub use flags::{IntMask, NicFeatures};
