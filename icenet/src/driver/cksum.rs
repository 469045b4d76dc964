//! Checksum offload handshake.
//!
//! The checksum engine shares the register window with the data rings but
//! has its own request register, counters and result register:
//!
//! ```text
//!  wait  CKSUM_COUNTS.depth >= segments
//!  write CKSUM_REQ  (head span, then each fragment)
//!  wait  CKSUM_COUNTS.ready != 0
//!  read  CKSUM_RESP -> store at start + offset
//! ```
//!
//! Strictly one request at a time, performed under the transmit lock.
//! With no spin limit configured the waits are unbounded: an engine that
//! never answers blocks the caller until the device is reset.

use tracing::{debug, error};

use crate::dma::{ChecksumState, DmaHal, Packet};
use crate::error::{NicError, Result};
use crate::mmio::{wmb, RegisterIo, CKSUM_REQ, CKSUM_RESP};
use crate::types::{ChecksumCounts, Descriptor};

/// Bytes occupied by the checksum field.
const CSUM_FIELD_LEN: usize = 2;

/// Busy-wait until `ready` accepts the engine counters.
fn wait_for<R, F>(regs: &R, limit: Option<u32>, ready: F) -> Result<ChecksumCounts>
where
    R: RegisterIo + ?Sized,
    F: Fn(ChecksumCounts) -> bool,
{
    let mut spins: u32 = 0;
    loop {
        let counts = ChecksumCounts::read(regs);
        if ready(counts) {
            return Ok(counts);
        }
        spins = spins.saturating_add(1);
        if let Some(limit) = limit {
            if spins >= limit {
                error!(spins, ?counts, "checksum engine not responding");
                return Err(NicError::ChecksumTimeout { spins });
            }
        }
        core::hint::spin_loop();
    }
}

/// Have the device compute the checksum a `Partial` packet asks for.
///
/// The span runs from the checksum start to the end of the head segment,
/// then over every fragment. The 16-bit result is stored little-endian at
/// `start + offset` and the packet is marked [`ChecksumState::Complete`].
/// Packets in any other checksum state are left untouched.
///
/// # Errors
/// - `ChecksumSpan` if start or the checksum field fall outside the head
/// - `AddressOutOfRange` / `LengthOutOfRange` for an unencodable segment,
///   detected before anything is written
/// - `ChecksumTimeout` if `spin_limit` is reached; if this happens during
///   the second wait the engine still holds the request and needs a reset
pub fn offload<R, H>(regs: &R, hal: &H, pkt: &mut Packet, spin_limit: Option<u32>) -> Result<()>
where
    R: RegisterIo + ?Sized,
    H: DmaHal + ?Sized,
{
    let ChecksumState::Partial { start, offset } = pkt.checksum() else {
        return Ok(());
    };

    let head_len = pkt.head_len();
    if start >= head_len || start + offset + CSUM_FIELD_LEN > head_len {
        return Err(NicError::ChecksumSpan {
            start,
            offset,
            head_len,
        });
    }

    let nfrags = pkt.frags().len();
    let segments = nfrags + 1;

    // SAFETY: start < head_len, so the pointer stays inside the head data.
    let span_ptr = unsafe { pkt.data_ptr().add(start) };
    let head = Descriptor::encode(hal.virt_to_phys(span_ptr), head_len - start, nfrags == 0)?;
    for (i, frag) in pkt.frags().iter().enumerate() {
        Descriptor::encode(hal.virt_to_phys(frag.as_ptr()), frag.len(), i + 1 == nfrags)?;
    }

    wait_for(regs, spin_limit, |c| c.depth as usize >= segments)?;

    wmb();
    regs.write64(CKSUM_REQ, head.raw());
    for (i, frag) in pkt.frags().iter().enumerate() {
        let desc = Descriptor::encode(hal.virt_to_phys(frag.as_ptr()), frag.len(), i + 1 == nfrags)?;
        regs.write64(CKSUM_REQ, desc.raw());
    }

    wait_for(regs, spin_limit, |c| c.ready != 0)?;

    let result = regs.read16(CKSUM_RESP);
    pkt.head_u16_mut(start + offset)
        .copy_from_slice(&result.to_le_bytes());
    pkt.set_checksum(ChecksumState::Complete);

    debug!(segments, start, offset, result, "checksum offloaded");
    Ok(())
}
