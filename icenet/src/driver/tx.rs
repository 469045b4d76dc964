//! Transmit engine.
//!
//! Per buffer: `Pending → Submitted → Completed → Reclaimed`.
//!
//! A buffer is submitted as one descriptor per segment, head first, each a
//! separate write to `SEND_REQ`. The device produces one completion per
//! descriptor; [`reclaim`] only retires a buffer once all of its
//! completions are readable, so completions are consumed in submission order
//! and never split across two buffers.

use tracing::{debug, warn};

use crate::dma::{DmaHal, Packet, ShadowQueue, NET_IP_ALIGN};
use crate::error::{NicError, Result};
use crate::mmio::{wmb, RegisterIo, SEND_COMP, SEND_REQ};
use crate::types::{Descriptor, RingCounts};

/// Descriptors for `pkt`, head first.
///
/// The head descriptor starts `NET_IP_ALIGN` bytes before the data and is
/// that much longer; the receiving side strips the prefix.
fn descriptors<'a, H: DmaHal + ?Sized>(
    hal: &'a H,
    pkt: &'a Packet,
) -> impl Iterator<Item = Result<Descriptor>> + 'a {
    let nfrags = pkt.frags().len();
    let head_addr = hal.virt_to_phys(pkt.data_ptr_minus(NET_IP_ALIGN));
    let head = Descriptor::encode(head_addr, pkt.head_len() + NET_IP_ALIGN, nfrags == 0);

    core::iter::once(head).chain(pkt.frags().iter().enumerate().map(move |(i, frag)| {
        Descriptor::encode(hal.virt_to_phys(frag.as_ptr()), frag.len(), i + 1 == nfrags)
    }))
}

/// Submit a packet to the send ring.
///
/// # Contract
/// The caller has checked `send_space() >= pkt.segment_count()`. This
/// function does not re-check; a violation overruns the hardware ring.
///
/// # Errors
/// `NoHeadroom`, `AddressOutOfRange` or `LengthOutOfRange`. All segments are
/// encoded before the first write, so on error the device has seen nothing
/// of this packet. The packet is dropped.
pub fn submit<R, H>(regs: &R, hal: &H, queue: &mut ShadowQueue<Packet>, pkt: Packet) -> Result<()>
where
    R: RegisterIo + ?Sized,
    H: DmaHal + ?Sized,
{
    if pkt.headroom() < NET_IP_ALIGN {
        return Err(NicError::NoHeadroom {
            needed: NET_IP_ALIGN,
            available: pkt.headroom(),
        });
    }
    for desc in descriptors(hal, &pkt) {
        desc?;
    }

    let segments = pkt.segment_count();

    // Packet bytes must be visible before the device can fetch them.
    wmb();
    for desc in descriptors(hal, &pkt) {
        regs.write64(SEND_REQ, desc?.raw());
    }

    debug!(segments, len = pkt.len(), "tx submit");
    queue.push(pkt, segments);
    Ok(())
}

/// Retire completed buffers, given `avail` readable completion events.
///
/// Returns the number of buffers released. Stops early, leaving events
/// unread, when the oldest buffer still has segments in flight.
pub fn reclaim<R>(regs: &R, queue: &mut ShadowQueue<Packet>, mut avail: usize) -> usize
where
    R: RegisterIo + ?Sized,
{
    let mut released = 0;

    while avail > 0 {
        let Some(segments) = queue.peek_tail_segment_count() else {
            warn!(avail, "tx completions with nothing in flight");
            break;
        };
        if segments > avail {
            break;
        }

        // Only the number of events matters; the lengths are not used.
        for _ in 0..segments {
            regs.read16(SEND_COMP);
        }

        if let Some(entry) = queue.pop() {
            debug!(segments, len = entry.buffer.len(), "tx reclaim");
            drop(entry.buffer);
        }
        avail -= segments;
        released += 1;
    }

    released
}

/// Read the completion counter and reclaim everything it allows.
pub fn complete<R>(regs: &R, queue: &mut ShadowQueue<Packet>) -> usize
where
    R: RegisterIo + ?Sized,
{
    let avail = RingCounts::read(regs).send_comp as usize;
    reclaim(regs, queue, avail)
}

/// Free send slots: the smaller of hardware and shadow queue space.
pub fn send_space<R>(regs: &R, queue: &ShadowQueue<Packet>) -> usize
where
    R: RegisterIo + ?Sized,
{
    let hw = RingCounts::read(regs).send_req as usize;
    hw.min(queue.space())
}
