//! Receive engine.
//!
//! Receive buffers are always a single segment. The descriptor carries only
//! the buffer address; the device reports the received length when the
//! completion is read.

use tracing::{debug, error, warn};

use crate::dma::{ChecksumState, DmaHal, Packet, ShadowQueue, DMA_ALIGN, NET_IP_ALIGN};
use crate::error::Result;
use crate::mmio::{rmb, RegisterIo, RECV_COMP, RECV_REQ};
use crate::types::{Descriptor, RingCounts};

/// Post one receive buffer.
///
/// Moves the data start to the next [`DMA_ALIGN`] boundary of its bus
/// address; the skipped bytes stay reserved as headroom.
pub fn submit_receive<R, H>(
    regs: &R,
    hal: &H,
    queue: &mut ShadowQueue<Packet>,
    mut pkt: Packet,
) -> Result<()>
where
    R: RegisterIo + ?Sized,
    H: DmaHal + ?Sized,
{
    let base = hal.virt_to_phys(pkt.data_ptr());
    let pad = (base.wrapping_neg() as usize) & (DMA_ALIGN - 1);
    pkt.reserve(pad);

    let desc = Descriptor::receive(base + pad as u64)?;
    regs.write64(RECV_REQ, desc.raw());
    queue.push(pkt, 1);
    Ok(())
}

/// Deliver up to `budget` received frames.
///
/// Reads `min(recv_comp, budget)` completion events, each yielding the
/// length of the oldest posted buffer. Frames are trimmed to that length,
/// stripped of the IP-align prefix and handed to `deliver`. Returns the
/// number delivered; remaining events stay unread for the next call.
///
/// # Panics
/// Panics if the device reports a completion with no buffer posted.
pub fn drain<R, F>(regs: &R, queue: &mut ShadowQueue<Packet>, budget: usize, mut deliver: F) -> usize
where
    R: RegisterIo + ?Sized,
    F: FnMut(Packet),
{
    let avail = RingCounts::read(regs).recv_comp as usize;
    let n = avail.min(budget);

    for _ in 0..n {
        let reported = regs.read16(RECV_COMP) as usize;
        let entry = match queue.pop() {
            Some(entry) => entry,
            None => panic!("BUG: receive completion with no buffer posted"),
        };
        // Frame bytes were written before the completion became readable.
        rmb();

        let mut pkt = entry.buffer;
        let len = if reported > pkt.tailroom() {
            warn!(reported, room = pkt.tailroom(), "rx length exceeds buffer");
            pkt.tailroom()
        } else {
            reported
        };
        pkt.put(len);
        pkt.pull(NET_IP_ALIGN.min(len));
        pkt.set_checksum(ChecksumState::Unnecessary);

        debug!(len = pkt.len(), "rx deliver");
        deliver(pkt);
    }

    n
}

/// Post up to `target` fresh receive buffers.
///
/// Posts `min(target, recv_req, queue.space())` unless buffer allocation
/// fails first. Returns the number actually posted.
pub fn refill<R, H>(regs: &R, hal: &H, queue: &mut ShadowQueue<Packet>, target: usize) -> usize
where
    R: RegisterIo + ?Sized,
    H: DmaHal + ?Sized,
{
    let hw = RingCounts::read(regs).recv_req as usize;
    let n = target.min(hw).min(queue.space());

    let mut posted = 0;
    for _ in 0..n {
        let Some(pkt) = Packet::try_alloc_receive() else {
            warn!(posted, wanted = n, "rx buffer allocation failed");
            break;
        };
        if let Err(err) = submit_receive(regs, hal, queue, pkt) {
            error!(%err, "rx buffer not postable");
            break;
        }
        posted += 1;
    }

    posted
}
