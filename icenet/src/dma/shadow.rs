//! Software shadow of a hardware ring.
//!
//! Hardware reports completions per segment, not per buffer. The shadow
//! queue remembers, in submission order, which buffer each group of
//! segments belongs to, so a buffer is only retired once every one of its
//! segments has completed.
//!
//! `head` and `tail` run freely and are reduced with `capacity - 1` on
//! access. Because the capacity is a power of two the wrapping difference
//! `head - tail` is always the live count, which lets the queue hold exactly
//! `capacity` entries.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::{NicError, Result};

/// One in-flight buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct ShadowEntry<T> {
    pub buffer: T,
    /// Hardware completions this buffer will consume.
    pub segments: usize,
}

/// Fixed-capacity FIFO of in-flight buffers.
pub struct ShadowQueue<T> {
    slots: Box<[Option<ShadowEntry<T>>]>,
    head: usize,
    tail: usize,
    mask: usize,
}

impl<T> ShadowQueue<T> {
    /// Create a queue of `capacity` entries.
    ///
    /// # Errors
    /// `InvalidRingSize` unless `capacity` is a nonzero power of two.
    pub fn new(capacity: usize) -> Result<Self> {
        if !capacity.is_power_of_two() {
            return Err(NicError::InvalidRingSize(capacity));
        }
        let slots: Vec<Option<ShadowEntry<T>>> = (0..capacity).map(|_| None).collect();
        Ok(Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            tail: 0,
            mask: capacity - 1,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live entries.
    #[inline]
    pub fn count(&self) -> usize {
        self.head.wrapping_sub(self.tail)
    }

    /// Free entries.
    #[inline]
    pub fn space(&self) -> usize {
        self.capacity() - self.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Record a submitted buffer.
    ///
    /// The caller must have checked `space() > 0`; the hardware ring this
    /// mirrors has no room either when this one is full.
    pub fn push(&mut self, buffer: T, segments: usize) {
        debug_assert!(self.space() > 0, "BUG: push on full shadow queue");
        let slot = &mut self.slots[self.head & self.mask];
        debug_assert!(slot.is_none(), "BUG: overwriting live shadow entry");
        *slot = Some(ShadowEntry { buffer, segments });
        self.head = self.head.wrapping_add(1);
    }

    /// Retire the oldest entry.
    pub fn pop(&mut self) -> Option<ShadowEntry<T>> {
        if self.is_empty() {
            return None;
        }
        let entry = self.slots[self.tail & self.mask].take();
        debug_assert!(entry.is_some(), "BUG: live shadow slot was empty");
        self.tail = self.tail.wrapping_add(1);
        entry
    }

    /// Segment count of the oldest entry, without removing it.
    pub fn peek_tail_segment_count(&self) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.tail & self.mask].as_ref().map(|e| e.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::VecDeque;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(ShadowQueue::<u32>::new(0).is_err());
        assert!(ShadowQueue::<u32>::new(12).is_err());
        assert!(ShadowQueue::<u32>::new(16).is_ok());
    }

    #[test]
    fn test_fill_and_drain_wraps() {
        let mut q = ShadowQueue::new(16).unwrap();
        // Offset the indices so the full cycle crosses the array end.
        for i in 0..5 {
            q.push(i, 1);
            assert_eq!(q.pop().unwrap().buffer, i);
        }
        for i in 0..16 {
            q.push(100 + i, 1);
        }
        assert_eq!(q.count(), 16);
        assert_eq!(q.space(), 0);
        for i in 0..16 {
            assert_eq!(q.pop().unwrap().buffer, 100 + i);
        }
        assert!(q.is_empty());
        assert_eq!(q.head, q.tail);
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_peek_tail_segment_count() {
        let mut q = ShadowQueue::new(4).unwrap();
        assert_eq!(q.peek_tail_segment_count(), None);
        q.push("a", 3);
        q.push("b", 1);
        assert_eq!(q.peek_tail_segment_count(), Some(3));
        assert_eq!(q.count(), 2);
        q.pop();
        assert_eq!(q.peek_tail_segment_count(), Some(1));
    }

    proptest! {
        #[test]
        fn fifo_order_and_bounds(ops in proptest::collection::vec(any::<bool>(), 0..400)) {
            let mut q = ShadowQueue::new(8).unwrap();
            let mut model = VecDeque::new();
            let mut next = 0u32;
            for push in ops {
                if push && q.space() > 0 {
                    q.push(next, (next % 3 + 1) as usize);
                    model.push_back(next);
                    next += 1;
                } else if !push && q.count() > 0 {
                    let entry = q.pop().unwrap();
                    prop_assert_eq!(Some(entry.buffer), model.pop_front());
                    prop_assert_eq!(entry.segments, (entry.buffer % 3 + 1) as usize);
                }
                prop_assert!(q.count() <= q.capacity());
                prop_assert_eq!(q.count(), model.len());
                prop_assert_eq!(q.count() + q.space(), 8);
            }
        }
    }
}
