//! Receive poll scheduling.
//!
//! The receive interrupt only schedules work; a budgeted poll task does it.
//! One flag word guarantees at most one scheduled poll per device:
//!
//! ```text
//!   rx_interrupt: SCHED 0→1 (only if not DISABLE)   → caller runs poll()
//!   poll done:    SCHED 1→0                          → RX interrupt re-armed
//!   disable:      DISABLE=1, then wait to take SCHED → no poll runs after
//!   enable:       clear both
//! ```

use core::hint::spin_loop;
use core::sync::atomic::{AtomicU8, Ordering};

const SCHED: u8 = 1 << 0;
const DISABLE: u8 = 1 << 1;

/// Result of one poll invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Ring drained below budget; the poll is finished and the receive
    /// interrupt is armed again.
    Complete(usize),
    /// Budget exhausted; the poll stays scheduled and must run again.
    Pending(usize),
}

impl PollStatus {
    /// Frames delivered by this invocation.
    pub fn delivered(self) -> usize {
        match self {
            PollStatus::Complete(n) | PollStatus::Pending(n) => n,
        }
    }
}

/// Schedule/complete handshake for the poll task.
pub struct PollState {
    state: AtomicU8,
}

impl PollState {
    /// Starts disabled, like a freshly attached device.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(SCHED | DISABLE),
        }
    }

    /// Claim the right to run a poll.
    ///
    /// Returns `false` if one is already scheduled or polling is disabled.
    pub fn schedule_prep(&self) -> bool {
        let mut cur = self.state.load(Ordering::Relaxed);
        loop {
            if cur & (SCHED | DISABLE) != 0 {
                return false;
            }
            match self.state.compare_exchange_weak(
                cur,
                cur | SCHED,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Finish the scheduled poll.
    ///
    /// Returns `true` if polling is still enabled, i.e. the receive
    /// interrupt may be re-armed.
    pub fn complete(&self) -> bool {
        let prev = self.state.fetch_and(!SCHED, Ordering::Release);
        debug_assert!(prev & SCHED != 0, "BUG: completing a poll that was not scheduled");
        prev & DISABLE == 0
    }

    /// Finish the scheduled poll only if polling is still enabled.
    ///
    /// Returns `false`, with `SCHED` still held, once disabling has begun;
    /// the caller must undo any re-arm and then call [`complete`].
    ///
    /// [`complete`]: PollState::complete
    pub fn complete_if_enabled(&self) -> bool {
        let mut cur = self.state.load(Ordering::Relaxed);
        loop {
            debug_assert!(cur & SCHED != 0, "BUG: completing a poll that was not scheduled");
            if cur & DISABLE != 0 {
                return false;
            }
            match self.state.compare_exchange_weak(
                cur,
                cur & !SCHED,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => cur = actual,
            }
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.state.load(Ordering::Acquire) & SCHED != 0
    }

    pub fn is_disabled(&self) -> bool {
        self.state.load(Ordering::Acquire) & DISABLE != 0
    }

    /// Allow scheduling again.
    pub fn enable(&self) {
        self.state.store(0, Ordering::Release);
    }

    /// Forbid new polls and wait for an in-flight one to finish.
    ///
    /// Leaves `SCHED` held so nothing can be scheduled until [`enable`].
    ///
    /// [`enable`]: PollState::enable
    pub fn disable(&self) {
        self.state.fetch_or(DISABLE, Ordering::AcqRel);
        loop {
            let cur = self.state.load(Ordering::Relaxed);
            if cur & SCHED == 0
                && self
                    .state
                    .compare_exchange_weak(cur, cur | SCHED, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return;
            }
            spin_loop();
        }
    }
}

impl Default for PollState {
    fn default() -> Self {
        Self::new()
    }
}
