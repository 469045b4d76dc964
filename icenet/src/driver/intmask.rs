//! Interrupt mask updates.
//!
//! The host never reads the mask back; it only sets and clears bits with
//! atomic read-modify-write on the device register.

use crate::mmio::{RegisterIo, INTMASK};
use crate::types::IntMask;

#[inline]
pub fn set_intmask<R: RegisterIo + ?Sized>(regs: &R, mask: IntMask) {
    regs.fetch_or32(INTMASK, mask.bits());
}

#[inline]
pub fn clear_intmask<R: RegisterIo + ?Sized>(regs: &R, mask: IntMask) {
    regs.fetch_and32(INTMASK, !mask.bits());
}
