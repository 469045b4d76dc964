//! Attach-time driver configuration.
//!
//! All values are fixed when the device handle is created.

use crate::error::{NicError, Result};

/// Default ring capacity (entries per shadow queue).
pub const DEFAULT_RING_SIZE: usize = 64;

/// Default receive poll budget.
pub const DEFAULT_RX_BUDGET: usize = 64;

/// Default free-slot threshold below which TX interrupts are armed.
pub const DEFAULT_TX_IRQ_THRESHOLD: usize = 16;

/// Largest ring the 8-bit hardware availability counters can describe.
pub const MAX_RING_SIZE: usize = 256;

/// IceNet driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NicConfig {
    /// Shadow queue capacity. Must be a power of two.
    pub ring_size: usize,
    /// Maximum receive completions processed per poll invocation.
    pub rx_budget: usize,
    /// Free send slots at or above which TX interrupts are disabled.
    pub tx_irq_threshold: usize,
    /// Upper bound on checksum-engine status polls per wait.
    ///
    /// `None` spins until the engine answers, which is what the hardware
    /// contract asks for. A bound turns a hung engine into
    /// [`NicError::ChecksumTimeout`].
    pub checksum_spin_limit: Option<u32>,
}

impl NicConfig {
    /// Create configuration with default values.
    pub const fn new() -> Self {
        Self {
            ring_size: DEFAULT_RING_SIZE,
            rx_budget: DEFAULT_RX_BUDGET,
            tx_irq_threshold: DEFAULT_TX_IRQ_THRESHOLD,
            checksum_spin_limit: None,
        }
    }

    pub const fn with_ring_size(mut self, ring_size: usize) -> Self {
        self.ring_size = ring_size;
        self
    }

    pub const fn with_rx_budget(mut self, rx_budget: usize) -> Self {
        self.rx_budget = rx_budget;
        self
    }

    pub const fn with_tx_irq_threshold(mut self, threshold: usize) -> Self {
        self.tx_irq_threshold = threshold;
        self
    }

    pub const fn with_checksum_spin_limit(mut self, limit: u32) -> Self {
        self.checksum_spin_limit = Some(limit);
        self
    }

    /// Check the configuration against the hardware's constraints.
    pub fn validate(&self) -> Result<()> {
        if !self.ring_size.is_power_of_two() || self.ring_size > MAX_RING_SIZE {
            return Err(NicError::InvalidRingSize(self.ring_size));
        }
        if self.rx_budget == 0 {
            return Err(NicError::InvalidConfig("rx budget must be nonzero"));
        }
        if self.tx_irq_threshold > self.ring_size {
            return Err(NicError::InvalidConfig(
                "tx interrupt threshold exceeds ring size",
            ));
        }
        Ok(())
    }
}

impl Default for NicConfig {
    fn default() -> Self {
        Self::new()
    }
}
