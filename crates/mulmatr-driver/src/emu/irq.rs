//! Interrupt line
//!
//! Level signal with two writers: the control/status machine asserts it
//! when a multiply completes with IRQ_ENABLE set; a Status read or
//! RESET_STAT deasserts it.

use tracing::trace;

/// Device interrupt output
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IrqLine {
    level: bool,
    raised: u64,
}

impl IrqLine {
    /// Current level of the line.
    pub const fn is_asserted(&self) -> bool {
        self.level
    }

    /// Number of times the line has been driven high.
    pub const fn assertions(&self) -> u64 {
        self.raised
    }

    pub(crate) fn assert(&mut self) {
        self.level = true;
        self.raised += 1;
        trace!(count = self.raised, "irq asserted");
    }

    pub(crate) fn deassert(&mut self) {
        if self.level {
            trace!("irq deasserted");
        }
        self.level = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_low() {
        let line = IrqLine::default();
        assert!(!line.is_asserted());
        assert_eq!(line.assertions(), 0);
    }

    #[test]
    fn assert_then_deassert() {
        let mut line = IrqLine::default();
        line.assert();
        assert!(line.is_asserted());
        line.deassert();
        line.deassert();
        assert!(!line.is_asserted());
        assert_eq!(line.assertions(), 1);
    }
}
