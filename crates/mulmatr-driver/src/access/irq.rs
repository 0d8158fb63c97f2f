//! Interrupt service
//!
//! Observes the device interrupt line and acknowledges it by reading
//! Status. Handling is log-only: no register is written and nothing waits
//! on the interrupt.

use mulmatr_chip::regs;
use tracing::{debug, info};

use crate::bus::RegisterBus;
use crate::emu::control::StatusFlags;
use crate::error::Result;

/// Result of one service pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqOutcome {
    /// Line was low; nothing was read
    Idle,
    /// Line was high; Status was read (deasserting it)
    Handled {
        /// Status observed by the acknowledging read
        status: StatusFlags,
    },
}

impl IrqOutcome {
    /// Whether the pass observed a completed multiply.
    pub const fn op_ended(&self) -> bool {
        match self {
            Self::Idle => false,
            Self::Handled { status } => status.contains(StatusFlags::OP_ENDED),
        }
    }
}

/// Interrupt handler
#[derive(Debug, Default, Clone, Copy)]
pub struct IrqHandler;

impl IrqHandler {
    /// Service the line once.
    ///
    /// # Errors
    ///
    /// Returns error if the Status read fails.
    pub fn service<B: RegisterBus + ?Sized>(bus: &B) -> Result<IrqOutcome> {
        if !bus.irq_pending() {
            return Ok(IrqOutcome::Idle);
        }
        let status = StatusFlags::from_bits_retain(bus.read32(regs::STATUS)?);
        if status.contains(StatusFlags::OP_ENDED) {
            info!("interrupt: operation ended (status {:#x})", status.bits());
        } else {
            debug!("interrupt with status {:#x}", status.bits());
        }
        Ok(IrqOutcome::Handled { status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SharedDevice;
    use mulmatr_chip::regs::control;

    #[test]
    fn idle_when_line_low() {
        let dev = SharedDevice::default();
        assert_eq!(IrqHandler::service(&dev).unwrap(), IrqOutcome::Idle);
    }

    #[test]
    fn acknowledges_completion() {
        let dev = SharedDevice::default();
        dev.write32(regs::CONTROL, control::ENABLE | control::IRQ_ENABLE | control::START_OP)
            .unwrap();
        let outcome = IrqHandler::service(&dev).unwrap();
        assert!(outcome.op_ended());
        assert!(!dev.irq_pending());
        assert_eq!(IrqHandler::service(&dev).unwrap(), IrqOutcome::Idle);
    }

    #[test]
    fn leaves_registers_alone() {
        let dev = SharedDevice::default();
        dev.write32(regs::CONTROL, control::ENABLE | control::IRQ_ENABLE | control::START_OP)
            .unwrap();
        IrqHandler::service(&dev).unwrap();
        assert_eq!(dev.read32(regs::CONTROL).unwrap(), 0x7);
        assert_eq!(dev.read32(regs::STATUS).unwrap(), 0x3);
    }
}
