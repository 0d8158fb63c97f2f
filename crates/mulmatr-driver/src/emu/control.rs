//! Control/status state machine
//!
//! A write to the control register latches the raw word, then evaluates at
//! most one command:
//!
//! ```text
//! Idle|Ended  --START_OP-->    Ended   (STARTED, multiply, ENDED, IRQ if enabled)
//! Any         --RESET_STAT-->  Idle    (status cleared, IRQ deasserted)
//! ```
//!
//! START_OP wins over RESET_STAT when both are present. Command bits are
//! latched, not self-clearing: the host must clear them itself, or the
//! next control write carrying the same bits runs the command again.

use bitflags::bitflags;
use mulmatr_chip::regs;
use tracing::{debug, info};

use super::engine::MultiplyEngine;
use super::irq::IrqLine;
use super::regfile::{RegisterFile, Target};

bitflags! {
    /// Control word bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlFlags: u32 {
        /// Device enabled
        const ENABLE = regs::control::ENABLE;
        /// Interrupt on multiply completion
        const IRQ_ENABLE = regs::control::IRQ_ENABLE;
        /// Latched command: run the multiply
        const START_OP = regs::control::START_OP;
        /// Latched command: clear status and interrupt
        const RESET_STAT = regs::control::RESET_STAT;
    }
}

impl ControlFlags {
    /// Both command bits.
    pub const COMMANDS: Self = Self::START_OP.union(Self::RESET_STAT);
}

bitflags! {
    /// Status word bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u32 {
        /// Multiply started
        const OP_STARTED = regs::status::OP_STARTED;
        /// Multiply finished
        const OP_ENDED = regs::status::OP_ENDED;
    }
}

/// Observable device state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// ENABLE clear
    Disabled,
    /// No status bits set
    Idle,
    /// OP_STARTED without OP_ENDED (never visible from the bus)
    Running,
    /// OP_ENDED set
    Ended,
}

impl State {
    /// Derive the state from the control and status registers.
    pub fn observe(control: ControlFlags, status: StatusFlags) -> Self {
        if !control.contains(ControlFlags::ENABLE) {
            Self::Disabled
        } else if status.contains(StatusFlags::OP_ENDED) {
            Self::Ended
        } else if status.contains(StatusFlags::OP_STARTED) {
            Self::Running
        } else {
            Self::Idle
        }
    }
}

/// Command selected by a control write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Run the multiply
    StartOp,
    /// Clear status and deassert the interrupt line
    ResetStat,
    /// Configuration-only write
    None,
}

impl ControlCommand {
    /// Select the command carried by a control word; START_OP shadows RESET_STAT.
    pub fn from_control(control: ControlFlags) -> Self {
        if control.contains(ControlFlags::START_OP) {
            Self::StartOp
        } else if control.contains(ControlFlags::RESET_STAT) {
            Self::ResetStat
        } else {
            Self::None
        }
    }
}

/// Interprets control writes as state transitions
#[derive(Debug, Default, Clone, Copy)]
pub struct ControlStatusMachine;

impl ControlStatusMachine {
    /// Latch `value` into Control and execute the command it carries.
    pub fn write_control(
        regs: &mut RegisterFile,
        irq: &mut IrqLine,
        value: u32,
    ) -> ControlCommand {
        regs.write(Target::Control, value);
        let control = regs.control();
        let command = ControlCommand::from_control(control);
        debug!(control = ?control, ?command, "control write");

        match command {
            ControlCommand::StartOp => Self::start_op(regs, irq, control),
            ControlCommand::ResetStat => {
                regs.set_status(StatusFlags::empty());
                irq.deassert();
                debug!("status reset");
            }
            ControlCommand::None => {}
        }
        command
    }

    fn start_op(regs: &mut RegisterFile, irq: &mut IrqLine, control: ControlFlags) {
        let n = regs.size();
        regs.set_status(regs.status() | StatusFlags::OP_STARTED);

        let result = MultiplyEngine::run(regs.matrix_a(), regs.matrix_b(), n);
        regs.store_result(&result);

        regs.set_status(regs.status() | StatusFlags::OP_ENDED);
        info!(size = n, "multiply completed");

        if control.contains(ControlFlags::IRQ_ENABLE) {
            irq.assert();
        }
    }
}
