//! Addressable device model
//!
//! Single entry point for bus accesses: decodes the offset, routes Control
//! writes through the control/status machine and everything else to the
//! register file. The access size is ignored; every access is treated as
//! one 32-bit word at the given offset.

use mulmatr_chip::regs;
use tracing::{info, trace, warn};

use super::control::{ControlCommand, ControlStatusMachine, State};
use super::irq::IrqLine;
use super::regfile::{RegisterFile, Target};
use crate::config::DeviceConfig;

/// Emulated mulmatr device
#[derive(Debug, Clone)]
pub struct DeviceModel {
    regs: RegisterFile,
    irq: IrqLine,
    config: DeviceConfig,
}

impl Default for DeviceModel {
    fn default() -> Self {
        Self::new(DeviceConfig::default())
    }
}

impl DeviceModel {
    /// Create a device in its power-on state.
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            regs: RegisterFile::new(config.control, config.size, config.chip_id),
            irq: IrqLine::default(),
            config,
        }
    }

    /// Bus read.
    ///
    /// Reading Status on an enabled device deasserts the interrupt line.
    pub fn read(&mut self, offset: usize, _size: usize) -> u32 {
        let target = Target::decode(offset);
        let value = self.regs.read(target);

        if target == Target::Status && self.regs.is_enabled() {
            self.irq.deassert();
        }
        if target == Target::Invalid && self.regs.is_enabled() {
            warn!("read of unmapped offset {offset:#x}");
        }

        trace!("read {offset:#05x} ({target:?}) = {value:#x}");
        value
    }

    /// Bus write.
    ///
    /// Writes land in storage whether or not the device is enabled.
    pub fn write(&mut self, offset: usize, _size: usize, value: u32) {
        let target = Target::decode(offset);
        trace!("write {offset:#05x} ({target:?}) <- {value:#x}");

        match target {
            Target::Control => {
                let command = ControlStatusMachine::write_control(&mut self.regs, &mut self.irq, value);
                if command != ControlCommand::None {
                    trace!(?command, state = ?self.state(), "command executed");
                }
            }
            Target::Invalid => warn!("write to unmapped offset {offset:#x} dropped"),
            _ => {
                self.regs.write(target, value);
            }
        }
    }

    /// Return every register, buffer and the interrupt line to power-on state.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
        info!("device reset");
    }

    /// Level of the interrupt line.
    pub const fn irq_asserted(&self) -> bool {
        self.irq.is_asserted()
    }

    /// Interrupt line, for inspection.
    pub const fn irq(&self) -> &IrqLine {
        &self.irq
    }

    /// Register file, for inspection (bypasses the enable gate and read side effects).
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Current control/status state.
    pub fn state(&self) -> State {
        State::observe(self.regs.control(), self.regs.status())
    }

    /// Power-on configuration.
    pub const fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Write a word at `offset` with the native access size.
    pub fn write32(&mut self, offset: usize, value: u32) {
        self.write(offset, regs::WORD_BYTES, value);
    }

    /// Read a word at `offset` with the native access size.
    pub fn read32(&mut self, offset: usize) -> u32 {
        self.read(offset, regs::WORD_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::control::StatusFlags;
    use mulmatr_chip::regs::{control, MATR_A_START, MATR_B_START, MATR_C_START};

    #[allow(clippy::cast_sign_loss)]
    fn load(dev: &mut DeviceModel, n: u32, a: &[i32], b: &[i32]) {
        dev.write32(regs::SIZE, n);
        for (i, &v) in a.iter().enumerate() {
            dev.write32(MATR_A_START + i * 4, v as u32);
        }
        for (i, &v) in b.iter().enumerate() {
            dev.write32(MATR_B_START + i * 4, v as u32);
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    fn result(dev: &mut DeviceModel, n: usize) -> Vec<i32> {
        (0..n)
            .map(|i| dev.read32(MATR_C_START + i * 4) as i32)
            .collect()
    }

    #[test]
    fn powers_on_enabled_with_size_three() {
        let mut dev = DeviceModel::default();
        assert_eq!(dev.read32(regs::CONTROL), 0x01);
        assert_eq!(dev.read32(regs::SIZE), 3);
        assert_eq!(dev.read32(regs::ID), 0xC1A0);
        assert_eq!(dev.state(), State::Idle);
    }

    #[test]
    fn size_round_trips_and_clamps() {
        let mut dev = DeviceModel::default();
        for s in 0..=10 {
            dev.write32(regs::SIZE, s);
            assert_eq!(dev.read32(regs::SIZE), s);
        }
        for s in [11, 100, u32::MAX] {
            dev.write32(regs::SIZE, s);
            assert_eq!(dev.read32(regs::SIZE), 10);
        }
    }

    #[test]
    fn disabled_device_reads_zero_but_keeps_writes() {
        let mut dev = DeviceModel::default();
        dev.write32(regs::CONTROL, 0);
        dev.write32(MATR_A_START, 42);
        dev.write32(regs::SIZE, 7);
        assert_eq!(dev.read32(MATR_A_START), 0);
        assert_eq!(dev.read32(regs::SIZE), 0);
        assert_eq!(dev.read32(regs::ID), 0);

        dev.write32(regs::CONTROL, control::ENABLE);
        assert_eq!(dev.read32(MATR_A_START), 42);
        assert_eq!(dev.read32(regs::SIZE), 7);
    }

    #[test]
    fn reference_multiply_through_registers() {
        let mut dev = DeviceModel::default();
        let a = [1, 2, 4, 0, 0, 5, 7, 1, 1, 0, 5, 3, 1, 1, 0, 4];
        load(&mut dev, 4, &a, &[3, 1, 2, 4]);
        dev.write32(regs::CONTROL, control::ENABLE | control::START_OP);
        assert_eq!(result(&mut dev, 4), vec![13, 23, 25, 20]);
        assert_eq!(dev.state(), State::Ended);
    }

    #[test]
    fn matrix_c_is_read_only() {
        let mut dev = DeviceModel::default();
        dev.write32(MATR_C_START, 5);
        assert_eq!(dev.read32(MATR_C_START), 0);
    }

    #[test]
    fn reset_stat_without_prior_operation() {
        let mut dev = DeviceModel::default();
        dev.write32(regs::CONTROL, control::ENABLE | control::RESET_STAT);
        assert_eq!(dev.read32(regs::STATUS), 0);
        assert!(!dev.irq_asserted());
    }

    #[test]
    fn combined_start_and_reset_runs_only_start() {
        let mut dev = DeviceModel::default();
        dev.write32(
            regs::CONTROL,
            control::ENABLE | control::IRQ_ENABLE | control::START_OP | control::RESET_STAT,
        );
        assert_eq!(dev.registers().status(), StatusFlags::all());
        assert!(dev.irq_asserted());
    }

    #[test]
    fn status_read_deasserts_line_once() {
        let mut dev = DeviceModel::default();
        dev.write32(regs::CONTROL, control::ENABLE | control::IRQ_ENABLE | control::START_OP);
        assert!(dev.irq_asserted());

        assert_eq!(dev.read32(regs::STATUS), 0x3);
        assert!(!dev.irq_asserted());
        assert_eq!(dev.read32(regs::STATUS), 0x3);
        assert!(!dev.irq_asserted());
        assert_eq!(dev.irq().assertions(), 1);
    }

    #[test]
    fn status_read_while_disabled_leaves_line() {
        let mut dev = DeviceModel::default();
        dev.write32(regs::CONTROL, control::IRQ_ENABLE | control::START_OP);
        assert!(dev.irq_asserted());
        assert_eq!(dev.read32(regs::STATUS), 0);
        assert!(dev.irq_asserted());
    }

    #[test]
    fn access_size_is_ignored() {
        let mut dev = DeviceModel::default();
        dev.write(MATR_B_START + 4, 1, 0xAB);
        assert_eq!(dev.read(MATR_B_START + 4, 2), 0xAB);
    }

    #[test]
    fn invalid_offsets_read_sentinel_and_drop_writes() {
        let mut dev = DeviceModel::default();
        dev.write32(0x404, 1);
        dev.write32(0x201, 1);
        assert_eq!(dev.read32(0x404), regs::INVALID_READ);
        assert_eq!(dev.read32(0x201), regs::INVALID_READ);
        assert_eq!(dev.registers().matrix_b()[0], 0);
    }

    #[test]
    fn reset_restores_power_on_state() {
        let mut dev = DeviceModel::default();
        load(&mut dev, 2, &[1, 1, 1, 1], &[1, 1]);
        dev.write32(regs::CONTROL, control::ENABLE | control::IRQ_ENABLE | control::START_OP);
        dev.reset();
        assert_eq!(dev.read32(regs::CONTROL), 0x01);
        assert_eq!(dev.read32(regs::SIZE), 3);
        assert_eq!(dev.read32(regs::STATUS), 0);
        assert_eq!(dev.read32(MATR_C_START), 0);
        assert!(!dev.irq_asserted());
    }
}
