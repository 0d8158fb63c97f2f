//! Power-on configuration for the emulated device

use mulmatr_chip::regs;

/// Register values the emulated device comes up with
///
/// Defaults match the silicon: control `0x01` (enabled), size 3,
/// id `0xC1A0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Control word at power-on
    pub control: u32,
    /// Matrix size at power-on, always within `[0, MAX_SIZE]`
    pub size: u32,
    /// Value exposed by the id register
    pub chip_id: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            control: regs::DEFAULT_CONTROL,
            size: regs::DEFAULT_SIZE,
            chip_id: regs::CHIP_ID,
        }
    }
}

impl DeviceConfig {
    /// Set the power-on control word.
    #[must_use]
    pub const fn with_control(mut self, control: u32) -> Self {
        self.control = control;
        self
    }

    /// Set the power-on matrix size (clamped to `MAX_SIZE`).
    #[must_use]
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = regs::clamp_size(size);
        self
    }

    /// Override the id register value.
    #[must_use]
    pub const fn with_chip_id(mut self, chip_id: u32) -> Self {
        self.chip_id = chip_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_silicon() {
        let cfg = DeviceConfig::default();
        assert_eq!(cfg.control, 0x01);
        assert_eq!(cfg.size, 3);
        assert_eq!(cfg.chip_id, 0xC1A0);
    }

    #[test]
    fn oversized_power_on_size_is_clamped() {
        let cfg = DeviceConfig::default().with_size(42);
        assert_eq!(cfg.size, 10);
    }
}
