//! Register bus abstraction
//!
//! Both host access layers talk to the device only through [`RegisterBus`]:
//! one 32-bit word per call. Each call is atomic on its own; sequences of
//! calls from different callers may interleave.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mulmatr_chip::regs;

use crate::emu::DeviceModel;
use crate::error::Result;

/// Word-addressed access to the device register window
pub trait RegisterBus: Debug + Send + Sync {
    /// Read the 32-bit register at byte `offset`.
    ///
    /// # Errors
    ///
    /// Returns error if the bus cannot reach `offset`.
    fn read32(&self, offset: usize) -> Result<u32>;

    /// Write the 32-bit register at byte `offset`.
    ///
    /// # Errors
    ///
    /// Returns error if the bus cannot reach `offset`.
    fn write32(&self, offset: usize, value: u32) -> Result<()>;

    /// Level of the device interrupt line, where the bus can observe it.
    fn irq_pending(&self) -> bool {
        false
    }

    /// Bus type for diagnostics
    fn bus_type(&self) -> BusType;
}

/// Bus type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    /// In-process emulated device
    Emulated,

    /// Memory-mapped register window
    Mmio,
}

impl std::fmt::Display for BusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Emulated => write!(f, "Emulated"),
            Self::Mmio => write!(f, "MMIO"),
        }
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for Box<T> {
    fn read32(&self, offset: usize) -> Result<u32> {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) -> Result<()> {
        (**self).write32(offset, value)
    }

    fn irq_pending(&self) -> bool {
        (**self).irq_pending()
    }

    fn bus_type(&self) -> BusType {
        (**self).bus_type()
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for Arc<T> {
    fn read32(&self, offset: usize) -> Result<u32> {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) -> Result<()> {
        (**self).write32(offset, value)
    }

    fn irq_pending(&self) -> bool {
        (**self).irq_pending()
    }

    fn bus_type(&self) -> BusType {
        (**self).bus_type()
    }
}

/// Handle to one emulated device shared between access layers
///
/// Clones refer to the same device. The lock is held for a single register
/// access only.
#[derive(Debug, Clone, Default)]
pub struct SharedDevice {
    inner: Arc<Mutex<DeviceModel>>,
}

impl SharedDevice {
    /// Wrap a device model.
    pub fn new(device: DeviceModel) -> Self {
        Self {
            inner: Arc::new(Mutex::new(device)),
        }
    }

    /// Run `f` with exclusive access to the device model.
    pub fn with_device<R>(&self, f: impl FnOnce(&mut DeviceModel) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, DeviceModel> {
        // Every access completes under the lock, so a poisoned guard is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RegisterBus for SharedDevice {
    fn read32(&self, offset: usize) -> Result<u32> {
        Ok(self.lock().read(offset, regs::WORD_BYTES))
    }

    fn write32(&self, offset: usize, value: u32) -> Result<()> {
        self.lock().write(offset, regs::WORD_BYTES, value);
        Ok(())
    }

    fn irq_pending(&self) -> bool {
        self.lock().irq_asserted()
    }

    fn bus_type(&self) -> BusType {
        BusType::Emulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_device() {
        let a = SharedDevice::default();
        let b = a.clone();
        a.write32(regs::SIZE, 6).unwrap();
        assert_eq!(b.read32(regs::SIZE).unwrap(), 6);
    }

    #[test]
    fn boxed_bus_forwards() {
        let dev = SharedDevice::default();
        let bus: Box<dyn RegisterBus> = Box::new(dev.clone());
        bus.write32(regs::CONTROL, 0x7).unwrap();
        assert!(bus.irq_pending());
        assert_eq!(bus.bus_type(), BusType::Emulated);
        assert_eq!(dev.read32(regs::STATUS).unwrap(), 0x3);
        assert!(!bus.irq_pending());
    }
}
