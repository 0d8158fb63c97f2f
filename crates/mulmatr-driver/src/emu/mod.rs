//! Emulated mulmatr device
//!
//! Register-level behaviour of the accelerator, composed bottom-up:
//!
//! ```text
//! DeviceModel ── decode/dispatch of (offset, size) accesses
//!  ├─ RegisterFile          scalar registers + matrix buffers
//!  ├─ ControlStatusMachine  control writes → commands → status/IRQ
//!  │   └─ MultiplyEngine    n×n · n → n, wrapping i32
//!  └─ IrqLine               asserted on completion, cleared by Status read / RESET_STAT
//! ```

pub mod control;
pub mod device;
pub mod engine;
pub mod irq;
pub mod regfile;

pub use control::{ControlCommand, ControlFlags, ControlStatusMachine, State, StatusFlags};
pub use device::DeviceModel;
pub use engine::MultiplyEngine;
pub use irq::IrqLine;
pub use regfile::{RegisterFile, Target};
