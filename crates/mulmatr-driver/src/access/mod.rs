//! Host access layer
//!
//! Everything here talks to the device through a [`RegisterBus`](crate::RegisterBus):
//!
//! ```text
//! TextInterface    attribute-per-register text protocol (no open gate)
//! BinaryInterface  raw-buffer command catalog, one Session at a time
//! IrqHandler       acknowledge-and-log interrupt service
//! MmioWindow       RegisterBus over a mapped register window
//! ```

pub mod ioctl;
pub mod irq;
pub mod mmio;
pub mod text;

pub use ioctl::{BinaryInterface, Command, Session};
pub use irq::{IrqHandler, IrqOutcome};
pub use mmio::MmioWindow;
pub use text::{Attribute, TextInterface};
