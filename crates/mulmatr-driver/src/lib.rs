//! Emulated mulmatr matrix-vector accelerator and its host access layer.
//!
//! The device multiplies an `n × n` matrix A by an `n` vector B into an
//! `n` vector C (`n ≤ 10`, wrapping 32-bit arithmetic), driven entirely
//! through a 0x500-byte register window.
//!
//! # Layers
//!
//! ```text
//! TextInterface / BinaryInterface / IrqHandler     host access
//!                  │
//!             RegisterBus                          one word per call
//!          ┌───────┴────────┐
//!   SharedDevice       MmioWindow
//!   (DeviceModel)      (mapped hardware)
//! ```
//!
//! # Quick start
//!
//! ```
//! use mulmatr_driver::{BinaryInterface, SharedDevice};
//!
//! # fn main() -> mulmatr_driver::Result<()> {
//! let dev = BinaryInterface::probe(SharedDevice::default())?;
//! let mut s = dev.open()?;
//! s.write_size(2)?;
//! s.write_matrix_a(&[1, 2, 3, 4])?;
//! s.write_matrix_b(&[1, 1])?;
//! s.start_op()?;
//! assert_eq!(s.read_matrix_c()?, vec![3, 7]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod access;
mod bus;
mod config;
pub mod emu;
mod error;

pub use access::{
    Attribute, BinaryInterface, Command, IrqHandler, IrqOutcome, MmioWindow, Session,
    TextInterface,
};
pub use bus::{BusType, RegisterBus, SharedDevice};
pub use config::DeviceConfig;
pub use emu::{ControlFlags, DeviceModel, State, StatusFlags};
pub use error::{MulmatrError, Result};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Attribute, BinaryInterface, Command, DeviceConfig, DeviceModel, MmioWindow,
        MulmatrError, RegisterBus, Result, SharedDevice, StatusFlags, TextInterface,
    };
}
