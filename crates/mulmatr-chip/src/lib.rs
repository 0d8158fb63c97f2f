//! Silicon model for the mulmatr matrix-vector accelerator.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the device as seen from the bus: register offsets, the
//! three matrix windows, control/status bit positions and power-on values.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Register map, window bounds, bit definitions, reset values |
//!
//! ```text
//! 0x000 ─┬─ MatrixA   100 × i32 (row-major, n² populated)
//! 0x190 ─┘
//! 0x200 ─┬─ MatrixB    10 × i32 (n populated)
//! 0x228 ─┘
//! 0x300 ─┬─ MatrixC    10 × i32 (result, read-only)
//! 0x328 ─┘
//! 0x400 ── Control   ENABLE | IRQ_ENABLE | START_OP | RESET_STAT
//! 0x410 ── Size      clamped to [0, 10]
//! 0x420 ── Status    OP_STARTED | OP_ENDED (read deasserts IRQ)
//! 0x430 ── Id        0xC1A0
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod regs;
