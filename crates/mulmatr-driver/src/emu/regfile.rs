//! Register file and address decode
//!
//! Holds every persistent register and the three matrix buffers. The
//! buffers are fixed capacity; resizing never clears them, so cells beyond
//! the current size keep stale values.

use mulmatr_chip::regs::{self, MAX_SIZE, MAX_SIZE_QUAD, WORD_BYTES};

use super::control::{ControlFlags, StatusFlags};

/// Decoded register target for a byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Cell of matrix A (row-major index)
    MatrixA(usize),
    /// Cell of matrix B
    MatrixB(usize),
    /// Cell of matrix C
    MatrixC(usize),
    /// Control register
    Control,
    /// Size register
    Size,
    /// Status register
    Status,
    /// Id register
    Id,
    /// Unmapped or misaligned offset
    Invalid,
}

impl Target {
    /// Decode a byte offset.
    ///
    /// Offsets must be word aligned; anything outside the matrix windows
    /// and the four scalar registers decodes to [`Target::Invalid`].
    pub const fn decode(offset: usize) -> Self {
        if offset % WORD_BYTES != 0 {
            return Self::Invalid;
        }
        match offset {
            o if o >= regs::MATR_A_START && o < regs::MATR_A_END => {
                Self::MatrixA((o - regs::MATR_A_START) / WORD_BYTES)
            }
            o if o >= regs::MATR_B_START && o < regs::MATR_B_END => {
                Self::MatrixB((o - regs::MATR_B_START) / WORD_BYTES)
            }
            o if o >= regs::MATR_C_START && o < regs::MATR_C_END => {
                Self::MatrixC((o - regs::MATR_C_START) / WORD_BYTES)
            }
            regs::CONTROL => Self::Control,
            regs::SIZE => Self::Size,
            regs::STATUS => Self::Status,
            regs::ID => Self::Id,
            _ => Self::Invalid,
        }
    }

    /// Whether host writes to this target are dropped.
    pub const fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::MatrixC(_) | Self::Status | Self::Id | Self::Invalid
        )
    }
}

/// Persistent device registers and matrix storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    matr_a: [i32; MAX_SIZE_QUAD],
    matr_b: [i32; MAX_SIZE],
    matr_c: [i32; MAX_SIZE],
    control: u32,
    size: u32,
    status: u32,
    id: u32,
}

impl RegisterFile {
    /// Create a register file with zeroed buffers and the given scalars.
    pub fn new(control: u32, size: u32, id: u32) -> Self {
        Self {
            matr_a: [0; MAX_SIZE_QUAD],
            matr_b: [0; MAX_SIZE],
            matr_c: [0; MAX_SIZE],
            control,
            size: regs::clamp_size(size),
            status: 0,
            id,
        }
    }

    /// Read a target as the bus would see it.
    ///
    /// A disabled device reads 0 everywhere, including unmapped offsets.
    /// Otherwise [`Target::Invalid`] reads the [`regs::INVALID_READ`]
    /// sentinel, as does a matrix index past the buffer. Matrix cells are
    /// returned as their two's-complement bits.
    #[allow(clippy::cast_sign_loss)]
    pub fn read(&self, target: Target) -> u32 {
        if !self.is_enabled() {
            return 0;
        }
        let cell = |buf: &[i32], i: usize| buf.get(i).map_or(regs::INVALID_READ, |&v| v as u32);
        match target {
            Target::MatrixA(i) => cell(&self.matr_a, i),
            Target::MatrixB(i) => cell(&self.matr_b, i),
            Target::MatrixC(i) => cell(&self.matr_c, i),
            Target::Control => self.control,
            Target::Size => self.size,
            Target::Status => self.status,
            Target::Id => self.id,
            Target::Invalid => regs::INVALID_READ,
        }
    }

    /// Store a value into a target.
    ///
    /// Matrix A/B cells store unconditionally, whatever the current size.
    /// Size is clamped. Control latches the raw word; command evaluation
    /// belongs to the control/status machine. Read-only and invalid
    /// targets, and matrix indices past the buffer, ignore the write.
    /// Returns whether anything was stored.
    #[allow(clippy::cast_possible_wrap)]
    pub fn write(&mut self, target: Target, value: u32) -> bool {
        let slot = match target {
            Target::MatrixA(i) => self.matr_a.get_mut(i),
            Target::MatrixB(i) => self.matr_b.get_mut(i),
            Target::Control => {
                self.control = value;
                return true;
            }
            Target::Size => {
                self.size = regs::clamp_size(value);
                return true;
            }
            Target::MatrixC(_) | Target::Status | Target::Id | Target::Invalid => None,
        };
        match slot {
            Some(cell) => {
                *cell = value as i32;
                true
            }
            None => false,
        }
    }

    /// ENABLE bit of the latched control word.
    pub const fn is_enabled(&self) -> bool {
        self.control & regs::control::ENABLE != 0
    }

    /// Latched control word.
    pub const fn control(&self) -> ControlFlags {
        ControlFlags::from_bits_retain(self.control)
    }

    /// Current matrix dimension `n` (never above `MAX_SIZE`).
    pub const fn size(&self) -> usize {
        self.size as usize
    }

    /// Status bits.
    pub const fn status(&self) -> StatusFlags {
        StatusFlags::from_bits_retain(self.status)
    }

    pub(crate) fn set_status(&mut self, status: StatusFlags) {
        self.status = status.bits();
    }

    /// Full matrix A buffer (100 cells, first `n²` populated).
    pub const fn matrix_a(&self) -> &[i32; MAX_SIZE_QUAD] {
        &self.matr_a
    }

    /// Full matrix B buffer (10 cells, first `n` populated).
    pub const fn matrix_b(&self) -> &[i32; MAX_SIZE] {
        &self.matr_b
    }

    /// Full matrix C buffer.
    pub const fn matrix_c(&self) -> &[i32; MAX_SIZE] {
        &self.matr_c
    }

    pub(crate) fn store_result(&mut self, result: &[i32]) {
        self.matr_c[..result.len()].copy_from_slice(result);
    }
}
