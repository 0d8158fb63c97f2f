//! Register map for the mulmatr accelerator.
//!
//! The device exposes a 0x500-byte window, accessed as aligned 32-bit
//! words. Matrix windows are half-open ranges `[START, END)`.
//!
//! ```text
//! Offset        Name      Access
//! ───────────── ───────── ──────
//! 0x000-0x18C   MatrixA   RW      n² cells, n ≤ 10
//! 0x200-0x224   MatrixB   RW      n cells
//! 0x300-0x324   MatrixC   RO      n cells
//! 0x400         Control   RW
//! 0x410         Size      RW      clamped to [0, 10]
//! 0x420         Status    RO      read deasserts IRQ
//! 0x430         Id        RO      0xC1A0
//! ```

// ── Geometry ─────────────────────────────────────────────────────────────────

/// Largest supported matrix dimension.
pub const MAX_SIZE: usize = 10;

/// Cell capacity of the square matrix (`MAX_SIZE²`).
pub const MAX_SIZE_QUAD: usize = MAX_SIZE * MAX_SIZE;

/// Width of one register in bytes.
pub const WORD_BYTES: usize = 4;

/// Size of the whole register window in bytes.
pub const WINDOW_SIZE: usize = 0x500;

// ── Matrix windows ───────────────────────────────────────────────────────────

/// First byte of matrix A.
pub const MATR_A_START: usize = 0x000;
/// One past the last byte of matrix A (`0x000 + 100 * 4`).
pub const MATR_A_END: usize = MATR_A_START + MAX_SIZE_QUAD * WORD_BYTES;

/// First byte of matrix B.
pub const MATR_B_START: usize = 0x200;
/// One past the last byte of matrix B (`0x200 + 10 * 4`).
pub const MATR_B_END: usize = MATR_B_START + MAX_SIZE * WORD_BYTES;

/// First byte of matrix C.
pub const MATR_C_START: usize = 0x300;
/// One past the last byte of matrix C (`0x300 + 10 * 4`).
pub const MATR_C_END: usize = MATR_C_START + MAX_SIZE * WORD_BYTES;

// ── Scalar registers ─────────────────────────────────────────────────────────

/// Control register.
pub const CONTROL: usize = 0x400;
/// Matrix size register.
pub const SIZE: usize = 0x410;
/// Status register.
pub const STATUS: usize = 0x420;
/// Chip identification register.
pub const ID: usize = 0x430;

// ── Fixed values ─────────────────────────────────────────────────────────────

/// Value held by the id register.
pub const CHIP_ID: u32 = 0xC1A0;

/// Returned for reads of unmapped or misaligned offsets.
pub const INVALID_READ: u32 = 0xA0E0_A0E0;

/// Control word at power-on and written by the host on attach (ENABLE).
pub const DEFAULT_CONTROL: u32 = control::ENABLE;

/// Matrix size at power-on.
pub const DEFAULT_SIZE: u32 = 3;

// ── Control register bit definitions ─────────────────────────────────────────

pub mod control {
    //! Control word bits. START_OP and RESET_STAT are commands; they are
    //! latched in the register like the others and cleared only by the host.

    /// Gate register reads; clear makes every read return 0.
    pub const ENABLE: u32 = 1 << 0;
    /// Assert the interrupt line when a multiply completes.
    pub const IRQ_ENABLE: u32 = 1 << 1;
    /// Run the multiply.
    pub const START_OP: u32 = 1 << 2;
    /// Clear status and deassert the interrupt line.
    pub const RESET_STAT: u32 = 1 << 3;
}

// ── Status register bit definitions ──────────────────────────────────────────

pub mod status {
    //! Status word bits.

    /// A multiply was started.
    pub const OP_STARTED: u32 = 1 << 0;
    /// A multiply finished and matrix C holds its result.
    pub const OP_ENDED: u32 = 1 << 1;
}

/// Clamp a requested matrix size to the supported range.
#[must_use]
pub const fn clamp_size(requested: u32) -> u32 {
    if requested as usize > MAX_SIZE {
        MAX_SIZE as u32
    } else {
        requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_match_register_map() {
        assert_eq!(MATR_A_END, 0x190);
        assert_eq!(MATR_B_END, 0x228);
        assert_eq!(MATR_C_END, 0x328);
        assert!(MATR_A_END <= MATR_B_START);
        assert!(MATR_B_END <= MATR_C_START);
        assert!(MATR_C_END <= CONTROL);
        assert!(ID + WORD_BYTES <= WINDOW_SIZE);
    }

    #[test]
    fn scalar_registers_are_word_aligned() {
        for reg in [CONTROL, SIZE, STATUS, ID] {
            assert_eq!(reg % WORD_BYTES, 0, "{reg:#x} misaligned");
        }
    }

    #[test]
    fn clamp_size_saturates_at_max() {
        assert_eq!(clamp_size(0), 0);
        assert_eq!(clamp_size(10), 10);
        assert_eq!(clamp_size(11), 10);
        assert_eq!(clamp_size(u32::MAX), 10);
    }
}
