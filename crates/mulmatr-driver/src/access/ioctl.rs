//! Binary command interface
//!
//! A fixed catalog of commands exchanging raw native-endian 32-bit words
//! with the caller's buffer. Only one [`Session`] may be open at a time;
//! a second opener gets [`MulmatrError::ResourceBusy`] until the first
//! session is dropped.
//!
//! Transfer order follows the device side of a copy to/from user memory:
//! read commands sample the registers first and then fill the buffer,
//! write commands take the whole buffer first and then write registers.
//! A buffer too short for the transfer fails with
//! [`MulmatrError::TransferFailed`].

use std::sync::atomic::{AtomicBool, Ordering};

use mulmatr_chip::regs::{self, WORD_BYTES};
use tracing::{debug, info, warn};

use crate::bus::RegisterBus;
use crate::emu::control::{ControlFlags, StatusFlags};
use crate::error::{MulmatrError, Result};

/// Linux `_IOC` encoding with a pointer-sized payload on a 64-bit host.
const fn ioc(dir: u32, nr: u8) -> u32 {
    const TYPE: u32 = b'a' as u32;
    const PTR_SIZE: u32 = 8;
    (dir << 30) | (PTR_SIZE << 16) | (TYPE << 8) | nr as u32
}

const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

/// Binary command catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Read the id register (one word out)
    ReadId,
    /// Read the status register (one word out)
    ReadStatus,
    /// Set ENABLE
    Enable,
    /// Clear ENABLE
    Disable,
    /// Set IRQ_ENABLE
    EnableIrq,
    /// Clear IRQ_ENABLE
    DisableIrq,
    /// Run the multiply
    StartOp,
    /// Clear status and the interrupt line
    ResetStat,
    /// Read the size register (one word out)
    ReadSize,
    /// Write the size register (one word in)
    WriteSize,
    /// Read `n²` words of matrix A
    ReadMatrixA,
    /// Write `n²` words of matrix A
    WriteMatrixA,
    /// Read `n` words of matrix B
    ReadMatrixB,
    /// Write `n` words of matrix B
    WriteMatrixB,
    /// Read `n` words of matrix C
    ReadMatrixC,
}

impl Command {
    /// Every command, in opcode order.
    pub const ALL: [Self; 15] = [
        Self::ReadId,
        Self::ReadStatus,
        Self::Enable,
        Self::Disable,
        Self::EnableIrq,
        Self::DisableIrq,
        Self::StartOp,
        Self::ResetStat,
        Self::ReadSize,
        Self::WriteSize,
        Self::ReadMatrixA,
        Self::WriteMatrixA,
        Self::ReadMatrixB,
        Self::WriteMatrixB,
        Self::ReadMatrixC,
    ];

    /// Raw command number.
    pub const fn raw(self) -> u32 {
        match self {
            Self::ReadId => ioc(IOC_READ, b'b'),
            // Carries the write direction bit; host tooling matches on this number.
            Self::ReadStatus => ioc(IOC_WRITE, b'c'),
            Self::Enable => ioc(IOC_READ, b'd'),
            Self::Disable => ioc(IOC_READ, b'e'),
            Self::EnableIrq => ioc(IOC_READ, b'f'),
            Self::DisableIrq => ioc(IOC_READ, b'g'),
            Self::StartOp => ioc(IOC_READ, b'h'),
            Self::ResetStat => ioc(IOC_READ, b'i'),
            Self::ReadSize => ioc(IOC_READ, b'j'),
            Self::WriteSize => ioc(IOC_READ, b'k'),
            Self::ReadMatrixA => ioc(IOC_READ, b'l'),
            Self::WriteMatrixA => ioc(IOC_READ, b'm'),
            Self::ReadMatrixB => ioc(IOC_READ, b'n'),
            Self::WriteMatrixB => ioc(IOC_READ, b'o'),
            Self::ReadMatrixC => ioc(IOC_READ, b'p'),
        }
    }

    /// Look up a raw command number.
    ///
    /// # Errors
    ///
    /// Returns [`MulmatrError::UnknownCommand`] if `raw` is not in the catalog.
    pub fn from_raw(raw: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.raw() == raw)
            .ok_or(MulmatrError::UnknownCommand { raw })
    }

    /// Conventional command name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ReadId => "RD_ID",
            Self::ReadStatus => "RD_STATUS",
            Self::Enable => "CTRL_ENABLE_DEV",
            Self::Disable => "CTRL_DISABLE_DEV",
            Self::EnableIrq => "CTRL_ENABLE_IRQ",
            Self::DisableIrq => "CTRL_DISABLE_IRQ",
            Self::StartOp => "CTRL_START_OP",
            Self::ResetStat => "CTRL_RESET_STAT",
            Self::ReadSize => "RD_SIZE",
            Self::WriteSize => "WR_SIZE",
            Self::ReadMatrixA => "RD_MATRA",
            Self::WriteMatrixA => "WR_MATRA",
            Self::ReadMatrixB => "RD_MATRB",
            Self::WriteMatrixB => "WR_MATRB",
            Self::ReadMatrixC => "RD_MATRC",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Matrix buffer addressed by a transfer command
#[derive(Debug, Clone, Copy)]
enum Matrix {
    A,
    B,
    C,
}

impl Matrix {
    const fn base(self) -> usize {
        match self {
            Self::A => regs::MATR_A_START,
            Self::B => regs::MATR_B_START,
            Self::C => regs::MATR_C_START,
        }
    }

    const fn cells(self, n: usize) -> usize {
        match self {
            Self::A => n * n,
            Self::B | Self::C => n,
        }
    }
}

/// Binary interface bound to one device, with its exclusive-open gate
#[derive(Debug)]
pub struct BinaryInterface<B> {
    bus: B,
    open: AtomicBool,
}

impl<B: RegisterBus> BinaryInterface<B> {
    /// Attach to the device and write the default control word.
    ///
    /// # Errors
    ///
    /// Returns error if the control register cannot be written.
    pub fn probe(bus: B) -> Result<Self> {
        bus.write32(regs::CONTROL, regs::DEFAULT_CONTROL)?;
        info!("binary interface attached ({} bus)", bus.bus_type());
        Ok(Self {
            bus,
            open: AtomicBool::new(false),
        })
    }

    /// Open the exclusive session.
    ///
    /// # Errors
    ///
    /// Returns [`MulmatrError::ResourceBusy`] while another session is open.
    pub fn open(&self) -> Result<Session<'_, B>> {
        self.open
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| {
                warn!("open refused: session already held");
                MulmatrError::ResourceBusy
            })?;
        info!("session opened");
        Ok(Session { iface: self })
    }

    /// Whether a session is currently open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Underlying bus.
    pub const fn bus(&self) -> &B {
        &self.bus
    }
}

/// Exclusive session on a [`BinaryInterface`]; released on drop
#[derive(Debug)]
pub struct Session<'a, B: RegisterBus> {
    iface: &'a BinaryInterface<B>,
}

impl<B: RegisterBus> Drop for Session<'_, B> {
    fn drop(&mut self) {
        self.iface.open.store(false, Ordering::Release);
        info!("session released");
    }
}

impl<B: RegisterBus> Session<'_, B> {
    /// Dispatch a command against `buf`.
    ///
    /// Word commands use the first four bytes of `buf`; control commands
    /// ignore it; matrix commands use `n²` or `n` words, `n` being the
    /// current size.
    ///
    /// # Errors
    ///
    /// - [`MulmatrError::TransferFailed`] if `buf` is too short
    /// - any bus error
    pub fn ioctl(&mut self, cmd: Command, buf: &mut [u8]) -> Result<()> {
        debug!("ioctl {cmd} ({:#010x}), {} byte buffer", cmd.raw(), buf.len());
        match cmd {
            Command::ReadId => self.read_word(regs::ID, buf),
            Command::ReadStatus => self.read_word(regs::STATUS, buf),
            Command::ReadSize => self.read_word(regs::SIZE, buf),
            Command::Enable => self.update_control(ControlFlags::ENABLE, true),
            Command::Disable => self.update_control(ControlFlags::ENABLE, false),
            Command::EnableIrq => self.update_control(ControlFlags::IRQ_ENABLE, true),
            Command::DisableIrq => self.update_control(ControlFlags::IRQ_ENABLE, false),
            Command::StartOp => self.update_control(ControlFlags::START_OP, true),
            Command::ResetStat => self.update_control(ControlFlags::RESET_STAT, true),
            Command::WriteSize => {
                let requested = take_words(buf, 1)?[0];
                let size = regs::clamp_size(requested);
                if size != requested {
                    warn!("size {requested} clamped to {size}");
                }
                self.bus().write32(regs::SIZE, size)
            }
            Command::ReadMatrixA => self.read_matrix(Matrix::A, buf),
            Command::ReadMatrixB => self.read_matrix(Matrix::B, buf),
            Command::ReadMatrixC => self.read_matrix(Matrix::C, buf),
            Command::WriteMatrixA => self.write_matrix(Matrix::A, buf),
            Command::WriteMatrixB => self.write_matrix(Matrix::B, buf),
        }
    }

    /// Dispatch a raw command number.
    ///
    /// # Errors
    ///
    /// Returns [`MulmatrError::UnknownCommand`] for numbers outside the
    /// catalog, otherwise as [`Session::ioctl`].
    pub fn ioctl_raw(&mut self, raw: u32, buf: &mut [u8]) -> Result<()> {
        let cmd = Command::from_raw(raw).inspect_err(|_| warn!("unknown command {raw:#010x}"))?;
        self.ioctl(cmd, buf)
    }

    /// Device id.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn read_id(&mut self) -> Result<u32> {
        self.word_out(Command::ReadId)
    }

    /// Status bits.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn read_status(&mut self) -> Result<StatusFlags> {
        self.word_out(Command::ReadStatus)
            .map(StatusFlags::from_bits_retain)
    }

    /// Current matrix size.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn read_size(&mut self) -> Result<u32> {
        self.word_out(Command::ReadSize)
    }

    /// Set the matrix size (clamped to `MAX_SIZE`).
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn write_size(&mut self, size: u32) -> Result<()> {
        self.ioctl(Command::WriteSize, &mut size.to_ne_bytes())
    }

    /// Set ENABLE.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn enable(&mut self) -> Result<()> {
        self.ioctl(Command::Enable, &mut [])
    }

    /// Clear ENABLE.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn disable(&mut self) -> Result<()> {
        self.ioctl(Command::Disable, &mut [])
    }

    /// Set IRQ_ENABLE.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn enable_irq(&mut self) -> Result<()> {
        self.ioctl(Command::EnableIrq, &mut [])
    }

    /// Clear IRQ_ENABLE.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn disable_irq(&mut self) -> Result<()> {
        self.ioctl(Command::DisableIrq, &mut [])
    }

    /// Run the multiply.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn start_op(&mut self) -> Result<()> {
        self.ioctl(Command::StartOp, &mut [])
    }

    /// Clear status and the interrupt line.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn reset_status(&mut self) -> Result<()> {
        self.ioctl(Command::ResetStat, &mut [])
    }

    /// Matrix A, row-major with stride `n`.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn read_matrix_a(&mut self) -> Result<Vec<i32>> {
        self.matrix_out(Command::ReadMatrixA, Matrix::A)
    }

    /// Write matrix A; `values` must hold at least `n²` cells.
    ///
    /// # Errors
    ///
    /// Returns [`MulmatrError::TransferFailed`] if `values` is too short.
    pub fn write_matrix_a(&mut self, values: &[i32]) -> Result<()> {
        self.matrix_in(Command::WriteMatrixA, values)
    }

    /// Vector B.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn read_matrix_b(&mut self) -> Result<Vec<i32>> {
        self.matrix_out(Command::ReadMatrixB, Matrix::B)
    }

    /// Write vector B; `values` must hold at least `n` cells.
    ///
    /// # Errors
    ///
    /// Returns [`MulmatrError::TransferFailed`] if `values` is too short.
    pub fn write_matrix_b(&mut self, values: &[i32]) -> Result<()> {
        self.matrix_in(Command::WriteMatrixB, values)
    }

    /// Result vector C.
    ///
    /// # Errors
    ///
    /// Returns error on bus failure.
    pub fn read_matrix_c(&mut self) -> Result<Vec<i32>> {
        self.matrix_out(Command::ReadMatrixC, Matrix::C)
    }

    fn bus(&self) -> &B {
        &self.iface.bus
    }

    fn size(&self) -> Result<usize> {
        Ok(regs::clamp_size(self.bus().read32(regs::SIZE)?) as usize)
    }

    fn read_word(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let value = self.bus().read32(offset)?;
        put_words(buf, &[value])
    }

    /// Read Control, drop latched command bits, apply `flag`, write back.
    fn update_control(&self, flag: ControlFlags, set: bool) -> Result<()> {
        let mut control = ControlFlags::from_bits_retain(self.bus().read32(regs::CONTROL)?);
        control.remove(ControlFlags::COMMANDS);
        control.set(flag, set);
        self.bus().write32(regs::CONTROL, control.bits())?;
        debug!("control <- {:#x}", control.bits());
        Ok(())
    }

    fn read_matrix(&self, matrix: Matrix, buf: &mut [u8]) -> Result<()> {
        let count = matrix.cells(self.size()?);
        let words = (0..count)
            .map(|i| self.bus().read32(matrix.base() + i * WORD_BYTES))
            .collect::<Result<Vec<u32>>>()?;
        put_words(buf, &words)
    }

    fn write_matrix(&self, matrix: Matrix, buf: &[u8]) -> Result<()> {
        let count = matrix.cells(self.size()?);
        let words = take_words(buf, count)?;
        for (i, &w) in words.iter().enumerate() {
            self.bus().write32(matrix.base() + i * WORD_BYTES, w)?;
        }
        debug!("wrote {count} words at {:#x}", matrix.base());
        Ok(())
    }

    fn word_out(&mut self, cmd: Command) -> Result<u32> {
        let mut bytes = [0u8; WORD_BYTES];
        self.ioctl(cmd, &mut bytes)?;
        Ok(u32::from_ne_bytes(bytes))
    }

    fn matrix_out(&mut self, cmd: Command, matrix: Matrix) -> Result<Vec<i32>> {
        let mut bytes = vec![0u8; matrix.cells(regs::MAX_SIZE) * WORD_BYTES];
        let count = matrix.cells(self.size()?);
        self.ioctl(cmd, &mut bytes)?;
        bytes.truncate(count * WORD_BYTES);
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    fn matrix_in(&mut self, cmd: Command, values: &[i32]) -> Result<()> {
        let mut bytes = bytemuck::cast_slice::<i32, u8>(values).to_vec();
        self.ioctl(cmd, &mut bytes)
    }
}

/// Copy `words` into the head of `buf`.
fn put_words(buf: &mut [u8], words: &[u32]) -> Result<()> {
    let src: &[u8] = bytemuck::cast_slice(words);
    let have = buf.len();
    let dst = buf.get_mut(..src.len()).ok_or_else(|| {
        MulmatrError::transfer_failed(format!(
            "buffer holds {have} bytes, transfer needs {}",
            src.len()
        ))
    })?;
    dst.copy_from_slice(src);
    Ok(())
}

/// Take `count` words from the head of `buf`.
fn take_words(buf: &[u8], count: usize) -> Result<Vec<u32>> {
    let len = count * WORD_BYTES;
    let src = buf.get(..len).ok_or_else(|| {
        MulmatrError::transfer_failed(format!(
            "buffer holds {} bytes, transfer needs {len}",
            buf.len()
        ))
    })?;
    Ok(bytemuck::pod_collect_to_vec(src))
}
