//! Text attribute interface
//!
//! One endpoint per register, each read and written as text:
//!
//! | Attribute | Access | Show format |
//! |-----------|--------|-------------|
//! | `control`, `size` | RW | `0x<hex>\n` |
//! | `status`, `id` | RO | `0x<hex>\n` |
//! | `matrA` | RW | `n` rows of `n` comma-separated tokens, each row `\n`-terminated |
//! | `matrB` | RW | `n` comma-separated tokens, `\n`-terminated |
//! | `matrC` | RO | as `matrB` |
//!
//! Stores accept integer literals in their own base (`0x` hex, leading `0`
//! octal, otherwise decimal). `matrA` accepts commas and newlines as
//! separators; `matrB` accepts commas only. Every token is parsed before
//! any register is written, so a rejected store leaves the device untouched.

use std::fmt::Write as _;
use std::str::FromStr;

use mulmatr_chip::regs::{self, WORD_BYTES};
use tracing::{debug, info, warn};

use crate::bus::RegisterBus;
use crate::error::{MulmatrError, Result};

/// Text endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Control register
    Control,
    /// Size register
    Size,
    /// Status register
    Status,
    /// Id register
    Id,
    /// Matrix A
    MatrA,
    /// Matrix B
    MatrB,
    /// Matrix C
    MatrC,
}

impl Attribute {
    /// Every attribute, in registration order.
    pub const ALL: [Self; 7] = [
        Self::Control,
        Self::Size,
        Self::Status,
        Self::Id,
        Self::MatrA,
        Self::MatrB,
        Self::MatrC,
    ];

    /// Endpoint name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Size => "size",
            Self::Status => "status",
            Self::Id => "id",
            Self::MatrA => "matrA",
            Self::MatrB => "matrB",
            Self::MatrC => "matrC",
        }
    }

    /// Whether the endpoint accepts stores.
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::Control | Self::Size | Self::MatrA | Self::MatrB)
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = MulmatrError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| MulmatrError::invalid_input(format!("no attribute named '{s}'")))
    }
}

/// Text interface bound to one device
#[derive(Debug)]
pub struct TextInterface<B> {
    bus: B,
}

impl<B: RegisterBus> TextInterface<B> {
    /// Attach to the device and write the default control word.
    ///
    /// # Errors
    ///
    /// Returns error if the control register cannot be written.
    pub fn probe(bus: B) -> Result<Self> {
        bus.write32(regs::CONTROL, regs::DEFAULT_CONTROL)?;
        info!("text interface attached ({} bus)", bus.bus_type());
        Ok(Self { bus })
    }

    /// Underlying bus.
    pub const fn bus(&self) -> &B {
        &self.bus
    }

    /// Render an attribute.
    ///
    /// # Errors
    ///
    /// Returns error if a register read fails.
    pub fn show(&self, attr: Attribute) -> Result<String> {
        debug!("show {attr}");
        match attr {
            Attribute::Control => self.show_word(regs::CONTROL),
            Attribute::Size => self.show_word(regs::SIZE),
            Attribute::Status => self.show_word(regs::STATUS),
            Attribute::Id => self.show_word(regs::ID),
            Attribute::MatrA => {
                let n = self.size()?;
                let cells = self.read_cells(regs::MATR_A_START, n * n)?;
                Ok(render_rows(&cells, n))
            }
            Attribute::MatrB => {
                let n = self.size()?;
                let cells = self.read_cells(regs::MATR_B_START, n)?;
                Ok(render_rows(&cells, n))
            }
            Attribute::MatrC => {
                let n = self.size()?;
                let cells = self.read_cells(regs::MATR_C_START, n)?;
                Ok(render_rows(&cells, n))
            }
        }
    }

    /// Store text into an attribute; returns the number of bytes consumed.
    ///
    /// Matrix stores take at most `n²` (matrA) or `n` (matrB) tokens and
    /// ignore any input past that.
    ///
    /// # Errors
    ///
    /// - [`MulmatrError::ReadOnly`] for `status`, `id`, `matrC`
    /// - [`MulmatrError::InvalidInput`] if any consumed token is not an integer
    pub fn store(&self, attr: Attribute, input: &str) -> Result<usize> {
        debug!("store {attr}: {:?}", input);
        match attr {
            Attribute::Control => {
                let value = parse_literal(input).inspect_err(|e| warn!("control: {e}"))?;
                self.bus.write32(regs::CONTROL, value)?;
            }
            Attribute::Size => {
                let requested = parse_literal(input).inspect_err(|e| warn!("size: {e}"))?;
                let size = regs::clamp_size(requested);
                if size != requested {
                    warn!("size {requested} clamped to {size}");
                }
                self.bus.write32(regs::SIZE, size)?;
            }
            Attribute::MatrA => {
                let n = self.size()?;
                let flattened = input.replace('\n', ",");
                let values = parse_values(&flattened, &[','], n * n)
                    .inspect_err(|e| warn!("matrA: {e}"))?;
                self.write_cells(regs::MATR_A_START, &values)?;
            }
            Attribute::MatrB => {
                let n = self.size()?;
                let values =
                    parse_values(input, &[','], n).inspect_err(|e| warn!("matrB: {e}"))?;
                self.write_cells(regs::MATR_B_START, &values)?;
            }
            Attribute::Status | Attribute::Id | Attribute::MatrC => {
                return Err(MulmatrError::ReadOnly {
                    attribute: attr.name(),
                })
            }
        }
        Ok(input.len())
    }

    fn show_word(&self, offset: usize) -> Result<String> {
        Ok(format!("{}\n", format_word(self.bus.read32(offset)?)))
    }

    fn size(&self) -> Result<usize> {
        Ok(regs::clamp_size(self.bus.read32(regs::SIZE)?) as usize)
    }

    fn read_cells(&self, base: usize, count: usize) -> Result<Vec<u32>> {
        (0..count)
            .map(|i| self.bus.read32(base + i * WORD_BYTES))
            .collect()
    }

    fn write_cells(&self, base: usize, values: &[u32]) -> Result<()> {
        for (i, &v) in values.iter().enumerate() {
            self.bus.write32(base + i * WORD_BYTES, v)?;
        }
        debug!("stored {} cells at {base:#x}", values.len());
        Ok(())
    }
}

/// Render one register value as a `0x`-prefixed lowercase hex token.
pub fn format_word(value: u32) -> String {
    format!("0x{value:x}")
}

/// Lay out `cells` as comma-separated rows of `row_len`, each ending in `\n`.
fn render_rows(cells: &[u32], row_len: usize) -> String {
    let mut out = String::with_capacity(cells.len() * 11);
    for (i, &cell) in cells.iter().enumerate() {
        let sep = if (i + 1) % row_len == 0 { '\n' } else { ',' };
        let _ = write!(out, "{}{sep}", format_word(cell));
    }
    out
}

/// Parse one integer literal, allowing a single trailing newline.
///
/// Base follows the prefix: `0x`/`0X` hex, leading `0` octal, else decimal.
///
/// # Errors
///
/// Returns [`MulmatrError::InvalidInput`] for empty, signed, malformed or
/// out-of-range (above `u32::MAX`) literals.
pub fn parse_literal(token: &str) -> Result<u32> {
    let literal = token.strip_suffix('\n').unwrap_or(token);
    let (digits, radix) = if let Some(hex) = literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
    {
        (hex, 16)
    } else if literal.len() > 1 && literal.starts_with('0') {
        (&literal[1..], 8)
    } else {
        (literal, 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(MulmatrError::invalid_input(format!(
            "'{}' is not an integer",
            literal.escape_debug()
        )));
    }
    u32::from_str_radix(digits, radix)
        .map_err(|e| MulmatrError::invalid_input(format!("'{literal}': {e}")))
}

/// Parse up to `max` integers separated by any of `delims`.
///
/// Stops after `max` tokens or at end of input. Trailing separators are
/// ignored; an empty token anywhere else is invalid. With `max == 0`
/// nothing is consumed and any input is accepted.
///
/// # Errors
///
/// Returns [`MulmatrError::InvalidInput`] for input with no tokens, or on
/// the first token that fails to parse; nothing is returned for the tokens
/// before it.
pub fn parse_values(input: &str, delims: &[char], max: usize) -> Result<Vec<u32>> {
    if max == 0 {
        return Ok(Vec::new());
    }
    let body = input.trim_end_matches(delims);
    if body.is_empty() {
        return Err(MulmatrError::invalid_input("no values given"));
    }
    body.split(delims).take(max).map(parse_literal).collect()
}
