//! `mulmatr`: host tool for the mulmatr matrix-vector accelerator.
//!
//! ```text
//! USAGE:
//!   mulmatr text-flow  [--size N] [-a FILE] [-b FILE]   Attribute-protocol test flow
//!   mulmatr ioctl-flow [--size N] [-a FILE] [-b FILE]   Binary-command test flow
//!   mulmatr show <attr>                                 Render one attribute
//!   mulmatr store <attr> <text>                         Store text into an attribute
//!   mulmatr peek <offset>                               Read one register word
//!   mulmatr poke <offset> <value>                       Write one register word
//! ```
//!
//! Without `--device` every command runs against a fresh in-process
//! emulated device; with it, against a mapped register window.

use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use mulmatr_chip::regs;
use mulmatr_driver::access::text::{format_word, parse_literal};
use mulmatr_driver::{
    Attribute, BinaryInterface, IrqHandler, MmioWindow, RegisterBus, SharedDevice, TextInterface,
};
use tracing_subscriber::EnvFilter;

/// Matrix A of the built-in example, row-major.
const EXAMPLE_A: [i32; 16] = [1, 2, 4, 0, 0, 5, 7, 1, 1, 0, 5, 3, 1, 1, 0, 4];
/// Vector B of the built-in example.
const EXAMPLE_B: [i32; 4] = [3, 1, 2, 4];

#[derive(Parser)]
#[command(name = "mulmatr", about = "mulmatr accelerator host tool", version)]
struct Cli {
    /// Register window to map (UIO node or PCI resource file) instead of the emulator.
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Log filter (overrides RUST_LOG), e.g. `mulmatr_driver=debug`.
    #[arg(long, global = true)]
    log: Option<String>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the attribute-protocol test flow.
    TextFlow(MatrixArgs),
    /// Run the binary-command test flow.
    IoctlFlow(MatrixArgs),
    /// Render one attribute.
    Show {
        /// control, size, status, id, matrA, matrB or matrC.
        attr: Attribute,
    },
    /// Store text into an attribute.
    Store {
        /// control, size, matrA or matrB.
        attr: Attribute,
        /// Text as written to the attribute, e.g. "0x1,0x2,0x3".
        text: String,
    },
    /// Read one register word.
    Peek {
        /// Byte offset (decimal, 0x hex or 0 octal).
        #[arg(value_parser = parse_offset)]
        offset: usize,
    },
    /// Write one register word.
    Poke {
        /// Byte offset (decimal, 0x hex or 0 octal).
        #[arg(value_parser = parse_offset)]
        offset: usize,
        /// Value (decimal, 0x hex or 0 octal).
        #[arg(value_parser = parse_literal)]
        value: u32,
    },
}

#[derive(Args)]
struct MatrixArgs {
    /// Matrix size n; inferred from matrix B when omitted.
    #[arg(short, long)]
    size: Option<u32>,

    /// File with n² whitespace-separated integers for matrix A.
    #[arg(short = 'a', long, requires = "matrix_b")]
    matrix_a: Option<PathBuf>,

    /// File with n whitespace-separated integers for vector B.
    #[arg(short = 'b', long, requires = "matrix_a")]
    matrix_b: Option<PathBuf>,
}

/// Operands for one multiply
struct Operands {
    n: usize,
    a: Vec<i32>,
    b: Vec<i32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref(), cli.verbose);

    tracing::debug!(device = ?cli.device, "opening register bus");
    let bus = open_bus(cli.device.as_deref())?;

    match cli.command {
        Cmd::TextFlow(args) => cmd_text_flow(bus, &args.load()?)?,
        Cmd::IoctlFlow(args) => cmd_ioctl_flow(bus, &args.load()?)?,
        Cmd::Show { attr } => {
            let text = TextInterface::probe(bus)?;
            print!("{}", text.show(attr)?);
        }
        Cmd::Store { attr, text: input } => {
            let text = TextInterface::probe(bus)?;
            let n = text.store(attr, &input)?;
            println!("{attr}: stored {n} bytes");
        }
        Cmd::Peek { offset } => println!("{offset:#05x} = {}", format_word(bus.read32(offset)?)),
        Cmd::Poke { offset, value } => {
            bus.write32(offset, value)?;
            IrqHandler::service(&bus)?;
        }
    }

    Ok(())
}

fn init_logging(filter: Option<&str>, verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = match filter {
        Some(f) => EnvFilter::new(f),
        None if verbose > 0 => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
    };
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn open_bus(device: Option<&Path>) -> Result<Box<dyn RegisterBus>> {
    Ok(match device {
        Some(path) => Box::new(
            MmioWindow::open(path, regs::WINDOW_SIZE)
                .with_context(|| format!("Cannot map {}", path.display()))?,
        ),
        None => Box::new(SharedDevice::default()),
    })
}

fn parse_offset(s: &str) -> Result<usize, mulmatr_driver::MulmatrError> {
    parse_literal(s).map(|v| v as usize)
}

impl MatrixArgs {
    fn load(&self) -> Result<Operands> {
        let (a, b) = match (&self.matrix_a, &self.matrix_b) {
            (Some(a), Some(b)) => (read_matrix(a)?, read_matrix(b)?),
            _ => (EXAMPLE_A.to_vec(), EXAMPLE_B.to_vec()),
        };
        let n = match self.size {
            Some(s) => s as usize,
            None => b.len(),
        };
        ensure!(
            n <= regs::MAX_SIZE,
            "size {n} exceeds the device maximum of {}",
            regs::MAX_SIZE
        );
        if a.len() < n * n || b.len() < n {
            bail!(
                "size {n} needs {} cells of A and {n} of B, got {} and {}",
                n * n,
                a.len(),
                b.len()
            );
        }
        Ok(Operands { n, a, b })
    }
}

/// Read whitespace-separated integers from `path`.
fn read_matrix(path: &Path) -> Result<Vec<i32>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    text.split_whitespace()
        .map(|tok| {
            tok.parse::<i32>()
                .with_context(|| format!("{}: '{tok}' is not an integer", path.display()))
        })
        .collect()
}

/// Token the text attributes accept for a cell (two's-complement hex).
#[allow(clippy::cast_sign_loss)]
fn hex_token(v: i32) -> String {
    format_word(v as u32)
}

/// Lay out tokens as `n` comma-separated rows, each `\n`-terminated.
fn rows_text(tokens: &[String], n: usize) -> String {
    tokens
        .chunks(n.max(1))
        .take(n)
        .map(|row| row.join(",") + "\n")
        .collect()
}

fn decimal(cells: &[i32]) -> Vec<String> {
    cells.iter().map(i32::to_string).collect()
}

fn cmd_text_flow(bus: Box<dyn RegisterBus>, ops: &Operands) -> Result<()> {
    let n = ops.n;
    let text = TextInterface::probe(bus)?;

    println!("Device ID : {}", text.show(Attribute::Id)?.trim_end());

    text.store(Attribute::Size, &n.to_string())?;
    println!("Size      : {}", text.show(Attribute::Size)?.trim_end());

    let a: Vec<String> = ops.a[..n * n].iter().copied().map(hex_token).collect();
    let b: Vec<String> = ops.b[..n].iter().copied().map(hex_token).collect();
    text.store(Attribute::MatrA, &rows_text(&a, n))?;
    text.store(Attribute::MatrB, &b.join(","))?;
    println!("Matrix A  :\n{}", text.show(Attribute::MatrA)?);
    println!("Matrix B  : {}", text.show(Attribute::MatrB)?.trim_end());

    text.store(
        Attribute::Control,
        &format_word(regs::control::ENABLE | regs::control::START_OP),
    )?;
    println!("Status    : {}", text.show(Attribute::Status)?.trim_end());
    println!("Matrix C  : {}", text.show(Attribute::MatrC)?.trim_end());

    Ok(())
}

fn cmd_ioctl_flow(bus: Box<dyn RegisterBus>, ops: &Operands) -> Result<()> {
    let n = ops.n;
    let iface = BinaryInterface::probe(bus)?;
    let mut s = iface.open()?;

    println!("Device ID : {:#x}", s.read_id()?);
    s.enable()?;

    s.write_size(u32::try_from(n)?)?;
    println!("Size      : {}", s.read_size()?);

    s.write_matrix_a(&ops.a[..n * n])?;
    s.write_matrix_b(&ops.b[..n])?;
    print!("Matrix A  :\n{}", rows_text(&decimal(&s.read_matrix_a()?), n));
    println!("Matrix B  : {}", decimal(&s.read_matrix_b()?).join(","));

    println!("Status    : {:#x} (before start)", s.read_status()?.bits());
    s.start_op()?;
    println!("Status    : {:#x} (after start)", s.read_status()?.bits());

    println!("Matrix C  : {}", decimal(&s.read_matrix_c()?).join(","));

    s.reset_status()?;
    println!("Status    : {:#x} (after reset)", s.read_status()?.bits());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_operands_are_the_example() {
        let args = MatrixArgs {
            size: None,
            matrix_a: None,
            matrix_b: None,
        };
        let ops = args.load().unwrap();
        assert_eq!(ops.n, 4);
        assert_eq!(ops.a, EXAMPLE_A);
    }

    #[test]
    fn oversized_request_is_rejected() {
        let args = MatrixArgs {
            size: Some(11),
            matrix_a: None,
            matrix_b: None,
        };
        assert!(args.load().is_err());
    }

    #[test]
    fn rows_render_for_matr_a() {
        assert_eq!(rows_text(&decimal(&[1, 2, 3, 4]), 2), "1,2\n3,4\n");
        assert_eq!(rows_text(&[], 0), "");
        assert_eq!(hex_token(-1), "0xffffffff");
    }

    #[test]
    fn text_flow_stores_what_ioctl_reads() {
        let dev = SharedDevice::default();
        let ops = MatrixArgs {
            size: None,
            matrix_a: None,
            matrix_b: None,
        }
        .load()
        .unwrap();
        cmd_text_flow(Box::new(dev.clone()), &ops).unwrap();
        let iface = BinaryInterface::probe(dev).unwrap();
        assert_eq!(iface.open().unwrap().read_matrix_c().unwrap(), vec![13, 23, 25, 20]);
    }

    #[test]
    fn offsets_accept_hex() {
        assert_eq!(parse_offset("0x410").unwrap(), 0x410);
        assert!(parse_offset("reg").is_err());
    }
}
