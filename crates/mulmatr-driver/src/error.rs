//! Error types for mulmatr driver operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mulmatr operations
pub type Result<T> = std::result::Result<T, MulmatrError>;

/// Errors that can occur while accessing the device
///
/// None of these are fatal to the device: registers keep whatever state the
/// failed operation had already produced and the device stays usable.
#[derive(Debug, Error)]
pub enum MulmatrError {
    /// Malformed numeric token or non-numeric text
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// What was rejected
        reason: String,
    },

    /// Store attempted on a read-only attribute
    #[error("Attribute '{attribute}' is read-only")]
    ReadOnly {
        /// Attribute name
        attribute: &'static str,
    },

    /// A binary session is already open
    #[error("Device busy: a session is already open")]
    ResourceBusy,

    /// Copy between caller buffer and device failed
    #[error("Transfer failed: {reason}")]
    TransferFailed {
        /// Reason for failure
        reason: String,
    },

    /// Binary command number not in the catalog
    #[error("Unknown command {raw:#010x}")]
    UnknownCommand {
        /// Raw command number
        raw: u32,
    },

    /// Access outside a mapped register window
    #[error("Invalid register address {offset:#x}")]
    AddressInvalid {
        /// Byte offset that was rejected
        offset: usize,
    },

    /// Register window backing file not found
    #[error("Device not found: {path}")]
    DeviceNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// I/O error while opening or mapping a register window
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl MulmatrError {
    /// Create an invalid input error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create a transfer failed error
    pub fn transfer_failed(reason: impl Into<String>) -> Self {
        Self::TransferFailed {
            reason: reason.into(),
        }
    }

    /// Create a device not found error
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }
}
