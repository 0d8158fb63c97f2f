//! Memory-mapped register window
//!
//! Maps a file-backed view of the device registers (a UIO node, a PCI
//! `resourceN` file, or a plain file for testing) and exposes it as a
//! [`RegisterBus`]. The unsafe surface is the mapping itself and the
//! volatile word accesses; every access is bounds and alignment checked
//! first.

use std::fs::OpenOptions;
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use mulmatr_chip::regs::WORD_BYTES;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};

use crate::bus::{BusType, RegisterBus};
use crate::error::{MulmatrError, Result};

/// Mapped register window
#[derive(Debug)]
pub struct MmioWindow {
    ptr: NonNull<u8>,
    len: usize,
    path: PathBuf,
}

impl MmioWindow {
    /// Map `len` bytes of `path` read/write, shared with the device.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `path` does not exist
    /// - `len` is zero, or larger than a regular backing file
    /// - the file cannot be opened or mapped
    pub fn open(path: impl AsRef<Path>, len: usize) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MulmatrError::device_not_found(path));
        }
        if len == 0 {
            return Err(MulmatrError::invalid_input("window length is 0"));
        }

        tracing::debug!("Mapping register window: {}", path.display());

        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let meta = file.metadata()?;
        // Character devices report no length; only regular files can be short.
        if meta.is_file() && meta.len() < len as u64 {
            return Err(MulmatrError::invalid_input(format!(
                "{} holds {} bytes, window needs {len:#x}",
                path.display(),
                meta.len()
            )));
        }

        // SAFETY: mmap preconditions:
        // - fd is valid (opened above) and stays valid for the call
        // - len is non-zero (checked above)
        // - READ|WRITE matches the open mode, SHARED so stores reach the device
        // - offset 0 is page aligned
        // The mapping outlives the fd; it is released in Drop with the same len.
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                0,
            )
        }
        .map_err(std::io::Error::from)?;

        let ptr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| MulmatrError::transfer_failed("mmap returned a null mapping"))?;

        tracing::info!("Mapped {len:#x} bytes of {} at {ptr:p}", path.display());

        Ok(Self {
            ptr,
            len,
            path: path.to_path_buf(),
        })
    }

    /// Mapped length in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Always false; zero-length windows are rejected at open.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backing path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check(&self, offset: usize) -> Result<()> {
        let in_bounds = offset
            .checked_add(WORD_BYTES)
            .is_some_and(|end| end <= self.len);
        if in_bounds && offset % WORD_BYTES == 0 {
            Ok(())
        } else {
            tracing::warn!("rejected access at {offset:#x} (window {:#x})", self.len);
            Err(MulmatrError::AddressInvalid { offset })
        }
    }
}

impl RegisterBus for MmioWindow {
    fn read32(&self, offset: usize) -> Result<u32> {
        self.check(offset)?;

        // SAFETY: offset + 4 <= len and offset is word aligned (checked
        // above); the page-aligned base keeps the u32 aligned. Volatile so
        // reads with side effects (Status) are neither merged nor elided.
        #[allow(clippy::cast_ptr_alignment)]
        let value = unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile() };

        tracing::trace!("Read u32 @ {offset:#x} = {value:#x}");
        Ok(value)
    }

    fn write32(&self, offset: usize, value: u32) -> Result<()> {
        self.check(offset)?;
        tracing::trace!("Write u32 @ {offset:#x} = {value:#x}");

        // SAFETY: same bounds and alignment as read32. The mapping is never
        // borrowed as a Rust reference, so writing through &self aliases
        // nothing; concurrent writers race only as they would on the device.
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            self.ptr.as_ptr().add(offset).cast::<u32>().write_volatile(value);
        }
        Ok(())
    }

    fn bus_type(&self) -> BusType {
        BusType::Mmio
    }
}

impl Drop for MmioWindow {
    fn drop(&mut self) {
        tracing::debug!("Unmapping register window {}", self.path.display());

        // SAFETY: ptr and len are exactly what mmap returned and was given
        // in open(); the window is not used after drop.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.len) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
    }
}

// SAFETY: the window owns its mapping; moving it to another thread does
// not invalidate the pages.
unsafe impl Send for MmioWindow {}

// SAFETY: all access goes through bounds-checked volatile word operations
// on raw pointers; ptr, len and path are never mutated after open.
unsafe impl Sync for MmioWindow {}

#[cfg(test)]
mod tests {
    use super::*;
    use mulmatr_chip::regs;
    use std::io::Write;

    fn backing(len: u64) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(len).unwrap();
        file
    }

    #[test]
    fn word_round_trip() {
        let file = backing(regs::WINDOW_SIZE as u64);
        let win = MmioWindow::open(file.path(), regs::WINDOW_SIZE).unwrap();
        win.write32(regs::SIZE, 7).unwrap();
        assert_eq!(win.read32(regs::SIZE).unwrap(), 7);
        assert_eq!(win.bus_type(), BusType::Mmio);
        assert_eq!(win.len(), regs::WINDOW_SIZE);
    }

    #[test]
    fn writes_reach_the_file() {
        let file = backing(regs::WINDOW_SIZE as u64);
        {
            let win = MmioWindow::open(file.path(), regs::WINDOW_SIZE).unwrap();
            win.write32(0, 0x0403_0201).unwrap();
        }
        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(&bytes[..4], &0x0403_0201u32.to_ne_bytes());
    }

    #[test]
    fn reads_existing_contents() {
        let mut file = backing(0);
        file.write_all(&0xC1A0u32.to_ne_bytes()).unwrap();
        file.as_file().set_len(16).unwrap();
        let win = MmioWindow::open(file.path(), 16).unwrap();
        assert_eq!(win.read32(0).unwrap(), 0xC1A0);
    }

    #[test]
    fn out_of_window_is_address_invalid() {
        let file = backing(16);
        let win = MmioWindow::open(file.path(), 16).unwrap();
        for offset in [16, 13, 2, usize::MAX] {
            assert!(matches!(
                win.read32(offset),
                Err(MulmatrError::AddressInvalid { .. })
            ));
            assert!(matches!(
                win.write32(offset, 1),
                Err(MulmatrError::AddressInvalid { .. })
            ));
        }
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = MmioWindow::open("/nonexistent/mulmatr-regs", 16).unwrap_err();
        assert!(matches!(err, MulmatrError::DeviceNotFound { .. }));
    }

    #[test]
    fn short_file_is_rejected() {
        let file = backing(8);
        assert!(matches!(
            MmioWindow::open(file.path(), 16),
            Err(MulmatrError::InvalidInput { .. })
        ));
        assert!(MmioWindow::open(file.path(), 0).is_err());
    }
}
