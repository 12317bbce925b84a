//! "Local" transport where we have access to the memory mapped PFSM register window, through
//! `/dev/mem` or a UIO device node

use super::{
    check_access,
    Transport,
    TransportResult,
};
use memmap2::{
    MmapMut,
    MmapOptions,
};
use nix::libc::O_SYNC;
use std::{
    fs::File,
    os::unix::fs::OpenOptionsExt,
    path::PathBuf,
};
use tracing::info;

/// Where the register window of a core lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// The device file to map, usually `/dev/mem` or `/dev/uioN`
    pub path: PathBuf,
    /// Physical base address of the window (the file offset to map from)
    pub base_addr: u64,
    /// Size of the window in bytes
    pub size: usize,
}

#[derive(Debug)]
/// A local connection to the PFSM register window via a memory map
pub struct Local {
    mem: MmapMut,
}

impl Local {
    /// Map the register window described by `config`.
    ///
    /// Note: This may require some file permission bologna
    /// # Errors
    /// Returns errors on file IO errors
    pub fn new(config: &LocalConfig) -> TransportResult<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .custom_flags(O_SYNC)
            .open(&config.path)?;
        // Safety: the mapping is only ever touched through volatile accesses of this transport,
        // and the underlying device registers aren't truncated out from under us
        let mem = unsafe {
            MmapOptions::new()
                .len(config.size)
                .offset(config.base_addr)
                .map_mut(&file)?
        };
        info!(
            path = %config.path.display(),
            base_addr = config.base_addr,
            size = config.size,
            "Mapped PFSM register window"
        );
        Ok(Self { mem })
    }
}

impl Transport for Local {
    fn size(&self) -> usize {
        self.mem.len()
    }

    fn read_reg(&mut self, offset: usize, width: u32) -> TransportResult<u32> {
        check_access(offset, width, self.mem.len())?;
        // Safety: `check_access` guarantees the access is aligned and inside the mapping
        let value = unsafe {
            let ptr = self.mem.as_ptr().add(offset);
            match width {
                8 => u32::from(ptr.read_volatile()),
                16 => u32::from(ptr.cast::<u16>().read_volatile()),
                _ => ptr.cast::<u32>().read_volatile(),
            }
        };
        Ok(value)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_reg(&mut self, offset: usize, value: u32, width: u32) -> TransportResult<()> {
        check_access(offset, width, self.mem.len())?;
        // Safety: `check_access` guarantees the access is aligned and inside the mapping
        unsafe {
            let ptr = self.mem.as_mut_ptr().add(offset);
            match width {
                8 => ptr.write_volatile(value as u8),
                16 => ptr.cast::<u16>().write_volatile(value as u16),
                _ => ptr.cast::<u32>().write_volatile(value),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str, size: usize) -> LocalConfig {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, vec![0u8; size]).unwrap();
        LocalConfig {
            path,
            base_addr: 0,
            size,
        }
    }

    #[test]
    fn test_write_read() {
        let config = scratch("pfsm_local_write_read.bin", 64);
        let mut transport = Local::new(&config).unwrap();
        assert_eq!(transport.size(), 64);
        transport.write_reg(8, 0xDEAD_BEEF, 32).unwrap();
        assert_eq!(transport.read_reg(8, 32).unwrap(), 0xDEAD_BEEF);
        transport.write_reg(12, 0x1234, 16).unwrap();
        assert_eq!(transport.read_reg(12, 16).unwrap(), 0x1234);
        transport.write_reg(15, 0x1FF, 8).unwrap();
        assert_eq!(transport.read_reg(15, 8).unwrap(), 0xFF);
        std::fs::remove_file(config.path).unwrap();
    }

    #[test]
    fn test_bad_access() {
        let config = scratch("pfsm_local_bad_access.bin", 16);
        let mut transport = Local::new(&config).unwrap();
        assert!(transport.write_reg(16, 0, 32).is_err());
        assert!(transport.read_reg(2, 32).is_err());
        std::fs::remove_file(config.path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let config = LocalConfig {
            path: "/nonexistent/pfsm".into(),
            base_addr: 0,
            size: 16,
        };
        assert!(matches!(
            Local::new(&config),
            Err(super::super::Error::Io(_))
        ));
    }
}
