//! Defines the transport mechanisms through which the register window of a PFSM is reached

pub mod local;
pub mod mock;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Internal system IO error")]
    Io(#[from] std::io::Error),
    #[error("Access of {width} bits at {offset:#x} falls outside the {size:#x} byte region")]
    OutOfRegion {
        offset: usize,
        width: u32,
        size: usize,
    },
    #[error("Access of {width} bits at {offset:#x} is not naturally aligned")]
    Misaligned { offset: usize, width: u32 },
    #[error("Unsupported access width of {0} bits")]
    BadWidth(u32),
}

pub type TransportResult<T> = Result<T, Error>;

/// Check an access of `width` bits at `offset` against a region of `size` bytes, returning
/// the number of bytes it touches
pub(crate) fn check_access(offset: usize, width: u32, size: usize) -> TransportResult<usize> {
    let bytes = match width {
        8 => 1,
        16 => 2,
        32 => 4,
        _ => return Err(Error::BadWidth(width)),
    };
    if offset % bytes != 0 {
        return Err(Error::Misaligned { offset, width });
    }
    if offset.checked_add(bytes).map_or(true, |end| end > size) {
        return Err(Error::OutOfRegion {
            offset,
            width,
            size,
        });
    }
    Ok(bytes)
}

/// The trait that is implemented for PFSM transport mechanisms: a mapped byte region holding
/// the register window, accessed with 8, 16 or 32 bit naturally aligned reads and writes.
/// The methods of this trait *assume* the region is already mapped.
pub trait Transport {
    /// Size in bytes of the mapped region
    fn size(&self) -> usize;

    /// Read a register of `width` bits at byte offset `offset`
    fn read_reg(&mut self, offset: usize, width: u32) -> TransportResult<u32>;

    /// Write the low `width` bits of `value` to the register at byte offset `offset`
    fn write_reg(&mut self, offset: usize, value: u32, width: u32) -> TransportResult<()>;
}
