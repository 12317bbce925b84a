//! Positioned byte transfers against the register window
//!
//! An offset is decoded into a register or LUT memory cell, and the transfer moves at most the
//! register's bus width worth of bytes. Register words travel little-endian in the caller's
//! buffer. Offsets that don't decode to a target valid for the operation transfer nothing.

use crate::{
    core::{
        Operation,
        RegisterDescriptor,
        Target,
        MEMORY_BASE,
    },
    registers::{
        RegisterFile,
        RegisterResult,
    },
    transport::Transport,
};
use tracing::{
    debug,
    warn,
};

fn resolve<T>(regs: &RegisterFile<'_, T>, offset: u64, op: Operation) -> Option<RegisterDescriptor>
where
    T: Transport,
{
    let map = regs.map();
    let target = map.decode(offset, op);
    let mut desc = map.descriptor(target)?;
    if let Target::MemoryCell(index) = target {
        desc.offset = MEMORY_BASE + index;
    }
    Some(desc)
}

/// Read the register at `offset` into `buf`, returning the number of bytes transferred. That
/// is the smaller of the buffer length and the register's byte width, or zero when nothing
/// readable lives at `offset`.
/// # Errors
/// Returns an error on transport errors
pub fn read_at<T>(regs: &mut RegisterFile<'_, T>, offset: u64, buf: &mut [u8]) -> RegisterResult<usize>
where
    T: Transport,
{
    let Some(desc) = resolve(regs, offset, Operation::Read) else {
        debug!(offset, "Read of an invalid address");
        return Ok(0);
    };
    let n = buf.len().min(desc.bytes());
    if n == 0 {
        return Ok(0);
    }
    let word = regs.read_raw(&desc)?;
    buf[..n].copy_from_slice(&word.to_le_bytes()[..n]);
    Ok(n)
}

/// Write the low bytes of `buf` to the register or memory cell at `offset`. Only as many bytes
/// as the target is wide are used, zero extended. Returns the length of `buf` on success, or
/// zero when the write was dropped because nothing writable lives at `offset`.
///
/// Memory cells are whole 32-bit items, so an offset inside the memory range that isn't a
/// multiple of 4 decodes to a cell but can't be written. That is reported as the transport's
/// `Misaligned` error rather than dropped, and nothing reaches the region.
/// # Errors
/// Returns an error on transport errors, including misaligned memory cell writes
pub fn write_at<T>(regs: &mut RegisterFile<'_, T>, offset: u64, buf: &[u8]) -> RegisterResult<usize>
where
    T: Transport,
{
    let Some(desc) = resolve(regs, offset, Operation::Write) else {
        warn!(offset, "Dropped write to an invalid address");
        return Ok(0);
    };
    let n = buf.len().min(desc.bytes());
    if n == 0 {
        return Ok(0);
    }
    let mut bytes = [0u8; 4];
    bytes[..n].copy_from_slice(&buf[..n]);
    regs.write_raw(&desc, u32::from_le_bytes(bytes))?;
    Ok(buf.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::AddressMap,
        transport::mock::Mock,
    };
    use pfsm_utils::params::HardwareParameters;

    fn setup() -> (Mock, AddressMap) {
        let map = AddressMap::new(HardwareParameters::new(2, 1, 1).unwrap());
        (Mock::new(map.clone()), map)
    }

    #[test]
    fn test_read_version() {
        let (mut transport, map) = setup();
        let mut regs = RegisterFile::new(&mut transport, &map);
        let mut buf = [0u8; 4];
        assert_eq!(read_at(&mut regs, 44, &mut buf).unwrap(), 2);
        assert_eq!(buf, [0x10, 0x00, 0, 0]);
    }

    #[test]
    fn test_short_buffer() {
        let (mut transport, map) = setup();
        let mut regs = RegisterFile::new(&mut transport, &map);
        let mut buf = [0u8; 1];
        assert_eq!(read_at(&mut regs, 44, &mut buf).unwrap(), 1);
        assert_eq!(buf, [0x10]);
        let mut empty = [0u8; 0];
        assert_eq!(read_at(&mut regs, 44, &mut empty).unwrap(), 0);
    }

    #[test]
    fn test_invalid_read() {
        let (mut transport, map) = setup();
        let mut regs = RegisterFile::new(&mut transport, &map);
        let mut buf = [0xFFu8; 4];
        // Write-only registers can't be read back
        assert_eq!(read_at(&mut regs, 32, &mut buf).unwrap(), 0);
        assert_eq!(read_at(&mut regs, 48, &mut buf).unwrap(), 0);
        assert_eq!(buf, [0xFF; 4]);
    }

    #[test]
    fn test_invalid_write_is_dropped() {
        let (mut transport, map) = setup();
        let mut regs = RegisterFile::new(&mut transport, &map);
        assert_eq!(write_at(&mut regs, 40, &[1, 0, 0, 0]).unwrap(), 0);
        assert_eq!(write_at(&mut regs, 44, &[1, 0]).unwrap(), 0);
        assert_eq!(write_at(&mut regs, 52, &[1]).unwrap(), 0);
        assert!(transport.writes().is_empty());
    }

    #[test]
    fn test_write_memory_cell() {
        let (mut transport, map) = setup();
        let mut regs = RegisterFile::new(&mut transport, &map);
        assert_eq!(write_at(&mut regs, 32, &[0]).unwrap(), 1);
        assert_eq!(write_at(&mut regs, 8, &[0b101, 0, 0, 0]).unwrap(), 4);
        assert_eq!(transport.states_lut_row(2), &[0b101]);
    }

    #[test]
    fn test_misaligned_memory_write() {
        let (mut transport, map) = setup();
        let mut regs = RegisterFile::new(&mut transport, &map);
        assert!(matches!(
            write_at(&mut regs, 2, &[1, 0, 0, 0]),
            Err(crate::registers::Error::Transport(
                crate::transport::Error::Misaligned { offset: 2, width: 32 }
            ))
        ));
        assert!(transport.writes().is_empty());
    }

    #[test]
    fn test_write_truncates_to_register() {
        let (mut transport, map) = setup();
        let mut regs = RegisterFile::new(&mut transport, &map);
        // Soft reset is one byte wide, the rest of the buffer is ignored
        assert_eq!(write_at(&mut regs, 36, &[1, 0xAA, 0xBB]).unwrap(), 3);
        assert_eq!(transport.writes(), &[(36, 1)]);
    }

    #[test]
    fn test_version_stable() {
        let (mut transport, map) = setup();
        let mut regs = RegisterFile::new(&mut transport, &map);
        let mut before = [0u8; 2];
        read_at(&mut regs, 44, &mut before).unwrap();
        write_at(&mut regs, 36, &[1]).unwrap();
        write_at(&mut regs, 0, &[0xFF; 4]).unwrap();
        write_at(&mut regs, 44, &[0xFF; 2]).unwrap();
        let mut after = [0u8; 2];
        read_at(&mut regs, 44, &mut after).unwrap();
        assert_eq!(before, after);
    }
}
