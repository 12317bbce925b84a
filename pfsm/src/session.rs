//! Exclusive access to a PFSM core
//!
//! A [`Device`] owns the transport of one core behind its own guard. At most one [`Session`]
//! holds a device at a time, and opening never waits: a held device reports [`Error::Busy`].

use crate::{
    codec,
    core::AddressMap,
    lut::LutMemory,
    program::{
        self,
        Programmer,
    },
    registers::{
        self,
        RegisterFile,
    },
    transport::Transport,
};
use kstring::KString;
use pfsm_utils::{
    fsm::{
        self,
        FsmProgram,
    },
    params::HardwareParameters,
};
use std::{
    io::SeekFrom,
    sync::{
        Mutex,
        MutexGuard,
        TryLockError,
    },
};
use thiserror::Error;
use tracing::{
    debug,
    info,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Device is held by another session")]
    Busy,
    #[error("Seek target falls outside the {size} byte region")]
    OutOfBounds { size: usize },
    #[error(transparent)]
    TransferFault(#[from] registers::Error),
    #[error(transparent)]
    Program(#[from] program::Error),
    #[error("Failed to compile the FSM")]
    Fsm(#[from] fsm::Error),
    #[error("FSM was written for {program:?} but the core has {device:?}")]
    ParamsMismatch {
        program: HardwareParameters,
        device: HardwareParameters,
    },
}

pub type SessionResult<T> = Result<T, Error>;

/// One PFSM core: its name, address map, and the transport reaching its register window
#[derive(Debug)]
pub struct Device<T> {
    name: KString,
    map: AddressMap,
    transport: Mutex<T>,
}

impl<T> Device<T>
where
    T: Transport,
{
    pub fn new(name: &str, map: AddressMap, transport: T) -> Self {
        Self {
            name: KString::from_ref(name),
            map,
            transport: Mutex::new(transport),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    #[must_use]
    pub fn map(&self) -> &AddressMap {
        &self.map
    }

    /// Start a session, failing immediately if one is already open
    /// # Errors
    /// Returns [`Error::Busy`] if the device is held
    pub fn open(&self) -> SessionResult<Session<'_, T>> {
        let guard = match self.transport.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(Error::Busy),
            // A session that panicked can't have left the guard half taken
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        info!(device = self.name(), "Opened session");
        Ok(Session {
            guard,
            map: &self.map,
            name: self.name(),
            position: 0,
        })
    }

    /// Take the transport back out of the device
    #[must_use]
    pub fn into_transport(self) -> T {
        match self.transport.into_inner() {
            Ok(transport) => transport,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Exclusive access to a device, with a cursor for positioned transfers
#[derive(Debug)]
pub struct Session<'a, T> {
    guard: MutexGuard<'a, T>,
    map: &'a AddressMap,
    name: &'a str,
    position: u64,
}

impl<'a, T> Session<'a, T>
where
    T: Transport,
{
    /// Move the cursor. The end of the window is `2^addr_w`, while the result must land inside
    /// the mapped region.
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the new position is outside `[0, region size]`
    pub fn seek(&mut self, pos: SeekFrom) -> SessionResult<u64> {
        let size = self.guard.size();
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(n) => self.position.checked_add_signed(n),
            SeekFrom::End(n) => self.map.end().checked_add_signed(n),
        };
        match target {
            Some(position) if position <= size as u64 => {
                self.position = position;
                Ok(position)
            }
            _ => Err(Error::OutOfBounds { size }),
        }
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the register at the cursor into `buf`. The cursor doesn't move.
    /// # Errors
    /// Returns an error on transport errors
    pub fn read(&mut self, buf: &mut [u8]) -> SessionResult<usize> {
        let position = self.position;
        Ok(codec::read_at(&mut self.registers(), position, buf)?)
    }

    /// Write `buf` to the register or memory cell at the cursor. The cursor doesn't move.
    /// # Errors
    /// Returns an error on transport errors
    pub fn write(&mut self, buf: &[u8]) -> SessionResult<usize> {
        let position = self.position;
        Ok(codec::write_at(&mut self.registers(), position, buf)?)
    }

    /// Typed access to the scalar registers
    pub fn registers(&mut self) -> RegisterFile<'_, T> {
        RegisterFile::new(&mut *self.guard, self.map)
    }

    /// Word-selected access to the LUT memories
    pub fn lut(&mut self) -> LutMemory<'_, T> {
        LutMemory::new(&mut *self.guard, self.map)
    }

    /// A programmer for this core, for when progress reporting is wanted
    pub fn programmer(&mut self) -> Programmer<'_, T> {
        Programmer::new(&mut *self.guard, self.map)
    }

    /// Program the core with a whole bitstream, returning the bytes consumed
    /// # Errors
    /// Returns an error on a bitstream of the wrong length or on transport errors
    pub fn program(&mut self, bitstream: &[u8]) -> SessionResult<usize> {
        Ok(self.programmer().program(bitstream)?)
    }

    /// Compile `fsm` and program the core with it
    /// # Errors
    /// Returns an error if the FSM was written for different parameters, fails to compile, or
    /// on transport errors
    pub fn program_fsm(&mut self, fsm: &FsmProgram) -> SessionResult<usize> {
        let device = *self.map.params();
        if *fsm.params() != device {
            return Err(Error::ParamsMismatch {
                program: *fsm.params(),
                device,
            });
        }
        let bitstream = fsm.generate_bitstream()?;
        debug!(md5 = bitstream.md5_string(), "Generated bitstream");
        self.program(bitstream.bytes())
    }

    /// End the session, letting the next [`Device::open`] succeed
    pub fn release(self) {
        info!(device = self.name, "Released session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::Mock;
    use pfsm_utils::fsm::parse_fsm;

    fn device() -> Device<Mock> {
        let map = AddressMap::new(HardwareParameters::new(2, 1, 1).unwrap());
        Device::new("pfsm0", map.clone(), Mock::new(map))
    }

    #[test]
    fn test_busy() {
        let device = device();
        let session = device.open().unwrap();
        assert!(matches!(device.open(), Err(Error::Busy)));
        session.release();
        assert!(device.open().is_ok());
    }

    #[test]
    fn test_busy_across_threads() {
        let device = device();
        let _session = device.open().unwrap();
        std::thread::scope(|s| {
            let other = s.spawn(|| matches!(device.open(), Err(Error::Busy)));
            assert!(other.join().unwrap());
        });
    }

    #[test]
    fn test_guards_are_per_device() {
        let a = device();
        let b = device();
        let _held = a.open().unwrap();
        assert!(b.open().is_ok());
    }

    #[test]
    fn test_seek() {
        let device = device();
        let mut session = device.open().unwrap();
        assert_eq!(session.seek(SeekFrom::End(0)).unwrap(), 64);
        assert_eq!(session.seek(SeekFrom::Start(40)).unwrap(), 40);
        assert_eq!(session.seek(SeekFrom::Current(4)).unwrap(), 44);
        assert_eq!(session.seek(SeekFrom::End(-20)).unwrap(), 44);
        assert!(matches!(
            session.seek(SeekFrom::Start(65)),
            Err(Error::OutOfBounds { size: 64 })
        ));
        assert!(matches!(
            session.seek(SeekFrom::Current(-45)),
            Err(Error::OutOfBounds { .. })
        ));
        // A failed seek leaves the cursor alone
        assert_eq!(session.position(), 44);
    }

    #[test]
    fn test_seek_small_region() {
        let map = AddressMap::new(HardwareParameters::new(2, 1, 1).unwrap());
        let device = Device::new("pfsm0", map.clone(), Mock::with_size(map, 48));
        let mut session = device.open().unwrap();
        assert_eq!(session.seek(SeekFrom::Start(48)).unwrap(), 48);
        assert_eq!(session.seek(SeekFrom::End(-16)).unwrap(), 48);
        assert!(matches!(
            session.seek(SeekFrom::End(0)),
            Err(Error::OutOfBounds { size: 48 })
        ));
    }

    #[test]
    fn test_positioned_io_keeps_position() {
        let device = device();
        let mut session = device.open().unwrap();
        session.seek(SeekFrom::Start(36)).unwrap();
        assert_eq!(session.write(&[1]).unwrap(), 1);
        assert_eq!(session.write(&[0]).unwrap(), 1);
        assert_eq!(session.position(), 36);
        session.seek(SeekFrom::Start(40)).unwrap();
        let mut buf = [0xFF];
        assert_eq!(session.read(&mut buf).unwrap(), 1);
        assert_eq!(buf, [0]);
        assert_eq!(session.position(), 40);
    }

    #[test]
    fn test_invalid_write() {
        let device = device();
        let mut session = device.open().unwrap();
        session.seek(SeekFrom::Start(48)).unwrap();
        assert_eq!(session.write(&[1, 2, 3, 4]).unwrap(), 0);
        session.release();
        assert!(device.into_transport().writes().is_empty());
    }

    #[test]
    fn test_program() {
        let device = device();
        let mut session = device.open().unwrap();
        assert_eq!(session.program(&[0u8; 24]).unwrap(), 24);
        assert!(matches!(
            session.program(&[0u8; 23]),
            Err(Error::Program(program::Error::LengthMismatch { .. }))
        ));
        assert_eq!(session.registers().read_current_state().unwrap(), 0);
        assert_eq!(session.registers().read_version().unwrap().code(), 0x0010);
    }

    #[test]
    fn test_program_small_region() {
        let map = AddressMap::new(HardwareParameters::new(2, 1, 1).unwrap());
        let device = Device::new("pfsm0", map.clone(), Mock::with_size(map, 36));
        let mut session = device.open().unwrap();
        assert!(matches!(
            session.program(&[0u8; 24]),
            Err(Error::Program(program::Error::RegionTooSmall { .. }))
        ));
        session.release();
        assert!(device.into_transport().writes().is_empty());
    }

    #[test]
    fn test_misaligned_write_is_a_fault() {
        let device = device();
        let mut session = device.open().unwrap();
        session.seek(SeekFrom::Start(2)).unwrap();
        assert!(matches!(
            session.write(&[1, 0, 0, 0]),
            Err(Error::TransferFault(_))
        ));
    }

    #[test]
    fn test_program_fsm() {
        let device = device();
        let mut session = device.open().unwrap();
        let fsm = parse_fsm("#!/bin/pfsm\n?params 2 1 1\n?state a 1 1 a\n?quit\n").unwrap();
        assert_eq!(session.program_fsm(&fsm).unwrap(), 24);
        let other = parse_fsm("#!/bin/pfsm\n?params 3 1 1\n?state a 1\n?quit\n").unwrap();
        assert!(matches!(
            session.program_fsm(&other),
            Err(Error::ParamsMismatch { .. })
        ));
        session.release();
        let mock = device.into_transport();
        assert_eq!(mock.reset_pulses(), 1);
        assert_eq!(mock.conditions_word(1, 0), 1);
        assert_eq!(mock.states_lut_row(0), &[0b01]);
    }
}
