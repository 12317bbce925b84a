//! The scalar registers of a PFSM core: current state, version, word select and soft reset

use crate::{
    core::{
        AddressMap,
        RegisterDescriptor,
    },
    transport::Transport,
};
use packed_struct::prelude::*;
use pfsm_derive::RegisterSerde;
use thiserror::Error;
use tracing::{
    debug,
    trace,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] crate::transport::Error),
    #[error("Failed to pack or unpack a register word")]
    Packing(#[from] packed_struct::PackingError),
}

pub type RegisterResult<T> = Result<T, Error>;

/// Types that implement this trait can be stored in and loaded from a 32-bit register word
pub trait RegisterValue: Sized {
    /// The word written to the register for this value
    /// # Errors
    /// Returns an error if the value can't be packed
    fn to_word(&self) -> RegisterResult<u32>;

    /// Interpret a word read from the register
    /// # Errors
    /// Returns an error if the word can't be unpacked
    fn from_word(word: u32) -> RegisterResult<Self>;
}

macro_rules! reg_num {
    ($num:ty) => {
        impl RegisterValue for $num {
            fn to_word(&self) -> RegisterResult<u32> {
                Ok(u32::from(*self))
            }

            #[allow(clippy::cast_possible_truncation)]
            fn from_word(word: u32) -> RegisterResult<Self> {
                Ok(word as $num)
            }
        }
    };
}

reg_num!(u8);
reg_num!(u16);
reg_num!(u32);

/// The soft reset level. Holding it high keeps the FSM in state 0.
#[derive(Debug, PackedStruct, Default, Copy, Clone, PartialEq, Eq, RegisterSerde)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "4")]
pub struct SoftReset {
    #[packed_field(bits = "0")]
    pub reset: bool,
}

/// Selects which 32-bit slice of a states LUT row, or which input combination plane of the
/// conditions LUT, the next memory write lands in
#[derive(Debug, PackedStruct, Default, Copy, Clone, PartialEq, Eq, RegisterSerde)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "4")]
pub struct WordSelect {
    #[packed_field(bits = "0..=15", endian = "msb")]
    pub select: u16,
}

/// The hardware version code, `0x0010` for V0.10
#[derive(Debug, PackedStruct, Default, Copy, Clone, PartialEq, Eq, RegisterSerde)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "4")]
pub struct Version {
    #[packed_field(bits = "0..=7")]
    pub minor: u8,
    #[packed_field(bits = "8..=15")]
    pub major: u8,
}

impl Version {
    /// The raw 16-bit version code
    #[must_use]
    pub fn code(&self) -> u16 {
        u16::from(self.major) << 8 | u16::from(self.minor)
    }

    /// The version as it's printed on release notes, `V0.10` for `0x0010`
    #[must_use]
    pub fn version_string(&self) -> String {
        format!("V{:x}.{:02x}", self.major, self.minor)
    }
}

/// Typed access to the scalar registers of a core over a borrowed transport
#[derive(Debug)]
pub struct RegisterFile<'a, T> {
    transport: &'a mut T,
    map: &'a AddressMap,
}

impl<'a, T> RegisterFile<'a, T>
where
    T: Transport,
{
    pub fn new(transport: &'a mut T, map: &'a AddressMap) -> Self {
        Self { transport, map }
    }

    #[must_use]
    pub fn map(&self) -> &AddressMap {
        self.map
    }

    /// Size in bytes of the region the transport reaches
    #[must_use]
    pub fn transport_size(&self) -> usize {
        self.transport.size()
    }

    /// Read a register as its raw word
    /// # Errors
    /// Returns an error on transport errors
    pub fn read_raw(&mut self, reg: &RegisterDescriptor) -> RegisterResult<u32> {
        let word = self.transport.read_reg(reg.offset, reg.width)?;
        trace!(offset = reg.offset, word, "Register read");
        Ok(word)
    }

    /// Write a raw word to a register
    /// # Errors
    /// Returns an error on transport errors
    pub fn write_raw(&mut self, reg: &RegisterDescriptor, word: u32) -> RegisterResult<()> {
        trace!(offset = reg.offset, word, "Register write");
        Ok(self.transport.write_reg(reg.offset, word, reg.width)?)
    }

    fn read<R>(&mut self, reg: &RegisterDescriptor) -> RegisterResult<R>
    where
        R: RegisterValue,
    {
        let word = self.read_raw(reg)?;
        R::from_word(word)
    }

    fn write<R>(&mut self, reg: &RegisterDescriptor, value: &R) -> RegisterResult<()>
    where
        R: RegisterValue,
    {
        let word = value.to_word()?;
        self.write_raw(reg, word)
    }

    /// Read the state the FSM is currently in
    /// # Errors
    /// Returns an error on transport errors
    pub fn read_current_state(&mut self) -> RegisterResult<u32> {
        let reg = *self.map.current_state();
        let state: u32 = self.read(&reg)?;
        Ok(state & self.map.params().state_mask())
    }

    /// Read the hardware version of the core
    /// # Errors
    /// Returns an error on transport errors
    pub fn read_version(&mut self) -> RegisterResult<Version> {
        let reg = *self.map.version();
        self.read(&reg)
    }

    /// Select the word slot or input combination for the next memory write
    /// # Errors
    /// Returns an error on transport errors
    pub fn write_word_select(&mut self, select: u16) -> RegisterResult<()> {
        let reg = *self.map.word_select();
        debug!(select, "MEM_WORD_SELECT");
        self.write(&reg, &WordSelect { select })
    }

    /// Drive the soft reset level
    /// # Errors
    /// Returns an error on transport errors
    pub fn write_soft_reset(&mut self, reset: bool) -> RegisterResult<()> {
        let reg = *self.map.soft_reset();
        debug!(reset, "SOFTRESET");
        self.write(&reg, &SoftReset { reset })
    }

    /// Pulse soft reset high then low, sending the FSM back to state 0
    /// # Errors
    /// Returns an error on transport errors
    pub fn pulse_soft_reset(&mut self) -> RegisterResult<()> {
        self.write_soft_reset(true)?;
        self.write_soft_reset(false)
    }

    /// Write one 32-bit word to the LUT memory item at byte offset `offset`. The selector must
    /// already hold the right slot.
    pub(crate) fn write_memory(&mut self, offset: usize, value: u32) -> RegisterResult<()> {
        let reg = RegisterDescriptor {
            offset,
            ..self.map.memory()
        };
        debug!(offset, value, "MEMORY");
        self.write(&reg, &value)
    }
}
