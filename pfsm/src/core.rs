//! The core types describing the register window of a PFSM core
//!
//! The window starts with the LUT memory: the states LUT at items `[0, 2^state_w)` followed by
//! the conditions LUT, one item per block of 32 states. The memory is padded to a power of two
//! items, and the scalar registers follow it in 4 byte slots: word select, soft reset, current
//! state and version.
use pfsm_utils::params::{
    HardwareParameters,
    DATA_W,
    WORD_BYTES,
};

/// Byte offset of the first LUT memory item
pub const MEMORY_BASE: usize = 0;
/// Hardware width of the version register
pub const VERSION_W: u32 = 16;

/// How software may access a register
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    #[must_use]
    pub fn readable(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }

    #[must_use]
    pub fn writable(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }
}

/// The representation of a scalar register in the window
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RegisterDescriptor {
    /// Byte offset from the start of the window
    pub offset: usize,
    /// Software visible width in bits, the hardware width rounded up to a bus access
    pub width: u32,
    pub access: Access,
}

impl RegisterDescriptor {
    /// Number of bytes moved by one access, `width >> 3`
    #[must_use]
    pub fn bytes(&self) -> usize {
        (self.width >> 3) as usize
    }
}

/// Which side of a transfer an offset is decoded for
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

/// What an offset in the window refers to
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Target {
    CurrentState,
    Version,
    WordSelect,
    SoftReset,
    /// Byte index relative to [`MEMORY_BASE`]
    MemoryCell(usize),
    Invalid,
}

/// Round a hardware register width up to the access size used on the CPU bus
#[must_use]
pub fn bus_width(bits: u32) -> u32 {
    match bits {
        0..=8 => 8,
        9..=16 => 16,
        _ => DATA_W,
    }
}

/// Hardware width of the word select register. It carries either a states LUT word slot or a
/// conditions LUT input combination, so it must fit both.
#[must_use]
pub fn word_select_bits(params: &HardwareParameters) -> u32 {
    let slots = params.words_per_state_row();
    let slot_bits = usize::BITS - (slots - 1).leading_zeros();
    slot_bits.max(params.input_w()).max(1)
}

/// The register layout of one PFSM core, derived from its hardware parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMap {
    params: HardwareParameters,
    memory_items: usize,
    word_select: RegisterDescriptor,
    soft_reset: RegisterDescriptor,
    current_state: RegisterDescriptor,
    version: RegisterDescriptor,
    addr_w: u32,
}

impl AddressMap {
    #[must_use]
    pub fn new(params: HardwareParameters) -> Self {
        let memory_items = (params.states() + params.condition_blocks()).next_power_of_two();
        let word_select_addr = MEMORY_BASE + memory_items * WORD_BYTES;
        let slot = |n: usize| word_select_addr + n * WORD_BYTES;

        let word_select = RegisterDescriptor {
            offset: slot(0),
            width: bus_width(word_select_bits(&params)),
            access: Access::WriteOnly,
        };
        let soft_reset = RegisterDescriptor {
            offset: slot(1),
            width: bus_width(1),
            access: Access::WriteOnly,
        };
        let current_state = RegisterDescriptor {
            offset: slot(2),
            width: bus_width(params.state_w()),
            access: Access::ReadOnly,
        };
        let version = RegisterDescriptor {
            offset: slot(3),
            width: bus_width(VERSION_W),
            access: Access::ReadOnly,
        };
        let top = version.offset + WORD_BYTES;
        let addr_w = usize::BITS - (top - 1).leading_zeros();

        Self {
            params,
            memory_items,
            word_select,
            soft_reset,
            current_state,
            version,
            addr_w,
        }
    }

    #[must_use]
    pub fn params(&self) -> &HardwareParameters {
        &self.params
    }

    #[must_use]
    pub fn word_select(&self) -> &RegisterDescriptor {
        &self.word_select
    }

    #[must_use]
    pub fn soft_reset(&self) -> &RegisterDescriptor {
        &self.soft_reset
    }

    #[must_use]
    pub fn current_state(&self) -> &RegisterDescriptor {
        &self.current_state
    }

    #[must_use]
    pub fn version(&self) -> &RegisterDescriptor {
        &self.version
    }

    /// The LUT memory seen as one write-only 32-bit register
    #[must_use]
    pub fn memory(&self) -> RegisterDescriptor {
        RegisterDescriptor {
            offset: MEMORY_BASE,
            width: DATA_W,
            access: Access::WriteOnly,
        }
    }

    /// Number of 32-bit items in the LUT memory window
    #[must_use]
    pub fn memory_items(&self) -> usize {
        self.memory_items
    }

    /// Width of the address bus in bits
    #[must_use]
    pub fn addr_w(&self) -> u32 {
        self.addr_w
    }

    /// The virtual end of the window, `2^addr_w`
    #[must_use]
    pub fn end(&self) -> u64 {
        1 << self.addr_w
    }

    /// Bytes a mapped region needs to reach every register, up to the end of the version slot
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.version.offset + WORD_BYTES
    }

    /// Byte offset of the memory item holding states LUT row `row`
    #[must_use]
    pub fn states_lut_offset(&self, row: usize) -> usize {
        MEMORY_BASE + row * WORD_BYTES
    }

    /// Byte offset of the memory item holding conditions LUT block `block`
    #[must_use]
    pub fn conditions_lut_offset(&self, block: usize) -> usize {
        MEMORY_BASE + (self.params.states() + block) * WORD_BYTES
    }

    /// Classify `offset` for the given operation
    #[must_use]
    pub fn decode(&self, offset: u64, op: Operation) -> Target {
        let Ok(offset) = usize::try_from(offset) else {
            return Target::Invalid;
        };
        let target = if offset == self.current_state.offset {
            Target::CurrentState
        } else if offset == self.version.offset {
            Target::Version
        } else if offset == self.word_select.offset {
            Target::WordSelect
        } else if offset == self.soft_reset.offset {
            Target::SoftReset
        } else if (MEMORY_BASE..self.word_select.offset).contains(&offset) {
            Target::MemoryCell(offset - MEMORY_BASE)
        } else {
            return Target::Invalid;
        };
        let access = self.access(target);
        let permitted = match op {
            Operation::Read => access.readable(),
            Operation::Write => access.writable(),
        };
        if permitted {
            target
        } else {
            Target::Invalid
        }
    }

    fn access(&self, target: Target) -> Access {
        match target {
            Target::CurrentState => self.current_state.access,
            Target::Version => self.version.access,
            Target::WordSelect => self.word_select.access,
            Target::SoftReset => self.soft_reset.access,
            Target::MemoryCell(_) | Target::Invalid => self.memory().access,
        }
    }

    /// The descriptor a decoded target is transferred with
    #[must_use]
    pub fn descriptor(&self, target: Target) -> Option<RegisterDescriptor> {
        match target {
            Target::CurrentState => Some(self.current_state),
            Target::Version => Some(self.version),
            Target::WordSelect => Some(self.word_select),
            Target::SoftReset => Some(self.soft_reset),
            Target::MemoryCell(_) => Some(self.memory()),
            Target::Invalid => None,
        }
    }
}
