//! Mock transport that simulates a PFSM core, used in testing the interface

use super::{
    check_access,
    Transport,
    TransportResult,
};
use crate::core::{
    AddressMap,
    Operation,
    Target,
};
use pfsm_utils::{
    bitstream::StateRow,
    params::WORD_BYTES,
};

/// Version code reported by the simulated core, V0.10
pub const MOCK_VERSION: u16 = 0x0010;

/// A simulated PFSM register window. Writes land in the LUT memories the same way the hardware
/// latches them, and every write is logged in order.
#[derive(Debug)]
pub struct Mock {
    map: AddressMap,
    size: usize,
    word_select: u32,
    soft_reset: bool,
    current_state: u32,
    states_lut: Vec<u32>,
    conditions_lut: Vec<u32>,
    writes: Vec<(usize, u32)>,
}

impl Mock {
    /// Construct a new mock core whose mapped region spans the whole address space
    #[must_use]
    pub fn new(map: AddressMap) -> Self {
        let size = usize::try_from(map.end()).unwrap_or(usize::MAX);
        Self::with_size(map, size)
    }

    /// Construct a new mock core mapped into a region of `size` bytes
    #[must_use]
    pub fn with_size(map: AddressMap, size: usize) -> Self {
        let params = *map.params();
        Self {
            size,
            word_select: 0,
            soft_reset: false,
            current_state: 0,
            states_lut: vec![0; params.states_lut_words()],
            conditions_lut: vec![0; params.conditions_lut_words()],
            writes: vec![],
            map,
        }
    }

    /// Every `(offset, value)` written so far, in order
    #[must_use]
    pub fn writes(&self) -> &[(usize, u32)] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Number of complete 1-then-0 pulses seen on the soft reset register
    #[must_use]
    pub fn reset_pulses(&self) -> usize {
        let soft_reset = self.map.soft_reset().offset;
        self.writes
            .iter()
            .filter(|(offset, _)| *offset == soft_reset)
            .map(|(_, value)| value & 1)
            .collect::<Vec<_>>()
            .windows(2)
            .filter(|w| w[0] == 1 && w[1] == 0)
            .count()
    }

    /// The words stored in states LUT row `state`
    #[must_use]
    pub fn states_lut_row(&self, state: usize) -> &[u32] {
        let words = self.map.params().words_per_state_row();
        &self.states_lut[state * words..(state + 1) * words]
    }

    /// The conditions word for input combination `input` and block of states `block`
    #[must_use]
    pub fn conditions_word(&self, input: usize, block: usize) -> u32 {
        self.conditions_lut[input * self.map.params().condition_blocks() + block]
    }

    #[must_use]
    pub fn current_state(&self) -> u32 {
        self.current_state
    }

    /// The outputs driven in the current state
    #[must_use]
    pub fn output(&self) -> u64 {
        StateRow::unpack(
            self.states_lut_row(self.current_state as usize),
            self.map.params(),
        )
        .output
    }

    /// Simulate one clock edge with `input` on the input ports, returning the new state
    pub fn step(&mut self, input: u32) -> u32 {
        let params = *self.map.params();
        if self.soft_reset {
            self.current_state = 0;
            return 0;
        }
        let state = self.current_state as usize;
        let input = (input as usize) & (params.input_combinations() - 1);
        let jump = (self.conditions_word(input, state / 32) >> (state % 32)) & 1 == 1;
        self.current_state = if jump {
            StateRow::unpack(self.states_lut_row(state), &params).next_state
        } else {
            (self.current_state + 1) & params.state_mask()
        };
        self.current_state
    }

    fn write_memory(&mut self, index: usize, value: u32) {
        let params = *self.map.params();
        let item = index / WORD_BYTES;
        let select = self.word_select as usize;
        if item < params.states() {
            if select < params.words_per_state_row() {
                self.states_lut[item * params.words_per_state_row() + select] = value;
            }
        } else if item < params.states() + params.condition_blocks() {
            if select < params.input_combinations() {
                let block = item - params.states();
                self.conditions_lut[select * params.condition_blocks() + block] = value;
            }
        }
        // The padding past the conditions LUT isn't backed by anything
    }
}

impl Transport for Mock {
    fn size(&self) -> usize {
        self.size
    }

    fn read_reg(&mut self, offset: usize, width: u32) -> TransportResult<u32> {
        check_access(offset, width, self.size)?;
        if offset == self.map.current_state().offset {
            Ok(self.current_state)
        } else if offset == self.map.version().offset {
            Ok(u32::from(MOCK_VERSION))
        } else {
            // Write-only registers and holes read back as zero
            Ok(0)
        }
    }

    fn write_reg(&mut self, offset: usize, value: u32, width: u32) -> TransportResult<()> {
        check_access(offset, width, self.size)?;
        self.writes.push((offset, value));
        match self.map.decode(offset as u64, Operation::Write) {
            Target::WordSelect => self.word_select = value,
            Target::SoftReset => {
                self.soft_reset = value & 1 == 1;
                if self.soft_reset {
                    self.current_state = 0;
                }
            }
            Target::MemoryCell(index) => self.write_memory(index, value),
            _ => (),
        }
        Ok(())
    }
}
