//! The two LUT memories of a PFSM core
//!
//! Both LUTs share one memory window and one selector. A states LUT row wider than 32 bits is
//! written one word slot at a time, with word select holding the slot. The conditions LUT is
//! a bitmap of states by input combinations, written 32 states at a time with word select
//! holding the input combination.

use crate::{
    core::AddressMap,
    registers::{
        self,
        RegisterFile,
    },
    transport::Transport,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registers(#[from] registers::Error),
    #[error("State {row} is out of range for {states} states")]
    Row { row: usize, states: usize },
    #[error("Word slot {slot} is out of range for rows of {words} words")]
    Slot { slot: usize, words: usize },
    #[error("Block {block} is out of range for {blocks} blocks of 32 states")]
    Block { block: usize, blocks: usize },
    #[error("Input combination {combination} is out of range for {combinations} combinations")]
    Combination {
        combination: usize,
        combinations: usize,
    },
}

pub type LutResult<T> = Result<T, Error>;

/// Word-selected writes into the states and conditions LUTs
#[derive(Debug)]
pub struct LutMemory<'a, T> {
    regs: RegisterFile<'a, T>,
}

impl<'a, T> LutMemory<'a, T>
where
    T: Transport,
{
    pub fn new(transport: &'a mut T, map: &'a AddressMap) -> Self {
        Self {
            regs: RegisterFile::new(transport, map),
        }
    }

    /// The register file the writes go through
    pub fn registers(&mut self) -> &mut RegisterFile<'a, T> {
        &mut self.regs
    }

    /// Write word slot `slot` of states LUT row `row`
    /// # Errors
    /// Returns an error if the row or slot is out of range, or on transport errors
    pub fn write_states_lut_word(&mut self, row: usize, slot: usize, value: u32) -> LutResult<()> {
        let params = *self.regs.map().params();
        if row >= params.states() {
            return Err(Error::Row {
                row,
                states: params.states(),
            });
        }
        let words = params.words_per_state_row();
        if slot >= words {
            return Err(Error::Slot { slot, words });
        }
        let offset = self.regs.map().states_lut_offset(row);
        self.select(slot)?;
        self.regs.write_memory(offset, value)?;
        Ok(())
    }

    /// Write the conditions word for input combination `combination` covering states
    /// `[32 * block, 32 * block + 32)`. Bit `k` of `value` belongs to state `32 * block + k`.
    /// # Errors
    /// Returns an error if the block or combination is out of range, or on transport errors
    pub fn write_conditions_lut_word(
        &mut self,
        block: usize,
        combination: usize,
        value: u32,
    ) -> LutResult<()> {
        let params = *self.regs.map().params();
        let blocks = params.condition_blocks();
        if block >= blocks {
            return Err(Error::Block { block, blocks });
        }
        let combinations = params.input_combinations();
        if combination >= combinations {
            return Err(Error::Combination {
                combination,
                combinations,
            });
        }
        let offset = self.regs.map().conditions_lut_offset(block);
        self.select(combination)?;
        self.regs.write_memory(offset, value)?;
        Ok(())
    }

    // Every index we select was range checked against widths of at most 16 bits
    #[allow(clippy::cast_possible_truncation)]
    fn select(&mut self, index: usize) -> LutResult<()> {
        Ok(self.regs.write_word_select(index as u16)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::Mock;
    use pfsm_utils::params::HardwareParameters;

    fn setup(state_w: u32, input_w: u32, output_w: u32) -> (Mock, AddressMap) {
        let map = AddressMap::new(HardwareParameters::new(state_w, input_w, output_w).unwrap());
        (Mock::new(map.clone()), map)
    }

    #[test]
    fn test_states_word_selects_first() {
        let (mut transport, map) = setup(4, 1, 32);
        let mut lut = LutMemory::new(&mut transport, &map);
        lut.write_states_lut_word(3, 1, 0xAB).unwrap();
        lut.write_states_lut_word(3, 0, 0xCD).unwrap();
        let ws = map.word_select().offset;
        assert_eq!(
            transport.writes(),
            &[(ws, 1), (12, 0xAB), (ws, 0), (12, 0xCD)]
        );
        assert_eq!(transport.states_lut_row(3), &[0xCD, 0xAB]);
    }

    #[test]
    fn test_selector_rewritten_every_time() {
        let (mut transport, map) = setup(2, 1, 1);
        let mut lut = LutMemory::new(&mut transport, &map);
        lut.write_states_lut_word(0, 0, 1).unwrap();
        lut.write_states_lut_word(1, 0, 2).unwrap();
        let ws = map.word_select().offset;
        let selects = transport
            .writes()
            .iter()
            .filter(|(offset, _)| *offset == ws)
            .count();
        assert_eq!(selects, 2);
    }

    #[test]
    fn test_conditions_word() {
        let (mut transport, map) = setup(6, 2, 1);
        let mut lut = LutMemory::new(&mut transport, &map);
        lut.write_conditions_lut_word(1, 3, 0x8000_0001).unwrap();
        let ws = map.word_select().offset;
        let offset = map.conditions_lut_offset(1);
        assert_eq!(transport.writes(), &[(ws, 3), (offset, 0x8000_0001)]);
        assert_eq!(transport.conditions_word(3, 1), 0x8000_0001);
        assert_eq!(transport.conditions_word(3, 0), 0);
    }

    #[test]
    fn test_out_of_range() {
        let (mut transport, map) = setup(2, 1, 1);
        let mut lut = LutMemory::new(&mut transport, &map);
        assert!(matches!(
            lut.write_states_lut_word(4, 0, 0),
            Err(Error::Row { row: 4, states: 4 })
        ));
        assert!(matches!(
            lut.write_states_lut_word(0, 1, 0),
            Err(Error::Slot { slot: 1, words: 1 })
        ));
        assert!(matches!(
            lut.write_conditions_lut_word(1, 0, 0),
            Err(Error::Block { block: 1, blocks: 1 })
        ));
        assert!(matches!(
            lut.write_conditions_lut_word(0, 2, 0),
            Err(Error::Combination { .. })
        ));
        assert!(transport.writes().is_empty());
    }
}
