//! Loading a bitstream into the LUT memories of a PFSM core
//!
//! A bitstream is a flat run of big-endian 32-bit words. The states LUT comes first, row by row
//! with every word slot of a row in order. The conditions LUT follows, one word per block of 32
//! states for every input combination. Once every word is written the FSM is pulsed through
//! soft reset so it starts from state 0.

use crate::{
    core::AddressMap,
    lut::{
        self,
        LutMemory,
    },
    registers,
    transport::Transport,
};
use indicatif::ProgressBar;
use pfsm_utils::params::WORD_BYTES;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Bitstream is {actual} bytes but the core needs exactly {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Region of {size} bytes doesn't cover the {needed} byte register window")]
    RegionTooSmall { size: usize, needed: usize },
    #[error(transparent)]
    Lut(#[from] lut::Error),
}

impl From<registers::Error> for Error {
    fn from(value: registers::Error) -> Self {
        Error::Lut(value.into())
    }
}

pub type ProgramResult<T> = Result<T, Error>;

/// Drives the LUT memories and soft reset of a core to load a whole bitstream
#[derive(Debug)]
pub struct Programmer<'a, T> {
    lut: LutMemory<'a, T>,
    bar: ProgressBar,
}

impl<'a, T> Programmer<'a, T>
where
    T: Transport,
{
    pub fn new(transport: &'a mut T, map: &'a AddressMap) -> Self {
        Self {
            lut: LutMemory::new(transport, map),
            bar: ProgressBar::hidden(),
        }
    }

    /// Report every LUT word written on `bar`
    #[must_use]
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.bar = bar;
        self
    }

    /// Program the whole FSM from `bitstream`, returning the number of bytes consumed. The
    /// length, and that the transport reaches every register, are checked before anything is
    /// written.
    ///
    /// A transport failure partway through leaves the LUTs partially written. Pulse soft reset
    /// and program again to recover.
    /// # Errors
    /// Returns an error if the length doesn't match the core's parameters, if the region is too
    /// small, or on transport errors
    pub fn program(&mut self, bitstream: &[u8]) -> ProgramResult<usize> {
        let regs = self.lut.registers();
        let size = regs.transport_size();
        let needed = regs.map().window_len();
        if size < needed {
            return Err(Error::RegionTooSmall { size, needed });
        }
        let params = *regs.map().params();
        let expected = params.bitstream_len();
        if bitstream.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: bitstream.len(),
            });
        }
        info!(
            bytes = expected,
            state_w = params.state_w(),
            input_w = params.input_w(),
            output_w = params.output_w(),
            "Programming PFSM"
        );
        self.bar.set_length((expected / WORD_BYTES) as u64);
        self.bar.set_message("Writing LUTs");

        let mut words = bitstream
            .chunks_exact(WORD_BYTES)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]));
        let mut consumed = 0;

        for row in 0..params.states() {
            for slot in 0..params.words_per_state_row() {
                // The length check guarantees there are enough words
                let value = words.next().unwrap_or_default();
                consumed += WORD_BYTES;
                self.lut.write_states_lut_word(row, slot, value)?;
                self.bar.inc(1);
            }
        }
        for combination in 0..params.input_combinations() {
            for block in 0..params.condition_blocks() {
                let value = words.next().unwrap_or_default();
                consumed += WORD_BYTES;
                self.lut.write_conditions_lut_word(block, combination, value)?;
                self.bar.inc(1);
            }
        }
        self.bar.finish();

        self.lut.registers().pulse_soft_reset()?;
        info!(bytes = consumed, "Programmed PFSM");
        Ok(consumed)
    }
}
