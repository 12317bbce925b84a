//! The synthesis-time widths of a PFSM core and every size derived from them

use thiserror::Error;

/// Width in bits of the CPU data bus, and so of every LUT memory word
pub const DATA_W: u32 = 32;
/// Number of bytes in one LUT memory word
pub const WORD_BYTES: usize = (DATA_W / 8) as usize;

pub const MAX_STATE_W: u32 = 16;
pub const MAX_INPUT_W: u32 = 16;
pub const MAX_OUTPUT_W: u32 = 64;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("State width must be in 1..=16, got {0}")]
    StateWidth(u32),
    #[error("Input width must be in 1..=16, got {0}")]
    InputWidth(u32),
    #[error("Output width must be in 1..=64, got {0}")]
    OutputWidth(u32),
}

/// The bit widths a PFSM instance was built with. These never change for a given device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HardwareParameters {
    state_w: u32,
    input_w: u32,
    output_w: u32,
}

impl HardwareParameters {
    /// Validate and construct a set of hardware parameters
    /// # Errors
    /// Returns an error if any width is zero or larger than the supported maximum
    pub fn new(state_w: u32, input_w: u32, output_w: u32) -> Result<Self, Error> {
        if !(1..=MAX_STATE_W).contains(&state_w) {
            return Err(Error::StateWidth(state_w));
        }
        if !(1..=MAX_INPUT_W).contains(&input_w) {
            return Err(Error::InputWidth(input_w));
        }
        if !(1..=MAX_OUTPUT_W).contains(&output_w) {
            return Err(Error::OutputWidth(output_w));
        }
        Ok(Self {
            state_w,
            input_w,
            output_w,
        })
    }

    #[must_use]
    pub fn state_w(&self) -> u32 {
        self.state_w
    }

    #[must_use]
    pub fn input_w(&self) -> u32 {
        self.input_w
    }

    #[must_use]
    pub fn output_w(&self) -> u32 {
        self.output_w
    }

    /// Number of addressable states, `2^state_w`
    #[must_use]
    pub fn states(&self) -> usize {
        1 << self.state_w
    }

    /// Number of distinct input combinations, `2^input_w`
    #[must_use]
    pub fn input_combinations(&self) -> usize {
        1 << self.input_w
    }

    /// Mask selecting the valid bits of a state value
    #[must_use]
    pub fn state_mask(&self) -> u32 {
        // state_w <= 16, so this never overflows
        (1 << self.state_w) - 1
    }

    /// Mask selecting the valid bits of an output value
    #[must_use]
    pub fn output_mask(&self) -> u64 {
        u64::MAX >> (64 - self.output_w)
    }

    /// Width of one states LUT row: the next state followed by the outputs
    #[must_use]
    pub fn state_row_bits(&self) -> u32 {
        self.state_w + self.output_w
    }

    /// Number of 32-bit words per states LUT row, `ceil((state_w + output_w) / 32)`
    #[must_use]
    pub fn words_per_state_row(&self) -> usize {
        self.state_row_bits().div_ceil(DATA_W) as usize
    }

    /// Number of 32-state blocks per conditions LUT plane, `ceil(2^state_w / 32)`
    #[must_use]
    pub fn condition_blocks(&self) -> usize {
        self.states().div_ceil(DATA_W as usize)
    }

    /// Total 32-bit words in the states LUT
    #[must_use]
    pub fn states_lut_words(&self) -> usize {
        self.states() * self.words_per_state_row()
    }

    /// Total 32-bit words in the conditions LUT
    #[must_use]
    pub fn conditions_lut_words(&self) -> usize {
        self.input_combinations() * self.condition_blocks()
    }

    /// The exact length in bytes of a bitstream for these parameters
    #[must_use]
    pub fn bitstream_len(&self) -> usize {
        WORD_BYTES * (self.states_lut_words() + self.conditions_lut_words())
    }
}
