//! FSM descriptions and the generator that compiles them into PFSM bitstreams
//!
//! An FSM is an ordered list of [`Record`]s, one per state. Each cycle, a state either jumps to
//! its transition target (when the inputs match its condition) or falls through to the next
//! state.

mod parse;

pub use parse::{
    parse_fsm,
    read_fsm_file,
    FileError,
};

use crate::{
    bitstream::{
        Bitstream,
        StateRow,
    },
    params::HardwareParameters,
};
use kstring::KString;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("{records} records don't fit in {states} states")]
    TooManyRecords { records: usize, states: usize },
    #[error("State `{0}` not found")]
    UnknownLabel(KString),
    #[error("No record {record}, the FSM has {records}")]
    NoSuchRecord { record: usize, records: usize },
    #[error("State `{0}` is defined more than once")]
    DuplicateLabel(KString),
    #[error("Condition `{condition}` must be {input_w} characters of 0, 1 or -")]
    BadCondition { condition: String, input_w: u32 },
    #[error("Output {output:#x} of `{label}` doesn't fit in {output_w} bits")]
    OutputTooWide {
        label: KString,
        output: u64,
        output_w: u32,
    },
}

/// An input condition, written most significant bit first with `-` as "don't care"
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Condition {
    mask: u32,
    value: u32,
}

impl Condition {
    /// Parse a condition string like `--10` for an FSM with `input_w` input bits
    /// # Errors
    /// Returns an error if the string has the wrong length or an unknown character
    pub fn parse(condition: &str, input_w: u32) -> Result<Self, Error> {
        let bad = || Error::BadCondition {
            condition: condition.to_owned(),
            input_w,
        };
        if condition.len() != input_w as usize {
            return Err(bad());
        }
        let mut mask = 0;
        let mut value = 0;
        for c in condition.chars() {
            mask <<= 1;
            value <<= 1;
            match c {
                '0' => mask |= 1,
                '1' => {
                    mask |= 1;
                    value |= 1;
                }
                '-' => (),
                _ => return Err(bad()),
            }
        }
        Ok(Self { mask, value })
    }

    /// Does the input combination `input` satisfy this condition
    #[must_use]
    pub fn matches(&self, input: u32) -> bool {
        input & self.mask == self.value
    }
}

/// A conditional jump out of a state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub condition: Condition,
    pub next: KString,
}

/// One state of the FSM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub label: KString,
    pub output: u64,
    /// Without a transition the state always advances to the following one
    pub transition: Option<Transition>,
}

/// A complete FSM for a PFSM core with the given parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsmProgram {
    params: HardwareParameters,
    records: Vec<Record>,
}

impl FsmProgram {
    #[must_use]
    pub fn new(params: HardwareParameters) -> Self {
        Self {
            params,
            records: vec![],
        }
    }

    #[must_use]
    pub fn params(&self) -> &HardwareParameters {
        &self.params
    }

    pub fn add_record(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn set_records(&mut self, records: Vec<Record>) {
        self.records = records;
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[allow(clippy::cast_possible_truncation)]
    fn labels(&self) -> Result<HashMap<&KString, u32>, Error> {
        let mut labels = HashMap::new();
        for (idx, record) in self.records.iter().enumerate() {
            if labels.insert(&record.label, idx as u32).is_some() {
                return Err(Error::DuplicateLabel(record.label.clone()));
            }
        }
        Ok(labels)
    }

    /// The state `record` moves to when it sees the input combination `input`
    /// # Errors
    /// Returns an error if there is no such record or the transition targets an unknown label
    #[allow(clippy::cast_possible_truncation)]
    pub fn next_state(&self, record: usize, input: u32) -> Result<u32, Error> {
        let current = self.records.get(record).ok_or(Error::NoSuchRecord {
            record,
            records: self.records.len(),
        })?;
        let fallthrough = (record as u32 + 1) & self.params.state_mask();
        match &current.transition {
            Some(Transition { condition, next }) if condition.matches(input) => self
                .records
                .iter()
                .position(|r| &r.label == next)
                .map(|p| p as u32)
                .ok_or_else(|| Error::UnknownLabel(next.clone())),
            _ => Ok(fallthrough),
        }
    }

    /// Compile the FSM into the states LUT and conditions LUT words of a bitstream
    /// # Errors
    /// Returns an error on malformed records
    #[allow(clippy::cast_possible_truncation)]
    pub fn generate_bitstream(&self) -> Result<Bitstream, Error> {
        let params = &self.params;
        if self.records.len() > params.states() {
            return Err(Error::TooManyRecords {
                records: self.records.len(),
                states: params.states(),
            });
        }
        let labels = self.labels()?;

        let mut states_lut = Vec::with_capacity(params.states_lut_words());
        let blocks = params.condition_blocks();
        let mut conditions_lut = vec![0u32; params.conditions_lut_words()];

        for state in 0..params.states() {
            let Some(record) = self.records.get(state) else {
                // Unused states are never reached, so they encode as zero
                states_lut.extend(StateRow::default().pack(params));
                continue;
            };
            if record.output & !params.output_mask() != 0 {
                return Err(Error::OutputTooWide {
                    label: record.label.clone(),
                    output: record.output,
                    output_w: params.output_w(),
                });
            }
            let mut row = StateRow {
                next_state: 0,
                output: record.output,
            };
            if let Some(Transition { condition, next }) = &record.transition {
                row.next_state = *labels
                    .get(next)
                    .ok_or_else(|| Error::UnknownLabel(next.clone()))?;
                for input in 0..params.input_combinations() {
                    if condition.matches(input as u32) {
                        conditions_lut[input * blocks + state / 32] |= 1 << (state % 32);
                    }
                }
            }
            states_lut.extend(row.pack(params));
        }

        Ok(Bitstream::from_words(
            states_lut.into_iter().chain(conditions_lut),
        ))
    }
}
