//! The PFSM bitstream container and the bit layout of its LUT words
//!
//! A bitstream is a flat sequence of big-endian 32-bit words. The states LUT comes first,
//! `words_per_state_row` words for every state in order, with word slot `i` holding bits
//! `[32i, 32i + 32)` of the row. The conditions LUT follows, one word per block of 32 states
//! for every input combination, where bit `k` of block `b` belongs to state `32b + k`.
use crate::params::{
    HardwareParameters,
    DATA_W,
    WORD_BYTES,
};
use flate2::bufread::GzDecoder;
use std::{
    io::{
        Read,
        Write,
    },
    path::Path,
};
use thiserror::Error;

const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Bitstream length {0} is not a whole number of 32-bit words")]
    Ragged(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitstream {
    bytes: Vec<u8>,
    md5: [u8; 16],
}

impl Bitstream {
    /// Wrap raw bitstream bytes
    /// # Errors
    /// Returns an error if the bytes don't split into whole words
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        if bytes.len() % WORD_BYTES != 0 {
            return Err(Error::Ragged(bytes.len()));
        }
        let md5 = md5::compute(&bytes).into();
        Ok(Self { bytes, md5 })
    }

    /// Build a bitstream out of a sequence of LUT words
    #[must_use]
    pub fn from_words<I>(words: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let bytes: Vec<u8> = words.into_iter().flat_map(u32::to_be_bytes).collect();
        let md5 = md5::compute(&bytes).into();
        Self { bytes, md5 }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Iterate over the big-endian words of the bitstream
    pub fn words(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes
            .chunks_exact(WORD_BYTES)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
    }

    #[must_use]
    pub fn md5(&self) -> &[u8; 16] {
        &self.md5
    }

    #[must_use]
    pub fn md5_string(&self) -> String {
        self.md5.iter().map(|&v| format!("{v:02x}")).collect()
    }
}

/// Reads a bitstream file, decompressing it first if it was gzipped
/// # Errors
/// Returns an error on IO failures or if the contents aren't whole words
pub fn read_bitstream_file<T>(filename: T) -> Result<Bitstream, Error>
where
    T: AsRef<Path>,
{
    let contents = std::fs::read(filename)?;
    if contents.len() >= GZIP_MAGIC.len() && contents[..GZIP_MAGIC.len()] == GZIP_MAGIC {
        let mut z = GzDecoder::new(&contents[..]);
        let mut decompressed = vec![];
        z.read_to_end(&mut decompressed)?;
        return Bitstream::from_bytes(decompressed);
    }
    Bitstream::from_bytes(contents)
}

/// Writes the raw bytes of a bitstream to `filename`
/// # Errors
/// Returns an error on IO failures
pub fn write_bitstream_file<T>(filename: T, bitstream: &Bitstream) -> Result<(), Error>
where
    T: AsRef<Path>,
{
    let mut file = std::fs::File::create(filename)?;
    file.write_all(bitstream.bytes())?;
    Ok(())
}

/// One decoded row of the states LUT
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct StateRow {
    pub next_state: u32,
    pub output: u64,
}

impl StateRow {
    /// Pack the row as `(next_state << output_w) | output`, least significant word first
    #[must_use]
    pub fn pack(&self, params: &HardwareParameters) -> Vec<u32> {
        let row = (u128::from(self.next_state & params.state_mask()) << params.output_w())
            | u128::from(self.output & params.output_mask());
        (0..params.words_per_state_row())
            .map(|i| {
                #[allow(clippy::cast_possible_truncation)]
                let word = (row >> (DATA_W as usize * i)) as u32;
                word
            })
            .collect()
    }

    /// Inverse of [`StateRow::pack`]. Missing trailing words read as zero.
    #[must_use]
    pub fn unpack(words: &[u32], params: &HardwareParameters) -> Self {
        let row = words
            .iter()
            .take(params.words_per_state_row())
            .enumerate()
            .fold(0u128, |acc, (i, &w)| {
                acc | (u128::from(w) << (DATA_W as usize * i))
            });
        #[allow(clippy::cast_possible_truncation)]
        let next_state = (row >> params.output_w()) as u32 & params.state_mask();
        #[allow(clippy::cast_possible_truncation)]
        let output = row as u64 & params.output_mask();
        Self { next_state, output }
    }
}
