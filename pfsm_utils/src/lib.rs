//! # PFSM Utilities
//!
//! This small library contains the file formats around PFSM (programmable finite state machine)
//! accelerators: the hardware parameters of a core, the bitstream that programs its LUT memories,
//! and the FSM descriptions those bitstreams are generated from.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bitstream;
pub mod fsm;
pub mod params;
