//! A library for programming and accessing PFSM (programmable finite state machine) cores
//!
//! A core is reached through a [`transport::Transport`], either a memory mapped register window
//! ([`transport::local::Local`]) or a simulation ([`transport::mock::Mock`]). Cores are
//! enumerated by a [`platform::Platform`] and used through exclusive [`session::Session`]s.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod core;
pub mod lut;
pub mod platform;
pub mod prelude;
pub mod program;
pub mod registers;
pub mod session;
pub mod transport;

pub use pfsm_utils;
