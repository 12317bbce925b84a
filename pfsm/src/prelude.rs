//! Prelude (helpful reexports) for this package

pub use crate::{
    core::AddressMap,
    platform::Platform,
    session::{
        Device,
        Session,
    },
    transport::{
        local::{
            Local,
            LocalConfig,
        },
        mock::Mock,
        Transport,
    },
};
pub use pfsm_utils::{
    bitstream::{
        read_bitstream_file,
        Bitstream,
    },
    fsm::{
        read_fsm_file,
        FsmProgram,
    },
    params::HardwareParameters,
};
pub use std::io::SeekFrom;
