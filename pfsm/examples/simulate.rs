//! In this example, we will compile a small FSM description, load it into a simulated core, and
//! clock it against a few inputs.

use pfsm::prelude::*;
use pfsm_utils::fsm::parse_fsm;
use tracing_subscriber::{
    fmt,
    EnvFilter,
};

const BLINKER: &str = "#!/bin/pfsm
?params 2 1 2
# Alternate the outputs until the input goes high, then park in `halt`
?state on 0x1
?state off 0x2 1 halt
?state back 0x0 - on
?state halt 0x3 - halt
?quit
";

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let fsm = parse_fsm(BLINKER)?;
    let params = *fsm.params();

    let mut platform = Platform::new();
    platform.probe(params, Mock::new(AddressMap::new(params)))?;
    let device = platform.find("pfsm0").ok_or_else(|| anyhow::anyhow!("Device went missing"))?;

    let mut session = device.open()?;
    let consumed = session.program_fsm(&fsm)?;
    println!("Programmed {consumed} bytes");
    println!("Version {}", session.registers().read_version()?.version_string());
    println!("Current state {}", session.registers().read_current_state()?);
    session.release();

    let mut mock = platform
        .remove(0)
        .ok_or_else(|| anyhow::anyhow!("Device went missing"))?
        .into_transport();
    for input in [0, 0, 0, 0, 1, 0, 0] {
        let state = mock.step(input);
        println!("in={input} -> state {state}, out={:#04b}", mock.output());
    }
    Ok(())
}
