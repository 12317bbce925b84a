//! In this example, we will map the register window of a PFSM core through `/dev/mem` and program
//! it with a bitstream file, or with an FSM description compiled on the fly.
//!
//! Usage: `program_local <base address> <state_w> <input_w> <output_w> <file>`

use indicatif::ProgressBar;
use pfsm::prelude::*;
use pfsm_utils::fsm::read_fsm_file;
use std::path::Path;
use tracing_subscriber::{
    fmt,
    EnvFilter,
};

fn parse_addr(s: &str) -> anyhow::Result<u64> {
    Ok(match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16)?,
        None => s.parse()?,
    })
}

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let [_, base, state_w, input_w, output_w, file] = args.as_slice() else {
        anyhow::bail!("Usage: program_local <base address> <state_w> <input_w> <output_w> <file>");
    };
    let params = HardwareParameters::new(state_w.parse()?, input_w.parse()?, output_w.parse()?)?;
    let map = AddressMap::new(params);

    let config = LocalConfig {
        path: "/dev/mem".into(),
        base_addr: parse_addr(base)?,
        size: usize::try_from(map.end())?,
    };
    let mut platform = Platform::new();
    let device = platform.probe_local(params, &config)?;

    // FSM descriptions get compiled, everything else is taken as a bitstream
    let bitstream = if Path::new(file).extension().is_some_and(|ext| ext == "fsm") {
        read_fsm_file(file)?.generate_bitstream()?
    } else {
        read_bitstream_file(file)?
    };
    println!("Bitstream md5 {}", bitstream.md5_string());

    let mut session = device.open()?;
    println!("PFSM {}", session.registers().read_version()?.version_string());
    let consumed = session
        .programmer()
        .with_progress(ProgressBar::new(0))
        .program(bitstream.bytes())?;
    println!(
        "Programmed {consumed} bytes, now in state {}",
        session.registers().read_current_state()?
    );
    session.release();
    Ok(())
}
