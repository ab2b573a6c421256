//! Drives the register-file model through a short gradient and gate
//! sequence, logging output changes to CSV and the waveform to VCD.
//!
//! Run with: `cargo run --example register_loopback [config.yaml]`

use std::error::Error;

use marga_sim::models::regfile::reg;
use marga_sim::models::{LatencyProfile, RegisterFileModel};
use marga_sim::{SimConfig, SimConfigBuilder, SimulationBuilder};

fn main() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfigBuilder::new()
            .max_sim_time(1_000_000)
            .csv_output("register_loopback.csv")
            .trace_output("register_loopback.vcd")
            .build()?,
    };
    marga_sim::init_logging(&config.simulation.log_level);

    let model = RegisterFileModel::with_latency(LatencyProfile::new(1, 2));
    let mut bus = SimulationBuilder::new(model).config(config).build()?;

    // Open the gates and ramp the x gradient
    bus.write_reg(reg::GPIO as u32, 0x0000_0103)?;
    for step in 0..8u32 {
        bus.write_reg(reg::OCRA1_X as u32, step * 0x2000)?;
        bus.write_reg(reg::FHDO_XY as u32, (step << 16) | (step * 0x1000))?;
    }
    bus.write_reg(reg::TX0 as u32, 0x4000_7fff)?;
    bus.write_reg(reg::GPIO as u32, 0)?;

    for index in [reg::GPIO, reg::OCRA1_X, reg::TX0] {
        let value = bus.read_reg(index as u32)?;
        println!("reg {:2} = {:#010x}", index, value);
    }

    let stats = bus.export_stats();
    bus.finish()?;
    print!("{}", stats.summary());
    Ok(())
}
