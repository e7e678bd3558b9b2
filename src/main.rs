use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use optisim::settings::{self, CliArgs};
use optisim::simulation::Simulation;

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logger(args.log_level.into());

    let settings = settings::load_config(&args)?;
    println!("{}", settings);

    let mut simulation = Simulation::new(settings)?;
    simulation.solve()?;
    simulation.writeup()?;

    Ok(())
}

/// Initialize the logger with the specified level. `RUST_LOG` still applies per module.
fn init_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
