//! spishim - Linux spidev access tool
//!
//! Opens a `/dev/spidevX.Y` node with a fixed configuration and runs a
//! single operation against it:
//! - `probe`: open, report the applied configuration, close
//! - `xfer`: write bytes, then read bytes under one chip select
//! - `write`: clock out bytes, discarding what comes back
//! - `write-byte`: plain write(2) of one byte

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger, RUST_LOG overrides the verbosity flags
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut dev = spishim_linux_spi::open_device_string(&cli.device)?;

    let result = match cli.command {
        Commands::Probe => {
            println!("{}", commands::run_probe(&dev));
            Ok(())
        }
        Commands::Xfer { tx, rx_len } => {
            commands::run_xfer(&mut dev, &tx.0, rx_len as usize).map(|rx| println!("{}", rx))
        }
        Commands::Write { tx } => commands::run_write(&mut dev, &tx.0),
        Commands::WriteByte { value } => commands::run_write_byte(&mut dev, value),
    };

    dev.close();

    result.map_err(Into::into)
}
