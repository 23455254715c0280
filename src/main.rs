//! PhotonWarrior28 reader CLI
//!
//! Writes the amplification level once, then shows the sensor value live
//! until SPACE or Ctrl+C.

use std::process::ExitCode;

use clap::Parser;
use photon_transport::HidDiscovery;

mod cli;
use cli::{Cli, Commands};

mod commands;

fn main() -> ExitCode {
    let cli = Cli::parse();
    commands::init_logging(&cli.log_level);

    let result = match cli.command {
        None => commands::read::run(&cli),
        Some(Commands::List) => commands::utility::list(&HidDiscovery::new()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}
