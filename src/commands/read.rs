//! Live reading command handler.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use photon_reader::{
    setup_interrupt_handler, CancellationSource, ConsoleDisplay, SessionConfig,
    SessionController, SessionError, TerminalKeys,
};
use photon_transport::{AmplificationLevel, HidDiscovery};

use super::CommandResult;
use crate::cli::Cli;

/// Configure the sensor, then show readings until cancelled
pub fn run(cli: &Cli) -> CommandResult {
    let config = SessionConfig {
        vendor_id: cli.vendor_id,
        interface_number: cli.interface_filter(),
        amplification: AmplificationLevel::new(cli.amp).context("invalid --amp")?,
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
    };

    let interrupted = setup_interrupt_handler();
    let discovery = HidDiscovery::new();
    let mut display = ConsoleDisplay::new();
    // Raw mode starts with the first key poll and ends when `cancel` drops
    let mut cancel = CancellationSource::new(TerminalKeys::new(), interrupted);

    let result = SessionController::new(&discovery, &mut cancel, &mut display, config).run();
    drop(cancel);

    match result {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e @ SessionError::NotFound { .. }) => Ok(ExitCode::from(e.exit_code())),
        Err(e @ SessionError::Open(_)) => {
            eprintln!("ERROR: {e}");
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
