//! Command handlers for the CLI application.
//!
//! - `read`: configure the sensor and show live readings (default)
//! - `utility`: device listing

pub mod read;
pub mod utility;

use std::process::ExitCode;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<ExitCode>;

/// Initialize logging on stderr so the live stdout line stays intact
pub fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
