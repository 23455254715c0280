// CLI definitions using clap

use clap::{Parser, Subcommand};
use photon_transport::protocol::device;

#[derive(Parser)]
#[command(name = "photon-reader")]
#[command(author, version, about = "PhotonWarrior28 HID reader/writer")]
pub struct Cli {
    /// Amplification level (0..8)
    #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(0..=8))]
    pub amp: u8,

    /// USB vendor ID (decimal or 0x-prefixed hex)
    #[arg(long, default_value = "0x07C0", value_parser = parse_u16)]
    pub vendor_id: u16,

    /// USB interface number
    #[arg(long, default_value_t = device::INTERFACE_NUMBER, conflicts_with = "any_interface")]
    pub interface: i32,

    /// Match the first device of the vendor regardless of interface
    #[arg(long)]
    pub any_interface: bool,

    /// Minimum time per poll iteration in milliseconds (0 = busy-poll)
    #[arg(long, default_value_t = 1)]
    pub poll_interval_ms: u64,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Interface filter, `None` when any interface is accepted
    pub fn interface_filter(&self) -> Option<i32> {
        (!self.any_interface).then_some(self.interface)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all attached HID devices
    #[command(visible_alias = "ls")]
    List,
}

/// Parse a u16 given in decimal or with a 0x prefix
fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid vendor id '{s}': {e}"))
}
