//! Utility command handlers.

use std::process::ExitCode;

use photon_transport::DeviceDiscovery;

use super::CommandResult;

/// List all HID devices
pub fn list(discovery: &impl DeviceDiscovery) -> CommandResult {
    let devices = discovery.list_devices()?;
    println!("All HID devices:");
    for dev in &devices {
        println!("  {}  path={}", dev.info, dev.info.device_path);
    }
    Ok(ExitCode::SUCCESS)
}
