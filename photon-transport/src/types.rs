//! Common types for transport layer

use std::fmt;

/// Device identification information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportDeviceInfo {
    /// USB Vendor ID
    pub vid: u16,
    /// USB Product ID
    pub pid: u16,
    /// USB interface number (`None` when the platform does not report one)
    pub interface_number: Option<i32>,
    /// Platform device path
    pub device_path: String,
    /// Serial number if available
    pub serial: Option<String>,
    /// Product name if available
    pub product_name: Option<String>,
}

impl TransportDeviceInfo {
    /// Check whether this device matches a vendor and, optionally, an interface
    pub fn matches(&self, vid: u16, interface_number: Option<i32>) -> bool {
        if self.vid != vid {
            return false;
        }
        match interface_number {
            Some(iface) => self.interface_number == Some(iface),
            None => true,
        }
    }
}

impl fmt::Display for TransportDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let iface = match self.interface_number {
            Some(n) => n.to_string(),
            None => "-".to_string(),
        };
        write!(
            f,
            "Vendor-ID: {} (0x{:04X}), Interface: {}, Product: {}",
            self.vid,
            self.vid,
            iface,
            self.product_name.as_deref().unwrap_or("Unknown")
        )
    }
}

/// Discovered device that can be opened
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// Device information
    pub info: TransportDeviceInfo,
}
