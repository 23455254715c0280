//! Device discovery for PhotonWarrior28 sensors

use std::ffi::CString;

use hidapi::HidApi;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::hid_device::HidReportTransport;
use crate::types::{DiscoveredDevice, TransportDeviceInfo};
use crate::ReportTransport;

/// Device discovery abstraction
pub trait DeviceDiscovery {
    /// Transport produced by `open_device`
    type Transport: ReportTransport;

    /// Snapshot of every currently attached device
    fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError>;

    /// Open a specific device
    fn open_device(&self, device: &DiscoveredDevice) -> Result<Self::Transport, TransportError>;

    /// First device matching `vid` and, if given, `interface_number`
    ///
    /// Enumeration failures are logged and reported as "nothing found".
    fn find(&self, vid: u16, interface_number: Option<i32>) -> Option<DiscoveredDevice> {
        let devices = match self.list_devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Device enumeration failed: {}", e);
                return None;
            }
        };

        let found = devices
            .into_iter()
            .find(|d| d.info.matches(vid, interface_number) && !d.info.device_path.is_empty());
        match &found {
            Some(dev) => info!("Matched device at {}", dev.info.device_path),
            None => debug!(
                "No device with VID={:04X} interface={:?}",
                vid, interface_number
            ),
        }
        found
    }
}

/// HID device discovery backed by hidapi
#[derive(Debug, Default)]
pub struct HidDiscovery;

impl HidDiscovery {
    /// Create a new HID discovery instance
    pub fn new() -> Self {
        Self
    }
}

/// hidapi reports -1 when the interface is unknown
fn interface_from_raw(raw: i32) -> Option<i32> {
    (raw >= 0).then_some(raw)
}

impl DeviceDiscovery for HidDiscovery {
    type Transport = HidReportTransport;

    fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        // New HidApi per call, no cached device list
        let api = HidApi::new()?;
        let devices: Vec<DiscoveredDevice> = api
            .device_list()
            .map(|d| {
                let info = TransportDeviceInfo {
                    vid: d.vendor_id(),
                    pid: d.product_id(),
                    interface_number: interface_from_raw(d.interface_number()),
                    device_path: d.path().to_string_lossy().to_string(),
                    serial: d.serial_number().map(|s| s.to_string()),
                    product_name: d.product_string().map(|s| s.to_string()),
                };
                debug!(
                    "Found device: VID={:04X} PID={:04X} if={:?} path={}",
                    info.vid, info.pid, info.interface_number, info.device_path
                );
                DiscoveredDevice { info }
            })
            .collect();

        debug!("Enumerated {} HID devices", devices.len());
        Ok(devices)
    }

    fn open_device(&self, device: &DiscoveredDevice) -> Result<HidReportTransport, TransportError> {
        let api = HidApi::new()?;
        let path = CString::new(device.info.device_path.as_str())
            .map_err(|e| TransportError::DeviceNotFound(format!("invalid path: {e}")))?;

        let hid = api.open_path(&path)?;
        // Only hand out the handle once it is non-blocking
        hid.set_blocking_mode(false)?;

        info!(
            "Opened {:04X}:{:04X} at {}",
            device.info.vid, device.info.pid, device.info.device_path
        );
        Ok(HidReportTransport::new(hid, device.info.clone()))
    }
}
