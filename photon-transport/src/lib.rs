//! Transport abstraction layer for PhotonWarrior28 sensor communication
//!
//! Splits device access into two seams:
//!
//! - [`DeviceDiscovery`]: enumerate attached HID devices and open one
//! - [`ReportTransport`]: an exclusively owned, non-blocking report channel
//!
//! The HID backends live in [`HidDiscovery`] and [`HidReportTransport`].

pub mod error;
pub mod protocol;
pub mod types;

mod discovery;
mod hid_device;

pub use discovery::{DeviceDiscovery, HidDiscovery};
pub use error::TransportError;
pub use hid_device::HidReportTransport;
pub use protocol::{AmplificationLevel, ControlReport, StatusReport, REPORT_SIZE};
pub use types::{DiscoveredDevice, TransportDeviceInfo};

/// An open report channel to one device
///
/// Methods that touch the device take `&mut self`, so a single owner issues
/// every read and write. Implementations must release the device in `close`
/// and treat repeated calls as no-ops.
pub trait ReportTransport {
    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;

    /// Serial number string reported by the device, if any
    fn serial(&self) -> Option<String>;

    /// Send one control report
    ///
    /// # Returns
    /// Number of bytes the backend accepted (0 means nothing was sent)
    fn write_control(&mut self, report: &ControlReport) -> Result<usize, TransportError>;

    /// Attempt one status read without blocking
    ///
    /// # Returns
    /// `None` when no report is pending
    fn read_status(&mut self) -> Result<Option<StatusReport>, TransportError>;

    /// Check if the handle is still open
    fn is_open(&self) -> bool;

    /// Release the device
    fn close(&mut self);
}
