//! HID report transport for a directly attached sensor

use hidapi::HidDevice;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::protocol::{ControlReport, StatusReport, REPORT_SIZE};
use crate::types::TransportDeviceInfo;
use crate::ReportTransport;

/// HID transport over a non-blocking hidapi handle
///
/// Built by [`crate::HidDiscovery`] after the handle is switched to
/// non-blocking mode. The handle is released on `close` or drop.
pub struct HidReportTransport {
    device: Option<HidDevice>,
    info: TransportDeviceInfo,
    buf: [u8; REPORT_SIZE],
}

impl HidReportTransport {
    pub(crate) fn new(device: HidDevice, info: TransportDeviceInfo) -> Self {
        Self {
            device: Some(device),
            info,
            buf: [0u8; REPORT_SIZE],
        }
    }

    fn device(&self) -> Result<&HidDevice, TransportError> {
        self.device.as_ref().ok_or(TransportError::Closed)
    }
}

impl ReportTransport for HidReportTransport {
    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    fn serial(&self) -> Option<String> {
        self.device()
            .ok()?
            .get_serial_number_string()
            .ok()
            .flatten()
            .or_else(|| self.info.serial.clone())
    }

    fn write_control(&mut self, report: &ControlReport) -> Result<usize, TransportError> {
        let bytes = report.to_bytes();
        debug!("Writing control report: {:02X?}", bytes);
        Ok(self.device()?.write(&bytes)?)
    }

    fn read_status(&mut self) -> Result<Option<StatusReport>, TransportError> {
        let device = self.device.as_ref().ok_or(TransportError::Closed)?;
        let len = device.read(&mut self.buf)?;
        if len == 0 {
            return Ok(None);
        }
        trace!("Read {} bytes: {:02X?}", len, &self.buf[..len.min(8)]);
        StatusReport::parse(&self.buf[..len]).map(Some)
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            debug!("Closed {}", self.info.device_path);
        }
    }
}

impl Drop for HidReportTransport {
    fn drop(&mut self) {
        self.close();
    }
}
