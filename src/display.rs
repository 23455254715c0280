// Console output for a reading session

use std::io::{self, Write};

use crossterm::style::Stylize;
use photon_transport::protocol::device;
use photon_transport::{TransportDeviceInfo, TransportError};

use crate::cancel::CancelReason;
use crate::session::StopReason;

/// Sink for everything the session reports to the operator
pub trait StatusDisplay {
    /// No matching device; `available` is the full enumeration
    fn not_found(
        &mut self,
        vendor_id: u16,
        interface_number: Option<i32>,
        available: &[TransportDeviceInfo],
    );

    fn device_found(&mut self, info: &TransportDeviceInfo);

    fn serial(&mut self, serial: Option<&str>);

    /// Control write failed; `None` means zero bytes were written
    fn write_failed(&mut self, error: Option<&TransportError>);

    /// Amplification echoed back after the control write
    fn amplification(&mut self, value: u16);

    fn polling_started(&mut self);

    /// Replace the live value with `value`
    fn data(&mut self, value: u16);

    fn stopped(&mut self, reason: StopReason);
}

/// Colored terminal output, on stdout by default
///
/// Lines end in `\r\n` because the poll loop runs with the terminal in raw
/// mode.
#[derive(Debug)]
pub struct ConsoleDisplay<W: Write = io::Stdout> {
    out: W,
    live: bool,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out, live: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: impl std::fmt::Display) {
        if self.live {
            write!(self.out, "\r\n").ok();
            self.live = false;
        }
        write!(self.out, "{text}\r\n").ok();
        self.out.flush().ok();
    }
}

impl<W: Write> StatusDisplay for ConsoleDisplay<W> {
    fn not_found(
        &mut self,
        vendor_id: u16,
        interface_number: Option<i32>,
        available: &[TransportDeviceInfo],
    ) {
        let iface = interface_number.map_or_else(|| "any".to_string(), |n| n.to_string());
        self.line(format!(
            "ERROR: {} with Vendor-ID {} (0x{:04X}) and interface {} not found!",
            device::NAME,
            vendor_id,
            vendor_id,
            iface
        ));
        self.line("Available devices:");
        for info in available {
            self.line(format!("  {info}"));
        }
    }

    fn device_found(&mut self, info: &TransportDeviceInfo) {
        self.line("");
        self.line(format!(
            "{} detected: {}",
            device::NAME,
            info.device_path.as_str().cyan()
        ));
        self.line("");
    }

    fn serial(&mut self, serial: Option<&str>) {
        self.line(format!("Serial No: {}", serial.unwrap_or("n/a").magenta()));
        self.line("");
        self.line("---SPACEBAR or CTRL+C to exit---");
        self.line("");
    }

    fn write_failed(&mut self, error: Option<&TransportError>) {
        match error {
            Some(e) => self.line(format!("Write error: {e}")),
            None => self.line("Write failed or wrote 0 bytes"),
        }
    }

    fn amplification(&mut self, value: u16) {
        self.line(format!("Amplification: {}", format!("{value:#06x}").yellow()));
    }

    fn polling_started(&mut self) {}

    fn data(&mut self, value: u16) {
        write!(self.out, "\rData: {}", format!("{value:4}").green()).ok();
        self.out.flush().ok();
        self.live = true;
    }

    fn stopped(&mut self, reason: StopReason) {
        self.line("");
        match reason {
            StopReason::Cancelled(CancelReason::Spacebar) => {
                self.line("Spacebar detected – loop terminated.")
            }
            StopReason::Cancelled(CancelReason::Interrupt) => {
                self.line("Interrupted with Ctrl+C – closed cleanly.")
            }
            StopReason::Disconnected => self.line("Device disconnected – closed."),
        }
    }
}
