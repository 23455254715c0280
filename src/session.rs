//! Session controller: locate, open, configure, poll, close.
//!
//! One thread drives the whole lifecycle:
//!
//! ```text
//! Locating -> Opening -> ConfiguringDevice -> Polling -> Closing -> Terminated
//!     \-> Terminated (not found)   \-> Terminated (open failed)
//! ```
//!
//! Once a device is open it is held by [`OpenSession`], which closes it on
//! every exit path, including unwinding.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use photon_transport::protocol::device;
use photon_transport::{
    AmplificationLevel, ControlReport, DeviceDiscovery, ReportTransport, TransportError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cancel::{CancelReason, CancellationSource, KeySource};
use crate::display::StatusDisplay;

/// Default minimum time per poll iteration
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Parameters for one session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub vendor_id: u16,
    /// `None` accepts any interface of the vendor
    pub interface_number: Option<i32>,
    pub amplification: AmplificationLevel,
    /// Minimum iteration time of the poll loop (zero = no pacing)
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            vendor_id: device::VENDOR_ID,
            interface_number: Some(device::INTERFACE_NUMBER),
            amplification: AmplificationLevel::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Lifecycle states, logged on each transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Locating,
    Opening,
    ConfiguringDevice,
    Polling,
    Closing,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Locating => "locating",
            Self::Opening => "opening",
            Self::ConfiguringDevice => "configuring",
            Self::Polling => "polling",
            Self::Closing => "closing",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Why polling ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled(CancelReason),
    Disconnected,
}

/// Summary of a session that reached the poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub stop: StopReason,
    /// Whether the control write reported success
    pub write_ok: bool,
    /// Amplification echoed by the first read after the write
    pub amplification_echo: Option<u16>,
    /// Status reports received while polling
    pub reports_read: u64,
    /// Data value of the most recent status report
    pub last_value: Option<u16>,
}

/// Failures that end a session before polling starts
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no device with vendor 0x{vendor_id:04X} and interface {interface_number:?}")]
    NotFound {
        vendor_id: u16,
        interface_number: Option<i32>,
    },

    #[error("Can not open/connect {name}: {0}", name = device::NAME)]
    Open(#[source] TransportError),
}

impl SessionError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Owns an open transport and closes it when dropped
pub struct OpenSession<T: ReportTransport> {
    transport: T,
}

impl<T: ReportTransport> OpenSession<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Close explicitly; the drop that follows is a no-op
    pub fn close(mut self) {
        self.transport.close();
    }
}

impl<T: ReportTransport> Drop for OpenSession<T> {
    fn drop(&mut self) {
        if self.transport.is_open() {
            self.transport.close();
        }
    }
}

/// Drives one device session from discovery to close
pub struct SessionController<'a, D, K, S> {
    discovery: &'a D,
    cancel: &'a mut CancellationSource<K>,
    display: &'a mut S,
    config: SessionConfig,
    state: SessionState,
}

impl<'a, D, K, S> SessionController<'a, D, K, S>
where
    D: DeviceDiscovery,
    K: KeySource,
    S: StatusDisplay,
{
    pub fn new(
        discovery: &'a D,
        cancel: &'a mut CancellationSource<K>,
        display: &'a mut S,
        config: SessionConfig,
    ) -> Self {
        Self {
            discovery,
            cancel,
            display,
            config,
            state: SessionState::Locating,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run the whole lifecycle
    pub fn run(&mut self) -> Result<SessionOutcome, SessionError> {
        let vendor_id = self.config.vendor_id;
        let interface_number = self.config.interface_number;

        let Some(found) = self.discovery.find(vendor_id, interface_number) else {
            let available: Vec<_> = self
                .discovery
                .list_devices()
                .unwrap_or_default()
                .into_iter()
                .map(|d| d.info)
                .collect();
            self.display
                .not_found(vendor_id, interface_number, &available);
            self.transition(SessionState::Terminated);
            return Err(SessionError::NotFound {
                vendor_id,
                interface_number,
            });
        };
        self.display.device_found(&found.info);

        self.transition(SessionState::Opening);
        let transport = match self.discovery.open_device(&found) {
            Ok(transport) => transport,
            Err(e) => {
                self.transition(SessionState::Terminated);
                return Err(SessionError::Open(e));
            }
        };
        let mut session = OpenSession::new(transport);
        let serial = session.transport().serial();
        self.display.serial(serial.as_deref());

        self.transition(SessionState::ConfiguringDevice);
        let (write_ok, amplification_echo) = self.configure(session.transport());

        self.transition(SessionState::Polling);
        self.display.polling_started();
        let (stop, reports_read, last_value) = self.poll(session.transport());

        self.transition(SessionState::Closing);
        session.close();
        self.display.stopped(stop);
        self.transition(SessionState::Terminated);

        info!(
            "Session ended ({:?}) after {} reports",
            stop, reports_read
        );
        Ok(SessionOutcome {
            stop,
            write_ok,
            amplification_echo,
            reports_read,
            last_value,
        })
    }

    /// Write the control report once, then try one read for the echo
    fn configure(&mut self, transport: &mut D::Transport) -> (bool, Option<u16>) {
        let report = ControlReport::new(self.config.amplification);
        // Write failures are reported but polling still goes ahead
        let write_ok = match transport.write_control(&report) {
            Ok(0) => {
                warn!("Control write sent 0 bytes");
                self.display.write_failed(None);
                false
            }
            Ok(n) => {
                debug!("Control write sent {} bytes", n);
                true
            }
            Err(e) => {
                warn!("Control write failed: {}", e);
                self.display.write_failed(Some(&e));
                false
            }
        };

        let echo = match transport.read_status() {
            Ok(Some(status)) => {
                self.display.amplification(status.amplification);
                Some(status.amplification)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("No amplification echo: {}", e);
                None
            }
        };
        (write_ok, echo)
    }

    fn poll(&mut self, transport: &mut D::Transport) -> (StopReason, u64, Option<u16>) {
        let interval = self.config.poll_interval;
        let mut reports_read = 0u64;
        let mut last_value = None;

        let stop = loop {
            let started = Instant::now();

            if let Some(reason) = self.cancel.poll_cancel_requested() {
                break StopReason::Cancelled(reason);
            }

            match transport.read_status() {
                Ok(Some(status)) => {
                    reports_read += 1;
                    last_value = Some(status.data);
                    self.display.data(status.data);
                }
                Ok(None) => {}
                Err(e) if e.is_disconnect() => {
                    warn!("Device lost while polling: {}", e);
                    break StopReason::Disconnected;
                }
                Err(e) => debug!("Read error treated as empty: {}", e),
            }

            pace(started, interval);
        };

        (stop, reports_read, last_value)
    }
}

/// Sleep out the rest of `interval` if the iteration finished early
fn pace(started: Instant, interval: Duration) {
    if let Some(rest) = interval.checked_sub(started.elapsed()) {
        if !rest.is_zero() {
            thread::sleep(rest);
        }
    }
}
