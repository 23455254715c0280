//! Integration tests for the session lifecycle.
//!
//! These drive `SessionController` end to end against a fake device:
//! discovery, open, control write, echo read, polling and close, with
//! scripted keyboard input and interrupt flags standing in for the operator.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use photon_reader::{
    CancelReason, CancellationSource, InterruptFlag, KeyPress, KeySource, SessionConfig,
    SessionController, SessionError, SessionState, StatusDisplay, StopReason,
};
use photon_transport::{
    AmplificationLevel, ControlReport, DeviceDiscovery, DiscoveredDevice, ReportTransport,
    StatusReport, TransportDeviceInfo, TransportError,
};

// ── Fakes ──

#[derive(Default)]
struct Probe {
    opened: usize,
    closed: usize,
    writes: Vec<[u8; 2]>,
    reads: usize,
}

type SharedProbe = Rc<RefCell<Probe>>;
type ReadResult = Result<Option<StatusReport>, TransportError>;

fn status(data: u16) -> ReadResult {
    Ok(Some(StatusReport {
        data,
        reserved: 0,
        amplification: 0,
    }))
}

fn empty() -> ReadResult {
    Ok(None)
}

struct FakeTransport {
    info: TransportDeviceInfo,
    reads: VecDeque<ReadResult>,
    write_result: Option<Result<usize, TransportError>>,
    echo: bool,
    interrupt_at: Option<(usize, InterruptFlag)>,
    open: bool,
    probe: SharedProbe,
}

impl ReportTransport for FakeTransport {
    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    fn serial(&self) -> Option<String> {
        Some("PW28-0001".into())
    }

    fn write_control(&mut self, report: &ControlReport) -> Result<usize, TransportError> {
        self.probe.borrow_mut().writes.push(report.to_bytes());
        if self.echo {
            self.reads.push_front(Ok(Some(StatusReport {
                data: 0,
                reserved: 0,
                amplification: report.level().value() as u16,
            })));
        }
        self.write_result.take().unwrap_or(Ok(2))
    }

    fn read_status(&mut self) -> ReadResult {
        assert!(self.open, "read on closed handle");
        let count = {
            let mut probe = self.probe.borrow_mut();
            probe.reads += 1;
            probe.reads
        };
        if let Some((at, flag)) = &self.interrupt_at {
            if count == *at {
                flag.store(true, Ordering::SeqCst);
            }
        }
        self.reads.pop_front().unwrap_or(Ok(None))
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.probe.borrow_mut().closed += 1;
        }
    }
}

struct FakeDiscovery {
    devices: Vec<DiscoveredDevice>,
    transport: RefCell<Option<FakeTransport>>,
    open_fails: bool,
    probe: SharedProbe,
}

impl DeviceDiscovery for FakeDiscovery {
    type Transport = FakeTransport;

    fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        Ok(self.devices.clone())
    }

    fn open_device(&self, device: &DiscoveredDevice) -> Result<FakeTransport, TransportError> {
        if self.open_fails {
            return Err(TransportError::HidPermissionDenied(
                device.info.device_path.clone(),
            ));
        }
        let mut transport = self
            .transport
            .borrow_mut()
            .take()
            .expect("device opened twice");
        transport.info = device.info.clone();
        self.probe.borrow_mut().opened += 1;
        Ok(transport)
    }
}

/// Cancels with a space press once `checks` empty checks have passed
struct SpaceAfter {
    checks: usize,
    seen: usize,
}

impl SpaceAfter {
    fn new(checks: usize) -> Self {
        Self { checks, seen: 0 }
    }
}

impl KeySource for SpaceAfter {
    fn poll_key(&mut self) -> io::Result<Option<KeyPress>> {
        if self.seen >= self.checks {
            return Ok(Some(KeyPress::Char(' ')));
        }
        self.seen += 1;
        Ok(None)
    }
}

struct NoKeys;

impl KeySource for NoKeys {
    fn poll_key(&mut self) -> io::Result<Option<KeyPress>> {
        Ok(None)
    }
}

#[derive(Default)]
struct RecordingDisplay {
    not_found: Option<(u16, Option<i32>, Vec<TransportDeviceInfo>)>,
    found: Option<String>,
    write_failures: usize,
    amplification: Option<u16>,
    live: Option<u16>,
    renders: usize,
    stopped: Option<StopReason>,
}

impl StatusDisplay for RecordingDisplay {
    fn not_found(&mut self, vid: u16, iface: Option<i32>, available: &[TransportDeviceInfo]) {
        self.not_found = Some((vid, iface, available.to_vec()));
    }

    fn device_found(&mut self, info: &TransportDeviceInfo) {
        self.found = Some(info.device_path.clone());
    }

    fn serial(&mut self, _serial: Option<&str>) {}

    fn write_failed(&mut self, _error: Option<&TransportError>) {
        self.write_failures += 1;
    }

    fn amplification(&mut self, value: u16) {
        self.amplification = Some(value);
    }

    fn polling_started(&mut self) {}

    fn data(&mut self, value: u16) {
        self.live = Some(value);
        self.renders += 1;
    }

    fn stopped(&mut self, reason: StopReason) {
        self.stopped = Some(reason);
    }
}

// ── Harness ──

fn device(vid: u16, iface: Option<i32>, path: &str) -> DiscoveredDevice {
    DiscoveredDevice {
        info: TransportDeviceInfo {
            vid,
            pid: 0x0028,
            interface_number: iface,
            device_path: path.into(),
            serial: None,
            product_name: Some("Test".into()),
        },
    }
}

fn sensor() -> DiscoveredDevice {
    device(0x07C0, Some(0), "/dev/hidraw-sensor")
}

fn fake(devices: Vec<DiscoveredDevice>, reads: Vec<ReadResult>) -> FakeDiscovery {
    let probe = SharedProbe::default();
    let transport = FakeTransport {
        info: sensor().info,
        reads: reads.into(),
        write_result: None,
        echo: false,
        interrupt_at: None,
        open: true,
        probe: Rc::clone(&probe),
    };
    FakeDiscovery {
        devices,
        transport: RefCell::new(Some(transport)),
        open_fails: false,
        probe,
    }
}

fn config(level: u8) -> SessionConfig {
    SessionConfig {
        amplification: AmplificationLevel::new(level).unwrap(),
        poll_interval: Duration::ZERO,
        ..SessionConfig::default()
    }
}

fn run<K: KeySource>(
    discovery: &FakeDiscovery,
    keys: K,
    interrupted: InterruptFlag,
    config: SessionConfig,
) -> (
    Result<photon_reader::SessionOutcome, SessionError>,
    RecordingDisplay,
) {
    let mut cancel = CancellationSource::new(keys, interrupted);
    let mut display = RecordingDisplay::default();
    let mut controller = SessionController::new(discovery, &mut cancel, &mut display, config);
    let result = controller.run();
    assert_eq!(controller.state(), SessionState::Terminated);
    (result, display)
}

fn flag() -> InterruptFlag {
    Arc::new(AtomicBool::new(false))
}

// ── Locating ──

#[test]
fn not_found_lists_every_device() {
    let others = vec![
        device(0x046D, Some(0), "/dev/hidraw0"),
        device(0x3151, Some(2), "/dev/hidraw1"),
        device(0x07C1, None, "/dev/hidraw2"),
    ];
    let discovery = fake(others.clone(), vec![]);
    let (result, display) = run(&discovery, NoKeys, flag(), config(4));

    assert!(matches!(
        result,
        Err(SessionError::NotFound {
            vendor_id: 0x07C0,
            interface_number: Some(0)
        })
    ));
    let (vid, iface, listed) = display.not_found.expect("diagnostic listing");
    assert_eq!((vid, iface), (0x07C0, Some(0)));
    let expected: Vec<_> = others.into_iter().map(|d| d.info).collect();
    assert_eq!(listed, expected);
    assert_eq!(discovery.probe.borrow().opened, 0);
}

#[test]
fn wrong_interface_is_not_a_match() {
    let discovery = fake(vec![device(0x07C0, Some(1), "/dev/hidraw3")], vec![]);
    let (result, _) = run(&discovery, NoKeys, flag(), config(4));
    assert!(matches!(result, Err(SessionError::NotFound { .. })));
}

#[test]
fn first_match_in_enumeration_order_is_opened() {
    let devices = vec![
        device(0x046D, Some(0), "/dev/hidraw0"),
        device(0x07C0, Some(0), "/dev/hidraw-first"),
        device(0x07C0, Some(0), "/dev/hidraw-second"),
    ];
    let discovery = fake(devices, vec![]);
    let (result, display) = run(&discovery, SpaceAfter::new(0), flag(), config(4));
    assert!(result.is_ok());
    assert_eq!(display.found.as_deref(), Some("/dev/hidraw-first"));
}

#[test]
fn any_interface_matches_vendor_only() {
    let discovery = fake(vec![device(0x07C0, None, "/dev/hidraw9")], vec![]);
    let config = SessionConfig {
        interface_number: None,
        ..config(4)
    };
    let (result, _) = run(&discovery, SpaceAfter::new(0), flag(), config);
    assert!(result.is_ok());
}

// ── Opening ──

#[test]
fn open_failure_is_fatal_and_nothing_to_close() {
    let mut discovery = fake(vec![sensor()], vec![]);
    discovery.open_fails = true;
    let (result, display) = run(&discovery, NoKeys, flag(), config(4));

    let err = result.unwrap_err();
    assert!(matches!(err, SessionError::Open(_)));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(discovery.probe.borrow().closed, 0);
    assert!(display.stopped.is_none());
}

#[test]
fn out_of_range_levels_never_reach_a_device() {
    for level in 9..=u8::MAX {
        assert!(AmplificationLevel::new(level).is_err());
    }
}

// ── Configuring ──

#[test]
fn control_report_carries_level_and_echo_is_reported() {
    for level in 0..=8u8 {
        let discovery = fake(vec![sensor()], vec![]);
        discovery.transport.borrow_mut().as_mut().unwrap().echo = true;
        let (result, display) = run(&discovery, SpaceAfter::new(0), flag(), config(level));

        let outcome = result.unwrap();
        assert_eq!(discovery.probe.borrow().writes, vec![[0x00, level]]);
        assert!(outcome.write_ok);
        assert_eq!(outcome.amplification_echo, Some(level as u16));
        assert_eq!(display.amplification, Some(level as u16));
    }
}

#[test]
fn missing_echo_is_not_an_error() {
    let discovery = fake(vec![sensor()], vec![empty()]);
    let (result, display) = run(&discovery, SpaceAfter::new(0), flag(), config(4));
    assert_eq!(result.unwrap().amplification_echo, None);
    assert_eq!(display.amplification, None);
}

#[test]
fn write_error_still_polls() {
    let discovery = fake(vec![sensor()], vec![empty(), status(11), status(12)]);
    discovery.transport.borrow_mut().as_mut().unwrap().write_result =
        Some(Err(TransportError::HidError("stall".into())));
    let (result, display) = run(&discovery, SpaceAfter::new(2), flag(), config(4));

    let outcome = result.unwrap();
    assert!(!outcome.write_ok);
    assert_eq!(display.write_failures, 1);
    assert_eq!(outcome.last_value, Some(12));
    assert_eq!(discovery.probe.borrow().closed, 1);
}

#[test]
fn zero_byte_write_is_reported() {
    let discovery = fake(vec![sensor()], vec![]);
    discovery.transport.borrow_mut().as_mut().unwrap().write_result = Some(Ok(0));
    let (result, display) = run(&discovery, SpaceAfter::new(1), flag(), config(4));
    assert!(!result.unwrap().write_ok);
    assert_eq!(display.write_failures, 1);
}

// ── Polling ──

#[test]
fn live_value_is_latest_report_not_accumulated() {
    let reads = vec![
        empty(), // echo read
        status(10),
        empty(),
        empty(),
        status(20),
        empty(),
        status(30),
        empty(),
        empty(),
    ];
    let discovery = fake(vec![sensor()], reads);
    let (result, display) = run(&discovery, SpaceAfter::new(8), flag(), config(4));

    let outcome = result.unwrap();
    assert_eq!(outcome.reports_read, 3);
    assert_eq!(outcome.last_value, Some(30));
    assert_eq!(display.live, Some(30));
    assert_eq!(display.renders, 3);
}

#[test]
fn cancel_is_checked_before_each_read() {
    let discovery = fake(vec![sensor()], vec![empty(), status(1), status(2), status(3)]);
    let (result, _) = run(&discovery, SpaceAfter::new(2), flag(), config(4));

    // one echo read plus exactly two polled reads
    assert_eq!(discovery.probe.borrow().reads, 3);
    assert_eq!(result.unwrap().last_value, Some(2));
}

#[test]
fn transient_read_error_counts_as_empty() {
    let reads = vec![
        empty(),
        Err(TransportError::HidError("overrun".into())),
        Err(TransportError::ShortReport {
            expected: 6,
            actual: 2,
        }),
        status(7),
    ];
    let discovery = fake(vec![sensor()], reads);
    let (result, _) = run(&discovery, SpaceAfter::new(4), flag(), config(4));

    let outcome = result.unwrap();
    assert_eq!(outcome.stop, StopReason::Cancelled(CancelReason::Spacebar));
    assert_eq!(outcome.last_value, Some(7));
}

#[test]
fn disconnect_escalates_to_close() {
    let reads = vec![empty(), status(5), Err(TransportError::Disconnected)];
    let discovery = fake(vec![sensor()], reads);
    let (result, display) = run(&discovery, NoKeys, flag(), config(4));

    let outcome = result.unwrap();
    assert_eq!(outcome.stop, StopReason::Disconnected);
    assert_eq!(outcome.last_value, Some(5));
    assert_eq!(display.stopped, Some(StopReason::Disconnected));
    assert_eq!(discovery.probe.borrow().closed, 1);
}

// ── Closing ──

#[test]
fn space_at_any_point_closes_exactly_once() {
    for checks in 0..6 {
        let reads = (0..10).map(|i| if i % 2 == 0 { empty() } else { status(i) });
        let discovery = fake(vec![sensor()], reads.collect());
        let (result, display) = run(&discovery, SpaceAfter::new(checks), flag(), config(4));

        let outcome = result.expect("cancelled session is a clean exit");
        assert_eq!(outcome.stop, StopReason::Cancelled(CancelReason::Spacebar));
        assert_eq!(display.stopped, Some(outcome.stop));
        let probe = discovery.probe.borrow();
        assert_eq!(probe.opened, 1);
        assert_eq!(probe.closed, 1, "checks={checks}");
    }
}

#[test]
fn out_of_band_interrupt_closes_exactly_once() {
    let interrupted = flag();
    let discovery = fake(vec![sensor()], vec![empty(), status(1), status(2)]);
    discovery.transport.borrow_mut().as_mut().unwrap().interrupt_at =
        Some((4, Arc::clone(&interrupted)));
    let (result, _) = run(&discovery, NoKeys, interrupted, config(4));

    let outcome = result.unwrap();
    assert_eq!(outcome.stop, StopReason::Cancelled(CancelReason::Interrupt));
    assert_eq!(discovery.probe.borrow().reads, 4);
    assert_eq!(discovery.probe.borrow().closed, 1);
}

#[test]
fn interrupt_before_polling_still_closes() {
    let interrupted = flag();
    interrupted.store(true, Ordering::SeqCst);
    let discovery = fake(vec![sensor()], vec![]);
    let (result, _) = run(&discovery, NoKeys, interrupted, config(4));

    let outcome = result.unwrap();
    assert_eq!(outcome.stop, StopReason::Cancelled(CancelReason::Interrupt));
    assert_eq!(outcome.reports_read, 0);
    assert_eq!(discovery.probe.borrow().closed, 1);
}
