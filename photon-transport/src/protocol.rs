//! Protocol constants and report layouts for PhotonWarrior28 sensors

use std::fmt;

use crate::error::TransportError;

/// Device identification
pub mod device {
    /// PhotonWarrior28 USB vendor ID (1984 decimal)
    pub const VENDOR_ID: u16 = 0x07C0;
    /// Interface carrying the sensor reports
    pub const INTERFACE_NUMBER: i32 = 0;
    /// Human-readable device name
    pub const NAME: &str = "PhotonWarrior28";
}

/// Size of an inbound status report
pub const REPORT_SIZE: usize = 64;

/// Report ID of the outbound control report
pub const CONTROL_REPORT_ID: u8 = 0x00;

/// Byte offsets of the little-endian u16 fields in a status report
pub mod offset {
    /// Primary data value
    pub const DATA: usize = 0;
    /// Unused by the device firmware
    pub const RESERVED: usize = 2;
    /// Amplification echo after a control write
    pub const AMPLIFICATION: usize = 4;
}

/// Shortest report that still carries every consumed field
pub const MIN_STATUS_LEN: usize = offset::AMPLIFICATION + 2;

/// Amplification level in the range 0..=8
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmplificationLevel(u8);

impl AmplificationLevel {
    pub const MAX: u8 = 8;

    /// Validate a raw level
    pub fn new(level: u8) -> Result<Self, TransportError> {
        if level > Self::MAX {
            return Err(TransportError::InvalidParameter(format!(
                "amplification {level} out of range 0..={}",
                Self::MAX
            )));
        }
        Ok(Self(level))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for AmplificationLevel {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u8> for AmplificationLevel {
    type Error = TransportError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl fmt::Display for AmplificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound control report: `[report_id, level]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlReport {
    level: AmplificationLevel,
}

impl ControlReport {
    pub fn new(level: AmplificationLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> AmplificationLevel {
        self.level
    }

    /// Wire bytes
    pub fn to_bytes(&self) -> [u8; 2] {
        [CONTROL_REPORT_ID, self.level.value()]
    }
}

/// Inbound status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    /// Primary data value (offset 0)
    pub data: u16,
    /// Reserved field (offset 2)
    pub reserved: u16,
    /// Amplification echo (offset 4)
    pub amplification: u16,
}

impl StatusReport {
    /// Parse the fields consumed by the host from a raw report
    pub fn parse(buf: &[u8]) -> Result<Self, TransportError> {
        if buf.len() < MIN_STATUS_LEN {
            return Err(TransportError::ShortReport {
                expected: MIN_STATUS_LEN,
                actual: buf.len(),
            });
        }
        let word = |at: usize| u16::from_le_bytes([buf[at], buf[at + 1]]);
        Ok(Self {
            data: word(offset::DATA),
            reserved: word(offset::RESERVED),
            amplification: word(offset::AMPLIFICATION),
        })
    }
}
