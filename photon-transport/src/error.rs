//! Transport error types

use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("Device is closed")]
    Closed,

    #[error("Short report: expected at least {expected} bytes, got {actual}")]
    ShortReport { expected: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // HID-specific errors
    #[error("HID error: {0}")]
    HidError(String),

    #[error("HID permission denied: {0}")]
    HidPermissionDenied(String),
}

impl TransportError {
    /// Whether the device is gone and further reads are pointless
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Closed)
    }

    /// Classify a raw hidapi message
    fn from_message(msg: String) -> Self {
        if msg.contains("Permission denied") || msg.contains("EPERM") {
            TransportError::HidPermissionDenied(msg)
        } else if msg.contains("No such device")
            || msg.contains("ENODEV")
            || msg.contains("disconnected")
            || msg.contains("Input/output error")
        {
            TransportError::Disconnected
        } else {
            TransportError::HidError(msg)
        }
    }
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        Self::from_message(e.to_string())
    }
}
