//! Error types for meter reading.
//!
//! Two layers:
//!
//! - [`DecodeError`] is local to one frame. The decoder reports it together
//!   with the partially decoded message as [`PartialDecode`]; callers log and
//!   drop the frame.
//! - [`MeterError`] covers everything around the decoder: opening devices,
//!   reading captures, configuration and publishing.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use kraft::MeterError;
//!
//! let error = MeterError::serial_failed("/dev/ttyUSB0", std::io::Error::other("busy"));
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::codec::FieldKind;
use crate::types::Message;

/// Result type alias for meter operations.
pub type Result<T, E = MeterError> = std::result::Result<T, E>;

/// Why a frame could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEndOfData { needed: usize, remaining: usize },

    #[error("wrong tag for {expected:?} item: found {found:#04x}")]
    WrongTag { expected: FieldKind, found: u8 },

    #[error("unsupported item count {0}")]
    UnsupportedShape(u8),

    #[error("timestamp blob too short: {len} bytes")]
    MalformedTimestamp { len: usize },

    #[error("{remaining} bytes left after checksum")]
    TrailingData { remaining: usize },
}

/// A failed decode and the fields read before the failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct PartialDecode {
    #[source]
    pub error: DecodeError,
    pub partial: Box<Message>,
}

impl PartialDecode {
    pub fn into_error(self) -> DecodeError {
        self.error
    }
}

/// Main error type for meter operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MeterError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("capture file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serial port error: {device}")]
    Serial {
        device: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("frame decode failed")]
    Decode(#[from] DecodeError),

    #[error("invalid configuration: {reason}")]
    Config {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("meter connection failed: {reason}")]
    Connection { reason: String },

    #[error("publish to {topic} failed")]
    Publish {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl MeterError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            MeterError::Io(_) => true,
            MeterError::Serial { .. } => true,
            MeterError::Connection { .. } => true,
            MeterError::Publish { .. } => true,
            MeterError::Timeout { .. } => true,
            MeterError::File { .. } => false,
            MeterError::Decode(_) => false,
            MeterError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            MeterError::Io(_) => vec![
                "Check that the meter cable is connected",
                "Verify the device is not claimed by another process",
            ],
            MeterError::File { .. } => vec![
                "Check file exists and is readable",
                "Verify the capture holds raw bytes from the meter port",
            ],
            MeterError::Serial { .. } => vec![
                "Check the device path",
                "Verify permissions on the serial device",
                "Confirm the line speed matches the meter (usually 2400)",
            ],
            MeterError::Decode(_) => vec![
                "Wait for the next frame",
                "Check line settings if every frame fails (8E1)",
            ],
            MeterError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Compare values against the documented defaults",
            ],
            MeterError::Connection { .. } => vec![
                "Reopen the meter connection",
                "Check that the reader task is still running",
            ],
            MeterError::Publish { .. } => vec![
                "Check that the output sink is still open",
                "Retry publishing with the next reading",
            ],
            MeterError::Timeout { .. } => vec![
                "Increase timeout duration",
                "Verify the meter is sending data",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeterError::File { path: path.into(), source }
    }

    /// Helper constructor for serial port errors.
    pub fn serial_failed(
        device: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        MeterError::Serial { device: device.into(), source: source.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        MeterError::Config { reason: reason.into(), source: None }
    }

    /// Helper constructor for configuration errors with source.
    pub fn config_with_source(
        reason: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        MeterError::Config { reason: reason.into(), source: Some(source.into()) }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        MeterError::Connection { reason: reason.into() }
    }

    /// Helper constructor for publish errors.
    pub fn publish_failed(
        topic: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        MeterError::Publish { topic: topic.into(), source: source.into() }
    }
}

impl From<PartialDecode> for MeterError {
    fn from(err: PartialDecode) -> Self {
        MeterError::Decode(err.error)
    }
}
