//! Frame extraction and decoding for Kaifa power meter HAN port data.
//!
//! Kaifa meters push a DLMS/COSEM list over their HAN port every few seconds,
//! wrapped in HDLC-style frames. This crate finds those frames in a raw byte
//! stream, decodes them into typed [`Message`]s, and publishes the readings.
//!
//! # Features
//!
//! - **Frame extraction**: Resynchronizing extractor fed with arbitrary chunks
//! - **Decoding**: All six list shapes, with partial results on failure
//! - **Async sources**: Serial port, captured replay, or any `AsyncRead`
//! - **Publication**: State, Home Assistant discovery and per-feature values
//!
//! # Quick Start
//!
//! ## Example (decoding a capture)
//!
//! ```rust,no_run
//! use kraft::codec::{FrameReader, decode_frame};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = std::fs::File::open("capture.bin")?;
//!     let mut reader = FrameReader::new(file);
//!
//!     while let Some(frame) = reader.next_frame()? {
//!         match decode_frame(&frame) {
//!             Ok(message) => println!("{}", serde_json::to_string(&message)?),
//!             Err(e) => eprintln!("skipping frame: {e}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Example (live meter)
//!
//! ```rust,no_run
//! use kraft::{Kraft, UpdateRate};
//! use kraft::config::SerialConfig;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> kraft::Result<()> {
//!     let connection = Kraft::open_serial(&SerialConfig::default()).await?;
//!     let mut messages = connection.subscribe(UpdateRate::Native);
//!
//!     while let Some(message) = messages.next().await {
//!         println!("Import: {:?} W", message.active_power_positive);
//!     }
//!     Ok(())
//! }
//! ```

// Core decoding
pub mod codec;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Stream-based meter architecture
pub mod connection;
pub mod driver;
pub mod provider;
pub mod providers;
pub mod stream;

// Application layer
pub mod config;
pub mod publish;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use config::KraftConfig;
pub use connection::MeterConnection;

use config::{ReplayConfig, SerialConfig};
use std::sync::Arc;

/// Unified entry point for meter connections.
///
/// # Examples
///
/// ## Serial port
/// ```rust,no_run
/// use kraft::Kraft;
/// use kraft::config::SerialConfig;
///
/// #[tokio::main]
/// async fn main() -> kraft::Result<()> {
///     let connection = Kraft::open_serial(&SerialConfig::default()).await?;
///     // Use connection...
///     Ok(())
/// }
/// ```
///
/// ## Capture replay
/// ```rust,no_run
/// use kraft::Kraft;
/// use kraft::config::ReplayConfig;
///
/// #[tokio::main]
/// async fn main() -> kraft::Result<()> {
///     let connection = Kraft::open_replay(&ReplayConfig::new("capture.bin")).await?;
///     // Use connection...
///     Ok(())
/// }
/// ```
pub struct Kraft;

impl Kraft {
    /// Read from a meter on a serial port.
    ///
    /// The port is opened 8E1 at the configured speed and drained for the
    /// configured period before decoding starts.
    ///
    /// # Errors
    ///
    /// Returns [`MeterError::Serial`] if the device cannot be opened or
    /// configured.
    pub async fn open_serial(config: &SerialConfig) -> Result<MeterConnection> {
        MeterConnection::open_serial(config).await
    }

    /// Replay a raw capture file.
    ///
    /// # Errors
    ///
    /// Returns [`MeterError::File`] if the file cannot be read.
    pub async fn open_replay(config: &ReplayConfig) -> Result<MeterConnection> {
        MeterConnection::open_replay(config).await
    }

    /// Replay bytes already in memory.
    ///
    /// Must be called inside a tokio runtime.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> MeterConnection {
        MeterConnection::from_provider(providers::ReplayProvider::from_bytes(data))
    }
}
