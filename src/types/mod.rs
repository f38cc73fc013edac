//! Core types for meter readings.
//!
//! - [`FramePacket`] is one extracted frame as it leaves a provider
//! - [`Message`] is a decoded frame, its body laid out according to [`Shape`]
//! - [`Timestamp`] is the meter's local wall-clock time
//! - [`MeterIdentity`] accumulates who the meter is over many messages
//! - [`UpdateRate`] controls how often subscribers see new messages
//!
//! ```rust
//! use kraft::types::{Message, Shape};
//!
//! let message = Message {
//!     shape: Some(Shape::Minimal),
//!     active_power_positive: Some(850),
//!     ..Default::default()
//! };
//! let json = serde_json::to_string(&message).unwrap();
//! assert!(json.contains("\"ActivePowerPositive\":850"));
//! ```

mod frame;
mod identity;
mod message;
mod timestamp;
mod update_rate;

pub use frame::FramePacket;
pub use identity::{IdentityTracker, MeterIdentity};
pub use message::{Message, Phase, Shape};
pub use timestamp::{TIMESTAMP_LEN, Timestamp};
pub use update_rate::UpdateRate;
