//! Provider trait for frame sources

use std::time::Duration;

use super::types::FramePacket;
use crate::Result;

/// Trait for meter frame sources
///
/// Providers abstract over where bytes come from (serial port, capture file,
/// any async reader) and handle their own timing. Each provider owns its own
/// frame extractor, so frames come out whole and in order.
#[async_trait::async_trait]
pub trait Provider: Send + 'static {
    /// Get the next extracted frame
    ///
    /// Returns:
    /// - `Ok(Some(packet))` - New frame available
    /// - `Ok(None)` - Source ended (normal termination)
    /// - `Err(e)` - Transport error; the driver may call again after backing off
    async fn next_frame(&mut self) -> Result<Option<FramePacket>>;

    /// Expected time between frames, if the source has a fixed cadence.
    ///
    /// Used to decide whether a subscription needs throttling at all.
    fn nominal_interval(&self) -> Option<Duration>;
}
