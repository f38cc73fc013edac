//! Frame packets handed from providers to the driver.

use std::sync::Arc;
use std::time::Instant;

/// One extracted frame, not yet decoded.
///
/// This is the unit that flows out of a [`Provider`](crate::provider::Provider).
/// Decoded messages are derived from it.
#[derive(Debug, Clone)]
pub struct FramePacket {
    /// Frame bytes starting at the format/length field, sentinels excluded.
    pub data: Arc<[u8]>,

    /// Position of this frame in the provider's output, starting at 0.
    pub sequence: u64,

    /// When the provider finished extracting the frame.
    pub received_at: Instant,
}

impl FramePacket {
    pub fn new(data: Vec<u8>, sequence: u64) -> Self {
        Self { data: data.into(), sequence, received_at: Instant::now() }
    }

    /// Frame bytes as a hex string, for logging.
    pub fn hex(&self) -> String {
        hex::encode(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_dump_of_frame() {
        let packet = FramePacket::new(vec![0xa0, 0x03, 0x7e], 4);
        assert_eq!(packet.hex(), "a0037e");
        assert_eq!(packet.sequence, 4);
    }
}
