//! Replay provider for captured meter output

use std::sync::Arc;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::codec::FrameExtractor;
use crate::config::ReplayConfig;
use crate::provider::Provider;
use crate::types::FramePacket;
use crate::{MeterError, Result};

const DEFAULT_CHUNK_SIZE: usize = 64;

/// Replays a raw byte capture as if it came off the serial port.
///
/// Bytes are fed to the extractor in fixed-size chunks, so frames split
/// across reads are exercised the same way as on a real line. With a frame
/// interval set, frames are paced like a live meter.
pub struct ReplayProvider {
    /// Captured bytes
    data: Arc<[u8]>,

    /// Bytes already handed to the extractor
    offset: usize,

    chunk_size: usize,
    extractor: FrameExtractor,

    /// Frame pacing, created on the first frame
    frame_interval: Option<Duration>,
    pacing: Option<Interval>,

    sequence: u64,
}

impl ReplayProvider {
    /// Replay bytes held in memory.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            offset: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            extractor: FrameExtractor::new(),
            frame_interval: None,
            pacing: None,
            sequence: 0,
        }
    }

    /// Read a capture file.
    pub async fn open(config: &ReplayConfig) -> Result<Self> {
        let data = tokio::fs::read(&config.path)
            .await
            .map_err(|e| MeterError::file_error(&config.path, e))?;

        info!(path = %config.path.display(), bytes = data.len(), "Opened capture");

        let mut provider = Self::from_bytes(data).with_chunk_size(config.chunk_size);
        if let Some(interval) = config.frame_interval() {
            provider = provider.with_frame_interval(interval);
        }
        Ok(provider)
    }

    /// Set the read size. Zero is treated as one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Wait `interval` between frames.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval).filter(|d| !d.is_zero());
        self.pacing = None;
        self
    }

    /// Fraction of the capture handed to the extractor so far.
    pub fn progress(&self) -> f64 {
        if self.data.is_empty() { 1.0 } else { self.offset as f64 / self.data.len() as f64 }
    }

    async fn pace(&mut self) {
        let Some(period) = self.frame_interval else {
            return;
        };
        let pacing = self.pacing.get_or_insert_with(|| {
            let mut pacing = interval(period);
            pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);
            pacing
        });
        pacing.tick().await;
    }
}

#[async_trait::async_trait]
impl Provider for ReplayProvider {
    async fn next_frame(&mut self) -> Result<Option<FramePacket>> {
        loop {
            if let Some(frame) = self.extractor.next_frame() {
                self.pace().await;

                let packet = FramePacket::new(frame, self.sequence);
                self.sequence += 1;
                trace!(
                    sequence = packet.sequence,
                    offset = self.offset,
                    total = self.data.len(),
                    "Replayed frame"
                );
                return Ok(Some(packet));
            }

            if self.offset >= self.data.len() {
                debug!(
                    frames = self.sequence,
                    leftover = self.extractor.buffered(),
                    "Reached end of replay"
                );
                return Ok(None);
            }

            let end = (self.offset + self.chunk_size).min(self.data.len());
            self.extractor.extend(&self.data[self.offset..end]);
            self.offset = end;
        }
    }

    fn nominal_interval(&self) -> Option<Duration> {
        self.frame_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MessageBuilder, fixture_frame, fixture_stream};
    use crate::types::Shape;

    fn capture() -> Vec<u8> {
        let mut bytes = vec![0x13, 0x37];
        bytes.extend(fixture_stream());
        bytes.extend(MessageBuilder::new(Shape::Minimal).build_stream());
        bytes
    }

    #[tokio::test]
    async fn chunk_size_does_not_change_frames() {
        for chunk in [1, 3, 64, 4096] {
            let mut provider = ReplayProvider::from_bytes(capture()).with_chunk_size(chunk);
            let first = provider.next_frame().await.unwrap().unwrap();
            let second = provider.next_frame().await.unwrap().unwrap();
            assert_eq!(&*first.data, fixture_frame().as_slice(), "chunk {chunk}");
            assert_eq!(
                &*second.data,
                MessageBuilder::new(Shape::Minimal).build_frame().as_slice(),
                "chunk {chunk}"
            );
            assert!(provider.next_frame().await.unwrap().is_none());
            assert_eq!(provider.progress(), 1.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn frames_are_paced() {
        let mut provider =
            ReplayProvider::from_bytes(capture()).with_frame_interval(Duration::from_secs(2));
        assert_eq!(provider.nominal_interval(), Some(Duration::from_secs(2)));

        let start = tokio::time::Instant::now();
        provider.next_frame().await.unwrap().unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        provider.next_frame().await.unwrap().unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn empty_capture_ends_immediately() {
        let mut provider = ReplayProvider::from_bytes(Vec::<u8>::new());
        assert!(provider.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_file_is_a_file_error() {
        let config = ReplayConfig::new("/nonexistent/capture.bin");
        let err = ReplayProvider::open(&config).await.err().unwrap();
        assert!(matches!(err, MeterError::File { .. }));
    }
}
