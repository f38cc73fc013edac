//! Provider over any async byte source.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::codec::FrameExtractor;
use crate::provider::Provider;
use crate::types::FramePacket;
use crate::{MeterError, Result};

const READ_BUFFER_SIZE: usize = 4096;

/// Cuts frames out of an [`AsyncRead`].
///
/// Serial ports, pipes and TCP streams all end up here. Frames already
/// buffered are returned before the source is read again, so several frames
/// arriving in one read are not held back.
pub struct ReaderProvider<R> {
    source: R,
    extractor: FrameExtractor,
    buf: Box<[u8]>,
    sequence: u64,
    nominal_interval: Option<Duration>,
}

impl<R> ReaderProvider<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(source: R) -> Self {
        Self {
            source,
            extractor: FrameExtractor::new(),
            buf: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
            sequence: 0,
            nominal_interval: None,
        }
    }

    /// Declare how often the source is expected to produce a frame.
    pub fn with_nominal_interval(mut self, interval: Duration) -> Self {
        self.nominal_interval = Some(interval);
        self
    }

    /// Frames produced so far.
    pub fn frames_read(&self) -> u64 {
        self.sequence
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

#[async_trait::async_trait]
impl<R> Provider for ReaderProvider<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn next_frame(&mut self) -> Result<Option<FramePacket>> {
        loop {
            if let Some(frame) = self.extractor.next_frame() {
                let packet = FramePacket::new(frame, self.sequence);
                self.sequence += 1;
                trace!(sequence = packet.sequence, len = packet.data.len(), "Frame ready");
                return Ok(Some(packet));
            }

            let n = self.source.read(&mut self.buf).await.map_err(MeterError::Io)?;
            if n == 0 {
                if self.extractor.buffered() > 0 {
                    debug!(
                        buffered = self.extractor.buffered(),
                        "Source ended with incomplete frame data"
                    );
                }
                return Ok(None);
            }
            self.extractor.extend(&self.buf[..n]);
        }
    }

    fn nominal_interval(&self) -> Option<Duration> {
        self.nominal_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fixture_frame, fixture_stream};

    #[tokio::test]
    async fn yields_back_to_back_frames_then_ends() {
        let mut bytes = vec![0x55, 0x00];
        bytes.extend(fixture_stream());
        bytes.extend(fixture_stream());

        let mut provider = ReaderProvider::new(std::io::Cursor::new(bytes));
        let first = provider.next_frame().await.unwrap().unwrap();
        let second = provider.next_frame().await.unwrap().unwrap();
        assert_eq!(&*first.data, fixture_frame().as_slice());
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert!(provider.next_frame().await.unwrap().is_none());
        assert_eq!(provider.frames_read(), 2);
    }

    #[tokio::test]
    async fn read_errors_surface_as_io() {
        let mut provider = ReaderProvider::new(failing_reader());
        let err = provider.next_frame().await.unwrap_err();
        assert!(matches!(err, MeterError::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
        assert!(err.is_retryable());
    }

    /// Async reader that fails on every read.
    fn failing_reader() -> impl AsyncRead + Unpin + Send + 'static {
        struct Failing;
        impl AsyncRead for Failing {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
            }
        }
        Failing
    }
}
