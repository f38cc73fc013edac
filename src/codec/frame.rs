//! Frame recovery from an unstructured byte stream.
//!
//! ## Wire layout
//!
//! ```text
//! +------+---------------+-----------+---------------------------+------+
//! | 0x7E | 1010 S LLL    | LLLLLLLL  | rest of frame             | 0x7E |
//! +------+---------------+-----------+---------------------------+------+
//!          \______________ `length` bytes _____________________/
//! ```
//!
//! The 11-bit length counts everything between the two sentinels, including
//! the format/length bytes themselves. The extracted frame is exactly that
//! span, so the decoder sees the format/length field as the start of the
//! header.
//!
//! The extractor may join the stream at any offset. Leading bytes are dropped
//! until the buffer starts at something that looks like a frame start; see
//! [`FrameExtractor::next_frame`] for the exact rule.

use std::io::Read;

use tracing::{debug, trace};

/// Frame delimiter.
pub const FRAME_SENTINEL: u8 = 0x7e;
/// Mask selecting the format nibble of the first frame byte.
pub const FRAME_FORMAT_MASK: u8 = 0xf0;
/// Format nibble value used by the meter (HDLC frame format type 3).
pub const FRAME_FORMAT: u8 = 0xa0;
/// Mask selecting bits 10..8 of the frame length.
pub const FRAME_LENGTH_MASK: u8 = 0x07;

const READ_CHUNK_SIZE: usize = 4096;

/// Buffers incoming bytes and cuts them into frames.
#[derive(Debug, Default, Clone)]
pub struct FrameExtractor {
    buf: Vec<u8>,
}

impl FrameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly received bytes.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes held but not yet emitted as part of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Try to cut the next frame out of the buffer.
    ///
    /// Returns `None` when more input is needed. Bytes in front of a frame
    /// start are discarded. A byte is only skipped when it is not a sentinel
    /// *and* the byte after it does not carry the frame format nibble, so
    /// either condition alone is enough to stop resynchronizing.
    ///
    /// Zero-length frames are consumed and skipped.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            self.resync();

            if self.buf.len() < 3 {
                return None;
            }

            let length =
                ((usize::from(self.buf[1] & FRAME_LENGTH_MASK)) << 8) | usize::from(self.buf[2]);

            if self.buf.len() < length + 2 {
                trace!(length, buffered = self.buf.len(), "Waiting for rest of frame");
                return None;
            }

            let frame = self.buf[1..length + 1].to_vec();
            self.buf.drain(..length + 2);

            if frame.is_empty() {
                debug!("Skipping zero-length frame");
                continue;
            }

            trace!(length, left = self.buf.len(), "Extracted frame");
            return Some(frame);
        }
    }

    fn resync(&mut self) {
        let skip = self
            .buf
            .windows(2)
            .position(|w| w[0] == FRAME_SENTINEL || (w[1] & FRAME_FORMAT_MASK) == FRAME_FORMAT)
            .unwrap_or(self.buf.len().saturating_sub(1));

        if skip > 0 {
            debug!(skipped = skip, "Discarding bytes ahead of frame start");
            self.buf.drain(..skip);
        }
    }
}

/// Blocking frame source over any [`Read`] implementation.
///
/// ```rust
/// use kraft::codec::FrameReader;
///
/// let stream: &[u8] = &[0x00, 0x7e, 0xa0, 0x03, 0x01, 0x7e];
/// let mut reader = FrameReader::new(stream);
/// assert_eq!(reader.next_frame().unwrap(), Some(vec![0xa0, 0x03, 0x01]));
/// assert_eq!(reader.next_frame().unwrap(), None);
/// ```
#[derive(Debug)]
pub struct FrameReader<R> {
    source: R,
    extractor: FrameExtractor,
}

impl<R: Read> FrameReader<R> {
    pub fn new(source: R) -> Self {
        Self { source, extractor: FrameExtractor::new() }
    }

    /// Pull bytes until a complete frame is available.
    ///
    /// Frames already buffered are returned without touching the source.
    /// Returns `Ok(None)` once the source reports end of stream; any partial
    /// frame still buffered at that point is dropped. Read errors are passed
    /// through unchanged.
    pub fn next_frame(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(frame) = self.extractor.next_frame() {
                return Ok(Some(frame));
            }

            let n = self.source.read(&mut chunk)?;
            if n == 0 {
                if self.extractor.buffered() > 0 {
                    debug!(
                        buffered = self.extractor.buffered(),
                        "End of stream with incomplete frame data"
                    );
                }
                return Ok(None);
            }
            self.extractor.extend(&chunk[..n]);
        }
    }

    /// Give back the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = std::io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fixture_frame, fixture_stream, frame_bytes};
    use proptest::prelude::*;

    /// Reader yielding the wrapped bytes in fixed-size pieces.
    struct Chunked<'a> {
        data: &'a [u8],
        sizes: Vec<usize>,
        next: usize,
    }

    impl Read for Chunked<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.data.is_empty() {
                return Ok(0);
            }
            let want = self.sizes.get(self.next).copied().unwrap_or(1).max(1);
            self.next += 1;
            let n = want.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn collect_frames<R: Read>(source: R) -> Vec<Vec<u8>> {
        FrameReader::new(source).collect::<std::io::Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn extracts_fixture_frame_without_sentinels() {
        let stream = frame_bytes(&fixture_frame());
        let frames = collect_frames(stream.as_slice());
        assert_eq!(frames, vec![fixture_frame()]);
        assert_eq!(frames[0][0] & FRAME_FORMAT_MASK, FRAME_FORMAT);
    }

    #[test]
    fn back_to_back_frames_in_one_read() {
        let mut stream = frame_bytes(&fixture_frame());
        stream.extend(frame_bytes(&[0xa0, 0x03, 0x42]));

        let mut extractor = FrameExtractor::new();
        extractor.extend(&stream);
        assert_eq!(extractor.next_frame(), Some(fixture_frame()));
        assert_eq!(extractor.next_frame(), Some(vec![0xa0, 0x03, 0x42]));
        assert_eq!(extractor.next_frame(), None);
        assert_eq!(extractor.buffered(), 0);
    }

    #[test]
    fn waits_for_complete_frame() {
        let stream = frame_bytes(&fixture_frame());
        let mut extractor = FrameExtractor::new();

        extractor.extend(&stream[..2]);
        assert_eq!(extractor.next_frame(), None);
        extractor.extend(&stream[2..stream.len() - 2]);
        assert_eq!(extractor.next_frame(), None);
        extractor.extend(&stream[stream.len() - 2..]);
        assert_eq!(extractor.next_frame(), Some(fixture_frame()));
    }

    #[test]
    fn sentinel_alone_stops_resync() {
        // 0x7e followed by a byte without the format nibble is still taken as
        // a frame start.
        let mut extractor = FrameExtractor::new();
        extractor.extend(&[0x11, 0x7e, 0x10, 0x02, 0x7e]);
        assert_eq!(extractor.next_frame(), Some(vec![0x10, 0x02]));
    }

    #[test]
    fn format_nibble_alone_stops_resync() {
        let mut extractor = FrameExtractor::new();
        extractor.extend(&[0x11, 0x22, 0xa0, 0x02, 0x33]);
        // 0x22 is followed by 0xa0 so the buffer now starts at 0x22.
        assert_eq!(extractor.next_frame(), Some(vec![0xa0, 0x02]));
        assert_eq!(extractor.buffered(), 0);
    }

    #[test]
    fn zero_length_frame_is_skipped() {
        let mut extractor = FrameExtractor::new();
        extractor.extend(&[0x7e, 0xa0, 0x00, 0x7e, 0xa0, 0x03, 0x01, 0x7e]);
        assert_eq!(extractor.next_frame(), Some(vec![0xa0, 0x03, 0x01]));
    }

    #[test]
    fn end_of_stream_with_partial_frame_is_none() {
        let stream = frame_bytes(&fixture_frame());
        let mut reader = FrameReader::new(&stream[..stream.len() - 5]);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn read_errors_are_propagated_verbatim() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "port unplugged"))
            }
        }

        let err = FrameReader::new(Failing).next_frame().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
        assert_eq!(err.to_string(), "port unplugged");
    }

    #[test]
    fn long_length_uses_low_bits_of_format_byte() {
        let mut body = vec![0xa1, 0x04];
        body.resize(0x104, 0x55);
        let mut stream = vec![FRAME_SENTINEL];
        stream.extend(&body);
        stream.push(FRAME_SENTINEL);

        let frames = collect_frames(stream.as_slice());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 0x104);
    }

    fn garbage_byte() -> impl Strategy<Value = u8> {
        any::<u8>().prop_filter("must not look like a frame start", |b| {
            *b != FRAME_SENTINEL && (*b & FRAME_FORMAT_MASK) != FRAME_FORMAT
        })
    }

    proptest! {
        #[test]
        fn chunk_boundaries_do_not_change_frames(
            noise in prop::collection::vec(any::<u8>(), 0..64),
            sizes in prop::collection::vec(1usize..40, 1..64),
            repeats in 1usize..4,
        ) {
            let mut stream = noise;
            for _ in 0..repeats {
                stream.extend(fixture_stream());
            }

            let whole = collect_frames(stream.as_slice());
            let chunked = collect_frames(Chunked { data: &stream, sizes, next: 0 });
            prop_assert_eq!(whole, chunked);
        }

        #[test]
        fn arbitrary_streams_split_identically(
            stream in prop::collection::vec(any::<u8>(), 0..512),
            sizes in prop::collection::vec(1usize..16, 1..128),
        ) {
            let whole = collect_frames(stream.as_slice());
            let chunked = collect_frames(Chunked { data: &stream, sizes, next: 0 });
            prop_assert_eq!(whole, chunked);
        }

        #[test]
        fn leading_garbage_is_skipped(garbage in prop::collection::vec(garbage_byte(), 0..128)) {
            let mut stream = garbage;
            stream.extend(fixture_stream());
            let frames = collect_frames(stream.as_slice());
            prop_assert_eq!(frames, vec![fixture_frame()]);
        }
    }
}
