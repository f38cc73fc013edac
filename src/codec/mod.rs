//! Wire format: frame extraction and payload decoding.
//!
//! Bytes flow through two stages. [`FrameExtractor`] (or the blocking
//! [`FrameReader`]) cuts the raw serial stream into frames, and
//! [`decode_frame`] turns one frame into a [`Message`](crate::Message).
//!
//! ```rust
//! use kraft::codec::{FrameExtractor, decode_frame};
//!
//! let mut extractor = FrameExtractor::new();
//! extractor.extend(&[0x00, 0x7e, 0xa0]);
//! assert!(extractor.next_frame().is_none());
//!
//! // Nothing else arrived, so no frame can be decoded yet.
//! assert!(decode_frame(&[0xa0]).is_err());
//! ```

mod cursor;
mod decode;
mod frame;
mod header;
mod tagged;

pub use crate::error::{DecodeError, PartialDecode};
pub use cursor::Cursor;
pub use decode::decode_frame;
pub use frame::{
    FRAME_FORMAT, FRAME_FORMAT_MASK, FRAME_LENGTH_MASK, FRAME_SENTINEL, FrameExtractor,
    FrameReader,
};
pub use header::{Header, Meta};
pub use tagged::{FieldKind, TAG_INT8, TAG_INT32, TAG_OCTETS, TaggedReader, Value};
