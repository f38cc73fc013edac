//! Self-typed items: one tag byte followed by a tag-specific payload.
//!
//! | tag    | payload                        | kinds              |
//! |--------|--------------------------------|--------------------|
//! | `0x02` | 1 byte                         | `U8`, `I8`         |
//! | `0x06` | 4 bytes, big-endian            | `U32`, `I32`       |
//! | `0x09` | 1 length byte + `length` bytes | `Bytes`, `Text`    |
//!
//! The caller states which kind it expects; the reader checks the tag against
//! that kind instead of guessing from the data.

use serde::Serialize;

use super::DecodeError;
use super::cursor::Cursor;

/// Tag of a 1-byte integer item.
pub const TAG_INT8: u8 = 0x02;
/// Tag of a 4-byte integer item.
pub const TAG_INT32: u8 = 0x06;
/// Tag of a length-prefixed octet string item.
pub const TAG_OCTETS: u8 = 0x09;

/// The destination type a caller wants an item decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldKind {
    U8,
    I8,
    U32,
    I32,
    Bytes,
    Text,
}

impl FieldKind {
    /// Tag byte that must precede an item of this kind.
    pub const fn tag(self) -> u8 {
        match self {
            FieldKind::U8 | FieldKind::I8 => TAG_INT8,
            FieldKind::U32 | FieldKind::I32 => TAG_INT32,
            FieldKind::Bytes | FieldKind::Text => TAG_OCTETS,
        }
    }
}

/// A decoded item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U8(u8),
    I8(i8),
    U32(u32),
    I32(i32),
    Bytes(Vec<u8>),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::U8(_) => FieldKind::U8,
            Value::I8(_) => FieldKind::I8,
            Value::U32(_) => FieldKind::U32,
            Value::I32(_) => FieldKind::I32,
            Value::Bytes(_) => FieldKind::Bytes,
            Value::Text(_) => FieldKind::Text,
        }
    }
}

/// Reads typed items from a [`Cursor`].
///
/// Each read is atomic: on error the underlying cursor has not moved. A frame
/// is still unusable after an error since the decoder aborts on the first
/// failure and never retries a field.
#[derive(Debug, Clone, Copy)]
pub struct TaggedReader<'a> {
    cursor: Cursor<'a>,
}

impl<'a> TaggedReader<'a> {
    pub fn new(cursor: Cursor<'a>) -> Self {
        Self { cursor }
    }

    /// Positional access for the untyped parts of a frame (header, checksum).
    pub fn cursor(&mut self) -> &mut Cursor<'a> {
        &mut self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Read one item of the given kind.
    pub fn read(&mut self, kind: FieldKind) -> Result<Value, DecodeError> {
        Ok(match kind {
            FieldKind::U8 => Value::U8(self.read_u8()?),
            FieldKind::I8 => Value::I8(self.read_i8()?),
            FieldKind::U32 => Value::U32(self.read_u32()?),
            FieldKind::I32 => Value::I32(self.read_i32()?),
            FieldKind::Bytes => Value::Bytes(self.read_bytes()?.to_vec()),
            FieldKind::Text => Value::Text(self.read_text()?),
        })
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.item(FieldKind::U8, |c| c.read_u8())
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        self.item(FieldKind::I8, |c| c.read_i8())
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.item(FieldKind::U32, |c| c.read_u32())
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.item(FieldKind::I32, |c| c.read_i32())
    }

    /// Borrow the content of a length-prefixed item. A zero length yields an
    /// empty slice.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        self.item(FieldKind::Bytes, |c| {
            let len = c.read_u8()? as usize;
            c.take(len)
        })
    }

    /// Read a length-prefixed item as text. Invalid UTF-8 is replaced rather
    /// than rejected; meters are known to pad identifiers with odd bytes.
    pub fn read_text(&mut self) -> Result<String, DecodeError> {
        self.item(FieldKind::Text, |c| {
            let len = c.read_u8()? as usize;
            Ok(String::from_utf8_lossy(c.take(len)?).into_owned())
        })
    }

    fn item<T>(
        &mut self,
        kind: FieldKind,
        payload: impl FnOnce(&mut Cursor<'a>) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let mut ahead = self.cursor;
        let found = ahead.read_u8()?;
        if found != kind.tag() {
            return Err(DecodeError::WrongTag { expected: kind, found });
        }
        let value = payload(&mut ahead)?;
        self.cursor = ahead;
        Ok(value)
    }
}
