//! Bounds-checked big-endian reads over a borrowed byte slice.
//!
//! A [`Cursor`] never rewinds. Every read either consumes exactly the bytes of
//! one field and advances, or fails with [`DecodeError::UnexpectedEndOfData`]
//! and leaves the position where it was.

use super::DecodeError;

/// Sequential reader over a frame payload.
///
/// The cursor is `Copy`, so callers that need all-or-nothing semantics across
/// several reads can work on a copy and commit it back on success.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unconsumed tail of the underlying slice.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if remaining < len {
            return Err(DecodeError::UnexpectedEndOfData { needed: len, remaining });
        }
        let run = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(run)
    }

    /// Fill `dest` completely from the stream.
    pub fn read_exact(&mut self, dest: &mut [u8]) -> Result<(), DecodeError> {
        let run = self.take(dest.len())?;
        dest.copy_from_slice(run);
        Ok(())
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_be_bytes(self.take_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_integers_in_sequence() {
        let data = [
            0x01, // u8
            0x00, 0x02, // u16
            0xff, 0xff, 0xff, 0xfe, // i32
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, // u64
        ];
        let mut cursor = Cursor::new(&data);

        assert_eq!(cursor.read_u8().unwrap(), 1);
        assert_eq!(cursor.read_u16().unwrap(), 2);
        assert_eq!(cursor.read_i32().unwrap(), -2);
        assert_eq!(cursor.read_u64().unwrap(), 256);
        assert!(cursor.is_empty());
        assert_eq!(cursor.position(), data.len());
    }

    #[test]
    fn signed_reads_reinterpret_bits() {
        let data = [0x80, 0xff, 0xfe];
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.read_i8().unwrap(), -128);
        assert_eq!(cursor.read_i16().unwrap(), -2);
    }

    #[test]
    fn short_read_does_not_advance() {
        let data = [0x00, 0x01, 0x02];
        let mut cursor = Cursor::new(&data);
        cursor.read_u8().unwrap();

        let err = cursor.read_u32().unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedEndOfData { needed: 4, remaining: 2 });
        assert_eq!(cursor.position(), 1);

        // The remaining bytes are still readable as a smaller field.
        assert_eq!(cursor.read_u16().unwrap(), 0x0102);
    }

    #[test]
    fn read_exact_fills_caller_sized_buffer() {
        let data = [0x0f, 0x40, 0x00, 0x00, 0x00, 0xaa];
        let mut cursor = Cursor::new(&data);
        let mut meta = [0u8; 5];
        cursor.read_exact(&mut meta).unwrap();
        assert_eq!(meta, [0x0f, 0x40, 0x00, 0x00, 0x00]);
        assert_eq!(cursor.rest(), &[0xaa]);

        let mut too_big = [0u8; 2];
        assert!(cursor.read_exact(&mut too_big).is_err());
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn empty_take_always_succeeds() {
        let mut cursor = Cursor::new(&[]);
        assert_eq!(cursor.take(0).unwrap(), &[] as &[u8]);
        assert!(cursor.read_u8().is_err());
    }
}
