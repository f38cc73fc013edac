//! Fixed-width frame header and link-layer metadata.
//!
//! Both structures are read positionally (no type tags) from the start of an
//! extracted frame:
//!
//! ```text
//! header: | fmt/len (2) | dest (1) | src (2) | control (1) | HCS (2) |
//! meta:   | LSAP dest (1) | LSAP src (1) | LLC quality (1) | vendor (5) |
//! ```

use serde::Serialize;

use super::DecodeError;
use super::cursor::Cursor;
use super::frame::{FRAME_FORMAT_MASK, FRAME_LENGTH_MASK};

const SEPARATOR_BIT: u8 = 0x08;

/// Frame header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Format nibble, kept in the high bits (`0xA0` for the meter's frames).
    pub format: u8,
    /// Segmentation bit of the format field.
    pub separator: bool,
    /// 11-bit frame length.
    pub length: u16,
    pub dest_addr: u8,
    pub src_addr: u16,
    pub control_field: u8,
    /// Header check sequence, stored as received.
    pub checksum: u16,
}

impl Header {
    pub const SIZE: usize = 8;

    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let mut ahead = *cursor;
        let format_and_length = ahead.read_u16()?;
        let [hi, _] = format_and_length.to_be_bytes();

        let header = Self {
            format: hi & FRAME_FORMAT_MASK,
            separator: hi & SEPARATOR_BIT != 0,
            length: format_and_length & ((u16::from(FRAME_LENGTH_MASK) << 8) | 0xff),
            dest_addr: ahead.read_u8()?,
            src_addr: ahead.read_u16()?,
            control_field: ahead.read_u8()?,
            checksum: ahead.read_u16()?,
        };
        *cursor = ahead;
        Ok(header)
    }
}

/// LLC metadata following the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub lsap_dest: u8,
    pub lsap_src: u8,
    pub llc_quality: u8,
    /// Vendor bytes, not interpreted.
    pub vendor: [u8; 5],
}

impl Meta {
    pub const SIZE: usize = 8;

    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let mut ahead = *cursor;
        let lsap_dest = ahead.read_u8()?;
        let lsap_src = ahead.read_u8()?;
        let llc_quality = ahead.read_u8()?;
        let mut vendor = [0u8; 5];
        ahead.read_exact(&mut vendor)?;
        *cursor = ahead;
        Ok(Self { lsap_dest, lsap_src, llc_quality, vendor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_fields() {
        let data = [0xa8, 0x9b, 0x01, 0x00, 0x01, 0x10, 0x56, 0x1b];
        let mut cursor = Cursor::new(&data);
        let header = Header::parse(&mut cursor).unwrap();

        assert_eq!(
            header,
            Header {
                format: 0xa0,
                separator: true,
                length: 0x9b,
                dest_addr: 0x01,
                src_addr: 0x0001,
                control_field: 0x10,
                checksum: 0x561b,
            }
        );
        assert!(cursor.is_empty());
    }

    #[test]
    fn header_length_keeps_eleven_bits() {
        let data = [0xa7, 0xff, 0, 0, 0, 0, 0, 0];
        let header = Header::parse(&mut Cursor::new(&data)).unwrap();
        assert_eq!(header.length, 0x07ff);
        assert!(!header.separator);
    }

    #[test]
    fn short_header_is_not_consumed() {
        let data = [0xa0, 0x10, 0x01];
        let mut cursor = Cursor::new(&data);
        assert!(matches!(
            Header::parse(&mut cursor),
            Err(DecodeError::UnexpectedEndOfData { .. })
        ));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn parses_meta_fields() {
        let data = [0xe6, 0xe7, 0x00, 0x0f, 0x40, 0x00, 0x00, 0x00];
        let meta = Meta::parse(&mut Cursor::new(&data)).unwrap();
        assert_eq!(meta.lsap_dest, 0xe6);
        assert_eq!(meta.lsap_src, 0xe7);
        assert_eq!(meta.llc_quality, 0x00);
        assert_eq!(meta.vendor, [0x0f, 0x40, 0x00, 0x00, 0x00]);
    }
}
