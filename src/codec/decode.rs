//! Frame payload decoding.
//!
//! Decoding order is fixed:
//!
//! 1. [`Header`] and [`Meta`], positional
//! 2. capture timestamp (octet string)
//! 3. item count (1-byte item), which selects a [`Shape`]
//! 4. identification block: version, meter id, model, then active import,
//!    active export, reactive import, reactive export
//! 5. all phase currents, then all phase voltages
//! 6. energy block: timestamp, then the four accumulated energy registers
//! 7. raw 2-byte frame checksum
//!
//! Any bytes left after the checksum make the frame invalid.

use tracing::trace;

use super::cursor::Cursor;
use super::header::{Header, Meta};
use super::tagged::TaggedReader;
use crate::types::{Message, Phase, Shape, Timestamp};
use crate::{DecodeError, PartialDecode};

/// Decode one extracted frame.
///
/// On failure the error carries whatever was decoded before the failing
/// field. None of those values should be trusted.
pub fn decode_frame(frame: &[u8]) -> Result<Message, PartialDecode> {
    let mut message = Message::default();
    match decode_into(frame, &mut message) {
        Ok(()) => Ok(message),
        Err(error) => Err(PartialDecode { error, partial: Box::new(message) }),
    }
}

fn decode_into(frame: &[u8], m: &mut Message) -> Result<(), DecodeError> {
    let mut cursor = Cursor::new(frame);
    m.header = Header::parse(&mut cursor)?;
    m.meta = Meta::parse(&mut cursor)?;

    let mut reader = TaggedReader::new(cursor);
    m.timestamp = Timestamp::from_blob(reader.read_bytes()?)?;

    let count = reader.read_u8()?;
    let shape = Shape::from_item_count(count).ok_or(DecodeError::UnsupportedShape(count))?;
    m.shape = Some(shape);
    trace!(count, ?shape, "Decoding message body");

    match shape {
        Shape::Empty => return Ok(()),
        Shape::Minimal => m.active_power_positive = Some(reader.read_i32()?),
        _ => {}
    }

    if shape.has_full_header() {
        m.version = Some(reader.read_text()?);
        m.meter_id = Some(reader.read_text()?);
        m.meter_type = Some(reader.read_text()?);
        m.active_power_positive = Some(reader.read_i32()?);
        m.active_power_negative = Some(reader.read_i32()?);
        m.reactive_power_positive = Some(reader.read_i32()?);
        m.reactive_power_negative = Some(reader.read_i32()?);
    }

    let phases = shape.phase_count();
    for index in 1..=phases {
        let milliamps = reader.read_i32()?;
        m.phases.push(Phase { index, current: Phase::current_from_raw(milliamps), voltage: 0.0 });
    }
    for phase in m.phases.iter_mut() {
        phase.voltage = Phase::voltage_from_raw(reader.read_i32()?);
    }

    if shape.has_energy() {
        m.energy_timestamp = Some(Timestamp::from_blob(reader.read_bytes()?)?);
        m.active_energy_positive = Some(reader.read_i32()?);
        m.active_energy_negative = Some(reader.read_i32()?);
        m.reactive_energy_positive = Some(reader.read_i32()?);
        m.reactive_energy_negative = Some(reader.read_i32()?);
    }

    m.checksum = reader.cursor().read_u16()?;

    match reader.remaining() {
        0 => Ok(()),
        remaining => Err(DecodeError::TrailingData { remaining }),
    }
}
