//! Fixture frames and a frame encoder for tests and benchmarks.
//!
//! The fixture is a three-phase list with accumulated energy as sent by a
//! Kaifa MA304H4D. [`MessageBuilder`] produces frames of every shape in the
//! same layout the decoder expects.

#![cfg(any(test, feature = "benchmark"))]

use crate::codec::{FRAME_FORMAT, FRAME_LENGTH_MASK, FRAME_SENTINEL, Header, Meta};
use crate::codec::{TAG_INT8, TAG_INT32, TAG_OCTETS};
use crate::types::{Message, Shape, Timestamp};

/// Offset of the item count tag within [`fixture_frame`].
pub const FIXTURE_ITEM_COUNT_OFFSET: usize = 30;
/// Offset of the meter id tag within [`fixture_frame`].
pub const FIXTURE_METER_ID_TAG_OFFSET: usize = 41;

/// Frame body after the format/length field, as captured from a meter.
const FIXTURE_BODY: &[u8] = &[
    0x01, // destination address
    0x00, 0x01, // source address
    0x10, // control field
    0x56, 0x1b, // header checksum
    0xe6, // LSAP destination
    0xe7, // LSAP source
    0x00, // LLC quality
    0x0f, 0x40, 0x00, 0x00, 0x00, // vendor bytes
    0x09, 0x0c, // octet string, 12 bytes: capture time
    0x07, 0xe4, 0x08, 0x14, 0x04, 0x0b, 0x1b, 0x0f, 0xff, 0x80, 0x00, 0x00, //
    0x02, 0x12, // item count 18
    0x09, 0x07, b'K', b'F', b'M', b'_', b'0', b'0', b'1', // version
    0x09, 0x10, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'1', b'2', b'3',
    b'4', b'5', b'6', // meter id
    0x09, 0x08, b'M', b'A', b'3', b'0', b'4', b'H', b'4', b'D', // meter type
    0x06, 0x00, 0x00, 0x00, 0x00, // active power +
    0x06, 0x00, 0x00, 0x0a, 0xa9, // active power -
    0x06, 0x00, 0x00, 0x00, 0x00, // reactive power +
    0x06, 0x00, 0x00, 0x01, 0xef, // reactive power -
    0x06, 0x00, 0x00, 0x0e, 0x4b, // L1 current, mA
    0x06, 0x00, 0x00, 0x0f, 0x1c, // L2 current, mA
    0x06, 0x00, 0x00, 0x11, 0xd1, // L3 current, mA
    0x06, 0x00, 0x00, 0x09, 0x16, // L1 voltage, dV
    0x06, 0x00, 0x00, 0x09, 0x0e, // L2 voltage, dV
    0x06, 0x00, 0x00, 0x09, 0x06, // L3 voltage, dV
    0x09, 0x0c, // octet string, 12 bytes: energy capture time
    0x07, 0xe4, 0x08, 0x14, 0x04, 0x0b, 0x1b, 0x0f, 0xff, 0x80, 0x00, 0x00, //
    0x06, 0x01, 0xe7, 0xbc, 0xb1, // active energy +
    0x06, 0x00, 0x86, 0x97, 0xef, // active energy -
    0x06, 0x00, 0x01, 0x3e, 0x98, // reactive energy +
    0x06, 0x00, 0x49, 0x14, 0x1b, // reactive energy -
    0x2e, 0x88, // frame checksum
];

/// Bytes the meter appends to a timestamp: hundredths, then UTC deviation and
/// clock status.
const TIMESTAMP_TAIL: [u8; 4] = [0xff, 0x80, 0x00, 0x00];

/// The fixture as returned by the frame extractor.
pub fn fixture_frame() -> Vec<u8> {
    let length = FIXTURE_BODY.len() + 2;
    let mut frame = vec![FRAME_FORMAT, length as u8];
    frame.extend_from_slice(FIXTURE_BODY);
    frame
}

/// The fixture as it appears on the wire.
pub fn fixture_stream() -> Vec<u8> {
    frame_bytes(&fixture_frame())
}

/// Capture time carried by the fixture.
pub fn fixture_timestamp() -> Timestamp {
    Timestamp { year: 2020, month: 8, day: 20, weekday: 4, hour: 11, minute: 27, second: 15 }
}

/// Surround an extracted frame with sentinels.
pub fn frame_bytes(frame: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.len() + 2);
    out.push(FRAME_SENTINEL);
    out.extend_from_slice(frame);
    out.push(FRAME_SENTINEL);
    out
}

pub fn tagged_u8(out: &mut Vec<u8>, value: u8) {
    out.extend([TAG_INT8, value]);
}

pub fn tagged_i32(out: &mut Vec<u8>, value: i32) {
    out.push(TAG_INT32);
    out.extend(value.to_be_bytes());
}

pub fn tagged_octets(out: &mut Vec<u8>, value: &[u8]) {
    assert!(value.len() <= u8::MAX as usize, "octet string too long");
    out.extend([TAG_OCTETS, value.len() as u8]);
    out.extend_from_slice(value);
}

/// Builds frames of any shape. Defaults mirror the fixture.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    shape: Shape,
    header: Header,
    meta: Meta,
    timestamp: Vec<u8>,
    version: String,
    meter_id: String,
    meter_type: String,
    power: [i32; 4],
    phases: Vec<(i32, i32)>,
    energy_timestamp: Vec<u8>,
    energy: [i32; 4],
    checksum: u16,
}

impl MessageBuilder {
    pub fn new(shape: Shape) -> Self {
        let blob = timestamp_blob(&fixture_timestamp());
        Self {
            shape,
            header: Header {
                format: FRAME_FORMAT,
                separator: false,
                length: 0,
                dest_addr: 0x01,
                src_addr: 0x0001,
                control_field: 0x10,
                checksum: 0x561b,
            },
            meta: Meta {
                lsap_dest: 0xe6,
                lsap_src: 0xe7,
                llc_quality: 0x00,
                vendor: [0x0f, 0x40, 0x00, 0x00, 0x00],
            },
            timestamp: blob.clone(),
            version: "KFM_001".to_string(),
            meter_id: "1234567890123456".to_string(),
            meter_type: "MA304H4D".to_string(),
            power: [0, 2729, 0, 495],
            phases: [(3659, 2326), (3868, 2318), (4561, 2310)][..shape.phase_count()].to_vec(),
            energy_timestamp: blob,
            energy: [31_964_337, 8_820_719, 81_560, 4_789_275],
            checksum: 0x2e88,
        }
    }

    /// Builder reproducing a decoded message.
    pub fn from_message(message: &Message) -> Self {
        let shape = message.shape.unwrap_or(Shape::Empty);
        let mut builder = Self::new(shape);
        builder.header = message.header;
        builder.meta = message.meta;
        builder.checksum = message.checksum;
        builder.timestamp = timestamp_blob(&message.timestamp);
        builder.energy_timestamp =
            timestamp_blob(&message.energy_timestamp.unwrap_or(message.timestamp));

        let text = |s: &Option<String>| s.clone().unwrap_or_default();
        builder.version = text(&message.version);
        builder.meter_id = text(&message.meter_id);
        builder.meter_type = text(&message.meter_type);
        builder.power = [
            message.active_power_positive.unwrap_or_default(),
            message.active_power_negative.unwrap_or_default(),
            message.reactive_power_positive.unwrap_or_default(),
            message.reactive_power_negative.unwrap_or_default(),
        ];
        builder.phases = message
            .phases
            .iter()
            .map(|p| ((p.current * 1000.0).round() as i32, (p.voltage * 10.0).round() as i32))
            .collect();
        builder.energy = [
            message.active_energy_positive.unwrap_or_default(),
            message.active_energy_negative.unwrap_or_default(),
            message.reactive_energy_positive.unwrap_or_default(),
            message.reactive_energy_negative.unwrap_or_default(),
        ];
        builder
    }

    pub fn active_power_positive(mut self, watts: i32) -> Self {
        self.power[0] = watts;
        self
    }

    pub fn active_power_negative(mut self, watts: i32) -> Self {
        self.power[1] = watts;
        self
    }

    pub fn meter_id(mut self, id: &str) -> Self {
        self.meter_id = id.to_string();
        self
    }

    /// Raw (milliamps, decivolts) pairs, one per phase.
    pub fn phases_raw(mut self, phases: Vec<(i32, i32)>) -> Self {
        self.phases = phases;
        self
    }

    pub fn timestamp_blob(mut self, blob: Vec<u8>) -> Self {
        self.timestamp = blob;
        self
    }

    pub fn active_energy_positive(mut self, wh: i32) -> Self {
        self.energy[0] = wh;
        self
    }

    /// Frame content, format/length field included.
    pub fn build_frame(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.push(self.header.dest_addr);
        body.extend(self.header.src_addr.to_be_bytes());
        body.push(self.header.control_field);
        body.extend(self.header.checksum.to_be_bytes());
        body.extend([self.meta.lsap_dest, self.meta.lsap_src, self.meta.llc_quality]);
        body.extend(self.meta.vendor);

        tagged_octets(&mut body, &self.timestamp);
        tagged_u8(&mut body, self.shape.item_count());

        match self.shape {
            Shape::Empty => return self.with_format_field(body),
            Shape::Minimal => tagged_i32(&mut body, self.power[0]),
            _ => {
                tagged_octets(&mut body, self.version.as_bytes());
                tagged_octets(&mut body, self.meter_id.as_bytes());
                tagged_octets(&mut body, self.meter_type.as_bytes());
                for watts in self.power {
                    tagged_i32(&mut body, watts);
                }
            }
        }

        for (milliamps, _) in &self.phases {
            tagged_i32(&mut body, *milliamps);
        }
        for (_, decivolts) in &self.phases {
            tagged_i32(&mut body, *decivolts);
        }

        if self.shape.has_energy() {
            tagged_octets(&mut body, &self.energy_timestamp);
            for wh in self.energy {
                tagged_i32(&mut body, wh);
            }
        }

        body.extend(self.checksum.to_be_bytes());
        self.with_format_field(body)
    }

    /// Frame with sentinels, ready to feed to an extractor.
    pub fn build_stream(&self) -> Vec<u8> {
        frame_bytes(&self.build_frame())
    }

    fn with_format_field(&self, body: Vec<u8>) -> Vec<u8> {
        let length = body.len() + 2;
        assert!(length <= 0x07ff, "frame too long for 11-bit length");
        let separator = if self.header.separator { 0x08 } else { 0x00 };
        let hi = self.header.format | separator | ((length >> 8) as u8 & FRAME_LENGTH_MASK);

        let mut frame = Vec::with_capacity(length);
        frame.extend([hi, length as u8]);
        frame.extend(body);
        frame
    }
}

fn timestamp_blob(ts: &Timestamp) -> Vec<u8> {
    let mut blob = ts.to_blob().to_vec();
    blob.extend(TIMESTAMP_TAIL);
    blob
}
