//! Decoded meter readings.

use serde::Serialize;

use super::Timestamp;
use crate::codec::{Header, Meta};

/// Layout of a message body, selected by the item count field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Shape {
    /// No items after the count.
    Empty,
    /// Active power import only.
    Minimal,
    /// Full header block and one phase.
    SinglePhase,
    /// Full header block and three phases.
    ThreePhase,
    /// One phase plus accumulated energy.
    SinglePhaseEnergy,
    /// Three phases plus accumulated energy.
    ThreePhaseEnergy,
}

impl Shape {
    pub const ALL: [Shape; 6] = [
        Shape::Empty,
        Shape::Minimal,
        Shape::SinglePhase,
        Shape::ThreePhase,
        Shape::SinglePhaseEnergy,
        Shape::ThreePhaseEnergy,
    ];

    /// Map an item count to its shape, or `None` for unknown counts.
    pub fn from_item_count(count: u8) -> Option<Self> {
        match count {
            0 => Some(Shape::Empty),
            1 => Some(Shape::Minimal),
            9 => Some(Shape::SinglePhase),
            13 => Some(Shape::ThreePhase),
            14 => Some(Shape::SinglePhaseEnergy),
            18 => Some(Shape::ThreePhaseEnergy),
            _ => None,
        }
    }

    pub fn item_count(self) -> u8 {
        match self {
            Shape::Empty => 0,
            Shape::Minimal => 1,
            Shape::SinglePhase => 9,
            Shape::ThreePhase => 13,
            Shape::SinglePhaseEnergy => 14,
            Shape::ThreePhaseEnergy => 18,
        }
    }

    /// Whether the body starts with identification strings and the four
    /// power values.
    pub fn has_full_header(self) -> bool {
        !matches!(self, Shape::Empty | Shape::Minimal)
    }

    pub fn phase_count(self) -> usize {
        match self {
            Shape::Empty | Shape::Minimal => 0,
            Shape::SinglePhase | Shape::SinglePhaseEnergy => 1,
            Shape::ThreePhase | Shape::ThreePhaseEnergy => 3,
        }
    }

    pub fn has_energy(self) -> bool {
        matches!(self, Shape::SinglePhaseEnergy | Shape::ThreePhaseEnergy)
    }
}

/// Per-phase instantaneous values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Phase {
    /// 1-based position among the reported phases.
    pub index: usize,
    /// Amperes.
    pub current: f64,
    /// Volts.
    pub voltage: f64,
}

impl Phase {
    /// Convert a raw milliampere reading.
    pub fn current_from_raw(milliamps: i32) -> f64 {
        f64::from(milliamps) / 1000.0
    }

    /// Convert a raw decivolt reading.
    pub fn voltage_from_raw(decivolts: i32) -> f64 {
        f64::from(decivolts) / 10.0
    }
}

/// One decoded frame.
///
/// Which optional fields are set depends on [`Message::shape`]. Power values
/// are watts (var for reactive), energy values are raw watt-hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(skip)]
    pub header: Header,
    #[serde(skip)]
    pub meta: Meta,
    #[serde(skip)]
    pub shape: Option<Shape>,
    #[serde(skip)]
    pub checksum: u16,

    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "MeterID", skip_serializing_if = "Option::is_none")]
    pub meter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_power_positive: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_power_negative: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactive_power_positive: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactive_power_negative: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_timestamp: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_energy_positive: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_energy_negative: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactive_energy_positive: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactive_energy_negative: Option<i32>,
}

impl Message {
    /// Decode a frame as returned by the frame extractor.
    pub fn decode(frame: &[u8]) -> Result<Self, crate::PartialDecode> {
        crate::codec::decode_frame(frame)
    }

    /// Item count of the decoded shape.
    pub fn item_count(&self) -> Option<u8> {
        self.shape.map(Shape::item_count)
    }

    /// Imported energy in kWh.
    pub fn active_energy_positive_kwh(&self) -> Option<f64> {
        self.active_energy_positive.map(|wh| f64::from(wh) / 1000.0)
    }

    /// Exported energy in kWh.
    pub fn active_energy_negative_kwh(&self) -> Option<f64> {
        self.active_energy_negative.map(|wh| f64::from(wh) / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_counts_round_trip_through_shapes() {
        for shape in Shape::ALL {
            assert_eq!(Shape::from_item_count(shape.item_count()), Some(shape));
        }
        for count in [2u8, 5, 8, 10, 12, 15, 17, 19, 255] {
            assert_eq!(Shape::from_item_count(count), None);
        }
    }

    #[test]
    fn shape_sections() {
        assert!(!Shape::Minimal.has_full_header());
        assert_eq!(Shape::Minimal.phase_count(), 0);
        assert!(Shape::SinglePhase.has_full_header());
        assert!(!Shape::ThreePhase.has_energy());
        assert_eq!(Shape::ThreePhaseEnergy.phase_count(), 3);
        assert!(Shape::SinglePhaseEnergy.has_energy());
    }

    #[test]
    fn fixed_point_conversions() {
        assert_eq!(Phase::current_from_raw(3659), 3.659);
        assert_eq!(Phase::voltage_from_raw(2326), 232.6);
        assert_eq!(Phase::voltage_from_raw(2310), 231.0);
    }

    #[test]
    fn json_omits_absent_fields() {
        let message = Message {
            shape: Some(Shape::Minimal),
            active_power_positive: Some(1234),
            ..Default::default()
        };
        let json = serde_json::to_value(&message).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj["ActivePowerPositive"], 1234);
        assert_eq!(obj["Timestamp"], "0000-00-00T00:00:00");
        assert!(!obj.contains_key("MeterID"));
        assert!(!obj.contains_key("Phases"));
        assert!(!obj.contains_key("Checksum"));
    }

    #[test]
    fn energy_in_kwh() {
        let message = Message { active_energy_positive: Some(31_964_337), ..Default::default() };
        assert_eq!(message.active_energy_positive_kwh(), Some(31_964.337));
        assert_eq!(message.active_energy_negative_kwh(), None);
    }
}
