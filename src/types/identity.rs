//! Meter identity derived from the stream of decoded messages.
//!
//! Downstream setup (device registration, discovery documents) depends on who
//! the meter is and which values it reports. Meters interleave shapes, e.g. a
//! power-only list every few seconds and a full list less often, so the
//! identity is accumulated over messages rather than taken from the first one.

use serde::Serialize;
use std::collections::BTreeSet;

use super::{Message, Shape};

/// What is known about the meter so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MeterIdentity {
    pub meter_id: Option<String>,
    pub meter_type: Option<String>,
    pub version: Option<String>,
    /// Every body shape seen from this meter.
    pub shapes: BTreeSet<Shape>,
}

impl MeterIdentity {
    pub fn reports_active_power_import(&self) -> bool {
        self.shapes.iter().any(|s| *s != Shape::Empty)
    }

    pub fn reports_active_power_export(&self) -> bool {
        self.shapes.iter().any(|s| s.has_full_header())
    }

    /// Highest number of phases reported by any seen shape.
    pub fn phase_count(&self) -> usize {
        self.shapes.iter().map(|s| s.phase_count()).max().unwrap_or(0)
    }

    pub fn reports_energy(&self) -> bool {
        self.shapes.iter().any(|s| s.has_energy())
    }
}

/// Folds messages into a [`MeterIdentity`] and reports changes.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    current: MeterIdentity,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &MeterIdentity {
        &self.current
    }

    /// Record a decoded message.
    ///
    /// Returns the updated identity when the message introduced a new shape
    /// or changed the identification strings, `None` otherwise.
    pub fn observe(&mut self, message: &Message) -> Option<&MeterIdentity> {
        let mut changed = false;

        if let Some(shape) = message.shape {
            changed |= self.current.shapes.insert(shape);
        }

        for (known, seen) in [
            (&mut self.current.meter_id, &message.meter_id),
            (&mut self.current.meter_type, &message.meter_type),
            (&mut self.current.version, &message.version),
        ] {
            if seen.is_some() && known != seen {
                known.clone_from(seen);
                changed = true;
            }
        }

        changed.then_some(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(id: &str) -> Message {
        Message {
            shape: Some(Shape::ThreePhaseEnergy),
            meter_id: Some(id.to_string()),
            meter_type: Some("MA304H4D".to_string()),
            version: Some("KFM_001".to_string()),
            ..Default::default()
        }
    }

    fn minimal() -> Message {
        Message {
            shape: Some(Shape::Minimal),
            active_power_positive: Some(10),
            ..Default::default()
        }
    }

    #[test]
    fn first_message_introduces_identity() {
        let mut tracker = IdentityTracker::new();
        let identity = tracker.observe(&minimal()).cloned().unwrap();
        assert!(identity.meter_id.is_none());
        assert!(identity.reports_active_power_import());
        assert!(!identity.reports_active_power_export());
        assert_eq!(identity.phase_count(), 0);
    }

    #[test]
    fn repeated_shape_is_not_a_change() {
        let mut tracker = IdentityTracker::new();
        assert!(tracker.observe(&minimal()).is_some());
        assert!(tracker.observe(&minimal()).is_none());
        assert!(tracker.observe(&full("1")).is_some());
        assert!(tracker.observe(&full("1")).is_none());
        assert!(tracker.observe(&minimal()).is_none());
    }

    #[test]
    fn identity_accumulates_capabilities() {
        let mut tracker = IdentityTracker::new();
        tracker.observe(&minimal());
        tracker.observe(&full("1234567890123456"));

        let identity = tracker.current();
        assert_eq!(identity.meter_id.as_deref(), Some("1234567890123456"));
        assert_eq!(identity.phase_count(), 3);
        assert!(identity.reports_energy());
        assert!(identity.reports_active_power_export());
    }

    #[test]
    fn changed_meter_id_is_reported() {
        let mut tracker = IdentityTracker::new();
        tracker.observe(&full("A"));
        let identity = tracker.observe(&full("B")).unwrap();
        assert_eq!(identity.meter_id.as_deref(), Some("B"));
    }

    #[test]
    fn messages_without_shape_are_ignored() {
        let mut tracker = IdentityTracker::new();
        assert!(tracker.observe(&Message::default()).is_none());
    }
}
