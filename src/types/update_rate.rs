//! Update rate control for message streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Update rate for message streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRate {
    /// Every message the meter sends.
    Native,

    /// At most one message per interval, the latest one wins.
    /// Intervals at or below the source interval behave like `Native`.
    #[serde(with = "duration_secs")]
    Every(Duration),
}

impl UpdateRate {
    /// Normalize the rate against the source's message interval.
    ///
    /// `source_interval` is `None` when the source has no fixed cadence.
    pub fn normalize(self, source_interval: Option<Duration>) -> Self {
        match (self, source_interval) {
            (UpdateRate::Every(d), _) if d.is_zero() => UpdateRate::Native,
            (UpdateRate::Every(d), Some(source)) if d <= source => UpdateRate::Native,
            (rate, _) => rate,
        }
    }

    /// Get throttle interval if needed
    pub fn throttle_interval(self, source_interval: Option<Duration>) -> Option<Duration> {
        match self.normalize(source_interval) {
            UpdateRate::Native => None,
            UpdateRate::Every(d) => Some(d),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
