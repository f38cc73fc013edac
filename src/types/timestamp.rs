//! Meter clock readings.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::DecodeError;

/// Minimum number of bytes a timestamp blob must carry.
pub const TIMESTAMP_LEN: usize = 8;

/// Wall-clock time as reported by the meter, in its local time zone.
///
/// Fields are kept as received. The meter sends `0xFF` for unspecified
/// components, so conversion to a calendar type is fallible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// Day of week, 1 = Monday. Not used for anything.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    /// Parse the leading 8 bytes of a timestamp blob.
    ///
    /// Meters append hundredths and a UTC deviation after the seconds; those
    /// bytes are ignored.
    pub fn from_blob(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < TIMESTAMP_LEN {
            return Err(DecodeError::MalformedTimestamp { len: data.len() });
        }
        Ok(Self {
            year: u16::from_be_bytes([data[0], data[1]]),
            month: data[2],
            day: data[3],
            weekday: data[4],
            hour: data[5],
            minute: data[6],
            second: data[7],
        })
    }

    /// The 8-byte wire form of this timestamp.
    pub fn to_blob(&self) -> [u8; TIMESTAMP_LEN] {
        let [y0, y1] = self.year.to_be_bytes();
        [y0, y1, self.month, self.day, self.weekday, self.hour, self.minute, self.second]
    }

    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))?
            .and_hms_opt(u32::from(self.hour), u32::from(self.minute), u32::from(self.second))
    }

    /// Interpret the reading in the host's local time zone.
    ///
    /// Returns `None` for invalid components and for local times that are
    /// skipped or repeated by a DST transition.
    pub fn to_local(&self) -> Option<DateTime<Local>> {
        Local.from_local_datetime(&self.to_naive()?).single()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// RFC 3339 with the local UTC offset when the reading is a valid local time,
/// the bare wall-clock form otherwise.
impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_local() {
            Some(local) => {
                serializer.serialize_str(&local.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            None => serializer.collect_str(self),
        }
    }
}
