//! Zoned time values.
//!
//! Plain DATE, TIME and TIMESTAMP map to `chrono::NaiveDate`, `NaiveTime`
//! and `NaiveDateTime`. The zoned variants keep the UTC instant and the zone
//! name exactly as supplied, so a value read back carries the same zone.

use chrono::{NaiveDateTime, NaiveTime};

/// TIME WITH TIME ZONE.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeTz {
    pub utc_time: NaiveTime,
    pub zone: String,
}

/// TIMESTAMP WITH TIME ZONE.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimestampTz {
    pub utc_timestamp: NaiveDateTime,
    pub zone: String,
}

impl TimeTz {
    pub fn new(utc_time: NaiveTime, zone: impl Into<String>) -> Self {
        Self {
            utc_time,
            zone: zone.into(),
        }
    }
}

impl TimestampTz {
    pub fn new(utc_timestamp: NaiveDateTime, zone: impl Into<String>) -> Self {
        Self {
            utc_timestamp,
            zone: zone.into(),
        }
    }
}
