//! The closed set of values a message field can be bound to or read as.

use super::{
    BlobId, DecFloat16, DecFloat34, OpaqueDate, OpaqueDecFloat16, OpaqueDecFloat34, OpaqueInt128,
    OpaqueTime, OpaqueTimeTz, OpaqueTimestamp, OpaqueTimestampTz, ScaledInt128, ScaledInt16,
    ScaledInt32, ScaledInt64, ScaledOpaqueInt128, TimeTz, TimestampTz,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// A single bound value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    Boolean(bool),
    Int16(i16),
    ScaledInt16(ScaledInt16),
    Int32(i32),
    ScaledInt32(ScaledInt32),
    Int64(i64),
    ScaledInt64(ScaledInt64),
    Int128(i128),
    ScaledInt128(ScaledInt128),
    OpaqueInt128(OpaqueInt128),
    ScaledOpaqueInt128(ScaledOpaqueInt128),
    Float(f32),
    Double(f64),
    DecFloat16(DecFloat16),
    OpaqueDecFloat16(OpaqueDecFloat16),
    DecFloat34(DecFloat34),
    OpaqueDecFloat34(OpaqueDecFloat34),
    Date(NaiveDate),
    OpaqueDate(OpaqueDate),
    Time(NaiveTime),
    OpaqueTime(OpaqueTime),
    Timestamp(NaiveDateTime),
    OpaqueTimestamp(OpaqueTimestamp),
    TimeTz(TimeTz),
    OpaqueTimeTz(OpaqueTimeTz),
    TimestampTz(TimestampTz),
    OpaqueTimestampTz(OpaqueTimestampTz),
    String(String),
    BlobId(BlobId),
}

/// Discriminant of [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Int16,
    ScaledInt16,
    Int32,
    ScaledInt32,
    Int64,
    ScaledInt64,
    Int128,
    ScaledInt128,
    OpaqueInt128,
    ScaledOpaqueInt128,
    Float,
    Double,
    DecFloat16,
    OpaqueDecFloat16,
    DecFloat34,
    OpaqueDecFloat34,
    Date,
    OpaqueDate,
    Time,
    OpaqueTime,
    Timestamp,
    OpaqueTimestamp,
    TimeTz,
    OpaqueTimeTz,
    TimestampTz,
    OpaqueTimestampTz,
    String,
    BlobId,
}

impl ValueKind {
    /// Engine-native kinds that only ever match their own wire type.
    pub fn is_opaque(&self) -> bool {
        matches!(
            self,
            ValueKind::OpaqueInt128
                | ValueKind::ScaledOpaqueInt128
                | ValueKind::OpaqueDecFloat16
                | ValueKind::OpaqueDecFloat34
                | ValueKind::OpaqueDate
                | ValueKind::OpaqueTime
                | ValueKind::OpaqueTimestamp
                | ValueKind::OpaqueTimeTz
                | ValueKind::OpaqueTimestampTz
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Value {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Int16(_) => ValueKind::Int16,
            Value::ScaledInt16(_) => ValueKind::ScaledInt16,
            Value::Int32(_) => ValueKind::Int32,
            Value::ScaledInt32(_) => ValueKind::ScaledInt32,
            Value::Int64(_) => ValueKind::Int64,
            Value::ScaledInt64(_) => ValueKind::ScaledInt64,
            Value::Int128(_) => ValueKind::Int128,
            Value::ScaledInt128(_) => ValueKind::ScaledInt128,
            Value::OpaqueInt128(_) => ValueKind::OpaqueInt128,
            Value::ScaledOpaqueInt128(_) => ValueKind::ScaledOpaqueInt128,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::DecFloat16(_) => ValueKind::DecFloat16,
            Value::OpaqueDecFloat16(_) => ValueKind::OpaqueDecFloat16,
            Value::DecFloat34(_) => ValueKind::DecFloat34,
            Value::OpaqueDecFloat34(_) => ValueKind::OpaqueDecFloat34,
            Value::Date(_) => ValueKind::Date,
            Value::OpaqueDate(_) => ValueKind::OpaqueDate,
            Value::Time(_) => ValueKind::Time,
            Value::OpaqueTime(_) => ValueKind::OpaqueTime,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::OpaqueTimestamp(_) => ValueKind::OpaqueTimestamp,
            Value::TimeTz(_) => ValueKind::TimeTz,
            Value::OpaqueTimeTz(_) => ValueKind::OpaqueTimeTz,
            Value::TimestampTz(_) => ValueKind::TimestampTz,
            Value::OpaqueTimestampTz(_) => ValueKind::OpaqueTimestampTz,
            Value::String(_) => ValueKind::String,
            Value::BlobId(_) => ValueKind::BlobId,
        }
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to widen an unscaled integer value to i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::Int128(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to convert a binary float value to f64.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
