//! Wire types as reported by the engine, and the adjusted types used for dispatch.
//!
//! The wire type describes how a value sits in a message buffer. The adjusted
//! type collapses wire types that share one representation on this side of the
//! binding: fixed and variable length text both become `String`, and the
//! extended zoned time types become their plain zoned counterparts.

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use std::fmt;

/// Engine wire type of a message field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Text,
    Varying,
    Short,
    Long,
    Float,
    Double,
    Timestamp,
    Blob,
    Time,
    Date,
    Int64,
    TimestampTzEx,
    TimeTzEx,
    Int128,
    TimestampTz,
    TimeTz,
    Dec16,
    Dec34,
    Boolean,
    Null,
}

impl SqlType {
    /// Create from a raw engine type code. The nullable bit is ignored.
    ///
    /// Returns `Err(Error::Unsupported)` for codes this binding cannot marshal
    /// (arrays, D_FLOAT, legacy quads).
    pub fn from_raw(code: u32) -> Result<Self> {
        match code & !1 {
            SQL_TEXT => Ok(SqlType::Text),
            SQL_VARYING => Ok(SqlType::Varying),
            SQL_SHORT => Ok(SqlType::Short),
            SQL_LONG => Ok(SqlType::Long),
            SQL_FLOAT => Ok(SqlType::Float),
            SQL_DOUBLE => Ok(SqlType::Double),
            SQL_TIMESTAMP => Ok(SqlType::Timestamp),
            SQL_BLOB => Ok(SqlType::Blob),
            SQL_TYPE_TIME => Ok(SqlType::Time),
            SQL_TYPE_DATE => Ok(SqlType::Date),
            SQL_INT64 => Ok(SqlType::Int64),
            SQL_TIMESTAMP_TZ_EX => Ok(SqlType::TimestampTzEx),
            SQL_TIME_TZ_EX => Ok(SqlType::TimeTzEx),
            SQL_INT128 => Ok(SqlType::Int128),
            SQL_TIMESTAMP_TZ => Ok(SqlType::TimestampTz),
            SQL_TIME_TZ => Ok(SqlType::TimeTz),
            SQL_DEC16 => Ok(SqlType::Dec16),
            SQL_DEC34 => Ok(SqlType::Dec34),
            SQL_BOOLEAN => Ok(SqlType::Boolean),
            SQL_NULL => Ok(SqlType::Null),
            other => Err(Error::Unsupported {
                message: format!("SQL type {}", other),
            }),
        }
    }

    /// Raw engine type code.
    pub fn code(&self) -> u32 {
        match self {
            SqlType::Text => SQL_TEXT,
            SqlType::Varying => SQL_VARYING,
            SqlType::Short => SQL_SHORT,
            SqlType::Long => SQL_LONG,
            SqlType::Float => SQL_FLOAT,
            SqlType::Double => SQL_DOUBLE,
            SqlType::Timestamp => SQL_TIMESTAMP,
            SqlType::Blob => SQL_BLOB,
            SqlType::Time => SQL_TYPE_TIME,
            SqlType::Date => SQL_TYPE_DATE,
            SqlType::Int64 => SQL_INT64,
            SqlType::TimestampTzEx => SQL_TIMESTAMP_TZ_EX,
            SqlType::TimeTzEx => SQL_TIME_TZ_EX,
            SqlType::Int128 => SQL_INT128,
            SqlType::TimestampTz => SQL_TIMESTAMP_TZ,
            SqlType::TimeTz => SQL_TIME_TZ,
            SqlType::Dec16 => SQL_DEC16,
            SqlType::Dec34 => SQL_DEC34,
            SqlType::Boolean => SQL_BOOLEAN,
            SqlType::Null => SQL_NULL,
        }
    }

    /// Bytes a value of this type occupies in a message, given the declared length.
    ///
    /// Only `Text` and `Varying` depend on `length`; `Varying` adds its
    /// 2-byte length prefix.
    pub fn wire_size(&self, length: u32) -> u32 {
        match self {
            SqlType::Text => length,
            SqlType::Varying => length + 2,
            SqlType::Boolean => 1,
            SqlType::Short => 2,
            SqlType::Long | SqlType::Float | SqlType::Time | SqlType::Date => 4,
            SqlType::Double | SqlType::Int64 | SqlType::Timestamp | SqlType::Blob => 8,
            SqlType::Dec16 | SqlType::TimeTz | SqlType::TimeTzEx => 8,
            SqlType::Dec34 | SqlType::Int128 => 16,
            SqlType::TimestampTz | SqlType::TimestampTzEx => 12,
            SqlType::Null => 0,
        }
    }

    /// Alignment the engine applies to a field of this type.
    pub fn alignment(&self) -> u32 {
        match self {
            SqlType::Text | SqlType::Boolean | SqlType::Null => 1,
            SqlType::Varying | SqlType::Short => 2,
            SqlType::Long
            | SqlType::Float
            | SqlType::Time
            | SqlType::Date
            | SqlType::Timestamp
            | SqlType::Blob
            | SqlType::TimeTz
            | SqlType::TimeTzEx
            | SqlType::TimestampTz
            | SqlType::TimestampTzEx => 4,
            SqlType::Double | SqlType::Int64 | SqlType::Dec16 | SqlType::Dec34 | SqlType::Int128 => 8,
        }
    }

    /// Adjusted type this wire type is handled as.
    pub fn adjusted(&self) -> AdjustedType {
        match self {
            SqlType::Text | SqlType::Varying => AdjustedType::String,
            SqlType::Short => AdjustedType::Int16,
            SqlType::Long => AdjustedType::Int32,
            SqlType::Int64 => AdjustedType::Int64,
            SqlType::Int128 => AdjustedType::Int128,
            SqlType::Float => AdjustedType::Float,
            SqlType::Double => AdjustedType::Double,
            SqlType::Dec16 => AdjustedType::DecFloat16,
            SqlType::Dec34 => AdjustedType::DecFloat34,
            SqlType::Date => AdjustedType::Date,
            SqlType::Time => AdjustedType::Time,
            SqlType::Timestamp => AdjustedType::Timestamp,
            SqlType::TimeTz | SqlType::TimeTzEx => AdjustedType::TimeTz,
            SqlType::TimestampTz | SqlType::TimestampTzEx => AdjustedType::TimestampTz,
            SqlType::Blob => AdjustedType::Blob,
            SqlType::Boolean => AdjustedType::Boolean,
            SqlType::Null => AdjustedType::Null,
        }
    }

    /// Wire type the metadata builder must rewrite this field to, if any.
    pub fn normalized(&self) -> Option<SqlType> {
        match self {
            SqlType::Text => Some(SqlType::Varying),
            SqlType::TimeTzEx => Some(SqlType::TimeTz),
            SqlType::TimestampTzEx => Some(SqlType::TimestampTz),
            _ => None,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Text => "TEXT",
            SqlType::Varying => "VARYING",
            SqlType::Short => "SHORT",
            SqlType::Long => "LONG",
            SqlType::Float => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Blob => "BLOB",
            SqlType::Time => "TIME",
            SqlType::Date => "DATE",
            SqlType::Int64 => "INT64",
            SqlType::TimestampTzEx => "TIMESTAMP_TZ_EX",
            SqlType::TimeTzEx => "TIME_TZ_EX",
            SqlType::Int128 => "INT128",
            SqlType::TimestampTz => "TIMESTAMP_TZ",
            SqlType::TimeTz => "TIME_TZ",
            SqlType::Dec16 => "DEC16",
            SqlType::Dec34 => "DEC34",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Null => "NULL",
        };
        f.write_str(name)
    }
}

/// Normalized type used to dispatch typed accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjustedType {
    Boolean,
    Int16,
    Int32,
    Int64,
    Int128,
    Float,
    Double,
    DecFloat16,
    DecFloat34,
    Date,
    Time,
    Timestamp,
    TimeTz,
    TimestampTz,
    String,
    Blob,
    Null,
}

impl AdjustedType {
    /// Whether values of this type carry a decimal scale.
    pub fn is_scaled_integer(&self) -> bool {
        matches!(
            self,
            AdjustedType::Int16 | AdjustedType::Int32 | AdjustedType::Int64 | AdjustedType::Int128
        )
    }

    /// Whether this type holds an inexact (binary or decimal float) number.
    pub fn is_floating(&self) -> bool {
        matches!(
            self,
            AdjustedType::Float
                | AdjustedType::Double
                | AdjustedType::DecFloat16
                | AdjustedType::DecFloat34
        )
    }
}

impl fmt::Display for AdjustedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdjustedType::Boolean => "BOOLEAN",
            AdjustedType::Int16 => "INT16",
            AdjustedType::Int32 => "INT32",
            AdjustedType::Int64 => "INT64",
            AdjustedType::Int128 => "INT128",
            AdjustedType::Float => "FLOAT",
            AdjustedType::Double => "DOUBLE",
            AdjustedType::DecFloat16 => "DECFLOAT16",
            AdjustedType::DecFloat34 => "DECFLOAT34",
            AdjustedType::Date => "DATE",
            AdjustedType::Time => "TIME",
            AdjustedType::Timestamp => "TIMESTAMP",
            AdjustedType::TimeTz => "TIME_TZ",
            AdjustedType::TimestampTz => "TIMESTAMP_TZ",
            AdjustedType::String => "STRING",
            AdjustedType::Blob => "BLOB",
            AdjustedType::Null => "NULL",
        };
        f.write_str(name)
    }
}
