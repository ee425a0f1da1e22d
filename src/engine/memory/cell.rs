//! Row cells and their placement into engine messages.

use crate::engine::MessageMetadata;
use crate::error::{Error, Result};
use crate::protocol::codec::{date, number, parse_boolean, zone, Decimal, FixedOffsetZones};
use crate::protocol::constants::{ISC_ARITH_EXCEPT, ISC_STRING_TRUNCATION};
use crate::protocol::types::SqlType;

/// One value of a scripted row, converted to the column type when placed.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    /// Unscaled magnitude for integer columns, a whole number otherwise.
    Integer(i128),
    Double(f64),
    /// Literal text, parsed for non-text columns.
    Text(String),
    Bool(bool),
    /// Wire image of the column value.
    Raw(Vec<u8>),
}

impl From<i32> for Cell {
    fn from(v: i32) -> Self {
        Cell::Integer(v as i128)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Integer(v as i128)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Double(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<bool> for Cell {
    fn from(v: bool) -> Self {
        Cell::Bool(v)
    }
}

#[track_caller]
fn out_of_bounds(needed: usize, available: usize) -> Error {
    Error::BufferTooSmall {
        needed,
        available,
        location: std::panic::Location::caller(),
    }
}

#[track_caller]
fn slot(message: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    message
        .get(offset..offset + len)
        .ok_or_else(|| out_of_bounds(offset + len, message.len()))
}

#[track_caller]
fn slot_mut(message: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    let available = message.len();
    message
        .get_mut(offset..offset + len)
        .ok_or_else(|| out_of_bounds(offset + len, available))
}

fn truncation(length: usize, max_length: u32) -> Error {
    Error::engine(
        vec![ISC_ARITH_EXCEPT, ISC_STRING_TRUNCATION],
        format!(
            "arithmetic exception, numeric overflow, or string truncation\n-string right truncation\n-expected length {}, actual {}",
            max_length, length
        ),
    )
}

/// Read field `index` of `message` as a cell: text for text columns, the
/// wire image for everything else.
pub fn read_cell(metadata: &dyn MessageMetadata, index: usize, message: &[u8]) -> Result<Cell> {
    let null_offset = metadata.null_offset(index)? as usize;
    let flag = i16::from_ne_bytes(slot(message, null_offset, 2)?.try_into().unwrap_or([0xff; 2]));
    if flag != 0 {
        return Ok(Cell::Null);
    }
    let sql_type = SqlType::from_raw(metadata.field_type(index)?)?;
    let offset = metadata.offset(index)? as usize;
    let length = metadata.length(index)?;
    match sql_type {
        SqlType::Varying => {
            let len = u16::from_ne_bytes(slot(message, offset, 2)?.try_into().unwrap_or([0; 2]));
            let bytes = slot(message, offset + 2, len as usize)?;
            Ok(Cell::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
        SqlType::Text => {
            let bytes = slot(message, offset, length as usize)?;
            Ok(Cell::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
        other => Ok(Cell::Raw(slot(message, offset, other.wire_size(length) as usize)?.to_vec())),
    }
}

/// Place `cell` into field `index` of `message` and set its null flag.
pub fn write_cell(
    metadata: &dyn MessageMetadata,
    index: usize,
    message: &mut [u8],
    cell: &Cell,
) -> Result<()> {
    let null_offset = metadata.null_offset(index)? as usize;
    if matches!(cell, Cell::Null) {
        slot_mut(message, null_offset, 2)?.copy_from_slice(&(-1i16).to_ne_bytes());
        return Ok(());
    }
    let sql_type = SqlType::from_raw(metadata.field_type(index)?)?;
    let scale = metadata.scale(index)?;
    let length = metadata.length(index)?;
    let image = encode_cell(sql_type, scale, length, cell)?;
    let offset = metadata.offset(index)? as usize;
    slot_mut(message, offset, image.len())?.copy_from_slice(&image);
    slot_mut(message, null_offset, 2)?.copy_from_slice(&0i16.to_ne_bytes());
    Ok(())
}

fn mismatch(cell: &Cell, sql_type: SqlType) -> Error {
    Error::conversion(format!("{:?}", cell), sql_type.to_string(), "unsupported cell for column")
}

/// Wire image of `cell` for a column of the given shape.
fn encode_cell(sql_type: SqlType, scale: i32, length: u32, cell: &Cell) -> Result<Vec<u8>> {
    let size = sql_type.wire_size(length) as usize;
    if let Cell::Raw(bytes) = cell {
        if bytes.len() != size {
            return Err(Error::conversion(
                "raw cell",
                sql_type.to_string(),
                format!("expected {} bytes, got {}", size, bytes.len()),
            ));
        }
        return Ok(bytes.clone());
    }

    let image = match sql_type {
        SqlType::Text | SqlType::Varying => {
            let text = match cell {
                Cell::Text(text) => text.clone(),
                Cell::Integer(v) => number::format_scaled(*v, scale),
                Cell::Double(v) => number::format_double(*v),
                Cell::Bool(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
                _ => return Err(mismatch(cell, sql_type)),
            };
            if text.len() > length as usize {
                return Err(truncation(text.len(), length));
            }
            if sql_type == SqlType::Text {
                let mut image = text.into_bytes();
                image.resize(length as usize, b' ');
                image
            } else {
                let mut image = (text.len() as u16).to_ne_bytes().to_vec();
                image.extend_from_slice(text.as_bytes());
                image
            }
        }
        SqlType::Boolean => {
            let value = match cell {
                Cell::Bool(v) => *v,
                Cell::Integer(v) => *v != 0,
                Cell::Text(text) => parse_boolean(text)?,
                _ => return Err(mismatch(cell, sql_type)),
            };
            vec![value as u8]
        }
        SqlType::Short | SqlType::Long | SqlType::Int64 | SqlType::Int128 => {
            let value = match cell {
                Cell::Integer(v) => *v,
                Cell::Double(v) => number::Number::double(*v).to_fixed(scale)?,
                Cell::Text(text) => {
                    let (value, text_scale) = number::parse_scaled(text)?;
                    number::Number::fixed(value, text_scale).to_fixed(scale)?
                }
                _ => return Err(mismatch(cell, sql_type)),
            };
            let target = sql_type.to_string();
            match sql_type {
                SqlType::Short => number::narrow::<i16>(value, &target)?.to_ne_bytes().to_vec(),
                SqlType::Long => number::narrow::<i32>(value, &target)?.to_ne_bytes().to_vec(),
                SqlType::Int64 => number::narrow::<i64>(value, &target)?.to_ne_bytes().to_vec(),
                _ => number::encode_int128(value).to_vec(),
            }
        }
        SqlType::Float | SqlType::Double => {
            let value = match cell {
                Cell::Integer(v) => *v as f64,
                Cell::Double(v) => *v,
                Cell::Text(text) => number::parse_double(text)?,
                _ => return Err(mismatch(cell, sql_type)),
            };
            if sql_type == SqlType::Float {
                (value as f32).to_ne_bytes().to_vec()
            } else {
                value.to_ne_bytes().to_vec()
            }
        }
        SqlType::Dec16 | SqlType::Dec34 => {
            let value = match cell {
                Cell::Integer(v) => Decimal::from_fixed(*v, 0),
                Cell::Double(v) => Decimal::from_f64(*v),
                Cell::Text(text) => text.parse::<Decimal>()?,
                _ => return Err(mismatch(cell, sql_type)),
            };
            if sql_type == SqlType::Dec16 {
                value.encode16()?.to_vec()
            } else {
                value.encode34()?.to_vec()
            }
        }
        SqlType::Date
        | SqlType::Time
        | SqlType::Timestamp
        | SqlType::TimeTz
        | SqlType::TimeTzEx
        | SqlType::TimestampTz
        | SqlType::TimestampTzEx => {
            let Cell::Text(text) = cell else {
                return Err(mismatch(cell, sql_type));
            };
            encode_temporal_text(sql_type, text)?
        }
        SqlType::Blob | SqlType::Null => return Err(mismatch(cell, sql_type)),
    };

    let mut image = image;
    image.resize(size, 0);
    Ok(image)
}

fn encode_temporal_text(sql_type: SqlType, text: &str) -> Result<Vec<u8>> {
    let mut image = Vec::with_capacity(12);
    match sql_type {
        SqlType::Date => {
            image.extend(date::encode_date(date::parse_date(text)?)?.to_ne_bytes());
        }
        SqlType::Time => {
            image.extend(date::encode_time(date::parse_time(text)?).to_ne_bytes());
        }
        SqlType::Timestamp => {
            let (d, t) = date::encode_timestamp(date::parse_timestamp(text)?)?;
            image.extend(d.to_ne_bytes());
            image.extend(t.to_ne_bytes());
        }
        SqlType::TimeTz | SqlType::TimeTzEx => {
            let (utc, id) = zone::parse_time_tz(text, &FixedOffsetZones)?;
            image.extend(date::encode_time(utc).to_ne_bytes());
            image.extend(id.to_ne_bytes());
        }
        _ => {
            let (utc, id) = zone::parse_timestamp_tz(text, &FixedOffsetZones)?;
            let (d, t) = date::encode_timestamp(utc)?;
            image.extend(d.to_ne_bytes());
            image.extend(t.to_ne_bytes());
            image.extend(id.to_ne_bytes());
        }
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{FieldSpec, MemoryMetadata};

    fn message(specs: Vec<FieldSpec>) -> (MemoryMetadata, Vec<u8>) {
        let metadata = MemoryMetadata::new(specs);
        let len = metadata.message_length().unwrap() as usize;
        (metadata, vec![0; len])
    }

    #[test]
    fn test_scaled_text_into_numeric() {
        let (metadata, mut buf) = message(vec![FieldSpec::new(SqlType::Int64).with_scale(-2)]);
        write_cell(&metadata, 0, &mut buf, &Cell::from("123.4")).unwrap();
        assert_eq!(i64::from_ne_bytes(buf[0..8].try_into().unwrap()), 12340);
        assert_eq!(read_cell(&metadata, 0, &buf).unwrap(), Cell::Raw(12340i64.to_ne_bytes().to_vec()));
    }

    #[test]
    fn test_text_padding_and_truncation() {
        let (metadata, mut buf) = message(vec![FieldSpec::new(SqlType::Text).with_length(4)]);
        write_cell(&metadata, 0, &mut buf, &Cell::from("ab")).unwrap();
        assert_eq!(&buf[0..4], b"ab  ");
        let err = write_cell(&metadata, 0, &mut buf, &Cell::from("abcde")).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_null_cell() {
        let (metadata, mut buf) = message(vec![FieldSpec::new(SqlType::Long)]);
        write_cell(&metadata, 0, &mut buf, &Cell::Null).unwrap();
        assert_eq!(read_cell(&metadata, 0, &buf).unwrap(), Cell::Null);
    }

    #[test]
    fn test_overflow() {
        let (metadata, mut buf) = message(vec![FieldSpec::new(SqlType::Short)]);
        assert!(write_cell(&metadata, 0, &mut buf, &Cell::Integer(40_000)).is_err());
    }
}
