//! Typed parameter setters and column getters.
//!
//! Every setter validates the descriptor's adjusted type, writes the value
//! and only then clears the null flag, so a failed conversion never leaves a
//! field marked non-NULL. Getters return `Ok(None)` for NULL without looking
//! at the value bytes.
//!
//! Numeric accessors share one path: the field is read into a [`Number`] and
//! converted from there. Plain integer and float getters convert to scale 0;
//! scaled getters keep the column scale and refuse floating columns. A finite
//! number that would overflow a FLOAT or DOUBLE is a conversion error.

use super::Statement;
use crate::error::{Error, Result};
use crate::protocol::buffer::MessageBuffer;
use crate::protocol::codec::number::{
    decode_int128, encode_int128, format_double, format_float, format_scaled, narrow,
    parse_double, parse_scaled,
};
use crate::protocol::codec::{date, parse_boolean, zone, Decimal, Number};
use crate::protocol::types::{
    AdjustedType, BlobId, DecFloat, DecFloat16, DecFloat34, Descriptor, OpaqueDate,
    OpaqueDecFloat16, OpaqueDecFloat34, OpaqueInt128, OpaqueTime, OpaqueTimeTz, OpaqueTimestamp,
    OpaqueTimestampTz, Scaled, ScaledInt128, ScaledInt16, ScaledInt32, ScaledInt64,
    ScaledOpaqueInt128, TimeTz, TimestampTz, Value, ValueKind,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

fn invalid_type(actual: &str, descriptor: &Descriptor) -> Error {
    Error::InvalidType {
        actual: actual.to_string(),
        descriptor: descriptor.adjusted_type.to_string(),
    }
}

fn read_number(buffer: &MessageBuffer, descriptor: &Descriptor, actual: &str) -> Result<Number> {
    let offset = descriptor.offset as usize;
    let scale = descriptor.scale;
    Ok(match descriptor.adjusted_type {
        AdjustedType::Int16 => Number::fixed(buffer.read_i16(offset)?, scale),
        AdjustedType::Int32 => Number::fixed(buffer.read_i32(offset)?, scale),
        AdjustedType::Int64 => Number::fixed(buffer.read_i64(offset)?, scale),
        AdjustedType::Int128 => Number::fixed(decode_int128(buffer.read_array(offset)?), scale),
        AdjustedType::Float => Number::float(buffer.read_f32(offset)?),
        AdjustedType::Double => Number::double(buffer.read_f64(offset)?),
        AdjustedType::DecFloat16 => Number::Decimal(Decimal::decode16(buffer.read_array(offset)?)),
        AdjustedType::DecFloat34 => Number::Decimal(Decimal::decode34(buffer.read_array(offset)?)),
        _ => return Err(invalid_type(actual, descriptor)),
    })
}

fn write_number(
    buffer: &mut MessageBuffer,
    descriptor: &Descriptor,
    number: Number,
    actual: &str,
) -> Result<()> {
    let offset = descriptor.offset as usize;
    let scale = descriptor.scale;
    match descriptor.adjusted_type {
        AdjustedType::Int16 => {
            buffer.write_i16(offset, narrow(number.to_fixed_exact(scale)?, "SMALLINT")?)
        }
        AdjustedType::Int32 => {
            buffer.write_i32(offset, narrow(number.to_fixed_exact(scale)?, "INTEGER")?)
        }
        AdjustedType::Int64 => {
            buffer.write_i64(offset, narrow(number.to_fixed_exact(scale)?, "BIGINT")?)
        }
        AdjustedType::Int128 => {
            buffer.write_bytes(offset, &encode_int128(number.to_fixed_exact(scale)?))
        }
        AdjustedType::Float => buffer.write_f32(offset, to_single(number, "FLOAT")?),
        AdjustedType::Double => buffer.write_f64(offset, to_double(number, "DOUBLE")?),
        AdjustedType::DecFloat16 => buffer.write_bytes(offset, &number.to_decimal().encode16()?),
        AdjustedType::DecFloat34 => buffer.write_bytes(offset, &number.to_decimal().encode34()?),
        _ => Err(invalid_type(actual, descriptor)),
    }
}

fn float_overflow(number: Number, target: &str, value: f64) -> Error {
    Error::conversion(
        number.kind_name(),
        target,
        format!("numeric overflow: {} does not fit", format_double(value)),
    )
}

/// Double image of `number`. Only a non-finite source may become infinite.
fn to_double(number: Number, target: &str) -> Result<f64> {
    let value = number.to_f64();
    if number.is_finite() && value.is_infinite() {
        return Err(float_overflow(number, target, value));
    }
    Ok(value)
}

/// Single precision image of `number`, with the same overflow rule.
fn to_single(number: Number, target: &str) -> Result<f32> {
    let value = to_double(number, target)?;
    let narrowed = value as f32;
    if value.is_finite() && narrowed.is_infinite() {
        return Err(float_overflow(number, target, value));
    }
    Ok(narrowed)
}

fn rounded_decimal(number: Number, digits: u32) -> Result<DecFloat> {
    let format = if digits == 16 {
        crate::protocol::codec::decfloat::DECIMAL64
    } else {
        crate::protocol::codec::decfloat::DECIMAL128
    };
    Ok(DecFloat::from_decimal(number.to_decimal().normalize(format)?))
}

fn read_timestamp(buffer: &MessageBuffer, offset: usize) -> Result<OpaqueTimestamp> {
    Ok(OpaqueTimestamp {
        date: OpaqueDate(buffer.read_i32(offset)?),
        time: OpaqueTime(buffer.read_u32(offset + 4)?),
    })
}

fn write_timestamp(buffer: &mut MessageBuffer, offset: usize, value: OpaqueTimestamp) -> Result<()> {
    buffer.write_i32(offset, value.date.0)?;
    buffer.write_u32(offset + 4, value.time.0)
}

fn opaque_timestamp(value: NaiveDateTime) -> Result<OpaqueTimestamp> {
    let (date, time) = date::encode_timestamp(value)?;
    Ok(OpaqueTimestamp {
        date: OpaqueDate(date),
        time: OpaqueTime(time),
    })
}

fn naive_timestamp(value: OpaqueTimestamp) -> Result<NaiveDateTime> {
    date::decode_timestamp(value.date.0, value.time.0)
}

impl<'a> Statement<'a> {
    /// Descriptor and input buffer for a write to parameter `index`.
    fn input_field(&mut self, index: usize) -> Result<(&Descriptor, &mut MessageBuffer)> {
        self.check_valid()?;
        let count = self.input.descriptors.len();
        let descriptor = self
            .input
            .descriptors
            .get(index)
            .ok_or(Error::IndexOutOfRange { index, count })?;
        Ok((descriptor, &mut self.input.buffer))
    }

    /// Descriptor of output column `index`, or `None` when it is NULL.
    fn output_field(&self, index: usize) -> Result<Option<&Descriptor>> {
        let descriptor = self.output_descriptor(index)?;
        if self.output.buffer.is_null(descriptor.null_offset as usize)? {
            return Ok(None);
        }
        Ok(Some(descriptor))
    }

    fn set_number(&mut self, index: usize, number: Number, actual: &str) -> Result<()> {
        let (descriptor, buffer) = self.input_field(index)?;
        write_number(buffer, descriptor, number, actual)?;
        buffer.set_null(descriptor.null_offset as usize, false)
    }

    fn get_number(&self, index: usize, actual: &str) -> Result<Option<Number>> {
        let Some(descriptor) = self.output_field(index)? else {
            return Ok(None);
        };
        read_number(&self.output.buffer, descriptor, actual).map(Some)
    }

    /// Magnitude at the column's own scale. Floating columns have no scale to keep.
    fn get_scaled(&self, index: usize, actual: &str) -> Result<Option<(i128, i32)>> {
        let Some(descriptor) = self.output_field(index)? else {
            return Ok(None);
        };
        if descriptor.adjusted_type.is_floating() {
            return Err(invalid_type(actual, descriptor));
        }
        let number = read_number(&self.output.buffer, descriptor, actual)?;
        Ok(Some((number.to_fixed(descriptor.scale)?, descriptor.scale)))
    }

    fn get_unscaled(&self, index: usize, actual: &str) -> Result<Option<i128>> {
        self.get_number(index, actual)?
            .map(|number| number.to_fixed(0))
            .transpose()
    }

    /// Write raw bytes into a field of exactly `expected` type.
    fn set_exact(
        &mut self,
        index: usize,
        expected: AdjustedType,
        actual: &str,
        write: impl FnOnce(&mut MessageBuffer, usize) -> Result<()>,
    ) -> Result<()> {
        let (descriptor, buffer) = self.input_field(index)?;
        if descriptor.adjusted_type != expected {
            return Err(invalid_type(actual, descriptor));
        }
        write(buffer, descriptor.offset as usize)?;
        buffer.set_null(descriptor.null_offset as usize, false)
    }

    /// Read a non-NULL field of exactly `expected` type.
    fn get_exact<T>(
        &self,
        index: usize,
        expected: AdjustedType,
        actual: &str,
        read: impl FnOnce(&MessageBuffer, &Descriptor) -> Result<T>,
    ) -> Result<Option<T>> {
        let Some(descriptor) = self.output_field(index)? else {
            return Ok(None);
        };
        if descriptor.adjusted_type != expected {
            return Err(invalid_type(actual, descriptor));
        }
        read(&self.output.buffer, descriptor).map(Some)
    }

    pub fn set_bool(&mut self, index: usize, value: impl Into<Option<bool>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::Boolean, "bool", |buffer, offset| {
            buffer.write_u8(offset, value as u8)
        })
    }

    pub fn set_int16(&mut self, index: usize, value: impl Into<Option<i16>>) -> Result<()> {
        match value.into() {
            Some(value) => self.set_number(index, Number::fixed(value, 0), "i16"),
            None => self.set_null(index),
        }
    }

    pub fn set_scaled_int16(&mut self, index: usize, value: impl Into<Option<ScaledInt16>>) -> Result<()> {
        match value.into() {
            Some(v) => self.set_number(index, Number::fixed(v.value, v.scale), "ScaledInt16"),
            None => self.set_null(index),
        }
    }

    pub fn set_int32(&mut self, index: usize, value: impl Into<Option<i32>>) -> Result<()> {
        match value.into() {
            Some(value) => self.set_number(index, Number::fixed(value, 0), "i32"),
            None => self.set_null(index),
        }
    }

    pub fn set_scaled_int32(&mut self, index: usize, value: impl Into<Option<ScaledInt32>>) -> Result<()> {
        match value.into() {
            Some(v) => self.set_number(index, Number::fixed(v.value, v.scale), "ScaledInt32"),
            None => self.set_null(index),
        }
    }

    pub fn set_int64(&mut self, index: usize, value: impl Into<Option<i64>>) -> Result<()> {
        match value.into() {
            Some(value) => self.set_number(index, Number::fixed(value, 0), "i64"),
            None => self.set_null(index),
        }
    }

    pub fn set_scaled_int64(&mut self, index: usize, value: impl Into<Option<ScaledInt64>>) -> Result<()> {
        match value.into() {
            Some(v) => self.set_number(index, Number::fixed(v.value, v.scale), "ScaledInt64"),
            None => self.set_null(index),
        }
    }

    pub fn set_int128(&mut self, index: usize, value: impl Into<Option<i128>>) -> Result<()> {
        match value.into() {
            Some(value) => self.set_number(index, Number::fixed(value, 0), "i128"),
            None => self.set_null(index),
        }
    }

    pub fn set_scaled_int128(&mut self, index: usize, value: impl Into<Option<ScaledInt128>>) -> Result<()> {
        match value.into() {
            Some(v) => self.set_number(index, Number::fixed(v.value, v.scale), "ScaledInt128"),
            None => self.set_null(index),
        }
    }

    /// Bind engine-native INT128 bytes as they are, ignoring the column scale.
    pub fn set_opaque_int128(&mut self, index: usize, value: impl Into<Option<OpaqueInt128>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::Int128, "OpaqueInt128", |buffer, offset| {
            buffer.write_bytes(offset, &value.0)
        })
    }

    /// Bind engine-native INT128 bytes, rescaled when the scales differ.
    pub fn set_scaled_opaque_int128(
        &mut self,
        index: usize,
        value: impl Into<Option<ScaledOpaqueInt128>>,
    ) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        let (descriptor, buffer) = self.input_field(index)?;
        if descriptor.adjusted_type != AdjustedType::Int128 {
            return Err(invalid_type("ScaledOpaqueInt128", descriptor));
        }
        let magnitude =
            Number::fixed(value.value.to_i128(), value.scale).to_fixed_exact(descriptor.scale)?;
        buffer.write_bytes(descriptor.offset as usize, &encode_int128(magnitude))?;
        buffer.set_null(descriptor.null_offset as usize, false)
    }

    pub fn set_float(&mut self, index: usize, value: impl Into<Option<f32>>) -> Result<()> {
        match value.into() {
            Some(value) => self.set_number(index, Number::float(value), "f32"),
            None => self.set_null(index),
        }
    }

    pub fn set_double(&mut self, index: usize, value: impl Into<Option<f64>>) -> Result<()> {
        match value.into() {
            Some(value) => self.set_number(index, Number::double(value), "f64"),
            None => self.set_null(index),
        }
    }

    pub fn set_dec_float16(&mut self, index: usize, value: impl Into<Option<DecFloat16>>) -> Result<()> {
        match value.into() {
            Some(value) => self.set_number(index, Number::Decimal(value.0.to_decimal()?), "DecFloat16"),
            None => self.set_null(index),
        }
    }

    pub fn set_dec_float34(&mut self, index: usize, value: impl Into<Option<DecFloat34>>) -> Result<()> {
        match value.into() {
            Some(value) => self.set_number(index, Number::Decimal(value.0.to_decimal()?), "DecFloat34"),
            None => self.set_null(index),
        }
    }

    pub fn set_opaque_dec_float16(
        &mut self,
        index: usize,
        value: impl Into<Option<OpaqueDecFloat16>>,
    ) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::DecFloat16, "OpaqueDecFloat16", |buffer, offset| {
            buffer.write_bytes(offset, &value.0)
        })
    }

    pub fn set_opaque_dec_float34(
        &mut self,
        index: usize,
        value: impl Into<Option<OpaqueDecFloat34>>,
    ) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::DecFloat34, "OpaqueDecFloat34", |buffer, offset| {
            buffer.write_bytes(offset, &value.0)
        })
    }

    pub fn set_date(&mut self, index: usize, value: impl Into<Option<NaiveDate>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::Date, "Date", |buffer, offset| {
            buffer.write_i32(offset, date::encode_date(value)?)
        })
    }

    pub fn set_opaque_date(&mut self, index: usize, value: impl Into<Option<OpaqueDate>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::Date, "OpaqueDate", |buffer, offset| {
            buffer.write_i32(offset, value.0)
        })
    }

    pub fn set_time(&mut self, index: usize, value: impl Into<Option<NaiveTime>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::Time, "Time", |buffer, offset| {
            buffer.write_u32(offset, date::encode_time(value))
        })
    }

    pub fn set_opaque_time(&mut self, index: usize, value: impl Into<Option<OpaqueTime>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::Time, "OpaqueTime", |buffer, offset| {
            buffer.write_u32(offset, value.0)
        })
    }

    pub fn set_timestamp(&mut self, index: usize, value: impl Into<Option<NaiveDateTime>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::Timestamp, "Timestamp", |buffer, offset| {
            write_timestamp(buffer, offset, opaque_timestamp(value)?)
        })
    }

    pub fn set_opaque_timestamp(
        &mut self,
        index: usize,
        value: impl Into<Option<OpaqueTimestamp>>,
    ) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::Timestamp, "OpaqueTimestamp", |buffer, offset| {
            write_timestamp(buffer, offset, value)
        })
    }

    pub fn set_time_tz(&mut self, index: usize, value: impl Into<Option<TimeTz>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        let rules = self.attachment.zone_rules();
        let zone = rules.zone_id(&value.zone)?;
        self.set_exact(index, AdjustedType::TimeTz, "TimeTz", |buffer, offset| {
            buffer.write_u32(offset, date::encode_time(value.utc_time))?;
            buffer.write_u16(offset + 4, zone)
        })
    }

    pub fn set_opaque_time_tz(&mut self, index: usize, value: impl Into<Option<OpaqueTimeTz>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::TimeTz, "OpaqueTimeTz", |buffer, offset| {
            buffer.write_u32(offset, value.utc_time.0)?;
            buffer.write_u16(offset + 4, value.zone)
        })
    }

    pub fn set_timestamp_tz(&mut self, index: usize, value: impl Into<Option<TimestampTz>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        let rules = self.attachment.zone_rules();
        let zone = rules.zone_id(&value.zone)?;
        let utc = opaque_timestamp(value.utc_timestamp)?;
        self.set_exact(index, AdjustedType::TimestampTz, "TimestampTz", |buffer, offset| {
            write_timestamp(buffer, offset, utc)?;
            buffer.write_u16(offset + 8, zone)
        })
    }

    pub fn set_opaque_timestamp_tz(
        &mut self,
        index: usize,
        value: impl Into<Option<OpaqueTimestampTz>>,
    ) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::TimestampTz, "OpaqueTimestampTz", |buffer, offset| {
            write_timestamp(buffer, offset, value.utc_timestamp)?;
            buffer.write_u16(offset + 8, value.zone)
        })
    }

    pub fn set_blob_id(&mut self, index: usize, value: impl Into<Option<BlobId>>) -> Result<()> {
        let Some(value) = value.into() else {
            return self.set_null(index);
        };
        self.set_exact(index, AdjustedType::Blob, "BlobId", |buffer, offset| {
            buffer.write_bytes(offset, &value.to_bytes())
        })
    }

    /// Bind text, converting it to the parameter's type.
    ///
    /// Text parameters longer than the declared length fail with
    /// `Error::StringTruncation`. Numbers take their scale from the digits
    /// after the point and must fit the column scale exactly; malformed
    /// numbers are `Error::Conversion`, never zero.
    pub fn set_string<'v>(&mut self, index: usize, value: impl Into<Option<&'v str>>) -> Result<()> {
        let Some(text) = value.into() else {
            return self.set_null(index);
        };
        let attachment = self.attachment;
        let rules = attachment.zone_rules();
        let (descriptor, buffer) = self.input_field(index)?;
        let offset = descriptor.offset as usize;

        match descriptor.adjusted_type {
            AdjustedType::Boolean => buffer.write_u8(offset, parse_boolean(text)? as u8)?,
            AdjustedType::Int16 | AdjustedType::Int32 | AdjustedType::Int64 | AdjustedType::Int128 => {
                let (value, scale) = parse_scaled(text)?;
                write_number(buffer, descriptor, Number::fixed(value, scale), "String")?;
            }
            AdjustedType::Float | AdjustedType::Double => {
                write_number(buffer, descriptor, Number::double(parse_double(text)?), "String")?;
            }
            AdjustedType::DecFloat16 | AdjustedType::DecFloat34 => {
                write_number(buffer, descriptor, Number::Decimal(text.trim().parse()?), "String")?;
            }
            AdjustedType::Date => buffer.write_i32(offset, date::encode_date(date::parse_date(text)?)?)?,
            AdjustedType::Time => buffer.write_u32(offset, date::encode_time(date::parse_time(text)?))?,
            AdjustedType::Timestamp => {
                write_timestamp(buffer, offset, opaque_timestamp(date::parse_timestamp(text)?)?)?
            }
            AdjustedType::TimeTz => {
                let (utc, zone) = zone::parse_time_tz(text, rules)?;
                buffer.write_u32(offset, date::encode_time(utc))?;
                buffer.write_u16(offset + 4, zone)?;
            }
            AdjustedType::TimestampTz => {
                let (utc, zone) = zone::parse_timestamp_tz(text, rules)?;
                write_timestamp(buffer, offset, opaque_timestamp(utc)?)?;
                buffer.write_u16(offset + 8, zone)?;
            }
            AdjustedType::String => {
                if text.len() > descriptor.length as usize {
                    return Err(Error::StringTruncation {
                        length: text.len(),
                        max_length: descriptor.length as usize,
                    });
                }
                buffer.write_varying(offset, text.as_bytes())?;
            }
            AdjustedType::Blob | AdjustedType::Null => return Err(invalid_type("String", descriptor)),
        }

        buffer.set_null(descriptor.null_offset as usize, false)
    }

    pub fn get_bool(&self, index: usize) -> Result<Option<bool>> {
        self.get_exact(index, AdjustedType::Boolean, "bool", |buffer, d| {
            Ok(buffer.read_u8(d.offset as usize)? != 0)
        })
    }

    pub fn get_int16(&self, index: usize) -> Result<Option<i16>> {
        self.get_unscaled(index, "i16")?
            .map(|v| narrow(v, "i16"))
            .transpose()
    }

    pub fn get_scaled_int16(&self, index: usize) -> Result<Option<ScaledInt16>> {
        self.get_scaled(index, "ScaledInt16")?
            .map(|(v, scale)| narrow(v, "ScaledInt16").map(|v| Scaled::new(v, scale)))
            .transpose()
    }

    pub fn get_int32(&self, index: usize) -> Result<Option<i32>> {
        self.get_unscaled(index, "i32")?
            .map(|v| narrow(v, "i32"))
            .transpose()
    }

    pub fn get_scaled_int32(&self, index: usize) -> Result<Option<ScaledInt32>> {
        self.get_scaled(index, "ScaledInt32")?
            .map(|(v, scale)| narrow(v, "ScaledInt32").map(|v| Scaled::new(v, scale)))
            .transpose()
    }

    pub fn get_int64(&self, index: usize) -> Result<Option<i64>> {
        self.get_unscaled(index, "i64")?
            .map(|v| narrow(v, "i64"))
            .transpose()
    }

    pub fn get_scaled_int64(&self, index: usize) -> Result<Option<ScaledInt64>> {
        self.get_scaled(index, "ScaledInt64")?
            .map(|(v, scale)| narrow(v, "ScaledInt64").map(|v| Scaled::new(v, scale)))
            .transpose()
    }

    pub fn get_int128(&self, index: usize) -> Result<Option<i128>> {
        self.get_unscaled(index, "i128")
    }

    pub fn get_scaled_int128(&self, index: usize) -> Result<Option<ScaledInt128>> {
        Ok(self
            .get_scaled(index, "ScaledInt128")?
            .map(|(v, scale)| Scaled::new(v, scale)))
    }

    pub fn get_opaque_int128(&self, index: usize) -> Result<Option<OpaqueInt128>> {
        self.get_exact(index, AdjustedType::Int128, "OpaqueInt128", |buffer, d| {
            Ok(OpaqueInt128(buffer.read_array(d.offset as usize)?))
        })
    }

    pub fn get_scaled_opaque_int128(&self, index: usize) -> Result<Option<ScaledOpaqueInt128>> {
        self.get_exact(index, AdjustedType::Int128, "ScaledOpaqueInt128", |buffer, d| {
            Ok(Scaled::new(OpaqueInt128(buffer.read_array(d.offset as usize)?), d.scale))
        })
    }

    pub fn get_float(&self, index: usize) -> Result<Option<f32>> {
        self.get_number(index, "f32")?
            .map(|n| to_single(n, "f32"))
            .transpose()
    }

    pub fn get_double(&self, index: usize) -> Result<Option<f64>> {
        self.get_number(index, "f64")?
            .map(|n| to_double(n, "f64"))
            .transpose()
    }

    pub fn get_dec_float16(&self, index: usize) -> Result<Option<DecFloat16>> {
        self.get_number(index, "DecFloat16")?
            .map(|n| rounded_decimal(n, 16).map(DecFloat16))
            .transpose()
    }

    pub fn get_dec_float34(&self, index: usize) -> Result<Option<DecFloat34>> {
        self.get_number(index, "DecFloat34")?
            .map(|n| rounded_decimal(n, 34).map(DecFloat34))
            .transpose()
    }

    pub fn get_opaque_dec_float16(&self, index: usize) -> Result<Option<OpaqueDecFloat16>> {
        self.get_exact(index, AdjustedType::DecFloat16, "OpaqueDecFloat16", |buffer, d| {
            Ok(OpaqueDecFloat16(buffer.read_array(d.offset as usize)?))
        })
    }

    pub fn get_opaque_dec_float34(&self, index: usize) -> Result<Option<OpaqueDecFloat34>> {
        self.get_exact(index, AdjustedType::DecFloat34, "OpaqueDecFloat34", |buffer, d| {
            Ok(OpaqueDecFloat34(buffer.read_array(d.offset as usize)?))
        })
    }

    pub fn get_date(&self, index: usize) -> Result<Option<NaiveDate>> {
        self.get_exact(index, AdjustedType::Date, "Date", |buffer, d| {
            date::decode_date(buffer.read_i32(d.offset as usize)?)
        })
    }

    pub fn get_opaque_date(&self, index: usize) -> Result<Option<OpaqueDate>> {
        self.get_exact(index, AdjustedType::Date, "OpaqueDate", |buffer, d| {
            Ok(OpaqueDate(buffer.read_i32(d.offset as usize)?))
        })
    }

    pub fn get_time(&self, index: usize) -> Result<Option<NaiveTime>> {
        self.get_exact(index, AdjustedType::Time, "Time", |buffer, d| {
            date::decode_time(buffer.read_u32(d.offset as usize)?)
        })
    }

    pub fn get_opaque_time(&self, index: usize) -> Result<Option<OpaqueTime>> {
        self.get_exact(index, AdjustedType::Time, "OpaqueTime", |buffer, d| {
            Ok(OpaqueTime(buffer.read_u32(d.offset as usize)?))
        })
    }

    pub fn get_timestamp(&self, index: usize) -> Result<Option<NaiveDateTime>> {
        self.get_exact(index, AdjustedType::Timestamp, "Timestamp", |buffer, d| {
            naive_timestamp(read_timestamp(buffer, d.offset as usize)?)
        })
    }

    pub fn get_opaque_timestamp(&self, index: usize) -> Result<Option<OpaqueTimestamp>> {
        self.get_exact(index, AdjustedType::Timestamp, "OpaqueTimestamp", |buffer, d| {
            read_timestamp(buffer, d.offset as usize)
        })
    }

    pub fn get_time_tz(&self, index: usize) -> Result<Option<TimeTz>> {
        let rules = self.attachment.zone_rules();
        self.get_exact(index, AdjustedType::TimeTz, "TimeTz", |buffer, d| {
            let offset = d.offset as usize;
            let utc_time = date::decode_time(buffer.read_u32(offset)?)?;
            let zone = rules.zone_name(buffer.read_u16(offset + 4)?)?;
            Ok(TimeTz { utc_time, zone })
        })
    }

    pub fn get_opaque_time_tz(&self, index: usize) -> Result<Option<OpaqueTimeTz>> {
        self.get_exact(index, AdjustedType::TimeTz, "OpaqueTimeTz", |buffer, d| {
            let offset = d.offset as usize;
            Ok(OpaqueTimeTz {
                utc_time: OpaqueTime(buffer.read_u32(offset)?),
                zone: buffer.read_u16(offset + 4)?,
            })
        })
    }

    pub fn get_timestamp_tz(&self, index: usize) -> Result<Option<TimestampTz>> {
        let rules = self.attachment.zone_rules();
        self.get_exact(index, AdjustedType::TimestampTz, "TimestampTz", |buffer, d| {
            let offset = d.offset as usize;
            let utc_timestamp = naive_timestamp(read_timestamp(buffer, offset)?)?;
            let zone = rules.zone_name(buffer.read_u16(offset + 8)?)?;
            Ok(TimestampTz {
                utc_timestamp,
                zone,
            })
        })
    }

    pub fn get_opaque_timestamp_tz(&self, index: usize) -> Result<Option<OpaqueTimestampTz>> {
        self.get_exact(index, AdjustedType::TimestampTz, "OpaqueTimestampTz", |buffer, d| {
            let offset = d.offset as usize;
            Ok(OpaqueTimestampTz {
                utc_timestamp: read_timestamp(buffer, offset)?,
                zone: buffer.read_u16(offset + 8)?,
            })
        })
    }

    pub fn get_blob_id(&self, index: usize) -> Result<Option<BlobId>> {
        self.get_exact(index, AdjustedType::Blob, "BlobId", |buffer, d| {
            Ok(BlobId::from_bytes(buffer.read_array(d.offset as usize)?))
        })
    }

    /// Read any column as text.
    ///
    /// Numbers render at their scale, floats as `Infinity`, `-Infinity` and
    /// `NaN` when not finite, temporal values in the engine's own format and
    /// zoned values with their zone name.
    pub fn get_string(&self, index: usize) -> Result<Option<String>> {
        let Some(descriptor) = self.output_field(index)? else {
            return Ok(None);
        };
        let buffer = &self.output.buffer;
        let offset = descriptor.offset as usize;
        let rules = self.attachment.zone_rules();

        let text = match descriptor.adjusted_type {
            AdjustedType::Boolean => {
                let value = buffer.read_u8(offset)? != 0;
                value.to_string()
            }
            AdjustedType::Int16 | AdjustedType::Int32 | AdjustedType::Int64 | AdjustedType::Int128 => {
                let number = read_number(buffer, descriptor, "String")?;
                format_scaled(number.to_fixed(descriptor.scale)?, descriptor.scale)
            }
            AdjustedType::Float => format_float(buffer.read_f32(offset)?),
            AdjustedType::Double => format_double(buffer.read_f64(offset)?),
            AdjustedType::DecFloat16 => Decimal::decode16(buffer.read_array(offset)?).to_string(),
            AdjustedType::DecFloat34 => Decimal::decode34(buffer.read_array(offset)?).to_string(),
            AdjustedType::Date => date::format_date(date::decode_date(buffer.read_i32(offset)?)?),
            AdjustedType::Time => date::format_time(date::decode_time(buffer.read_u32(offset)?)?),
            AdjustedType::Timestamp => {
                date::format_timestamp(naive_timestamp(read_timestamp(buffer, offset)?)?)
            }
            AdjustedType::TimeTz => {
                let utc = date::decode_time(buffer.read_u32(offset)?)?;
                zone::format_time_tz(utc, buffer.read_u16(offset + 4)?, rules)?
            }
            AdjustedType::TimestampTz => {
                let utc = naive_timestamp(read_timestamp(buffer, offset)?)?;
                zone::format_timestamp_tz(utc, buffer.read_u16(offset + 8)?, rules)?
            }
            AdjustedType::String => {
                let bytes = buffer.read_varying(offset)?;
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| Error::conversion("VARCHAR", "String", e.to_string()))?
            }
            AdjustedType::Blob | AdjustedType::Null => return Err(invalid_type("String", descriptor)),
        };
        Ok(Some(text))
    }

    /// Read a column as the value kind `kind`; NULL reads as `Value::Null`.
    pub fn get_value(&self, index: usize, kind: ValueKind) -> Result<Value> {
        let value = match kind {
            ValueKind::Null => {
                if self.is_null(index)? {
                    Some(Value::Null)
                } else {
                    return Err(invalid_type("Null", self.output_descriptor(index)?));
                }
            }
            ValueKind::Boolean => self.get_bool(index)?.map(Value::Boolean),
            ValueKind::Int16 => self.get_int16(index)?.map(Value::Int16),
            ValueKind::ScaledInt16 => self.get_scaled_int16(index)?.map(Value::ScaledInt16),
            ValueKind::Int32 => self.get_int32(index)?.map(Value::Int32),
            ValueKind::ScaledInt32 => self.get_scaled_int32(index)?.map(Value::ScaledInt32),
            ValueKind::Int64 => self.get_int64(index)?.map(Value::Int64),
            ValueKind::ScaledInt64 => self.get_scaled_int64(index)?.map(Value::ScaledInt64),
            ValueKind::Int128 => self.get_int128(index)?.map(Value::Int128),
            ValueKind::ScaledInt128 => self.get_scaled_int128(index)?.map(Value::ScaledInt128),
            ValueKind::OpaqueInt128 => self.get_opaque_int128(index)?.map(Value::OpaqueInt128),
            ValueKind::ScaledOpaqueInt128 => self
                .get_scaled_opaque_int128(index)?
                .map(Value::ScaledOpaqueInt128),
            ValueKind::Float => self.get_float(index)?.map(Value::Float),
            ValueKind::Double => self.get_double(index)?.map(Value::Double),
            ValueKind::DecFloat16 => self.get_dec_float16(index)?.map(Value::DecFloat16),
            ValueKind::OpaqueDecFloat16 => self.get_opaque_dec_float16(index)?.map(Value::OpaqueDecFloat16),
            ValueKind::DecFloat34 => self.get_dec_float34(index)?.map(Value::DecFloat34),
            ValueKind::OpaqueDecFloat34 => self.get_opaque_dec_float34(index)?.map(Value::OpaqueDecFloat34),
            ValueKind::Date => self.get_date(index)?.map(Value::Date),
            ValueKind::OpaqueDate => self.get_opaque_date(index)?.map(Value::OpaqueDate),
            ValueKind::Time => self.get_time(index)?.map(Value::Time),
            ValueKind::OpaqueTime => self.get_opaque_time(index)?.map(Value::OpaqueTime),
            ValueKind::Timestamp => self.get_timestamp(index)?.map(Value::Timestamp),
            ValueKind::OpaqueTimestamp => self.get_opaque_timestamp(index)?.map(Value::OpaqueTimestamp),
            ValueKind::TimeTz => self.get_time_tz(index)?.map(Value::TimeTz),
            ValueKind::OpaqueTimeTz => self.get_opaque_time_tz(index)?.map(Value::OpaqueTimeTz),
            ValueKind::TimestampTz => self.get_timestamp_tz(index)?.map(Value::TimestampTz),
            ValueKind::OpaqueTimestampTz => self
                .get_opaque_timestamp_tz(index)?
                .map(Value::OpaqueTimestampTz),
            ValueKind::String => self.get_string(index)?.map(Value::String),
            ValueKind::BlobId => self.get_blob_id(index)?.map(Value::BlobId),
        };
        Ok(value.unwrap_or(Value::Null))
    }

    /// Bind a value through the setter for its kind.
    pub fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
        match value {
            Value::Null => self.set_null(index),
            Value::Boolean(v) => self.set_bool(index, v),
            Value::Int16(v) => self.set_int16(index, v),
            Value::ScaledInt16(v) => self.set_scaled_int16(index, v),
            Value::Int32(v) => self.set_int32(index, v),
            Value::ScaledInt32(v) => self.set_scaled_int32(index, v),
            Value::Int64(v) => self.set_int64(index, v),
            Value::ScaledInt64(v) => self.set_scaled_int64(index, v),
            Value::Int128(v) => self.set_int128(index, v),
            Value::ScaledInt128(v) => self.set_scaled_int128(index, v),
            Value::OpaqueInt128(v) => self.set_opaque_int128(index, v),
            Value::ScaledOpaqueInt128(v) => self.set_scaled_opaque_int128(index, v),
            Value::Float(v) => self.set_float(index, v),
            Value::Double(v) => self.set_double(index, v),
            Value::DecFloat16(v) => self.set_dec_float16(index, v),
            Value::OpaqueDecFloat16(v) => self.set_opaque_dec_float16(index, v),
            Value::DecFloat34(v) => self.set_dec_float34(index, v),
            Value::OpaqueDecFloat34(v) => self.set_opaque_dec_float34(index, v),
            Value::Date(v) => self.set_date(index, v),
            Value::OpaqueDate(v) => self.set_opaque_date(index, v),
            Value::Time(v) => self.set_time(index, v),
            Value::OpaqueTime(v) => self.set_opaque_time(index, v),
            Value::Timestamp(v) => self.set_timestamp(index, v),
            Value::OpaqueTimestamp(v) => self.set_opaque_timestamp(index, v),
            Value::TimeTz(v) => self.set_time_tz(index, v),
            Value::OpaqueTimeTz(v) => self.set_opaque_time_tz(index, v),
            Value::TimestampTz(v) => self.set_timestamp_tz(index, v),
            Value::OpaqueTimestampTz(v) => self.set_opaque_timestamp_tz(index, v),
            Value::String(v) => self.set_string(index, v.as_str()),
            Value::BlobId(v) => self.set_blob_id(index, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{Attachment, AttachmentOptions};
    use crate::client::Client;
    use crate::statement::StatementOptions;
    use crate::transaction::{Transaction, TransactionOptions};

    fn with_statement(uri: &str, sql: &str, check: impl FnOnce(&mut Statement<'_>, &Transaction<'_>)) {
        let client = Client::memory();
        let options = AttachmentOptions::new().with_create_database(true);
        let attachment = Attachment::connect(&client, uri, &options).unwrap();
        let transaction = Transaction::start(&attachment, &TransactionOptions::new()).unwrap();
        let mut statement =
            Statement::prepare(&attachment, &transaction, sql, &StatementOptions::new()).unwrap();
        check(&mut statement, &transaction);
    }

    #[test]
    fn test_failed_setter_keeps_null_flag() {
        with_statement(
            "mem:acc-null-flag",
            "select cast(? as smallint) from rdb$database",
            |statement, transaction| {
                assert!(statement.set_int32(0, 70000).is_err());
                statement.execute(transaction).unwrap();
                assert!(statement.is_null(0).unwrap());
            },
        );
    }

    #[test]
    fn test_invalid_type_names_both_sides() {
        with_statement(
            "mem:acc-invalid",
            "select cast(? as date) from rdb$database",
            |statement, _| {
                let err = statement.set_bool(0, true).unwrap_err();
                assert_eq!(
                    err.to_string(),
                    "Invalid type: actual type bool, descriptor type DATE"
                );
            },
        );
    }

    #[test]
    fn test_scaled_getter_refuses_floats() {
        with_statement(
            "mem:acc-float-scale",
            "select cast(? as double precision) from rdb$database",
            |statement, transaction| {
                statement.set_double(0, 2.5).unwrap();
                statement.execute(transaction).unwrap();
                assert!(matches!(
                    statement.get_scaled_int32(0),
                    Err(Error::InvalidType { .. })
                ));
                assert_eq!(statement.get_int32(0).unwrap(), Some(3));
            },
        );
    }

    #[test]
    fn test_value_dispatch() {
        with_statement(
            "mem:acc-value",
            "select cast(? as integer), cast(? as varchar(5)) from rdb$database",
            |statement, transaction| {
                statement.set_value(0, Value::Int16(-4)).unwrap();
                statement.set_value(1, Value::Null).unwrap();
                statement.execute(transaction).unwrap();
                assert_eq!(statement.get_value(0, ValueKind::Int64).unwrap(), Value::Int64(-4));
                assert_eq!(statement.get_value(1, ValueKind::String).unwrap(), Value::Null);
                assert_eq!(statement.get_value(1, ValueKind::Null).unwrap(), Value::Null);
                assert!(statement.get_value(0, ValueKind::Null).is_err());
            },
        );
    }
}
