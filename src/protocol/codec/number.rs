//! Scaled integer and binary float conversions.
//!
//! Fixed-point numbers are a magnitude and a decimal scale, with
//! `value = magnitude * 10^scale`. Every conversion between scales, widths
//! and representations goes through [`Number`], widened to `i128` for the
//! fixed-point case. Reading a column with fewer fractional digits rounds
//! half away from zero, the same rule the engine applies to numeric casts.
//! Binding a decimal value must be exact, and overflowing the destination is
//! always an error.

use super::decfloat::Decimal;
use crate::error::{Error, Result};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;

/// A numeric value in any of the representations a message field can hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Scaled integer of any width.
    Fixed { value: i128, scale: i32 },
    /// Binary float. `single` keeps FLOAT values rendering with f32 digits.
    Binary { value: f64, single: bool },
    /// Decimal float.
    Decimal(Decimal),
}

impl Number {
    pub fn fixed(value: impl Into<i128>, scale: i32) -> Self {
        Number::Fixed {
            value: value.into(),
            scale,
        }
    }

    pub fn double(value: f64) -> Self {
        Number::Binary {
            value,
            single: false,
        }
    }

    pub fn float(value: f32) -> Self {
        Number::Binary {
            value: value as f64,
            single: true,
        }
    }

    /// Name of the representation, used in conversion errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Number::Fixed { .. } => "scaled integer",
            Number::Binary { single: true, .. } => "float",
            Number::Binary { single: false, .. } => "double",
            Number::Decimal(_) => "decfloat",
        }
    }

    /// Convert to a scaled integer magnitude at `to_scale`.
    ///
    /// # Errors
    /// Returns `Error::Conversion` for non-finite values and when the magnitude
    /// does not fit in 128 bits.
    pub fn to_fixed(&self, to_scale: i32) -> Result<i128> {
        match *self {
            Number::Fixed { value, scale } => rescale(value, scale, to_scale).ok_or_else(|| {
                Error::conversion(
                    "scaled integer",
                    "scaled integer",
                    format!("{} overflows at scale {}", format_scaled(value, scale), to_scale),
                )
            }),
            Number::Binary { value, .. } => float_to_fixed(value, to_scale),
            Number::Decimal(d) => d.to_fixed(to_scale),
        }
    }

    /// Like [`Number::to_fixed`], but scaled integers and decimal floats must
    /// land on `to_scale` without losing digits. Binary floats still round.
    ///
    /// # Errors
    /// Returns `Error::Conversion` on overflow and on an inexact rescale.
    pub fn to_fixed_exact(&self, to_scale: i32) -> Result<i128> {
        let magnitude = self.to_fixed(to_scale)?;
        let (exact, shown) = match *self {
            Number::Fixed { value, scale } => (
                rescale_exact(value, scale, to_scale).is_some(),
                format_scaled(value, scale),
            ),
            Number::Decimal(d) => {
                let stored = BigDecimal::new(BigInt::from(magnitude), -(to_scale as i64));
                (d.to_big_decimal() == Some(stored), d.to_string())
            }
            Number::Binary { .. } => return Ok(magnitude),
        };
        if !exact {
            return Err(Error::conversion(
                self.kind_name(),
                "scaled integer",
                format!("{} is not representable at scale {}", shown, to_scale),
            ));
        }
        Ok(magnitude)
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            Number::Fixed { .. } => true,
            Number::Binary { value, .. } => value.is_finite(),
            Number::Decimal(d) => d.is_finite(),
        }
    }

    /// Convert to a binary double.
    pub fn to_f64(&self) -> f64 {
        match *self {
            Number::Fixed { value, scale } => fixed_to_f64(value, scale),
            Number::Binary { value, .. } => value,
            Number::Decimal(d) => d.to_f64(),
        }
    }

    /// Convert to a decimal float value (before precision rounding).
    pub fn to_decimal(&self) -> Decimal {
        match *self {
            Number::Fixed { value, scale } => Decimal::from_fixed(value, scale),
            Number::Binary { value, single } => {
                if single {
                    Decimal::from_f32(value as f32)
                } else {
                    Decimal::from_f64(value)
                }
            }
            Number::Decimal(d) => d,
        }
    }
}

/// Narrow a 128-bit magnitude into a smaller integer width.
pub fn narrow<T: TryFrom<i128>>(value: i128, target: &str) -> Result<T> {
    T::try_from(value).map_err(|_| {
        Error::conversion("scaled integer", target, format!("{} is out of range", value))
    })
}

fn pow10(exponent: u32) -> Option<i128> {
    10i128.checked_pow(exponent)
}

/// Move `value` from `from_scale` to `to_scale`.
///
/// Returns `None` on overflow. Dropped digits round half away from zero.
pub fn rescale(value: i128, from_scale: i32, to_scale: i32) -> Option<i128> {
    if from_scale == to_scale || value == 0 {
        return Some(value);
    }

    if from_scale > to_scale {
        let shift = from_scale.checked_sub(to_scale)?;
        value.checked_mul(pow10(u32::try_from(shift).ok()?)?)
    } else {
        // a shift past i32 leaves nothing of any i128
        let divisor = to_scale
            .checked_sub(from_scale)
            .and_then(|shift| u32::try_from(shift).ok())
            .and_then(pow10);
        Some(divisor.map_or(0, |divisor| div_round(value, divisor)))
    }
}

/// Like [`rescale`], but `None` also when non-zero digits would be dropped.
pub fn rescale_exact(value: i128, from_scale: i32, to_scale: i32) -> Option<i128> {
    let result = rescale(value, from_scale, to_scale)?;
    if from_scale < to_scale && rescale(result, to_scale, from_scale) != Some(value) {
        return None;
    }
    Some(result)
}

fn div_round(value: i128, divisor: i128) -> i128 {
    let quotient = value / divisor;
    let remainder = (value % divisor).unsigned_abs();
    if remainder * 2 >= divisor.unsigned_abs() {
        quotient + value.signum()
    } else {
        quotient
    }
}

fn float_to_fixed(value: f64, to_scale: i32) -> Result<i128> {
    if !value.is_finite() {
        return Err(Error::conversion(
            "double",
            "scaled integer",
            format!("{} cannot be represented", format_double(value)),
        ));
    }

    let scaled = if to_scale <= 0 {
        value * 10f64.powi(to_scale.saturating_neg())
    } else {
        value / 10f64.powi(to_scale)
    };
    let rounded = scaled.round();

    // i128::MAX is about 1.7e38
    if rounded.abs() >= 1.7e38 {
        return Err(Error::conversion(
            "double",
            "scaled integer",
            format!("{} overflows at scale {}", format_double(value), to_scale),
        ));
    }
    Ok(rounded as i128)
}

fn fixed_to_f64(value: i128, scale: i32) -> f64 {
    if scale < 0 {
        value as f64 / 10f64.powi(scale.saturating_neg())
    } else {
        value as f64 * 10f64.powi(scale)
    }
}

/// Parse literal text into a scaled integer.
///
/// The scale is the negated count of digits after the last `.`; the text
/// without the point must then parse completely as an integer.
///
/// # Errors
/// Returns `Error::Conversion` for malformed text or trailing characters.
pub fn parse_scaled(text: &str) -> Result<(i128, i32)> {
    let text = text.trim();
    let malformed = || Error::conversion("string", "scaled integer", format!("'{}' is not a number", text));

    let (digits, scale) = match text.rfind('.') {
        Some(dot) => {
            let fraction = text[dot + 1..]
                .bytes()
                .take_while(|b| b.is_ascii_digit())
                .count();
            let mut joined = String::with_capacity(text.len());
            joined.push_str(&text[..dot]);
            joined.push_str(&text[dot + 1..]);
            (joined, -(fraction as i32))
        }
        None => (text.to_string(), 0),
    };

    if digits.is_empty() || digits == "-" || digits == "+" {
        return Err(malformed());
    }
    let value = digits.parse::<i128>().map_err(|_| malformed())?;
    Ok((value, scale))
}

/// Render a scaled integer, e.g. `(12345, -2)` as `123.45`.
///
/// Scales wider than any i128 has digits render in exponent form instead.
pub fn format_scaled(value: i128, scale: i32) -> String {
    if scale.unsigned_abs() > 40 {
        return format!("{}E{}", value, scale);
    }
    if scale >= 0 {
        if value == 0 || scale == 0 {
            return value.to_string();
        }
        return format!("{}{}", value, "0".repeat(scale as usize));
    }

    let fraction_digits = (-scale) as usize;
    let mut digits = value.unsigned_abs().to_string();
    if digits.len() <= fraction_digits {
        digits = format!("{}{}", "0".repeat(fraction_digits + 1 - digits.len()), digits);
    }
    let point = digits.len() - fraction_digits;

    let mut out = String::with_capacity(digits.len() + 2);
    if value < 0 {
        out.push('-');
    }
    out.push_str(&digits[..point]);
    out.push('.');
    out.push_str(&digits[point..]);
    out
}

fn format_special(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NaN")
    } else if value == f64::INFINITY {
        Some("Infinity")
    } else if value == f64::NEG_INFINITY {
        Some("-Infinity")
    } else {
        None
    }
}

/// Render a double with the shortest digits that read back to the same value.
pub fn format_double(value: f64) -> String {
    if let Some(special) = format_special(value) {
        return special.to_string();
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-5..1e16).contains(&magnitude) {
        format!("{}", value)
    } else {
        format!("{:e}", value)
    }
}

/// Render a single precision float with its own shortest digits.
pub fn format_float(value: f32) -> String {
    if let Some(special) = format_special(value as f64) {
        return special.to_string();
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-5..1e16).contains(&magnitude) {
        format!("{}", value)
    } else {
        format!("{:e}", value)
    }
}

/// Parse a binary float literal, accepting `Infinity`, `-Infinity` and `NaN`.
pub fn parse_double(text: &str) -> Result<f64> {
    let text = text.trim();
    text.parse::<f64>()
        .map_err(|_| Error::conversion("string", "double", format!("'{}' is not a number", text)))
}

/// Native byte image of a 128-bit integer field.
pub fn encode_int128(value: i128) -> [u8; 16] {
    value.to_ne_bytes()
}

pub fn decode_int128(bytes: [u8; 16]) -> i128 {
    i128::from_ne_bytes(bytes)
}
