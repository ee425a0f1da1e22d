//! DECFLOAT(16) and DECFLOAT(34) codec.
//!
//! The engine stores decimal floats as IEEE 754-2008 decimal64 / decimal128
//! values with a densely packed decimal (DPD) coefficient, in native byte
//! order. Layout from the most significant bit:
//! - sign (1 bit)
//! - combination field (5 bits): exponent high bits + leading digit, or a special marker
//! - exponent continuation (8 / 12 bits)
//! - coefficient continuation (5 / 11 declets of 10 bits, 3 digits each)
//!
//! Encoding rounds the coefficient half-even to the format's precision and
//! clamps the exponent; a value too large for the format is an error.

use crate::error::{Error, Result};
use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::{BigInt, Sign};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Parameters of one interchange format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    name: &'static str,
    digits: u32,
    bias: i32,
    max_biased_exponent: i32,
    continuation_bits: u32,
    declets: u32,
}

pub const DECIMAL64: Format = Format {
    name: "DECFLOAT(16)",
    digits: 16,
    bias: 398,
    max_biased_exponent: 767,
    continuation_bits: 8,
    declets: 5,
};

pub const DECIMAL128: Format = Format {
    name: "DECFLOAT(34)",
    digits: 34,
    bias: 6176,
    max_biased_exponent: 12287,
    continuation_bits: 12,
    declets: 11,
};

impl Format {
    fn width(&self) -> u32 {
        1 + 5 + self.continuation_bits + 10 * self.declets
    }

    fn min_exponent(&self) -> i32 {
        -self.bias
    }

    fn max_exponent(&self) -> i32 {
        self.max_biased_exponent - self.bias
    }

    fn max_coefficient(&self) -> u128 {
        10u128.pow(self.digits) - 1
    }
}

/// A decoded decimal float.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decimal {
    Finite {
        negative: bool,
        coefficient: u128,
        exponent: i32,
    },
    Infinite {
        negative: bool,
    },
    NaN {
        negative: bool,
        signaling: bool,
    },
}

fn declet_table() -> &'static ([u16; 1024], [u16; 1000]) {
    static TABLE: OnceLock<([u16; 1024], [u16; 1000])> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut decode = [0u16; 1024];
        let mut encode = [u16::MAX; 1000];
        for declet in 0..1024u16 {
            let value = decode_declet(declet);
            decode[declet as usize] = value;
            // first hit is the canonical encoding
            if encode[value as usize] == u16::MAX {
                encode[value as usize] = declet;
            }
        }
        (decode, encode)
    })
}

/// Decode one 10-bit declet (bits `pqr stu v wxy`) into a value 0..=999.
fn decode_declet(declet: u16) -> u16 {
    let bit = |n: u16| (declet >> n) & 1;
    let (p, q, r) = (bit(9), bit(8), bit(7));
    let (s, t, u) = (bit(6), bit(5), bit(4));
    let (v, w, x, y) = (bit(3), bit(2), bit(1), bit(0));

    let (d2, d1, d0) = if v == 0 {
        (4 * p + 2 * q + r, 4 * s + 2 * t + u, 4 * w + 2 * x + y)
    } else {
        match (w, x, s, t) {
            (0, 0, _, _) => (4 * p + 2 * q + r, 4 * s + 2 * t + u, 8 + y),
            (0, 1, _, _) => (4 * p + 2 * q + r, 8 + u, 4 * s + 2 * t + y),
            (1, 0, _, _) => (8 + r, 4 * s + 2 * t + u, 4 * p + 2 * q + y),
            (1, 1, 0, 0) => (8 + r, 8 + u, 4 * p + 2 * q + y),
            (1, 1, 0, 1) => (8 + r, 4 * p + 2 * q + u, 8 + y),
            (1, 1, 1, 0) => (4 * p + 2 * q + r, 8 + u, 8 + y),
            _ => (8 + r, 8 + u, 8 + y),
        }
    };
    d2 * 100 + d1 * 10 + d0
}

/// Divide by `10^shift`, rounding half-even. Returns the quotient.
fn shift_round_half_even(coefficient: u128, shift: u32) -> u128 {
    let Some(divisor) = 10u128.checked_pow(shift) else {
        return 0;
    };
    let quotient = coefficient / divisor;
    let remainder = coefficient % divisor;
    let half = divisor / 2;
    if remainder > half || (remainder == half && divisor > 1 && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

/// Most digits a parsed coefficient keeps before rounding into a format.
const WORKING_DIGITS: u64 = 38;

fn digit_count(value: u128) -> u32 {
    if value == 0 {
        1
    } else {
        value.ilog10() + 1
    }
}

impl Decimal {
    pub const ZERO: Decimal = Decimal::Finite {
        negative: false,
        coefficient: 0,
        exponent: 0,
    };

    /// Exact decimal value of a scaled integer.
    pub fn from_fixed(value: i128, scale: i32) -> Self {
        Decimal::Finite {
            negative: value < 0,
            coefficient: value.unsigned_abs(),
            exponent: scale,
        }
    }

    /// Shortest decimal that reads back as the same double.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Decimal::NaN {
                negative: false,
                signaling: false,
            };
        }
        if value.is_infinite() {
            return Decimal::Infinite {
                negative: value < 0.0,
            };
        }
        format!("{:e}", value).parse().unwrap_or(Decimal::ZERO)
    }

    /// Shortest decimal that reads back as the same float.
    pub fn from_f32(value: f32) -> Self {
        if !value.is_finite() {
            return Decimal::from_f64(value as f64);
        }
        format!("{:e}", value).parse().unwrap_or(Decimal::ZERO)
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Decimal::Finite { .. })
    }

    pub fn is_negative(&self) -> bool {
        match *self {
            Decimal::Finite { negative, .. }
            | Decimal::Infinite { negative }
            | Decimal::NaN { negative, .. } => negative,
        }
    }

    /// Nearest double.
    pub fn to_f64(&self) -> f64 {
        match *self {
            Decimal::Finite {
                negative,
                coefficient,
                exponent,
            } => {
                let magnitude = format!("{}e{}", coefficient, exponent)
                    .parse::<f64>()
                    .unwrap_or(f64::INFINITY);
                if negative {
                    -magnitude
                } else {
                    magnitude
                }
            }
            Decimal::Infinite { negative: true } => f64::NEG_INFINITY,
            Decimal::Infinite { negative: false } => f64::INFINITY,
            Decimal::NaN { .. } => f64::NAN,
        }
    }

    /// Scaled integer magnitude at `to_scale`, rounding half away from zero.
    pub fn to_fixed(&self, to_scale: i32) -> Result<i128> {
        let Decimal::Finite {
            negative,
            coefficient,
            exponent,
        } = *self
        else {
            return Err(Error::conversion(
                "decfloat",
                "scaled integer",
                format!("{} cannot be represented", self),
            ));
        };

        let overflow = || {
            Error::conversion(
                "decfloat",
                "scaled integer",
                format!("{} overflows at scale {}", self, to_scale),
            )
        };

        let shift = exponent as i64 - to_scale as i64;
        let magnitude = if shift >= 0 {
            if coefficient == 0 {
                0
            } else {
                let factor = u32::try_from(shift)
                    .ok()
                    .and_then(|shift| 10u128.checked_pow(shift))
                    .ok_or_else(overflow)?;
                coefficient.checked_mul(factor).ok_or_else(overflow)?
            }
        } else {
            match u32::try_from(-shift).ok().and_then(|shift| 10u128.checked_pow(shift)) {
                Some(divisor) => {
                    let quotient = coefficient / divisor;
                    if (coefficient % divisor) >= divisor - divisor / 2 {
                        quotient + 1
                    } else {
                        quotient
                    }
                }
                None => 0,
            }
        };

        let value = i128::try_from(magnitude).map_err(|_| overflow())?;
        Ok(if negative { -value } else { value })
    }

    /// Round and clamp into `format`, returning the value that will be stored.
    ///
    /// # Errors
    /// Returns `Error::Conversion` when the value exceeds the format's range.
    pub fn normalize(&self, format: Format) -> Result<Decimal> {
        let Decimal::Finite {
            negative,
            mut coefficient,
            exponent,
        } = *self
        else {
            return Ok(*self);
        };
        let mut exponent = exponent as i64;

        let digits = digit_count(coefficient);
        if digits > format.digits {
            let drop = digits - format.digits;
            coefficient = shift_round_half_even(coefficient, drop);
            exponent += drop as i64;
            if coefficient > format.max_coefficient() {
                coefficient /= 10;
                exponent += 1;
            }
        }

        let min = format.min_exponent() as i64;
        if exponent < min {
            let drop = (min - exponent).min(u32::MAX as i64) as u32;
            coefficient = shift_round_half_even(coefficient, drop);
            exponent = min;
        }

        let max = format.max_exponent() as i64;
        if coefficient == 0 && exponent > max {
            exponent = max;
        }
        while exponent > max && coefficient * 10 <= format.max_coefficient() {
            coefficient *= 10;
            exponent -= 1;
        }
        if exponent > max {
            return Err(Error::conversion(
                "decimal",
                format.name,
                format!("{} overflows", self),
            ));
        }

        Ok(Decimal::Finite {
            negative,
            coefficient,
            exponent: exponent as i32,
        })
    }

    /// Encode into the raw bit pattern of `format`.
    pub fn encode_bits(&self, format: Format) -> Result<u128> {
        let width = format.width();
        let coefficient_bits = 10 * format.declets;
        let sign = |negative: bool| (negative as u128) << (width - 1);
        let combination = |bits: u128| bits << (width - 6);

        let bits = match self.normalize(format)? {
            Decimal::Infinite { negative } => sign(negative) | combination(0b11110),
            Decimal::NaN {
                negative,
                signaling,
            } => {
                let mut bits = sign(negative) | combination(0b11111);
                if signaling {
                    bits |= 1 << (coefficient_bits + format.continuation_bits - 1);
                }
                bits
            }
            Decimal::Finite {
                negative,
                coefficient,
                exponent,
            } => {
                let biased = (exponent + format.bias) as u128;
                let split = 10u128.pow(3 * format.declets);
                let leading = coefficient / split;
                let mut rest = coefficient % split;

                let high = biased >> format.continuation_bits;
                let continuation = biased & ((1 << format.continuation_bits) - 1);
                let comb = if leading < 8 {
                    (high << 3) | leading
                } else {
                    0b11000 | (high << 1) | (leading & 1)
                };

                let encode = &declet_table().1;
                let mut declets = 0u128;
                for i in 0..format.declets {
                    let digits = (rest % 1000) as usize;
                    rest /= 1000;
                    declets |= (encode[digits] as u128) << (10 * i);
                }

                sign(negative)
                    | combination(comb)
                    | (continuation << coefficient_bits)
                    | declets
            }
        };
        Ok(bits)
    }

    /// Decode a raw bit pattern of `format`.
    pub fn decode_bits(bits: u128, format: Format) -> Self {
        let width = format.width();
        let coefficient_bits = 10 * format.declets;
        let negative = (bits >> (width - 1)) & 1 == 1;
        let comb = (bits >> (width - 6)) & 0x1f;
        let continuation =
            (bits >> coefficient_bits) & ((1 << format.continuation_bits) - 1);

        if comb >> 1 == 0b1111 {
            if comb & 1 == 0 {
                return Decimal::Infinite { negative };
            }
            return Decimal::NaN {
                negative,
                signaling: (continuation >> (format.continuation_bits - 1)) & 1 == 1,
            };
        }

        let (high, leading) = if comb >> 3 == 0b11 {
            ((comb >> 1) & 0b11, 8 + (comb & 1))
        } else {
            (comb >> 3, comb & 0b111)
        };
        let biased = (high << format.continuation_bits) | continuation;

        let decode = &declet_table().0;
        let mut coefficient = leading;
        for i in (0..format.declets).rev() {
            let declet = ((bits >> (10 * i)) & 0x3ff) as usize;
            coefficient = coefficient * 1000 + decode[declet] as u128;
        }

        Decimal::Finite {
            negative,
            coefficient,
            exponent: biased as i32 - format.bias,
        }
    }

    /// Exact value of `value`, rounded half-even to 38 digits when longer.
    ///
    /// Returns `None` when the exponent leaves the `i32` range.
    pub fn from_big_decimal(value: &BigDecimal) -> Option<Self> {
        let negative = value.sign() == Sign::Minus;
        let extra = value.digits().saturating_sub(WORKING_DIGITS);
        let (digits, scale) = if extra > 0 {
            let (_, scale) = value.as_bigint_and_scale();
            let scale = scale.checked_sub(i64::try_from(extra).ok()?)?;
            value
                .with_scale_round(scale, RoundingMode::HalfEven)
                .into_bigint_and_scale()
        } else {
            value.clone().into_bigint_and_scale()
        };

        Some(Decimal::Finite {
            negative,
            coefficient: u128::try_from(digits.magnitude()).ok()?,
            exponent: i32::try_from(scale.checked_neg()?).ok()?,
        })
    }

    /// Finite value as a `BigDecimal`, `None` for the special values.
    pub fn to_big_decimal(&self) -> Option<BigDecimal> {
        let Decimal::Finite {
            negative,
            coefficient,
            exponent,
        } = *self
        else {
            return None;
        };
        let digits = BigInt::from(coefficient);
        let digits = if negative { -digits } else { digits };
        Some(BigDecimal::new(digits, -(exponent as i64)))
    }

    pub fn encode16(&self) -> Result<[u8; 8]> {
        Ok((self.encode_bits(DECIMAL64)? as u64).to_ne_bytes())
    }

    pub fn decode16(bytes: [u8; 8]) -> Self {
        Decimal::decode_bits(u64::from_ne_bytes(bytes) as u128, DECIMAL64)
    }

    pub fn encode34(&self) -> Result<[u8; 16]> {
        Ok(self.encode_bits(DECIMAL128)?.to_ne_bytes())
    }

    pub fn decode34(bytes: [u8; 16]) -> Self {
        Decimal::decode_bits(u128::from_ne_bytes(bytes), DECIMAL128)
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        let conversion = |message: String| Error::conversion("string", "DECFLOAT", message);

        let (negative, body) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        match body.to_ascii_lowercase().as_str() {
            "inf" | "infinity" => return Ok(Decimal::Infinite { negative }),
            "nan" => {
                return Ok(Decimal::NaN {
                    negative,
                    signaling: false,
                })
            }
            "snan" => {
                return Ok(Decimal::NaN {
                    negative,
                    signaling: true,
                })
            }
            _ => {}
        }
        if body.starts_with(|c: char| c == '+' || c == '-') {
            return Err(conversion(format!("'{}' is not a number", text)));
        }

        let value = BigDecimal::from_str(text)
            .map_err(|e| conversion(format!("'{}' is not a number: {}", text, e)))?;
        let decimal = Decimal::from_big_decimal(&value)
            .ok_or_else(|| conversion(format!("'{}' has an exponent out of range", text)))?;

        // keep the sign of a negative zero
        Ok(match decimal {
            Decimal::Finite {
                coefficient,
                exponent,
                ..
            } => Decimal::Finite {
                negative,
                coefficient,
                exponent,
            },
            other => other,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Decimal::Infinite { negative } => {
                f.write_str(if negative { "-Infinity" } else { "Infinity" })
            }
            Decimal::NaN {
                negative,
                signaling,
            } => {
                if negative {
                    f.write_str("-")?;
                }
                f.write_str(if signaling { "sNaN" } else { "NaN" })
            }
            Decimal::Finite {
                negative,
                coefficient,
                exponent,
            } => {
                if negative {
                    f.write_str("-")?;
                }
                let digits = coefficient.to_string();
                let count = digits.len() as i64;
                let exponent = exponent as i64;
                let adjusted = exponent + count - 1;

                if exponent <= 0 && adjusted >= -6 {
                    let plain = BigDecimal::new(BigInt::from(coefficient), -exponent);
                    f.write_str(&plain.to_plain_string())
                } else {
                    let (lead, rest) = digits.split_at(1);
                    f.write_str(lead)?;
                    if !rest.is_empty() {
                        write!(f, ".{}", rest)?;
                    }
                    if adjusted >= 0 {
                        write!(f, "E+{}", adjusted)
                    } else {
                        write!(f, "E{}", adjusted)
                    }
                }
            }
        }
    }
}
