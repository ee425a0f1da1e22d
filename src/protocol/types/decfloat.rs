//! Arbitrary-precision decimal float values.
//!
//! `DecFloat16` and `DecFloat34` are the convertible counterparts of the
//! DECFLOAT(16) / DECFLOAT(34) columns. Finite values are held as a
//! [`BigDecimal`]; precision is applied when the value is stored, so a value
//! with more digits than the column rounds half-even on the way in.

use crate::error::{Error, Result};
use crate::protocol::codec::Decimal;
use bigdecimal::BigDecimal;
use std::fmt;
use std::str::FromStr;

/// A decimal number or one of the decimal float special values.
#[derive(Debug, Clone, PartialEq)]
pub enum DecFloat {
    Finite(BigDecimal),
    Infinity,
    NegativeInfinity,
    NaN,
}

impl DecFloat {
    pub fn is_nan(&self) -> bool {
        matches!(self, DecFloat::NaN)
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, DecFloat::Infinity | DecFloat::NegativeInfinity)
    }

    pub fn as_big_decimal(&self) -> Option<&BigDecimal> {
        match self {
            DecFloat::Finite(value) => Some(value),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.to_decimal().map(|d| d.to_f64()).unwrap_or(f64::NAN)
    }

    pub(crate) fn to_decimal(&self) -> Result<Decimal> {
        match self {
            DecFloat::Finite(value) => Decimal::from_big_decimal(value).ok_or_else(|| {
                Error::conversion("BigDecimal", "DECFLOAT", format!("{} is out of range", value))
            }),
            DecFloat::Infinity => Ok(Decimal::Infinite { negative: false }),
            DecFloat::NegativeInfinity => Ok(Decimal::Infinite { negative: true }),
            DecFloat::NaN => Ok(Decimal::NaN {
                negative: false,
                signaling: false,
            }),
        }
    }

    pub(crate) fn from_decimal(decimal: Decimal) -> Self {
        match decimal {
            Decimal::Finite { .. } => {
                DecFloat::Finite(decimal.to_big_decimal().unwrap_or_default())
            }
            Decimal::Infinite { negative: false } => DecFloat::Infinity,
            Decimal::Infinite { negative: true } => DecFloat::NegativeInfinity,
            Decimal::NaN { .. } => DecFloat::NaN,
        }
    }
}

impl FromStr for DecFloat {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Ok(DecFloat::from_decimal(text.parse::<Decimal>()?))
    }
}

impl fmt::Display for DecFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Ok(decimal) => write!(f, "{}", decimal),
            Err(_) => write!(f, "NaN"),
        }
    }
}

macro_rules! dec_float_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(pub DecFloat);

        impl $name {
            pub fn new(value: BigDecimal) -> Self {
                Self(DecFloat::Finite(value))
            }

            pub fn value(&self) -> &DecFloat {
                &self.0
            }

            pub fn to_f64(&self) -> f64 {
                self.0.to_f64()
            }
        }

        impl From<BigDecimal> for $name {
            fn from(value: BigDecimal) -> Self {
                Self::new(value)
            }
        }

        impl From<DecFloat> for $name {
            fn from(value: DecFloat) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(text: &str) -> Result<Self> {
                Ok(Self(text.parse()?))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

dec_float_type!(
    /// Convertible DECFLOAT(16) value.
    DecFloat16
);
dec_float_type!(
    /// Convertible DECFLOAT(34) value.
    DecFloat34
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_finite_and_specials() {
        let value: DecFloat16 = "1234567890123456".parse().unwrap();
        assert_eq!(
            value.0,
            DecFloat::Finite(BigDecimal::from_str("1234567890123456").unwrap())
        );
        assert!("NaN".parse::<DecFloat34>().unwrap().0.is_nan());
        assert!("-Infinity".parse::<DecFloat34>().unwrap().0.is_infinite());
    }

    #[test]
    fn test_decimal_bridge() {
        let value = DecFloat::Finite(BigDecimal::from_str("-123.456").unwrap());
        let decimal = value.to_decimal().unwrap();
        assert_eq!(
            decimal,
            Decimal::Finite {
                negative: true,
                coefficient: 123456,
                exponent: -3
            }
        );
        assert_eq!(DecFloat::from_decimal(decimal), value);
        assert_eq!(value.to_string(), "-123.456");
    }

    #[test]
    fn test_to_f64() {
        let value: DecFloat34 = "9876543210.12345".parse().unwrap();
        assert!((value.to_f64() - 9876543210.12345).abs() < 1e-5);
        assert!(DecFloat::NaN.to_f64().is_nan());
    }
}
