//! Scalar codecs between Rust values and engine message representations.
//!
//! | Engine type | Module |
//! |-------------|--------|
//! | SHORT, LONG, INT64, INT128, FLOAT, DOUBLE | `number` |
//! | DEC16, DEC34 | `decfloat` |
//! | DATE, TIME, TIMESTAMP | `date` |
//! | TIME_TZ, TIMESTAMP_TZ | `zone` |
//!
//! Text and boolean fields need no dedicated codec.

pub mod date;
pub mod decfloat;
pub mod number;
pub mod zone;

pub use decfloat::Decimal;
pub use number::Number;
pub use zone::{FixedOffsetZones, TimeZoneRules};

use crate::error::{Error, Result};

/// Parse the textual boolean forms the engine accepts.
pub fn parse_boolean(text: &str) -> Result<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::conversion(
            "string",
            "BOOLEAN",
            format!("'{}' is not a boolean", text),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_boolean() {
        assert!(parse_boolean("true").unwrap());
        assert!(parse_boolean(" TRUE ").unwrap());
        assert!(!parse_boolean("false").unwrap());
        assert!(parse_boolean("yes").is_err());
    }
}
