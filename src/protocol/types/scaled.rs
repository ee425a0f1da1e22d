//! Scaled integers: a magnitude and a decimal scale.

use super::opaque::OpaqueInt128;
use crate::protocol::codec::number::format_scaled;
use std::fmt;

/// `value * 10^scale`.
///
/// Equality compares magnitude and scale; `1.0` at scale -1 and `1.00` at
/// scale -2 are different values here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Scaled<T> {
    pub value: T,
    pub scale: i32,
}

impl<T> Scaled<T> {
    pub fn new(value: T, scale: i32) -> Self {
        Self { value, scale }
    }
}

pub type ScaledInt16 = Scaled<i16>;
pub type ScaledInt32 = Scaled<i32>;
pub type ScaledInt64 = Scaled<i64>;
pub type ScaledInt128 = Scaled<i128>;
/// Raw 128-bit integer bytes with the column's scale.
pub type ScaledOpaqueInt128 = Scaled<OpaqueInt128>;

macro_rules! display_scaled {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for Scaled<$ty> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&format_scaled(self.value as i128, self.scale))
                }
            }
        )*
    };
}

display_scaled!(i16, i32, i64, i128);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ScaledInt64::new(12345, -2).to_string(), "123.45");
        assert_eq!(ScaledInt16::new(-7, 0).to_string(), "-7");
    }

    #[test]
    fn test_scale_is_part_of_equality() {
        assert_ne!(ScaledInt32::new(10, -1), ScaledInt32::new(100, -2));
    }
}
