//! Engine-native value images.
//!
//! These carry the exact bytes or integers the engine stores and are bound
//! without any conversion. They only ever match a field of their own wire
//! type.

/// INT128 field bytes in native order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpaqueInt128(pub [u8; 16]);

/// DECFLOAT(16) field bytes in native order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpaqueDecFloat16(pub [u8; 8]);

/// DECFLOAT(34) field bytes in native order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpaqueDecFloat34(pub [u8; 16]);

/// DATE as days since 1858-11-17.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct OpaqueDate(pub i32);

/// TIME as 100 microsecond ticks since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct OpaqueTime(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpaqueTimestamp {
    pub date: OpaqueDate,
    pub time: OpaqueTime,
}

/// TIME WITH TIME ZONE: UTC ticks plus zone id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpaqueTimeTz {
    pub utc_time: OpaqueTime,
    pub zone: u16,
}

/// TIMESTAMP WITH TIME ZONE: UTC timestamp plus zone id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpaqueTimestampTz {
    pub utc_timestamp: OpaqueTimestamp,
    pub zone: u16,
}

impl OpaqueInt128 {
    pub fn from_i128(value: i128) -> Self {
        Self(value.to_ne_bytes())
    }

    pub fn to_i128(&self) -> i128 {
        i128::from_ne_bytes(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_int128_bytes() {
        let value = OpaqueInt128::from_i128(-42);
        assert_eq!(value.to_i128(), -42);
        assert_eq!(value.0, (-42i128).to_ne_bytes());
    }
}
