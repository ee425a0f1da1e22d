//! Blob identifiers.

use std::fmt;

/// ISC_QUAD blob id as stored in a BLOB field.
///
/// Only the id is marshaled; blob contents are streamed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlobId {
    pub high: i32,
    pub low: u32,
}

impl BlobId {
    pub fn new(high: i32, low: u32) -> Self {
        Self { high, low }
    }

    pub fn is_empty(&self) -> bool {
        self.high == 0 && self.low == 0
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&self.high.to_ne_bytes());
        bytes[4..].copy_from_slice(&self.low.to_ne_bytes());
        bytes
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self {
            high: i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            low: u32::from_ne_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}:{:x}", self.high, self.low)
    }
}
