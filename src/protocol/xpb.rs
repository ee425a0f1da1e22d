//! Parameter block writer for database and transaction parameter blocks.
//!
//! A block is a version byte followed by clumplets. Flag clumplets are a
//! single tag byte; string clumplets are `tag, length, bytes` with a one-byte
//! length.

use crate::error::{Error, Result};
use bytes::{BufMut, BytesMut};

/// Writer for a DPB or TPB.
#[derive(Debug, Clone, Default)]
pub struct ParameterBlock {
    data: BytesMut,
}

impl ParameterBlock {
    /// Start a block with the given version byte.
    pub fn new(version: u8) -> Self {
        let mut data = BytesMut::with_capacity(64);
        data.put_u8(version);
        Self { data }
    }

    /// Start from caller-supplied raw bytes, which already carry a version.
    pub fn from_raw(raw: &[u8]) -> Self {
        Self {
            data: BytesMut::from(raw),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a flag clumplet.
    pub fn insert_tag(&mut self, tag: u8) {
        self.data.put_u8(tag);
    }

    /// Append a `tag, length, bytes` clumplet.
    pub fn insert_bytes(&mut self, tag: u8, value: &[u8]) -> Result<()> {
        let len = u8::try_from(value.len()).map_err(|_| {
            Error::usage(format!(
                "Parameter block value for tag {} is {} bytes, the limit is 255",
                tag,
                value.len()
            ))
        })?;
        self.data.put_u8(tag);
        self.data.put_u8(len);
        self.data.extend_from_slice(value);
        Ok(())
    }

    pub fn insert_string(&mut self, tag: u8, value: &str) -> Result<()> {
        self.insert_bytes(tag, value.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.to_vec()
    }
}
