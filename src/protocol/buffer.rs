//! Message buffer: one full input or output message in engine layout.
//!
//! All multi-byte values sit in native byte order at the offsets the
//! engine's message metadata reports. Every field carries a 2-byte null
//! indicator; `-1` means NULL and `0` means a value is present.

use crate::error::{Error, Result};
use bytes::BytesMut;

const NULL_FLAG: i16 = -1;
const NOT_NULL_FLAG: i16 = 0;

/// Byte storage for one message, addressed by descriptor offsets.
#[derive(Debug, Clone, Default)]
pub struct MessageBuffer {
    data: BytesMut,
}

impl MessageBuffer {
    /// Create a zero-filled buffer of `len` bytes.
    pub fn new(len: usize) -> Self {
        let mut data = BytesMut::with_capacity(len);
        data.resize(len, 0);
        Self { data }
    }

    /// Get the length of the message.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the message is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the message contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get the message contents for in-place refill by the engine.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[track_caller]
    fn check(&self, offset: usize, n: usize) -> Result<()> {
        match offset.checked_add(n) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(Error::BufferTooSmall {
                needed: offset.saturating_add(n),
                available: self.data.len(),
                location: std::panic::Location::caller(),
            }),
        }
    }

    /// Read `n` bytes at `offset`.
    #[track_caller]
    pub fn read_bytes(&self, offset: usize, n: usize) -> Result<&[u8]> {
        self.check(offset, n)?;
        Ok(&self.data[offset..offset + n])
    }

    /// Write raw bytes at `offset`.
    #[track_caller]
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.check(offset, bytes.len())?;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Read a fixed-size array at `offset`.
    #[track_caller]
    pub fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        self.check(offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[offset..offset + N]);
        Ok(out)
    }

    #[track_caller]
    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.read_array::<1>(offset)?[0])
    }

    #[track_caller]
    pub fn write_u8(&mut self, offset: usize, val: u8) -> Result<()> {
        self.write_bytes(offset, &[val])
    }

    #[track_caller]
    pub fn read_i16(&self, offset: usize) -> Result<i16> {
        Ok(i16::from_ne_bytes(self.read_array(offset)?))
    }

    #[track_caller]
    pub fn write_i16(&mut self, offset: usize, val: i16) -> Result<()> {
        self.write_bytes(offset, &val.to_ne_bytes())
    }

    #[track_caller]
    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        Ok(u16::from_ne_bytes(self.read_array(offset)?))
    }

    #[track_caller]
    pub fn write_u16(&mut self, offset: usize, val: u16) -> Result<()> {
        self.write_bytes(offset, &val.to_ne_bytes())
    }

    #[track_caller]
    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        Ok(i32::from_ne_bytes(self.read_array(offset)?))
    }

    #[track_caller]
    pub fn write_i32(&mut self, offset: usize, val: i32) -> Result<()> {
        self.write_bytes(offset, &val.to_ne_bytes())
    }

    #[track_caller]
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        Ok(u32::from_ne_bytes(self.read_array(offset)?))
    }

    #[track_caller]
    pub fn write_u32(&mut self, offset: usize, val: u32) -> Result<()> {
        self.write_bytes(offset, &val.to_ne_bytes())
    }

    #[track_caller]
    pub fn read_i64(&self, offset: usize) -> Result<i64> {
        Ok(i64::from_ne_bytes(self.read_array(offset)?))
    }

    #[track_caller]
    pub fn write_i64(&mut self, offset: usize, val: i64) -> Result<()> {
        self.write_bytes(offset, &val.to_ne_bytes())
    }

    #[track_caller]
    pub fn read_f32(&self, offset: usize) -> Result<f32> {
        Ok(f32::from_ne_bytes(self.read_array(offset)?))
    }

    #[track_caller]
    pub fn write_f32(&mut self, offset: usize, val: f32) -> Result<()> {
        self.write_bytes(offset, &val.to_ne_bytes())
    }

    #[track_caller]
    pub fn read_f64(&self, offset: usize) -> Result<f64> {
        Ok(f64::from_ne_bytes(self.read_array(offset)?))
    }

    #[track_caller]
    pub fn write_f64(&mut self, offset: usize, val: f64) -> Result<()> {
        self.write_bytes(offset, &val.to_ne_bytes())
    }

    /// Read a VARYING value: 2-byte length followed by the bytes.
    #[track_caller]
    pub fn read_varying(&self, offset: usize) -> Result<&[u8]> {
        let len = self.read_u16(offset)? as usize;
        self.read_bytes(offset + 2, len)
    }

    /// Write a VARYING value. The caller has already checked the declared length.
    #[track_caller]
    pub fn write_varying(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let len = u16::try_from(bytes.len())
            .map_err(|_| Error::conversion("string", "VARYING", "value longer than 65535 bytes"))?;
        self.check(offset, 2 + bytes.len())?;
        self.write_u16(offset, len)?;
        self.write_bytes(offset + 2, bytes)
    }

    /// Whether the null indicator at `null_offset` reads NULL.
    #[track_caller]
    pub fn is_null(&self, null_offset: usize) -> Result<bool> {
        Ok(self.read_i16(null_offset)? != NOT_NULL_FLAG)
    }

    /// Set or clear the null indicator at `null_offset`.
    #[track_caller]
    pub fn set_null(&mut self, null_offset: usize, null: bool) -> Result<()> {
        let flag = if null { NULL_FLAG } else { NOT_NULL_FLAG };
        self.write_i16(null_offset, flag)
    }
}
