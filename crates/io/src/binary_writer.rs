//! Binary writer for the Spa wire format.
//!
//! The writer is append-only: callers may query the position but never read
//! written bytes back through it.

use crate::error::IoResult;
use bytes::{BufMut, BytesMut};

/// A writer for serializing Spa data structures to binary data.
pub struct BinaryWriter {
    buffer: BytesMut,
}

impl BinaryWriter {
    /// Creates a new binary writer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Creates a new binary writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the current position in the buffer.
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the length of the buffer.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, value: u8) -> IoResult<()> {
        self.buffer.put_u8(value);
        Ok(())
    }

    /// Writes a boolean as a single byte.
    pub fn write_bool(&mut self, value: bool) -> IoResult<()> {
        self.write_u8(u8::from(value))
    }

    /// Writes a signed 16-bit integer in little-endian format.
    pub fn write_i16(&mut self, value: i16) -> IoResult<()> {
        self.buffer.put_i16_le(value);
        Ok(())
    }

    /// Writes a signed 32-bit integer in little-endian format.
    pub fn write_i32(&mut self, value: i32) -> IoResult<()> {
        self.buffer.put_i32_le(value);
        Ok(())
    }

    /// Writes an unsigned 32-bit integer in little-endian format.
    pub fn write_u32(&mut self, value: u32) -> IoResult<()> {
        self.buffer.put_u32_le(value);
        Ok(())
    }

    /// Writes a signed 64-bit integer in little-endian format.
    pub fn write_i64(&mut self, value: i64) -> IoResult<()> {
        self.buffer.put_i64_le(value);
        Ok(())
    }

    /// Writes an unsigned 64-bit integer in little-endian format.
    pub fn write_u64(&mut self, value: u64) -> IoResult<()> {
        self.buffer.put_u64_le(value);
        Ok(())
    }

    /// Writes a byte slice verbatim.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> IoResult<()> {
        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Returns a copy of the written bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    /// Consumes the writer and returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}
