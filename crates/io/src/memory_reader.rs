//! Positional reader over an in-memory byte buffer.
//!
//! All multi-byte integers are little-endian, matching the Spa wire format.

use crate::error::{IoError, IoResult};

/// A bounds-checked positional reader over a borrowed byte slice.
pub struct MemoryReader<'a> {
    span: &'a [u8],
    pos: usize,
}

impl<'a> MemoryReader<'a> {
    /// Creates a new reader over the given data.
    pub fn new(data: &'a [u8]) -> Self {
        Self { span: data, pos: 0 }
    }

    /// Gets the current position in the reader.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Gets the total length of the underlying data.
    pub fn len(&self) -> usize {
        self.span.len()
    }

    /// Returns whether the underlying data is empty.
    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.span.len() - self.pos
    }

    fn ensure(&self, needed: usize, context: &str) -> IoResult<()> {
        if self.pos + needed > self.span.len() {
            return Err(IoError::end_of_stream(needed, context));
        }
        Ok(())
    }

    /// Peeks at the next byte without advancing the position.
    pub fn peek(&self) -> IoResult<u8> {
        self.ensure(1, "peek")?;
        Ok(self.span[self.pos])
    }

    /// Reads an unsigned byte.
    pub fn read_u8(&mut self) -> IoResult<u8> {
        self.ensure(1, "u8")?;
        let result = self.span[self.pos];
        self.pos += 1;
        Ok(result)
    }

    /// Reads a boolean encoded as a single byte.
    pub fn read_bool(&mut self) -> IoResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(IoError::invalid_data("boolean", &other.to_string())),
        }
    }

    /// Reads a 16-bit signed integer in little-endian format.
    pub fn read_i16(&mut self) -> IoResult<i16> {
        self.ensure(2, "i16")?;
        let bytes = &self.span[self.pos..self.pos + 2];
        self.pos += 2;
        Ok(i16::from_le_bytes(bytes.try_into()?))
    }

    /// Reads a 32-bit signed integer in little-endian format.
    pub fn read_i32(&mut self) -> IoResult<i32> {
        self.ensure(4, "i32")?;
        let bytes = &self.span[self.pos..self.pos + 4];
        self.pos += 4;
        Ok(i32::from_le_bytes(bytes.try_into()?))
    }

    /// Reads a 32-bit unsigned integer in little-endian format.
    pub fn read_u32(&mut self) -> IoResult<u32> {
        self.ensure(4, "u32")?;
        let bytes = &self.span[self.pos..self.pos + 4];
        self.pos += 4;
        Ok(u32::from_le_bytes(bytes.try_into()?))
    }

    /// Reads a 64-bit signed integer in little-endian format.
    pub fn read_i64(&mut self) -> IoResult<i64> {
        self.ensure(8, "i64")?;
        let bytes = &self.span[self.pos..self.pos + 8];
        self.pos += 8;
        Ok(i64::from_le_bytes(bytes.try_into()?))
    }

    /// Reads a 64-bit unsigned integer in little-endian format.
    pub fn read_u64(&mut self) -> IoResult<u64> {
        self.ensure(8, "u64")?;
        let bytes = &self.span[self.pos..self.pos + 8];
        self.pos += 8;
        Ok(u64::from_le_bytes(bytes.try_into()?))
    }

    /// Reads `count` bytes into an owned vector.
    pub fn read_bytes(&mut self, count: usize) -> IoResult<Vec<u8>> {
        self.ensure(count, "byte span")?;
        let result = self.span[self.pos..self.pos + count].to_vec();
        self.pos += count;
        Ok(result)
    }

    /// Reads a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> IoResult<[u8; N]> {
        self.ensure(N, "byte array")?;
        let bytes: [u8; N] = self.span[self.pos..self.pos + N].try_into()?;
        self.pos += N;
        Ok(bytes)
    }

    /// Reads all remaining bytes.
    pub fn read_to_end(&mut self) -> IoResult<Vec<u8>> {
        let result = self.span[self.pos..].to_vec();
        self.pos = self.span.len();
        Ok(result)
    }
}
