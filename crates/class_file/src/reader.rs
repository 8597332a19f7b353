use byteorder::{BigEndian, ByteOrder};

use crate::DecodeError;

type Endian = BigEndian;

/// Offset-explicit big-endian reads over a borrowed buffer.
///
/// There is no cursor: every read names the offset it starts at, and a read that would
/// run past the end of the buffer fails with [`DecodeError::TruncatedInput`].
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
}
impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of bytes left from `offset` to the end of the buffer.
    pub fn remaining(&self, offset: usize) -> usize {
        self.buf.len().saturating_sub(offset)
    }

    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(DecodeError::TruncatedInput {
                offset,
                needed: len,
                available: self.remaining(offset),
            })?;

        Ok(&self.buf[offset..end])
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, DecodeError> {
        Ok(self.slice(offset, 1)?[0])
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16, DecodeError> {
        Ok(Endian::read_u16(self.slice(offset, 2)?))
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32, DecodeError> {
        Ok(Endian::read_u32(self.slice(offset, 4)?))
    }

    pub fn read_u64(&self, offset: usize) -> Result<u64, DecodeError> {
        Ok(Endian::read_u64(self.slice(offset, 8)?))
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32, DecodeError> {
        Ok(self.read_u32(offset)? as i32)
    }

    pub fn read_i64(&self, offset: usize) -> Result<i64, DecodeError> {
        Ok(self.read_u64(offset)? as i64)
    }

    pub fn read_f32(&self, offset: usize) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_u32(offset)?))
    }

    pub fn read_f64(&self, offset: usize) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(self.read_u64(offset)?))
    }
}
