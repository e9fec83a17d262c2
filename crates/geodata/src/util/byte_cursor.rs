// ByteCursor - bounds-checked binary reader
//
// Read-side counterpart of the extractor's file writers. Every decoder in
// this crate goes through it; no read may cross the end of the buffer and
// no operation panics on malformed input.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::DecodeError;
use crate::math::Vector3;

#[derive(Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    /// Current read position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the read position and the end of the buffer
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Move the read position to an absolute offset
    pub fn seek(&mut self, offset: usize) -> Result<(), DecodeError> {
        if offset > self.data.len() {
            return Err(DecodeError::OutOfBounds {
                offset,
                needed: 0,
                available: self.data.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// Advance the read position without consuming the bytes into a value
    pub fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
        self.take(count).map(|_| ())
    }

    /// Fail early when fewer than `needed` bytes remain. Used by decoders
    /// to reject a count field before sizing an allocation from it.
    pub fn require(&self, needed: usize) -> Result<(), DecodeError> {
        if needed > self.remaining() {
            return Err(DecodeError::OutOfBounds {
                offset: self.pos,
                needed,
                available: self.data.len(),
            });
        }
        Ok(())
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        self.require(count)?;
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_vector3(&mut self) -> Result<Vector3, DecodeError> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        Ok(Vector3::new(x, y, z))
    }

    /// Read `count` raw bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        self.take(count)
    }

    /// Read a u32 length followed by that many raw bytes, no terminator.
    /// The length is checked against the remaining buffer before any
    /// allocation. Decoded as UTF-8 best effort.
    pub fn read_length_prefixed_string(&mut self) -> Result<String, DecodeError> {
        let length = self.read_u32()? as usize;
        let bytes = self.take(length)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Compare the next bytes against a fixed tag. A mismatch, including a
    /// buffer too short to hold the tag, is an `InvalidMagic`; nothing past
    /// the tag is ever read on failure.
    pub fn read_tag(&mut self, expected: &[u8]) -> Result<(), DecodeError> {
        let available = self.remaining().min(expected.len());
        let found = &self.data[self.pos..self.pos + available];
        if found != expected {
            return Err(DecodeError::InvalidMagic {
                expected: String::from_utf8_lossy(expected).into_owned(),
                found: String::from_utf8_lossy(found).into_owned(),
            });
        }
        self.pos += expected.len();
        Ok(())
    }
}
