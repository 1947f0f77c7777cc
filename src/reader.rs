//! Bounds-checked cursor over an immutable byte buffer
//!
//! The brush formats mix big- and little-endian fields, so every fixed-width
//! read takes the endianness explicitly. Short reads fail with
//! [`ParseError::TruncatedData`]; callers recover per brush entry, except at
//! top-level headers where the error propagates as the file's failure.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::ParseError;

/// Byte order of a fixed-width field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Seek to an absolute offset. Seeking to the end is allowed; seeking
    /// past it is not.
    pub fn seek(&mut self, pos: usize) -> Result<(), ParseError> {
        if pos > self.data.len() {
            return Err(ParseError::TruncatedData {
                needed: pos - self.pos,
                remaining: self.remaining(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<(), ParseError> {
        self.read_bytes(n).map(|_| ())
    }

    /// Look at the next `n` bytes without advancing.
    pub fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.data.get(self.pos..self.pos + n)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        match self.data.get(self.pos..self.pos + n) {
            Some(bytes) => {
                self.pos += n;
                Ok(bytes)
            }
            None => Err(ParseError::TruncatedData {
                needed: n,
                remaining: self.remaining(),
            }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, ParseError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self, endian: Endian) -> Result<u16, ParseError> {
        let bytes = self.read_bytes(2)?;
        Ok(match endian {
            Endian::Big => BigEndian::read_u16(bytes),
            Endian::Little => LittleEndian::read_u16(bytes),
        })
    }

    pub fn read_u32(&mut self, endian: Endian) -> Result<u32, ParseError> {
        let bytes = self.read_bytes(4)?;
        Ok(match endian {
            Endian::Big => BigEndian::read_u32(bytes),
            Endian::Little => LittleEndian::read_u32(bytes),
        })
    }

    pub fn read_i32(&mut self, endian: Endian) -> Result<i32, ParseError> {
        Ok(self.read_u32(endian)? as i32)
    }

    pub fn read_u64(&mut self, endian: Endian) -> Result<u64, ParseError> {
        let bytes = self.read_bytes(8)?;
        Ok(match endian {
            Endian::Big => BigEndian::read_u64(bytes),
            Endian::Little => LittleEndian::read_u64(bytes),
        })
    }

    pub fn read_i64(&mut self, endian: Endian) -> Result<i64, ParseError> {
        Ok(self.read_u64(endian)? as i64)
    }

    pub fn read_f32(&mut self, endian: Endian) -> Result<f32, ParseError> {
        Ok(f32::from_bits(self.read_u32(endian)?))
    }

    pub fn read_f64(&mut self, endian: Endian) -> Result<f64, ParseError> {
        Ok(f64::from_bits(self.read_u64(endian)?))
    }

    /// Read a length-byte-prefixed (Pascal) string.
    pub fn read_pascal_string(&mut self) -> Result<String, ParseError> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a NUL-terminated string. The terminator is consumed.
    pub fn read_cstring(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let nul = self.data[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(ParseError::TruncatedData {
                needed: 1,
                remaining: 0,
            })?;
        let bytes = self.read_bytes(nul)?;
        self.skip(1)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a u32-count-prefixed UTF-16 string (Photoshop convention).
    /// A trailing NUL code unit, if present, is stripped.
    pub fn read_utf16_string(&mut self, endian: Endian) -> Result<String, ParseError> {
        let count = self.read_u32(endian)? as usize;
        // A corrupt count must not reserve more than the buffer could hold.
        let mut units = Vec::with_capacity(count.min(self.remaining() / 2));
        for _ in 0..count {
            units.push(self.read_u16(endian)?);
        }
        if units.last() == Some(&0) {
            units.pop();
        }
        String::from_utf16(&units)
            .map_err(|e| ParseError::CorruptFile(format!("UTF-16 decode: {}", e)))
    }
}
