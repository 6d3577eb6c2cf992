//! Bounds-checked random-access reader over a single page buffer.
//!
//! InnoDB stores every multi-byte integer big-endian. [`ByteCursor`] wraps a
//! borrowed page slice with a position and exposes typed reads that advance
//! the position, plus absolute ([`set_position`](ByteCursor::set_position))
//! and relative ([`skip`](ByteCursor::skip), [`rewind`](ByteCursor::rewind))
//! moves. Any access past the end of the buffer fails with
//! [`IdbError::Bounds`] instead of panicking. The buffer is never mutated.

use byteorder::{BigEndian, ByteOrder};

use crate::IdbError;

/// Typed big-endian reader with an explicit position.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at byte 0.
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    /// Create a cursor positioned at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Result<Self, IdbError> {
        let mut c = Self::new(data);
        c.set_position(pos)?;
        Ok(c)
    }

    /// Create a cursor at `pos`, clamped to the end of the buffer.
    pub(crate) fn clamped(data: &'a [u8], pos: usize) -> Self {
        ByteCursor {
            data,
            pos: pos.min(data.len()),
        }
    }

    /// Current absolute position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the position and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The whole underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Move to an absolute position. `pos == len()` is allowed (end of buffer).
    pub fn set_position(&mut self, pos: usize) -> Result<(), IdbError> {
        if pos > self.data.len() {
            return Err(self.bounds(pos, 0));
        }
        self.pos = pos;
        Ok(())
    }

    /// Advance the position by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), IdbError> {
        let target = self
            .pos
            .checked_add(n)
            .ok_or_else(|| self.bounds(self.pos, n))?;
        if target > self.data.len() {
            return Err(self.bounds(self.pos, n));
        }
        self.pos = target;
        Ok(())
    }

    /// Move the position back by `n` bytes.
    pub fn rewind(&mut self, n: usize) -> Result<(), IdbError> {
        if n > self.pos {
            return Err(IdbError::Bounds {
                offset: self.pos,
                len: n,
                size: self.data.len(),
            });
        }
        self.pos -= n;
        Ok(())
    }

    /// Borrow `n` bytes at the position and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], IdbError> {
        let slice = self.peek_bytes(n)?;
        self.pos += n;
        Ok(slice)
    }

    /// Borrow `n` bytes at the position without advancing.
    pub fn peek_bytes(&self, n: usize) -> Result<&'a [u8], IdbError> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| self.bounds(self.pos, n))?;
        if end > self.data.len() {
            return Err(self.bounds(self.pos, n));
        }
        Ok(&self.data[self.pos..end])
    }

    /// Read a fixed-length byte array into an owned buffer.
    pub fn read_byte_vec(&mut self, n: usize) -> Result<Vec<u8>, IdbError> {
        Ok(self.read_bytes(n)?.to_vec())
    }

    /// Read a fixed-length UTF-8 string. Invalid sequences are replaced.
    pub fn read_string(&mut self, n: usize) -> Result<String, IdbError> {
        Ok(String::from_utf8_lossy(self.read_bytes(n)?).into_owned())
    }

    pub fn read_u8(&mut self) -> Result<u8, IdbError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, IdbError> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i16(&mut self) -> Result<i16, IdbError> {
        Ok(BigEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, IdbError> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, IdbError> {
        Ok(BigEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i64(&mut self) -> Result<i64, IdbError> {
        Ok(BigEndian::read_i64(self.read_bytes(8)?))
    }

    /// Read a 6-byte unsigned integer (transaction ids, row ids).
    pub fn read_u48(&mut self) -> Result<u64, IdbError> {
        Ok(BigEndian::read_uint(self.read_bytes(6)?, 6))
    }

    /// Read an `n`-byte (1..=8) unsigned big-endian integer.
    pub fn read_uint(&mut self, n: usize) -> Result<u64, IdbError> {
        if n == 0 || n > 8 {
            return Err(IdbError::Argument(format!(
                "Cannot read a {}-byte integer",
                n
            )));
        }
        Ok(BigEndian::read_uint(self.read_bytes(n)?, n))
    }

    fn bounds(&self, offset: usize, len: usize) -> IdbError {
        IdbError::Bounds {
            offset,
            len,
            size: self.data.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_reads_advance() {
        let data = [
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C,
        ];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_u8().unwrap(), 0x01);
        assert_eq!(c.read_u16().unwrap(), 0x0203);
        assert_eq!(c.position(), 3);
        assert_eq!(c.read_u32().unwrap(), 0x04050607);
        assert_eq!(c.remaining(), 5);
        assert_eq!(c.read_bytes(2).unwrap(), &[0x08, 0x09]);
    }

    #[test]
    fn test_six_byte_integer() {
        let data = [0x00, 0x00, 0x00, 0x00, 0x01, 0x00];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_u48().unwrap(), 256);
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_signed_reads() {
        let data = [0xFF, 0xCE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_i16().unwrap(), -50);
        assert_eq!(c.read_i64().unwrap(), -2);
    }

    #[test]
    fn test_read_past_end_is_bounds_error() {
        let data = [0u8; 3];
        let mut c = ByteCursor::new(&data);
        c.skip(2).unwrap();
        match c.read_u16() {
            Err(IdbError::Bounds { offset, len, size }) => {
                assert_eq!((offset, len, size), (2, 2, 3));
            }
            other => panic!("expected bounds error, got {:?}", other),
        }
        // Failed read does not move the cursor
        assert_eq!(c.position(), 2);
    }

    #[test]
    fn test_position_moves() {
        let data = b"xxinfimum\0";
        let mut c = ByteCursor::at(data, 2).unwrap();
        assert_eq!(c.read_string(7).unwrap(), "infimum");
        c.rewind(7).unwrap();
        assert_eq!(c.position(), 2);
        assert!(c.rewind(3).is_err());
        assert!(c.set_position(11).is_err());
        c.set_position(10).unwrap();
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_clamped_start() {
        let data = [1u8, 2, 3];
        let mut c = ByteCursor::clamped(&data, 1);
        assert_eq!(c.read_u8().unwrap(), 2);
        let c = ByteCursor::clamped(&data, 9);
        assert_eq!(c.position(), 3);
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_read_uint_widths() {
        let data = [0x80, 0x00, 0x01];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_uint(3).unwrap(), 0x800001);
        c.set_position(0).unwrap();
        assert!(c.read_uint(9).is_err());
    }
}
