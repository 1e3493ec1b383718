// Zig-zag varint primitives shared by the record codec and the container framing
use std::io::{self, Read};
use thiserror::Error;

/// Longest varint encoding of an `i64`.
pub const MAX_VARINT_LEN: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected end of data at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("Varint longer than {MAX_VARINT_LEN} bytes at offset {offset}")]
    VarintOverflow { offset: usize },

    #[error("Value {value} does not fit in an int")]
    IntOutOfRange { value: i64 },

    #[error("Negative length {length} at offset {offset}")]
    NegativeLength { length: i64, offset: usize },

    #[error("Invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("Invalid union branch {index}")]
    InvalidUnionIndex { index: i64 },

    #[error("{remaining} trailing bytes after the last record")]
    TrailingBytes { remaining: usize },

    #[error("Decoded value does not fit field '{field}'")]
    FieldMismatch { field: &'static str },
}

#[inline]
fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
fn unzigzag(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}

pub fn write_long(out: &mut Vec<u8>, value: i64) {
    let mut raw = zigzag(value);
    while raw >= 0x80 {
        out.push((raw as u8 & 0x7f) | 0x80);
        raw >>= 7;
    }
    out.push(raw as u8);
}

#[inline]
pub fn write_int(out: &mut Vec<u8>, value: i32) {
    write_long(out, i64::from(value));
}

pub fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_long(out, bytes.len() as i64);
    out.extend_from_slice(bytes);
}

#[inline]
pub fn write_str(out: &mut Vec<u8>, text: &str) {
    write_bytes(out, text.as_bytes());
}

/// Cursor over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Cursor positioned at `pos`, clamped to the buffer length.
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self {
            buf,
            pos: pos.min(buf.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_long(&mut self) -> Result<i64, DecodeError> {
        let start = self.pos;
        let mut raw: u64 = 0;
        let mut shift = 0u32;

        loop {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or(DecodeError::UnexpectedEof { offset: self.pos })?;
            self.pos += 1;

            let bits = u64::from(byte & 0x7f);
            if shift == 63 && bits > 1 {
                return Err(DecodeError::VarintOverflow { offset: start });
            }
            raw |= bits << shift;

            if byte & 0x80 == 0 {
                return Ok(unzigzag(raw));
            }
            shift += 7;
            if shift > 63 {
                return Err(DecodeError::VarintOverflow { offset: start });
            }
        }
    }

    pub fn read_int(&mut self) -> Result<i32, DecodeError> {
        let value = self.read_long()?;
        i32::try_from(value).map_err(|_| DecodeError::IntOutOfRange { value })
    }

    /// Length-prefixed byte run, borrowed from the buffer.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let offset = self.pos;
        let length = self.read_long()?;
        if length < 0 {
            return Err(DecodeError::NegativeLength { length, offset });
        }
        let length = length as usize;
        if length > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                offset: self.buf.len(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + length];
        self.pos += length;
        Ok(bytes)
    }

    pub fn read_str(&mut self) -> Result<&'a str, DecodeError> {
        let offset = self.pos;
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { offset })
    }
}

/// Read one varint from a stream.
///
/// Returns `Ok(None)` when the stream ends before the first byte, and the
/// value together with the number of bytes consumed otherwise. A stream that
/// ends inside the varint is an `UnexpectedEof` I/O error.
pub fn read_long_from<R: Read>(reader: &mut R) -> io::Result<Option<(i64, usize)>> {
    let mut raw: u64 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(0) if consumed == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside a varint",
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
        consumed += 1;

        let bits = u64::from(byte[0] & 0x7f);
        if shift == 63 && bits > 1 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "varint overflow"));
        }
        raw |= bits << shift;

        if byte[0] & 0x80 == 0 {
            return Ok(Some((unzigzag(raw), consumed)));
        }
        shift += 7;
        if shift > 63 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "varint overflow"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: i64) -> Vec<u8> {
        let mut out = Vec::new();
        write_long(&mut out, value);
        out
    }

    #[test]
    fn test_zigzag_reference_values() {
        assert_eq!(encoded(0), [0x00]);
        assert_eq!(encoded(-1), [0x01]);
        assert_eq!(encoded(1), [0x02]);
        assert_eq!(encoded(-64), [0x7f]);
        assert_eq!(encoded(64), [0x80, 0x01]);
        assert_eq!(encoded(i64::MAX).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn test_extremes_read_back() {
        for value in [i64::MIN, i64::MAX, i64::from(i32::MIN), 300, -300] {
            let bytes = encoded(value);
            let mut reader = ByteReader::new(&bytes);
            assert_eq!(reader.read_long().unwrap(), value);
            assert!(reader.is_empty());

            let mut stream = bytes.as_slice();
            assert_eq!(
                read_long_from(&mut stream).unwrap(),
                Some((value, bytes.len()))
            );
        }
    }

    #[test]
    fn test_string_layout() {
        let mut out = Vec::new();
        write_str(&mut out, "GET");
        assert_eq!(out, [0x06, b'G', b'E', b'T']);

        let mut reader = ByteReader::new(&out);
        assert_eq!(reader.read_str().unwrap(), "GET");
    }

    #[test]
    fn test_truncated_input() {
        let mut reader = ByteReader::new(&[0x80]);
        assert!(matches!(
            reader.read_long(),
            Err(DecodeError::UnexpectedEof { .. })
        ));

        let mut reader = ByteReader::new(&[0x08, b'a']);
        assert!(matches!(
            reader.read_bytes(),
            Err(DecodeError::UnexpectedEof { .. })
        ));

        let mut empty: &[u8] = &[];
        assert_eq!(read_long_from(&mut empty).unwrap(), None);

        let mut partial: &[u8] = &[0x80];
        let err = read_long_from(&mut partial).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_malformed_input() {
        let overlong = [0xff; 11];
        let mut reader = ByteReader::new(&overlong);
        assert!(matches!(
            reader.read_long(),
            Err(DecodeError::VarintOverflow { .. })
        ));

        let mut reader = ByteReader::new(&[0x01]);
        assert!(matches!(
            reader.read_bytes(),
            Err(DecodeError::NegativeLength { length: -1, .. })
        ));

        let mut reader = ByteReader::new(&[0x02, 0xff]);
        assert!(matches!(
            reader.read_str(),
            Err(DecodeError::InvalidUtf8 { .. })
        ));

        let big = encoded(i64::from(i32::MAX) + 1);
        let mut reader = ByteReader::new(&big);
        assert!(matches!(
            reader.read_int(),
            Err(DecodeError::IntOutOfRange { .. })
        ));
    }
}
