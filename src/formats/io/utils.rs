//! Buffer and sink helpers for the binary codecs
//!
//! Provides `RawReader` for offset-based little-endian reads over a
//! decoder's owned buffer, and `SinkWriter` for encoder output through a
//! caller-supplied byte-sink callback that may abort by returning false.

use crate::utils::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Offset-based reader over a byte buffer
///
/// Every read is bounds checked and fails with `Error::Truncated` when it
/// would cross the end of the buffer.
#[derive(Debug, Clone, Copy)]
pub struct RawReader<'a> {
    data: &'a [u8],
}

impl<'a> RawReader<'a> {
    /// Create a reader over the given buffer
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Total buffer size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn slice_at(&self, offset: usize, needed: usize) -> Result<&'a [u8]> {
        if offset.checked_add(needed).map_or(true, |end| end > self.data.len()) {
            return Err(Error::Truncated { offset, needed });
        }
        Ok(&self.data[offset..offset + needed])
    }

    /// Read raw bytes at the given offset
    pub fn bytes_at(&self, offset: usize, count: usize) -> Result<&'a [u8]> {
        self.slice_at(offset, count)
    }

    /// Read an unsigned byte
    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.slice_at(offset, 1)?[0])
    }

    /// Read an unsigned 16-bit little-endian integer
    pub fn u16_le_at(&self, offset: usize) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.slice_at(offset, 2)?))
    }

    /// Read a signed 16-bit little-endian integer
    pub fn i16_le_at(&self, offset: usize) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.slice_at(offset, 2)?))
    }

    /// Read a signed 32-bit little-endian integer
    pub fn i32_le_at(&self, offset: usize) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.slice_at(offset, 4)?))
    }

    /// Read a 32-bit little-endian IEEE-754 float
    pub fn f32_le_at(&self, offset: usize) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.slice_at(offset, 4)?))
    }

    /// Read a 1-byte length-prefixed string
    ///
    /// Returns the string and the total number of bytes consumed.
    pub fn string_at(&self, offset: usize) -> Result<(String, usize)> {
        let length = self.u8_at(offset)? as usize;
        let bytes = self.slice_at(offset + 1, length)?;
        Ok((String::from_utf8_lossy(bytes).into_owned(), 1 + length))
    }

    /// Compare a u16-length-prefixed ASCII literal at the given offset
    pub fn marker_at(&self, offset: usize, s: &str) -> bool {
        match self.u16_le_at(offset) {
            Ok(length) if length as usize == s.len() => self
                .bytes_at(offset + 2, s.len())
                .map(|bytes| bytes == s.as_bytes())
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Byte-sink writer for encoder output
///
/// Wraps the caller's sink callback; a callback returning false aborts the
/// write with `Error::Aborted`.
pub struct SinkWriter<'a> {
    sink: &'a mut dyn FnMut(&[u8]) -> bool,
}

impl<'a> SinkWriter<'a> {
    /// Create a writer over the given sink callback
    pub fn new(sink: &'a mut dyn FnMut(&[u8]) -> bool) -> Self {
        Self { sink }
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if (self.sink)(data) {
            Ok(())
        } else {
            Err(Error::Aborted)
        }
    }

    /// Write a string as bytes
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }

    /// Write an unsigned byte
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    /// Write an unsigned 16-bit little-endian integer
    pub fn write_u16_le(&mut self, value: u16) -> Result<()> {
        let mut data = [0u8; 2];
        LittleEndian::write_u16(&mut data, value);
        self.write_bytes(&data)
    }

    /// Write a signed 16-bit little-endian integer
    pub fn write_i16_le(&mut self, value: i16) -> Result<()> {
        let mut data = [0u8; 2];
        LittleEndian::write_i16(&mut data, value);
        self.write_bytes(&data)
    }

    /// Write a signed 32-bit little-endian integer
    pub fn write_i32_le(&mut self, value: i32) -> Result<()> {
        let mut data = [0u8; 4];
        LittleEndian::write_i32(&mut data, value);
        self.write_bytes(&data)
    }

    /// Write a 32-bit little-endian IEEE-754 float
    pub fn write_f32_le(&mut self, value: f32) -> Result<()> {
        let mut data = [0u8; 4];
        LittleEndian::write_f32(&mut data, value);
        self.write_bytes(&data)
    }

    /// Write a u16-length-prefixed ASCII literal
    pub fn write_marker(&mut self, s: &str) -> Result<()> {
        let length = u16::try_from(s.len())
            .map_err(|_| Error::Range(format!("marker too long: {}", s.len())))?;
        self.write_u16_le(length)?;
        self.write_str(s)
    }
}

/// Convert a value to u16, failing with a range violation
pub fn checked_u16(value: usize, what: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| Error::Range(format!("{} out of u16 range: {}", what, value)))
}

/// Convert a value to i16, failing with a range violation
pub fn checked_i16(value: i32, what: &str) -> Result<i16> {
    i16::try_from(value).map_err(|_| Error::Range(format!("{} out of i16 range: {}", what, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_reader_bounds() {
        let reader = RawReader::new(&[0x34, 0x12, 0xFF]);
        assert_eq!(reader.u16_le_at(0).unwrap(), 0x1234);
        assert_eq!(reader.u8_at(2).unwrap(), 0xFF);
        assert!(matches!(
            reader.u16_le_at(2),
            Err(Error::Truncated { offset: 2, needed: 2 })
        ));
        assert!(reader.u8_at(usize::MAX).is_err());
    }

    #[test]
    fn test_marker_at() {
        let mut data = vec![7, 0];
        data.extend_from_slice(b"CEmbOne");
        let reader = RawReader::new(&data);
        assert!(reader.marker_at(0, "CEmbOne"));
        assert!(!reader.marker_at(0, "CSewSeg"));
    }

    #[test]
    fn test_sink_abort() {
        let mut seen = 0usize;
        let mut sink = |chunk: &[u8]| {
            seen += chunk.len();
            seen < 4
        };
        let mut writer = SinkWriter::new(&mut sink);
        assert!(writer.write_u16_le(1).is_ok());
        assert!(matches!(writer.write_u16_le(2), Err(Error::Aborted)));
    }

    #[test]
    fn test_length_prefixed_string() {
        let data = [3, b'a', b'b', b'c', 9];
        let reader = RawReader::new(&data);
        let (s, consumed) = reader.string_at(0).unwrap();
        assert_eq!(s, "abc");
        assert_eq!(consumed, 4);
    }
}
