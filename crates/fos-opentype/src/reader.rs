//! Binary reader for font data

use crate::{FontError, Result};
use crate::tag::Tag;

/// Big-endian reader with bounds checking
#[derive(Debug, Clone)]
pub struct FontReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FontReader<'a> {
    /// Create a new reader
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a reader positioned at `offset`
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        if offset > data.len() {
            return Err(FontError::malformed(format!(
                "offset {} past end of {} byte table", offset, data.len()
            )));
        }
        Ok(Self { data, pos: offset })
    }

    /// Get current position
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Set position
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// The whole underlying buffer
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => {
                let slice = &self.data[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(FontError::malformed(format!(
                "read of {} bytes at {} overruns {} byte buffer", n, self.pos, self.data.len()
            ))),
        }
    }

    /// Skip bytes
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Read u8
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read big-endian u16
    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read big-endian i16
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Read big-endian 24-bit unsigned integer
    pub fn read_u24(&mut self) -> Result<u32> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    /// Read big-endian u32
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read big-endian i32
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Read big-endian Fixed 16.16
    pub fn read_fixed(&mut self) -> Result<f32> {
        Ok(self.read_i32()? as f32 / 65536.0)
    }

    /// Read an unsigned offset of `size` bytes (1 to 4), as used by CFF
    pub fn read_offset(&mut self, size: u8) -> Result<u32> {
        match size {
            1 => Ok(self.read_u8()? as u32),
            2 => Ok(self.read_u16()? as u32),
            3 => self.read_u24(),
            4 => self.read_u32(),
            _ => Err(FontError::malformed(format!("invalid offset size {}", size))),
        }
    }

    /// Read 4-byte tag
    pub fn read_tag(&mut self) -> Result<Tag> {
        let b = self.take(4)?;
        Ok(Tag([b[0], b[1], b[2], b[3]]))
    }

    /// Read bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Read `count` big-endian u16 values
    pub fn read_u16_array(&mut self, count: usize) -> Result<Vec<u16>> {
        let bytes = self.take(count.saturating_mul(2))?;
        Ok(bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect())
    }

    /// Remaining bytes
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Get slice at current position
    pub fn slice_from_here(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or(&[])
    }
}

/// Sub-slice of `data` starting at `offset`, failing if the offset is out of range.
pub fn slice_at(data: &[u8], offset: usize) -> Result<&[u8]> {
    data.get(offset..).ok_or_else(|| {
        FontError::malformed(format!("offset {} past end of {} byte table", offset, data.len()))
    })
}

/// Like [`slice_at`], but a zero offset means "absent".
pub fn optional_slice_at(data: &[u8], offset: usize) -> Result<Option<&[u8]>> {
    if offset == 0 {
        return Ok(None);
    }
    slice_at(data, offset).map(Some)
}
