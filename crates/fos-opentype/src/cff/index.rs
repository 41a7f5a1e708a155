//! CFF INDEX structure

use crate::reader::FontReader;
use crate::{FontError, Result};

/// An array of variable-sized objects
#[derive(Debug, Clone, Default)]
pub struct Index<'a> {
    objects: &'a [u8],
    offsets: Vec<u32>,
}

impl<'a> Index<'a> {
    /// Read an INDEX at the reader's position and advance past it
    pub fn parse(reader: &mut FontReader<'a>) -> Result<Self> {
        let count = reader.read_u16()? as usize;
        if count == 0 {
            return Ok(Self::default());
        }
        let off_size = reader.read_u8()?;
        let mut offsets = Vec::with_capacity(count + 1);
        for _ in 0..=count {
            offsets.push(reader.read_offset(off_size)?);
        }

        // Offsets are 1-based and must be non-decreasing
        if offsets[0] != 1 || offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(FontError::malformed("CFF INDEX offsets out of order"));
        }
        let data_len = (offsets[count] - 1) as usize;
        let objects = reader.read_bytes(data_len)?;
        Ok(Self { objects, offsets })
    }

    /// Read an INDEX at an absolute offset of `data`
    pub fn parse_at(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut reader = FontReader::at(data, offset)?;
        Self::parse(&mut reader)
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Object at `index`
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.len() {
            return Err(FontError::malformed(format!(
                "CFF INDEX entry {} out of range ({} entries)", index, self.len()
            )));
        }
        let start = (self.offsets[index] - 1) as usize;
        let end = (self.offsets[index + 1] - 1) as usize;
        Ok(&self.objects[start..end])
    }

    /// Iterate over all objects
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        let data = [0, 2, 1, 1, 4, 6, b'a', b'b', b'c', b'd', b'e', 0xFF];
        let mut reader = FontReader::new(&data);
        let index = Index::parse(&mut reader).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(0).unwrap(), b"abc");
        assert_eq!(index.get(1).unwrap(), b"de");
        assert!(index.get(2).is_err());
        assert_eq!(reader.pos(), 11);
    }

    #[test]
    fn test_empty_index() {
        let mut reader = FontReader::new(&[0, 0]);
        let index = Index::parse(&mut reader).unwrap();
        assert!(index.is_empty());
        assert_eq!(reader.pos(), 2);
    }

    #[test]
    fn test_truncated_index() {
        let data = [0, 1, 1, 1, 9, b'x'];
        assert!(Index::parse(&mut FontReader::new(&data)).is_err());
    }
}
