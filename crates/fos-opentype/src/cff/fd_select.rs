//! FDSelect: glyph index to Font DICT index for CID-keyed fonts

use crate::reader::FontReader;
use crate::{FontError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FdRange {
    pub first: u32,
    pub fd: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FdSelect {
    /// One FD index per glyph
    Format0(Vec<u8>),
    /// 16-bit ranges
    Format3 { ranges: Vec<FdRange>, sentinel: u32 },
    /// 32-bit ranges
    Format4 { ranges: Vec<FdRange>, sentinel: u32 },
}

impl FdSelect {
    pub fn parse(cff: &[u8], offset: usize, num_glyphs: usize) -> Result<Self> {
        let mut reader = FontReader::at(cff, offset)?;
        let format = reader.read_u8()?;
        match format {
            0 => Ok(Self::Format0(reader.read_bytes(num_glyphs)?.to_vec())),
            3 => {
                let count = reader.read_u16()? as usize;
                let mut ranges = Vec::with_capacity(count);
                for _ in 0..count {
                    let first = reader.read_u16()? as u32;
                    let fd = reader.read_u8()? as u16;
                    ranges.push(FdRange { first, fd });
                }
                let sentinel = reader.read_u16()? as u32;
                check_sorted(&ranges, sentinel)?;
                Ok(Self::Format3 { ranges, sentinel })
            }
            4 => {
                let count = reader.read_u32()? as usize;
                if count.saturating_mul(6) > reader.remaining() {
                    return Err(FontError::malformed("FDSelect range count exceeds table"));
                }
                let mut ranges = Vec::with_capacity(count);
                for _ in 0..count {
                    let first = reader.read_u32()?;
                    let fd = reader.read_u16()?;
                    ranges.push(FdRange { first, fd });
                }
                let sentinel = reader.read_u32()?;
                check_sorted(&ranges, sentinel)?;
                Ok(Self::Format4 { ranges, sentinel })
            }
            other => Err(FontError::Unsupported { table: "CFF FDSelect", format: other as u32 }),
        }
    }

    pub fn format(&self) -> u8 {
        match self {
            Self::Format0(_) => 0,
            Self::Format3 { .. } => 3,
            Self::Format4 { .. } => 4,
        }
    }

    /// Whether the selector actually maps any glyph
    pub fn has_ranges(&self) -> bool {
        match self {
            Self::Format0(fds) => !fds.is_empty(),
            Self::Format3 { ranges, .. } | Self::Format4 { ranges, .. } => !ranges.is_empty(),
        }
    }

    /// Font DICT index of a glyph
    pub fn font_index(&self, glyph: u32) -> Option<u16> {
        match self {
            Self::Format0(fds) => fds.get(glyph as usize).map(|&fd| fd as u16),
            Self::Format3 { ranges, sentinel } | Self::Format4 { ranges, sentinel } => {
                if glyph >= *sentinel {
                    return None;
                }
                let idx = ranges.partition_point(|r| r.first <= glyph);
                idx.checked_sub(1).map(|i| ranges[i].fd)
            }
        }
    }
}

fn check_sorted(ranges: &[FdRange], sentinel: u32) -> Result<()> {
    let sorted = ranges.windows(2).all(|w| w[0].first < w[1].first);
    let bounded = ranges.last().is_none_or(|r| r.first < sentinel);
    if sorted && bounded {
        Ok(())
    } else {
        Err(FontError::malformed("FDSelect ranges are not ascending"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format3_lookup() {
        // 2 ranges: [0, 5) -> fd 0, [5, 10) -> fd 1
        let data = [3, 0, 2, 0, 0, 0, 0, 5, 1, 0, 10];
        let select = FdSelect::parse(&data, 0, 10).unwrap();
        assert_eq!(select.font_index(0), Some(0));
        assert_eq!(select.font_index(4), Some(0));
        assert_eq!(select.font_index(5), Some(1));
        assert_eq!(select.font_index(9), Some(1));
        assert_eq!(select.font_index(10), None);
        assert!(select.has_ranges());
    }

    #[test]
    fn test_format0_lookup() {
        let select = FdSelect::parse(&[0, 2, 1, 0], 0, 3).unwrap();
        assert_eq!(select.font_index(0), Some(2));
        assert_eq!(select.font_index(3), None);
    }

    #[test]
    fn test_format4_lookup() {
        let data = [4, 0, 0, 0, 1, 0, 0, 0, 0, 0, 7, 0, 1, 0, 0];
        let select = FdSelect::parse(&data, 0, 65536).unwrap();
        assert_eq!(select.font_index(65535), Some(7));
        assert_eq!(select.font_index(65536), None);
    }

    #[test]
    fn test_unknown_format() {
        assert!(matches!(
            FdSelect::parse(&[1, 0], 0, 1),
            Err(FontError::Unsupported { .. })
        ));
    }
}
