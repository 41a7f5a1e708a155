//! Coverage tables

use crate::reader::FontReader;
use crate::{FontError, Result};

/// Range record of a format 2 coverage table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRecord {
    pub start_glyph: u16,
    pub end_glyph: u16,
    pub start_coverage_index: u16,
}

/// Coverage table (maps glyph IDs to coverage indices)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    /// Format 1: sorted list of glyph IDs
    Glyphs(Vec<u16>),
    /// Format 2: sorted glyph ranges
    Ranges(Vec<RangeRecord>),
}

impl Coverage {
    /// Parse a coverage table. Lists must be ascending and duplicate-free.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let format = reader.read_u16()?;
        let count = reader.read_u16()? as usize;

        match format {
            1 => {
                let glyphs = reader.read_u16_array(count)?;
                if glyphs.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(FontError::malformed("coverage glyphs not strictly ascending"));
                }
                Ok(Self::Glyphs(glyphs))
            }
            2 => {
                let mut ranges = Vec::with_capacity(count);
                for _ in 0..count {
                    let range = RangeRecord {
                        start_glyph: reader.read_u16()?,
                        end_glyph: reader.read_u16()?,
                        start_coverage_index: reader.read_u16()?,
                    };
                    if range.end_glyph < range.start_glyph {
                        return Err(FontError::malformed("coverage range ends before it starts"));
                    }
                    if ranges.last().is_some_and(|prev: &RangeRecord| prev.end_glyph >= range.start_glyph) {
                        return Err(FontError::malformed("coverage ranges overlap or are unsorted"));
                    }
                    ranges.push(range);
                }
                Ok(Self::Ranges(ranges))
            }
            other => Err(FontError::Unsupported { table: "Coverage", format: other as u32 }),
        }
    }

    /// Parse the coverage table at `offset` within `data`
    pub fn parse_at(data: &[u8], offset: u16) -> Result<Self> {
        Self::parse(crate::reader::slice_at(data, offset as usize)?)
    }

    /// Coverage index of a glyph
    pub fn find_position(&self, glyph: u16) -> Option<u16> {
        match self {
            Self::Glyphs(glyphs) => glyphs.binary_search(&glyph).ok().map(|i| i as u16),
            Self::Ranges(ranges) => {
                let idx = ranges.partition_point(|r| r.end_glyph < glyph);
                let range = ranges.get(idx).filter(|r| r.start_glyph <= glyph)?;
                Some(range.start_coverage_index.wrapping_add(glyph - range.start_glyph))
            }
        }
    }

    pub fn contains(&self, glyph: u16) -> bool {
        self.find_position(glyph).is_some()
    }

    /// Covered glyphs in coverage order
    pub fn glyphs(&self) -> Box<dyn Iterator<Item = u16> + '_> {
        match self {
            Self::Glyphs(glyphs) => Box::new(glyphs.iter().copied()),
            Self::Ranges(ranges) => {
                Box::new(ranges.iter().flat_map(|r| r.start_glyph..=r.end_glyph))
            }
        }
    }

    /// Number of covered glyphs
    pub fn len(&self) -> usize {
        match self {
            Self::Glyphs(glyphs) => glyphs.len(),
            Self::Ranges(ranges) => ranges
                .iter()
                .map(|r| (r.end_glyph - r.start_glyph) as usize + 1)
                .sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
