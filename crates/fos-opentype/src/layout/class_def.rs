//! Class definition tables

use crate::reader::FontReader;
use crate::{FontError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassRange {
    pub start_glyph: u16,
    pub end_glyph: u16,
    pub class: u16,
}

/// Class definition table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassDef {
    /// No table; every glyph is class 0
    #[default]
    Empty,
    /// Format 1: class array starting at `start_glyph`
    Format1 { start_glyph: u16, classes: Vec<u16> },
    /// Format 2: sorted, non-overlapping inclusive ranges
    Format2(Vec<ClassRange>),
}

impl ClassDef {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let format = reader.read_u16()?;
        match format {
            1 => {
                let start_glyph = reader.read_u16()?;
                let count = reader.read_u16()? as usize;
                let classes = reader.read_u16_array(count)?;
                Ok(Self::Format1 { start_glyph, classes })
            }
            2 => {
                let count = reader.read_u16()? as usize;
                let mut ranges: Vec<ClassRange> = Vec::with_capacity(count);
                for _ in 0..count {
                    let range = ClassRange {
                        start_glyph: reader.read_u16()?,
                        end_glyph: reader.read_u16()?,
                        class: reader.read_u16()?,
                    };
                    if range.end_glyph < range.start_glyph
                        || ranges.last().is_some_and(|prev| prev.end_glyph >= range.start_glyph)
                    {
                        return Err(FontError::malformed("class ranges overlap or are unsorted"));
                    }
                    ranges.push(range);
                }
                Ok(Self::Format2(ranges))
            }
            other => Err(FontError::Unsupported { table: "ClassDef", format: other as u32 }),
        }
    }

    /// Parse the table at `offset`; a zero offset yields [`ClassDef::Empty`]
    pub fn parse_at(data: &[u8], offset: u16) -> Result<Self> {
        match crate::reader::optional_slice_at(data, offset as usize)? {
            Some(table) => Self::parse(table),
            None => Ok(Self::Empty),
        }
    }

    /// Class of a glyph, `None` when the table does not mention it
    pub fn class_value(&self, glyph: u16) -> Option<u16> {
        match self {
            Self::Empty => None,
            Self::Format1 { start_glyph, classes } => glyph
                .checked_sub(*start_glyph)
                .and_then(|i| classes.get(i as usize))
                .copied(),
            Self::Format2(ranges) => {
                let idx = ranges.partition_point(|r| r.end_glyph < glyph);
                ranges.get(idx).filter(|r| r.start_glyph <= glyph).map(|r| r.class)
            }
        }
    }

    /// Class of a glyph, unlisted glyphs being class 0
    pub fn class_of(&self, glyph: u16) -> u16 {
        self.class_value(glyph).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format1() {
        let data = [0, 1, 0, 50, 0, 3, 0, 1, 0, 0, 0, 2];
        let class_def = ClassDef::parse(&data).unwrap();
        assert_eq!(class_def.class_value(50), Some(1));
        assert_eq!(class_def.class_value(51), Some(0));
        assert_eq!(class_def.class_value(52), Some(2));
        assert_eq!(class_def.class_value(49), None);
        assert_eq!(class_def.class_value(53), None);
        assert_eq!(class_def.class_of(53), 0);
    }

    #[test]
    fn test_format2_inclusive_ranges() {
        // [5..=9] -> 3, [10..=10] -> 1, [40..=45] -> 2
        let data = [
            0, 2, 0, 3, 0, 5, 0, 9, 0, 3, 0, 10, 0, 10, 0, 1, 0, 40, 0, 45, 0, 2,
        ];
        let class_def = ClassDef::parse(&data).unwrap();
        let expected = |k: u16| match k {
            5..=9 => Some(3),
            10 => Some(1),
            40..=45 => Some(2),
            _ => None,
        };
        for k in 0..60 {
            assert_eq!(class_def.class_value(k), expected(k), "glyph {}", k);
        }
    }

    #[test]
    fn test_overlapping_ranges_rejected() {
        let data = [0, 2, 0, 2, 0, 5, 0, 9, 0, 3, 0, 9, 0, 10, 0, 1];
        assert!(ClassDef::parse(&data).is_err());
    }

    #[test]
    fn test_empty() {
        assert_eq!(ClassDef::parse_at(&[], 0).unwrap(), ClassDef::Empty);
        assert_eq!(ClassDef::Empty.class_of(7), 0);
    }
}
