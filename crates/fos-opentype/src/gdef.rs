//! Glyph Definition table (GDEF)
//!
//! Glyph classes drive lookup-flag filtering and mark attachment; mark
//! attachment classes and mark glyph sets refine which marks are skipped.

use crate::layout::{ClassDef, Coverage};
use crate::reader::{optional_slice_at, FontReader};
use crate::{FontError, Result};

/// GDEF glyph class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum GlyphClass {
    /// Not listed in the glyph class table
    #[default]
    Unclassified = 0,
    /// Single character, spacing glyph
    Base = 1,
    /// Multiple character, spacing glyph
    Ligature = 2,
    /// Non-spacing combining glyph
    Mark = 3,
    /// Part of a single character, spacing glyph
    Component = 4,
}

impl From<u16> for GlyphClass {
    fn from(value: u16) -> Self {
        match value {
            1 => Self::Base,
            2 => Self::Ligature,
            3 => Self::Mark,
            4 => Self::Component,
            _ => Self::Unclassified,
        }
    }
}

/// Decoded GDEF table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GdefTable {
    pub major_version: u16,
    pub minor_version: u16,
    pub glyph_classes: ClassDef,
    pub mark_attach_classes: ClassDef,
    pub mark_glyph_sets: Vec<Coverage>,
}

impl GdefTable {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        if major_version != 1 {
            return Err(FontError::Unsupported { table: "GDEF", format: major_version as u32 });
        }
        let glyph_class_offset = reader.read_u16()?;
        let _attach_list = reader.read_u16()?;
        let _lig_caret_list = reader.read_u16()?;
        let mark_attach_offset = reader.read_u16()?;
        let mark_sets_offset = if minor_version >= 2 { reader.read_u16()? } else { 0 };

        let glyph_classes = ClassDef::parse_at(data, glyph_class_offset)?;
        let mark_attach_classes = ClassDef::parse_at(data, mark_attach_offset)?;

        let mut mark_glyph_sets = Vec::new();
        if let Some(sets) = optional_slice_at(data, mark_sets_offset as usize)? {
            let mut sets_reader = FontReader::new(sets);
            let format = sets_reader.read_u16()?;
            if format != 1 {
                return Err(FontError::Unsupported { table: "MarkGlyphSets", format: format as u32 });
            }
            let count = sets_reader.read_u16()?;
            for _ in 0..count {
                let offset = sets_reader.read_u32()? as usize;
                mark_glyph_sets.push(Coverage::parse(crate::reader::slice_at(sets, offset)?)?);
            }
        }

        tracing::debug!(
            "Parsed GDEF {}.{}: {} mark glyph sets",
            major_version, minor_version, mark_glyph_sets.len()
        );
        Ok(Self { major_version, minor_version, glyph_classes, mark_attach_classes, mark_glyph_sets })
    }

    pub fn glyph_class(&self, glyph: u16) -> GlyphClass {
        GlyphClass::from(self.glyph_classes.class_of(glyph))
    }

    pub fn mark_attach_class(&self, glyph: u16) -> u16 {
        self.mark_attach_classes.class_of(glyph)
    }

    /// Whether `glyph` belongs to mark glyph set `set`
    pub fn is_in_mark_set(&self, set: u16, glyph: u16) -> bool {
        self.mark_glyph_sets
            .get(set as usize)
            .is_some_and(|coverage| coverage.contains(glyph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gdef_with_mark_sets() {
        let data = [
            // header v1.2: classDef @ 14, markAttach none, markSets @ 30
            0, 1, 0, 2, 0, 14, 0, 0, 0, 0, 0, 0, 0, 30,
            // ClassDef format 2: [10..=10] base, [20..=22] mark
            0, 2, 0, 2, 0, 10, 0, 10, 0, 1, 0, 20, 0, 22, 0, 3,
            // MarkGlyphSets: format 1, one set @ 8
            0, 1, 0, 1, 0, 0, 0, 8,
            // Coverage format 1: [21]
            0, 1, 0, 1, 0, 21,
        ];
        let gdef = GdefTable::parse(&data).unwrap();
        assert_eq!(gdef.glyph_class(10), GlyphClass::Base);
        assert_eq!(gdef.glyph_class(21), GlyphClass::Mark);
        assert_eq!(gdef.glyph_class(11), GlyphClass::Unclassified);
        assert!(gdef.is_in_mark_set(0, 21));
        assert!(!gdef.is_in_mark_set(0, 20));
        assert!(!gdef.is_in_mark_set(1, 21));
        assert_eq!(gdef.mark_attach_class(21), 0);
    }
}
