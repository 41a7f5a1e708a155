//! Legacy kerning table (`kern`)
//!
//! Only the OpenType (version 0) layout is read, and only format 0 pair
//! subtables carry data. The table is a fallback for fonts whose GPOS has
//! no `kern` feature.

use crate::gdef::GlyphClass;
use crate::reader::FontReader;
use crate::run::{GlyphPositioning, Vector};
use crate::{FontError, Result};

/// Size of a subtable header (version, length, coverage)
const SUBTABLE_HEADER_SIZE: usize = 6;

/// Kerning value for an ordered glyph pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernPair {
    pub left: u16,
    pub right: u16,
    /// Design units; negative values move the glyphs closer
    pub value: i16,
}

/// One `kern` subtable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernSubtable {
    pub coverage: u16,
    /// Sorted by `(left, right)`; empty for formats other than 0
    pub pairs: Vec<KernPair>,
}

impl KernSubtable {
    pub const HORIZONTAL: u16 = 0x0001;
    pub const MINIMUM: u16 = 0x0002;
    pub const CROSS_STREAM: u16 = 0x0004;
    pub const OVERRIDE: u16 = 0x0008;

    pub fn format(&self) -> u8 {
        (self.coverage >> 8) as u8
    }

    pub fn is_horizontal(&self) -> bool {
        self.coverage & Self::HORIZONTAL != 0
    }

    pub fn is_minimum(&self) -> bool {
        self.coverage & Self::MINIMUM != 0
    }

    pub fn is_cross_stream(&self) -> bool {
        self.coverage & Self::CROSS_STREAM != 0
    }

    pub fn is_override(&self) -> bool {
        self.coverage & Self::OVERRIDE != 0
    }

    /// Pair value, if the subtable lists the pair
    pub fn get(&self, left: u16, right: u16) -> Option<i16> {
        self.pairs
            .binary_search_by_key(&(left, right), |p| (p.left, p.right))
            .ok()
            .map(|i| self.pairs[i].value)
    }

    /// Whether the subtable adjusts horizontal advances
    fn adjusts_advance(&self) -> bool {
        self.format() == 0 && self.is_horizontal() && !self.is_minimum() && !self.is_cross_stream()
    }
}

/// Decoded `kern` table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernTable {
    pub subtables: Vec<KernSubtable>,
}

impl KernTable {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let version = reader.read_u16()?;
        if version != 0 {
            return Err(FontError::Unsupported { table: "kern", format: version as u32 });
        }
        let count = reader.read_u16()?;

        let mut subtables = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let start = reader.pos();
            let _version = reader.read_u16()?;
            let length = reader.read_u16()? as usize;
            let coverage = reader.read_u16()?;
            let mut subtable = KernSubtable { coverage, pairs: Vec::new() };

            if subtable.format() == 0 {
                subtable.pairs = read_pairs(&mut reader)?;
            } else {
                tracing::debug!("Skipping kern subtable format {}", subtable.format());
                // Length is only trusted for formats we do not read
                reader.set_pos(start + length.max(SUBTABLE_HEADER_SIZE));
                if reader.pos() > data.len() {
                    return Err(FontError::malformed("kern subtable exceeds table"));
                }
            }
            subtables.push(subtable);
        }

        tracing::debug!(
            "Parsed kern: {} subtables, {} pairs",
            subtables.len(),
            subtables.iter().map(|s| s.pairs.len()).sum::<usize>()
        );
        Ok(Self { subtables })
    }

    /// Combined horizontal kerning for a pair.
    ///
    /// Values of successive subtables add up; an override subtable replaces
    /// what came before. `None` when no subtable lists the pair.
    pub fn kerning(&self, left: u16, right: u16) -> Option<i16> {
        let mut total: Option<i16> = None;
        for subtable in self.subtables.iter().filter(|s| s.adjusts_advance()) {
            let Some(value) = subtable.get(left, right) else {
                continue;
            };
            total = Some(if subtable.is_override() {
                value
            } else {
                total.unwrap_or(0).saturating_add(value)
            });
        }
        total
    }

    /// Kern adjacent glyphs of `run` in `start..start + len`.
    ///
    /// Marks are transparent: a pair is formed by the nearest non-mark
    /// glyphs. The value is added to the advance of the left glyph. Returns
    /// the number of kerned pairs.
    pub fn apply<R: GlyphPositioning + ?Sized>(&self, run: &mut R, start: usize, len: usize) -> usize {
        let end = start.saturating_add(len).min(run.len());
        let mut kerned = 0;
        let mut left: Option<usize> = None;
        for i in start..end {
            if run.glyph_class(i) == GlyphClass::Mark {
                continue;
            }
            if let Some(l) = left {
                if let Some(value) = self.kerning(run.glyph_id(l), run.glyph_id(i)) {
                    run.append_advance(l, Vector::new(value as i32, 0));
                    kerned += 1;
                }
            }
            left = Some(i);
        }
        kerned
    }
}

fn read_pairs(reader: &mut FontReader) -> Result<Vec<KernPair>> {
    let count = reader.read_u16()? as usize;
    // searchRange, entrySelector, rangeShift
    reader.skip(6)?;
    if count.saturating_mul(6) > reader.remaining() {
        return Err(FontError::malformed(format!("{} kern pairs exceed table", count)));
    }
    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        pairs.push(KernPair {
            left: reader.read_u16()?,
            right: reader.read_u16()?,
            value: reader.read_i16()?,
        });
    }
    // Binary search needs sorted pairs; the first entry of a duplicate wins
    pairs.sort_by_key(|p| (p.left, p.right));
    pairs.dedup_by_key(|p| (p.left, p.right));
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{GlyphRun, PositionedGlyph};

    fn words(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    fn subtable(coverage: u16, pairs: &[(u16, u16, i16)]) -> Vec<u8> {
        let length = 14 + pairs.len() as u16 * 6;
        let mut data = words(&[0, length, coverage, pairs.len() as u16, 0, 0, 0]);
        for &(left, right, value) in pairs {
            data.extend(words(&[left, right, value as u16]));
        }
        data
    }

    fn kern(subtables: &[Vec<u8>]) -> Vec<u8> {
        let mut data = words(&[0, subtables.len() as u16]);
        for s in subtables {
            data.extend_from_slice(s);
        }
        data
    }

    #[test]
    fn test_format0_pairs() {
        let data = kern(&[subtable(0x0001, &[(5, 9, -40), (1, 2, -80)])]);
        let table = KernTable::parse(&data).unwrap();
        assert_eq!(table.subtables.len(), 1);
        // Pairs come back sorted
        assert_eq!(table.subtables[0].pairs[0], KernPair { left: 1, right: 2, value: -80 });
        assert_eq!(table.kerning(1, 2), Some(-80));
        assert_eq!(table.kerning(5, 9), Some(-40));
        assert_eq!(table.kerning(2, 1), None);
    }

    #[test]
    fn test_subtables_accumulate_and_override() {
        let data = kern(&[
            subtable(0x0001, &[(1, 2, -30)]),
            subtable(0x0001, &[(1, 2, -20), (3, 4, 10)]),
            subtable(0x0001 | KernSubtable::OVERRIDE, &[(3, 4, 25)]),
        ]);
        let table = KernTable::parse(&data).unwrap();
        assert_eq!(table.kerning(1, 2), Some(-50));
        assert_eq!(table.kerning(3, 4), Some(25));
    }

    #[test]
    fn test_vertical_and_minimum_ignored() {
        let data = kern(&[
            subtable(0x0000, &[(1, 2, -30)]),
            subtable(0x0001 | KernSubtable::MINIMUM, &[(1, 2, -20)]),
            subtable(0x0001 | KernSubtable::CROSS_STREAM, &[(1, 2, -10)]),
        ]);
        let table = KernTable::parse(&data).unwrap();
        assert_eq!(table.subtables.len(), 3);
        assert_eq!(table.kerning(1, 2), None);
    }

    #[test]
    fn test_other_formats_skipped_by_length() {
        let mut format2 = words(&[0, 10, 0x0201]);
        format2.extend(words(&[0xAAAA, 0xBBBB]));
        let data = kern(&[format2, subtable(0x0001, &[(1, 2, -30)])]);
        let table = KernTable::parse(&data).unwrap();
        assert_eq!(table.subtables[0].format(), 2);
        assert!(table.subtables[0].pairs.is_empty());
        assert_eq!(table.kerning(1, 2), Some(-30));
    }

    #[test]
    fn test_apply_skips_marks() {
        let table = KernTable::parse(&kern(&[subtable(0x0001, &[(1, 2, -60)])])).unwrap();
        let mut run = GlyphRun::new(vec![
            PositionedGlyph::new(1, GlyphClass::Base, 500),
            PositionedGlyph::new(7, GlyphClass::Mark, 0),
            PositionedGlyph::new(2, GlyphClass::Base, 500),
            PositionedGlyph::new(1, GlyphClass::Base, 500),
        ]);
        assert_eq!(table.apply(&mut run, 0, 4), 1);
        let advances: Vec<i32> = run.glyphs.iter().map(|g| g.advance.x).collect();
        assert_eq!(advances, vec![440, 0, 500, 500]);
        assert_eq!(table.apply(&mut run, 3, 10), 0);
    }

    #[test]
    fn test_unsupported_version_and_truncation() {
        assert_eq!(
            KernTable::parse(&words(&[1, 0, 0, 1])),
            Err(FontError::Unsupported { table: "kern", format: 1 })
        );
        let mut data = kern(&[subtable(0x0001, &[(1, 2, -30), (3, 4, 5)])]);
        data.truncate(data.len() - 4);
        assert!(matches!(KernTable::parse(&data), Err(FontError::Malformed(_))));
    }
}
