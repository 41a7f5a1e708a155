//! cmap subtable formats
//!
//! Every format decodes into owned arrays so the maps outlive the font
//! buffer and can be shared across threads.

use std::collections::{BTreeMap, BTreeSet};

use crate::reader::{slice_at, FontReader};
use crate::{FontError, Result};

/// Segment of a format 4 subtable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start_code: u16,
    pub end_code: u16,
    pub id_delta: i16,
    pub id_range_offset: u16,
}

/// Sequential or constant group (formats 8, 12, 13)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapGroup {
    pub start_char: u32,
    pub end_char: u32,
    pub start_glyph: u32,
}

/// Default UVS range: `start..=start + additional_count`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicodeRange {
    pub start: u32,
    pub additional_count: u8,
}

/// Non-default UVS mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UvsMapping {
    pub unicode: u32,
    pub glyph_id: u16,
}

/// Variation selector record of a format 14 subtable
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariationSelector {
    pub selector: u32,
    pub default_uvs: Vec<UnicodeRange>,
    pub non_default_uvs: Vec<UvsMapping>,
}

/// Highest Unicode scalar value; enumeration never walks past it
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

/// Result of a variation sequence lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariationGlyph {
    /// Sequence is not described by the subtable
    NotFound,
    /// Use the glyph the base character maps to on its own
    UseDefault,
    /// Sequence maps to this glyph
    Found(u32),
}

/// A decoded cmap subtable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharacterMap {
    /// Byte encoding table
    Format0 { glyphs: Vec<u8> },
    /// Segment mapping to delta values
    Format4 { segments: Vec<Segment>, glyph_ids: Vec<u16> },
    /// Trimmed table mapping
    Format6 { first_code: u16, glyphs: Vec<u16> },
    /// Mixed 16-bit and 32-bit coverage
    Format8 { is32: Vec<u8>, groups: Vec<MapGroup> },
    /// Trimmed array over 32-bit codes
    Format10 { start_char: u32, glyphs: Vec<u16> },
    /// Segmented coverage
    Format12 { groups: Vec<MapGroup> },
    /// Many-to-one range mappings
    Format13 { groups: Vec<MapGroup> },
    /// Unicode variation sequences
    Format14 { selectors: Vec<VariationSelector> },
}

impl CharacterMap {
    /// Decode the subtable starting at `data[0]`
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let format = reader.read_u16()?;
        match format {
            0 => {
                let _length = reader.read_u16()?;
                let _language = reader.read_u16()?;
                let glyphs = reader.read_bytes(256)?.to_vec();
                Ok(Self::Format0 { glyphs })
            }
            4 => parse_format4(data),
            6 => {
                let _length = reader.read_u16()?;
                let _language = reader.read_u16()?;
                let first_code = reader.read_u16()?;
                let count = reader.read_u16()? as usize;
                let glyphs = reader.read_u16_array(count)?;
                Ok(Self::Format6 { first_code, glyphs })
            }
            8 => {
                let _reserved = reader.read_u16()?;
                let _length = reader.read_u32()?;
                let _language = reader.read_u32()?;
                let is32 = reader.read_bytes(8192)?.to_vec();
                let groups = read_groups(&mut reader)?;
                Ok(Self::Format8 { is32, groups })
            }
            10 => {
                let _reserved = reader.read_u16()?;
                let _length = reader.read_u32()?;
                let _language = reader.read_u32()?;
                let start_char = reader.read_u32()?;
                let count = reader.read_u32()? as usize;
                let glyphs = reader.read_u16_array(count)?;
                Ok(Self::Format10 { start_char, glyphs })
            }
            12 | 13 => {
                let _reserved = reader.read_u16()?;
                let _length = reader.read_u32()?;
                let _language = reader.read_u32()?;
                let groups = read_groups(&mut reader)?;
                if format == 12 {
                    Ok(Self::Format12 { groups })
                } else {
                    Ok(Self::Format13 { groups })
                }
            }
            14 => parse_format14(data),
            other => Err(FontError::Unsupported { table: "cmap", format: other as u32 }),
        }
    }

    /// Subtable format number
    pub fn format(&self) -> u16 {
        match self {
            Self::Format0 { .. } => 0,
            Self::Format4 { .. } => 4,
            Self::Format6 { .. } => 6,
            Self::Format8 { .. } => 8,
            Self::Format10 { .. } => 10,
            Self::Format12 { .. } => 12,
            Self::Format13 { .. } => 13,
            Self::Format14 { .. } => 14,
        }
    }

    /// Glyph for a code point, 0 when unmapped.
    ///
    /// Format 14 never maps a lone code point; use [`Self::variation_glyph`].
    pub fn glyph_index(&self, cp: u32) -> u32 {
        match self {
            Self::Format0 { glyphs } => glyphs.get(cp as usize).map_or(0, |&g| g as u32),
            Self::Format4 { segments, glyph_ids } => format4_lookup(segments, glyph_ids, cp),
            Self::Format6 { first_code, glyphs } => cp
                .checked_sub(*first_code as u32)
                .and_then(|i| glyphs.get(i as usize))
                .map_or(0, |&g| g as u32),
            Self::Format8 { groups, .. } | Self::Format12 { groups } => {
                find_group(groups, cp).map_or(0, |g| g.start_glyph.wrapping_add(cp - g.start_char))
            }
            Self::Format10 { start_char, glyphs } => cp
                .checked_sub(*start_char)
                .and_then(|i| glyphs.get(i as usize))
                .map_or(0, |&g| g as u32),
            Self::Format13 { groups } => find_group(groups, cp).map_or(0, |g| g.start_glyph),
            Self::Format14 { .. } => 0,
        }
    }

    /// Resolve a `(base, variation selector)` sequence (format 14 only)
    pub fn variation_glyph(&self, base: u32, selector: u32) -> VariationGlyph {
        let Self::Format14 { selectors } = self else {
            return VariationGlyph::NotFound;
        };
        let Ok(idx) = selectors.binary_search_by_key(&selector, |s| s.selector) else {
            return VariationGlyph::NotFound;
        };
        let record = &selectors[idx];

        let in_default = record
            .default_uvs
            .binary_search_by(|r| {
                if base < r.start {
                    std::cmp::Ordering::Greater
                } else if base > r.start + r.additional_count as u32 {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok();
        if in_default {
            return VariationGlyph::UseDefault;
        }

        match record.non_default_uvs.binary_search_by_key(&base, |m| m.unicode) {
            Ok(i) => VariationGlyph::Found(record.non_default_uvs[i].glyph_id as u32),
            Err(_) => VariationGlyph::NotFound,
        }
    }

    /// All code points that map to a non-zero glyph
    pub fn collect_unicode_chars(&self) -> BTreeSet<u32> {
        let mut chars = BTreeSet::new();
        self.for_each_mapping(|cp, _| {
            chars.insert(cp);
        });
        chars
    }

    /// Every code point to glyph mapping with a non-zero glyph
    pub fn unicode_to_glyph_mappings(&self) -> BTreeMap<u32, u32> {
        let mut map = BTreeMap::new();
        self.for_each_mapping(|cp, glyph| {
            map.insert(cp, glyph);
        });
        map
    }

    /// Visit mappings in ascending code point order.
    ///
    /// Code points above [`MAX_CODE_POINT`] are not visited, whatever range
    /// a group declares.
    pub fn for_each_mapping(&self, mut f: impl FnMut(u32, u32)) {
        let mut emit = |cp: u32, glyph: u32| {
            if glyph != 0 {
                f(cp, glyph);
            }
        };
        match self {
            Self::Format0 { glyphs } => {
                for (cp, &g) in glyphs.iter().enumerate() {
                    emit(cp as u32, g as u32);
                }
            }
            Self::Format4 { segments, glyph_ids } => {
                for seg in segments {
                    // 0xFFFF sentinel segment
                    if seg.start_code == 0xFFFF {
                        continue;
                    }
                    for cp in seg.start_code as u32..=seg.end_code as u32 {
                        emit(cp, format4_lookup(segments, glyph_ids, cp));
                    }
                }
            }
            Self::Format6 { first_code, glyphs } => {
                for (i, &g) in glyphs.iter().enumerate() {
                    emit(*first_code as u32 + i as u32, g as u32);
                }
            }
            Self::Format10 { start_char, glyphs } => {
                for (i, &g) in glyphs.iter().enumerate() {
                    let Some(cp) = start_char.checked_add(i as u32) else {
                        break;
                    };
                    if cp > MAX_CODE_POINT {
                        break;
                    }
                    emit(cp, g as u32);
                }
            }
            Self::Format8 { groups, .. } | Self::Format12 { groups } => {
                for g in groups.iter().take_while(|g| g.start_char <= MAX_CODE_POINT) {
                    for cp in g.start_char..=g.end_char.min(MAX_CODE_POINT) {
                        emit(cp, g.start_glyph.wrapping_add(cp - g.start_char));
                    }
                }
            }
            Self::Format13 { groups } => {
                for g in groups.iter().take_while(|g| g.start_char <= MAX_CODE_POINT) {
                    for cp in g.start_char..=g.end_char.min(MAX_CODE_POINT) {
                        emit(cp, g.start_glyph);
                    }
                }
            }
            Self::Format14 { .. } => {}
        }
    }
}

fn read_groups(reader: &mut FontReader) -> Result<Vec<MapGroup>> {
    let count = reader.read_u32()? as usize;
    if count.saturating_mul(12) > reader.remaining() {
        return Err(FontError::malformed(format!("cmap group count {} exceeds subtable", count)));
    }
    let mut groups = Vec::with_capacity(count);
    let mut prev_end: Option<u32> = None;
    for _ in 0..count {
        let group = MapGroup {
            start_char: reader.read_u32()?,
            end_char: reader.read_u32()?,
            start_glyph: reader.read_u32()?,
        };
        if group.end_char < group.start_char || prev_end.is_some_and(|end| group.start_char <= end) {
            return Err(FontError::malformed("cmap groups are not sorted"));
        }
        prev_end = Some(group.end_char);
        groups.push(group);
    }
    Ok(groups)
}

fn find_group(groups: &[MapGroup], cp: u32) -> Option<&MapGroup> {
    let idx = groups.partition_point(|g| g.end_char < cp);
    groups.get(idx).filter(|g| g.start_char <= cp)
}

fn parse_format4(data: &[u8]) -> Result<CharacterMap> {
    let mut reader = FontReader::new(data);
    let _format = reader.read_u16()?;
    let length = reader.read_u16()? as usize;
    let _language = reader.read_u16()?;
    let seg_count = (reader.read_u16()? / 2) as usize;
    // searchRange, entrySelector, rangeShift
    reader.skip(6)?;

    let end_codes = reader.read_u16_array(seg_count)?;
    let _reserved_pad = reader.read_u16()?;
    let start_codes = reader.read_u16_array(seg_count)?;
    let id_deltas = reader.read_u16_array(seg_count)?;
    let id_range_offsets = reader.read_u16_array(seg_count)?;

    // Some fonts overstate the length, so clamp to the buffer.
    let end = length.clamp(reader.pos(), data.len());
    let glyph_count = (end - reader.pos()) / 2;
    let glyph_ids = reader.read_u16_array(glyph_count)?;

    let segments = (0..seg_count)
        .map(|i| Segment {
            start_code: start_codes[i],
            end_code: end_codes[i],
            id_delta: id_deltas[i] as i16,
            id_range_offset: id_range_offsets[i],
        })
        .collect();
    Ok(CharacterMap::Format4 { segments, glyph_ids })
}

fn format4_lookup(segments: &[Segment], glyph_ids: &[u16], cp: u32) -> u32 {
    if cp > 0xFFFF {
        return 0;
    }
    let idx = segments.partition_point(|s| (s.end_code as u32) < cp);
    let Some(seg) = segments.get(idx) else {
        return 0;
    };
    if (seg.start_code as u32) > cp {
        return 0;
    }

    if seg.id_range_offset == 0 {
        return (cp as i32 + seg.id_delta as i32) as u32 & 0xFFFF;
    }

    // idRangeOffset is relative to its own slot in the idRangeOffset array,
    // which sits `segments.len() - idx` words before glyphIdArray.
    let index = (seg.id_range_offset / 2) as i64 + (cp - seg.start_code as u32) as i64
        + idx as i64
        - segments.len() as i64;
    let Some(&glyph) = usize::try_from(index).ok().and_then(|i| glyph_ids.get(i)) else {
        return 0;
    };
    if glyph == 0 {
        0
    } else {
        (glyph as i32 + seg.id_delta as i32) as u32 & 0xFFFF
    }
}

fn parse_format14(data: &[u8]) -> Result<CharacterMap> {
    let mut reader = FontReader::new(data);
    let _format = reader.read_u16()?;
    let _length = reader.read_u32()?;
    let count = reader.read_u32()? as usize;
    if count.saturating_mul(11) > reader.remaining() {
        return Err(FontError::malformed(format!("{} variation selectors exceed subtable", count)));
    }

    let mut selectors = Vec::with_capacity(count);
    for _ in 0..count {
        let selector = reader.read_u24()?;
        let default_offset = reader.read_u32()? as usize;
        let non_default_offset = reader.read_u32()? as usize;

        let mut record = VariationSelector { selector, ..Default::default() };
        if default_offset != 0 {
            let mut r = FontReader::new(slice_at(data, default_offset)?);
            let n = r.read_u32()?;
            for _ in 0..n {
                record.default_uvs.push(UnicodeRange {
                    start: r.read_u24()?,
                    additional_count: r.read_u8()?,
                });
            }
        }
        if non_default_offset != 0 {
            let mut r = FontReader::new(slice_at(data, non_default_offset)?);
            let n = r.read_u32()?;
            for _ in 0..n {
                record.non_default_uvs.push(UvsMapping {
                    unicode: r.read_u24()?,
                    glyph_id: r.read_u16()?,
                });
            }
        }
        selectors.push(record);
    }
    Ok(CharacterMap::Format14 { selectors })
}
