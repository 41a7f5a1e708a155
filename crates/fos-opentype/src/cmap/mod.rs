//! Character to glyph mapping (cmap table)
//!
//! Subtables are consulted in table order; the first one that maps a code
//! point to a non-zero glyph wins.

mod subtable;

pub use subtable::{
    CharacterMap, MapGroup, Segment, UnicodeRange, UvsMapping, VariationGlyph, VariationSelector,
    MAX_CODE_POINT,
};

use std::collections::{BTreeMap, HashMap};
use std::sync::{OnceLock, RwLock};

use crate::config::FontConfig;
use crate::reader::{slice_at, FontReader};
use crate::{FontError, Result};

/// Encoding record pointing at a decoded subtable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub offset: u32,
    /// Index into [`CharacterToGlyphTable::maps`]
    pub map_index: usize,
}

/// Decoded cmap table with lookup caches
#[derive(Debug)]
pub struct CharacterToGlyphTable {
    version: u16,
    encodings: Vec<EncodingRecord>,
    maps: Vec<CharacterMap>,
    cache: Option<RwLock<HashMap<u32, u32>>>,
    unicode_to_glyph: OnceLock<BTreeMap<u32, u32>>,
    glyph_to_unicode: OnceLock<BTreeMap<u32, Vec<u32>>>,
}

impl CharacterToGlyphTable {
    /// Parse the cmap table.
    ///
    /// Subtables of an unsupported format are skipped; malformed ones fail
    /// the whole table.
    pub fn parse(data: &[u8], config: &FontConfig) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let version = reader.read_u16()?;
        let num_tables = reader.read_u16()? as usize;

        let mut encodings = Vec::with_capacity(num_tables);
        let mut maps = Vec::new();
        let mut by_offset: HashMap<u32, usize> = HashMap::new();

        for _ in 0..num_tables {
            let platform_id = reader.read_u16()?;
            let encoding_id = reader.read_u16()?;
            let offset = reader.read_u32()?;

            let map_index = match by_offset.get(&offset) {
                Some(&index) => index,
                None => match CharacterMap::parse(slice_at(data, offset as usize)?) {
                    Ok(map) => {
                        maps.push(map);
                        by_offset.insert(offset, maps.len() - 1);
                        maps.len() - 1
                    }
                    Err(FontError::Unsupported { format, .. }) => {
                        tracing::warn!(
                            "Skipping cmap subtable ({}, {}) with unsupported format {}",
                            platform_id, encoding_id, format
                        );
                        continue;
                    }
                    Err(e) => return Err(e),
                },
            };
            encodings.push(EncodingRecord { platform_id, encoding_id, offset, map_index });
        }

        tracing::debug!("Parsed cmap: {} encodings, {} subtables", encodings.len(), maps.len());
        Ok(Self {
            version,
            encodings,
            maps,
            cache: config.cache_glyph_lookups.then(|| RwLock::new(HashMap::new())),
            unicode_to_glyph: OnceLock::new(),
            glyph_to_unicode: OnceLock::new(),
        })
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    /// Encoding records in table order
    pub fn encodings(&self) -> &[EncodingRecord] {
        &self.encodings
    }

    /// Decoded subtables, deduplicated by offset
    pub fn maps(&self) -> &[CharacterMap] {
        &self.maps
    }

    fn maps_in_priority(&self) -> impl Iterator<Item = &CharacterMap> {
        self.encodings.iter().map(|e| &self.maps[e.map_index])
    }

    /// Glyph for a code point, 0 (`.notdef`) when no subtable maps it
    pub fn glyph_index(&self, cp: u32) -> u32 {
        if let Some(cache) = &self.cache {
            if let Ok(cache) = cache.read() {
                if let Some(&glyph) = cache.get(&cp) {
                    return glyph;
                }
            }
        }

        let glyph = self
            .maps_in_priority()
            .map(|m| m.glyph_index(cp))
            .find(|&g| g != 0)
            .unwrap_or(0);

        if let Some(cache) = &self.cache {
            if let Ok(mut cache) = cache.write() {
                cache.insert(cp, glyph);
            }
        }
        glyph
    }

    /// Glyph for a base character followed by a variation selector.
    ///
    /// Falls back to the default glyph of `cp` when no format 14 subtable
    /// describes the sequence.
    pub fn glyph_index_with_variation(&self, cp: u32, selector: u32) -> u32 {
        for map in self.maps_in_priority() {
            match map.variation_glyph(cp, selector) {
                VariationGlyph::Found(glyph) => return glyph,
                VariationGlyph::UseDefault => break,
                VariationGlyph::NotFound => {}
            }
        }
        self.glyph_index(cp)
    }

    /// Whether `cp` is a variation selector known to any format 14 subtable
    pub fn is_variation_selector(&self, cp: u32) -> bool {
        self.maps.iter().any(|m| match m {
            CharacterMap::Format14 { selectors } => selectors.iter().any(|s| s.selector == cp),
            _ => false,
        })
    }

    /// All mapped code points; earlier subtables win on conflicts
    pub fn unicode_to_glyph(&self) -> &BTreeMap<u32, u32> {
        self.unicode_to_glyph.get_or_init(|| {
            let mut map = BTreeMap::new();
            for sub in self.maps_in_priority() {
                sub.for_each_mapping(|cp, glyph| {
                    map.entry(cp).or_insert(glyph);
                });
            }
            map
        })
    }

    /// Inverse of [`Self::unicode_to_glyph`]: glyph to every code point
    /// that resolves to it
    pub fn glyph_to_unicode(&self) -> &BTreeMap<u32, Vec<u32>> {
        self.glyph_to_unicode.get_or_init(|| {
            let mut inverse: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
            for (&cp, &glyph) in self.unicode_to_glyph() {
                inverse.entry(glyph).or_default().push(cp);
            }
            inverse
        })
    }

    /// Code points mapping to `glyph`, ascending
    pub fn unicodes_for_glyph(&self, glyph: u32) -> &[u32] {
        self.glyph_to_unicode().get(&glyph).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format6(first: u16, glyphs: &[u16]) -> Vec<u8> {
        let mut data = Vec::new();
        for v in [6u16, 10 + glyphs.len() as u16 * 2, 0, first, glyphs.len() as u16] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        for g in glyphs {
            data.extend_from_slice(&g.to_be_bytes());
        }
        data
    }

    fn format14(selector: u32, default_start: u32, mapped: (u32, u16)) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&14u16.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&selector.to_be_bytes()[1..]);
        // header 10 + record 11 = 21
        data.extend_from_slice(&21u32.to_be_bytes());
        data.extend_from_slice(&29u32.to_be_bytes());
        // default UVS
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&default_start.to_be_bytes()[1..]);
        data.push(0);
        // non-default UVS
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&mapped.0.to_be_bytes()[1..]);
        data.extend_from_slice(&mapped.1.to_be_bytes());
        data
    }

    fn cmap(subtables: &[(u16, u16, Vec<u8>)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&(subtables.len() as u16).to_be_bytes());
        let mut offset = 4 + subtables.len() * 8;
        for (platform, encoding, body) in subtables {
            data.extend_from_slice(&platform.to_be_bytes());
            data.extend_from_slice(&encoding.to_be_bytes());
            data.extend_from_slice(&(offset as u32).to_be_bytes());
            offset += body.len();
        }
        for (_, _, body) in subtables {
            data.extend_from_slice(body);
        }
        data
    }

    #[test]
    fn test_table_order_priority() {
        let data = cmap(&[(3, 1, format6(65, &[0, 4])), (0, 3, format6(65, &[7, 8]))]);
        let table = CharacterToGlyphTable::parse(&data, &FontConfig::default()).unwrap();
        // First subtable has no glyph for 'A', second one does
        assert_eq!(table.glyph_index(65), 7);
        assert_eq!(table.glyph_index(66), 4);
        // Cached answer stays the same
        assert_eq!(table.glyph_index(66), 4);
        assert_eq!(table.glyph_index(1000), 0);
    }

    #[test]
    fn test_inverse_mapping_agrees_with_forward() {
        let data = cmap(&[(3, 1, format6(65, &[5, 5])), (0, 3, format6(64, &[5, 6, 9]))]);
        let table = CharacterToGlyphTable::parse(&data, &FontConfig::new().with_glyph_cache(false)).unwrap();
        assert_eq!(table.unicodes_for_glyph(5), &[64, 65, 66]);
        assert_eq!(table.unicode_to_glyph().get(&65), Some(&5));
        assert_eq!(table.unicode_to_glyph().get(&66), Some(&5));
        // Shadowed mappings of lower-priority subtables do not leak into the inverse
        assert_eq!(table.glyph_index(65), 5);
        assert!(table.unicodes_for_glyph(6).is_empty());
        assert!(table.unicodes_for_glyph(9).is_empty());
        for (&glyph, cps) in table.glyph_to_unicode() {
            for &cp in cps {
                assert_eq!(table.glyph_index(cp), glyph);
            }
        }
    }

    #[test]
    fn test_shared_subtable_decoded_once() {
        let mut data = cmap(&[(0, 3, format6(65, &[1])), (3, 1, Vec::new())]);
        // Point the second record at the first subtable
        let first = data[8..12].to_vec();
        data[16..20].copy_from_slice(&first);
        let table = CharacterToGlyphTable::parse(&data, &FontConfig::default()).unwrap();
        assert_eq!(table.maps().len(), 1);
        assert_eq!(table.encodings().len(), 2);
    }

    #[test]
    fn test_variation_sequences() {
        let data = cmap(&[
            (0, 3, format6(0x845B, &[10])),
            (0, 5, format14(0xE0100, 0x845B, (0x845B + 1, 0))),
            (0, 5, format14(0xE0101, 0x4E00, (0x845B, 11))),
        ]);
        let table = CharacterToGlyphTable::parse(&data, &FontConfig::default()).unwrap();
        assert_eq!(table.glyph_index_with_variation(0x845B, 0xE0100), 10);
        assert_eq!(table.glyph_index_with_variation(0x845B, 0xE0101), 11);
        assert_eq!(table.glyph_index_with_variation(0x845B, 0xFE00), 10);
        assert!(table.is_variation_selector(0xE0101));
        // Format 14 contributes nothing to plain mappings
        assert_eq!(table.unicode_to_glyph().len(), 1);
    }

    #[test]
    fn test_unsupported_subtable_skipped() {
        let data = cmap(&[(1, 0, vec![0, 2, 0, 6, 0, 0]), (3, 1, format6(65, &[3]))]);
        let table = CharacterToGlyphTable::parse(&data, &FontConfig::default()).unwrap();
        assert_eq!(table.encodings().len(), 1);
        assert_eq!(table.glyph_index(65), 3);
    }
}
