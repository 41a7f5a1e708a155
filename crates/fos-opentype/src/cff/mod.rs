//! Compact Font Format (CFF) table
//!
//! Decodes the header, Name/Top DICT/String/Global Subr INDEXes and, per
//! font, the Private DICT, charset and CID structures (ROS, FDArray,
//! FDSelect). Charstrings are counted but not interpreted.

pub mod charset;
pub mod dict;
pub mod fd_select;
pub mod index;
pub mod strings;

pub use charset::Charset;
pub use dict::{Dict, DictOperator, DictValue, Operand};
pub use fd_select::{FdRange, FdSelect};
pub use index::Index;
pub use strings::StringTable;

use std::collections::HashMap;

use crate::cmap::CharacterToGlyphTable;
use crate::reader::FontReader;
use crate::{FontError, Result};

/// Default FontMatrix
const DEFAULT_FONT_MATRIX: [f64; 6] = [0.001, 0.0, 0.0, 0.001, 0.0, 0.0];
const DEFAULT_CID_COUNT: i32 = 8720;

/// Charstring subroutine bias for an INDEX of `count` entries
pub fn subr_bias(count: usize) -> i32 {
    if count < 1240 {
        107
    } else if count < 33900 {
        1131
    } else {
        32768
    }
}

/// CID font Registry-Ordering-Supplement
#[derive(Debug, Clone, PartialEq)]
pub struct Ros {
    pub registry: String,
    pub ordering: String,
    pub supplement: f64,
}

/// Private DICT with its local subroutines
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateDict {
    pub dict: Dict,
    pub local_subr_count: usize,
    pub default_width_x: f64,
    pub nominal_width_x: f64,
}

impl PrivateDict {
    /// Parse the Private DICT named by a `Private [size offset]` operand pair
    fn parse(cff: &[u8], size: i32, offset: i32) -> Result<Self> {
        let (size, offset) = match (usize::try_from(size), usize::try_from(offset)) {
            (Ok(s), Ok(o)) => (s, o),
            _ => return Err(FontError::malformed("negative Private DICT size or offset")),
        };
        let data = offset
            .checked_add(size)
            .and_then(|end| cff.get(offset..end))
            .ok_or_else(|| FontError::malformed("Private DICT outside CFF table"))?;
        let dict = Dict::parse(data)?;

        let local_subr_count = match dict.get(DictOperator::Subrs) {
            Some(value) => {
                // Subrs is relative to the start of the Private DICT
                let rel = usize::try_from(value.as_int()?)
                    .map_err(|_| FontError::malformed("negative Subrs offset"))?;
                Index::parse_at(cff, offset + rel)?.len()
            }
            None => 0,
        };

        Ok(Self {
            default_width_x: dict.number_or(DictOperator::DefaultWidthX, 0.0)?,
            nominal_width_x: dict.number_or(DictOperator::NominalWidthX, 0.0)?,
            dict,
            local_subr_count,
        })
    }

    pub fn has_local_subrs(&self) -> bool {
        self.dict.contains(DictOperator::Subrs)
    }

    pub fn local_subr_bias(&self) -> i32 {
        subr_bias(self.local_subr_count)
    }
}

/// Font DICT from the FDArray of a CID-keyed font
#[derive(Debug, Clone, PartialEq)]
pub struct FontDict {
    pub name: Option<String>,
    pub dict: Dict,
    pub private: Option<PrivateDict>,
}

/// Per-glyph metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CffGlyph {
    pub index: u16,
    /// Glyph name (name-keyed fonts)
    pub name: Option<String>,
    /// Character ID (CID-keyed fonts)
    pub cid: Option<u16>,
    pub unicodes: Vec<u32>,
}

/// One font of a CFF FontSet
#[derive(Debug, Clone)]
pub struct CffFont {
    pub name: String,
    pub top_dict: Dict,
    pub version: Option<String>,
    pub notice: Option<String>,
    pub copyright: Option<String>,
    pub full_name: Option<String>,
    pub family_name: Option<String>,
    pub weight: Option<String>,
    pub is_fixed_pitch: bool,
    pub italic_angle: f64,
    pub underline_position: f64,
    pub underline_thickness: f64,
    pub charstring_type: i32,
    pub font_matrix: [f64; 6],
    pub font_bbox: [f64; 4],
    pub ros: Option<Ros>,
    pub cid_font_version: f64,
    pub cid_count: i32,
    pub private: Option<PrivateDict>,
    pub font_dicts: Vec<FontDict>,
    pub fd_select: Option<FdSelect>,
    pub charset: Charset,
    glyphs: Vec<CffGlyph>,
    name_to_glyph: HashMap<String, u16>,
    unicode_to_glyph: HashMap<u32, u16>,
}

impl CffFont {
    fn parse(cff: &[u8], name: String, top_data: &[u8], strings: &StringTable) -> Result<Self> {
        let top = Dict::parse(top_data)?;
        let sid_string = |op: DictOperator| -> Result<Option<String>> {
            top.get(op).map(|v| strings.resolve(v.as_sid()?)).transpose()
        };

        let charstrings_offset = top
            .get(DictOperator::CharStrings)
            .ok_or_else(|| FontError::malformed("Top DICT has no CharStrings"))?
            .as_int()?;
        let num_glyphs = Index::parse_at(cff, offset_from(charstrings_offset)?)?.len();

        let private = match top.get(DictOperator::Private) {
            Some(v) => {
                let (size, offset) = v.as_number_pair()?;
                Some(PrivateDict::parse(cff, size, offset)?)
            }
            None => None,
        };

        let ros = match top.get(DictOperator::Ros) {
            Some(v) => {
                let (registry, ordering, supplement) = v.as_sid_sid_number()?;
                Some(Ros {
                    registry: strings.resolve(registry)?,
                    ordering: strings.resolve(ordering)?,
                    supplement,
                })
            }
            None => None,
        };

        let mut font_dicts = Vec::new();
        let mut fd_select = None;
        if ros.is_some() {
            if let Some(v) = top.get(DictOperator::FdArray) {
                let fd_index = Index::parse_at(cff, offset_from(v.as_int()?)?)?;
                for data in fd_index.iter() {
                    font_dicts.push(parse_font_dict(cff, data, strings)?);
                }
            }
            if let Some(v) = top.get(DictOperator::FdSelect) {
                match FdSelect::parse(cff, offset_from(v.as_int()?)?, num_glyphs) {
                    Ok(select) => fd_select = Some(select),
                    Err(FontError::Unsupported { format, .. }) => {
                        tracing::warn!("Ignoring FDSelect with unsupported format {}", format);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let charset_offset = offset_from(top.int_or(DictOperator::Charset, 0)?)?;
        let charset = Charset::parse(cff, charset_offset, num_glyphs)?;

        let font_bbox = match top.get(DictOperator::FontBBox) {
            Some(v) => v.as_array::<4>()?,
            None => [0.0; 4],
        };
        let font_matrix = match top.get(DictOperator::FontMatrix) {
            Some(v) => v.as_array::<6>()?,
            None => DEFAULT_FONT_MATRIX,
        };
        let is_fixed_pitch = match top.get(DictOperator::IsFixedPitch) {
            Some(v) => v.as_bool()?,
            None => false,
        };

        let mut font = Self {
            version: sid_string(DictOperator::Version)?,
            notice: sid_string(DictOperator::Notice)?,
            copyright: sid_string(DictOperator::Copyright)?,
            full_name: sid_string(DictOperator::FullName)?,
            family_name: sid_string(DictOperator::FamilyName)?,
            weight: sid_string(DictOperator::Weight)?,
            is_fixed_pitch,
            italic_angle: top.number_or(DictOperator::ItalicAngle, 0.0)?,
            underline_position: top.number_or(DictOperator::UnderlinePosition, -100.0)?,
            underline_thickness: top.number_or(DictOperator::UnderlineThickness, 50.0)?,
            charstring_type: top.int_or(DictOperator::CharstringType, 2)?,
            font_matrix,
            font_bbox,
            cid_font_version: top.number_or(DictOperator::CidFontVersion, 0.0)?,
            cid_count: top.int_or(DictOperator::CidCount, DEFAULT_CID_COUNT)?,
            ros,
            private,
            font_dicts,
            fd_select,
            charset,
            name,
            top_dict: top,
            glyphs: Vec::new(),
            name_to_glyph: HashMap::new(),
            unicode_to_glyph: HashMap::new(),
        };
        font.build_glyphs(num_glyphs, strings);
        Ok(font)
    }

    fn build_glyphs(&mut self, num_glyphs: usize, strings: &StringTable) {
        let cid_keyed = self.ros.is_some();
        self.glyphs = (0..num_glyphs.min(u16::MAX as usize + 1))
            .map(|i| {
                let index = i as u16;
                let sid = self.charset.sid(index);
                let (name, cid) = if cid_keyed {
                    (None, sid)
                } else {
                    (sid.and_then(|s| strings.get(s)).map(str::to_owned), None)
                };
                CffGlyph { index, name, cid, unicodes: Vec::new() }
            })
            .collect();

        self.name_to_glyph.clear();
        for glyph in &self.glyphs {
            if let Some(name) = &glyph.name {
                self.name_to_glyph.entry(name.clone()).or_insert(glyph.index);
            }
        }
    }

    /// True iff an FDSelect of a recognized format with ranges is present
    pub fn is_cid_font(&self) -> bool {
        self.fd_select.as_ref().is_some_and(FdSelect::has_ranges)
    }

    /// True iff the Private DICT declares local subroutines
    pub fn is_local_subroutine_available(&self) -> bool {
        self.private.as_ref().is_some_and(PrivateDict::has_local_subrs)
    }

    /// Local subr bias from the top-level Private DICT
    pub fn local_subr_bias(&self) -> Option<i32> {
        self.private.as_ref().filter(|p| p.has_local_subrs()).map(PrivateDict::local_subr_bias)
    }

    pub fn num_glyphs(&self) -> usize {
        self.glyphs.len()
    }

    pub fn glyphs(&self) -> &[CffGlyph] {
        &self.glyphs
    }

    /// Font DICT governing a glyph (CID-keyed fonts)
    pub fn font_dict_for(&self, glyph: u16) -> Option<&FontDict> {
        let fd = self.fd_select.as_ref()?.font_index(glyph as u32)?;
        self.font_dicts.get(fd as usize)
    }

    /// Glyph by index, falling back to `.notdef`
    pub fn glyph_by_index(&self, index: u16) -> Option<&CffGlyph> {
        self.glyphs.get(index as usize).or_else(|| self.glyphs.first())
    }

    /// Glyph by name, falling back to `.notdef`
    pub fn glyph_by_name(&self, name: &str) -> Option<&CffGlyph> {
        self.name_to_glyph
            .get(name)
            .and_then(|&i| self.glyphs.get(i as usize))
            .or_else(|| self.glyphs.first())
    }

    /// Glyph by code point, falling back to `.notdef`
    pub fn glyph_by_unicode(&self, cp: u32) -> Option<&CffGlyph> {
        self.unicode_to_glyph
            .get(&cp)
            .and_then(|&i| self.glyphs.get(i as usize))
            .or_else(|| self.glyphs.first())
    }

    /// Attach code points from the cmap to each glyph
    pub fn assign_unicodes(&mut self, cmap: &CharacterToGlyphTable) {
        self.unicode_to_glyph.clear();
        for glyph in &mut self.glyphs {
            glyph.unicodes = cmap.unicodes_for_glyph(glyph.index as u32).to_vec();
            for &cp in &glyph.unicodes {
                self.unicode_to_glyph.entry(cp).or_insert(glyph.index);
            }
        }
    }
}

fn offset_from(value: i32) -> Result<usize> {
    usize::try_from(value).map_err(|_| FontError::malformed(format!("negative CFF offset {}", value)))
}

fn parse_font_dict(cff: &[u8], data: &[u8], strings: &StringTable) -> Result<FontDict> {
    let dict = Dict::parse(data)?;
    let name = match dict.get(DictOperator::FontName) {
        Some(v) => Some(strings.resolve(v.as_sid()?)?),
        None => None,
    };
    let private = match dict.get(DictOperator::Private) {
        Some(v) => {
            let (size, offset) = v.as_number_pair()?;
            Some(PrivateDict::parse(cff, size, offset)?)
        }
        None => None,
    };
    Ok(FontDict { name, dict, private })
}

/// Decoded `CFF ` table
#[derive(Debug, Clone)]
pub struct CffTable {
    pub major: u8,
    pub minor: u8,
    pub strings: StringTable,
    pub global_subr_count: usize,
    pub fonts: Vec<CffFont>,
}

impl CffTable {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let major = reader.read_u8()?;
        let minor = reader.read_u8()?;
        let header_size = reader.read_u8()?;
        let _off_size = reader.read_u8()?;
        if major != 1 {
            return Err(FontError::Unsupported { table: "CFF", format: major as u32 });
        }

        reader.set_pos(header_size as usize);
        let names = Index::parse(&mut reader)?;
        let top_dicts = Index::parse(&mut reader)?;
        let string_index = Index::parse(&mut reader)?;
        let global_subrs = Index::parse(&mut reader)?;

        if names.len() != top_dicts.len() {
            return Err(FontError::malformed(format!(
                "CFF has {} names but {} Top DICTs", names.len(), top_dicts.len()
            )));
        }

        let entries: Vec<&[u8]> = string_index.iter().collect();
        let strings = StringTable::new(&entries);

        let mut fonts = Vec::with_capacity(names.len());
        for i in 0..names.len() {
            let name = names.get(i)?.iter().map(|&b| b as char).collect();
            fonts.push(CffFont::parse(data, name, top_dicts.get(i)?, &strings)?);
        }

        tracing::debug!(
            "Parsed CFF: {} font(s), {} custom strings, {} global subrs",
            fonts.len(),
            strings.custom_len(),
            global_subrs.len()
        );
        Ok(Self {
            major,
            minor,
            strings,
            global_subr_count: global_subrs.len(),
            fonts,
        })
    }

    pub fn global_subr_bias(&self) -> i32 {
        subr_bias(self.global_subr_count)
    }

    /// First (usually only) font of the set
    pub fn font(&self) -> Option<&CffFont> {
        self.fonts.first()
    }

    pub fn font_mut(&mut self) -> Option<&mut CffFont> {
        self.fonts.first_mut()
    }
}
