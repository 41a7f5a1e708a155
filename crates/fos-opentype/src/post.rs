//! PostScript table (`post`)
//!
//! Header fields and glyph names. Version 1 fonts use the standard
//! Macintosh glyph order; version 2 fonts index into it or into their own
//! Pascal-string list.

use crate::reader::FontReader;
use crate::{FontError, Result};

/// Size of the fixed header shared by every version
const HEADER_SIZE: usize = 32;

/// Number of standard Macintosh glyph names
pub const MAC_GLYPH_NAME_COUNT: usize = 258;

/// Standard Macintosh glyph names, in glyph order
#[rustfmt::skip]
pub const MAC_GLYPH_NAMES: [&str; MAC_GLYPH_NAME_COUNT] = [
    ".notdef", ".null", "nonmarkingreturn", "space", "exclam", "quotedbl",
    "numbersign", "dollar", "percent", "ampersand", "quotesingle", "parenleft",
    "parenright", "asterisk", "plus", "comma", "hyphen", "period",
    "slash", "zero", "one", "two", "three", "four",
    "five", "six", "seven", "eight", "nine", "colon",
    "semicolon", "less", "equal", "greater", "question", "at",
    "A", "B", "C", "D", "E", "F",
    "G", "H", "I", "J", "K", "L",
    "M", "N", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X",
    "Y", "Z", "bracketleft", "backslash", "bracketright", "asciicircum",
    "underscore", "grave", "a", "b", "c", "d",
    "e", "f", "g", "h", "i", "j",
    "k", "l", "m", "n", "o", "p",
    "q", "r", "s", "t", "u", "v",
    "w", "x", "y", "z", "braceleft", "bar",
    "braceright", "asciitilde", "Adieresis", "Aring", "Ccedilla", "Eacute",
    "Ntilde", "Odieresis", "Udieresis", "aacute", "agrave", "acircumflex",
    "adieresis", "atilde", "aring", "ccedilla", "eacute", "egrave",
    "ecircumflex", "edieresis", "iacute", "igrave", "icircumflex", "idieresis",
    "ntilde", "oacute", "ograve", "ocircumflex", "odieresis", "otilde",
    "uacute", "ugrave", "ucircumflex", "udieresis", "dagger", "degree",
    "cent", "sterling", "section", "bullet", "paragraph", "germandbls",
    "registered", "copyright", "trademark", "acute", "dieresis", "notequal",
    "AE", "Oslash", "infinity", "plusminus", "lessequal", "greaterequal",
    "yen", "mu", "partialdiff", "summation", "product", "pi",
    "integral", "ordfeminine", "ordmasculine", "Omega", "ae", "oslash",
    "questiondown", "exclamdown", "logicalnot", "radical", "florin", "approxequal",
    "Delta", "guillemotleft", "guillemotright", "ellipsis", "nonbreakingspace", "Agrave",
    "Atilde", "Otilde", "OE", "oe", "endash", "emdash",
    "quotedblleft", "quotedblright", "quoteleft", "quoteright", "divide", "lozenge",
    "ydieresis", "Ydieresis", "fraction", "currency", "guilsinglleft", "guilsinglright",
    "fi", "fl", "daggerdbl", "periodcentered", "quotesinglbase", "quotedblbase",
    "perthousand", "Acircumflex", "Ecircumflex", "Aacute", "Edieresis", "Egrave",
    "Iacute", "Icircumflex", "Idieresis", "Igrave", "Oacute", "Ocircumflex",
    "apple", "Ograve", "Uacute", "Ucircumflex", "Ugrave", "dotlessi",
    "circumflex", "tilde", "macron", "breve", "dotaccent", "ring",
    "cedilla", "hungarumlaut", "ogonek", "caron", "Lslash", "lslash",
    "Scaron", "scaron", "Zcaron", "zcaron", "brokenbar", "Eth",
    "eth", "Yacute", "yacute", "Thorn", "thorn", "minus",
    "multiply", "onesuperior", "twosuperior", "threesuperior", "onehalf", "onequarter",
    "threequarters", "franc", "Gbreve", "gbreve", "Idotaccent", "Scedilla",
    "scedilla", "Cacute", "cacute", "Ccaron", "ccaron", "dcroat",
];

/// Where glyph names come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlyphNames {
    /// Glyph ID indexes the standard Macintosh names (version 1)
    Standard,
    /// Per-glyph name index and the font's own names (version 2)
    Indexed { name_indices: Vec<u16>, custom: Vec<String> },
    /// No names (versions 2.5 and 3)
    None,
}

/// Decoded `post` table
#[derive(Debug, Clone, PartialEq)]
pub struct PostTable {
    /// Raw 16.16 version
    pub version: u32,
    /// Degrees counter-clockwise from vertical
    pub italic_angle: f32,
    pub underline_position: i16,
    pub underline_thickness: i16,
    pub is_fixed_pitch: bool,
    names: GlyphNames,
}

impl PostTable {
    pub const VERSION_1: u32 = 0x0001_0000;
    pub const VERSION_2: u32 = 0x0002_0000;
    pub const VERSION_2_5: u32 = 0x0002_5000;
    pub const VERSION_3: u32 = 0x0003_0000;

    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let version = reader.read_u32()?;
        let italic_angle = reader.read_fixed()?;
        let underline_position = reader.read_i16()?;
        let underline_thickness = reader.read_i16()?;
        let is_fixed_pitch = reader.read_u32()? != 0;
        // min/max memory for Type 42 and Type 1 downloads
        reader.skip(HEADER_SIZE - reader.pos())?;

        let names = match version {
            Self::VERSION_1 => GlyphNames::Standard,
            Self::VERSION_2 => read_indexed_names(&mut reader)?,
            Self::VERSION_2_5 | Self::VERSION_3 => GlyphNames::None,
            other => return Err(FontError::Unsupported { table: "post", format: other }),
        };

        tracing::debug!("Parsed post version {:#010x}", version);
        Ok(Self {
            version,
            italic_angle,
            underline_position,
            underline_thickness,
            is_fixed_pitch,
            names,
        })
    }

    pub fn names(&self) -> &GlyphNames {
        &self.names
    }

    /// Name of a glyph, if the table provides one
    pub fn glyph_name(&self, glyph: u16) -> Option<&str> {
        match &self.names {
            GlyphNames::Standard => MAC_GLYPH_NAMES.get(glyph as usize).copied(),
            GlyphNames::Indexed { name_indices, custom } => {
                let index = *name_indices.get(glyph as usize)? as usize;
                match index.checked_sub(MAC_GLYPH_NAME_COUNT) {
                    None => Some(MAC_GLYPH_NAMES[index]),
                    Some(custom_index) => custom.get(custom_index).map(String::as_str),
                }
            }
            GlyphNames::None => None,
        }
    }

    /// First glyph carrying `name`
    pub fn glyph_by_name(&self, name: &str) -> Option<u16> {
        let count = match &self.names {
            GlyphNames::Standard => MAC_GLYPH_NAME_COUNT,
            GlyphNames::Indexed { name_indices, .. } => name_indices.len(),
            GlyphNames::None => 0,
        };
        (0..count)
            .filter_map(|g| u16::try_from(g).ok())
            .find(|&g| self.glyph_name(g) == Some(name))
    }
}

fn read_indexed_names(reader: &mut FontReader) -> Result<GlyphNames> {
    let count = reader.read_u16()? as usize;
    let name_indices = reader.read_u16_array(count)?;

    let mut custom = Vec::new();
    while reader.remaining() > 0 {
        let len = reader.read_u8()? as usize;
        let Ok(bytes) = reader.read_bytes(len) else {
            tracing::warn!("Truncated post glyph name after {} names", custom.len());
            break;
        };
        custom.push(String::from_utf8_lossy(bytes).into_owned());
    }
    Ok(GlyphNames::Indexed { name_indices, custom })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: u32) -> Vec<u8> {
        let mut data = version.to_be_bytes().to_vec();
        // italic angle -12 + 0.5
        data.extend_from_slice(&(-12i16).to_be_bytes());
        data.extend_from_slice(&0x8000u16.to_be_bytes());
        data.extend_from_slice(&(-75i16).to_be_bytes());
        data.extend_from_slice(&50i16.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.resize(HEADER_SIZE, 0);
        data
    }

    #[test]
    fn test_version1_standard_names() {
        let post = PostTable::parse(&header(PostTable::VERSION_1)).unwrap();
        assert_eq!(post.italic_angle, -11.5);
        assert_eq!(post.underline_position, -75);
        assert_eq!(post.underline_thickness, 50);
        assert!(post.is_fixed_pitch);
        assert_eq!(post.glyph_name(3), Some("space"));
        assert_eq!(post.glyph_name(257), Some("dcroat"));
        assert_eq!(post.glyph_name(258), None);
        assert_eq!(post.glyph_by_name("A"), Some(36));
    }

    #[test]
    fn test_version2_custom_names() {
        let mut data = header(PostTable::VERSION_2);
        for v in [4u16, 0, 3, 258, 259] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        data.push(5);
        data.extend_from_slice(b"f_f_i");
        data.push(4);
        data.extend_from_slice(b"uniE");
        let post = PostTable::parse(&data).unwrap();
        assert_eq!(post.glyph_name(0), Some(".notdef"));
        assert_eq!(post.glyph_name(1), Some("space"));
        assert_eq!(post.glyph_name(2), Some("f_f_i"));
        assert_eq!(post.glyph_name(3), Some("uniE"));
        assert_eq!(post.glyph_name(4), None);
        assert_eq!(post.glyph_by_name("f_f_i"), Some(2));
        assert_eq!(post.glyph_by_name("A"), None);
    }

    #[test]
    fn test_version2_truncated_strings() {
        let mut data = header(PostTable::VERSION_2);
        for v in [2u16, 258, 259] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        data.push(2);
        data.extend_from_slice(b"ok");
        data.push(9);
        data.extend_from_slice(b"cut");
        let post = PostTable::parse(&data).unwrap();
        assert_eq!(post.glyph_name(0), Some("ok"));
        assert_eq!(post.glyph_name(1), None);
    }

    #[test]
    fn test_version3_and_unknown() {
        let post = PostTable::parse(&header(PostTable::VERSION_3)).unwrap();
        assert_eq!(post.names(), &GlyphNames::None);
        assert_eq!(post.glyph_name(0), None);
        assert_eq!(
            PostTable::parse(&header(0x0004_0000)),
            Err(FontError::Unsupported { table: "post", format: 0x0004_0000 })
        );
        assert!(matches!(PostTable::parse(&[0, 1, 0]), Err(FontError::Malformed(_))));
    }
}
