//! CFF charsets: glyph index to SID (or CID) mapping

use crate::reader::FontReader;
use crate::{FontError, Result};

/// Last SID of the ISOAdobe charset
const ISO_ADOBE_LAST_SID: u16 = 228;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Charset {
    /// Predefined ISOAdobe charset, glyph index equals SID
    IsoAdobe,
    /// Predefined Expert charsets; names are not resolved
    Expert,
    ExpertSubset,
    /// SID (or CID for CID-keyed fonts) per glyph index, `.notdef` included
    Custom(Vec<u16>),
}

impl Charset {
    /// Decode the charset referenced by the Top DICT `charset` operand
    pub fn parse(cff: &[u8], offset: usize, num_glyphs: usize) -> Result<Self> {
        match offset {
            0 => return Ok(Self::IsoAdobe),
            1 => return Ok(Self::Expert),
            2 => return Ok(Self::ExpertSubset),
            _ => {}
        }

        let mut reader = FontReader::at(cff, offset)?;
        let format = reader.read_u8()?;
        let mut sids = Vec::with_capacity(num_glyphs);
        sids.push(0);

        match format {
            0 => {
                while sids.len() < num_glyphs {
                    sids.push(reader.read_u16()?);
                }
            }
            1 | 2 => {
                while sids.len() < num_glyphs {
                    let first = reader.read_u16()?;
                    let n_left = if format == 1 {
                        reader.read_u8()? as u16
                    } else {
                        reader.read_u16()?
                    };
                    for i in 0..=n_left {
                        if sids.len() == num_glyphs {
                            break;
                        }
                        let sid = first.checked_add(i).ok_or_else(|| {
                            FontError::malformed("charset range overflows SID space")
                        })?;
                        sids.push(sid);
                    }
                }
            }
            other => return Err(FontError::Unsupported { table: "CFF charset", format: other as u32 }),
        }
        sids.truncate(num_glyphs.max(1));
        Ok(Self::Custom(sids))
    }

    /// SID (or CID) of a glyph
    pub fn sid(&self, glyph: u16) -> Option<u16> {
        match self {
            Self::IsoAdobe => (glyph <= ISO_ADOBE_LAST_SID).then_some(glyph),
            Self::Expert | Self::ExpertSubset => (glyph == 0).then_some(0),
            Self::Custom(sids) => sids.get(glyph as usize).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_and_format0() {
        let data = [0, 0, 0, 0, 0, 5, 0, 7, 9];
        assert_eq!(Charset::parse(&data, 0, 3).unwrap(), Charset::IsoAdobe);
        assert_eq!(Charset::parse(&data, 1, 3).unwrap(), Charset::Expert);
        assert_eq!(Charset::parse(&data, 3, 3).unwrap(), Charset::Custom(vec![0, 5, 7]));
        assert!(Charset::parse(&data, 8, 3).is_err(), "format 9 is not a charset format");
        assert_eq!(Charset::IsoAdobe.sid(1), Some(1));
        assert_eq!(Charset::IsoAdobe.sid(229), None);
    }

    #[test]
    fn test_format1_ranges() {
        // padding, format 1, (first 100, nLeft 2), (first 7, nLeft 0)
        let data = [0, 0, 0, 1, 0, 100, 2, 0, 7, 0];
        let charset = Charset::parse(&data, 3, 5).unwrap();
        assert_eq!(charset, Charset::Custom(vec![0, 100, 101, 102, 7]));
        assert_eq!(charset.sid(4), Some(7));
        assert_eq!(charset.sid(5), None);
    }

    #[test]
    fn test_format2_truncates_to_glyph_count() {
        let data = [0, 0, 0, 2, 0, 10, 0, 9];
        let charset = Charset::parse(&data, 3, 4).unwrap();
        assert_eq!(charset, Charset::Custom(vec![0, 10, 11, 12]));
    }
}
