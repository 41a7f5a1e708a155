//! Horizontal metrics (`hhea` + `hmtx`)

use crate::reader::FontReader;
use crate::{FontError, Result};

/// Offset of `numberOfHMetrics` in `hhea`
const NUM_H_METRICS_OFFSET: usize = 34;

/// Decoded horizontal header and metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HorizontalMetrics {
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    advances: Vec<u16>,
    left_side_bearings: Vec<i16>,
}

impl HorizontalMetrics {
    pub fn parse(hhea: &[u8], hmtx: &[u8], num_glyphs: u16) -> Result<Self> {
        let mut reader = FontReader::new(hhea);
        let _version = reader.read_u32()?;
        let ascender = reader.read_i16()?;
        let descender = reader.read_i16()?;
        let line_gap = reader.read_i16()?;
        reader.set_pos(NUM_H_METRICS_OFFSET);
        let num_h_metrics = reader.read_u16()?;
        if num_h_metrics == 0 {
            return Err(FontError::malformed("hhea has zero numberOfHMetrics"));
        }

        let mut reader = FontReader::new(hmtx);
        let mut advances = Vec::with_capacity(num_h_metrics as usize);
        let mut left_side_bearings = Vec::with_capacity(num_glyphs.max(num_h_metrics) as usize);
        for _ in 0..num_h_metrics {
            advances.push(reader.read_u16()?);
            left_side_bearings.push(reader.read_i16()?);
        }
        // Trailing bearings are often truncated in subset fonts
        for _ in num_h_metrics..num_glyphs {
            match reader.read_i16() {
                Ok(lsb) => left_side_bearings.push(lsb),
                Err(_) => break,
            }
        }

        tracing::debug!("Parsed hmtx: {} metrics for {} glyphs", num_h_metrics, num_glyphs);
        Ok(Self { ascender, descender, line_gap, advances, left_side_bearings })
    }

    /// Advance width; glyphs past `numberOfHMetrics` share the last one
    pub fn advance_width(&self, glyph: u16) -> u16 {
        self.advances
            .get(glyph as usize)
            .or_else(|| self.advances.last())
            .copied()
            .unwrap_or(0)
    }

    pub fn left_side_bearing(&self, glyph: u16) -> i16 {
        self.left_side_bearings.get(glyph as usize).copied().unwrap_or(0)
    }

    /// Number of full (advance, bearing) records
    pub fn num_h_metrics(&self) -> usize {
        self.advances.len()
    }
}
