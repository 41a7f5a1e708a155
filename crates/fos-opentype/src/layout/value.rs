//! Value records, anchors and lookup flags

use crate::reader::FontReader;
use crate::{FontError, Result};

/// Bit field declaring which ValueRecord fields are present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ValueFormat(pub u16);

impl ValueFormat {
    pub const X_PLACEMENT: u16 = 0x0001;
    pub const Y_PLACEMENT: u16 = 0x0002;
    pub const X_ADVANCE: u16 = 0x0004;
    pub const Y_ADVANCE: u16 = 0x0008;
    pub const X_PLACEMENT_DEVICE: u16 = 0x0010;
    pub const Y_PLACEMENT_DEVICE: u16 = 0x0020;
    pub const X_ADVANCE_DEVICE: u16 = 0x0040;
    pub const Y_ADVANCE_DEVICE: u16 = 0x0080;

    pub fn contains(self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Encoded size of a record in bytes
    pub fn record_size(self) -> usize {
        (self.0 & 0x00FF).count_ones() as usize * 2
    }
}

/// Placement and advance adjustment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueRecord {
    pub x_placement: i16,
    pub y_placement: i16,
    pub x_advance: i16,
    pub y_advance: i16,
}

impl ValueRecord {
    /// Read a record whose fields are selected by `format`.
    ///
    /// Device table offsets are consumed and dropped: no hinting here.
    pub fn parse(reader: &mut FontReader, format: ValueFormat) -> Result<Self> {
        let mut record = ValueRecord::default();
        if format.contains(ValueFormat::X_PLACEMENT) {
            record.x_placement = reader.read_i16()?;
        }
        if format.contains(ValueFormat::Y_PLACEMENT) {
            record.y_placement = reader.read_i16()?;
        }
        if format.contains(ValueFormat::X_ADVANCE) {
            record.x_advance = reader.read_i16()?;
        }
        if format.contains(ValueFormat::Y_ADVANCE) {
            record.y_advance = reader.read_i16()?;
        }
        let devices = (format.0 & 0x00F0).count_ones() as usize;
        reader.skip(devices * 2)?;
        Ok(record)
    }

    /// Check if record has any positioning
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Attachment point in design units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
    /// Contour point of a format 2 anchor; not used for positioning
    pub anchor_point: Option<u16>,
}

impl Anchor {
    /// Parse anchor table (formats 1, 2 and 3)
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let format = reader.read_u16()?;
        let x = reader.read_i16()?;
        let y = reader.read_i16()?;
        let anchor_point = match format {
            1 | 3 => None,
            2 => Some(reader.read_u16()?),
            other => return Err(FontError::Unsupported { table: "Anchor", format: other as u32 }),
        };
        Ok(Self { x, y, anchor_point })
    }

    /// Parse the anchor at `offset`; zero means no anchor
    pub fn parse_at(data: &[u8], offset: u16) -> Result<Option<Self>> {
        crate::reader::optional_slice_at(data, offset as usize)?
            .map(Self::parse)
            .transpose()
    }
}

/// Lookup flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct LookupFlags(pub u16);

impl LookupFlags {
    pub const RIGHT_TO_LEFT: u16 = 0x0001;
    pub const IGNORE_BASE_GLYPHS: u16 = 0x0002;
    pub const IGNORE_LIGATURES: u16 = 0x0004;
    pub const IGNORE_MARKS: u16 = 0x0008;
    pub const USE_MARK_FILTERING_SET: u16 = 0x0010;
    pub const MARK_ATTACHMENT_TYPE_MASK: u16 = 0xFF00;

    pub fn right_to_left(self) -> bool {
        self.0 & Self::RIGHT_TO_LEFT != 0
    }

    pub fn ignore_base_glyphs(self) -> bool {
        self.0 & Self::IGNORE_BASE_GLYPHS != 0
    }

    pub fn ignore_ligatures(self) -> bool {
        self.0 & Self::IGNORE_LIGATURES != 0
    }

    pub fn ignore_marks(self) -> bool {
        self.0 & Self::IGNORE_MARKS != 0
    }

    pub fn use_mark_filtering_set(self) -> bool {
        self.0 & Self::USE_MARK_FILTERING_SET != 0
    }

    /// Mark attachment class filter, 0 when unused
    pub fn mark_attachment_type(self) -> u16 {
        (self.0 & Self::MARK_ATTACHMENT_TYPE_MASK) >> 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_record_size() {
        assert_eq!(ValueFormat(0).record_size(), 0);
        assert_eq!(ValueFormat(0x0005).record_size(), 4);
        assert_eq!(ValueFormat(0x00FF).record_size(), 16);
    }

    #[test]
    fn test_value_record_skips_devices() {
        // xAdvance = -30, xAdvDevice = 0x1234, then a trailing word
        let data = [0xFF, 0xE2, 0x12, 0x34, 0xAB, 0xCD];
        let mut reader = FontReader::new(&data);
        let record = ValueRecord::parse(&mut reader, ValueFormat(0x0044)).unwrap();
        assert_eq!(record, ValueRecord { x_advance: -30, ..Default::default() });
        assert_eq!(reader.read_u16().unwrap(), 0xABCD);
    }

    #[test]
    fn test_anchor_formats() {
        let f1 = [0, 1, 0, 100, 0xFF, 0x38];
        assert_eq!(Anchor::parse(&f1).unwrap(), Anchor { x: 100, y: -200, anchor_point: None });
        let f2 = [0, 2, 0, 1, 0, 2, 0, 7];
        assert_eq!(Anchor::parse(&f2).unwrap().anchor_point, Some(7));
        let f3 = [0, 3, 0, 5, 0, 6, 0, 0, 0, 0];
        assert_eq!(Anchor::parse(&f3).unwrap().x, 5);
        assert!(Anchor::parse(&[0, 4, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_lookup_flags() {
        let flags = LookupFlags(0x0309);
        assert!(flags.right_to_left());
        assert!(flags.ignore_marks());
        assert!(!flags.ignore_ligatures());
        assert_eq!(flags.mark_attachment_type(), 3);
    }
}
