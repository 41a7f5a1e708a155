//! sfnt table directory
//!
//! Maps table tags to byte ranges in the font file. Handles plain sfnt
//! fonts and TrueType Collections. No table contents are validated here.

use crate::reader::FontReader;
use crate::tag::Tag;
use crate::{FontError, Result};

/// 'ttcf'
const TTC_MAGIC: u32 = 0x7474_6366;
const TRUETYPE: u32 = 0x0001_0000;
const OPENTYPE_CFF: u32 = 0x4F54_544F; // 'OTTO'
const APPLE_TRUE: u32 = 0x7472_7565; // 'true'
const OFFSET_TABLE_SIZE: usize = 12;
const TABLE_RECORD_SIZE: usize = 16;

/// Table directory record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRecord {
    pub tag: Tag,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

impl TableRecord {
    /// Byte range of the table, if it lies inside a buffer of `len` bytes
    pub fn range(&self, len: usize) -> Option<std::ops::Range<usize>> {
        let start = self.offset as usize;
        let end = start.checked_add(self.length as usize)?;
        (end <= len).then_some(start..end)
    }

    /// Recompute the table checksum and compare it with the record.
    ///
    /// The `head` table is summed with its checkSumAdjustment field zeroed.
    pub fn checksum_matches(&self, font_data: &[u8]) -> bool {
        let Some(range) = self.range(font_data.len()) else {
            return false;
        };
        let table = &font_data[range];
        let mut sum = 0u32;
        for (i, chunk) in table.chunks(4).enumerate() {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            if self.tag == Tag::HEAD && i == 2 {
                continue;
            }
            sum = sum.wrapping_add(u32::from_be_bytes(word));
        }
        sum == self.checksum
    }
}

/// Parsed table directory over a borrowed font buffer
#[derive(Debug, Clone)]
pub struct TableDirectory<'a> {
    data: &'a [u8],
    sfnt_version: u32,
    records: Vec<TableRecord>,
}

impl<'a> TableDirectory<'a> {
    /// Parse the directory of face `face_index` (only meaningful for collections)
    pub fn parse(data: &'a [u8], face_index: u32) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let magic = reader.read_u32()?;

        let offset = if magic == TTC_MAGIC {
            let _version = reader.read_u32()?;
            let num_fonts = reader.read_u32()?;
            if face_index >= num_fonts {
                return Err(FontError::malformed(format!(
                    "face index {} out of range, collection has {} fonts", face_index, num_fonts
                )));
            }
            reader.skip(face_index as usize * 4)?;
            reader.read_u32()? as usize
        } else {
            0
        };

        let mut reader = FontReader::at(data, offset)?;
        let sfnt_version = reader.read_u32()?;
        match sfnt_version {
            TRUETYPE | OPENTYPE_CFF | APPLE_TRUE => {}
            other => tracing::warn!("Unknown sfnt version: {:#010x}", other),
        }

        let num_tables = reader.read_u16()? as usize;
        let needed = offset + OFFSET_TABLE_SIZE + num_tables * TABLE_RECORD_SIZE;
        if needed > data.len() {
            return Err(FontError::malformed(format!(
                "directory declares {} tables ({} bytes) but buffer has {} bytes",
                num_tables, needed, data.len()
            )));
        }
        // searchRange, entrySelector, rangeShift
        reader.skip(6)?;

        let mut records = Vec::with_capacity(num_tables);
        for _ in 0..num_tables {
            records.push(TableRecord {
                tag: reader.read_tag()?,
                checksum: reader.read_u32()?,
                offset: reader.read_u32()?,
                length: reader.read_u32()?,
            });
        }

        tracing::debug!("Parsed table directory: {} tables", records.len());
        Ok(Self { data, sfnt_version, records })
    }

    /// Raw sfnt version
    pub fn sfnt_version(&self) -> u32 {
        self.sfnt_version
    }

    /// Whether outlines are CFF based ('OTTO')
    pub fn is_cff(&self) -> bool {
        self.sfnt_version == OPENTYPE_CFF
    }

    /// Table records in file order
    pub fn records(&self) -> &[TableRecord] {
        &self.records
    }

    /// Find the record for a tag
    pub fn find(&self, tag: Tag) -> Option<&TableRecord> {
        self.records.iter().find(|r| r.tag == tag)
    }

    /// Bytes of a table, `None` if absent.
    ///
    /// A record pointing outside the buffer is reported as malformed here,
    /// not at directory parse time.
    pub fn table_data(&self, tag: Tag) -> Result<Option<&'a [u8]>> {
        let Some(record) = self.find(tag) else {
            return Ok(None);
        };
        let range = record.range(self.data.len()).ok_or_else(|| {
            FontError::malformed(format!(
                "table '{}' at {}+{} exceeds {} byte font",
                tag, record.offset, record.length, self.data.len()
            ))
        })?;
        Ok(Some(&self.data[range]))
    }

    /// Bytes of a table that must be present
    pub fn required_table(&self, tag: Tag) -> Result<&'a [u8]> {
        self.table_data(tag)?.ok_or(FontError::TableNotFound(tag))
    }
}
