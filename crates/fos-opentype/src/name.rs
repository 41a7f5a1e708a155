//! Naming table (`name`)

use crate::reader::{slice_at, FontReader};
use crate::{FontError, Result};

/// Common name IDs
pub mod name_ids {
    pub const COPYRIGHT: u16 = 0;
    pub const FAMILY: u16 = 1;
    pub const SUBFAMILY: u16 = 2;
    pub const UNIQUE_ID: u16 = 3;
    pub const FULL_NAME: u16 = 4;
    pub const VERSION: u16 = 5;
    pub const POSTSCRIPT_NAME: u16 = 6;
    pub const TRADEMARK: u16 = 7;
    pub const MANUFACTURER: u16 = 8;
    pub const DESIGNER: u16 = 9;
    pub const DESCRIPTION: u16 = 10;
    pub const TYPOGRAPHIC_FAMILY: u16 = 16;
    pub const TYPOGRAPHIC_SUBFAMILY: u16 = 17;
}

pub const PLATFORM_UNICODE: u16 = 0;
pub const PLATFORM_MACINTOSH: u16 = 1;
pub const PLATFORM_WINDOWS: u16 = 3;

/// Windows language ID for US English
const LANGUAGE_EN_US: u16 = 0x0409;

/// Name table entry with its decoded string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: u16,
    pub name: String,
}

impl NameRecord {
    /// Whether the string is stored as UTF-16BE
    fn is_unicode(platform_id: u16) -> bool {
        matches!(platform_id, PLATFORM_UNICODE | PLATFORM_WINDOWS)
    }
}

/// Decoded `name` table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    pub version: u16,
    pub records: Vec<NameRecord>,
    /// Language tags of a version 1 table; language IDs from 0x8000 index here
    pub lang_tags: Vec<String>,
}

impl NameTable {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let version = reader.read_u16()?;
        if version > 1 {
            return Err(FontError::Unsupported { table: "name", format: version as u32 });
        }
        let count = reader.read_u16()?;
        let storage = slice_at(data, reader.read_u16()? as usize)?;

        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let platform_id = reader.read_u16()?;
            let encoding_id = reader.read_u16()?;
            let language_id = reader.read_u16()?;
            let name_id = reader.read_u16()?;
            let length = reader.read_u16()? as usize;
            let offset = reader.read_u16()? as usize;
            let Some(bytes) = storage.get(offset..offset + length) else {
                tracing::warn!(
                    "Skipping name {} ({}, {}): string outside storage",
                    name_id, platform_id, encoding_id
                );
                continue;
            };
            records.push(NameRecord {
                platform_id,
                encoding_id,
                language_id,
                name_id,
                name: decode_string(bytes, NameRecord::is_unicode(platform_id)),
            });
        }

        let mut lang_tags = Vec::new();
        if version == 1 {
            let tag_count = reader.read_u16()?;
            for _ in 0..tag_count {
                let length = reader.read_u16()? as usize;
                let offset = reader.read_u16()? as usize;
                let bytes = storage
                    .get(offset..offset + length)
                    .ok_or_else(|| FontError::malformed("name language tag outside storage"))?;
                lang_tags.push(decode_string(bytes, true));
            }
        }

        tracing::debug!("Parsed name: {} records", records.len());
        Ok(Self { version, records, lang_tags })
    }

    /// Best string for `name_id`.
    ///
    /// Prefers Windows US English, then any Unicode-encoded record, then
    /// anything at all.
    pub fn get(&self, name_id: u16) -> Option<&str> {
        let candidates = || self.records.iter().filter(move |r| r.name_id == name_id);
        candidates()
            .find(|r| r.platform_id == PLATFORM_WINDOWS && r.language_id == LANGUAGE_EN_US)
            .or_else(|| candidates().find(|r| NameRecord::is_unicode(r.platform_id)))
            .or_else(|| candidates().next())
            .map(|r| r.name.as_str())
    }

    /// Typographic family when present, else the legacy family name
    pub fn family_name(&self) -> Option<&str> {
        self.get(name_ids::TYPOGRAPHIC_FAMILY).or_else(|| self.get(name_ids::FAMILY))
    }

    /// Typographic subfamily when present, else the legacy subfamily name
    pub fn subfamily_name(&self) -> Option<&str> {
        self.get(name_ids::TYPOGRAPHIC_SUBFAMILY).or_else(|| self.get(name_ids::SUBFAMILY))
    }

    pub fn full_name(&self) -> Option<&str> {
        self.get(name_ids::FULL_NAME)
    }

    pub fn version_string(&self) -> Option<&str> {
        self.get(name_ids::VERSION)
    }

    pub fn postscript_name(&self) -> Option<&str> {
        self.get(name_ids::POSTSCRIPT_NAME)
    }
}

/// UTF-16BE for Unicode and Windows records; other platforms are read as
/// bytes, which covers the ASCII names Macintosh records carry in practice
fn decode_string(bytes: &[u8], utf16: bool) -> String {
    if utf16 {
        let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}
