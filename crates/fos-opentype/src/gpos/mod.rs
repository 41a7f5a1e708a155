//! OpenType GPOS (Glyph Positioning) Table
//!
//! All nine lookup types are decoded up front. Extension lookups (type 9)
//! are unwrapped so the engine only ever sees the eight concrete kinds.

mod apply;
pub mod context;
pub mod subtable;

pub use apply::{find_preceding_by_class, GlyphFilter, PositioningPass};
pub use context::{ChainedSequenceContext, ChainedSequenceRule, SequenceContext, SequenceLookupRecord, SequenceRule};
pub use subtable::{
    CursivePos, EntryExit, GposSubtable, MarkBasePos, MarkLigPos, MarkMarkPos, MarkRecord, PairPos,
    PairValue, SinglePos,
};

use crate::layout::{FeatureList, LookupFlags, ScriptList};
use crate::reader::{optional_slice_at, slice_at, FontReader};
use crate::tag::Tag;
use crate::{FontError, Result};

/// GPOS lookup type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum LookupType {
    /// Type 1: Single adjustment
    SingleAdjustment = 1,
    /// Type 2: Pair adjustment (kerning)
    PairAdjustment = 2,
    /// Type 3: Cursive attachment
    CursiveAttachment = 3,
    /// Type 4: Mark-to-base attachment
    MarkToBase = 4,
    /// Type 5: Mark-to-ligature attachment
    MarkToLigature = 5,
    /// Type 6: Mark-to-mark attachment
    MarkToMark = 6,
    /// Type 7: Contextual positioning
    Context = 7,
    /// Type 8: Chained contextual positioning
    ChainedContext = 8,
    /// Type 9: Extension positioning
    Extension = 9,
}

impl TryFrom<u16> for LookupType {
    type Error = FontError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Self::SingleAdjustment),
            2 => Ok(Self::PairAdjustment),
            3 => Ok(Self::CursiveAttachment),
            4 => Ok(Self::MarkToBase),
            5 => Ok(Self::MarkToLigature),
            6 => Ok(Self::MarkToMark),
            7 => Ok(Self::Context),
            8 => Ok(Self::ChainedContext),
            9 => Ok(Self::Extension),
            other => Err(FontError::Unsupported { table: "GPOS lookup", format: other as u32 }),
        }
    }
}

/// One positioning lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Effective type; for extension lookups, the wrapped type
    pub lookup_type: LookupType,
    pub flags: LookupFlags,
    pub mark_filtering_set: Option<u16>,
    pub subtables: Vec<GposSubtable>,
}

impl Lookup {
    fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let declared = LookupType::try_from(reader.read_u16()?)?;
        let flags = LookupFlags(reader.read_u16()?);
        let count = reader.read_u16()? as usize;
        let offsets = reader.read_u16_array(count)?;
        let mark_filtering_set = if flags.use_mark_filtering_set() {
            Some(reader.read_u16()?)
        } else {
            None
        };

        let mut wrapped: Option<LookupType> = None;
        let mut subtables = Vec::with_capacity(count);
        for offset in offsets {
            let sub_data = slice_at(data, offset as usize)?;
            let (kind, sub_data) = if declared == LookupType::Extension {
                unwrap_extension(sub_data)?
            } else {
                (declared, sub_data)
            };
            if wrapped.is_some_and(|prev| prev != kind) {
                return Err(FontError::malformed("extension subtables wrap different lookup types"));
            }
            wrapped = Some(kind);
            subtables.push(parse_subtable(kind, sub_data)?);
        }
        let lookup_type = wrapped.unwrap_or(declared);

        Ok(Self { lookup_type, flags, mark_filtering_set, subtables })
    }
}

/// Resolve an extension subtable to the type and bytes it wraps
fn unwrap_extension(data: &[u8]) -> Result<(LookupType, &[u8])> {
    let mut reader = FontReader::new(data);
    let format = reader.read_u16()?;
    if format != 1 {
        return Err(FontError::Unsupported { table: "ExtensionPos", format: format as u32 });
    }
    let kind = LookupType::try_from(reader.read_u16()?)?;
    if kind == LookupType::Extension {
        return Err(FontError::malformed("extension lookup wraps another extension"));
    }
    let offset = reader.read_u32()? as usize;
    Ok((kind, slice_at(data, offset)?))
}

fn parse_subtable(kind: LookupType, data: &[u8]) -> Result<GposSubtable> {
    Ok(match kind {
        LookupType::SingleAdjustment => GposSubtable::Single(SinglePos::parse(data)?),
        LookupType::PairAdjustment => GposSubtable::Pair(PairPos::parse(data)?),
        LookupType::CursiveAttachment => GposSubtable::Cursive(CursivePos::parse(data)?),
        LookupType::MarkToBase => GposSubtable::MarkToBase(MarkBasePos::parse(data)?),
        LookupType::MarkToLigature => GposSubtable::MarkToLigature(MarkLigPos::parse(data)?),
        LookupType::MarkToMark => GposSubtable::MarkToMark(MarkMarkPos::parse(data)?),
        LookupType::Context => GposSubtable::Context(SequenceContext::parse(data)?),
        LookupType::ChainedContext => GposSubtable::ChainedContext(ChainedSequenceContext::parse(data)?),
        LookupType::Extension => return Err(FontError::malformed("unexpected extension subtable")),
    })
}

/// Decoded GPOS table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GposTable {
    pub major_version: u16,
    pub minor_version: u16,
    pub scripts: ScriptList,
    pub features: FeatureList,
    pub lookups: Vec<Lookup>,
}

impl GposTable {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        if major_version != 1 {
            return Err(FontError::Unsupported { table: "GPOS", format: major_version as u32 });
        }
        let script_list_offset = reader.read_u16()? as usize;
        let feature_list_offset = reader.read_u16()? as usize;
        let lookup_list_offset = reader.read_u16()? as usize;
        // v1.1 adds a FeatureVariations offset; variations are not applied.

        let scripts = match optional_slice_at(data, script_list_offset)? {
            Some(list) => ScriptList::parse(list)?,
            None => ScriptList::default(),
        };
        let features = match optional_slice_at(data, feature_list_offset)? {
            Some(list) => FeatureList::parse(list)?,
            None => FeatureList::default(),
        };

        let mut lookups = Vec::new();
        if let Some(list) = optional_slice_at(data, lookup_list_offset)? {
            let mut list_reader = FontReader::new(list);
            let count = list_reader.read_u16()? as usize;
            for offset in list_reader.read_u16_array(count)? {
                lookups.push(Lookup::parse(slice_at(list, offset as usize)?)?);
            }
        }

        tracing::debug!(
            "Parsed GPOS {}.{}: {} scripts, {} features, {} lookups",
            major_version,
            minor_version,
            scripts.scripts.len(),
            features.features.len(),
            lookups.len()
        );
        Ok(Self { major_version, minor_version, scripts, features, lookups })
    }

    pub fn lookup(&self, index: u16) -> Option<&Lookup> {
        self.lookups.get(index as usize)
    }

    /// Lookup indices for `features` under a script/language, in lookup
    /// list order and without duplicates. The required feature, if any,
    /// is always included.
    pub fn lookups_for_features(&self, features: &[Tag], script: Tag, language: Option<Tag>) -> Vec<u16> {
        let Some(lang_sys) = self.scripts.select(script).and_then(|s| s.lang_sys(language)) else {
            return Vec::new();
        };

        let selected = lang_sys.feature_indices.iter().filter(|&&index| {
            self.features.get(index).is_some_and(|f| features.contains(&f.tag))
        });
        let mut indices: Vec<u16> = lang_sys
            .required_feature
            .iter()
            .chain(selected)
            .filter_map(|&index| self.features.get(index))
            .flat_map(|feature| feature.lookup_indices.iter().copied())
            .filter(|&index| (index as usize) < self.lookups.len())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
