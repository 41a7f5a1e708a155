//! GPOS lookup subtables
//!
//! Each subtable is fully decoded into owned structures; offsets are
//! resolved against the subtable start at parse time.

use crate::layout::{Anchor, ClassDef, Coverage, ValueFormat, ValueRecord};
use crate::reader::{slice_at, FontReader};
use crate::{FontError, Result};

use super::context::{ChainedSequenceContext, SequenceContext};

/// Single adjustment positioning (Type 1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinglePos {
    /// Format 1: same adjustment for all covered glyphs
    Format1 { coverage: Coverage, value: ValueRecord },
    /// Format 2: one adjustment per coverage index
    Format2 { coverage: Coverage, values: Vec<ValueRecord> },
}

impl SinglePos {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let format = reader.read_u16()?;
        let coverage = Coverage::parse_at(data, reader.read_u16()?)?;
        let value_format = ValueFormat(reader.read_u16()?);
        match format {
            1 => Ok(Self::Format1 { coverage, value: ValueRecord::parse(&mut reader, value_format)? }),
            2 => {
                let count = reader.read_u16()?;
                let values = (0..count)
                    .map(|_| ValueRecord::parse(&mut reader, value_format))
                    .collect::<Result<_>>()?;
                Ok(Self::Format2 { coverage, values })
            }
            other => Err(unsupported("SinglePos", other)),
        }
    }

    /// Adjustment for a glyph, if covered
    pub fn value_for(&self, glyph: u16) -> Option<ValueRecord> {
        match self {
            Self::Format1 { coverage, value } => coverage.contains(glyph).then_some(*value),
            Self::Format2 { coverage, values } => {
                let idx = coverage.find_position(glyph)?;
                values.get(idx as usize).copied()
            }
        }
    }
}

/// Second glyph record of a pair set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairValue {
    pub second_glyph: u16,
    pub value1: ValueRecord,
    pub value2: ValueRecord,
}

/// Pair adjustment positioning (Type 2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairPos {
    /// Format 1: explicit glyph pairs
    Format1 {
        coverage: Coverage,
        value_format1: ValueFormat,
        value_format2: ValueFormat,
        /// Pair sets by first-glyph coverage index, sorted by second glyph
        pair_sets: Vec<Vec<PairValue>>,
    },
    /// Format 2: class pairs
    Format2 {
        coverage: Coverage,
        value_format1: ValueFormat,
        value_format2: ValueFormat,
        class_def1: ClassDef,
        class_def2: ClassDef,
        class1_count: u16,
        class2_count: u16,
        /// Row-major `class1_count x class2_count` matrix
        records: Vec<(ValueRecord, ValueRecord)>,
    },
}

impl PairPos {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let format = reader.read_u16()?;
        let coverage = Coverage::parse_at(data, reader.read_u16()?)?;
        let value_format1 = ValueFormat(reader.read_u16()?);
        let value_format2 = ValueFormat(reader.read_u16()?);

        match format {
            1 => {
                let set_count = reader.read_u16()? as usize;
                let offsets = reader.read_u16_array(set_count)?;
                let mut pair_sets = Vec::with_capacity(set_count);
                for offset in offsets {
                    let mut set = FontReader::new(slice_at(data, offset as usize)?);
                    let count = set.read_u16()?;
                    let mut pairs: Vec<PairValue> = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        pairs.push(PairValue {
                            second_glyph: set.read_u16()?,
                            value1: ValueRecord::parse(&mut set, value_format1)?,
                            value2: ValueRecord::parse(&mut set, value_format2)?,
                        });
                    }
                    if pairs.windows(2).any(|w| w[0].second_glyph >= w[1].second_glyph) {
                        return Err(FontError::malformed("pair set not sorted by second glyph"));
                    }
                    pair_sets.push(pairs);
                }
                Ok(Self::Format1 { coverage, value_format1, value_format2, pair_sets })
            }
            2 => {
                let class_def1 = ClassDef::parse_at(data, reader.read_u16()?)?;
                let class_def2 = ClassDef::parse_at(data, reader.read_u16()?)?;
                let class1_count = reader.read_u16()?;
                let class2_count = reader.read_u16()?;
                let cells = class1_count as usize * class2_count as usize;
                let needed = cells * (value_format1.record_size() + value_format2.record_size());
                if needed > reader.remaining() {
                    return Err(FontError::malformed("pair class matrix exceeds subtable"));
                }
                let mut records = Vec::with_capacity(cells);
                for _ in 0..cells {
                    let v1 = ValueRecord::parse(&mut reader, value_format1)?;
                    let v2 = ValueRecord::parse(&mut reader, value_format2)?;
                    records.push((v1, v2));
                }
                Ok(Self::Format2 {
                    coverage,
                    value_format1,
                    value_format2,
                    class_def1,
                    class_def2,
                    class1_count,
                    class2_count,
                    records,
                })
            }
            other => Err(unsupported("PairPos", other)),
        }
    }

    pub fn coverage(&self) -> &Coverage {
        match self {
            Self::Format1 { coverage, .. } | Self::Format2 { coverage, .. } => coverage,
        }
    }

    pub fn value_format2(&self) -> ValueFormat {
        match self {
            Self::Format1 { value_format2, .. } | Self::Format2 { value_format2, .. } => *value_format2,
        }
    }

    /// Adjustments for the pair `(first, second)`
    pub fn lookup(&self, first: u16, second: u16) -> Option<(ValueRecord, ValueRecord)> {
        match self {
            Self::Format1 { coverage, pair_sets, .. } => {
                let set = pair_sets.get(coverage.find_position(first)? as usize)?;
                let idx = set.binary_search_by_key(&second, |p| p.second_glyph).ok()?;
                Some((set[idx].value1, set[idx].value2))
            }
            Self::Format2 { coverage, class_def1, class_def2, class1_count, class2_count, records, .. } => {
                coverage.find_position(first)?;
                let class1 = class_def1.class_of(first);
                let class2 = class_def2.class_of(second);
                if class1 >= *class1_count || class2 >= *class2_count {
                    return None;
                }
                records.get(class1 as usize * *class2_count as usize + class2 as usize).copied()
            }
        }
    }
}

/// Entry and exit anchors of a cursive glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryExit {
    pub entry: Option<Anchor>,
    pub exit: Option<Anchor>,
}

/// Cursive attachment positioning (Type 3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursivePos {
    pub coverage: Coverage,
    pub records: Vec<EntryExit>,
}

impl CursivePos {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let format = reader.read_u16()?;
        if format != 1 {
            return Err(unsupported("CursivePos", format));
        }
        let coverage = Coverage::parse_at(data, reader.read_u16()?)?;
        let count = reader.read_u16()?;
        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let entry = Anchor::parse_at(data, reader.read_u16()?)?;
            let exit = Anchor::parse_at(data, reader.read_u16()?)?;
            records.push(EntryExit { entry, exit });
        }
        Ok(Self { coverage, records })
    }

    pub fn entry_exit(&self, glyph: u16) -> Option<&EntryExit> {
        self.records.get(self.coverage.find_position(glyph)? as usize)
    }
}

/// Mark class and anchor from a MarkArray
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkRecord {
    pub class: u16,
    pub anchor: Anchor,
}

fn parse_mark_array(data: &[u8]) -> Result<Vec<MarkRecord>> {
    let mut reader = FontReader::new(data);
    let count = reader.read_u16()?;
    let mut marks = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let class = reader.read_u16()?;
        let anchor = Anchor::parse_at(data, reader.read_u16()?)?
            .ok_or_else(|| FontError::malformed("mark record without anchor"))?;
        marks.push(MarkRecord { class, anchor });
    }
    Ok(marks)
}

/// Rows of `class_count` optional anchors (BaseArray, Mark2Array, LigatureAttach)
fn parse_anchor_matrix(data: &[u8], class_count: u16) -> Result<Vec<Vec<Option<Anchor>>>> {
    let mut reader = FontReader::new(data);
    let rows = reader.read_u16()?;
    let mut matrix = Vec::with_capacity(rows as usize);
    for _ in 0..rows {
        let row = (0..class_count)
            .map(|_| Anchor::parse_at(data, reader.read_u16()?))
            .collect::<Result<Vec<_>>>()?;
        matrix.push(row);
    }
    Ok(matrix)
}

/// Shared header of the three mark attachment subtables
struct MarkAttachHeader<'a> {
    mark_coverage: Coverage,
    target_coverage: Coverage,
    class_count: u16,
    marks: Vec<MarkRecord>,
    target_array: &'a [u8],
}

fn parse_mark_attach<'a>(data: &'a [u8], table: &'static str) -> Result<MarkAttachHeader<'a>> {
    let mut reader = FontReader::new(data);
    let format = reader.read_u16()?;
    if format != 1 {
        return Err(unsupported(table, format));
    }
    let mark_coverage = Coverage::parse_at(data, reader.read_u16()?)?;
    let target_coverage = Coverage::parse_at(data, reader.read_u16()?)?;
    let class_count = reader.read_u16()?;
    let marks = parse_mark_array(slice_at(data, reader.read_u16()? as usize)?)?;
    let target_array = slice_at(data, reader.read_u16()? as usize)?;
    Ok(MarkAttachHeader { mark_coverage, target_coverage, class_count, marks, target_array })
}

/// Mark-to-base attachment positioning (Type 4)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkBasePos {
    pub mark_coverage: Coverage,
    pub base_coverage: Coverage,
    pub mark_class_count: u16,
    pub marks: Vec<MarkRecord>,
    /// `[base coverage index][mark class]`
    pub base_anchors: Vec<Vec<Option<Anchor>>>,
}

impl MarkBasePos {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = parse_mark_attach(data, "MarkBasePos")?;
        Ok(Self {
            base_anchors: parse_anchor_matrix(header.target_array, header.class_count)?,
            mark_coverage: header.mark_coverage,
            base_coverage: header.target_coverage,
            mark_class_count: header.class_count,
            marks: header.marks,
        })
    }
}

/// Mark-to-ligature attachment positioning (Type 5)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkLigPos {
    pub mark_coverage: Coverage,
    pub ligature_coverage: Coverage,
    pub mark_class_count: u16,
    pub marks: Vec<MarkRecord>,
    /// `[ligature coverage index][component][mark class]`
    pub ligature_anchors: Vec<Vec<Vec<Option<Anchor>>>>,
}

impl MarkLigPos {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = parse_mark_attach(data, "MarkLigPos")?;
        let array = header.target_array;
        let mut reader = FontReader::new(array);
        let count = reader.read_u16()?;
        let mut ligature_anchors = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let attach = slice_at(array, reader.read_u16()? as usize)?;
            ligature_anchors.push(parse_anchor_matrix(attach, header.class_count)?);
        }
        Ok(Self {
            mark_coverage: header.mark_coverage,
            ligature_coverage: header.target_coverage,
            mark_class_count: header.class_count,
            marks: header.marks,
            ligature_anchors,
        })
    }
}

/// Mark-to-mark attachment positioning (Type 6)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkMarkPos {
    /// Attaching marks
    pub mark1_coverage: Coverage,
    /// Marks being attached to
    pub mark2_coverage: Coverage,
    pub mark_class_count: u16,
    pub mark1_records: Vec<MarkRecord>,
    /// `[mark2 coverage index][mark1 class]`
    pub mark2_anchors: Vec<Vec<Option<Anchor>>>,
}

impl MarkMarkPos {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = parse_mark_attach(data, "MarkMarkPos")?;
        Ok(Self {
            mark2_anchors: parse_anchor_matrix(header.target_array, header.class_count)?,
            mark1_coverage: header.mark_coverage,
            mark2_coverage: header.target_coverage,
            mark_class_count: header.class_count,
            mark1_records: header.marks,
        })
    }
}

/// A decoded GPOS subtable, extension wrappers already removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GposSubtable {
    Single(SinglePos),
    Pair(PairPos),
    Cursive(CursivePos),
    MarkToBase(MarkBasePos),
    MarkToLigature(MarkLigPos),
    MarkToMark(MarkMarkPos),
    Context(SequenceContext),
    ChainedContext(ChainedSequenceContext),
}

fn unsupported(table: &'static str, format: u16) -> FontError {
    FontError::Unsupported { table, format: format as u32 }
}
