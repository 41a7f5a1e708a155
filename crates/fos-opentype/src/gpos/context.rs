//! Sequence context and chained sequence context subtables (Types 7 and 8)

use crate::layout::{ClassDef, Coverage};
use crate::reader::{optional_slice_at, slice_at, FontReader};
use crate::{FontError, Result};

/// Nested lookup to apply at a position of the matched input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceLookupRecord {
    pub sequence_index: u16,
    pub lookup_index: u16,
}

fn read_lookup_records(reader: &mut FontReader, count: u16) -> Result<Vec<SequenceLookupRecord>> {
    (0..count)
        .map(|_| {
            Ok(SequenceLookupRecord {
                sequence_index: reader.read_u16()?,
                lookup_index: reader.read_u16()?,
            })
        })
        .collect()
}

/// Rule of a format 1 (glyph IDs) or format 2 (classes) context.
///
/// `input` excludes the first glyph, which is matched by coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRule {
    pub input: Vec<u16>,
    pub lookups: Vec<SequenceLookupRecord>,
}

impl SequenceRule {
    fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let glyph_count = reader.read_u16()?;
        let lookup_count = reader.read_u16()?;
        if glyph_count == 0 {
            return Err(FontError::malformed("sequence rule with no input glyphs"));
        }
        let input = reader.read_u16_array(glyph_count as usize - 1)?;
        let lookups = read_lookup_records(&mut reader, lookup_count)?;
        Ok(Self { input, lookups })
    }
}

/// Rule of a chained format 1 or 2 context; backtrack is nearest-first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainedSequenceRule {
    pub backtrack: Vec<u16>,
    pub input: Vec<u16>,
    pub lookahead: Vec<u16>,
    pub lookups: Vec<SequenceLookupRecord>,
}

impl ChainedSequenceRule {
    fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let backtrack_count = reader.read_u16()? as usize;
        let backtrack = reader.read_u16_array(backtrack_count)?;
        let input_count = reader.read_u16()?;
        if input_count == 0 {
            return Err(FontError::malformed("chained rule with no input glyphs"));
        }
        let input = reader.read_u16_array(input_count as usize - 1)?;
        let lookahead_count = reader.read_u16()? as usize;
        let lookahead = reader.read_u16_array(lookahead_count)?;
        let lookup_count = reader.read_u16()?;
        let lookups = read_lookup_records(&mut reader, lookup_count)?;
        Ok(Self { backtrack, input, lookahead, lookups })
    }
}

/// Rule sets indexed by coverage index (format 1) or class (format 2).
/// A null rule set offset yields an empty set.
fn parse_rule_sets<T>(
    data: &[u8],
    reader: &mut FontReader,
    parse_rule: fn(&[u8]) -> Result<T>,
) -> Result<Vec<Vec<T>>> {
    let set_count = reader.read_u16()? as usize;
    let offsets = reader.read_u16_array(set_count)?;
    let mut sets = Vec::with_capacity(set_count);
    for offset in offsets {
        let Some(set_data) = optional_slice_at(data, offset as usize)? else {
            sets.push(Vec::new());
            continue;
        };
        let mut set_reader = FontReader::new(set_data);
        let rule_count = set_reader.read_u16()? as usize;
        let rule_offsets = set_reader.read_u16_array(rule_count)?;
        let rules = rule_offsets
            .into_iter()
            .map(|off| parse_rule(slice_at(set_data, off as usize)?))
            .collect::<Result<Vec<_>>>()?;
        sets.push(rules);
    }
    Ok(sets)
}

fn read_coverages(data: &[u8], reader: &mut FontReader, count: usize) -> Result<Vec<Coverage>> {
    reader
        .read_u16_array(count)?
        .into_iter()
        .map(|offset| Coverage::parse_at(data, offset))
        .collect()
}

/// Contextual positioning (Type 7)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceContext {
    /// Glyph sequences
    Format1 { coverage: Coverage, rule_sets: Vec<Vec<SequenceRule>> },
    /// Class sequences
    Format2 { coverage: Coverage, class_def: ClassDef, rule_sets: Vec<Vec<SequenceRule>> },
    /// One coverage per input position
    Format3 { coverages: Vec<Coverage>, lookups: Vec<SequenceLookupRecord> },
}

impl SequenceContext {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let format = reader.read_u16()?;
        match format {
            1 => {
                let coverage = Coverage::parse_at(data, reader.read_u16()?)?;
                let rule_sets = parse_rule_sets(data, &mut reader, SequenceRule::parse)?;
                Ok(Self::Format1 { coverage, rule_sets })
            }
            2 => {
                let coverage = Coverage::parse_at(data, reader.read_u16()?)?;
                let class_def = ClassDef::parse_at(data, reader.read_u16()?)?;
                let rule_sets = parse_rule_sets(data, &mut reader, SequenceRule::parse)?;
                Ok(Self::Format2 { coverage, class_def, rule_sets })
            }
            3 => {
                let glyph_count = reader.read_u16()? as usize;
                let lookup_count = reader.read_u16()?;
                if glyph_count == 0 {
                    return Err(FontError::malformed("context format 3 with no input"));
                }
                let coverages = read_coverages(data, &mut reader, glyph_count)?;
                let lookups = read_lookup_records(&mut reader, lookup_count)?;
                Ok(Self::Format3 { coverages, lookups })
            }
            other => Err(FontError::Unsupported { table: "SequenceContext", format: other as u32 }),
        }
    }
}

/// Chained contextual positioning (Type 8)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainedSequenceContext {
    Format1 { coverage: Coverage, rule_sets: Vec<Vec<ChainedSequenceRule>> },
    Format2 {
        coverage: Coverage,
        backtrack_class_def: ClassDef,
        input_class_def: ClassDef,
        lookahead_class_def: ClassDef,
        rule_sets: Vec<Vec<ChainedSequenceRule>>,
    },
    Format3 {
        backtrack: Vec<Coverage>,
        input: Vec<Coverage>,
        lookahead: Vec<Coverage>,
        lookups: Vec<SequenceLookupRecord>,
    },
}

impl ChainedSequenceContext {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = FontReader::new(data);
        let format = reader.read_u16()?;
        match format {
            1 => {
                let coverage = Coverage::parse_at(data, reader.read_u16()?)?;
                let rule_sets = parse_rule_sets(data, &mut reader, ChainedSequenceRule::parse)?;
                Ok(Self::Format1 { coverage, rule_sets })
            }
            2 => {
                let coverage = Coverage::parse_at(data, reader.read_u16()?)?;
                let backtrack_class_def = ClassDef::parse_at(data, reader.read_u16()?)?;
                let input_class_def = ClassDef::parse_at(data, reader.read_u16()?)?;
                let lookahead_class_def = ClassDef::parse_at(data, reader.read_u16()?)?;
                let rule_sets = parse_rule_sets(data, &mut reader, ChainedSequenceRule::parse)?;
                Ok(Self::Format2 {
                    coverage,
                    backtrack_class_def,
                    input_class_def,
                    lookahead_class_def,
                    rule_sets,
                })
            }
            3 => {
                let backtrack_count = reader.read_u16()? as usize;
                let backtrack = read_coverages(data, &mut reader, backtrack_count)?;
                let input_count = reader.read_u16()? as usize;
                if input_count == 0 {
                    return Err(FontError::malformed("chained context format 3 with no input"));
                }
                let input = read_coverages(data, &mut reader, input_count)?;
                let lookahead_count = reader.read_u16()? as usize;
                let lookahead = read_coverages(data, &mut reader, lookahead_count)?;
                let lookup_count = reader.read_u16()?;
                let lookups = read_lookup_records(&mut reader, lookup_count)?;
                Ok(Self::Format3 { backtrack, input, lookahead, lookups })
            }
            other => Err(FontError::Unsupported {
                table: "ChainedSequenceContext",
                format: other as u32,
            }),
        }
    }
}
