//! Edge case tests for fos-opentype
//!
//! Truncated and hostile input, unsupported formats and degenerate runs.

use fos_opentype::cff::{CffTable, Dict};
use fos_opentype::cmap::MAX_CODE_POINT;
use fos_opentype::gpos::{GposSubtable, Lookup, LookupType, PairPos, PairValue, SinglePos};
use fos_opentype::{
    CharacterToGlyphTable, Coverage, Font, FontConfig, FontError, GlyphClass, GlyphRun, GposTable,
    LookupFlags, PositionedGlyph, PositioningPass, TableDirectory, Tag, ValueFormat, ValueRecord,
};

/// Route library logs to the test harness (`RUST_LOG=fos_opentype=debug`)
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn words(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn build_font(tables: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
    let header_len = 12 + 16 * tables.len();
    let mut data = Vec::new();
    data.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    data.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    data.extend_from_slice(&[0; 6]);
    let mut body = Vec::new();
    for (tag, table) in tables {
        data.extend_from_slice(*tag);
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&((header_len + body.len()) as u32).to_be_bytes());
        data.extend_from_slice(&(table.len() as u32).to_be_bytes());
        body.extend_from_slice(table);
        while body.len() % 4 != 0 {
            body.push(0);
        }
    }
    data.extend_from_slice(&body);
    data
}

/// Format 4 subtable mapping `start..=end` with `delta`, plus the sentinel
fn format4(start: u16, end: u16, delta: i16) -> Vec<u8> {
    let mut sub = words(&[4, 32, 0, 4, 0, 0, 0]);
    sub.extend(words(&[end, 0xFFFF, 0, start, 0xFFFF, delta as u16, 1, 0, 0]));
    sub
}

/// cmap with the given subtables, each under platform 3 encoding 1
fn cmap(subtables: &[Vec<u8>]) -> Vec<u8> {
    let mut table = words(&[0, subtables.len() as u16]);
    let mut offset = 4 + 8 * subtables.len();
    for sub in subtables {
        table.extend(words(&[3, 1]));
        table.extend_from_slice(&(offset as u32).to_be_bytes());
        offset += sub.len();
    }
    for sub in subtables {
        table.extend_from_slice(sub);
    }
    table
}

/// Format 14 subtable: U+0041 U+FE00 maps to `glyph`
fn format14(glyph: u16) -> Vec<u8> {
    let mut sub = words(&[14, 0, 30, 0, 1]);
    sub.extend_from_slice(&[0x00, 0xFE, 0x00]);
    sub.extend_from_slice(&0u32.to_be_bytes());
    sub.extend_from_slice(&21u32.to_be_bytes());
    sub.extend_from_slice(&1u32.to_be_bytes());
    sub.extend_from_slice(&[0x00, 0x00, 0x41]);
    sub.extend(words(&[glyph]));
    sub
}

fn maxp(num_glyphs: u16) -> Vec<u8> {
    words(&[0, 0x5000, num_glyphs])
}

fn single_lookup(glyph: u16, x_advance: i16) -> Lookup {
    Lookup {
        lookup_type: LookupType::SingleAdjustment,
        flags: LookupFlags(0),
        mark_filtering_set: None,
        subtables: vec![GposSubtable::Single(SinglePos::Format1 {
            coverage: Coverage::Glyphs(vec![glyph]),
            value: ValueRecord { x_advance, ..Default::default() },
        })],
    }
}

fn base_run(glyphs: &[u16]) -> GlyphRun {
    GlyphRun::new(glyphs.iter().map(|&g| PositionedGlyph::new(g, GlyphClass::Base, 500)).collect())
}

// ============================================================================
// TABLE DIRECTORY
// ============================================================================

#[test]
fn test_truncated_directory() {
    // Claims 5 tables but holds one record
    let mut data = vec![0, 1, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0];
    data.extend_from_slice(&[0; 16]);
    let err = TableDirectory::parse(&data, 0).unwrap_err();
    assert!(matches!(err, FontError::Malformed(_)));
}

#[test]
fn test_empty_input() {
    assert!(matches!(TableDirectory::parse(&[], 0), Err(FontError::Malformed(_))));
    assert!(matches!(Font::parse(&[], &FontConfig::default()), Err(FontError::Malformed(_))));
}

#[test]
fn test_missing_required_table() {
    let data = build_font(&[(b"maxp", maxp(1))]);
    let err = Font::parse(&data, &FontConfig::default()).unwrap_err();
    assert_eq!(err, FontError::TableNotFound(Tag::CMAP));
}

#[test]
fn test_table_outside_buffer() {
    let mut data = build_font(&[(b"cmap", cmap(&[format4(0x41, 0x41, -0x40)])), (b"maxp", maxp(2))]);
    // Point the cmap record far past the end
    data[20..24].copy_from_slice(&0x00FF_0000u32.to_be_bytes());
    let directory = TableDirectory::parse(&data, 0).unwrap();
    assert!(directory.find(Tag::CMAP).is_some());
    assert!(matches!(directory.table_data(Tag::CMAP), Err(FontError::Malformed(_))));
    assert!(Font::parse(&data, &FontConfig::default()).is_err());
}

#[test]
fn test_collection_face_index() {
    let mut data = b"ttcf".to_vec();
    data.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 16]);
    data.extend(build_font(&[(b"maxp", maxp(1))]));

    let directory = TableDirectory::parse(&data, 0).unwrap();
    assert_eq!(directory.records().len(), 1);
    assert!(matches!(TableDirectory::parse(&data, 1), Err(FontError::Malformed(_))));
}

// ============================================================================
// CMAP
// ============================================================================

#[test]
fn test_unsupported_cmap_format_skipped() {
    init_tracing();
    let format2 = words(&[2, 6, 0]);
    let table = cmap(&[format2, format4(0x41, 0x41, -0x40)]);
    let cmap = CharacterToGlyphTable::parse(&table, &FontConfig::default()).unwrap();
    assert_eq!(cmap.maps().len(), 1);
    assert_eq!(cmap.glyph_index(0x41), 1);
}

#[test]
fn test_unsorted_groups_rejected() {
    let mut sub = words(&[12, 0, 0, 40, 0, 0, 0, 2]);
    for (start, end, glyph) in [(100u32, 110u32, 1u32), (50, 60, 20)] {
        for v in [start, end, glyph] {
            sub.extend_from_slice(&v.to_be_bytes());
        }
    }
    let result = CharacterToGlyphTable::parse(&cmap(&[sub]), &FontConfig::default());
    assert!(matches!(result, Err(FontError::Malformed(_))));
}

#[test]
fn test_huge_group_enumeration_bounded() {
    // One format 12 group claiming every 32-bit code
    let mut sub = words(&[12, 0, 0, 28, 0, 0, 0, 1]);
    for v in [0u32, 0xFFFF_FFFF, 1] {
        sub.extend_from_slice(&v.to_be_bytes());
    }
    let cmap = CharacterToGlyphTable::parse(&cmap(&[sub]), &FontConfig::default()).unwrap();
    assert_eq!(cmap.glyph_index(0x41), 0x42);

    let forward = cmap.unicode_to_glyph();
    assert_eq!(forward.len() as u32, MAX_CODE_POINT + 1);
    assert_eq!(forward.last_key_value(), Some((&MAX_CODE_POINT, &(MAX_CODE_POINT + 1))));
}

#[test]
fn test_lookup_cache_disabled() {
    let config = FontConfig::default().with_glyph_cache(false);
    let cmap = CharacterToGlyphTable::parse(&cmap(&[format4(10, 20, 5)]), &config).unwrap();
    assert_eq!(cmap.glyph_index(15), 20);
    assert_eq!(cmap.glyph_index(0x10FFFF), 0);
}

#[test]
fn test_variation_selector_glyph() {
    let data = build_font(&[
        (b"cmap", cmap(&[format4(0x41, 0x41, -0x40), format14(9)])),
        (b"maxp", maxp(10)),
    ]);
    let font = Font::parse(&data, &FontConfig::default()).unwrap();
    assert!(font.cmap().is_variation_selector(0xFE00));

    let run = font.glyph_run("A\u{FE00}");
    assert_eq!(run.glyphs.len(), 1);
    assert_eq!(run.glyphs[0].glyph_id, 9);

    // Unknown selector: base glyph plus .notdef for the selector
    let run = font.glyph_run("A\u{FE01}");
    let ids: Vec<u16> = run.glyphs.iter().map(|g| g.glyph_id).collect();
    assert_eq!(ids, vec![1, 0]);
}

// ============================================================================
// COVERAGE AND CFF
// ============================================================================

#[test]
fn test_unsorted_coverage_rejected() {
    assert!(matches!(Coverage::parse(&words(&[1, 2, 5, 3])), Err(FontError::Malformed(_))));
    assert!(Coverage::parse(&words(&[3, 0])).is_err());
}

#[test]
fn test_dict_reserved_and_dangling() {
    assert!(matches!(Dict::parse(&[139, 255]), Err(FontError::Malformed(_))));
    assert!(matches!(Dict::parse(&[139]), Err(FontError::Malformed(_))));
    assert!(Dict::parse(&[]).unwrap().entries().is_empty());
}

#[test]
fn test_cff2_unsupported() {
    let err = CffTable::parse(&[2, 0, 5, 0, 0]).unwrap_err();
    assert!(matches!(err, FontError::Unsupported { format: 2, .. }));
}

// ============================================================================
// GPOS
// ============================================================================

#[test]
fn test_unknown_lookup_type() {
    let mut data = words(&[1, 0, 0, 0, 10]);
    data.extend(words(&[1, 4, 10, 0, 0]));
    let err = GposTable::parse(&data).unwrap_err();
    assert!(matches!(err, FontError::Unsupported { format: 10, .. }));
}

#[test]
fn test_unsupported_gpos_version_ignored() {
    init_tracing();
    let data = build_font(&[
        (b"GPOS", words(&[2, 0, 0, 0, 0])),
        (b"cmap", cmap(&[format4(0x41, 0x41, -0x40)])),
        (b"maxp", maxp(2)),
    ]);
    let font = Font::parse(&data, &FontConfig::default()).unwrap();
    assert!(font.gpos().is_none());
    assert!(font.positioning_pass().is_none());
    let run = font.shape("AA", Tag::LATN, None);
    assert_eq!(run.glyphs.len(), 2);
}

#[test]
fn test_empty_and_out_of_range_runs() {
    let gpos = GposTable { lookups: vec![single_lookup(1, 10)], ..Default::default() };
    let mut pass = PositioningPass::new(&gpos, None, &FontConfig::default());

    let mut empty = GlyphRun::default();
    assert!(pass.apply_lookup(0, &mut empty, 0, 4));

    pass.reset();
    let mut run = base_run(&[1]);
    assert!(pass.apply_lookup(0, &mut run, 5, usize::MAX));
    assert_eq!(run.glyphs[0].advance.x, 500);
}

#[test]
fn test_pair_second_glyph_outside_range() {
    let pair = PairPos::Format1 {
        coverage: Coverage::Glyphs(vec![1]),
        value_format1: ValueFormat(ValueFormat::X_ADVANCE),
        value_format2: ValueFormat(0),
        pair_sets: vec![vec![PairValue {
            second_glyph: 2,
            value1: ValueRecord { x_advance: -50, ..Default::default() },
            value2: ValueRecord::default(),
        }]],
    };
    let lookup = Lookup {
        lookup_type: LookupType::PairAdjustment,
        flags: LookupFlags(0),
        mark_filtering_set: None,
        subtables: vec![GposSubtable::Pair(pair)],
    };
    let gpos = GposTable { lookups: vec![lookup], ..Default::default() };

    let mut run = base_run(&[1, 2]);
    PositioningPass::new(&gpos, None, &FontConfig::default()).apply_lookup(0, &mut run, 0, 1);
    assert_eq!(run.glyphs[0].advance.x, 500);

    PositioningPass::new(&gpos, None, &FontConfig::default()).apply_lookup(0, &mut run, 0, 2);
    assert_eq!(run.glyphs[0].advance.x, 450);
}

#[test]
fn test_features_without_script() {
    let gpos = GposTable { lookups: vec![single_lookup(1, 10)], ..Default::default() };
    let mut run = base_run(&[1]);
    let mut pass = PositioningPass::new(&gpos, None, &FontConfig::default());
    assert_eq!(pass.apply_features(&[Tag::KERN], Tag::LATN, None, &mut run, 0, 1), 0);
    assert!(pass.applied_lookups().is_empty());
}
