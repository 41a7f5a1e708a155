//! Font facade
//!
//! Ties the decoded tables of one face together and turns text into a
//! positioned glyph run.

use crate::cff::CffTable;
use crate::cmap::CharacterToGlyphTable;
use crate::config::FontConfig;
use crate::directory::TableDirectory;
use crate::gdef::{GdefTable, GlyphClass};
use crate::gpos::{GposTable, PositioningPass};
use crate::kern::KernTable;
use crate::metrics::HorizontalMetrics;
use crate::name::NameTable;
use crate::post::PostTable;
use crate::reader::FontReader;
use crate::run::{GlyphRun, PositionedGlyph};
use crate::tag::Tag;
use crate::{FontError, Result};

const DEFAULT_UNITS_PER_EM: u16 = 1000;

/// A decoded font face
#[derive(Debug)]
pub struct Font<'a> {
    directory: TableDirectory<'a>,
    config: FontConfig,
    units_per_em: u16,
    num_glyphs: u16,
    cmap: CharacterToGlyphTable,
    cff: Option<CffTable>,
    gdef: Option<GdefTable>,
    gpos: Option<GposTable>,
    metrics: Option<HorizontalMetrics>,
    kern: Option<KernTable>,
    name: Option<NameTable>,
    post: Option<PostTable>,
}

impl<'a> Font<'a> {
    /// Decode a face from raw font bytes
    pub fn parse(data: &'a [u8], config: &FontConfig) -> Result<Self> {
        let directory = TableDirectory::parse(data, config.face_index)?;

        let mut maxp = FontReader::new(directory.required_table(Tag::MAXP)?);
        let _version = maxp.read_u32()?;
        let num_glyphs = maxp.read_u16()?;

        let units_per_em = match directory.table_data(Tag::HEAD)? {
            Some(head) => FontReader::at(head, 18)?.read_u16()?,
            None => DEFAULT_UNITS_PER_EM,
        };

        let cmap = CharacterToGlyphTable::parse(directory.required_table(Tag::CMAP)?, config)?;

        let mut cff = optional_table(&directory, Tag::CFF, CffTable::parse)?;
        if let Some(font) = cff.as_mut().and_then(CffTable::font_mut) {
            font.assign_unicodes(&cmap);
        }
        let gdef = optional_table(&directory, Tag::GDEF, GdefTable::parse)?;
        let gpos = optional_table(&directory, Tag::GPOS, GposTable::parse)?;

        let metrics = match (directory.table_data(Tag::HHEA)?, directory.table_data(Tag::HMTX)?) {
            (Some(hhea), Some(hmtx)) => Some(HorizontalMetrics::parse(hhea, hmtx, num_glyphs)?),
            _ => None,
        };
        let kern = optional_table(&directory, Tag::KERN, KernTable::parse)?;
        let name = optional_table(&directory, Tag::NAME, NameTable::parse)?;
        let post = optional_table(&directory, Tag::POST, PostTable::parse)?;

        tracing::debug!(
            "Loaded font: {} glyphs, {} upem, cff={}, gdef={}, gpos={}, kern={}",
            num_glyphs,
            units_per_em,
            cff.is_some(),
            gdef.is_some(),
            gpos.is_some(),
            kern.is_some()
        );

        Ok(Self {
            directory,
            config: config.clone(),
            units_per_em,
            num_glyphs,
            cmap,
            cff,
            gdef,
            gpos,
            metrics,
            kern,
            name,
            post,
        })
    }

    pub fn directory(&self) -> &TableDirectory<'a> {
        &self.directory
    }

    pub fn config(&self) -> &FontConfig {
        &self.config
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Glyph count from `maxp`
    pub fn num_glyphs(&self) -> u16 {
        self.num_glyphs
    }

    pub fn cmap(&self) -> &CharacterToGlyphTable {
        &self.cmap
    }

    pub fn cff(&self) -> Option<&CffTable> {
        self.cff.as_ref()
    }

    pub fn gdef(&self) -> Option<&GdefTable> {
        self.gdef.as_ref()
    }

    pub fn gpos(&self) -> Option<&GposTable> {
        self.gpos.as_ref()
    }

    pub fn metrics(&self) -> Option<&HorizontalMetrics> {
        self.metrics.as_ref()
    }

    /// Legacy `kern` table
    pub fn kern(&self) -> Option<&KernTable> {
        self.kern.as_ref()
    }

    pub fn name(&self) -> Option<&NameTable> {
        self.name.as_ref()
    }

    pub fn post(&self) -> Option<&PostTable> {
        self.post.as_ref()
    }

    /// Glyph name from `post`, else from the CFF charset
    pub fn glyph_name(&self, glyph: u16) -> Option<&str> {
        if let Some(name) = self.post.as_ref().and_then(|p| p.glyph_name(glyph)) {
            return Some(name);
        }
        self.cff.as_ref()?.font()?.glyphs().get(glyph as usize)?.name.as_deref()
    }

    /// Glyph for a character, 0 when unmapped
    pub fn glyph_index(&self, c: char) -> u16 {
        glyph_id(self.cmap.glyph_index(c as u32))
    }

    pub fn glyph_class(&self, glyph: u16) -> GlyphClass {
        self.gdef.as_ref().map_or(GlyphClass::Unclassified, |g| g.glyph_class(glyph))
    }

    pub fn advance_width(&self, glyph: u16) -> u16 {
        self.metrics.as_ref().map_or(0, |m| m.advance_width(glyph))
    }

    /// Map text to an unpositioned run.
    ///
    /// A variation selector following a character picks the variant glyph
    /// and produces no glyph of its own. Clusters are byte offsets.
    pub fn glyph_run(&self, text: &str) -> GlyphRun {
        let mut glyphs = Vec::with_capacity(text.len());
        let mut chars = text.char_indices().peekable();
        while let Some((cluster, c)) = chars.next() {
            let cp = c as u32;
            let glyph = match chars.peek() {
                Some(&(_, next)) if self.cmap.is_variation_selector(next as u32) => {
                    chars.next();
                    self.cmap.glyph_index_with_variation(cp, next as u32)
                }
                _ => self.cmap.glyph_index(cp),
            };
            let glyph = glyph_id(glyph);
            let mut positioned =
                PositionedGlyph::new(glyph, self.glyph_class(glyph), self.advance_width(glyph) as i32);
            positioned.cluster = cluster as u32;
            glyphs.push(positioned);
        }
        tracing::trace!("Mapped {} chars to {} glyphs", text.chars().count(), glyphs.len());
        GlyphRun::new(glyphs)
    }

    /// Start a positioning pass, if the font has a GPOS table
    pub fn positioning_pass(&self) -> Option<PositioningPass<'_>> {
        let gpos = self.gpos.as_ref()?;
        Some(PositioningPass::new(gpos, self.gdef.as_ref(), &self.config))
    }

    /// Map and position `text` with the configured default features.
    ///
    /// When `kern` is among them but GPOS has no kerning lookups for the
    /// script, pairs from the legacy `kern` table are applied instead.
    pub fn shape(&self, text: &str, script: Tag, language: Option<Tag>) -> GlyphRun {
        let mut run = self.glyph_run(text);
        let len = run.glyphs.len();
        if let Some(mut pass) = self.positioning_pass() {
            pass.apply_features(&[], script, language, &mut run, 0, len);
        }
        if let Some(kern) = self.legacy_kerning(script, language) {
            let kerned = kern.apply(&mut run, 0, len);
            tracing::trace!("Legacy kern adjusted {} pairs", kerned);
        }
        run
    }

    /// The `kern` table, if it should stand in for GPOS kerning
    fn legacy_kerning(&self, script: Tag, language: Option<Tag>) -> Option<&KernTable> {
        if !self.config.default_features.contains(&Tag::KERN) {
            return None;
        }
        let gpos_kerns = self
            .gpos
            .as_ref()
            .is_some_and(|gpos| !gpos.lookups_for_features(&[Tag::KERN], script, language).is_empty());
        if gpos_kerns {
            return None;
        }
        self.kern.as_ref()
    }
}

/// Glyph IDs above 65535 cannot be addressed by GPOS; treat them as `.notdef`
fn glyph_id(glyph: u32) -> u16 {
    u16::try_from(glyph).unwrap_or(0)
}

/// Decode a table if present. An unsupported version is logged and the
/// table is treated as absent; malformed data is still an error.
fn optional_table<T>(
    directory: &TableDirectory<'_>,
    tag: Tag,
    parse: impl FnOnce(&[u8]) -> Result<T>,
) -> Result<Option<T>> {
    let Some(data) = directory.table_data(tag)? else {
        return Ok(None);
    };
    match parse(data) {
        Ok(table) => Ok(Some(table)),
        Err(FontError::Unsupported { table, format }) => {
            tracing::warn!("Ignoring '{}' table: unsupported {} format {}", tag, table, format);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
