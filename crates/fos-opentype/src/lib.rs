//! fOS OpenType - Font decoding and glyph positioning
//!
//! This crate turns raw font bytes into the data the fOS text stack needs
//! to position glyphs:
//! - Table directory (sfnt and TrueType Collections)
//! - Character to glyph mapping (cmap formats 0, 4, 6, 8, 10, 12, 13, 14)
//! - CFF Top/Private/Font DICT decoding, charsets and FDSelect
//! - GDEF glyph classes and mark sets
//! - GPOS lookups of all nine types, applied to a caller-owned glyph run
//! - Legacy `kern` pairs, glyph names from `post` and font names from `name`
//!
//! Rasterization, hinting, GSUB and variable-font interpolation live
//! elsewhere.

pub mod reader;
pub mod tag;
pub mod config;
pub mod directory;
pub mod cmap;
pub mod cff;
pub mod layout;
pub mod gdef;
pub mod gpos;
pub mod metrics;
pub mod kern;
pub mod name;
pub mod post;
pub mod run;
pub mod font;

pub use tag::Tag;
pub use config::FontConfig;
pub use directory::{TableDirectory, TableRecord};
pub use cmap::{CharacterMap, CharacterToGlyphTable, VariationGlyph};
pub use cff::{CffFont, CffTable};
pub use layout::{Anchor, ClassDef, Coverage, LookupFlags, ValueFormat, ValueRecord};
pub use gdef::{GdefTable, GlyphClass};
pub use gpos::{GposTable, PositioningPass};
pub use metrics::HorizontalMetrics;
pub use kern::{KernPair, KernSubtable, KernTable};
pub use name::{NameRecord, NameTable};
pub use post::PostTable;
pub use run::{GlyphPlacement, GlyphPositioning, GlyphRun, PositionedGlyph, Vector};
pub use font::Font;

/// Font decoding error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FontError {
    #[error("Malformed font data: {0}")]
    Malformed(String),

    #[error("Unsupported {table} format {format}")]
    Unsupported { table: &'static str, format: u32 },

    #[error("Required table not found: {0}")]
    TableNotFound(Tag),
}

impl FontError {
    /// Shorthand for a malformed-data error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, FontError>;
