//! Font loading and positioning configuration

use crate::tag::Tag;

/// Configuration for font decoding and GPOS application
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FontConfig {
    /// Face to load from a TrueType Collection
    pub face_index: u32,
    /// Memoize code point lookups in the cmap
    pub cache_glyph_lookups: bool,
    /// Depth limit for nested contextual lookups
    pub max_nesting_depth: usize,
    /// Features applied when the caller does not name any
    pub default_features: Vec<Tag>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            face_index: 0,
            cache_glyph_lookups: true,
            max_nesting_depth: 64,
            default_features: vec![Tag::KERN, Tag::MARK, Tag::MKMK, Tag::CURS, Tag::DIST],
        }
    }
}

impl FontConfig {
    /// Create new default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a face in a collection
    pub fn with_face_index(mut self, index: u32) -> Self {
        self.face_index = index;
        self
    }

    /// Enable or disable the cmap lookup cache
    pub fn with_glyph_cache(mut self, enabled: bool) -> Self {
        self.cache_glyph_lookups = enabled;
        self
    }

    /// Set the nesting depth limit for contextual lookups
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Replace the default feature list
    pub fn with_features(mut self, features: Vec<Tag>) -> Self {
        self.default_features = features;
        self
    }
}
