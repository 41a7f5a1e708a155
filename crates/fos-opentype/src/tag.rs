//! Four-byte OpenType tags

use std::fmt;

/// OpenType tag (table, script, language or feature)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const CMAP: Tag = Tag(*b"cmap");
    pub const CFF: Tag = Tag(*b"CFF ");
    pub const GDEF: Tag = Tag(*b"GDEF");
    pub const GPOS: Tag = Tag(*b"GPOS");
    pub const HEAD: Tag = Tag(*b"head");
    pub const HHEA: Tag = Tag(*b"hhea");
    pub const HMTX: Tag = Tag(*b"hmtx");
    pub const MAXP: Tag = Tag(*b"maxp");
    pub const NAME: Tag = Tag(*b"name");
    pub const POST: Tag = Tag(*b"post");

    // Scripts
    pub const DFLT: Tag = Tag(*b"DFLT");
    pub const LATN: Tag = Tag(*b"latn");

    // Positioning features (`kern` also names the legacy kerning table)
    pub const KERN: Tag = Tag(*b"kern");
    pub const MARK: Tag = Tag(*b"mark");
    pub const MKMK: Tag = Tag(*b"mkmk");
    pub const CURS: Tag = Tag(*b"curs");
    pub const DIST: Tag = Tag(*b"dist");

    /// Create a tag from four bytes
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    /// Create a tag from a string, padding with spaces
    pub fn from_str_padded(s: &str) -> Self {
        let mut tag = [b' '; 4];
        for (dst, src) in tag.iter_mut().zip(s.bytes()) {
            *dst = src;
        }
        Self(tag)
    }

    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Tag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Tag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() || s.len() > 4 || !s.is_ascii() {
            return Err(serde::de::Error::custom(format!("invalid tag {:?}", s)));
        }
        Ok(Tag::from_str_padded(&s))
    }
}
