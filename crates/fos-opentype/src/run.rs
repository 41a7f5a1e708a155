//! Positioned glyph run
//!
//! The run is owned by the shaping caller; GPOS lookups only mutate it
//! through [`GlyphPositioning`].

use crate::gdef::GlyphClass;

/// 2D adjustment in font design units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Vector {
    pub x: i32,
    pub y: i32,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Vector {
    fn add_assign(&mut self, rhs: Vector) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vector {
    type Output = Vector;

    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// What the GPOS engine needs from a glyph run
pub trait GlyphPositioning {
    /// Number of glyphs
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Glyph ID at `index`
    fn glyph_id(&self, index: usize) -> u16;

    /// GDEF class of the glyph at `index`
    fn glyph_class(&self, index: usize) -> GlyphClass;

    /// Ligature component a mark at `index` attaches to, if known
    fn ligature_component(&self, _index: usize) -> Option<u16> {
        None
    }

    fn offset(&self, index: usize) -> Vector;

    fn advance(&self, index: usize) -> Vector;

    fn set_offset(&mut self, index: usize, offset: Vector);

    fn set_advance(&mut self, index: usize, advance: Vector);

    fn append_offset(&mut self, index: usize, delta: Vector) {
        let offset = self.offset(index) + delta;
        self.set_offset(index, offset);
    }

    fn append_advance(&mut self, index: usize, delta: Vector) {
        let advance = self.advance(index) + delta;
        self.set_advance(index, advance);
    }

    /// Pen position before `index`: the sum of preceding advances
    fn pen_position(&self, index: usize) -> Vector {
        (0..index.min(self.len())).fold(Vector::ZERO, |acc, i| acc + self.advance(i))
    }
}

/// A glyph in a run with its accumulated adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionedGlyph {
    /// Glyph ID in the font
    pub glyph_id: u16,
    /// GDEF class
    pub class: GlyphClass,
    /// Placement offset from the pen position (font units)
    pub offset: Vector,
    /// Advance (font units)
    pub advance: Vector,
    /// Ligature component for marks following a ligature
    pub ligature_component: Option<u16>,
    /// Cluster index (byte offset of the source character)
    pub cluster: u32,
}

impl PositionedGlyph {
    pub fn new(glyph_id: u16, class: GlyphClass, advance: i32) -> Self {
        Self {
            glyph_id,
            class,
            advance: Vector::new(advance, 0),
            ..Default::default()
        }
    }
}

/// A run of glyphs being positioned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphRun {
    pub glyphs: Vec<PositionedGlyph>,
}

impl GlyphRun {
    pub fn new(glyphs: Vec<PositionedGlyph>) -> Self {
        Self { glyphs }
    }

    /// Total advance
    pub fn width(&self) -> i32 {
        self.glyphs.iter().map(|g| g.advance.x).sum()
    }

    /// Iterate over glyphs with absolute positions in font units
    pub fn placements(&self) -> impl Iterator<Item = GlyphPlacement> + '_ {
        let mut pen = Vector::ZERO;
        self.glyphs.iter().map(move |g| {
            let placement = GlyphPlacement {
                glyph_id: g.glyph_id,
                position: pen + g.offset,
                cluster: g.cluster,
            };
            pen += g.advance;
            placement
        })
    }

    /// Iterate over glyphs with pixel positions at `font_size`
    pub fn scaled_placements(
        &self,
        font_size: f32,
        units_per_em: u16,
    ) -> impl Iterator<Item = (u16, f32, f32)> + '_ {
        let scale = font_size / units_per_em.max(1) as f32;
        self.placements()
            .map(move |p| (p.glyph_id, p.position.x as f32 * scale, p.position.y as f32 * scale))
    }
}

impl GlyphPositioning for GlyphRun {
    fn len(&self) -> usize {
        self.glyphs.len()
    }

    fn glyph_id(&self, index: usize) -> u16 {
        self.glyphs.get(index).map_or(0, |g| g.glyph_id)
    }

    fn glyph_class(&self, index: usize) -> GlyphClass {
        self.glyphs.get(index).map_or(GlyphClass::Unclassified, |g| g.class)
    }

    fn ligature_component(&self, index: usize) -> Option<u16> {
        self.glyphs.get(index).and_then(|g| g.ligature_component)
    }

    fn offset(&self, index: usize) -> Vector {
        self.glyphs.get(index).map_or(Vector::ZERO, |g| g.offset)
    }

    fn advance(&self, index: usize) -> Vector {
        self.glyphs.get(index).map_or(Vector::ZERO, |g| g.advance)
    }

    fn set_offset(&mut self, index: usize, offset: Vector) {
        if let Some(g) = self.glyphs.get_mut(index) {
            g.offset = offset;
        }
    }

    fn set_advance(&mut self, index: usize, advance: Vector) {
        if let Some(g) = self.glyphs.get_mut(index) {
            g.advance = advance;
        }
    }
}

/// A glyph at its absolute position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphPlacement {
    pub glyph_id: u16,
    pub position: Vector,
    pub cluster: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pen_and_placements() {
        let mut run = GlyphRun::new(vec![
            PositionedGlyph::new(1, GlyphClass::Base, 500),
            PositionedGlyph::new(2, GlyphClass::Mark, 0),
            PositionedGlyph::new(3, GlyphClass::Base, 400),
        ]);
        run.append_offset(1, Vector::new(-250, 300));
        assert_eq!(run.pen_position(2), Vector::new(500, 0));
        let placements: Vec<_> = run.placements().map(|p| p.position).collect();
        assert_eq!(placements, vec![Vector::new(0, 0), Vector::new(250, 300), Vector::new(500, 0)]);
        assert_eq!(run.width(), 900);
    }

    #[test]
    fn test_out_of_range_access_is_inert() {
        let mut run = GlyphRun::default();
        run.set_advance(3, Vector::new(1, 1));
        assert_eq!(run.advance(3), Vector::ZERO);
        assert!(GlyphPositioning::is_empty(&run));
    }
}
