//! GPOS lookup application
//!
//! Lookups mutate a caller-owned run through [`GlyphPositioning`]. Nothing
//! here fails: a coverage miss, a missing anchor or a rejected recursion
//! simply leaves the glyphs as they were.

use crate::config::FontConfig;
use crate::gdef::{GdefTable, GlyphClass};
use crate::layout::{Anchor, ClassDef, Coverage, LookupFlags, ValueRecord};
use crate::run::{GlyphPositioning, Vector};
use crate::tag::Tag;

use super::context::{ChainedSequenceContext, SequenceContext, SequenceLookupRecord};
use super::subtable::{CursivePos, GposSubtable, MarkBasePos, MarkLigPos, MarkMarkPos, PairPos};
use super::{GposTable, Lookup};

/// Which glyphs a lookup ignores, per its flags and GDEF
#[derive(Debug, Clone, Copy)]
pub struct GlyphFilter<'a> {
    pub flags: LookupFlags,
    pub mark_filtering_set: Option<u16>,
    pub gdef: Option<&'a GdefTable>,
}

impl<'a> GlyphFilter<'a> {
    pub fn new(lookup: &Lookup, gdef: Option<&'a GdefTable>) -> Self {
        Self { flags: lookup.flags, mark_filtering_set: lookup.mark_filtering_set, gdef }
    }

    /// Whether the glyph at `index` is invisible to the lookup
    pub fn should_skip<R: GlyphPositioning + ?Sized>(&self, run: &R, index: usize) -> bool {
        match run.glyph_class(index) {
            GlyphClass::Base => self.flags.ignore_base_glyphs(),
            GlyphClass::Ligature => self.flags.ignore_ligatures(),
            GlyphClass::Mark => self.skip_mark(run.glyph_id(index)),
            GlyphClass::Unclassified | GlyphClass::Component => false,
        }
    }

    fn skip_mark(&self, glyph: u16) -> bool {
        if self.flags.ignore_marks() {
            return true;
        }
        let Some(gdef) = self.gdef else {
            return false;
        };
        if let Some(set) = self.mark_filtering_set {
            return !gdef.is_in_mark_set(set, glyph);
        }
        let attach_type = self.flags.mark_attachment_type();
        attach_type != 0 && gdef.mark_attach_class(glyph) != attach_type
    }

    /// First non-skipped index in `from..end`
    fn next<R: GlyphPositioning + ?Sized>(&self, run: &R, from: usize, end: usize) -> Option<usize> {
        (from..end.min(run.len())).find(|&i| !self.should_skip(run, i))
    }

    /// Nearest non-skipped index before `from`
    fn prev<R: GlyphPositioning + ?Sized>(&self, run: &R, from: usize) -> Option<usize> {
        (0..from.min(run.len())).rev().find(|&i| !self.should_skip(run, i))
    }
}

/// Nearest glyph before `from` with GDEF class `class`.
///
/// Glyphs the filter skips are passed over. A search for a mark stops at
/// the first visible non-mark glyph, so marks only attach to marks in the
/// same cluster.
pub fn find_preceding_by_class<R: GlyphPositioning + ?Sized>(
    run: &R,
    from: usize,
    class: GlyphClass,
    filter: &GlyphFilter,
) -> Option<usize> {
    for i in (0..from.min(run.len())).rev() {
        if filter.should_skip(run, i) {
            continue;
        }
        let found = run.glyph_class(i);
        if found == class {
            return Some(i);
        }
        if class == GlyphClass::Mark && found != GlyphClass::Mark {
            return None;
        }
    }
    None
}

fn apply_value<R: GlyphPositioning + ?Sized>(run: &mut R, index: usize, value: &ValueRecord) {
    if value.is_empty() {
        return;
    }
    run.append_offset(index, Vector::new(value.x_placement as i32, value.y_placement as i32));
    run.append_advance(index, Vector::new(value.x_advance as i32, value.y_advance as i32));
}

/// Set the mark offset so its anchor lands on the target's anchor
fn attach_mark<R: GlyphPositioning + ?Sized>(
    run: &mut R,
    mark: usize,
    target: usize,
    target_anchor: &Anchor,
    mark_anchor: &Anchor,
) {
    let target_point = run.offset(target)
        + run.pen_position(target)
        + Vector::new(target_anchor.x as i32, target_anchor.y as i32);
    let offset = target_point
        - run.pen_position(mark)
        - Vector::new(mark_anchor.x as i32, mark_anchor.y as i32);
    tracing::trace!("Attaching glyph {} to {} at offset {:?}", mark, target, offset);
    run.set_offset(mark, offset);
}

/// One input, backtrack or lookahead sequence of a context rule
enum SequenceMatcher<'s> {
    Glyphs(&'s [u16]),
    Classes(&'s ClassDef, &'s [u16]),
    Coverages(&'s [Coverage]),
}

impl SequenceMatcher<'_> {
    fn len(&self) -> usize {
        match self {
            Self::Glyphs(glyphs) => glyphs.len(),
            Self::Classes(_, classes) => classes.len(),
            Self::Coverages(coverages) => coverages.len(),
        }
    }

    fn matches(&self, k: usize, glyph: u16) -> bool {
        match self {
            Self::Glyphs(glyphs) => glyphs[k] == glyph,
            Self::Classes(class_def, classes) => class_def.class_of(glyph) == classes[k],
            Self::Coverages(coverages) => coverages[k].contains(glyph),
        }
    }
}

/// Positions of the full input match starting at `start`, within `..end`
fn match_input<R: GlyphPositioning + ?Sized>(
    run: &R,
    filter: &GlyphFilter,
    start: usize,
    end: usize,
    input: &SequenceMatcher,
) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(input.len() + 1);
    positions.push(start);
    let mut pos = start;
    for k in 0..input.len() {
        pos = filter.next(run, pos + 1, end)?;
        if !input.matches(k, run.glyph_id(pos)) {
            return None;
        }
        positions.push(pos);
    }
    Some(positions)
}

/// Backtrack is matched nearest-first, down to the start of the run
fn match_backtrack<R: GlyphPositioning + ?Sized>(
    run: &R,
    filter: &GlyphFilter,
    start: usize,
    backtrack: &SequenceMatcher,
) -> bool {
    let mut pos = start;
    for k in 0..backtrack.len() {
        match filter.prev(run, pos) {
            Some(p) if backtrack.matches(k, run.glyph_id(p)) => pos = p,
            _ => return false,
        }
    }
    true
}

/// Lookahead may extend past the lookup range, up to the end of the run
fn match_lookahead<R: GlyphPositioning + ?Sized>(
    run: &R,
    filter: &GlyphFilter,
    last_input: usize,
    lookahead: &SequenceMatcher,
) -> bool {
    let mut pos = last_input;
    for k in 0..lookahead.len() {
        match filter.next(run, pos + 1, run.len()) {
            Some(p) if lookahead.matches(k, run.glyph_id(p)) => pos = p,
            _ => return false,
        }
    }
    true
}

fn match_chained<R: GlyphPositioning + ?Sized>(
    run: &R,
    filter: &GlyphFilter,
    start: usize,
    end: usize,
    backtrack: &SequenceMatcher,
    input: &SequenceMatcher,
    lookahead: &SequenceMatcher,
) -> Option<Vec<usize>> {
    let positions = match_input(run, filter, start, end, input)?;
    let last = *positions.last()?;
    (match_backtrack(run, filter, start, backtrack) && match_lookahead(run, filter, last, lookahead))
        .then_some(positions)
}

/// Applies lookups with a bounded, cycle-free nesting stack
struct LookupApplier<'a> {
    gpos: &'a GposTable,
    gdef: Option<&'a GdefTable>,
    max_depth: usize,
    active: Vec<u16>,
}

impl<'a> LookupApplier<'a> {
    fn new(gpos: &'a GposTable, gdef: Option<&'a GdefTable>, max_depth: usize) -> Self {
        Self { gpos, gdef, max_depth, active: Vec::new() }
    }

    /// Walk `start..end`, applying the lookup at each visible glyph
    fn apply_range<R: GlyphPositioning + ?Sized>(&mut self, lookup_index: u16, run: &mut R, start: usize, end: usize) {
        let gpos = self.gpos;
        let Some(lookup) = gpos.lookup(lookup_index) else {
            return;
        };
        let filter = GlyphFilter::new(lookup, self.gdef);
        let mut i = start;
        while i < end {
            if filter.should_skip(run, i) {
                i += 1;
                continue;
            }
            i = match self.apply_at(lookup_index, run, i, end) {
                Some(next) => next.max(i + 1),
                None => i + 1,
            };
        }
    }

    /// Apply the first matching subtable at `index`; returns the next index
    fn apply_at<R: GlyphPositioning + ?Sized>(
        &mut self,
        lookup_index: u16,
        run: &mut R,
        index: usize,
        end: usize,
    ) -> Option<usize> {
        // The top-level lookup is not counted as nesting
        if self.active.len() > self.max_depth {
            tracing::warn!("GPOS nesting depth {} exceeded at lookup {}", self.max_depth, lookup_index);
            return None;
        }
        if self.active.contains(&lookup_index) {
            tracing::warn!("GPOS lookup cycle through lookup {} skipped", lookup_index);
            return None;
        }
        let gpos = self.gpos;
        let lookup = gpos.lookup(lookup_index)?;
        let filter = GlyphFilter::new(lookup, self.gdef);

        self.active.push(lookup_index);
        let mut result = None;
        for subtable in &lookup.subtables {
            result = self.apply_subtable(subtable, &filter, run, index, end);
            if result.is_some() {
                break;
            }
        }
        self.active.pop();
        result
    }

    fn apply_subtable<R: GlyphPositioning + ?Sized>(
        &mut self,
        subtable: &GposSubtable,
        filter: &GlyphFilter,
        run: &mut R,
        i: usize,
        end: usize,
    ) -> Option<usize> {
        match subtable {
            GposSubtable::Single(single) => {
                let value = single.value_for(run.glyph_id(i))?;
                apply_value(run, i, &value);
                Some(i + 1)
            }
            GposSubtable::Pair(pair) => apply_pair(pair, filter, run, i, end),
            GposSubtable::Cursive(cursive) => apply_cursive(cursive, filter, run, i, end),
            GposSubtable::MarkToBase(pos) => apply_mark_to_base(pos, filter, run, i),
            GposSubtable::MarkToLigature(pos) => apply_mark_to_ligature(pos, filter, run, i),
            GposSubtable::MarkToMark(pos) => apply_mark_to_mark(pos, filter, run, i),
            GposSubtable::Context(context) => {
                let (positions, lookups) = match_context(context, filter, run, i, end)?;
                Some(self.apply_nested(lookups, &positions, run))
            }
            GposSubtable::ChainedContext(context) => {
                let (positions, lookups) = match_chained_context(context, filter, run, i, end)?;
                Some(self.apply_nested(lookups, &positions, run))
            }
        }
    }

    /// Run nested lookups at matched positions; returns the index after the match
    fn apply_nested<R: GlyphPositioning + ?Sized>(
        &mut self,
        records: &[SequenceLookupRecord],
        positions: &[usize],
        run: &mut R,
    ) -> usize {
        let match_end = positions.last().map_or(0, |&last| last + 1);
        for record in records {
            let Some(&pos) = positions.get(record.sequence_index as usize) else {
                continue;
            };
            self.apply_at(record.lookup_index, run, pos, match_end);
        }
        match_end
    }
}

fn apply_pair<R: GlyphPositioning + ?Sized>(
    pair: &PairPos,
    filter: &GlyphFilter,
    run: &mut R,
    i: usize,
    end: usize,
) -> Option<usize> {
    let first = run.glyph_id(i);
    pair.coverage().find_position(first)?;
    let j = filter.next(run, i + 1, end)?;
    let (value1, value2) = pair.lookup(first, run.glyph_id(j))?;
    apply_value(run, i, &value1);
    apply_value(run, j, &value2);
    // A second glyph with its own adjustment is consumed by the pair
    Some(if pair.value_format2().is_empty() { j } else { j + 1 })
}

fn apply_cursive<R: GlyphPositioning + ?Sized>(
    cursive: &CursivePos,
    filter: &GlyphFilter,
    run: &mut R,
    i: usize,
    end: usize,
) -> Option<usize> {
    let exit = cursive.entry_exit(run.glyph_id(i))?.exit?;
    let j = filter.next(run, i + 1, end)?;
    let entry = cursive.entry_exit(run.glyph_id(j))?.entry?;

    let mut advance_i = run.advance(i);
    advance_i.x = exit.x as i32 + run.offset(i).x;
    run.set_advance(i, advance_i);

    let d = entry.x as i32 + run.offset(j).x;
    run.append_advance(j, Vector::new(-d, 0));
    run.append_offset(j, Vector::new(-d, 0));

    let dy = exit.y as i32 - entry.y as i32;
    if filter.flags.right_to_left() {
        let mut offset = run.offset(i);
        offset.y = run.offset(j).y - dy;
        run.set_offset(i, offset);
    } else {
        let mut offset = run.offset(j);
        offset.y = run.offset(i).y + dy;
        run.set_offset(j, offset);
    }
    Some(i + 1)
}

fn find_attachment_target<R: GlyphPositioning + ?Sized>(
    run: &R,
    i: usize,
    class: GlyphClass,
    filter: &GlyphFilter,
) -> Option<usize> {
    find_preceding_by_class(run, i, class, filter)
        .or_else(|| find_preceding_by_class(run, i, GlyphClass::Unclassified, filter))
}

fn apply_mark_to_base<R: GlyphPositioning + ?Sized>(
    pos: &MarkBasePos,
    filter: &GlyphFilter,
    run: &mut R,
    i: usize,
) -> Option<usize> {
    let mark_index = pos.mark_coverage.find_position(run.glyph_id(i))?;
    let mark = pos.marks.get(mark_index as usize)?;
    let base = find_attachment_target(run, i, GlyphClass::Base, filter)?;
    let base_index = pos.base_coverage.find_position(run.glyph_id(base))?;
    let base_anchor = (*pos.base_anchors.get(base_index as usize)?.get(mark.class as usize)?)?;
    attach_mark(run, i, base, &base_anchor, &mark.anchor);
    Some(i + 1)
}

fn apply_mark_to_ligature<R: GlyphPositioning + ?Sized>(
    pos: &MarkLigPos,
    filter: &GlyphFilter,
    run: &mut R,
    i: usize,
) -> Option<usize> {
    let mark_index = pos.mark_coverage.find_position(run.glyph_id(i))?;
    let mark = pos.marks.get(mark_index as usize)?;
    let ligature = find_attachment_target(run, i, GlyphClass::Ligature, filter)?;
    let ligature_index = pos.ligature_coverage.find_position(run.glyph_id(ligature))?;
    let components = pos.ligature_anchors.get(ligature_index as usize)?;
    let last = components.len().checked_sub(1)?;
    let component = run.ligature_component(i).map_or(last, |c| (c as usize).min(last));
    let anchor = (*components[component].get(mark.class as usize)?)?;
    attach_mark(run, i, ligature, &anchor, &mark.anchor);
    Some(i + 1)
}

fn apply_mark_to_mark<R: GlyphPositioning + ?Sized>(
    pos: &MarkMarkPos,
    filter: &GlyphFilter,
    run: &mut R,
    i: usize,
) -> Option<usize> {
    let mark1_index = pos.mark1_coverage.find_position(run.glyph_id(i))?;
    let mark1 = pos.mark1_records.get(mark1_index as usize)?;
    let target = find_preceding_by_class(run, i, GlyphClass::Mark, filter)?;
    let mark2_index = pos.mark2_coverage.find_position(run.glyph_id(target))?;
    let anchor = (*pos.mark2_anchors.get(mark2_index as usize)?.get(mark1.class as usize)?)?;
    attach_mark(run, i, target, &anchor, &mark1.anchor);
    Some(i + 1)
}

type ContextMatch<'s> = (Vec<usize>, &'s [SequenceLookupRecord]);

fn match_context<'s, R: GlyphPositioning + ?Sized>(
    context: &'s SequenceContext,
    filter: &GlyphFilter,
    run: &R,
    i: usize,
    end: usize,
) -> Option<ContextMatch<'s>> {
    let glyph = run.glyph_id(i);
    match context {
        SequenceContext::Format1 { coverage, rule_sets } => {
            let rules = rule_sets.get(coverage.find_position(glyph)? as usize)?;
            rules.iter().find_map(|rule| {
                let positions = match_input(run, filter, i, end, &SequenceMatcher::Glyphs(&rule.input))?;
                Some((positions, rule.lookups.as_slice()))
            })
        }
        SequenceContext::Format2 { coverage, class_def, rule_sets } => {
            coverage.find_position(glyph)?;
            let rules = rule_sets.get(class_def.class_of(glyph) as usize)?;
            rules.iter().find_map(|rule| {
                let input = SequenceMatcher::Classes(class_def, &rule.input);
                let positions = match_input(run, filter, i, end, &input)?;
                Some((positions, rule.lookups.as_slice()))
            })
        }
        SequenceContext::Format3 { coverages, lookups } => {
            let (first, rest) = coverages.split_first()?;
            first.find_position(glyph)?;
            let positions = match_input(run, filter, i, end, &SequenceMatcher::Coverages(rest))?;
            Some((positions, lookups.as_slice()))
        }
    }
}

fn match_chained_context<'s, R: GlyphPositioning + ?Sized>(
    context: &'s ChainedSequenceContext,
    filter: &GlyphFilter,
    run: &R,
    i: usize,
    end: usize,
) -> Option<ContextMatch<'s>> {
    let glyph = run.glyph_id(i);
    match context {
        ChainedSequenceContext::Format1 { coverage, rule_sets } => {
            let rules = rule_sets.get(coverage.find_position(glyph)? as usize)?;
            rules.iter().find_map(|rule| {
                let positions = match_chained(
                    run,
                    filter,
                    i,
                    end,
                    &SequenceMatcher::Glyphs(&rule.backtrack),
                    &SequenceMatcher::Glyphs(&rule.input),
                    &SequenceMatcher::Glyphs(&rule.lookahead),
                )?;
                Some((positions, rule.lookups.as_slice()))
            })
        }
        ChainedSequenceContext::Format2 {
            coverage,
            backtrack_class_def,
            input_class_def,
            lookahead_class_def,
            rule_sets,
        } => {
            coverage.find_position(glyph)?;
            let rules = rule_sets.get(input_class_def.class_of(glyph) as usize)?;
            rules.iter().find_map(|rule| {
                let positions = match_chained(
                    run,
                    filter,
                    i,
                    end,
                    &SequenceMatcher::Classes(backtrack_class_def, &rule.backtrack),
                    &SequenceMatcher::Classes(input_class_def, &rule.input),
                    &SequenceMatcher::Classes(lookahead_class_def, &rule.lookahead),
                )?;
                Some((positions, rule.lookups.as_slice()))
            })
        }
        ChainedSequenceContext::Format3 { backtrack, input, lookahead, lookups } => {
            let (first, rest) = input.split_first()?;
            first.find_position(glyph)?;
            let positions = match_chained(
                run,
                filter,
                i,
                end,
                &SequenceMatcher::Coverages(backtrack),
                &SequenceMatcher::Coverages(rest),
                &SequenceMatcher::Coverages(lookahead),
            )?;
            Some((positions, lookups.as_slice()))
        }
    }
}

/// One positioning pass over a run.
///
/// Each lookup is applied at most once per pass, so a lookup reachable
/// from several features (or requested twice) does not accumulate.
#[derive(Debug)]
pub struct PositioningPass<'a> {
    gpos: &'a GposTable,
    gdef: Option<&'a GdefTable>,
    max_nesting_depth: usize,
    default_features: Vec<Tag>,
    applied: Vec<u16>,
}

impl<'a> PositioningPass<'a> {
    pub fn new(gpos: &'a GposTable, gdef: Option<&'a GdefTable>, config: &FontConfig) -> Self {
        Self {
            gpos,
            gdef,
            max_nesting_depth: config.max_nesting_depth,
            default_features: config.default_features.clone(),
            applied: Vec::new(),
        }
    }

    /// Apply one lookup over `start..start + len`.
    ///
    /// Returns `false` without touching the run if the lookup does not
    /// exist or was already applied in this pass.
    pub fn apply_lookup<R: GlyphPositioning + ?Sized>(
        &mut self,
        lookup_index: u16,
        run: &mut R,
        start: usize,
        len: usize,
    ) -> bool {
        if self.applied.contains(&lookup_index) {
            tracing::debug!("Lookup {} already applied in this pass", lookup_index);
            return false;
        }
        if self.gpos.lookup(lookup_index).is_none() {
            return false;
        }
        self.applied.push(lookup_index);

        let end = start.saturating_add(len).min(run.len());
        let mut applier = LookupApplier::new(self.gpos, self.gdef, self.max_nesting_depth);
        applier.apply_range(lookup_index, run, start, end);
        true
    }

    /// Apply the lookups of `features` (the configured defaults when empty)
    /// for a script and language. Returns how many lookups ran.
    pub fn apply_features<R: GlyphPositioning + ?Sized>(
        &mut self,
        features: &[Tag],
        script: Tag,
        language: Option<Tag>,
        run: &mut R,
        start: usize,
        len: usize,
    ) -> usize {
        let lookups = if features.is_empty() {
            self.gpos.lookups_for_features(&self.default_features, script, language)
        } else {
            self.gpos.lookups_for_features(features, script, language)
        };
        tracing::debug!("Applying {} GPOS lookups for script {}", lookups.len(), script);
        lookups
            .into_iter()
            .filter(|&index| self.apply_lookup(index, run, start, len))
            .count()
    }

    /// Lookups applied so far, in application order
    pub fn applied_lookups(&self) -> &[u16] {
        &self.applied
    }

    /// Start a new pass
    pub fn reset(&mut self) {
        self.applied.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpos::{EntryExit, LookupType, MarkRecord, PairValue, SinglePos};
    use crate::layout::ValueFormat;
    use crate::run::{GlyphRun, PositionedGlyph};

    fn run(glyphs: &[(u16, GlyphClass)]) -> GlyphRun {
        GlyphRun::new(glyphs.iter().map(|&(g, c)| PositionedGlyph::new(g, c, 500)).collect())
    }

    fn filter(flags: u16) -> GlyphFilter<'static> {
        GlyphFilter { flags: LookupFlags(flags), mark_filtering_set: None, gdef: None }
    }

    fn anchor(x: i16, y: i16) -> Anchor {
        Anchor { x, y, anchor_point: None }
    }

    fn lookup(lookup_type: LookupType, flags: u16, subtables: Vec<GposSubtable>) -> Lookup {
        Lookup { lookup_type, flags: LookupFlags(flags), mark_filtering_set: None, subtables }
    }

    fn single(glyphs: Vec<u16>, x_advance: i16) -> Lookup {
        let value = ValueRecord { x_advance, ..Default::default() };
        lookup(
            LookupType::SingleAdjustment,
            0,
            vec![GposSubtable::Single(SinglePos::Format1 { coverage: Coverage::Glyphs(glyphs), value })],
        )
    }

    fn context(coverages: Vec<Vec<u16>>, records: &[(u16, u16)]) -> Lookup {
        let lookups = records
            .iter()
            .map(|&(sequence_index, lookup_index)| SequenceLookupRecord { sequence_index, lookup_index })
            .collect();
        let coverages = coverages.into_iter().map(Coverage::Glyphs).collect();
        lookup(LookupType::Context, 0, vec![GposSubtable::Context(SequenceContext::Format3 { coverages, lookups })])
    }

    fn table(lookups: Vec<Lookup>) -> GposTable {
        GposTable { lookups, ..Default::default() }
    }

    fn advances(run: &GlyphRun) -> Vec<i32> {
        run.glyphs.iter().map(|g| g.advance.x).collect()
    }

    #[test]
    fn test_find_preceding_base_skips_marks() {
        let run = run(&[(1, GlyphClass::Base), (2, GlyphClass::Mark), (3, GlyphClass::Mark)]);
        assert_eq!(find_preceding_by_class(&run, 2, GlyphClass::Base, &filter(0)), Some(0));
        assert_eq!(find_preceding_by_class(&run, 0, GlyphClass::Base, &filter(0)), None);
        assert_eq!(find_preceding_by_class(&run, 2, GlyphClass::Mark, &filter(0)), Some(1));
    }

    #[test]
    fn test_find_preceding_mark_stops_at_base() {
        let run = run(&[(1, GlyphClass::Mark), (2, GlyphClass::Base), (3, GlyphClass::Mark)]);
        assert_eq!(find_preceding_by_class(&run, 2, GlyphClass::Mark, &filter(0)), None);
    }

    #[test]
    fn test_ignore_flags() {
        let run = run(&[(1, GlyphClass::Base), (2, GlyphClass::Ligature), (3, GlyphClass::Mark)]);
        let f = filter(LookupFlags::IGNORE_MARKS | LookupFlags::IGNORE_LIGATURES);
        assert!(!f.should_skip(&run, 0));
        assert!(f.should_skip(&run, 1));
        assert!(f.should_skip(&run, 2));
        assert_eq!(f.next(&run, 1, 3), None);
        assert_eq!(f.prev(&run, 3), Some(0));
    }

    #[test]
    fn test_lookup_applied_once_per_pass() {
        let gpos = table(vec![single(vec![1], 30)]);
        let mut glyphs = run(&[(1, GlyphClass::Base), (2, GlyphClass::Base)]);
        let mut pass = PositioningPass::new(&gpos, None, &FontConfig::default());

        assert!(pass.apply_lookup(0, &mut glyphs, 0, 2));
        assert!(!pass.apply_lookup(0, &mut glyphs, 0, 2));
        assert!(!pass.apply_lookup(7, &mut glyphs, 0, 2));
        assert_eq!(advances(&glyphs), vec![530, 500]);
        assert_eq!(pass.applied_lookups(), &[0]);

        pass.reset();
        assert!(pass.apply_lookup(0, &mut glyphs, 0, 2));
        assert_eq!(advances(&glyphs), vec![560, 500]);
    }

    #[test]
    fn test_pair_skips_ignored_marks() {
        let pair = PairPos::Format1 {
            coverage: Coverage::Glyphs(vec![1]),
            value_format1: ValueFormat(ValueFormat::X_ADVANCE),
            value_format2: ValueFormat(0),
            pair_sets: vec![vec![PairValue {
                second_glyph: 3,
                value1: ValueRecord { x_advance: -80, ..Default::default() },
                value2: ValueRecord::default(),
            }]],
        };
        let gpos = table(vec![lookup(
            LookupType::PairAdjustment,
            LookupFlags::IGNORE_MARKS,
            vec![GposSubtable::Pair(pair)],
        )]);
        let mut glyphs = run(&[(1, GlyphClass::Base), (2, GlyphClass::Mark), (3, GlyphClass::Base)]);
        let mut pass = PositioningPass::new(&gpos, None, &FontConfig::default());
        pass.apply_lookup(0, &mut glyphs, 0, 3);
        assert_eq!(advances(&glyphs), vec![420, 500, 500]);
    }

    #[test]
    fn test_mark_to_base_offset() {
        let pos = MarkBasePos {
            mark_coverage: Coverage::Glyphs(vec![2]),
            base_coverage: Coverage::Glyphs(vec![1]),
            mark_class_count: 1,
            marks: vec![MarkRecord { class: 0, anchor: anchor(10, 10) }],
            base_anchors: vec![vec![Some(anchor(100, 200))]],
        };
        let gpos = table(vec![lookup(LookupType::MarkToBase, 0, vec![GposSubtable::MarkToBase(pos)])]);
        let mut glyphs = run(&[(1, GlyphClass::Base), (2, GlyphClass::Mark)]);
        let mut pass = PositioningPass::new(&gpos, None, &FontConfig::default());
        pass.apply_lookup(0, &mut glyphs, 0, 2);

        // Mark anchor lands on base anchor: -410 + 500 + 10 = 100, 190 + 10 = 200
        assert_eq!(glyphs.glyphs[1].offset, Vector::new(-410, 190));
        assert_eq!(glyphs.glyphs[0].offset, Vector::ZERO);
    }

    fn mark(glyph_id: u16, component: Option<u16>) -> PositionedGlyph {
        PositionedGlyph { ligature_component: component, ..PositionedGlyph::new(glyph_id, GlyphClass::Mark, 0) }
    }

    #[test]
    fn test_mark_to_ligature_component_anchor() {
        let pos = MarkLigPos {
            mark_coverage: Coverage::Glyphs(vec![20]),
            ligature_coverage: Coverage::Glyphs(vec![10]),
            mark_class_count: 1,
            marks: vec![MarkRecord { class: 0, anchor: anchor(0, 0) }],
            ligature_anchors: vec![vec![
                vec![Some(anchor(100, 300))],
                vec![Some(anchor(250, 300))],
                vec![Some(anchor(400, 300))],
            ]],
        };
        let gpos = table(vec![lookup(LookupType::MarkToLigature, 0, vec![GposSubtable::MarkToLigature(pos)])]);
        let mut glyphs = GlyphRun::new(vec![
            PositionedGlyph::new(10, GlyphClass::Ligature, 500),
            mark(20, Some(1)),
            mark(20, Some(0)),
            mark(20, None),
            mark(20, Some(9)),
        ]);
        let mut pass = PositioningPass::new(&gpos, None, &FontConfig::default());
        pass.apply_lookup(0, &mut glyphs, 0, 5);

        let offsets: Vec<Vector> = glyphs.glyphs.iter().map(|g| g.offset).collect();
        assert_eq!(
            offsets,
            vec![
                Vector::ZERO,
                // Second component row
                Vector::new(-250, 300),
                Vector::new(-400, 300),
                // No component, or one past the end: last row
                Vector::new(-100, 300),
                Vector::new(-100, 300),
            ]
        );
    }

    #[test]
    fn test_mark_to_mark_follows_previous_mark() {
        let pos = MarkMarkPos {
            mark1_coverage: Coverage::Glyphs(vec![30]),
            mark2_coverage: Coverage::Glyphs(vec![20]),
            mark_class_count: 1,
            mark1_records: vec![MarkRecord { class: 0, anchor: anchor(40, 0) }],
            mark2_anchors: vec![vec![Some(anchor(50, 300))]],
        };
        let gpos = table(vec![lookup(LookupType::MarkToMark, 0, vec![GposSubtable::MarkToMark(pos)])]);

        let mut glyphs = GlyphRun::new(vec![
            PositionedGlyph::new(1, GlyphClass::Base, 500),
            mark(20, None),
            mark(30, None),
        ]);
        // mark2 already sits on the base
        glyphs.glyphs[1].offset = Vector::new(-410, 190);
        PositioningPass::new(&gpos, None, &FontConfig::default()).apply_lookup(0, &mut glyphs, 0, 3);
        assert_eq!(glyphs.glyphs[2].offset, Vector::new(-400, 490));
        assert_eq!(glyphs.glyphs[1].offset, Vector::new(-410, 190));

        // A base between the marks blocks the attachment
        let mut blocked = GlyphRun::new(vec![
            mark(20, None),
            PositionedGlyph::new(1, GlyphClass::Base, 500),
            mark(30, None),
        ]);
        PositioningPass::new(&gpos, None, &FontConfig::default()).apply_lookup(0, &mut blocked, 0, 3);
        assert_eq!(blocked.glyphs[2].offset, Vector::ZERO);
    }

    #[test]
    fn test_cursive_attachment_ltr() {
        let cursive = CursivePos {
            coverage: Coverage::Glyphs(vec![1, 2]),
            records: vec![
                EntryExit { entry: None, exit: Some(anchor(400, 50)) },
                EntryExit { entry: Some(anchor(20, 0)), exit: None },
            ],
        };
        let gpos = table(vec![lookup(LookupType::CursiveAttachment, 0, vec![GposSubtable::Cursive(cursive)])]);
        let mut glyphs = run(&[(1, GlyphClass::Base), (2, GlyphClass::Base)]);
        let mut pass = PositioningPass::new(&gpos, None, &FontConfig::default());
        pass.apply_lookup(0, &mut glyphs, 0, 2);

        assert_eq!(advances(&glyphs), vec![400, 480]);
        assert_eq!(glyphs.glyphs[1].offset, Vector::new(-20, 50));
    }

    #[test]
    fn test_context_applies_nested_lookup() {
        let gpos = table(vec![context(vec![vec![1], vec![2]], &[(1, 1)]), single(vec![2], 10)]);
        let mut glyphs = run(&[(1, GlyphClass::Base), (2, GlyphClass::Base), (2, GlyphClass::Base)]);
        let mut pass = PositioningPass::new(&gpos, None, &FontConfig::default());
        assert!(pass.apply_lookup(0, &mut glyphs, 0, 3));
        assert_eq!(advances(&glyphs), vec![500, 510, 500]);
    }

    #[test]
    fn test_chained_context_requires_backtrack() {
        let chained = ChainedSequenceContext::Format3 {
            backtrack: vec![Coverage::Glyphs(vec![1])],
            input: vec![Coverage::Glyphs(vec![2])],
            lookahead: vec![Coverage::Glyphs(vec![3])],
            lookups: vec![SequenceLookupRecord { sequence_index: 0, lookup_index: 1 }],
        };
        let gpos = table(vec![
            lookup(LookupType::ChainedContext, 0, vec![GposSubtable::ChainedContext(chained)]),
            single(vec![2], 10),
        ]);
        let config = FontConfig::default();

        let mut hit = run(&[(1, GlyphClass::Base), (2, GlyphClass::Base), (3, GlyphClass::Base)]);
        PositioningPass::new(&gpos, None, &config).apply_lookup(0, &mut hit, 0, 3);
        assert_eq!(advances(&hit), vec![500, 510, 500]);

        let mut miss = run(&[(4, GlyphClass::Base), (2, GlyphClass::Base), (3, GlyphClass::Base)]);
        PositioningPass::new(&gpos, None, &config).apply_lookup(0, &mut miss, 0, 3);
        assert_eq!(advances(&miss), vec![500, 500, 500]);
    }

    #[test]
    fn test_recursive_lookups_terminate() {
        let gpos = table(vec![context(vec![vec![1]], &[(0, 1)]), context(vec![vec![1]], &[(0, 0)])]);
        let mut glyphs = run(&[(1, GlyphClass::Base)]);
        let mut pass = PositioningPass::new(&gpos, None, &FontConfig::default());
        assert!(pass.apply_lookup(0, &mut glyphs, 0, 1));
        assert_eq!(advances(&glyphs), vec![500]);
    }

    #[test]
    fn test_nesting_depth_limit() {
        let gpos = table(vec![context(vec![vec![1]], &[(0, 1)]), single(vec![1], 10)]);
        let mut glyphs = run(&[(1, GlyphClass::Base)]);
        let config = FontConfig::default().with_max_nesting_depth(0);
        PositioningPass::new(&gpos, None, &config).apply_lookup(0, &mut glyphs, 0, 1);
        assert_eq!(advances(&glyphs), vec![500]);

        let config = FontConfig::default().with_max_nesting_depth(1);
        PositioningPass::new(&gpos, None, &config).apply_lookup(0, &mut glyphs, 0, 1);
        assert_eq!(advances(&glyphs), vec![510]);
    }
}
