//! C5: PositioningEngine. Grounded on rustybuzz's mark/cursive
//! attachment bookkeeping (back-reference fields packed onto
//! `GlyphInfo`, here `Slot`) and on its legacy-`kern`-as-fallback
//! ordering.

use crate::analyze::RunPlan;
use crate::buffer::{GlyphStream, SlotFlags};
use crate::font::{FontAdapter, GlyphClass, Lookup, Stage, Subtable};
use crate::ot::{
    is_skipped, lookup_feature_mask, match_backtrack, match_input, match_lookahead, next_eligible, prev_eligible,
    slot_is_gated_in, ShapePlanCache,
};
use crate::tag::feature::KERNING;

pub struct PositioningEngine;

impl PositioningEngine {
    /// §4.5's three ordered steps, run by run. `fonts` is indexed by
    /// each plan's `font_index` (§4.3 step 4's fallback selection), so
    /// a run whose glyphs were mapped from a fallback font is seeded
    /// and positioned from that font's own metrics and lookups, not
    /// the primary's.
    pub fn apply_all(
        stream: &mut GlyphStream,
        fonts: &[&dyn FontAdapter],
        plans: &[RunPlan],
        cache: &ShapePlanCache,
        apply_kerning: bool,
    ) {
        let mut cursor = 0usize;
        for plan in plans {
            let start = cursor;
            let mut end = start;
            while end < stream.len() && stream.get(end).run_ref == plan.run_id {
                end += 1;
            }
            if start == end {
                continue;
            }
            let font = fonts.get(plan.font_index).copied().unwrap_or(fonts[0]);

            // Step 1: seed unhinted advances from font metrics. Also
            // resets the offset/attachment fields GPOS lookups below
            // accumulate into (`+=`), so a second `apply_all` call with
            // no GSUB state change starts from the same baseline as
            // the first (§8 property #4) instead of doubling prior
            // deltas. Slots the Arabic `stch` postprocess pre-seeded
            // keep their offset: that pass runs once, before
            // positioning, and isn't replayed between repeated
            // `apply_all` calls.
            for i in start..end {
                let glyph = stream.get(i).glyph_id;
                let metrics = font.metrics(glyph);
                let slot = stream.get_mut(i);
                slot.x_advance = metrics.advance_x;
                slot.y_advance = metrics.advance_y;
                if !slot.flags.contains(SlotFlags::STCH_OFFSET) {
                    slot.x_offset = 0;
                    slot.y_offset = 0;
                }
                slot.mark_attachment = -1;
                slot.cursive_attachment = -1;
            }

            let shape_plan = cache.get_or_compile(plan.script, None, &plan.features);

            // Step 2: positioning lookups in font-declared order.
            for (lookup_idx, lookup) in font.lookups(Stage::Positioning, plan.script, None) {
                let features = font.features_for_lookup(Stage::Positioning, plan.script, None, lookup_idx);
                if !shape_plan.map.is_lookup_eligible(&features) {
                    continue;
                }
                let feature_mask = lookup_feature_mask(&shape_plan.map, &features);
                Self::apply_lookup(stream, font, lookup, start, end, feature_mask);
            }

            // Step 3: legacy kern fallback, only if the run's active
            // feature set never turned on an explicit `kern` GPOS
            // lookup.
            if apply_kerning && !plan.features.contains(&KERNING) {
                Self::apply_legacy_kern(stream, font, start, end);
            }

            cursor = end;
        }
    }

    fn apply_lookup(stream: &mut GlyphStream, font: &dyn FontAdapter, lookup: &Lookup, start: usize, end: usize, feature_mask: crate::Mask) {
        let mut i = start;
        while i < end {
            if is_skipped(font, lookup, stream.get(i).glyph_id) {
                i += 1;
                continue;
            }
            if !slot_is_gated_in(stream.get(i).mask, feature_mask) {
                i += 1;
                continue;
            }
            i = Self::apply_subtables_at(stream, font, lookup, i, end);
        }
    }

    /// Applies the first matching subtable at `i`; always advances to
    /// avoid re-entering the same position (§4.5's determinism note).
    fn apply_subtables_at(stream: &mut GlyphStream, font: &dyn FontAdapter, lookup: &Lookup, i: usize, end: usize) -> usize {
        let glyph = stream.get(i).glyph_id;
        for subtable in &lookup.subtables {
            match subtable {
                Subtable::SingleAdjust { coverage, adjustments } => {
                    if coverage.contains(glyph) {
                        if let Some(v) = adjustments.get(&glyph) {
                            let slot = stream.get_mut(i);
                            slot.x_advance += v.x_advance;
                            slot.y_advance += v.y_advance;
                            slot.x_offset += v.x_offset;
                            slot.y_offset += v.y_offset;
                            return i + 1;
                        }
                    }
                }
                Subtable::PairAdjust { pairs } => {
                    if let Some(j) = next_eligible(stream, font, lookup, i + 1, end) {
                        let key = (glyph, stream.get(j).glyph_id);
                        if let Some((first, second)) = pairs.get(&key) {
                            {
                                let slot = stream.get_mut(i);
                                slot.x_advance += first.x_advance;
                                slot.y_advance += first.y_advance;
                                slot.x_offset += first.x_offset;
                                slot.y_offset += first.y_offset;
                            }
                            let slot = stream.get_mut(j);
                            slot.x_advance += second.x_advance;
                            slot.y_advance += second.y_advance;
                            slot.x_offset += second.x_offset;
                            slot.y_offset += second.y_offset;
                            return j;
                        }
                    }
                }
                Subtable::CursiveAttach { entries } => {
                    if let Some((_, exit)) = entries.get(&glyph) {
                        if let Some(exit) = exit {
                            if let Some(j) = next_eligible(stream, font, lookup, i + 1, end) {
                                let next_glyph = stream.get(j).glyph_id;
                                if let Some((Some(entry), _)) = entries.get(&next_glyph) {
                                    // Glue exit(i) to entry(j): shift j's
                                    // y_offset so the anchors coincide.
                                    let delta_y = (stream.get(i).y_offset + exit.y) - entry.y;
                                    let slot = stream.get_mut(j);
                                    slot.y_offset = delta_y;
                                    slot.cursive_attachment = (j as i16) - (i as i16);
                                    return i + 1;
                                }
                            }
                        }
                    }
                }
                Subtable::MarkToBaseAttach { marks, bases } => {
                    if let Some((mark_class, mark_anchor)) = marks.get(&glyph) {
                        if let Some(base_idx) = Self::find_attachment_base(stream, font, lookup, i, GlyphClass::Base) {
                            let base_glyph = stream.get(base_idx).glyph_id;
                            if let Some(anchors) = bases.get(&base_glyph) {
                                if let Some(base_anchor) = anchors.get(*mark_class as usize) {
                                    Self::attach_mark(stream, i, base_idx, *mark_anchor, *base_anchor);
                                    return i + 1;
                                }
                            }
                        }
                    }
                }
                Subtable::MarkToLigatureAttach { marks, ligatures } => {
                    if let Some((mark_class, mark_anchor)) = marks.get(&glyph) {
                        if let Some(base_idx) = Self::find_attachment_base(stream, font, lookup, i, GlyphClass::Ligature) {
                            let lig_glyph = stream.get(base_idx).glyph_id;
                            if let Some(components) = ligatures.get(&lig_glyph) {
                                let comp = stream.get(i).ligature_component.max(0) as usize;
                                let anchors = components.get(comp).or_else(|| components.first());
                                if let Some(anchors) = anchors {
                                    if let Some(base_anchor) = anchors.get(*mark_class as usize) {
                                        Self::attach_mark(stream, i, base_idx, *mark_anchor, *base_anchor);
                                        return i + 1;
                                    }
                                }
                            }
                        }
                    }
                }
                Subtable::MarkToMarkAttach { marks, base_marks } => {
                    if let Some((mark_class, mark_anchor)) = marks.get(&glyph) {
                        if let Some(base_idx) = prev_eligible(stream, font, lookup, i.saturating_sub(1)) {
                            if base_idx != i && font.glyph_class(stream.get(base_idx).glyph_id) == GlyphClass::Mark {
                                let base_glyph = stream.get(base_idx).glyph_id;
                                if let Some(anchors) = base_marks.get(&base_glyph) {
                                    if let Some(base_anchor) = anchors.get(*mark_class as usize) {
                                        Self::attach_mark(stream, i, base_idx, *mark_anchor, *base_anchor);
                                        return i + 1;
                                    }
                                }
                            }
                        }
                    }
                }
                Subtable::ContextPos(rule) | Subtable::ChainContextPos(rule) => {
                    if match_backtrack(stream, font, lookup, i, &rule.backtrack) {
                        if let Some(input_indices) = match_input(stream, font, lookup, i, end, &rule.input) {
                            let last = *input_indices.last().unwrap_or(&i);
                            if match_lookahead(stream, font, lookup, last, end, &rule.lookahead) {
                                for nested in &rule.nested_lookups {
                                    if let Some(&target) = input_indices.get(nested.sequence_index as usize) {
                                        let nested_lookups = font.lookups(Stage::Positioning, stream.get(target).script, None);
                                        if let Some((_, nested_lookup)) =
                                            nested_lookups.iter().find(|(idx, _)| *idx == nested.lookup_index as usize)
                                        {
                                            Self::apply_subtables_at(stream, font, nested_lookup, target, end);
                                        }
                                    }
                                }
                                return last + 1;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        i + 1
    }

    /// Zeroes the mark's advance and stores the anchor delta in its
    /// offsets, per §4.5's mark-attachment rule.
    fn attach_mark(stream: &mut GlyphStream, mark_i: usize, base_i: usize, mark_anchor: crate::font::Anchor, base_anchor: crate::font::Anchor) {
        let slot = stream.get_mut(mark_i);
        slot.x_offset = base_anchor.x - mark_anchor.x;
        slot.y_offset = base_anchor.y - mark_anchor.y;
        slot.x_advance = 0;
        slot.y_advance = 0;
        slot.mark_attachment = (base_i as i16) - (mark_i as i16);
    }

    fn find_attachment_base(
        stream: &GlyphStream,
        font: &dyn FontAdapter,
        lookup: &Lookup,
        mark_i: usize,
        class: GlyphClass,
    ) -> Option<usize> {
        (0..mark_i).rev().find(|&i| {
            !is_skipped(font, lookup, stream.get(i).glyph_id) && font.glyph_class(stream.get(i).glyph_id) == class
        })
    }

    /// §4.5 step 3: legacy `kern` pair adjustment between consecutive
    /// slots, applied after the lookup phase when no GPOS `kern`
    /// feature ran.
    fn apply_legacy_kern(stream: &mut GlyphStream, font: &dyn FontAdapter, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mut i = start;
        while i + 1 < end {
            let left = stream.get(i).glyph_id;
            let right = stream.get(i + 1).glyph_id;
            if let Some((dx, dy)) = font.kern_pair(left, right) {
                let slot = stream.get_mut(i);
                slot.x_advance += dx;
                slot.y_advance += dy;
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::TextAnalyzer;
    use crate::options::LayoutOptions;
    use crate::unicode::UnicodeCrateProvider;

    #[test]
    fn legacy_kern_pair_reduces_advance() {
        let font = crate::font::StaticFontAdapter::new(1000)
            .map('A', 'A' as u32)
            .map('V', 'V' as u32)
            .with_metrics('A' as u32, crate::font::GlyphMetrics { advance_x: 600, ..Default::default() })
            .with_metrics('V' as u32, crate::font::GlyphMetrics { advance_x: 600, ..Default::default() })
            .with_kern_pair('A' as u32, 'V' as u32, -80, 0);

        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();
        let (mut stream, plans) = TextAnalyzer::analyze("AV", &options, &font, &provider);
        let cache = ShapePlanCache::new();
        PositioningEngine::apply_all(&mut stream, &[&font], &plans, &cache, true);

        assert_eq!(stream.get(0).x_advance, 520);
    }

    #[test]
    fn mark_attachment_zeroes_advance_and_sets_offset() {
        use crate::font::{Anchor, Subtable};
        let mut marks = std::collections::HashMap::new();
        marks.insert('^' as u32, (0u16, Anchor { x: 5, y: 0 }));
        let mut bases = std::collections::HashMap::new();
        bases.insert('a' as u32, vec![Anchor { x: 50, y: 100 }]);

        let lookup = crate::font::Lookup::with_subtables(
            crate::font::LookupFlags::empty(),
            vec![Subtable::MarkToBaseAttach { marks, bases }],
        );
        let font = crate::font::StaticFontAdapter::new(1000)
            .map('a', 'a' as u32)
            .map('^', '^' as u32)
            .with_glyph_class('a' as u32, crate::font::GlyphClass::Base)
            .with_glyph_class('^' as u32, crate::font::GlyphClass::Mark)
            .with_metrics('^' as u32, crate::font::GlyphMetrics { advance_x: 200, ..Default::default() })
            .with_gpos_lookup(lookup, &[crate::tag::feature::MARK_TO_BASE])
            .with_default_feature(crate::tag::feature::MARK_TO_BASE);

        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();
        let (mut stream, plans) = TextAnalyzer::analyze("a^", &options, &font, &provider);
        let cache = ShapePlanCache::new();
        PositioningEngine::apply_all(&mut stream, &[&font], &plans, &cache, false);

        let mark = stream.get(1);
        assert_eq!(mark.x_advance, 0);
        assert_eq!(mark.x_offset, 45);
        assert_eq!(mark.y_offset, 100);
    }

    #[test]
    fn positioning_is_idempotent() {
        let font = crate::font::StaticFontAdapter::new(1000)
            .map('A', 'A' as u32)
            .map('V', 'V' as u32)
            .with_kern_pair('A' as u32, 'V' as u32, -80, 0);
        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();
        let (mut stream, plans) = TextAnalyzer::analyze("AV", &options, &font, &provider);
        let cache = ShapePlanCache::new();

        PositioningEngine::apply_all(&mut stream, &[&font], &plans, &cache, true);
        let first_pass: Vec<_> = stream.as_slice().iter().map(|s| (s.x_advance, s.x_offset)).collect();
        PositioningEngine::apply_all(&mut stream, &[&font], &plans, &cache, true);
        let second_pass: Vec<_> = stream.as_slice().iter().map(|s| (s.x_advance, s.x_offset)).collect();

        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn single_adjust_offset_is_idempotent() {
        use crate::font::{Coverage, Subtable, ValueRecord};
        let mut adjustments = std::collections::HashMap::new();
        adjustments.insert('A' as u32, ValueRecord { x_offset: 30, y_offset: 0, x_advance: 0, y_advance: 0 });
        let lookup = crate::font::Lookup::with_subtables(
            crate::font::LookupFlags::empty(),
            vec![Subtable::SingleAdjust { coverage: Coverage::from_glyphs(['A' as u32]), adjustments }],
        );
        let font = crate::font::StaticFontAdapter::new(1000)
            .map('A', 'A' as u32)
            .with_gpos_lookup(lookup, &[crate::tag::feature::KERNING])
            .with_default_feature(crate::tag::feature::KERNING);

        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();
        let (mut stream, plans) = TextAnalyzer::analyze("A", &options, &font, &provider);
        let cache = ShapePlanCache::new();

        PositioningEngine::apply_all(&mut stream, &[&font], &plans, &cache, false);
        assert_eq!(stream.get(0).x_offset, 30);
        PositioningEngine::apply_all(&mut stream, &[&font], &plans, &cache, false);
        assert_eq!(stream.get(0).x_offset, 30);
    }
}
