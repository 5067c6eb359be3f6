//! C4: SubstitutionEngine. Grounded on rustybuzz's `ot::Map`-driven
//! lookup dispatch and on `arabic.rs`'s `collect_features`/
//! `setup_masks` pattern for compiling a run's active features before
//! a lookup pass runs.

use crate::analyze::RunPlan;
use crate::buffer::{GlyphStream, RunId};
use crate::font::{ContextRule, FontAdapter, Lookup, Stage, Subtable};
use crate::ot::{is_skipped, lookup_feature_mask, match_backtrack, match_input, match_lookahead, slot_is_gated_in, ShapePlanCache};
use crate::unicode::UnicodeDataProvider;

pub struct SubstitutionEngine;

impl SubstitutionEngine {
    /// Runs every run's feature plan through its selected font's
    /// declared GSUB lookup order (§4.4). `fonts` is indexed by each
    /// plan's `font_index` (§4.3 step 4's fallback selection), so a run
    /// whose glyphs were mapped from a fallback font is substituted
    /// against that font's own lookups, not the primary's. Runs are
    /// processed left to right; a run's own substitutions may change
    /// its slot count but never another run's, so boundaries are
    /// relocated by scanning for `run_ref` after each run completes.
    pub fn apply_all(
        stream: &mut GlyphStream,
        fonts: &[&dyn FontAdapter],
        provider: &dyn UnicodeDataProvider,
        plans: &[RunPlan],
        cache: &ShapePlanCache,
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
            let shape_plan = cache.get_or_compile(plan.script, None, &plan.features);
            let new_end = Self::apply_run(stream, font, provider, start, end, plan.run_id, &shape_plan.map);
            cursor = new_end;
        }
    }

    fn apply_run(
        stream: &mut GlyphStream,
        font: &dyn FontAdapter,
        provider: &dyn UnicodeDataProvider,
        start: usize,
        end: usize,
        run_id: RunId,
        map: &crate::ot::Map,
    ) -> usize {
        let mut end = end;
        for (lookup_idx, lookup) in font.lookups(Stage::Substitution, Self::plan_script(stream, start), None) {
            let features = font.features_for_lookup(Stage::Substitution, Self::plan_script(stream, start), None, lookup_idx);
            if !map.is_lookup_eligible(&features) {
                continue;
            }
            let feature_mask = lookup_feature_mask(map, &features);

            if Self::is_reverse_chain(lookup) {
                end = Self::apply_reverse_chain(stream, font, lookup, start, end);
                continue;
            }

            let mut i = start;
            while i < end {
                if stream.get(i).run_ref != run_id {
                    break;
                }
                if is_skipped(font, lookup, stream.get(i).glyph_id) {
                    i += 1;
                    continue;
                }
                if !slot_is_gated_in(stream.get(i).mask, feature_mask) {
                    i += 1;
                    continue;
                }
                match Self::apply_subtables_at(stream, font, lookup, provider, i, end) {
                    Some((new_end, resume)) => {
                        end = new_end;
                        i = resume;
                    }
                    None => i += 1,
                }
            }
        }
        end
    }

    fn plan_script(stream: &GlyphStream, at: usize) -> crate::Tag {
        if at < stream.len() {
            stream.get(at).script
        } else {
            crate::tag::script::LATIN
        }
    }

    fn is_reverse_chain(lookup: &Lookup) -> bool {
        lookup
            .subtables
            .iter()
            .all(|s| matches!(s, Subtable::ReverseChainSingleSubst { .. }))
            && !lookup.subtables.is_empty()
    }

    /// §4.4 type 6: single pass right-to-left, same skip filter.
    fn apply_reverse_chain(
        stream: &mut GlyphStream,
        font: &dyn FontAdapter,
        lookup: &Lookup,
        start: usize,
        end: usize,
    ) -> usize {
        let mut i = end;
        while i > start {
            i -= 1;
            if is_skipped(font, lookup, stream.get(i).glyph_id) {
                continue;
            }
            for subtable in &lookup.subtables {
                if let Subtable::ReverseChainSingleSubst {
                    coverage,
                    backtrack,
                    lookahead,
                    mapping,
                } = subtable
                {
                    let glyph = stream.get(i).glyph_id;
                    if !coverage.contains(glyph) {
                        continue;
                    }
                    let rule = ContextRule {
                        backtrack: backtrack.clone(),
                        input: Vec::new(),
                        lookahead: lookahead.clone(),
                        nested_lookups: Vec::new(),
                    };
                    if match_backtrack(stream, font, lookup, i, &rule.backtrack)
                        && match_lookahead(stream, font, lookup, i, end, &rule.lookahead)
                    {
                        if let Some(&new_glyph) = mapping.get(&glyph) {
                            stream.replace_1_1(i, new_glyph);
                        }
                        break;
                    }
                }
            }
        }
        end
    }

    /// Tries every subtable in `lookup` at position `i`, in order,
    /// returning the new stream end and the resume index on the first
    /// match (§4.4: "resume scanning after the rewritten region").
    fn apply_subtables_at(
        stream: &mut GlyphStream,
        font: &dyn FontAdapter,
        lookup: &Lookup,
        provider: &dyn UnicodeDataProvider,
        i: usize,
        end: usize,
    ) -> Option<(usize, usize)> {
        let glyph = stream.get(i).glyph_id;
        for subtable in &lookup.subtables {
            match subtable {
                Subtable::SingleSubst { coverage, mapping } => {
                    if coverage.contains(glyph) {
                        if let Some(&new_glyph) = mapping.get(&glyph) {
                            stream.replace_1_1(i, new_glyph);
                            return Some((end, i + 1));
                        }
                    }
                }
                Subtable::MultipleSubst { coverage, mapping } => {
                    if coverage.contains(glyph) {
                        if let Some(glyphs) = mapping.get(&glyph) {
                            let n = glyphs.len();
                            stream.decompose(i, glyphs);
                            let delta = n as isize - 1;
                            let new_end = (end as isize + delta).max(0) as usize;
                            let resume = if n == 0 { i } else { i + n };
                            return Some((new_end, resume));
                        }
                    }
                }
                Subtable::AlternateSubst { coverage, alternates } => {
                    if coverage.contains(glyph) {
                        if let Some(alts) = alternates.get(&glyph) {
                            if let Some(&new_glyph) = alts.first() {
                                stream.replace_1_1(i, new_glyph);
                                return Some((end, i + 1));
                            }
                        }
                    }
                }
                Subtable::LigatureSubst { coverage, rules } => {
                    if coverage.contains(glyph) {
                        if let Some(result) = Self::try_ligature(stream, font, lookup, provider, i, end, rules) {
                            return Some(result);
                        }
                    }
                }
                Subtable::ContextSubst(rule) | Subtable::ChainContextSubst(rule) => {
                    if let Some(result) =
                        Self::try_context(stream, font, lookup, provider, i, end, rule, Stage::Substitution)
                    {
                        return Some(result);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Ligature (N:1). Scans forward for each remaining component,
    /// stepping *through* skip-filtered slots (typically marks) without
    /// consuming them — they stay in the stream but get tagged with the
    /// absorbing ligature's id and the component index they trail, per
    /// §4.4's ligature bookkeeping note.
    fn try_ligature(
        stream: &mut GlyphStream,
        font: &dyn FontAdapter,
        lookup: &Lookup,
        provider: &dyn UnicodeDataProvider,
        start_i: usize,
        end: usize,
        rules: &std::collections::HashMap<u32, Vec<crate::font::LigatureRule>>,
    ) -> Option<(usize, usize)> {
        let first_glyph = stream.get(start_i).glyph_id;
        let candidates = rules.get(&first_glyph)?;

        'rule: for rule in candidates {
            let mut pos = start_i;
            let mut removed = Vec::new();
            let mut trailing_marks: Vec<(usize, i16)> = Vec::new();

            for (comp_idx, &comp_glyph) in rule.components.iter().enumerate() {
                let mut cursor = pos + 1;
                loop {
                    if cursor >= end {
                        continue 'rule;
                    }
                    if is_skipped(font, lookup, stream.get(cursor).glyph_id) {
                        trailing_marks.push((cursor, comp_idx as i16));
                        cursor += 1;
                        continue;
                    }
                    break;
                }
                if stream.get(cursor).glyph_id != comp_glyph {
                    continue 'rule;
                }
                removed.push(cursor);
                pos = cursor;
            }

            // Representative codepoint: first non-default-ignorable,
            // non-ZWJ component, scanning target then removed in order
            // (§9 Open Question resolution).
            let mut component_indices = vec![start_i];
            component_indices.extend(removed.iter().copied());
            let representative = component_indices
                .iter()
                .map(|&idx| stream.get(idx).codepoint)
                .find(|&cp| !provider.is_default_ignorable(cp) && !provider.is_zero_width_joiner(cp))
                .unwrap_or_else(|| stream.get(start_i).codepoint);

            let ligature_id = stream.allocate_ligature_id();
            let removed_count = removed.len();

            // Tag trailing marks before they shift due to removal.
            for &(mark_idx, comp_idx) in &trailing_marks {
                let slot = stream.get_mut(mark_idx);
                slot.ligature_id = ligature_id;
                slot.ligature_component = comp_idx;
            }

            stream.ligate(start_i, removed, rule.ligature_glyph, representative, ligature_id);

            // All removed components sat between start_i and pos, so the
            // ligature slot lands at start_i and scanning resumes right
            // after it.
            let new_end = end - removed_count;
            return Some((new_end, start_i + 1));
        }
        None
    }

    /// Contextual / chaining-contextual: matches backtrack/input/
    /// lookahead coverage sequences, then recursively applies the
    /// rule's nested lookups at their declared input positions.
    fn try_context(
        stream: &mut GlyphStream,
        font: &dyn FontAdapter,
        lookup: &Lookup,
        provider: &dyn UnicodeDataProvider,
        pos: usize,
        end: usize,
        rule: &ContextRule,
        stage: Stage,
    ) -> Option<(usize, usize)> {
        if !match_backtrack(stream, font, lookup, pos, &rule.backtrack) {
            return None;
        }
        let input_indices = match_input(stream, font, lookup, pos, end, &rule.input)?;
        let last_input = *input_indices.last()?;
        if !match_lookahead(stream, font, lookup, last_input, end, &rule.lookahead) {
            return None;
        }

        let mut shift: isize = 0;
        let mut new_end = end;
        let mut sorted = rule.nested_lookups.clone();
        sorted.sort_by_key(|n| n.sequence_index);
        for nested in &sorted {
            let target = match input_indices.get(nested.sequence_index as usize) {
                Some(&idx) => (idx as isize + shift) as usize,
                None => continue,
            };
            let nested_lookups = font.lookups(stage, Self::plan_script(stream, target), None);
            let nested_lookup = match nested_lookups.iter().find(|(idx, _)| *idx == nested.lookup_index as usize) {
                Some((_, l)) => *l,
                None => continue,
            };
            if let Some((after_end, _)) = Self::apply_subtables_at(stream, font, nested_lookup, provider, target, new_end) {
                shift += after_end as isize - new_end as isize;
                new_end = after_end;
            }
        }

        Some((new_end, (last_input as isize + shift + 1).max(pos as isize + 1) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::TextAnalyzer;
    use crate::font::{Coverage, Lookup, LookupFlags, LigatureRule, Subtable};
    use crate::options::LayoutOptions;
    use crate::unicode::UnicodeCrateProvider;
    use std::collections::HashMap;

    fn fi_font() -> crate::font::StaticFontAdapter {
        let mut mapping = HashMap::new();
        mapping.insert(
            'f' as u32,
            vec![LigatureRule {
                components: vec!['i' as u32],
                ligature_glyph: 0xFB01,
            }],
        );
        let lookup = Lookup::with_subtables(
            LookupFlags::empty(),
            vec![Subtable::LigatureSubst {
                coverage: Coverage::from_glyphs(['f' as u32]),
                rules: mapping,
            }],
        );
        crate::font::StaticFontAdapter::new(1000)
            .map('f', 'f' as u32)
            .map('i', 'i' as u32)
            .with_gsub_lookup(lookup, &[crate::tag::feature::STANDARD_LIGATURES])
            .with_default_feature(crate::tag::feature::STANDARD_LIGATURES)
    }

    #[test]
    fn fi_ligature_end_to_end() {
        let font = fi_font();
        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();
        let (mut stream, plans) = TextAnalyzer::analyze("fi", &options, &font, &provider);
        let cache = ShapePlanCache::new();
        SubstitutionEngine::apply_all(&mut stream, &[&font], &provider, &plans, &cache);

        assert_eq!(stream.len(), 1);
        let slot = stream.get(0);
        assert_eq!(slot.source_offset, 0);
        assert_eq!(slot.codepoint_count, 2);
        assert!(slot.is_ligated());
        assert_eq!(slot.ligature_id, 1);
        assert_eq!(slot.glyph_id, 0xFB01);
    }

    #[test]
    fn single_subst_marks_is_substituted() {
        let mut mapping = HashMap::new();
        mapping.insert('a' as u32, 'A' as u32);
        let lookup = Lookup::with_subtables(
            LookupFlags::empty(),
            vec![Subtable::SingleSubst {
                coverage: Coverage::from_glyphs(['a' as u32]),
                mapping,
            }],
        );
        let font = crate::font::StaticFontAdapter::new(1000)
            .map('a', 'a' as u32)
            .with_gsub_lookup(lookup, &[crate::tag::feature::LOCALIZED_FORMS])
            .with_default_feature(crate::tag::feature::LOCALIZED_FORMS);

        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();
        let (mut stream, plans) = TextAnalyzer::analyze("a", &options, &font, &provider);
        let cache = ShapePlanCache::new();
        SubstitutionEngine::apply_all(&mut stream, &[&font], &provider, &plans, &cache);

        assert_eq!(stream.get(0).glyph_id, 'A' as u32);
        assert!(stream.get(0).is_substituted());
    }
}
