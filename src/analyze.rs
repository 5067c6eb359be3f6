//! C3: TextAnalyzer — splits input into runs by script, direction, and
//! font coverage, producing the initial [`GlyphStream`] (§4.3).
//! Grounded on rustybuzz's own script/shaper selection in
//! `src/complex/arabic.rs` (`planner.script()` gates which per-script
//! preprocessing runs) and on `conradludgate-azul`'s
//! `estimate_script_and_language`, whose "lang is only necessary for
//! special font features, so we don't detect it" stance this module
//! keeps (`lang` stays `None`; per-language shaping is an Open
//! Question, resolved in DESIGN.md).

use std::collections::HashSet;

use crate::buffer::{GlyphStream, RunId, Slot};
use crate::font::{FontAdapter, Stage};
use crate::options::LayoutOptions;
use crate::unicode::UnicodeDataProvider;
use crate::{Direction, Tag};

/// Per-run output of text analysis: which script/direction/feature set
/// a run of slots (sharing one `RunId`) should be shaped with (§4.3
/// step 6's "feature plan").
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub run_id: RunId,
    pub script: Tag,
    pub direction: Direction,
    pub font_index: usize,
    pub features: Vec<Tag>,
}

pub struct TextAnalyzer;

impl TextAnalyzer {
    /// `fonts[0]` is the primary font; `fonts[1..]` are
    /// `options.fallback_fonts` in order. Shared with `shape.rs` so C4/C5
    /// resolve a run's `font_index` (§4.3 step 4) against the same list
    /// `RunPlan::font_index` was assigned from.
    pub fn resolve_fonts<'a>(primary_font: &'a dyn FontAdapter, options: &LayoutOptions<'a>) -> Vec<&'a dyn FontAdapter> {
        let mut fonts: Vec<&dyn FontAdapter> = Vec::with_capacity(1 + options.fallback_fonts.len());
        fonts.push(primary_font);
        fonts.extend(options.fallback_fonts.iter().copied());
        fonts
    }

    /// §4.3's six-step algorithm.
    pub fn analyze<'a>(
        text: &str,
        options: &LayoutOptions<'a>,
        primary_font: &'a dyn FontAdapter,
        provider: &dyn UnicodeDataProvider,
    ) -> (GlyphStream, Vec<RunPlan>) {
        let fonts = Self::resolve_fonts(primary_font, options);

        // 1. Decode to codepoints, recording byte offsets.
        let chars: Vec<(u32, u32)> = text.char_indices().map(|(b, c)| (b as u32, c as u32)).collect();
        if chars.is_empty() {
            return (GlyphStream::from_pool(), Vec::new());
        }

        // 3. Segment by script; Common/Inherited runs inherit the
        // surrounding strong script.
        let scripts = Self::resolve_scripts(&chars, provider);

        // 4. Per-character font selection (primary, then fallbacks).
        let font_indices: Vec<usize> = chars
            .iter()
            .map(|&(_, cp)| Self::select_font(&fonts, cp))
            .collect();

        let mut stream = GlyphStream::from_pool();
        let mut plans: Vec<RunPlan> = Vec::new();
        let mut next_run_id = 0u32;

        let mut i = 0;
        while i < chars.len() {
            let mut j = i + 1;
            while j < chars.len() && scripts[j] == scripts[i] && font_indices[j] == font_indices[i] {
                j += 1;
            }

            // 2. Resolve this run's direction from its first strong
            // character; default LTR.
            let direction = Self::resolve_direction(&chars[i..j], provider);
            let run_id = RunId(next_run_id);
            next_run_id += 1;
            let font = fonts[font_indices[i]];

            // 5. Emit one slot per codepoint. RTL runs fall back to a
            // mirror-pair codepoint's glyph when the font's cmap has no
            // entry for the original (§4.3's "mirror pairs" note). A
            // codepoint the font can't map directly is tried again as
            // its canonical decomposition, so a legacy precomposed
            // character still shapes when only the font's decomposed
            // base+mark glyphs are present.
            for &(offset, cp) in &chars[i..j] {
                let mut glyph = font.map_codepoint(cp);
                if glyph == 0 && direction == Direction::Rtl {
                    if let Some(mirrored) = provider.bidi_mirror(cp) {
                        glyph = font.map_codepoint(mirrored);
                    }
                }

                if glyph != 0 {
                    let mut slot = Slot::new(offset, cp, run_id);
                    slot.glyph_id = glyph;
                    slot.direction = direction;
                    slot.script = scripts[i];
                    stream.append(slot);
                    continue;
                }

                match provider.canonical_decompose(cp) {
                    Some(components) => {
                        for (k, comp) in components.iter().enumerate() {
                            let mut slot = Slot::new(offset, *comp, run_id);
                            slot.glyph_id = font.map_codepoint(*comp);
                            slot.direction = direction;
                            slot.script = scripts[i];
                            if k > 0 {
                                slot.codepoint_count = 0;
                            }
                            stream.append(slot);
                        }
                    }
                    None => {
                        let mut slot = Slot::new(offset, cp, run_id);
                        slot.direction = direction;
                        slot.script = scripts[i];
                        stream.append(slot);
                    }
                }
            }

            // 6. Active feature set for this run.
            let features = Self::active_features(font, scripts[i], options);

            plans.push(RunPlan {
                run_id,
                script: scripts[i],
                direction,
                font_index: font_indices[i],
                features,
            });

            i = j;
        }

        (stream, plans)
    }

    fn resolve_scripts(chars: &[(u32, u32)], provider: &dyn UnicodeDataProvider) -> Vec<Tag> {
        let common = Tag::new(b"zyyy");
        let raw: Vec<Tag> = chars.iter().map(|&(_, cp)| provider.script(cp)).collect();

        let mut resolved = raw.clone();
        let mut last_strong: Option<Tag> = None;
        for i in 0..resolved.len() {
            if resolved[i] == common {
                if let Some(strong) = last_strong {
                    resolved[i] = strong;
                }
            } else {
                last_strong = Some(resolved[i]);
            }
        }
        // Backfill any leading Common/Inherited run using the first
        // strong script found after it; default to Latin if none.
        let first_strong = raw.iter().find(|&&s| s != common).copied().unwrap_or(crate::tag::script::LATIN);
        for r in resolved.iter_mut() {
            if *r == common {
                *r = first_strong;
            }
        }
        resolved
    }

    fn resolve_direction(run: &[(u32, u32)], provider: &dyn UnicodeDataProvider) -> Direction {
        run.iter()
            .map(|&(_, cp)| provider.bidi_class(cp))
            .find(|b| b.is_strong())
            .and_then(|b| b.direction())
            .unwrap_or(Direction::Ltr)
    }

    fn select_font(fonts: &[&dyn FontAdapter], cp: u32) -> usize {
        for (idx, font) in fonts.iter().enumerate() {
            if font.map_codepoint(cp) != 0 {
                return idx;
            }
        }
        0 // keep .notdef on the primary font, per §4.3 step 4.
    }

    /// §4.3 step 6: "union of (default features for script/lang from
    /// the font) and (user-enabled features), minus (user-disabled
    /// features)".
    fn active_features(font: &dyn FontAdapter, script: Tag, options: &LayoutOptions) -> Vec<Tag> {
        let mut candidates = HashSet::new();
        for stage in [Stage::Substitution, Stage::Positioning] {
            for (idx, _) in font.lookups(stage, script, None) {
                for tag in font.features_for_lookup(stage, script, None, idx) {
                    candidates.insert(tag);
                }
            }
        }

        candidates
            .into_iter()
            .filter(|tag| {
                let wanted = font.feature_enabled_by_default(*tag) || options.enabled_features.contains(tag);
                wanted && !options.disabled_features.contains(tag)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::StaticFontAdapter;
    use crate::unicode::UnicodeCrateProvider;

    #[test]
    fn emits_one_slot_per_codepoint_with_monotonic_offsets() {
        let font = StaticFontAdapter::new(1000).map('f', 10).map('i', 11);
        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();
        let (stream, plans) = TextAnalyzer::analyze("fi", &options, &font, &provider);

        assert_eq!(stream.len(), 2);
        assert!(stream.is_offset_monotonic());
        assert_eq!(stream.get(0).glyph_id, 10);
        assert_eq!(stream.get(1).glyph_id, 11);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].direction, Direction::Ltr);
    }

    #[test]
    fn arabic_run_resolves_to_rtl() {
        let font = StaticFontAdapter::new(1000);
        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();
        let (_, plans) = TextAnalyzer::analyze("\u{0633}\u{0644}\u{0627}\u{0645}", &options, &font, &provider);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].direction, Direction::Rtl);
    }

    #[test]
    fn precomposed_codepoint_falls_back_to_canonical_decomposition() {
        // Font only has the base letter + combining acute, not é
        // itself: the slot count should reflect the decomposed form.
        let font = StaticFontAdapter::new(1000).map('e', 5).map('\u{0301}', 6);
        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();
        let (stream, _) = TextAnalyzer::analyze("\u{00E9}", &options, &font, &provider);

        assert_eq!(stream.len(), 2);
        assert_eq!(stream.get(0).glyph_id, 5);
        assert_eq!(stream.get(1).glyph_id, 6);
        assert_eq!(stream.get(0).source_offset, 0);
        assert_eq!(stream.get(1).source_offset, 0);
        assert_eq!(stream.total_codepoint_count(), 1);
    }

    #[test]
    fn rtl_run_uses_mirror_pair_when_cmap_misses_original() {
        // Font only maps the closing paren; an RTL run containing the
        // opening paren should resolve it through its mirror pair.
        let font = StaticFontAdapter::new(1000).map(')', 7);
        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();
        let (stream, _) = TextAnalyzer::analyze("\u{0633}(", &options, &font, &provider);
        assert_eq!(stream.get(1).glyph_id, 7);
    }

    #[test]
    fn falls_back_to_secondary_font_when_primary_has_no_glyph() {
        let primary = StaticFontAdapter::new(1000);
        let fallback = StaticFontAdapter::new(1000).map('x', 99);
        let mut options = LayoutOptions::new();
        options.fallback_fonts.push(&fallback);
        let provider = UnicodeCrateProvider;

        let (stream, plans) = TextAnalyzer::analyze("x", &options, &primary, &provider);
        assert_eq!(stream.get(0).glyph_id, 99);
        assert_eq!(plans[0].font_index, 1);
    }

    #[test]
    fn notdef_stays_on_primary_when_no_font_covers_codepoint() {
        let primary = StaticFontAdapter::new(1000);
        let options = LayoutOptions::new();
        let provider = UnicodeCrateProvider;
        let (stream, plans) = TextAnalyzer::analyze("z", &options, &primary, &provider);
        assert_eq!(stream.get(0).glyph_id, 0);
        assert_eq!(plans[0].font_index, 0);
    }
}
