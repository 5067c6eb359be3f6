//! Top-level shaping entry point, wiring C3 through C5 together.
//! Grounded on rustybuzz's `shape()`/`shape_with_plan()` orchestration
//! (`src/hb/shape.rs` in spirit): text analysis produces runs and an
//! initial buffer, complex shapers precondition it, GSUB substitutes,
//! complex shapers postprocess, then GPOS positions.

use crate::analyze::TextAnalyzer;
use crate::buffer::GlyphStream;
use crate::complex;
use crate::font::FontAdapter;
use crate::ot::{PositioningEngine, ShapePlanCache, SubstitutionEngine};
use crate::options::LayoutOptions;
use crate::unicode::UnicodeDataProvider;

/// Runs the full shaping pipeline (§4.3-§4.5) over `text` and returns
/// the resulting [`GlyphStream`], ready for [`crate::layout::LineLayout`]
/// to turn into positioned glyphs. Each call compiles its own
/// [`ShapePlanCache`]; callers shaping many runs against the same font
/// should prefer [`shape_with_cache`] to reuse one across calls.
pub fn shape<'a>(
    text: &str,
    options: &LayoutOptions<'a>,
    font: &'a dyn FontAdapter,
    provider: &dyn UnicodeDataProvider,
) -> GlyphStream {
    let cache = ShapePlanCache::new();
    shape_with_cache(text, options, font, provider, &cache)
}

/// As [`shape`], but against a caller-supplied [`ShapePlanCache`] so
/// repeated calls against the same font/script/feature combinations
/// skip recompiling their [`crate::ot::Map`] (§5's concurrency model:
/// the cache is `Send + Sync` and may be shared across threads).
pub fn shape_with_cache<'a>(
    text: &str,
    options: &LayoutOptions<'a>,
    font: &'a dyn FontAdapter,
    provider: &dyn UnicodeDataProvider,
    cache: &ShapePlanCache,
) -> GlyphStream {
    let (mut stream, plans) = TextAnalyzer::analyze(text, options, font, provider);
    if plans.is_empty() {
        return stream;
    }

    // Same font list, in the same order, `RunPlan::font_index` was
    // assigned against — so a run shaped from a fallback font (§4.3
    // step 4) is substituted and positioned with that font's own
    // lookups and metrics, not the primary's.
    let fonts = TextAnalyzer::resolve_fonts(font, options);

    complex::setup_masks(&mut stream, provider, &plans, cache);
    SubstitutionEngine::apply_all(&mut stream, &fonts, provider, &plans, cache);
    complex::postprocess(&mut stream, font, &plans);
    PositioningEngine::apply_all(&mut stream, &fonts, &plans, cache, options.apply_kerning);

    stream
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{Coverage, LigatureRule, Lookup, LookupFlags, StaticFontAdapter, Subtable};
    use crate::unicode::UnicodeCrateProvider;
    use std::collections::HashMap;

    fn fi_font() -> StaticFontAdapter {
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
        StaticFontAdapter::new(1000)
            .map('f', 'f' as u32)
            .map('i', 'i' as u32)
            .with_gsub_lookup(lookup, &[crate::tag::feature::STANDARD_LIGATURES])
            .with_default_feature(crate::tag::feature::STANDARD_LIGATURES)
    }

    #[test]
    fn fi_text_shapes_to_single_ligature_glyph() {
        let font = fi_font();
        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();

        let stream = shape("fi", &options, &font, &provider);
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.get(0).glyph_id, 0xFB01);
        assert!(stream.get(0).is_ligated());
        assert_eq!(stream.get(0).codepoint_count, 2);
    }

    #[test]
    fn empty_text_shapes_to_empty_stream() {
        let font = StaticFontAdapter::new(1000);
        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();

        let stream = shape("", &options, &font, &provider);
        assert_eq!(stream.len(), 0);
    }

    #[test]
    fn arabic_run_gets_isolated_form_masks_applied() {
        // "سلام" (Seen-Lam-Alef-Meem): feeds the Arabic joining
        // automaton; every slot should come out with a non-Arabic
        // glyph id replaced only if the font declares an isol/fina/
        // medi/init lookup - here we only assert the pipeline runs
        // without panicking and preserves codepoint count, matching
        // §8's "no glyph loss across the complex shaper" property.
        let font = StaticFontAdapter::new(1000);
        let provider = UnicodeCrateProvider;
        let options = LayoutOptions::new();

        let before_cp_count = "سلام".chars().count() as u32;
        let stream = shape("سلام", &options, &font, &provider);
        assert_eq!(stream.total_codepoint_count(), before_cp_count);
        assert!(stream.is_offset_monotonic());
    }
}
