//! Per-script "complex shaper" hooks: joining-type state machines, mark
//! reordering, and subtending-mark stretch handling that a purely
//! generic GSUB/GPOS engine can't produce on its own. Grounded on
//! rustybuzz's per-script `complex::{arabic, ...}` module split and its
//! `collect_features` / `setup_masks` / `postprocess_glyphs` hook
//! names, generalized off FFI buffer pointers onto this crate's
//! `GlyphStream`/`Slot`. Exercised directly by spec.md §8's Arabic
//! joining and Devanagari reorder scenarios.

pub mod arabic;
pub mod devanagari;

use crate::analyze::RunPlan;
use crate::buffer::GlyphStream;
use crate::font::FontAdapter;
use crate::ot::ShapePlanCache;
use crate::tag::script;
use crate::unicode::UnicodeDataProvider;
use crate::Tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shaper {
    Default,
    Arabic,
    Devanagari,
}

fn shaper_for(script_tag: Tag) -> Shaper {
    if script_tag == script::ARABIC || script_tag == script::SYRIAC || script_tag == script::MONGOLIAN {
        Shaper::Arabic
    } else if script_tag == script::DEVANAGARI {
        Shaper::Devanagari
    } else {
        Shaper::Default
    }
}

/// Walks `plans` in stream order, yielding each run's current `[start,
/// end)` slot range. Safe to call both before and after GSUB has
/// changed the slot count, since it re-scans by `run_ref` rather than
/// trusting stale indices.
fn for_each_run<F: FnMut(&RunPlan, usize, usize)>(stream: &GlyphStream, plans: &[RunPlan], mut f: F) {
    let mut cursor = 0usize;
    for plan in plans {
        let start = cursor;
        let mut end = start;
        while end < stream.len() && stream.get(end).run_ref == plan.run_id {
            end += 1;
        }
        f(plan, start, end);
        cursor = end;
    }
}

/// Runs before GSUB (§4.3 step 6's feature plan is already compiled by
/// here): Arabic/Syriac/Mongolian joining-type assignment, which gates
/// each slot's mask so C4 only applies the isol/fina/medi/init feature
/// the joining state machine actually selected for that slot (rather
/// than every arabic-form feature at every slot); and Devanagari
/// pre-base matra reordering, which must happen before GSUB since
/// ligature/conjunct lookups expect the reordered sequence.
pub(crate) fn setup_masks(
    stream: &mut GlyphStream,
    provider: &dyn UnicodeDataProvider,
    plans: &[RunPlan],
    cache: &ShapePlanCache,
) {
    let mut jobs: Vec<(Shaper, Tag, usize, usize, Vec<Tag>)> = Vec::new();
    for_each_run(stream, plans, |plan, start, end| {
        jobs.push((shaper_for(plan.script), plan.script, start, end, plan.features.clone()));
    });

    for (shaper, script_tag, start, end, features) in jobs {
        match shaper {
            Shaper::Arabic => {
                let shape_plan = cache.get_or_compile(script_tag, None, &features);
                arabic::reorder_marks(stream, provider, start, end);
                arabic::setup_masks(stream, provider, &shape_plan.map, script_tag, start, end);
            }
            Shaper::Devanagari => {
                devanagari::reorder_pre_base_matras(stream, provider, start, end);
            }
            Shaper::Default => {}
        }
    }
}

/// Runs after GSUB, before GPOS: Arabic stretch-tile (`stch`) recording
/// and expansion, matching the two-pass measure/cut approach of
/// rustybuzz's `postprocess_glyphs_arabic`.
pub(crate) fn postprocess(stream: &mut GlyphStream, font: &dyn FontAdapter, plans: &[RunPlan]) {
    let mut jobs: Vec<(Shaper, usize, usize)> = Vec::new();
    for_each_run(stream, plans, |plan, start, end| {
        jobs.push((shaper_for(plan.script), start, end));
    });

    // Process back-to-front so earlier jobs' indices stay valid as a
    // later (rightward) job inserts stretch-tile copies.
    for (shaper, start, end) in jobs.into_iter().rev() {
        if shaper == Shaper::Arabic {
            arabic::record_stch(stream, start, end);
            arabic::apply_stch(stream, font, start, end);
        }
    }
}
