//! The OpenType rewrite engines (C4/C5) and their shared feature-to-mask
//! compiler. Grounded on rustybuzz's `ot` module split (`ot::Map`,
//! `ot::shape_plan`) and on `arabic.rs`'s skip-filter usage, generalized
//! off FFI buffer pointers onto [`crate::buffer::GlyphStream`] and
//! [`crate::font::FontAdapter`].

mod map;
mod position;
mod shape_plan;
mod substitute;

pub use map::Map;
pub use position::PositioningEngine;
pub use shape_plan::{ShapePlan, ShapePlanCache};
pub use substitute::SubstitutionEngine;

use crate::font::{FontAdapter, GlyphClass, Lookup};
use crate::{Mask, Tag};

/// OR of the mask bits a lookup's feature tags were assigned by `map`.
/// Used together with [`slot_is_gated_in`] so a complex shaper (e.g.
/// Arabic's per-slot isol/fina/medi/init assignment) can restrict a
/// run-eligible lookup to only the slots it actually targets.
pub(crate) fn lookup_feature_mask(map: &Map, features: &[Tag]) -> Mask {
    features.iter().fold(0, |acc, &tag| acc | map.mask_for(tag))
}

/// A slot with no complex-shaper mask (`0`, the default) is never
/// gated — every run-eligible lookup applies to it, matching ordinary
/// (non-Arabic-joining) text. A slot that *was* assigned a mask only
/// accepts lookups whose feature bit it carries (§4.4's "setup_masks"
/// idiom from `arabic.rs`, generalized off FFI).
pub(crate) fn slot_is_gated_in(slot_mask: Mask, lookup_feature_mask: Mask) -> bool {
    slot_mask == 0 || (slot_mask & lookup_feature_mask) != 0
}

/// Shared skip-filter predicate (§4.4/§4.5): true if `glyph_id` must be
/// skipped by `lookup`'s flags when scanning for the next eligible
/// slot.
pub(crate) fn is_skipped(font: &dyn FontAdapter, lookup: &Lookup, glyph_id: u32) -> bool {
    use crate::font::LookupFlags;

    let class = font.glyph_class(glyph_id);
    if lookup.flags.contains(LookupFlags::IGNORE_BASE_GLYPHS) && class == GlyphClass::Base {
        return true;
    }
    if lookup.flags.contains(LookupFlags::IGNORE_LIGATURES) && class == GlyphClass::Ligature {
        return true;
    }
    if lookup.flags.contains(LookupFlags::IGNORE_MARKS) && class == GlyphClass::Mark {
        return true;
    }
    if class == GlyphClass::Mark {
        if let Some(set) = &lookup.mark_filtering_set {
            if lookup.flags.contains(LookupFlags::USE_MARK_FILTERING_SET) && !set.contains(&glyph_id) {
                return true;
            }
        }
        if lookup.mark_attachment_type != 0 && font.mark_attachment_class(glyph_id) != lookup.mark_attachment_type {
            return true;
        }
    }
    false
}

/// Finds the next index `>= from` whose slot is not skipped by
/// `lookup`, scanning within `[from, end)`. Returns `None` if none
/// found; used by contextual matching to walk input/lookahead
/// sequences "through" ignored slots (§4.4 "skipped slots may still
/// participate as context").
pub(crate) fn next_eligible(
    stream: &crate::buffer::GlyphStream,
    font: &dyn FontAdapter,
    lookup: &Lookup,
    from: usize,
    end: usize,
) -> Option<usize> {
    (from..end).find(|&i| !is_skipped(font, lookup, stream.get(i).glyph_id))
}

/// Symmetric backward walk, used by backtrack matching and reverse
/// chaining substitution.
pub(crate) fn prev_eligible(
    stream: &crate::buffer::GlyphStream,
    font: &dyn FontAdapter,
    lookup: &Lookup,
    from: usize,
) -> Option<usize> {
    (0..=from).rev().find(|&i| !is_skipped(font, lookup, stream.get(i).glyph_id))
}

/// Shared (backtrack, input, lookahead) matcher used by both C4's
/// contextual/chaining-contextual substitution and C5's contextual
/// positioning (§4.4/§4.5 "symmetric to C4").
pub(crate) fn match_backtrack(
    stream: &crate::buffer::GlyphStream,
    font: &dyn FontAdapter,
    lookup: &Lookup,
    pos: usize,
    backtrack: &[crate::font::Coverage],
) -> bool {
    let mut cursor = if pos == 0 { None } else { Some(pos - 1) };
    for cov in backtrack {
        let i = match cursor.and_then(|c| prev_eligible(stream, font, lookup, c)) {
            Some(i) => i,
            None => return false,
        };
        if !cov.contains(stream.get(i).glyph_id) {
            return false;
        }
        cursor = if i == 0 { None } else { Some(i - 1) };
    }
    true
}

pub(crate) fn match_input(
    stream: &crate::buffer::GlyphStream,
    font: &dyn FontAdapter,
    lookup: &Lookup,
    pos: usize,
    end: usize,
    input: &[crate::font::Coverage],
) -> Option<Vec<usize>> {
    let mut indices = Vec::with_capacity(input.len());
    let mut cursor = pos;
    for (k, cov) in input.iter().enumerate() {
        let i = if k == 0 {
            cursor
        } else {
            next_eligible(stream, font, lookup, cursor + 1, end)?
        };
        if !cov.contains(stream.get(i).glyph_id) {
            return None;
        }
        indices.push(i);
        cursor = i;
    }
    Some(indices)
}

pub(crate) fn match_lookahead(
    stream: &crate::buffer::GlyphStream,
    font: &dyn FontAdapter,
    lookup: &Lookup,
    after: usize,
    end: usize,
    lookahead: &[crate::font::Coverage],
) -> bool {
    let mut cursor = after;
    for cov in lookahead {
        let i = match next_eligible(stream, font, lookup, cursor + 1, end) {
            Some(i) => i,
            None => return false,
        };
        if !cov.contains(stream.get(i).glyph_id) {
            return false;
        }
        cursor = i;
    }
    true
}
