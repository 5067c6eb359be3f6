//! Devanagari (and Indic-script-alike) pre-base matra reordering.
//! Grounded on the same complex-shaper idiom as [`super::arabic`]:
//! rustybuzz keeps one `complex/` submodule per script family that
//! needs buffer-level reordering before GSUB runs. Generalized here to
//! the one reordering rule spec.md §8's "कि" scenario exercises:
//! a pre-base vowel sign (matra) that appears after its consonant in
//! logical order must move before it so the font's conjunct/half-form
//! GSUB lookups see the sequence they expect.

use crate::buffer::GlyphStream;
use crate::unicode::UnicodeDataProvider;

/// Pre-base (left-side) vowel signs across the common Indic scripts.
/// Devanagari's U+093F VOWEL SIGN I is the one spec.md §8 exercises
/// directly ("कि" = 0x0915 KA + 0x093F VOWEL SIGN I, rendered with the
/// matra moved before KA); the rest are the direct analogues in the
/// other Devanagari-derived scripts, included since the reordering
/// rule is identical across the family.
const PRE_BASE_MATRAS: &[u32] = &[
    0x093F, // DEVANAGARI VOWEL SIGN I
    0x09BF, // BENGALI VOWEL SIGN I
    0x0A3F, // GURMUKHI VOWEL SIGN I
    0x0ABF, // GUJARATI VOWEL SIGN I
    0x0B3F, // ORIYA VOWEL SIGN I
];

/// Moves every pre-base matra in `[start, end)` to just before the
/// consonant (and any preceding virama/consonant cluster start) it
/// visually precedes, preserving each slot's `source_offset` so the
/// reorder stays invisible to offset-based queries (§4.1's contract
/// for [`GlyphStream::query_by_offset`]).
pub(crate) fn reorder_pre_base_matras(stream: &mut GlyphStream, _provider: &dyn UnicodeDataProvider, start: usize, end: usize) {
    let mut i = start + 1;
    while i < end {
        let cp = stream.get(i).codepoint;
        if !PRE_BASE_MATRAS.contains(&cp) {
            i += 1;
            continue;
        }

        // Walk back over the consonant cluster the matra attaches to:
        // a single base consonant, or a consonant + virama + consonant
        // conjunct. Devanagari virama is U+094D; conjuncts before a
        // pre-base matra are rare but not reorderable past the matra's
        // own logical-order boundary, so we only cross one base.
        let mut target = i;
        while target > start {
            let prev_cp = stream.get(target - 1).codepoint;
            target -= 1;
            if prev_cp != 0x094D {
                break;
            }
        }

        if target < i {
            stream.move_slot(i, target);
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{RunId, Slot};
    use crate::unicode::UnicodeCrateProvider;

    #[test]
    fn ki_matra_moves_before_consonant() {
        // "कि": KA (0x0915) followed by VOWEL SIGN I (0x093F) in
        // logical order; after reordering the matra slot should sit
        // before KA while keeping its own original source_offset.
        let mut stream = GlyphStream::new();
        stream.append(Slot::new(0, 0x0915, RunId(0)));
        stream.append(Slot::new(1, 0x093F, RunId(0)));

        let provider = UnicodeCrateProvider;
        reorder_pre_base_matras(&mut stream, &provider, 0, 2);

        assert_eq!(stream.get(0).codepoint, 0x093F);
        assert_eq!(stream.get(0).source_offset, 1);
        assert_eq!(stream.get(1).codepoint, 0x0915);
        assert_eq!(stream.get(1).source_offset, 0);
    }

    #[test]
    fn matra_over_conjunct_moves_before_virama_cluster() {
        // KA + VIRAMA + KA + VOWEL SIGN I: the matra should jump past
        // the whole consonant-virama-consonant conjunct.
        let mut stream = GlyphStream::new();
        stream.append(Slot::new(0, 0x0915, RunId(0)));
        stream.append(Slot::new(1, 0x094D, RunId(0)));
        stream.append(Slot::new(2, 0x0915, RunId(0)));
        stream.append(Slot::new(3, 0x093F, RunId(0)));

        let provider = UnicodeCrateProvider;
        reorder_pre_base_matras(&mut stream, &provider, 0, 4);

        assert_eq!(stream.get(0).codepoint, 0x093F);
        assert_eq!(stream.get(1).codepoint, 0x0915);
        assert_eq!(stream.get(2).codepoint, 0x094D);
        assert_eq!(stream.get(3).codepoint, 0x0915);
    }
}
