//! C1: GlyphStream — the mutable glyph/character buffer shared by every
//! shaping stage. Grounded on rustybuzz's `Buffer`/`GlyphInfo` pair: the
//! packed ligature-id/component/class fields on `GlyphInfo` became the
//! `Slot` fields below, and the buffer-level `BufferScratchFlags` idiom
//! from `src/complex/arabic.rs` is reused here as [`GlyphStreamFlags`].

use bitflags::bitflags;

use crate::{Direction, Mask, Tag};

bitflags! {
    /// Monotonic, set-once bits recording what has happened to a slot.
    /// Spec §3 "flags: {is_substituted, is_ligated, is_decomposed,
    /// is_multiplied}".
    #[derive(Default)]
    pub struct SlotFlags: u8 {
        const SUBSTITUTED = 1 << 0;
        const LIGATED     = 1 << 1;
        const DECOMPOSED  = 1 << 2;
        const MULTIPLIED  = 1 << 3;
        /// `x_offset`/`y_offset` were seeded by the Arabic `stch`
        /// complex-shaper postprocess (§9's GSUB-pause substitute),
        /// not by a GPOS lookup. PositioningEngine's advance/offset
        /// reseed (its idempotency guard) must leave these alone since
        /// they run before it, not inside it.
        const STCH_OFFSET = 1 << 4;
    }
}

bitflags! {
    /// Buffer-wide scratch flags, set by one stage and consumed by a
    /// later one so it doesn't have to rescan the whole stream.
    #[derive(Default)]
    pub struct GlyphStreamFlags: u32 {
        /// Arabic stretch ('stch') tiles were produced; C4's
        /// postprocess step must run [`crate::complex::arabic::apply_stch`].
        const HAS_STCH = 1 << 0;
        /// At least one default-ignorable codepoint is present.
        const HAS_DEFAULT_IGNORABLES = 1 << 1;
        /// At least one combining mark is present (may need fallback
        /// mark positioning if GPOS has no relevant lookup).
        const HAS_NON_ASCII_MARKS = 1 << 2;
    }
}

/// Identifies the text run (font, size, style) a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RunId(pub u32);

/// One element of a [`GlyphStream`]. See spec.md §3 for the field-level
/// contract and invariants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub source_offset: u32,
    pub codepoint: u32,
    pub codepoint_count: u16,
    pub glyph_id: u32,
    pub direction: Direction,
    pub script: Tag,
    pub run_ref: RunId,
    /// Compact realization of spec §3's "ordered set of (FeatureTag,
    /// enabled)": each bit is a feature slot assigned by the active
    /// [`crate::ot::Map`], following rustybuzz's `hb_mask_t` approach
    /// rather than storing a `Vec<(Tag, bool)>` per slot.
    pub mask: Mask,
    pub ligature_id: u32,
    pub ligature_component: i16,
    pub mark_attachment: i16,
    pub cursive_attachment: i16,
    pub flags: SlotFlags,
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

impl Slot {
    pub fn new(source_offset: u32, codepoint: u32, run_ref: RunId) -> Self {
        Slot {
            source_offset,
            codepoint,
            codepoint_count: 1,
            glyph_id: 0,
            direction: Direction::Ltr,
            script: Tag(0),
            run_ref,
            mask: 0,
            ligature_id: 0,
            ligature_component: -1,
            mark_attachment: -1,
            cursive_attachment: -1,
            flags: SlotFlags::empty(),
            x_advance: 0,
            y_advance: 0,
            x_offset: 0,
            y_offset: 0,
        }
    }

    #[inline]
    pub fn is_substituted(&self) -> bool {
        self.flags.contains(SlotFlags::SUBSTITUTED)
    }

    #[inline]
    pub fn is_ligated(&self) -> bool {
        self.flags.contains(SlotFlags::LIGATED)
    }

    #[inline]
    pub fn is_decomposed(&self) -> bool {
        self.flags.contains(SlotFlags::DECOMPOSED)
    }

    #[inline]
    pub fn is_multiplied(&self) -> bool {
        self.flags.contains(SlotFlags::MULTIPLIED)
    }
}

/// Default pre-allocation for a fresh stream; doubled thereafter
/// (spec §4.1 "Capacity policy: ... grow by max(requested, 2x current)").
const INITIAL_CAPACITY: usize = 32;

/// C1: an ordered, mutable sequence of shaping slots.
///
/// Owned exclusively by one shaping call for its lifetime (§5); not
/// `Sync`. Backed by a pooled `Vec<Slot>` so repeated shaping calls on
/// one thread reuse the same allocation (§4.1 "Capacity policy").
pub struct GlyphStream {
    slots: Vec<Slot>,
    next_ligature_id: u32,
    scratch_flags: GlyphStreamFlags,
    offset_cursor: usize,
}

impl GlyphStream {
    pub fn new() -> Self {
        GlyphStream {
            slots: Vec::with_capacity(INITIAL_CAPACITY),
            next_ligature_id: 1,
            scratch_flags: GlyphStreamFlags::empty(),
            offset_cursor: 0,
        }
    }

    /// Takes a stream out of the thread-local pool, or allocates a new
    /// one if the pool is empty.
    pub fn from_pool() -> Self {
        POOL.with(|pool| {
            pool.borrow_mut()
                .pop()
                .unwrap_or_else(GlyphStream::new)
        })
    }

    /// Clears the stream and returns its backing storage to the pool.
    pub fn recycle(mut self) {
        self.clear();
        POOL.with(|pool| pool.borrow_mut().push(self));
    }

    /// Empties the stream; resets the ligature-id counter to 1 per §9
    /// "Ligature id allocation ... Reset to 1 on clear."
    pub fn clear(&mut self) {
        self.slots.clear();
        self.next_ligature_id = 1;
        self.scratch_flags = GlyphStreamFlags::empty();
        self.offset_cursor = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Slot] {
        &self.slots
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    #[inline]
    pub fn scratch_flags(&self) -> GlyphStreamFlags {
        self.scratch_flags
    }

    #[inline]
    pub fn set_scratch_flags(&mut self, flags: GlyphStreamFlags) {
        self.scratch_flags = flags;
    }

    /// Allocates a fresh, monotonically increasing ligature cohort id.
    pub fn allocate_ligature_id(&mut self) -> u32 {
        let id = self.next_ligature_id;
        self.next_ligature_id += 1;
        id
    }

    /// O(1) amortized append.
    pub fn append(&mut self, slot: Slot) {
        if self.slots.len() == self.slots.capacity() {
            let new_cap = (self.slots.capacity() * 2).max(self.slots.len() + 1);
            self.slots.reserve(new_cap - self.slots.capacity());
        }
        self.slots.push(slot);
    }

    #[inline]
    pub fn get(&self, i: usize) -> &Slot {
        &self.slots[i]
    }

    #[inline]
    pub fn get_mut(&mut self, i: usize) -> &mut Slot {
        &mut self.slots[i]
    }

    /// Relocates a single slot preserving the order of the rest.
    /// O(|from - to|).
    pub fn move_slot(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let slot = self.slots.remove(from);
        self.slots.insert(to, slot);
    }

    /// Insertion-sort-style stable reordering over `[start, end)`.
    /// Required because ordering constraints apply to small local
    /// windows (5-20 slots; §4.1) and must preserve source_offset-tie
    /// stability.
    pub fn stable_sort<F>(&mut self, start: usize, end: usize, mut cmp: F)
    where
        F: FnMut(&Slot, &Slot) -> std::cmp::Ordering,
    {
        for i in (start + 1)..end {
            let mut j = i;
            while j > start && cmp(&self.slots[j - 1], &self.slots[j]) == std::cmp::Ordering::Greater {
                self.slots.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    /// 1:1 substitution. Preserves source_offset, codepoint,
    /// codepoint_count; clears ligature/attachment fields; sets
    /// `is_substituted`.
    pub fn replace_1_1(&mut self, i: usize, new_glyph_id: u32) {
        let slot = &mut self.slots[i];
        slot.glyph_id = new_glyph_id;
        slot.ligature_id = 0;
        slot.ligature_component = -1;
        slot.mark_attachment = -1;
        slot.cursive_attachment = -1;
        slot.flags.insert(SlotFlags::SUBSTITUTED);
    }

    /// Ligature (N:1) substitution: removes `removal_indices` (processed
    /// right-to-left so earlier indices stay valid), accumulates their
    /// `codepoint_count` into `target_i`, and sets the representative
    /// codepoint to the first non-default-ignorable/non-ZWJ component,
    /// determined by the caller and passed as `representative_codepoint`
    /// (per §9's open question: the representative must be chosen from
    /// among components *before* ligation, not from a stale previous
    /// value).
    pub fn ligate(
        &mut self,
        target_i: usize,
        mut removal_indices: Vec<usize>,
        new_glyph_id: u32,
        representative_codepoint: u32,
        ligature_id: u32,
    ) {
        removal_indices.sort_unstable();
        let mut extra_count: u16 = 0;
        // Right-to-left so indices above target_i stay valid as we remove.
        for &idx in removal_indices.iter().rev() {
            extra_count += self.slots[idx].codepoint_count;
            self.slots.remove(idx);
        }

        let slot = &mut self.slots[target_i];
        slot.glyph_id = new_glyph_id;
        slot.codepoint = representative_codepoint;
        slot.codepoint_count += extra_count;
        slot.ligature_id = ligature_id;
        slot.ligature_component = 0;
        slot.mark_attachment = -1;
        slot.cursive_attachment = -1;
        slot.flags.insert(SlotFlags::LIGATED);
    }

    /// Multiple (1:N) substitution. Replaces slot `i` with the first id
    /// and inserts `new_glyph_ids.len() - 1` additional slots after it;
    /// all carry the original source_offset; `ligature_component` is
    /// assigned 0..k-1; `is_decomposed` is set on all. `N=0` removes the
    /// slot entirely (§4.1 "N=0 tolerated").
    pub fn decompose(&mut self, i: usize, new_glyph_ids: &[u32]) {
        if new_glyph_ids.is_empty() {
            self.slots.remove(i);
            return;
        }

        let base = self.slots[i];
        {
            let slot = &mut self.slots[i];
            slot.glyph_id = new_glyph_ids[0];
            slot.ligature_component = 0;
            slot.flags.insert(SlotFlags::DECOMPOSED);
            if new_glyph_ids.len() > 1 {
                slot.flags.insert(SlotFlags::MULTIPLIED);
            }
        }

        for (k, &gid) in new_glyph_ids.iter().enumerate().skip(1) {
            let mut new_slot = base;
            new_slot.glyph_id = gid;
            new_slot.codepoint_count = 0;
            new_slot.ligature_component = k as i16;
            new_slot.flags.insert(SlotFlags::DECOMPOSED);
            new_slot.flags.insert(SlotFlags::MULTIPLIED);
            self.slots.insert(i + k, new_slot);
        }
    }

    /// Deletes `count` slots starting at `i`.
    pub fn remove(&mut self, i: usize, count: usize) {
        self.slots.drain(i..i + count);
    }

    /// Inserts a duplicate slot at `i`, shifting everything at and
    /// after `i` right by one. Used by Arabic `stch` tile expansion
    /// (§4.3's complex-shaper postprocessing), which needs extra glyph
    /// copies beyond what `decompose` produces since the copies aren't
    /// tied to one source codepoint's original 1:N mapping.
    pub fn insert_copy(&mut self, i: usize, slot: Slot) {
        self.slots.insert(i, slot);
    }

    /// Returns the index range of all slots whose `source_offset ==
    /// offset`, scanning forward from an internal cursor. Callers are
    /// expected to query in ascending offset order (§4.1).
    pub fn query_by_offset(&mut self, offset: u32) -> &[Slot] {
        if self.offset_cursor < self.slots.len() && self.slots[self.offset_cursor].source_offset > offset {
            self.offset_cursor = 0;
        }
        while self.offset_cursor < self.slots.len()
            && self.slots[self.offset_cursor].source_offset < offset
        {
            self.offset_cursor += 1;
        }
        let start = self.offset_cursor;
        let mut end = start;
        while end < self.slots.len() && self.slots[end].source_offset == offset {
            end += 1;
        }
        &self.slots[start..end]
    }

    /// Property #2 (§8): sum of `codepoint_count` over all slots.
    pub fn total_codepoint_count(&self) -> u32 {
        self.slots.iter().map(|s| s.codepoint_count as u32).sum()
    }

    /// Property #1 (§8): source_offset is non-decreasing across the
    /// stream.
    pub fn is_offset_monotonic(&self) -> bool {
        self.slots.windows(2).all(|w| w[0].source_offset <= w[1].source_offset)
    }
}

impl Default for GlyphStream {
    fn default() -> Self {
        GlyphStream::new()
    }
}

thread_local! {
    static POOL: std::cell::RefCell<Vec<GlyphStream>> = std::cell::RefCell::new(Vec::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_n(buf: &mut GlyphStream, n: u32) {
        for i in 0..n {
            buf.append(Slot::new(i, 'a' as u32 + i, RunId(0)));
        }
    }

    #[test]
    fn append_and_len() {
        let mut buf = GlyphStream::new();
        push_n(&mut buf, 5);
        assert_eq!(buf.len(), 5);
        assert!(buf.is_offset_monotonic());
    }

    #[test]
    fn replace_1_1_preserves_offset_and_count() {
        let mut buf = GlyphStream::new();
        push_n(&mut buf, 3);
        buf.replace_1_1(1, 42);
        assert_eq!(buf.get(1).glyph_id, 42);
        assert_eq!(buf.get(1).source_offset, 1);
        assert_eq!(buf.get(1).codepoint_count, 1);
        assert!(buf.get(1).is_substituted());
    }

    #[test]
    fn ligate_fi_ligature() {
        // "fi" -> single ligature slot, matching the §8 "fi ligature"
        // end-to-end scenario.
        let mut buf = GlyphStream::new();
        buf.append(Slot::new(0, 'f' as u32, RunId(0)));
        buf.append(Slot::new(0, 'i' as u32, RunId(0)));
        let id = buf.allocate_ligature_id();
        buf.ligate(0, vec![1], 0xFB01, 'f' as u32, id);

        assert_eq!(buf.len(), 1);
        let slot = buf.get(0);
        assert_eq!(slot.source_offset, 0);
        assert_eq!(slot.codepoint_count, 2);
        assert!(slot.is_ligated());
        assert_eq!(slot.ligature_id, 1);
    }

    #[test]
    fn decompose_splits_into_n_slots() {
        let mut buf = GlyphStream::new();
        buf.append(Slot::new(5, 0x0958, RunId(0)));
        buf.decompose(0, &[10, 11]);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.get(0).source_offset, 5);
        assert_eq!(buf.get(1).source_offset, 5);
        assert_eq!(buf.get(0).ligature_component, 0);
        assert_eq!(buf.get(1).ligature_component, 1);
        assert!(buf.get(0).is_decomposed());
        assert!(buf.get(1).is_multiplied());
        // §3 invariant 2: a 1:N split must not inflate the stream's
        // total codepoint count; only slot 0 keeps the original count.
        assert_eq!(buf.get(0).codepoint_count, 1);
        assert_eq!(buf.get(1).codepoint_count, 0);
        assert_eq!(buf.total_codepoint_count(), 1);
    }

    #[test]
    fn decompose_zero_removes_slot() {
        let mut buf = GlyphStream::new();
        push_n(&mut buf, 2);
        buf.decompose(0, &[]);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.get(0).source_offset, 1);
    }

    #[test]
    fn remove_deletes_range() {
        let mut buf = GlyphStream::new();
        push_n(&mut buf, 4);
        buf.remove(1, 2);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.get(1).source_offset, 3);
    }

    #[test]
    fn query_by_offset_ascending_scan() {
        let mut buf = GlyphStream::new();
        buf.append(Slot::new(0, 'a' as u32, RunId(0)));
        buf.append(Slot::new(0, 'b' as u32, RunId(0))); // decomposed pair
        buf.append(Slot::new(1, 'c' as u32, RunId(0)));

        assert_eq!(buf.query_by_offset(0).len(), 2);
        assert_eq!(buf.query_by_offset(1).len(), 1);
    }

    #[test]
    fn stable_sort_preserves_ties() {
        let mut buf = GlyphStream::new();
        buf.append(Slot::new(0, 'a' as u32, RunId(0)));
        buf.append(Slot::new(0, 'b' as u32, RunId(0)));
        buf.append(Slot::new(0, 'c' as u32, RunId(0)));
        // Reverse visual order for a 3-slot window, by codepoint.
        buf.stable_sort(0, 3, |a, b| b.codepoint.cmp(&a.codepoint));
        assert_eq!(buf.get(0).codepoint, 'c' as u32);
        assert_eq!(buf.get(2).codepoint, 'a' as u32);
    }

    #[test]
    fn pool_roundtrip_reuses_allocation() {
        let mut buf = GlyphStream::from_pool();
        push_n(&mut buf, 10);
        let cap_before = buf.as_slice().len();
        buf.recycle();

        let buf2 = GlyphStream::from_pool();
        assert_eq!(buf2.len(), 0);
        assert_eq!(cap_before, 10);
    }

    #[test]
    fn codepoint_conservation_after_ligation() {
        let mut buf = GlyphStream::new();
        push_n(&mut buf, 4);
        let before = buf.total_codepoint_count();
        let id = buf.allocate_ligature_id();
        buf.ligate(0, vec![1], 99, 'a' as u32, id);
        assert_eq!(buf.total_codepoint_count(), before);
    }
}
