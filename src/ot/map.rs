//! Feature-to-mask compiler. Grounded on rustybuzz's `ot::Map`
//! (`add_feature`, `get_1_mask`): rather than re-testing "is this
//! feature active" by string/tag comparison at every slot, each active
//! feature is assigned one bit of a [`crate::Mask`] up front, and
//! lookups test eligibility against that compiled mask.

use std::collections::HashMap;

use crate::{Mask, Tag};

/// Bits 0..=30 are feature slots; bit 31 is a shared "overflow" slot
/// for any feature beyond the 31 a single run can distinctly track
/// (real HarfBuzz has the same kind of allotment ceiling per shaping
/// plan). In practice a single script run activates far fewer than 31
/// features, so the overflow bit is rarely exercised.
const MAX_DISTINCT_BITS: usize = 31;

#[derive(Debug, Clone, Default)]
pub struct Map {
    feature_masks: HashMap<Tag, Mask>,
}

impl Map {
    /// Assigns one mask bit per tag in `active_features` (deduplicated).
    /// Mirrors rustybuzz's `ShapePlan::collect_features` +
    /// `Map::add_feature` pass, done once per run instead of per slot.
    pub fn compile(active_features: &[Tag]) -> Self {
        let mut feature_masks = HashMap::new();
        let mut next_bit = 0usize;
        for &tag in active_features {
            if feature_masks.contains_key(&tag) {
                continue;
            }
            let bit = if next_bit < MAX_DISTINCT_BITS {
                next_bit
            } else {
                MAX_DISTINCT_BITS
            };
            feature_masks.insert(tag, 1u32 << bit);
            next_bit += 1;
        }
        Map { feature_masks }
    }

    /// `get_1_mask` equivalent: the bit assigned to one feature, or 0
    /// if it isn't active in this compiled plan.
    pub fn mask_for(&self, tag: Tag) -> Mask {
        self.feature_masks.get(&tag).copied().unwrap_or(0)
    }

    /// OR of every active tag's bit; used to stamp a run's slots in one
    /// pass during text analysis.
    pub fn global_mask(&self) -> Mask {
        self.feature_masks.values().fold(0, |acc, m| acc | m)
    }

    /// True if any of `lookup_features` is active in this plan — the
    /// §4.4 "a lookup is eligible if any of its features is active"
    /// rule.
    pub fn is_lookup_eligible(&self, lookup_features: &[Tag]) -> bool {
        lookup_features.iter().any(|tag| self.feature_masks.contains_key(tag))
    }

    pub fn active_features(&self) -> Vec<Tag> {
        self.feature_masks.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_tags_get_distinct_bits() {
        let liga = Tag::new(b"liga");
        let kern = Tag::new(b"kern");
        let map = Map::compile(&[liga, kern]);
        assert_ne!(map.mask_for(liga), 0);
        assert_ne!(map.mask_for(kern), 0);
        assert_ne!(map.mask_for(liga), map.mask_for(kern));
    }

    #[test]
    fn inactive_tag_has_zero_mask() {
        let map = Map::compile(&[Tag::new(b"liga")]);
        assert_eq!(map.mask_for(Tag::new(b"calt")), 0);
    }

    #[test]
    fn lookup_eligible_when_any_feature_active() {
        let liga = Tag::new(b"liga");
        let map = Map::compile(&[liga]);
        assert!(map.is_lookup_eligible(&[liga, Tag::new(b"calt")]));
        assert!(!map.is_lookup_eligible(&[Tag::new(b"calt")]));
    }
}
