//! `ShapePlan`/`ShapePlanCache` — the ambient configuration-caching
//! layer named in SPEC_FULL's "Configuration" section, shaped after
//! rustybuzz's `ot::ShapePlan`/`ot::shape_plan` module but holding a
//! compiled [`Map`] directly instead of an FFI handle, so repeated
//! shaping calls with the same script/language/feature-set/font don't
//! re-walk the font's lookup tables.

use std::collections::HashMap;
use std::sync::Mutex;

use super::Map;
use crate::Tag;

#[derive(Debug, Clone)]
pub struct ShapePlan {
    pub script: Tag,
    pub lang: Option<Tag>,
    pub map: Map,
}

impl ShapePlan {
    pub fn compile(script: Tag, lang: Option<Tag>, active_features: &[Tag]) -> Self {
        ShapePlan {
            script,
            lang,
            map: Map::compile(active_features),
        }
    }
}

/// Cache key: script + language + the sorted, deduplicated active
/// feature set. Callers that vary font per call should keep one
/// `ShapePlanCache` per font, since the cache itself is font-agnostic.
type CacheKey = (Tag, Option<Tag>, Vec<Tag>);

/// A small `Mutex`-guarded plan cache. Shaping calls on different
/// threads may share one cache; contention is expected to be rare
/// since plans are looked up once per run, not once per slot.
#[derive(Default)]
pub struct ShapePlanCache {
    plans: Mutex<HashMap<CacheKey, ShapePlan>>,
}

impl ShapePlanCache {
    pub fn new() -> Self {
        ShapePlanCache {
            plans: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a cached plan for this key, compiling and inserting one
    /// if absent.
    pub fn get_or_compile(&self, script: Tag, lang: Option<Tag>, active_features: &[Tag]) -> ShapePlan {
        let mut key_features = active_features.to_vec();
        key_features.sort_by_key(|t| t.0);
        key_features.dedup();
        let key = (script, lang, key_features.clone());

        let mut plans = self.plans.lock().unwrap();
        plans
            .entry(key)
            .or_insert_with(|| ShapePlan::compile(script, lang, &key_features))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.plans.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_plan_by_script_lang_and_feature_set() {
        let cache = ShapePlanCache::new();
        let liga = Tag::new(b"liga");
        let latn = crate::tag::script::LATIN;

        let a = cache.get_or_compile(latn, None, &[liga]);
        let b = cache.get_or_compile(latn, None, &[liga]);
        assert_eq!(cache.len(), 1);
        assert_eq!(a.map.mask_for(liga), b.map.mask_for(liga));
    }

    #[test]
    fn distinct_feature_sets_get_distinct_entries() {
        let cache = ShapePlanCache::new();
        let latn = crate::tag::script::LATIN;
        cache.get_or_compile(latn, None, &[Tag::new(b"liga")]);
        cache.get_or_compile(latn, None, &[Tag::new(b"kern")]);
        assert_eq!(cache.len(), 2);
    }
}
