//! A literal, in-memory `FontAdapter` used as a test/fixture double.
//! Since the binary OpenType parser is an out-of-scope collaborator
//! (§1/§6), this is how the engine's own tests exercise C3-C6 without
//! a real font file — analogous to rustybuzz's own unit tests driving
//! shaping against small hand-crafted tables, but expressed directly as
//! Rust literals instead of binary fixtures.

use std::collections::HashMap;

use super::{FontAdapter, GlyphClass, GlyphMetrics, Lookup, Stage};
use crate::Tag;

#[derive(Default)]
pub struct StaticFontAdapter {
    pub units_per_em: u16,
    pub cmap: HashMap<u32, u32>,
    pub metrics: HashMap<u32, GlyphMetrics>,
    pub glyph_classes: HashMap<u32, GlyphClass>,
    pub mark_attachment_classes: HashMap<u32, u8>,
    pub kern_pairs: HashMap<(u32, u32), (i32, i32)>,
    pub default_features: Vec<Tag>,
    /// (stage, lookup_index) -> lookup, in font-declared order.
    pub gsub_lookups: Vec<Lookup>,
    pub gpos_lookups: Vec<Lookup>,
    /// (stage, lookup_index) -> feature tags that enable it, for every
    /// (script, lang) — fixtures don't need per-script variance.
    pub gsub_features: HashMap<usize, Vec<Tag>>,
    pub gpos_features: HashMap<usize, Vec<Tag>>,
}

impl StaticFontAdapter {
    pub fn new(units_per_em: u16) -> Self {
        StaticFontAdapter {
            units_per_em,
            ..Default::default()
        }
    }

    pub fn map(mut self, cp: char, glyph_id: u32) -> Self {
        self.cmap.insert(cp as u32, glyph_id);
        self
    }

    pub fn with_metrics(mut self, glyph_id: u32, m: GlyphMetrics) -> Self {
        self.metrics.insert(glyph_id, m);
        self
    }

    pub fn with_glyph_class(mut self, glyph_id: u32, class: GlyphClass) -> Self {
        self.glyph_classes.insert(glyph_id, class);
        self
    }

    pub fn with_kern_pair(mut self, left: u32, right: u32, x: i32, y: i32) -> Self {
        self.kern_pairs.insert((left, right), (x, y));
        self
    }

    pub fn with_gsub_lookup(mut self, lookup: Lookup, features: &[Tag]) -> Self {
        let idx = self.gsub_lookups.len();
        self.gsub_lookups.push(lookup);
        self.gsub_features.insert(idx, features.to_vec());
        self
    }

    pub fn with_gpos_lookup(mut self, lookup: Lookup, features: &[Tag]) -> Self {
        let idx = self.gpos_lookups.len();
        self.gpos_lookups.push(lookup);
        self.gpos_features.insert(idx, features.to_vec());
        self
    }

    pub fn with_default_feature(mut self, tag: Tag) -> Self {
        self.default_features.push(tag);
        self
    }
}

impl FontAdapter for StaticFontAdapter {
    fn map_codepoint(&self, cp: u32) -> u32 {
        self.cmap.get(&cp).copied().unwrap_or(0)
    }

    fn metrics(&self, glyph_id: u32) -> GlyphMetrics {
        self.metrics.get(&glyph_id).copied().unwrap_or_default()
    }

    fn units_per_em(&self) -> u16 {
        if self.units_per_em == 0 {
            1000
        } else {
            self.units_per_em
        }
    }

    fn lookups(&self, stage: Stage, _script: Tag, _lang: Option<Tag>) -> Vec<(usize, &Lookup)> {
        let list = match stage {
            Stage::Substitution => &self.gsub_lookups,
            Stage::Positioning => &self.gpos_lookups,
        };
        list.iter().enumerate().collect()
    }

    fn features_for_lookup(
        &self,
        stage: Stage,
        _script: Tag,
        _lang: Option<Tag>,
        lookup_index: usize,
    ) -> Vec<Tag> {
        let map = match stage {
            Stage::Substitution => &self.gsub_features,
            Stage::Positioning => &self.gpos_features,
        };
        map.get(&lookup_index).cloned().unwrap_or_default()
    }

    fn feature_enabled_by_default(&self, tag: Tag) -> bool {
        self.default_features.contains(&tag)
    }

    fn glyph_class(&self, glyph_id: u32) -> GlyphClass {
        self.glyph_classes.get(&glyph_id).copied().unwrap_or(GlyphClass::Unknown)
    }

    fn mark_attachment_class(&self, glyph_id: u32) -> u8 {
        self.mark_attachment_classes.get(&glyph_id).copied().unwrap_or(0)
    }

    fn kern_pair(&self, left: u32, right: u32) -> Option<(i32, i32)> {
        self.kern_pairs.get(&(left, right)).copied()
    }
}
