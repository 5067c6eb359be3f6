//! A `FontAdapter` backed by `ttf-parser`, covering the simple,
//! version-stable tables (`cmap`, `hmtx`/`vmtx`, `head`, `hhea`, `GDEF`
//! glyph classes, legacy `kern`). Grounded on
//! `conradludgate-azul`'s `ParsedFont::from_bytes`/`get_font_metrics`,
//! which reads exactly this set of tables through the same crate.
//!
//! Translating the font's GSUB/GPOS lookup lists into this crate's
//! opaque [`Lookup`]/[`Subtable`] IR is binary-format work that belongs
//! to the out-of-scope OpenType-parser collaborator (§1/§6), so it is
//! not performed here; [`TtfFontAdapter::with_gsub_lookups`] and
//! [`TtfFontAdapter::with_gpos_lookups`] let an integrating crate (the
//! one that owns that translation, the way `conradludgate-azul` owns
//! its `allsorts`-backed translation) supply them.

use std::collections::HashMap;

use super::{FontAdapter, GlyphClass, GlyphMetrics, Lookup, Stage};
use crate::Tag;

pub struct TtfFontAdapter<'a> {
    face: ttf_parser::Face<'a>,
    gsub_lookups: Vec<Lookup>,
    gpos_lookups: Vec<Lookup>,
    gsub_features: HashMap<usize, Vec<Tag>>,
    gpos_features: HashMap<usize, Vec<Tag>>,
    default_features: Vec<Tag>,
}

impl<'a> TtfFontAdapter<'a> {
    pub fn new(data: &'a [u8], face_index: u32) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, face_index).ok()?;
        Some(TtfFontAdapter {
            face,
            gsub_lookups: Vec::new(),
            gpos_lookups: Vec::new(),
            gsub_features: HashMap::new(),
            gpos_features: HashMap::new(),
            default_features: Vec::new(),
        })
    }

    pub fn with_gsub_lookups(mut self, lookups: Vec<Lookup>, features: HashMap<usize, Vec<Tag>>) -> Self {
        self.gsub_lookups = lookups;
        self.gsub_features = features;
        self
    }

    pub fn with_gpos_lookups(mut self, lookups: Vec<Lookup>, features: HashMap<usize, Vec<Tag>>) -> Self {
        self.gpos_lookups = lookups;
        self.gpos_features = features;
        self
    }

    pub fn with_default_features(mut self, tags: Vec<Tag>) -> Self {
        self.default_features = tags;
        self
    }
}

impl<'a> FontAdapter for TtfFontAdapter<'a> {
    fn map_codepoint(&self, cp: u32) -> u32 {
        let ch = match core::char::from_u32(cp) {
            Some(c) => c,
            None => return 0,
        };
        self.face
            .glyph_index(ch)
            .map(|id| id.0 as u32)
            .unwrap_or(0)
    }

    fn metrics(&self, glyph_id: u32) -> GlyphMetrics {
        let id = ttf_parser::GlyphId(glyph_id as u16);
        let advance_x = self.face.glyph_hor_advance(id).unwrap_or(0) as i32;
        let advance_y = self.face.glyph_ver_advance(id).unwrap_or(0) as i32;
        let bearing_x = self.face.glyph_hor_side_bearing(id).unwrap_or(0) as i32;
        let bearing_y = self.face.glyph_ver_side_bearing(id).unwrap_or(0) as i32;
        let bbox = self
            .face
            .glyph_bounding_box(id)
            .map(|b| super::BoundingBox {
                x_min: b.x_min as i32,
                y_min: b.y_min as i32,
                x_max: b.x_max as i32,
                y_max: b.y_max as i32,
            })
            .unwrap_or_default();

        GlyphMetrics {
            advance_x,
            advance_y,
            bearing_x,
            bearing_y,
            bbox,
        }
    }

    fn units_per_em(&self) -> u16 {
        self.face.units_per_em()
    }

    fn lookups(&self, stage: Stage, _script: Tag, _lang: Option<Tag>) -> Vec<(usize, &Lookup)> {
        let list = match stage {
            Stage::Substitution => &self.gsub_lookups,
            Stage::Positioning => &self.gpos_lookups,
        };
        if list.is_empty() {
            log::debug!("no {:?} lookups supplied for this font; degrading to identity", stage);
        }
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
        let id = ttf_parser::GlyphId(glyph_id as u16);
        match self.face.glyph_class(id) {
            Some(ttf_parser::GlyphClass::Base) => GlyphClass::Base,
            Some(ttf_parser::GlyphClass::Ligature) => GlyphClass::Ligature,
            Some(ttf_parser::GlyphClass::Mark) => GlyphClass::Mark,
            Some(ttf_parser::GlyphClass::Component) => GlyphClass::Component,
            _ => GlyphClass::Unknown,
        }
    }

    fn mark_attachment_class(&self, glyph_id: u32) -> u8 {
        let id = ttf_parser::GlyphId(glyph_id as u16);
        self.face.glyph_mark_attachment_class(id).0 as u8
    }

    fn kern_pair(&self, left: u32, right: u32) -> Option<(i32, i32)> {
        let l = ttf_parser::GlyphId(left as u16);
        let r = ttf_parser::GlyphId(right as u16);
        let table = self.face.tables().kern?;
        for subtable in table.subtables {
            if subtable.horizontal {
                if let Some(value) = subtable.glyphs_kerning(l, r) {
                    return Some((value as i32, 0));
                }
            }
        }
        None
    }
}
