//! C2: FontAdapter — a read-only facade over one font. Grounded on
//! rustybuzz's `Font`/`ffi::hb_font_t` facade and on its `ot::shape_plan`
//! module's way of asking a font for its declared lookup order; the
//! binary OpenType table parser itself stays out of scope (§1) behind
//! this trait.

mod fixture;
mod ttf;

pub use fixture::StaticFontAdapter;
pub use ttf::TtfFontAdapter;

use crate::Tag;
use std::collections::HashSet;

/// Which of the two OpenType rewrite stages a lookup belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Substitution,
    Positioning,
}

/// GDEF glyph class, used by the skip-filter predicate shared by C4/C5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphClass {
    Unknown,
    Base,
    Ligature,
    Mark,
    Component,
}

/// Font metrics for one glyph, in design units (§4.2).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlyphMetrics {
    pub advance_x: i32,
    pub advance_y: i32,
    pub bearing_x: i32,
    pub bearing_y: i32,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

/// A 2D anchor point in design units, used by cursive and mark
/// attachment subtables.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

/// The set of glyph ids a subtable applies to. Opaque rule data per
/// spec §4.2 ("the engine treats subtables as opaque rule data");
/// concretely a set, since coverage-table *parsing* is the out-of-scope
/// collaborator's job, not this engine's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage(pub HashSet<u32>);

impl Coverage {
    pub fn new() -> Self {
        Coverage(HashSet::new())
    }

    pub fn from_glyphs<I: IntoIterator<Item = u32>>(glyphs: I) -> Self {
        Coverage(glyphs.into_iter().collect())
    }

    #[inline]
    pub fn contains(&self, glyph_id: u32) -> bool {
        self.0.contains(&glyph_id)
    }
}

/// One nested lookup application inside a contextual rule, at a given
/// input-sequence position.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedLookup {
    pub sequence_index: u16,
    pub lookup_index: u16,
}

/// A single (backtrack, input, lookahead) contextual rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextRule {
    pub backtrack: Vec<Coverage>,
    pub input: Vec<Coverage>,
    pub lookahead: Vec<Coverage>,
    pub nested_lookups: Vec<NestedLookup>,
}

/// Opaque per-type rule data for one subtable. Variants mirror the
/// substitution/positioning types enumerated in spec §4.4/§4.5.
#[derive(Debug, Clone, PartialEq)]
pub enum Subtable {
    // --- Substitution (GSUB-equivalent) ---
    SingleSubst {
        coverage: Coverage,
        mapping: std::collections::HashMap<u32, u32>,
    },
    MultipleSubst {
        coverage: Coverage,
        mapping: std::collections::HashMap<u32, Vec<u32>>,
    },
    AlternateSubst {
        coverage: Coverage,
        alternates: std::collections::HashMap<u32, Vec<u32>>,
    },
    LigatureSubst {
        /// keyed by first component glyph id
        coverage: Coverage,
        rules: std::collections::HashMap<u32, Vec<LigatureRule>>,
    },
    ContextSubst(ContextRule),
    ChainContextSubst(ContextRule),
    ReverseChainSingleSubst {
        coverage: Coverage,
        backtrack: Vec<Coverage>,
        lookahead: Vec<Coverage>,
        mapping: std::collections::HashMap<u32, u32>,
    },

    // --- Positioning (GPOS-equivalent) ---
    SingleAdjust {
        coverage: Coverage,
        adjustments: std::collections::HashMap<u32, ValueRecord>,
    },
    PairAdjust {
        /// Glyph-pair keyed adjustments (covers both glyph-based and
        /// class-based subtables, pre-expanded by the font collaborator
        /// into concrete pairs).
        pairs: std::collections::HashMap<(u32, u32), (ValueRecord, ValueRecord)>,
    },
    CursiveAttach {
        /// glyph id -> (entry anchor, exit anchor)
        entries: std::collections::HashMap<u32, (Option<Anchor>, Option<Anchor>)>,
    },
    MarkToBaseAttach {
        marks: std::collections::HashMap<u32, (u16, Anchor)>,
        bases: std::collections::HashMap<u32, Vec<Anchor>>,
    },
    MarkToLigatureAttach {
        marks: std::collections::HashMap<u32, (u16, Anchor)>,
        ligatures: std::collections::HashMap<u32, Vec<Vec<Anchor>>>,
    },
    MarkToMarkAttach {
        marks: std::collections::HashMap<u32, (u16, Anchor)>,
        base_marks: std::collections::HashMap<u32, Vec<Anchor>>,
    },
    ContextPos(ContextRule),
    ChainContextPos(ContextRule),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValueRecord {
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LigatureRule {
    /// Remaining components after the first (which selects this rule
    /// via the subtable's keyed-by-first-glyph map).
    pub components: Vec<u32>,
    pub ligature_glyph: u32,
}

bitflags::bitflags! {
    /// Lookup flags controlling the C4/C5 skip filter (§4.2, §4.4).
    #[derive(Default)]
    pub struct LookupFlags: u16 {
        const RIGHT_TO_LEFT          = 0x0001;
        const IGNORE_BASE_GLYPHS     = 0x0002;
        const IGNORE_LIGATURES       = 0x0004;
        const IGNORE_MARKS           = 0x0008;
        const USE_MARK_FILTERING_SET = 0x0010;
    }
}

/// One OpenType lookup: a typed, ordered list of subtables plus the
/// flags that define its skip filter.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    pub flags: LookupFlags,
    pub mark_attachment_type: u8,
    pub mark_filtering_set: Option<HashSet<u32>>,
    pub subtables: Vec<Subtable>,
}

impl Lookup {
    pub fn new(flags: LookupFlags) -> Self {
        Lookup {
            flags,
            mark_attachment_type: 0,
            mark_filtering_set: None,
            subtables: Vec::new(),
        }
    }

    pub fn with_subtables(flags: LookupFlags, subtables: Vec<Subtable>) -> Self {
        Lookup {
            flags,
            mark_attachment_type: 0,
            mark_filtering_set: None,
            subtables,
        }
    }
}

/// A font's declared lookup, scoped to a feature (so the substitution
/// and positioning engines can test eligibility per §4.4).
#[derive(Debug, Clone)]
pub struct FeatureLookup {
    pub feature: Tag,
    pub lookup_index: usize,
}

/// C2's public contract (§4.2). `FontAdapter` implementations are
/// immutable after construction and freely shared across concurrent
/// shaping calls (§5); hence `Send + Sync`.
pub trait FontAdapter: Send + Sync {
    /// Character-map lookup; MUST consult the Unicode-preferred
    /// encoding subtable before platform-specific ones. Returns
    /// `.notdef` (0) on a miss.
    fn map_codepoint(&self, cp: u32) -> u32;

    fn metrics(&self, glyph_id: u32) -> GlyphMetrics;

    fn units_per_em(&self) -> u16;

    /// The font's declared lookup list for one stage, in font order
    /// (not feature-declaration order — §9). Each entry names the
    /// feature tags that can enable it.
    fn lookups(&self, stage: Stage, script: Tag, lang: Option<Tag>) -> Vec<(usize, &Lookup)>;

    /// The feature tags the font activates for `lookup_index` at
    /// (`script`, `lang`), used by the substitution/positioning engines
    /// to test "any of its features is active" eligibility.
    fn features_for_lookup(&self, stage: Stage, script: Tag, lang: Option<Tag>, lookup_index: usize) -> Vec<Tag>;

    fn feature_enabled_by_default(&self, tag: Tag) -> bool;

    fn glyph_class(&self, glyph_id: u32) -> GlyphClass;

    fn mark_attachment_class(&self, glyph_id: u32) -> u8;

    /// Legacy `kern` table pair adjustment, used by C5 step 3 when the
    /// font exposes a kern table but no GPOS kern feature.
    fn kern_pair(&self, left: u32, right: u32) -> Option<(i32, i32)>;
}
