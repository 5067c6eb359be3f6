//! A text shaping and layout engine core over OpenType/TrueType fonts.
//!
//! The crate ingests a font (through the [`font::FontAdapter`]
//! boundary), a run of Unicode text, and a set of [`LayoutOptions`],
//! and produces an ordered sequence of positioned glyphs. It implements
//! the shaping pipeline itself — codepoint mapping, feature-driven
//! substitution, positioning, and line layout — while treating the
//! binary OpenType table parser, the Unicode character database, and
//! the outline renderer as external collaborators consumed through
//! narrow trait boundaries (see [`font`], [`unicode`], [`sink`]).

pub mod buffer;
pub mod complex;
pub mod error;
pub mod font;
pub mod layout;
pub mod ot;
pub mod analyze;
pub mod options;
pub mod shape;
pub mod sink;
pub mod tag;
pub mod unicode;

pub use buffer::{GlyphStream, RunId, Slot, SlotFlags};
pub use error::{ShapingError, Result};
pub use font::FontAdapter;
pub use layout::{Bounds, LineLayout, PositionedGlyph};
pub use options::{HorizontalAlignment, LayoutOptions, Origin, VerticalAlignment};
pub use shape::shape;
pub use tag::Tag;

/// Feature-activation bitmask. Each bit is assigned to a feature slot
/// by [`ot::Map`] for one shaping call; see spec §3's "features:
/// ordered set of (FeatureTag, enabled)", realized here as a compact
/// mask rather than a per-slot `Vec`, following rustybuzz's
/// `hb_mask_t`.
pub type Mask = u32;

/// Resolved bidi direction (spec §3 `Slot::direction`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    #[inline]
    pub fn is_backward(self) -> bool {
        matches!(self, Direction::Rtl)
    }
}
