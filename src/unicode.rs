//! The Unicode character database collaborator boundary (§6). Real
//! production UCD tables (full UAX#9 bidi resolution, full line-break
//! class tables) are deliberately out of this core's scope — spec.md
//! §2 lists "the Unicode character database" among the external
//! collaborators the core merely consumes. [`UnicodeCrateProvider`]
//! wires the trait to the same dependency set rustybuzz itself uses
//! for the parts that *are* stable, narrow crate APIs
//! (`unicode-script` for script property, `unicode-general-category`
//! for general category, `unicode-bidi-mirroring` for mirror pairs,
//! `unicode-ccc` for combining class), and fills the remaining,
//! broader surfaces (bidi class, line-break class, default-ignorable)
//! with the minimal classification spec.md §4.3 asks for ("UBA rules
//! summarized to: L/R embedding resolution ... mirror pairs left
//! abstract for C6").

pub use unicode_general_category::GeneralCategory;

use crate::Tag;

/// Coarse bidirectional class, sufficient for §4.3 step 2's "L/R
/// embedding resolution"; full UAX#9 weak/neutral resolution is left
/// to the caller (mirror pairs are "left abstract for C6" per spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidiClass {
    StrongLtr,
    StrongRtl,
    StrongArabicLetter,
    EuropeanNumber,
    Neutral,
}

impl BidiClass {
    #[inline]
    pub fn is_strong(self) -> bool {
        matches!(self, BidiClass::StrongLtr | BidiClass::StrongRtl | BidiClass::StrongArabicLetter)
    }

    #[inline]
    pub fn direction(self) -> Option<crate::Direction> {
        match self {
            BidiClass::StrongLtr => Some(crate::Direction::Ltr),
            BidiClass::StrongRtl | BidiClass::StrongArabicLetter => Some(crate::Direction::Rtl),
            _ => None,
        }
    }
}

/// Unicode line-breaking class, narrowed to the classes C6 actually
/// needs to place soft-wrap opportunities and hard breaks (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreakClass {
    MandatoryBreak,
    CarriageReturn,
    LineFeed,
    NextLine,
    Space,
    ZeroWidthSpace,
    Hyphen,
    Other,
}

/// §6's UCD collaborator interface.
pub trait UnicodeDataProvider: Send + Sync {
    fn bidi_class(&self, cp: u32) -> BidiClass;
    fn script(&self, cp: u32) -> Tag;
    fn line_break_class(&self, cp: u32) -> LineBreakClass;
    fn general_category(&self, cp: u32) -> GeneralCategory;
    fn is_default_ignorable(&self, cp: u32) -> bool;
    fn is_zero_width_joiner(&self, cp: u32) -> bool;
    /// Canonical combining class (UAX#44); used by Arabic's
    /// `reorder_marks` pass to detect modifier marks (ccc 220/230).
    fn combining_class(&self, cp: u32) -> u8;
    /// Whether a grapheme cluster boundary exists between `a` and `b`
    /// (`a` immediately preceding `b`).
    fn grapheme_boundary_after(&self, a: u32, b: u32) -> bool;
    /// The bidi mirror-pair codepoint for `cp` (e.g. `(` -> `)`), if
    /// any. C3 consults this for RTL runs when the font's cmap has no
    /// entry for `cp` itself but does have one for its mirror, per
    /// §4.3's "mirror pairs" note.
    fn bidi_mirror(&self, cp: u32) -> Option<u32>;
    /// The codepoint's canonical (NFD) decomposition, one level deep,
    /// or `None` if `cp` has none. C3's step 1 applies this
    /// recursively so a precomposed legacy codepoint shapes the same
    /// as its fully decomposed form, matching real shaping engines'
    /// pre-GSUB normalization pass.
    fn canonical_decompose(&self, cp: u32) -> Option<Vec<u32>>;
}

/// Default provider, backed by the same small Unicode-property crates
/// rustybuzz itself depends on.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeCrateProvider;

impl UnicodeDataProvider for UnicodeCrateProvider {
    fn bidi_class(&self, cp: u32) -> BidiClass {
        let c = match core::char::from_u32(cp) {
            Some(c) => c,
            None => return BidiClass::Neutral,
        };

        match cp {
            0x0030..=0x0039 => return BidiClass::EuropeanNumber,
            // Hebrew
            0x0590..=0x05FF | 0xFB1D..=0xFB4F => return BidiClass::StrongRtl,
            // Arabic + Arabic Supplement + Arabic Presentation Forms
            0x0600..=0x06FF | 0x0750..=0x077F | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF => {
                return BidiClass::StrongArabicLetter
            }
            // Syriac
            0x0700..=0x074F => return BidiClass::StrongArabicLetter,
            // Thaana
            0x0780..=0x07BF => return BidiClass::StrongRtl,
            _ => {}
        }

        if c.is_alphabetic() {
            BidiClass::StrongLtr
        } else {
            BidiClass::Neutral
        }
    }

    fn script(&self, cp: u32) -> Tag {
        use unicode_script::{Script, UnicodeScript};

        let c = match core::char::from_u32(cp) {
            Some(c) => c,
            None => return crate::tag::script::LATIN,
        };

        match c.script() {
            Script::Arabic => crate::tag::script::ARABIC,
            Script::Syriac => crate::tag::script::SYRIAC,
            Script::Mongolian => crate::tag::script::MONGOLIAN,
            Script::Devanagari => crate::tag::script::DEVANAGARI,
            Script::Hebrew => crate::tag::script::HEBREW,
            Script::Common | Script::Inherited | Script::Unknown => Tag::new(b"zyyy"),
            _ => crate::tag::script::LATIN,
        }
    }

    fn line_break_class(&self, cp: u32) -> LineBreakClass {
        match cp {
            0x000A => LineBreakClass::LineFeed,
            0x000D => LineBreakClass::CarriageReturn,
            0x0085 => LineBreakClass::NextLine,
            0x000B | 0x000C | 0x2028 | 0x2029 => LineBreakClass::MandatoryBreak,
            0x0020 | 0x0009 => LineBreakClass::Space,
            0x200B => LineBreakClass::ZeroWidthSpace,
            0x002D | 0x2010 => LineBreakClass::Hyphen,
            _ => LineBreakClass::Other,
        }
    }

    fn general_category(&self, cp: u32) -> GeneralCategory {
        match core::char::from_u32(cp) {
            Some(c) => unicode_general_category::get_general_category(c),
            None => GeneralCategory::Unassigned,
        }
    }

    fn is_default_ignorable(&self, cp: u32) -> bool {
        matches!(
            cp,
            0x00AD | 0x034F | 0x061C
                | 0x115F..=0x1160
                | 0x17B4..=0x17B5
                | 0x180B..=0x180E
                | 0x200B..=0x200F
                | 0x202A..=0x202E
                | 0x2060..=0x206F
                | 0x3164
                | 0xFE00..=0xFE0F
                | 0xFEFF
                | 0xFFA0
                | 0xFFF0..=0xFFF8
                | 0xE0000..=0xE0FFF
        )
    }

    fn is_zero_width_joiner(&self, cp: u32) -> bool {
        cp == 0x200D
    }

    fn combining_class(&self, cp: u32) -> u8 {
        use unicode_ccc::get_canonical_combining_class;

        match core::char::from_u32(cp) {
            Some(c) => u8::from(get_canonical_combining_class(c)),
            None => 0,
        }
    }

    fn grapheme_boundary_after(&self, _a: u32, b: u32) -> bool {
        use unicode_ccc::get_canonical_combining_class;

        if b == 0x200D || self.is_default_ignorable(b) {
            return false;
        }
        match core::char::from_u32(b) {
            Some(c) => u8::from(get_canonical_combining_class(c)) == 0,
            None => true,
        }
    }

    fn bidi_mirror(&self, cp: u32) -> Option<u32> {
        let c = core::char::from_u32(cp)?;
        unicode_bidi_mirroring::get_mirrored(c).map(|m| m as u32)
    }

    fn canonical_decompose(&self, cp: u32) -> Option<Vec<u32>> {
        let c = core::char::from_u32(cp)?;
        let decomposed = unic_ucd_normal::canonical_decomposition(c)?;
        Some(decomposed.iter().map(|&d| d as u32).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_is_strong_ltr() {
        let p = UnicodeCrateProvider;
        assert_eq!(p.bidi_class('a' as u32), BidiClass::StrongLtr);
        assert_eq!(p.script('a' as u32), crate::tag::script::LATIN);
    }

    #[test]
    fn arabic_is_strong_arabic_letter() {
        let p = UnicodeCrateProvider;
        assert_eq!(p.bidi_class(0x0633), BidiClass::StrongArabicLetter);
        assert_eq!(p.script(0x0633), crate::tag::script::ARABIC);
    }

    #[test]
    fn zwj_is_default_ignorable_and_joiner() {
        let p = UnicodeCrateProvider;
        assert!(p.is_zero_width_joiner(0x200D));
        assert!(p.is_default_ignorable(0x200D));
    }

    #[test]
    fn precomposed_letter_decomposes_to_base_and_combining_mark() {
        let p = UnicodeCrateProvider;
        let decomposed = p.canonical_decompose('\u{00E9}' as u32).unwrap(); // é
        assert_eq!(decomposed, vec!['e' as u32, 0x0301]);
    }

    #[test]
    fn ascii_letter_has_no_decomposition() {
        let p = UnicodeCrateProvider;
        assert_eq!(p.canonical_decompose('a' as u32), None);
    }

    #[test]
    fn line_break_classes() {
        let p = UnicodeCrateProvider;
        assert_eq!(p.line_break_class('\t' as u32), LineBreakClass::Space);
        assert_eq!(p.line_break_class('\n' as u32), LineBreakClass::LineFeed);
    }
}
