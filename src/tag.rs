//! OpenType tag type: 4-byte ASCII identifiers used for scripts,
//! languages and features (§6 "Feature tags, script tags, language
//! tags: 4-byte ASCII, space-padded right, as in OpenType").

use std::fmt;

/// A 4-byte OpenType tag, e.g. `Tag::new(b"liga")`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u32);

impl Tag {
    #[inline]
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Tag(u32::from_be_bytes(*bytes))
    }

    #[inline]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Parses a tag from a string, space-padding on the right as OpenType
    /// requires for tags shorter than 4 bytes.
    pub fn from_str(s: &str) -> Option<Tag> {
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 || !bytes.iter().all(u8::is_ascii) {
            return None;
        }
        let mut buf = [b' '; 4];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(Tag::new(&buf))
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({:?})", self.to_string())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.to_bytes();
        for b in bytes.iter() {
            write!(f, "{}", *b as char)?;
        }
        Ok(())
    }
}

impl ToString for Tag {
    fn to_string(&self) -> String {
        format!("{}", self)
    }
}

/// Well-known OpenType feature tags referenced by the complex shapers
/// and the substitution/positioning engines.
pub mod feature {
    use super::Tag;

    pub const ISOLATED_FORMS: Tag = Tag::new(b"isol");
    pub const TERMINAL_FORMS_1: Tag = Tag::new(b"fina");
    pub const TERMINAL_FORMS_2: Tag = Tag::new(b"fin2");
    pub const TERMINAL_FORMS_3: Tag = Tag::new(b"fin3");
    pub const MEDIAL_FORMS_1: Tag = Tag::new(b"medi");
    pub const MEDIAL_FORMS_2: Tag = Tag::new(b"med2");
    pub const INITIAL_FORMS: Tag = Tag::new(b"init");
    pub const STRETCHING_GLYPH_DECOMPOSITION: Tag = Tag::new(b"stch");
    pub const GLYPH_COMPOSITION_DECOMPOSITION: Tag = Tag::new(b"ccmp");
    pub const LOCALIZED_FORMS: Tag = Tag::new(b"locl");
    pub const REQUIRED_LIGATURES: Tag = Tag::new(b"rlig");
    pub const REQUIRED_CONTEXTUAL_ALTERNATES: Tag = Tag::new(b"rclt");
    pub const CONTEXTUAL_ALTERNATES: Tag = Tag::new(b"calt");
    pub const CONTEXTUAL_SWASH: Tag = Tag::new(b"cswh");
    pub const MARK_POSITIONING_VIA_SUBSTITUTION: Tag = Tag::new(b"mark");
    pub const STANDARD_LIGATURES: Tag = Tag::new(b"liga");
    pub const DISCRETIONARY_LIGATURES: Tag = Tag::new(b"dlig");
    pub const KERNING: Tag = Tag::new(b"kern");
    pub const MARK_TO_BASE: Tag = Tag::new(b"mark");
    pub const MARK_TO_MARK: Tag = Tag::new(b"mkmk");
    pub const CURSIVE_POSITIONING: Tag = Tag::new(b"curs");
}

/// Well-known OpenType script tags used by the complex-shaper selector
/// in [`crate::analyze`].
pub mod script {
    use super::Tag;

    pub const ARABIC: Tag = Tag::new(b"arab");
    pub const SYRIAC: Tag = Tag::new(b"syrc");
    pub const MONGOLIAN: Tag = Tag::new(b"mong");
    pub const LATIN: Tag = Tag::new(b"latn");
    pub const DEVANAGARI: Tag = Tag::new(b"deva");
    pub const HEBREW: Tag = Tag::new(b"hebr");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip() {
        let t = Tag::new(b"liga");
        assert_eq!(t.to_string(), "liga");
        assert_eq!(Tag::from_str("liga"), Some(t));
    }

    #[test]
    fn tag_pads_short_strings() {
        let t = Tag::from_str("cv").unwrap();
        assert_eq!(t.to_string(), "cv  ");
    }

    #[test]
    fn tag_rejects_oversized() {
        assert_eq!(Tag::from_str("toolong"), None);
    }
}
