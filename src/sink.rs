//! The renderer collaborator boundary (§6): a consumer interface the
//! core calls into once a text block has been fully shaped and laid
//! out. The core never rasterizes a glyph itself (§1 "outline
//! renderer/rasterizer" is explicitly out of scope).

use crate::layout::{Bounds, PositionedGlyph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmitOptions {
    pub hinted: bool,
}

pub trait RenderSink {
    fn begin_text(&mut self, bounds: Bounds);
    fn emit_glyph(&mut self, glyph: PositionedGlyph, layout_mode: LayoutMode, options: EmitOptions);
    fn end_text(&mut self);
}

/// Drives a `RenderSink` over an already-laid-out glyph run; used by
/// callers that just want the straightforward begin/emit*/end
/// sequence spec.md §6 describes.
pub fn emit_all<S: RenderSink>(
    sink: &mut S,
    glyphs: &[PositionedGlyph],
    bounds: Bounds,
    layout_mode: LayoutMode,
) {
    sink.begin_text(bounds);
    for glyph in glyphs {
        sink.emit_glyph(*glyph, layout_mode, EmitOptions::default());
    }
    sink.end_text();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        began: bool,
        ended: bool,
        glyphs: Vec<PositionedGlyph>,
    }

    impl RenderSink for RecordingSink {
        fn begin_text(&mut self, _bounds: Bounds) {
            self.began = true;
        }
        fn emit_glyph(&mut self, glyph: PositionedGlyph, _layout_mode: LayoutMode, _options: EmitOptions) {
            self.glyphs.push(glyph);
        }
        fn end_text(&mut self) {
            self.ended = true;
        }
    }

    #[test]
    fn emit_all_calls_begin_emit_end_in_order() {
        let mut sink = RecordingSink::default();
        let glyph = PositionedGlyph {
            glyph_id: 1,
            font_ref: 0,
            pen_x: 0.0,
            pen_y: 0.0,
            x_offset: 0.0,
            y_offset: 0.0,
            source_offset: 0,
            layout_mode: LayoutMode::Horizontal,
        };
        emit_all(&mut sink, &[glyph], Bounds::default(), LayoutMode::Horizontal);
        assert!(sink.began);
        assert!(sink.ended);
        assert_eq!(sink.glyphs.len(), 1);
    }
}
