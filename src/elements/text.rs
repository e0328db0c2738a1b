//! Text element types.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::geometry::Rect;

bitflags! {
    /// Font style flags for a text span.
    ///
    /// Bit positions are fixed by convention and must not be renumbered:
    /// consumers test `flags & (1 << 4)` for bold and `flags & (1 << 1)`
    /// for italic.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct FontFlags: u32 {
        /// Superscript positioning
        const SUPERSCRIPT = 1 << 0;
        /// Italic or oblique face
        const ITALIC = 1 << 1;
        /// Serif face
        const SERIF = 1 << 2;
        /// Fixed-pitch face
        const MONOSPACE = 1 << 3;
        /// Bold face
        const BOLD = 1 << 4;
    }
}

/// Build the deterministic element id for a structural position.
///
/// The id is a pure function of the position, so one extraction pass can
/// never emit two elements with the same id.
///
/// # Examples
///
/// ```
/// use pdf_studio::elements::element_id;
///
/// assert_eq!(element_id(0, 2, 1, 4), "p0_b2_l1_w4");
/// ```
pub fn element_id(page: usize, block: usize, line: usize, word: usize) -> String {
    format!("p{}_b{}_l{}_w{}", page, block, line, word)
}

/// A word-level text span on one page.
///
/// Elements are immutable snapshots: edits go through the edit engine and
/// produce a freshly extracted model rather than mutating elements in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextElement {
    /// The text content of the span
    pub text: String,
    /// Bounding box in page space
    pub bbox: Rect,
    /// Base font name (subset prefixes stripped)
    pub font_name: String,
    /// Effective font size in points (positive)
    pub font_size: f32,
    /// Style flags (bold = bit 4, italic = bit 1)
    pub flags: FontFlags,
    /// Fill color of the span
    pub color: Color,
    /// Page index (0-based)
    pub page: usize,
    /// Block index within the page
    pub block: usize,
    /// Line index within the block
    pub line: usize,
    /// Word index within the line
    pub word: usize,
    /// Deterministic id, `"p{page}_b{block}_l{line}_w{word}"`
    pub element_id: String,

    /// Where this span came from in the page's content stream. Present on
    /// freshly extracted elements, absent after a snapshot round trip; the
    /// edit engine always works from a fresh extraction.
    #[serde(skip)]
    pub(crate) origin: Option<SpanOrigin>,
}

impl TextElement {
    /// Check if the span is bold.
    pub fn is_bold(&self) -> bool {
        self.flags.contains(FontFlags::BOLD)
    }

    /// Check if the span is italic.
    pub fn is_italic(&self) -> bool {
        self.flags.contains(FontFlags::ITALIC)
    }

    /// Font label used for the document's derived font set,
    /// e.g. `"Helvetica (12pt) Bold"`.
    pub fn font_label(&self) -> String {
        let mut label = format!("{} ({}pt)", self.font_name, self.font_size);
        if self.is_bold() {
            label.push_str(" Bold");
        }
        if self.is_italic() {
            label.push_str(" Italic");
        }
        label
    }

    /// Baseline y coordinate the span was laid out on.
    ///
    /// The extractor places the box at a fixed ascent/descent ratio around
    /// the baseline, so the baseline is recoverable from the box and the
    /// extraction-time font size.
    pub(crate) fn baseline(&self) -> f32 {
        self.bbox.y0 + SpanOrigin::DESCENT_RATIO * self.font_size
    }
}

/// Provenance of a span inside its page content stream.
///
/// Identifies the show operator (index into the decoded operation list) and
/// the byte range within its string operand(s) that produced the span, plus
/// the text state needed to splice a replacement in place.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SpanOrigin {
    /// Index of the producing operator in the page's decoded content
    pub op_index: usize,
    /// First string segment (always 0 except inside TJ arrays)
    pub start_seg: usize,
    /// Byte offset of the span start within the first segment
    pub start_byte: usize,
    /// Last string segment (inclusive)
    pub end_seg: usize,
    /// Byte offset one past the span end within the last segment
    pub end_byte: usize,
    /// True when the span continued across operator boundaries;
    /// such spans cannot be spliced
    pub spans_operators: bool,
    /// Font resource name in scope (`Tf` operand)
    pub res_font: Vec<u8>,
    /// Raw `Tf` size in scope
    pub tf_size: f32,
    /// Character spacing in scope (`Tc`)
    pub char_space: f32,
    /// Word spacing in scope (`Tw`)
    pub word_space: f32,
}

impl SpanOrigin {
    /// Fraction of the font size below the baseline covered by the bbox.
    pub const DESCENT_RATIO: f32 = 0.2;
    /// Fraction of the font size above the baseline covered by the bbox.
    pub const ASCENT_RATIO: f32 = 0.8;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_element() -> TextElement {
        TextElement {
            text: "Hello".to_string(),
            bbox: Rect::new(72.0, 717.6, 102.0, 729.6),
            font_name: "Helvetica".to_string(),
            font_size: 12.0,
            flags: FontFlags::empty(),
            color: Color::BLACK,
            page: 0,
            block: 0,
            line: 0,
            word: 0,
            element_id: element_id(0, 0, 0, 0),
            origin: None,
        }
    }

    #[test]
    fn test_element_id_format() {
        assert_eq!(element_id(3, 1, 0, 7), "p3_b1_l0_w7");
    }

    #[test]
    fn test_flag_bit_positions() {
        assert_eq!(FontFlags::BOLD.bits(), 1 << 4);
        assert_eq!(FontFlags::ITALIC.bits(), 1 << 1);
    }

    #[test]
    fn test_style_queries() {
        let mut el = sample_element();
        assert!(!el.is_bold());
        el.flags = FontFlags::BOLD | FontFlags::ITALIC;
        assert!(el.is_bold());
        assert!(el.is_italic());
    }

    #[test]
    fn test_font_label() {
        let mut el = sample_element();
        assert_eq!(el.font_label(), "Helvetica (12pt)");
        el.flags = FontFlags::BOLD;
        assert_eq!(el.font_label(), "Helvetica (12pt) Bold");
    }

    #[test]
    fn test_baseline_recovery() {
        let el = sample_element();
        let baseline = el.baseline();
        assert!((baseline - 720.0).abs() < 1e-3);
    }
}
