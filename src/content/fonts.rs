//! Per-page font tables.
//!
//! The walker and the edit engine share one advance model: glyph widths
//! come from the font's `Widths` array when present, otherwise a per-font
//! default em fraction. Both sides computing advances from the same table
//! is what makes splice compensation exact.

use std::collections::HashMap;

use lopdf::{Document, Object, ObjectId};

use super::{inherited_page_attr, name_bytes, number, resolve, resolve_dict};
use crate::elements::FontFlags;

// Font descriptor flag bits (PDF 32000-1, table 123).
const DESCRIPTOR_FIXED_PITCH: i64 = 1;
const DESCRIPTOR_SERIF: i64 = 1 << 1;
const DESCRIPTOR_ITALIC: i64 = 1 << 6;
const DESCRIPTOR_FORCE_BOLD: i64 = 1 << 18;

/// Metrics and style information for one font resource.
#[derive(Debug, Clone)]
pub(crate) struct FontInfo {
    /// Base font name with any subset prefix stripped
    pub base_font: String,
    /// Derived style flags
    pub flags: FontFlags,
    /// First character code covered by `widths`
    pub first_char: i64,
    /// Glyph widths in glyph-space units (1/1000 em)
    pub widths: Vec<f64>,
    /// Fallback width as an em fraction when `widths` has no entry
    pub default_width: f64,
}

impl FontInfo {
    /// The fallback font used when a stream shows text with no resolvable
    /// font resource.
    pub fn fallback() -> Self {
        Self {
            base_font: "Helvetica".to_string(),
            flags: FontFlags::empty(),
            first_char: 0,
            widths: Vec::new(),
            default_width: 0.5,
        }
    }

    /// Width of one character code as an em fraction.
    pub fn width_em(&self, code: u8) -> f64 {
        let index = code as i64 - self.first_char;
        if index >= 0 {
            if let Some(w) = self.widths.get(index as usize) {
                return w / 1000.0;
            }
        }
        self.default_width
    }

    /// Advance of a byte string in text-space units at the given raw `Tf`
    /// size, including character spacing and word spacing for spaces.
    pub fn advance(&self, bytes: &[u8], tf_size: f64, char_space: f64, word_space: f64) -> f64 {
        bytes
            .iter()
            .map(|&b| {
                let mut adv = self.width_em(b) * tf_size + char_space;
                if b == b' ' {
                    adv += word_space;
                }
                adv
            })
            .sum()
    }
}

/// Font resources in scope for one page, keyed by resource name.
#[derive(Debug)]
pub(crate) struct FontTable {
    fonts: HashMap<Vec<u8>, FontInfo>,
    fallback: FontInfo,
}

impl Default for FontTable {
    fn default() -> Self {
        Self {
            fonts: HashMap::new(),
            fallback: FontInfo::fallback(),
        }
    }
}

impl FontTable {
    /// Build the table from the page's (possibly inherited) resources.
    pub fn for_page(doc: &Document, page_id: ObjectId) -> Self {
        let mut fonts = HashMap::new();
        if let Some(resources) =
            inherited_page_attr(doc, page_id, b"Resources").and_then(|obj| resolve_dict(doc, obj))
        {
            if let Some(font_dict) = resources
                .get(b"Font")
                .ok()
                .and_then(|obj| resolve_dict(doc, obj))
            {
                for (name, font_obj) in font_dict.iter() {
                    if let Some(dict) = resolve_dict(doc, font_obj) {
                        fonts.insert(name.clone(), load_font(doc, dict));
                    }
                }
            }
        }
        Self {
            fonts,
            fallback: FontInfo::fallback(),
        }
    }

    /// Font for a resource name, falling back to the default metrics when
    /// the name does not resolve.
    pub fn get(&self, name: &[u8]) -> &FontInfo {
        self.fonts.get(name).unwrap_or(&self.fallback)
    }

    /// Find a resource name whose base font matches, if any.
    pub fn resource_for_base_font(&self, base_font: &str) -> Option<&[u8]> {
        self.fonts
            .iter()
            .find(|(_, info)| info.base_font == base_font)
            .map(|(name, _)| name.as_slice())
    }
}

fn load_font(doc: &Document, dict: &lopdf::Dictionary) -> FontInfo {
    let base_font = dict
        .get(b"BaseFont")
        .ok()
        .map(|obj| resolve(doc, obj))
        .and_then(name_bytes)
        .map(|name| strip_subset_prefix(&String::from_utf8_lossy(name)))
        .unwrap_or_else(|| "Unknown".to_string());

    let mut flags = flags_from_name(&base_font);
    if let Some(descriptor) = dict
        .get(b"FontDescriptor")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
    {
        if let Some(bits) = descriptor
            .get(b"Flags")
            .ok()
            .map(|obj| resolve(doc, obj))
            .and_then(number)
        {
            let bits = bits as i64;
            if bits & DESCRIPTOR_FIXED_PITCH != 0 {
                flags |= FontFlags::MONOSPACE;
            }
            if bits & DESCRIPTOR_SERIF != 0 {
                flags |= FontFlags::SERIF;
            }
            if bits & DESCRIPTOR_ITALIC != 0 {
                flags |= FontFlags::ITALIC;
            }
            if bits & DESCRIPTOR_FORCE_BOLD != 0 {
                flags |= FontFlags::BOLD;
            }
        }
    }

    let first_char = dict
        .get(b"FirstChar")
        .ok()
        .map(|obj| resolve(doc, obj))
        .and_then(number)
        .unwrap_or(0.0) as i64;

    let widths = match dict.get(b"Widths").ok().map(|obj| resolve(doc, obj)) {
        Some(Object::Array(values)) => values
            .iter()
            .map(|obj| number(resolve(doc, obj)).unwrap_or(0.0))
            .collect(),
        _ => Vec::new(),
    };

    let default_width = if flags.contains(FontFlags::MONOSPACE) {
        0.6
    } else {
        0.5
    };

    FontInfo {
        base_font,
        flags,
        first_char,
        widths,
        default_width,
    }
}

/// Strip a subset prefix like `ABCDEF+` from a base font name.
fn strip_subset_prefix(name: &str) -> String {
    let bytes = name.as_bytes();
    if bytes.len() > 7 && bytes[6] == b'+' && bytes[..6].iter().all(|b| b.is_ascii_uppercase()) {
        name[7..].to_string()
    } else {
        name.to_string()
    }
}

/// Style flags inferable from the base font name alone, for fonts without
/// a descriptor (the standard 14 in particular).
fn flags_from_name(name: &str) -> FontFlags {
    let lower = name.to_ascii_lowercase();
    let mut flags = FontFlags::empty();
    if lower.contains("bold") {
        flags |= FontFlags::BOLD;
    }
    if lower.contains("italic") || lower.contains("oblique") {
        flags |= FontFlags::ITALIC;
    }
    if lower.contains("courier") || lower.contains("mono") {
        flags |= FontFlags::MONOSPACE;
    }
    if lower.contains("times") || lower.contains("serif") {
        flags |= FontFlags::SERIF;
    }
    flags
}
