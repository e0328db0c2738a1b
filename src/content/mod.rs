//! Content-stream interpretation shared by the extractor, edit engine and
//! renderer.
//!
//! The object layer (object graph, stream filters, operator codec) comes
//! from `lopdf`; this module adds the graphics-state machine and the walker
//! that replays decoded operators into positioned spans, rectangle fills
//! and image placements.

pub(crate) mod fonts;
pub(crate) mod graphics_state;
pub(crate) mod walker;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::geometry::Rect;

/// Maximum depth when following reference chains or page Parent chains.
const MAX_RESOLVE_DEPTH: usize = 32;

/// Follow reference chains to the referenced object.
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    for _ in 0..MAX_RESOLVE_DEPTH {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(inner) => obj = inner,
                Err(_) => return obj,
            },
            _ => return obj,
        }
    }
    obj
}

/// Resolve an object to a dictionary, following references and unwrapping
/// stream dictionaries.
pub(crate) fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Numeric operand value (integer or real).
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match *obj {
        Object::Integer(i) => Some(i as f64),
        Object::Real(r) => Some(r as f64),
        _ => None,
    }
}

/// Numeric operand at an index, with a default for malformed streams.
pub(crate) fn operand_number(operands: &[Object], index: usize, default: f64) -> f64 {
    operands.get(index).and_then(number).unwrap_or(default)
}

/// Name operand bytes.
pub(crate) fn name_bytes(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::Name(name) => Some(name),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE when it carries a BOM, otherwise
/// treated as Latin-1 (close enough to PDFDocEncoding for the printable
/// range).
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Encode replacement text into the one-byte form used by simple fonts.
/// Characters outside Latin-1 degrade to `?`.
pub(crate) fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .collect()
}

/// Look up a page attribute, walking the Pages tree for inheritable keys
/// (MediaBox, Resources).
pub(crate) fn inherited_page_attr<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_RESOLVE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent = dict.get(b"Parent").ok()?;
        match resolve_dict(doc, parent) {
            Some(parent_dict) => dict = parent_dict,
            None => return None,
        }
    }
    None
}

/// The page's media box, defaulting to US Letter when absent or malformed.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> Rect {
    if let Some(obj) = inherited_page_attr(doc, page_id, b"MediaBox") {
        if let Object::Array(values) = resolve(doc, obj) {
            if values.len() == 4 {
                let v: Vec<f64> = values
                    .iter()
                    .map(|o| number(resolve(doc, o)).unwrap_or(0.0))
                    .collect();
                return Rect::new(v[0] as f32, v[1] as f32, v[2] as f32, v[3] as f32);
            }
        }
    }
    Rect::new(0.0, 0.0, 612.0, 792.0)
}

/// Concatenated, decoded content of one page.
pub(crate) fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    doc.get_page_content(page_id)
        .map_err(|e| Error::parse(format!("unreadable page content: {}", e)))
}

/// Load a document from raw bytes, rejecting encrypted input.
pub(crate) fn load_document(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| Error::parse(format!("not a readable PDF: {}", e)))?;
    if doc.trailer.has(b"Encrypt") {
        return Err(Error::parse("encrypted documents are not supported"));
    }
    Ok(doc)
}

/// Object id of a 0-indexed page.
pub(crate) fn page_object(doc: &Document, page: usize) -> Result<ObjectId> {
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    pages.get(page).copied().ok_or(Error::PageOutOfRange {
        page,
        page_count: pages.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode_text_string(b"Hello"), "Hello");
        assert_eq!(decode_text_string(&[0xE9]), "\u{e9}");
    }

    #[test]
    fn test_decode_utf16be() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_string(&bytes), "Hi");
    }

    #[test]
    fn test_encode_latin1_degrades() {
        assert_eq!(encode_latin1("Hi"), b"Hi".to_vec());
        assert_eq!(encode_latin1("H\u{2014}i"), b"H?i".to_vec());
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(number(&Object::Integer(7)), Some(7.0));
        assert_eq!(number(&Object::Real(1.5)), Some(1.5));
        assert_eq!(number(&Object::Null), None);
    }
}
