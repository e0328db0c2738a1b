//! Document information dictionary extraction.

use lopdf::{Document, Object};

use crate::content::{decode_text_string, resolve, resolve_dict};
use crate::model::DocumentMetadata;

/// Read the trailer's Info dictionary. Absent or malformed entries simply
/// stay empty.
pub(crate) fn document_metadata(doc: &Document) -> DocumentMetadata {
    let info = match doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
    {
        Some(dict) => dict,
        None => return DocumentMetadata::default(),
    };

    let field = |key: &[u8]| {
        info.get(key)
            .ok()
            .map(|obj| resolve(doc, obj))
            .and_then(|obj| match obj {
                Object::String(bytes, _) => Some(decode_text_string(bytes)),
                _ => None,
            })
            .filter(|value| !value.is_empty())
    };

    DocumentMetadata {
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        creator: field(b"Creator"),
        producer: field(b"Producer"),
        creation_date: field(b"CreationDate"),
        modification_date: field(b"ModDate"),
    }
}
