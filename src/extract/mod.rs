//! Element extraction: document bytes to a structural model.
//!
//! Loading is all-or-nothing: malformed, encrypted or non-PDF input fails
//! with a parse error and no partial model is exposed. Image extraction is
//! the one lenient spot — a single bad image never fails the whole load.

pub(crate) mod images;
mod metadata;

use lopdf::content::Content;
use log::debug;

use crate::content::fonts::FontTable;
use crate::content::walker::{walk_page, WordSpan};
use crate::content::{load_document, page_content};
use crate::elements::{element_id, TextElement};
use crate::error::{Error, Result};
use crate::model::DocumentModel;

/// Parses raw document bytes into an ordered element model.
#[derive(Debug, Clone, Default)]
pub struct ElementExtractor;

impl ElementExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Parse `bytes` into a [`DocumentModel`].
    ///
    /// `document_id` and `filename` are carried into the model verbatim;
    /// the extractor does not consult the store.
    pub fn extract(
        &self,
        bytes: &[u8],
        document_id: &str,
        filename: &str,
    ) -> Result<DocumentModel> {
        let doc = load_document(bytes)?;
        let pages: Vec<_> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(Error::parse("document has no pages"));
        }

        let mut text_elements = Vec::new();
        let mut images = Vec::new();
        for (page_idx, page_id) in pages.iter().enumerate() {
            let content = page_content(&doc, *page_id)?;
            let operations = Content::decode(&content)
                .map_err(|e| Error::parse(format!("bad content stream on page {}: {}", page_idx, e)))?
                .operations;
            let fonts = FontTable::for_page(&doc, *page_id);
            let walk = walk_page(&operations, &fonts);

            images.extend(images::extract_images(&doc, *page_id, page_idx, &walk));
            for span in walk.words {
                text_elements.push(span_to_element(page_idx, span));
            }
        }

        debug!(
            "extracted {} text elements and {} images from {} page(s) of {}",
            text_elements.len(),
            images.len(),
            pages.len(),
            filename
        );

        Ok(DocumentModel::new(
            document_id,
            filename,
            bytes.len() as u64,
            pages.len(),
            text_elements,
            images,
            metadata::document_metadata(&doc),
        ))
    }
}

fn span_to_element(page: usize, span: WordSpan) -> TextElement {
    TextElement {
        element_id: element_id(page, span.block, span.line, span.word),
        text: span.text,
        bbox: span.bbox,
        font_name: span.font_name,
        font_size: span.font_size,
        flags: span.flags,
        color: span.color,
        page,
        block: span.block,
        line: span.line,
        word: span.word,
        origin: Some(span.origin),
    }
}
