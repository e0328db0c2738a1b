//! In-memory structural document model.
//!
//! The model is a disposable derived view over one version of a document's
//! bytes. It never owns the binary: the store does. After a mutation the
//! model is re-derived from the rewritten binary rather than hand-patched,
//! because the edit engine does not guarantee the original bbox stays valid
//! for replacement text.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::elements::{ImageElement, TextElement};
use crate::error::{Error, Result};

/// Document information dictionary fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Document title
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Document subject
    pub subject: Option<String>,
    /// Creating application
    pub creator: Option<String>,
    /// Producing application
    pub producer: Option<String>,
    /// Creation timestamp as written in the document
    pub creation_date: Option<String>,
    /// Modification timestamp as written in the document
    pub modification_date: Option<String>,
}

/// Summary of a loaded document for listing and reporting.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    /// Number of pages
    pub page_count: usize,
    /// Original filename
    pub filename: String,
    /// Byte size of the committed binary
    pub file_size: u64,
    /// Deduplicated font labels in first-seen order
    pub fonts: Vec<String>,
    /// Deduplicated text colors as `#rrggbb`
    pub colors: Vec<String>,
    /// Number of addressable text elements
    pub text_element_count: usize,
    /// Number of extracted images
    pub image_count: usize,
    /// Document information dictionary
    pub metadata: DocumentMetadata,
}

/// Structural snapshot of one parse of one document version.
///
/// Construction happens in the extractor; the only mutation path is the
/// edit engine, which produces a freshly extracted model. Lookup by element
/// id is O(1) through an index built at construction.
#[derive(Debug, Clone)]
pub struct DocumentModel {
    document_id: String,
    filename: String,
    file_size: u64,
    page_count: usize,
    text_elements: Vec<TextElement>,
    images: Vec<ImageElement>,
    fonts: Vec<String>,
    colors: Vec<Color>,
    metadata: DocumentMetadata,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    index: HashMap<String, usize>,
    /// Store version of the bytes this model was derived from; used for
    /// the optimistic concurrency check on writes.
    source_version: u64,
}

impl DocumentModel {
    pub(crate) fn new(
        document_id: impl Into<String>,
        filename: impl Into<String>,
        file_size: u64,
        page_count: usize,
        text_elements: Vec<TextElement>,
        images: Vec<ImageElement>,
        metadata: DocumentMetadata,
    ) -> Self {
        let mut fonts = IndexSet::new();
        let mut colors = IndexSet::new();
        let mut index = HashMap::with_capacity(text_elements.len());
        for (i, element) in text_elements.iter().enumerate() {
            fonts.insert(element.font_label());
            colors.insert(element.color);
            let previous = index.insert(element.element_id.clone(), i);
            debug_assert!(previous.is_none(), "duplicate element id in one parse");
        }
        let now = Utc::now();
        Self {
            document_id: document_id.into(),
            filename: filename.into(),
            file_size,
            page_count,
            text_elements,
            images,
            fonts: fonts.into_iter().collect(),
            colors: colors.into_iter().collect(),
            metadata,
            created_at: now,
            updated_at: now,
            index,
            source_version: 0,
        }
    }

    /// Document id this model was derived for.
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Original filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Byte size of the binary this model was derived from.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// All text elements in document reading order.
    pub fn text_elements(&self) -> &[TextElement] {
        &self.text_elements
    }

    /// All extracted images in document order.
    pub fn images(&self) -> &[ImageElement] {
        &self.images
    }

    /// Deduplicated font labels in first-seen order.
    pub fn fonts(&self) -> &[String] {
        &self.fonts
    }

    /// Deduplicated text colors in first-seen order.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Document information dictionary.
    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// Model construction time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Model construction time (models are immutable, so this equals
    /// `created_at`; kept separate for record symmetry).
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Store version of the bytes this model was derived from.
    pub fn source_version(&self) -> u64 {
        self.source_version
    }

    pub(crate) fn set_source_version(&mut self, version: u64) {
        self.source_version = version;
    }

    /// Look up a text element by id in O(1).
    pub fn find_element(&self, element_id: &str) -> Result<&TextElement> {
        self.index
            .get(element_id)
            .map(|&i| &self.text_elements[i])
            .ok_or_else(|| Error::ElementNotFound(element_id.to_string()))
    }

    /// Text elements on one page, in reading order.
    pub fn elements_on_page(&self, page: usize) -> Vec<&TextElement> {
        self.text_elements
            .iter()
            .filter(|el| el.page == page)
            .collect()
    }

    /// Images on one page, in document order.
    pub fn images_on_page(&self, page: usize) -> Vec<&ImageElement> {
        self.images.iter().filter(|img| img.page == page).collect()
    }

    /// Summary for listing and reporting.
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            page_count: self.page_count,
            filename: self.filename.clone(),
            file_size: self.file_size,
            fonts: self.fonts.clone(),
            colors: self.colors.iter().map(|c| c.hex()).collect(),
            text_element_count: self.text_elements.len(),
            image_count: self.images.len(),
            metadata: self.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{element_id, FontFlags};
    use crate::geometry::Rect;

    fn element(page: usize, block: usize, line: usize, word: usize, text: &str) -> TextElement {
        TextElement {
            text: text.to_string(),
            bbox: Rect::new(0.0, 0.0, 10.0, 10.0),
            font_name: "Helvetica".to_string(),
            font_size: 12.0,
            flags: FontFlags::empty(),
            color: Color::BLACK,
            page,
            block,
            line,
            word,
            element_id: element_id(page, block, line, word),
            origin: None,
        }
    }

    fn model() -> DocumentModel {
        DocumentModel::new(
            "doc-1",
            "test.pdf",
            1024,
            2,
            vec![
                element(0, 0, 0, 0, "Hello"),
                element(0, 0, 0, 1, "World"),
                element(1, 0, 0, 0, "Second"),
            ],
            Vec::new(),
            DocumentMetadata::default(),
        )
    }

    #[test]
    fn test_find_element() {
        let model = model();
        let el = model.find_element("p0_b0_l0_w1").unwrap();
        assert_eq!(el.text, "World");
        assert!(matches!(
            model.find_element("p9_b0_l0_w0"),
            Err(Error::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_elements_on_page() {
        let model = model();
        let page0 = model.elements_on_page(0);
        assert_eq!(page0.len(), 2);
        assert_eq!(page0[0].text, "Hello");
        assert_eq!(model.elements_on_page(1).len(), 1);
        assert!(model.elements_on_page(5).is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let model = model();
        let summary = model.summary();
        assert_eq!(summary.page_count, 2);
        assert_eq!(summary.text_element_count, 3);
        assert_eq!(summary.image_count, 0);
        assert_eq!(summary.fonts, vec!["Helvetica (12pt)".to_string()]);
        assert_eq!(summary.colors, vec!["#000000".to_string()]);
    }

    #[test]
    fn test_font_set_deduplicates() {
        let model = model();
        assert_eq!(model.fonts().len(), 1);
        assert_eq!(model.colors().len(), 1);
    }
}
