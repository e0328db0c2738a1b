//! The edit engine: targeted visual mutations of committed documents.
//!
//! Edits are non-reflowing and word-granular. An update splices the word's
//! producing show operator in place and compensates the advance delta, so
//! neighbouring elements keep their positions; replacement text wider than
//! the original span may visually overlap the next word. The rewritten
//! binary is committed through the store with an optimistic version check
//! and the model is re-derived from it — in-place field patches are never
//! trusted as ground truth.

mod splice;

use std::sync::Arc;

use log::{debug, warn};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::extract::ElementExtractor;
use crate::model::DocumentModel;
use crate::store::DocumentStore;

/// A requested element mutation. Omitted style fields keep the element's
/// stored values.
#[derive(Debug, Clone)]
pub struct ElementEdit {
    /// Replacement text
    pub new_text: String,
    /// Override font size in points (effective, as reported on the element)
    pub font_size: Option<f32>,
    /// Override text color
    pub color: Option<Color>,
}

impl ElementEdit {
    /// A plain text replacement keeping the stored style.
    pub fn text(new_text: impl Into<String>) -> Self {
        Self {
            new_text: new_text.into(),
            font_size: None,
            color: None,
        }
    }

    /// Override the font size.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Override the text color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Result of a search-and-replace pass.
#[derive(Debug)]
pub struct ReplaceOutcome {
    /// Number of elements actually changed
    pub replaced: usize,
    /// Model derived from the final committed binary
    pub model: DocumentModel,
}

/// Applies text and style mutations to document elements.
///
/// The store is constructor-injected; the engine holds no document state
/// of its own.
pub struct EditEngine {
    store: Arc<DocumentStore>,
    extractor: ElementExtractor,
}

impl EditEngine {
    /// Create an engine writing through the given store.
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            store,
            extractor: ElementExtractor::new(),
        }
    }

    /// Replace one element's text, optionally overriding its size and
    /// color.
    ///
    /// The element is resolved against a fresh extraction of the committed
    /// bytes, the rewritten binary replaces the blob (optimistic version
    /// check against the model's source version), and the returned model
    /// is re-derived from the new bytes.
    pub fn update_element(
        &self,
        model: &DocumentModel,
        element_id: &str,
        edit: &ElementEdit,
    ) -> Result<DocumentModel> {
        if edit.new_text.is_empty() {
            return Err(Error::Validation("replacement text must not be empty".into()));
        }
        if let Some(size) = edit.font_size {
            if !(size > 0.0) {
                return Err(Error::Validation("font size must be positive".into()));
            }
        }

        let document_id = model.document_id();
        let bytes = self.store.retrieve(document_id)?;
        let fresh = self
            .extractor
            .extract(&bytes, document_id, model.filename())?;
        let element = fresh.find_element(element_id)?;

        let new_bytes =
            splice::apply_update(&bytes, element, &edit.new_text, edit.font_size, edit.color)?;
        debug!(
            "updated element {} of document {} ({} -> {:?})",
            element_id, document_id, element.text, edit.new_text
        );
        self.commit(model, new_bytes)
    }

    /// Replace `term` with `replacement` in every element whose text
    /// contains it (or only the first such element when `all_matches` is
    /// false). Returns the number of elements actually changed.
    ///
    /// Matches never span two adjacent word elements: word granularity is
    /// the unit of substitution. A failing replacement is skipped with a
    /// warning and does not abort the scan.
    pub fn search_and_replace(
        &self,
        model: &DocumentModel,
        term: &str,
        replacement: &str,
        all_matches: bool,
    ) -> Result<ReplaceOutcome> {
        if term.is_empty() {
            return Err(Error::Validation("search term must not be empty".into()));
        }

        // Scan in document order against the caller's model.
        let mut targets: Vec<(String, String)> = model
            .text_elements()
            .iter()
            .filter(|el| el.text.contains(term))
            .map(|el| (el.element_id.clone(), el.text.replace(term, replacement)))
            .collect();
        if !all_matches {
            targets.truncate(1);
        }

        // Apply back-to-front: a replacement that introduces extra words
        // shifts the word indices after it on the same line, so later
        // targets are committed before earlier ones can disturb them.
        let mut current = model.clone();
        let mut replaced = 0;
        for (element_id, new_text) in targets.iter().rev() {
            match self.update_element(&current, element_id, &ElementEdit::text(new_text)) {
                Ok(next) => {
                    current = next;
                    replaced += 1;
                }
                Err(e) => warn!(
                    "search_and_replace: skipping element {}: {}",
                    element_id, e
                ),
            }
        }

        Ok(ReplaceOutcome {
            replaced,
            model: current,
        })
    }

    /// Draw an additional text run at arbitrary page coordinates, `(x, y)`
    /// being the baseline start in page space.
    ///
    /// The overlay is persisted and the model re-derived immediately, so
    /// the new run is addressable (as the page's last block) right away.
    pub fn add_text(
        &self,
        model: &DocumentModel,
        page: usize,
        x: f32,
        y: f32,
        text: &str,
        size: f32,
        color: Color,
    ) -> Result<DocumentModel> {
        if text.is_empty() {
            return Err(Error::Validation("overlay text must not be empty".into()));
        }
        if !(size > 0.0) {
            return Err(Error::Validation("font size must be positive".into()));
        }
        if page >= model.page_count() {
            return Err(Error::PageOutOfRange {
                page,
                page_count: model.page_count(),
            });
        }

        let bytes = self.store.retrieve(model.document_id())?;
        let new_bytes = splice::apply_add_text(&bytes, page, x, y, text, size, color)?;
        debug!(
            "added overlay text on page {} of document {}",
            page,
            model.document_id()
        );
        self.commit(model, new_bytes)
    }

    fn commit(&self, model: &DocumentModel, new_bytes: Vec<u8>) -> Result<DocumentModel> {
        let version = self.store.replace_blob(
            model.document_id(),
            new_bytes.clone(),
            Some(model.source_version()),
        )?;
        let mut updated =
            self.extractor
                .extract(&new_bytes, model.document_id(), model.filename())?;
        updated.set_source_version(version);
        Ok(updated)
    }
}
