//! High-level document workspace.
//!
//! Wires the store, extractor, edit engine, renderer and arena together
//! behind explicit document ids. All dependencies are constructor-injected
//! and initialized up front; there is no lazy singleton and no implicit
//! "current document".

use std::path::Path;
use std::sync::Arc;

use log::debug;
use uuid::Uuid;

use crate::arena::DocumentArena;
use crate::collab::{self, BoundedRunner, DocumentFormat, FormatConverter, ImageText, TextRecognizer};
use crate::color::Color;
use crate::config::WorkspaceConfig;
use crate::editor::{EditEngine, ElementEdit};
use crate::error::{Error, Result};
use crate::extract::ElementExtractor;
use crate::model::{DocumentModel, DocumentSummary};
use crate::render::{PageRenderer, RenderedPage};
use crate::store::{DeleteOutcome, DocumentStore, MetadataRecord};

/// Result of a workspace-level search and replace.
#[derive(Debug)]
pub struct ReplaceReport {
    /// Number of elements actually changed
    pub replaced: usize,
    /// Model derived from the final committed binary
    pub model: Arc<DocumentModel>,
}

/// Document workspace: upload, address, edit, render, delete.
pub struct Workspace {
    config: WorkspaceConfig,
    store: Arc<DocumentStore>,
    extractor: ElementExtractor,
    engine: EditEngine,
    renderer: PageRenderer,
    arena: DocumentArena,
}

impl Workspace {
    /// Build a workspace over an already opened store.
    pub fn new(store: Arc<DocumentStore>, config: WorkspaceConfig) -> Self {
        Self {
            engine: EditEngine::new(Arc::clone(&store)),
            renderer: PageRenderer::new().with_max_zoom(config.max_zoom),
            arena: DocumentArena::new(config.arena_capacity),
            extractor: ElementExtractor::new(),
            store,
            config,
        }
    }

    /// Open (or initialize) a store at `root` and build a workspace on it.
    pub fn open_at(root: impl AsRef<Path>, config: WorkspaceConfig) -> Result<Self> {
        let store = Arc::new(DocumentStore::open_with(root, config.max_file_size)?);
        Ok(Self::new(store, config))
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Parse and persist an uploaded document.
    ///
    /// Parsing happens before anything is stored: unparsable input fails
    /// with a parse error and leaves no document id or metadata record
    /// behind.
    pub fn upload(
        &self,
        bytes: &[u8],
        filename: &str,
        owner: Option<&str>,
    ) -> Result<Arc<DocumentModel>> {
        if bytes.len() > self.config.max_file_size {
            return Err(Error::Validation(format!(
                "document exceeds size limit ({} > {} bytes)",
                bytes.len(),
                self.config.max_file_size
            )));
        }

        let document_id = Uuid::new_v4().to_string();
        let mut model = self.extractor.extract(bytes, &document_id, filename)?;

        self.store.store_as(&document_id, bytes, filename, owner)?;
        model.set_source_version(1);
        self.store.store_document_model(&model, owner)?;

        debug!("uploaded document {} ({})", document_id, filename);
        Ok(self.arena.insert(model))
    }

    /// Load a document's structural model, from the arena when the cached
    /// copy still matches the committed version.
    pub fn open(&self, document_id: &str) -> Result<Arc<DocumentModel>> {
        let record = self
            .store
            .get_record(document_id)
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;

        if let Some(model) = self.arena.get(document_id) {
            if model.source_version() == record.version {
                return Ok(model);
            }
        }

        let bytes = self.store.retrieve(document_id)?;
        let mut model = self.extractor.extract(&bytes, document_id, &record.filename)?;
        model.set_source_version(record.version);
        Ok(self.arena.insert(model))
    }

    /// Summary of a loaded document.
    pub fn summary(&self, document_id: &str) -> Result<DocumentSummary> {
        Ok(self.open(document_id)?.summary())
    }

    /// Replace one element's text and/or style. Returns the model derived
    /// from the rewritten binary.
    pub fn update_element(
        &self,
        document_id: &str,
        element_id: &str,
        edit: &ElementEdit,
    ) -> Result<Arc<DocumentModel>> {
        let model = self.open(document_id)?;
        let updated = self.engine.update_element(&model, element_id, edit)?;
        self.store.store_document_model(&updated, None)?;
        Ok(self.arena.insert(updated))
    }

    /// Replace `term` with `replacement` across the document.
    pub fn search_and_replace(
        &self,
        document_id: &str,
        term: &str,
        replacement: &str,
        all_matches: bool,
    ) -> Result<ReplaceReport> {
        let model = self.open(document_id)?;
        let outcome = self
            .engine
            .search_and_replace(&model, term, replacement, all_matches)?;
        self.store.store_document_model(&outcome.model, None)?;
        Ok(ReplaceReport {
            replaced: outcome.replaced,
            model: self.arena.insert(outcome.model),
        })
    }

    /// Draw an overlay text run at page coordinates and re-derive the
    /// model, making the new run addressable immediately.
    #[allow(clippy::too_many_arguments)]
    pub fn add_text(
        &self,
        document_id: &str,
        page: usize,
        x: f32,
        y: f32,
        text: &str,
        size: f32,
        color: Color,
    ) -> Result<Arc<DocumentModel>> {
        let model = self.open(document_id)?;
        let updated = self.engine.add_text(&model, page, x, y, text, size, color)?;
        self.store.store_document_model(&updated, None)?;
        Ok(self.arena.insert(updated))
    }

    /// Render one page of the committed binary at a zoom factor.
    pub fn render_page(&self, document_id: &str, page: usize, zoom: f32) -> Result<RenderedPage> {
        let bytes = self.store.retrieve(document_id)?;
        self.renderer.render_page(&bytes, page, zoom)
    }

    /// Render one page as a `data:image/png;base64,...` URI.
    pub fn render_page_data_uri(
        &self,
        document_id: &str,
        page: usize,
        zoom: f32,
    ) -> Result<String> {
        let bytes = self.store.retrieve(document_id)?;
        self.renderer.render_page_data_uri(&bytes, page, zoom)
    }

    /// Delete a document and drop it from the arena.
    pub fn delete(&self, document_id: &str) -> Result<DeleteOutcome> {
        let outcome = self.store.delete(document_id)?;
        self.arena.remove(document_id);
        Ok(outcome)
    }

    /// Records owned by `owner`, newest first.
    pub fn list_for_owner(&self, owner: &str) -> Vec<MetadataRecord> {
        self.store.list_for_owner(owner)
    }

    /// Run a recognizer over the document's images, bounded by the
    /// configured auxiliary timeout. Read-only with respect to the stored
    /// document.
    pub fn recognize_images(
        &self,
        document_id: &str,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Result<Vec<ImageText>> {
        let model = self.open(document_id)?;
        let runner = BoundedRunner::new(self.config.auxiliary_timeout);
        runner.run("ocr", move || {
            collab::recognize_images(&model, recognizer.as_ref())
        })
    }

    /// Convert the committed binary to another format through a
    /// collaborator, bounded by the configured auxiliary timeout.
    pub fn convert_document(
        &self,
        document_id: &str,
        from: DocumentFormat,
        to: DocumentFormat,
        converter: Arc<dyn FormatConverter>,
    ) -> Result<Vec<u8>> {
        let bytes = self.store.retrieve(document_id)?;
        let runner = BoundedRunner::new(self.config.auxiliary_timeout);
        runner.run("convert", move || converter.convert(&bytes, from, to))?
    }
}
