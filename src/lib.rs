//! # PDF Studio
//!
//! Structural PDF editing toolkit: parse a document into addressable
//! text/image elements, mutate individual text runs in place, and persist
//! versioned binary content.
//!
//! ## Core pieces
//!
//! - **Extraction**: [`ElementExtractor`] turns raw bytes into a
//!   [`DocumentModel`] of word-level [`elements::TextElement`]s and
//!   [`elements::ImageElement`]s, each with a deterministic id derived
//!   from its (page, block, line, word) position.
//! - **Editing**: [`EditEngine`] applies non-reflowing, word-granular
//!   mutations by splicing the producing content-stream operator, keeping
//!   neighbouring elements in place via advance compensation.
//! - **Rendering**: [`PageRenderer`] rasterizes a page to PNG at a zoom
//!   factor, with a data-URI wrapper for browser embedding.
//! - **Storage**: [`DocumentStore`] keeps blobs and typed metadata records
//!   with atomic write-then-repoint-then-delete replacement and optimistic
//!   versioning.
//! - **Workspace**: [`Workspace`] ties the pieces together behind explicit
//!   document ids with an LRU arena of loaded models.
//!
//! ## Quick start
//!
//! ```ignore
//! use pdf_studio::{Workspace, WorkspaceConfig, ElementEdit};
//!
//! # fn main() -> pdf_studio::Result<()> {
//! let workspace = Workspace::open_at("./documents", WorkspaceConfig::new())?;
//!
//! let model = workspace.upload(&std::fs::read("invoice.pdf")?, "invoice.pdf", None)?;
//! let first = &model.text_elements()[0];
//! println!("{}: {:?}", first.element_id, first.text);
//!
//! let model = workspace.update_element(
//!     model.document_id(),
//!     "p0_b0_l0_w0",
//!     &ElementEdit::text("Hello"),
//! )?;
//! let png = workspace.render_page(model.document_id(), 0, 1.5)?;
//! png.as_bytes();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Geometry and color primitives
pub mod color;
pub mod geometry;

// Addressable elements and the structural model
pub mod elements;
pub mod model;

// Content-stream interpretation (shared by extraction, editing, rendering)
mod content;

// Components
pub mod arena;
pub mod editor;
pub mod extract;
pub mod render;
pub mod store;

// External collaborator interfaces
pub mod collab;

// Configuration and the high-level facade
pub mod config;
pub mod workspace;

// Re-exports
pub use arena::DocumentArena;
pub use color::Color;
pub use config::WorkspaceConfig;
pub use editor::{EditEngine, ElementEdit, ReplaceOutcome};
pub use elements::{element_id, FontFlags, ImageElement, ImageKind, TextElement};
pub use error::{Error, Result};
pub use extract::ElementExtractor;
pub use geometry::{Point, Rect};
pub use model::{DocumentMetadata, DocumentModel, DocumentSummary};
pub use render::{PageRenderer, RenderedPage};
pub use store::{
    DeleteOutcome, DocumentStatus, DocumentStore, MetadataRecord, ModelSnapshot, StoredDocument,
};
pub use workspace::{ReplaceReport, Workspace};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pdf_studio");
    }
}
