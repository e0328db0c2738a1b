//! Error types for the PDF studio library.
//!
//! This module defines all error types that can occur while loading,
//! editing, rendering, and storing documents.

/// Result type alias for PDF studio operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during document processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input bytes are not a readable PDF (corrupt, encrypted, or not a PDF
    /// at all). Loading is all-or-nothing: no partial model is exposed.
    #[error("Failed to parse document: {reason}")]
    Parse {
        /// Reason for parse failure
        reason: String,
    },

    /// Unknown document id
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Unknown element id within a loaded document
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Page index outside the document
    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange {
        /// Requested page index (0-based)
        page: usize,
        /// Number of pages in the document
        page_count: usize,
    },

    /// Rasterization failure (bad zoom factor, pixmap allocation, encoding)
    #[error("Render error: {0}")]
    Render(String),

    /// Input rejected by configured policy (size/type limits)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Blob or metadata read/write/delete failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Optimistic version check failed: another writer committed first.
    /// The losing writer should reload the document and retry.
    #[error("Version conflict: expected {expected}, found {actual}")]
    Conflict {
        /// Version the caller derived its model from
        expected: u64,
        /// Version currently committed in the store
        actual: u64,
    },

    /// Operation is valid but not supported by the edit strategy
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Auxiliary work exceeded its time budget and was abandoned
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Parse`] with the given reason.
    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        Error::Parse {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = Error::parse("bad xref");
        let msg = format!("{}", err);
        assert!(msg.contains("Failed to parse document"));
        assert!(msg.contains("bad xref"));
    }

    #[test]
    fn test_page_out_of_range_message() {
        let err = Error::PageOutOfRange {
            page: 7,
            page_count: 3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains('7'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_conflict_message() {
        let err = Error::Conflict {
            expected: 2,
            actual: 5,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("found 5"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
