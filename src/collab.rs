//! External collaborator interfaces.
//!
//! Conversion and OCR are consumed as traits: the core has no structural
//! awareness of other formats and no recognition engine of its own. Both
//! run as CPU-bound auxiliary work, strictly read-only with respect to the
//! stored document, bounded by a timeout and cancelable without touching
//! document state — an abandoned job leaves nothing to undo.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::warn;

use crate::elements::ImageElement;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::model::DocumentModel;

/// Format tags for the conversion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// PDF
    Pdf,
    /// Word document
    Docx,
    /// Plain text
    PlainText,
    /// PNG raster
    Png,
}

/// Document format converter (PDF↔Word, images→PDF, ...).
///
/// Input and output are raw bytes plus format tags; failures are the
/// collaborator's to report and the core's to surface.
pub trait FormatConverter: Send + Sync {
    /// Convert `bytes` from one format to another.
    fn convert(&self, bytes: &[u8], from: DocumentFormat, to: DocumentFormat) -> Result<Vec<u8>>;
}

/// Text recognition over one extracted image.
pub trait TextRecognizer: Send + Sync {
    /// Extract plain text from the image payload.
    fn recognize(&self, image: &ImageElement) -> Result<String>;
}

/// Recognized text for one image.
#[derive(Debug, Clone)]
pub struct ImageText {
    /// Source image id
    pub image_id: String,
    /// Page the image is placed on
    pub page: usize,
    /// Placement rectangle
    pub bbox: Rect,
    /// Recognized text, empty when recognition failed
    pub text: String,
}

/// Run a recognizer over every image of a model.
///
/// Per-image failures are isolated: a failing image yields an empty string
/// and a warning, and never aborts the remaining images.
pub fn recognize_images(model: &DocumentModel, recognizer: &dyn TextRecognizer) -> Vec<ImageText> {
    model
        .images()
        .iter()
        .map(|image| {
            let text = match recognizer.recognize(image) {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    warn!("text recognition failed for {}: {}", image.image_id, e);
                    String::new()
                }
            };
            ImageText {
                image_id: image.image_id.clone(),
                page: image.page,
                bbox: image.bbox,
                text,
            }
        })
        .collect()
}

/// Cooperative cancellation token for auxiliary jobs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncanceled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs auxiliary work on a worker thread under a time budget.
///
/// On timeout the job is marked canceled and abandoned; since auxiliary
/// work produces no required side effect, abandonment leaves state
/// unchanged.
#[derive(Debug, Clone)]
pub struct BoundedRunner {
    timeout: Duration,
}

impl BoundedRunner {
    /// Create a runner with the given time budget.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run a job to completion or timeout.
    pub fn run<T, F>(&self, label: &str, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.run_cancelable(label, CancelToken::new(), move |_| job())
    }

    /// Run a job that polls the token for cooperative cancellation.
    pub fn run_cancelable<T, F>(&self, label: &str, token: CancelToken, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancelToken) -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let job_token = token.clone();
        thread::Builder::new()
            .name(format!("aux-{}", label))
            .spawn(move || {
                let _ = tx.send(job(&job_token));
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(value) => Ok(value),
            Err(_) => {
                token.cancel();
                warn!("auxiliary job {} exceeded {:?}, abandoned", label, self.timeout);
                Err(Error::Timeout(label.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_completes() {
        let runner = BoundedRunner::new(Duration::from_secs(5));
        let result = runner.run("fast", || 41 + 1).unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn test_run_times_out() {
        let runner = BoundedRunner::new(Duration::from_millis(20));
        let result: Result<()> = runner.run("slow", || {
            thread::sleep(Duration::from_secs(2));
        });
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[test]
    fn test_timeout_requests_cancellation() {
        let runner = BoundedRunner::new(Duration::from_millis(20));
        let token = CancelToken::new();
        let observed = token.clone();
        let result: Result<()> = runner.run_cancelable("slow", token.clone(), move |t| {
            while !t.is_canceled() {
                thread::sleep(Duration::from_millis(5));
            }
        });
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert!(observed.is_canceled());
    }
}
