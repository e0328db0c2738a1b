//! Versioned document store.
//!
//! Blobs live as files under `blobs/`, addressed by an opaque UUID handle;
//! metadata records are fixed-schema structs persisted as a JSON index with
//! an atomic tmp+rename write. Initialization is explicit (`open`) and
//! probes writability up front — there is no lazy first-use path.
//!
//! Replace ordering is write-then-repoint-then-delete: the new blob is
//! durably written before the record is repointed, and the old blob is
//! removed only after the repoint is persisted. Readers resolve the handle
//! and read the blob under the read lock, so a concurrent replace can
//! never unlink a blob mid-read or expose a partial write.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::elements::{ImageKind, TextElement};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::model::{DocumentMetadata, DocumentModel};

/// Default size limit applied by [`DocumentStore::open`].
pub const DEFAULT_MAX_FILE_SIZE: usize = 16 * 1024 * 1024;

/// Lifecycle status of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Stored as uploaded, never rewritten
    Uploaded,
    /// Rewritten by at least one edit
    Updated,
}

/// Persisted descriptor of one document version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Document id (UUID string)
    pub document_id: String,
    /// Opaque handle of the committed blob
    pub handle: String,
    /// Original filename
    pub filename: String,
    /// Byte size of the committed blob
    pub file_size: u64,
    /// Opaque owner identity, for tagging only
    pub owner_id: Option<String>,
    /// Record creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
    /// Lifecycle status
    pub status: DocumentStatus,
    /// Monotonic version, bumped on every blob replacement
    pub version: u64,
    /// Structural snapshot upserted by `store_document_model`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ModelSnapshot>,
}

/// Image descriptor inside a snapshot. Raster payloads stay in the blob
/// store; the snapshot keeps only the placement and source reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Image id
    pub image_id: String,
    /// Page index
    pub page: usize,
    /// Placement rectangle
    pub bbox: Rect,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Payload encoding
    pub format: ImageKind,
    /// Reference into the document's object table
    pub object_ref: (u32, u16),
}

/// Serializable structural snapshot of one parse of one document version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Number of pages
    pub page_count: usize,
    /// Word-level text elements in reading order
    pub text_elements: Vec<TextElement>,
    /// Image descriptors in document order
    pub images: Vec<ImageRecord>,
    /// Deduplicated font labels
    pub fonts: Vec<String>,
    /// Deduplicated colors as `#rrggbb`
    pub colors: Vec<String>,
    /// Document information dictionary
    pub metadata: DocumentMetadata,
}

impl ModelSnapshot {
    /// Build a snapshot from a loaded model.
    pub fn from_model(model: &DocumentModel) -> Self {
        Self {
            page_count: model.page_count(),
            text_elements: model.text_elements().to_vec(),
            images: model
                .images()
                .iter()
                .map(|img| ImageRecord {
                    image_id: img.image_id.clone(),
                    page: img.page,
                    bbox: img.bbox,
                    width: img.width,
                    height: img.height,
                    format: img.format,
                    object_ref: img.object_ref,
                })
                .collect(),
            fonts: model.fonts().to_vec(),
            colors: model.colors().iter().map(|c| c.hex()).collect(),
            metadata: model.metadata().clone(),
        }
    }
}

/// Result of storing a new document.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    /// Generated document id
    pub document_id: String,
    /// Handle of the stored blob
    pub handle: String,
    /// Stored byte size
    pub size: u64,
}

/// Outcome of a delete, distinguishing partial from full success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Blob and record both removed
    Complete,
    /// Record removed, but the blob was already gone
    BlobMissing,
}

impl DeleteOutcome {
    /// True only for a full (blob + record) removal.
    pub fn is_complete(&self) -> bool {
        matches!(self, DeleteOutcome::Complete)
    }
}

/// Filesystem-backed blob and metadata store.
pub struct DocumentStore {
    blobs: PathBuf,
    index_path: PathBuf,
    max_file_size: usize,
    state: RwLock<HashMap<String, MetadataRecord>>,
}

impl DocumentStore {
    /// Open (and initialize if needed) a store rooted at `root`, with the
    /// default size limit.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(root, DEFAULT_MAX_FILE_SIZE)
    }

    /// Open a store with an explicit size limit.
    ///
    /// Creates the directory layout, loads the metadata index, and probes
    /// writability so failures surface at startup rather than on first use.
    pub fn open_with(root: impl AsRef<Path>, max_file_size: usize) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let blobs = root.join("blobs");
        fs::create_dir_all(&blobs)?;

        let index_path = root.join("index.json");
        let records = if index_path.exists() {
            let data = fs::read(&index_path)
                .map_err(|e| Error::Storage(format!("cannot read metadata index: {}", e)))?;
            serde_json::from_slice(&data)
                .map_err(|e| Error::Storage(format!("corrupt metadata index: {}", e)))?
        } else {
            HashMap::new()
        };

        let store = Self {
            blobs,
            index_path,
            max_file_size,
            state: RwLock::new(records),
        };
        store.health_check()?;
        Ok(store)
    }

    /// Verify the store is writable.
    pub fn health_check(&self) -> Result<()> {
        let probe = self.blobs.join(".probe");
        fs::write(&probe, b"ok")
            .map_err(|e| Error::Storage(format!("store is not writable: {}", e)))?;
        fs::remove_file(&probe).ok();
        Ok(())
    }

    /// Number of stored documents.
    pub fn document_count(&self) -> usize {
        self.read_state().len()
    }

    /// Store a new document, generating a fresh document id.
    pub fn store(
        &self,
        bytes: &[u8],
        filename: &str,
        owner: Option<&str>,
    ) -> Result<StoredDocument> {
        let document_id = Uuid::new_v4().to_string();
        self.store_as(&document_id, bytes, filename, owner)
    }

    /// Store a new document under a caller-provided id (used by the
    /// workspace, which must parse before it stores).
    pub(crate) fn store_as(
        &self,
        document_id: &str,
        bytes: &[u8],
        filename: &str,
        owner: Option<&str>,
    ) -> Result<StoredDocument> {
        self.check_size(bytes)?;

        let handle = new_handle();
        self.write_blob(&handle, bytes)?;

        let now = Utc::now();
        let record = MetadataRecord {
            document_id: document_id.to_string(),
            handle: handle.clone(),
            filename: filename.to_string(),
            file_size: bytes.len() as u64,
            owner_id: owner.map(str::to_string),
            created_at: now,
            updated_at: now,
            status: DocumentStatus::Uploaded,
            version: 1,
            snapshot: None,
        };

        let mut state = self.write_state();
        if state.contains_key(document_id) {
            drop(state);
            self.remove_blob_quietly(&handle);
            return Err(Error::Storage(format!(
                "document id already exists: {}",
                document_id
            )));
        }
        state.insert(document_id.to_string(), record);
        if let Err(e) = self.persist_index(&state) {
            state.remove(document_id);
            drop(state);
            self.remove_blob_quietly(&handle);
            return Err(e);
        }
        drop(state);

        debug!(
            "stored document {} ({} bytes) as blob {}",
            document_id,
            bytes.len(),
            handle
        );
        Ok(StoredDocument {
            document_id: document_id.to_string(),
            handle,
            size: bytes.len() as u64,
        })
    }

    /// Retrieve the committed bytes of a document.
    ///
    /// The blob is read under the read lock: a replace cannot repoint or
    /// unlink it until every in-flight read finishes, so readers never see
    /// a truncated or deleted blob.
    pub fn retrieve(&self, document_id: &str) -> Result<Vec<u8>> {
        let state = self.read_state();
        let record = state
            .get(document_id)
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;
        fs::read(self.blob_path(&record.handle))
            .map_err(|e| Error::Storage(format!("cannot read blob {}: {}", record.handle, e)))
    }

    /// Metadata record for a document, if present.
    pub fn get_record(&self, document_id: &str) -> Option<MetadataRecord> {
        self.read_state().get(document_id).cloned()
    }

    /// Replace a document's committed bytes, returning the new version.
    ///
    /// When `expected_version` is given, the replace is rejected with
    /// [`Error::Conflict`] if another writer committed first; the losing
    /// writer should reload and retry.
    pub fn replace_blob(
        &self,
        document_id: &str,
        new_bytes: Vec<u8>,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        self.check_size(&new_bytes)?;

        // Write the new blob before touching the record: a crash from here
        // on leaves either the old committed state or the fully written new
        // one, never a record pointing at a missing blob.
        let new_handle = new_handle();
        self.write_blob(&new_handle, &new_bytes)?;

        let mut state = self.write_state();
        let record = match state.get_mut(document_id) {
            Some(record) => record,
            None => {
                drop(state);
                self.remove_blob_quietly(&new_handle);
                return Err(Error::DocumentNotFound(document_id.to_string()));
            }
        };
        if let Some(expected) = expected_version {
            if record.version != expected {
                let actual = record.version;
                drop(state);
                self.remove_blob_quietly(&new_handle);
                return Err(Error::Conflict { expected, actual });
            }
        }

        let rollback = record.clone();
        let old_handle = std::mem::replace(&mut record.handle, new_handle.clone());
        record.file_size = new_bytes.len() as u64;
        record.status = DocumentStatus::Updated;
        record.updated_at = Utc::now();
        record.version += 1;
        let new_version = record.version;

        if let Err(e) = self.persist_index(&state) {
            if let Some(record) = state.get_mut(document_id) {
                *record = rollback;
            }
            drop(state);
            self.remove_blob_quietly(&new_handle);
            return Err(e);
        }
        drop(state);

        // Only now is the old blob unreferenced and safe to drop.
        self.remove_blob_quietly(&old_handle);
        debug!(
            "replaced blob of document {} (version {})",
            document_id, new_version
        );
        Ok(new_version)
    }

    /// Upsert the structural snapshot into the document's existing
    /// metadata record.
    ///
    /// Upsert means merge-into-existing: a snapshot must never create a
    /// second record that lacks the blob handle, so an unknown id is an
    /// error rather than an insert.
    pub fn store_document_model(
        &self,
        model: &DocumentModel,
        owner: Option<&str>,
    ) -> Result<()> {
        let snapshot = ModelSnapshot::from_model(model);
        let mut state = self.write_state();
        let record = state
            .get_mut(model.document_id())
            .ok_or_else(|| Error::DocumentNotFound(model.document_id().to_string()))?;

        let rollback = record.clone();
        record.snapshot = Some(snapshot);
        record.updated_at = Utc::now();
        if let Some(owner) = owner {
            record.owner_id = Some(owner.to_string());
        }

        if let Err(e) = self.persist_index(&state) {
            if let Some(record) = state.get_mut(model.document_id()) {
                *record = rollback;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Delete a document: blob first, then the metadata record.
    ///
    /// A blob that is already gone is reported as [`DeleteOutcome::BlobMissing`]
    /// rather than silently swallowed; an IO failure removing the blob
    /// aborts with the record intact.
    pub fn delete(&self, document_id: &str) -> Result<DeleteOutcome> {
        let mut state = self.write_state();
        let record = state
            .get(document_id)
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;

        let blob_path = self.blob_path(&record.handle);
        let outcome = match fs::remove_file(&blob_path) {
            Ok(()) => DeleteOutcome::Complete,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "blob {} of document {} was already missing",
                    record.handle, document_id
                );
                DeleteOutcome::BlobMissing
            }
            Err(e) => {
                return Err(Error::Storage(format!(
                    "cannot delete blob {}: {}",
                    record.handle, e
                )));
            }
        };

        let removed = state.remove(document_id);
        if let Err(e) = self.persist_index(&state) {
            if let Some(record) = removed {
                state.insert(document_id.to_string(), record);
            }
            return Err(e);
        }
        debug!("deleted document {} ({:?})", document_id, outcome);
        Ok(outcome)
    }

    /// Records owned by `owner`, newest first.
    pub fn list_for_owner(&self, owner: &str) -> Vec<MetadataRecord> {
        let state = self.read_state();
        let mut records: Vec<MetadataRecord> = state
            .values()
            .filter(|r| r.owner_id.as_deref() == Some(owner))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    fn check_size(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.max_file_size {
            return Err(Error::Validation(format!(
                "document exceeds size limit ({} > {} bytes)",
                bytes.len(),
                self.max_file_size
            )));
        }
        Ok(())
    }

    fn blob_path(&self, handle: &str) -> PathBuf {
        self.blobs.join(handle)
    }

    fn write_blob(&self, handle: &str, bytes: &[u8]) -> Result<()> {
        let path = self.blob_path(handle);
        let mut file = File::create(&path)
            .map_err(|e| Error::Storage(format!("cannot create blob {}: {}", handle, e)))?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| Error::Storage(format!("cannot write blob {}: {}", handle, e)))
    }

    fn remove_blob_quietly(&self, handle: &str) {
        if let Err(e) = fs::remove_file(self.blob_path(handle)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove blob {}: {}", handle, e);
            }
        }
    }

    /// Persist the metadata index atomically (tmp file + rename).
    fn persist_index(&self, records: &HashMap<String, MetadataRecord>) -> Result<()> {
        let tmp = self.index_path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(records)
            .map_err(|e| Error::Storage(format!("cannot serialize metadata index: {}", e)))?;
        let mut file = File::create(&tmp)
            .map_err(|e| Error::Storage(format!("cannot write metadata index: {}", e)))?;
        file.write_all(&data)
            .and_then(|_| file.sync_all())
            .map_err(|e| Error::Storage(format!("cannot write metadata index: {}", e)))?;
        fs::rename(&tmp, &self.index_path)
            .map_err(|e| Error::Storage(format!("cannot commit metadata index: {}", e)))
    }

    fn read_state(&self) -> RwLockReadGuard<'_, HashMap<String, MetadataRecord>> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, HashMap<String, MetadataRecord>> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn new_handle() -> String {
    format!("{}.bin", Uuid::new_v4())
}
