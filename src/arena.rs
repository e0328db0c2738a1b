//! LRU arena of loaded document models.
//!
//! Replaces the process-wide "current document" pointer with explicit
//! handles: callers address documents by id and the arena keeps the most
//! recently used models loaded, evicting the least recently used entry
//! once capacity is reached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use crate::model::DocumentModel;

struct Entry {
    model: Arc<DocumentModel>,
    last_used: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    tick: u64,
}

/// Bounded cache of loaded [`DocumentModel`]s keyed by document id.
pub struct DocumentArena {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl DocumentArena {
    /// Create an arena holding at most `capacity` models.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                tick: 0,
            }),
        }
    }

    /// Fetch a loaded model, marking it most recently used.
    pub fn get(&self, document_id: &str) -> Option<Arc<DocumentModel>> {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.get_mut(document_id).map(|entry| {
            entry.last_used = tick;
            Arc::clone(&entry.model)
        })
    }

    /// Insert (or replace) a model, evicting the least recently used entry
    /// when over capacity. Returns the shared handle.
    pub fn insert(&self, model: DocumentModel) -> Arc<DocumentModel> {
        let model = Arc::new(model);
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.insert(
            model.document_id().to_string(),
            Entry {
                model: Arc::clone(&model),
                last_used: tick,
            },
        );

        while inner.entries.len() > self.capacity {
            if let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone())
            {
                debug!("arena evicting {}", oldest);
                inner.entries.remove(&oldest);
            } else {
                break;
            }
        }
        model
    }

    /// Drop a model from the arena (after a delete).
    pub fn remove(&self, document_id: &str) {
        self.lock().entries.remove(document_id);
    }

    /// Number of loaded models.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// True when no models are loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
