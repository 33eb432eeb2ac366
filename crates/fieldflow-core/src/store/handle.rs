//! Record handles and batches.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fieldflow_proto::{RecordId, Value};
use parking_lot::Mutex;

/// A live record: identifier plus a lazily filled attribute cache.
///
/// The cache is a read optimisation only. Anything that needs the
/// authoritative value (the transition guard in particular) reads the store.
#[derive(Debug)]
pub struct RecordHandle {
    record_type: String,
    id: RecordId,
    cache: Mutex<HashMap<String, Value>>,
}

impl RecordHandle {
    /// Create a handle with an empty cache.
    pub fn new(record_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            record_type: record_type.into(),
            id,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Record identifier.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Record type name.
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Cached value of an attribute.
    pub fn cached(&self, attribute: &str) -> Option<Value> {
        self.cache.lock().get(attribute).cloned()
    }

    /// Check if an attribute is cached.
    pub fn is_cached(&self, attribute: &str) -> bool {
        self.cache.lock().contains_key(attribute)
    }

    /// Store a value in the cache.
    pub fn cache_value(&self, attribute: impl Into<String>, value: Value) {
        self.cache.lock().insert(attribute.into(), value);
    }

    /// Drop one cached attribute.
    pub fn invalidate(&self, attribute: &str) {
        self.cache.lock().remove(attribute);
    }

    /// Drop every cached attribute.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

/// An ordered batch of handles of one record type.
///
/// Cloning or filtering a batch shares the handles, so caches stay shared.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    record_type: String,
    handles: Vec<Arc<RecordHandle>>,
}

impl RecordBatch {
    /// Create an empty batch.
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            handles: Vec::new(),
        }
    }

    /// Create a batch of fresh handles. Repeated ids keep their first position.
    pub fn from_ids(record_type: impl Into<String>, ids: &[RecordId]) -> Self {
        let record_type = record_type.into();
        let mut seen = HashSet::with_capacity(ids.len());
        let handles = ids
            .iter()
            .filter(|id| seen.insert(**id))
            .map(|id| Arc::new(RecordHandle::new(record_type.clone(), *id)))
            .collect();
        Self {
            record_type,
            handles,
        }
    }

    /// Record type of every handle in the batch.
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Identifiers in batch order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.handles.iter().map(|h| h.id()).collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Iterate over handles in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RecordHandle>> {
        self.handles.iter()
    }

    /// Handle at a position.
    pub fn get(&self, index: usize) -> Option<&Arc<RecordHandle>> {
        self.handles.get(index)
    }

    /// Handle with a given id.
    pub fn find(&self, id: RecordId) -> Option<&Arc<RecordHandle>> {
        self.handles.iter().find(|h| h.id() == id)
    }

    /// Sub-batch of the handles matching `keep`, order preserved.
    pub fn filter<F>(&self, mut keep: F) -> RecordBatch
    where
        F: FnMut(&RecordHandle) -> bool,
    {
        RecordBatch {
            record_type: self.record_type.clone(),
            handles: self
                .handles
                .iter()
                .filter(|h| keep(h))
                .cloned()
                .collect(),
        }
    }

    /// Sub-batch of the handles whose id is in `ids`, batch order preserved.
    pub fn select(&self, ids: &HashSet<RecordId>) -> RecordBatch {
        self.filter(|h| ids.contains(&h.id()))
    }

    /// Drop one cached attribute on every handle.
    pub fn invalidate(&self, attribute: &str) {
        for handle in &self.handles {
            handle.invalidate(attribute);
        }
    }
}

impl<'a> IntoIterator for &'a RecordBatch {
    type Item = &'a Arc<RecordHandle>;
    type IntoIter = std::slice::Iter<'a, Arc<RecordHandle>>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.iter()
    }
}
