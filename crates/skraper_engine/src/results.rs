use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use skraper_core::MediaRecord;

/// Append-only, multi-writer collection of valid records.
///
/// Clones share the same storage, so every pipeline of a run can hold one.
#[derive(Debug, Clone, Default)]
pub struct ResultCollection {
    records: Arc<Mutex<Vec<MediaRecord>>>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record` if it is valid. Returns whether it was stored.
    pub fn push(&self, record: MediaRecord) -> bool {
        if !record.is_valid() {
            return false;
        }
        self.lock().push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the records stored so far, in insertion order.
    pub fn snapshot(&self) -> Vec<MediaRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MediaRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
