use std::collections::HashMap;

use crate::CatalogItemId;

/// View count at which an identifier counts as fully observed in its row.
pub const FULLY_OBSERVED: u32 = 2;

/// Per-row observation counts used to decide when a row is exhausted.
///
/// Seeing every identifier twice tolerates the visible set shifting slightly
/// between consecutive horizontal scrolls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryRecord {
    seen: HashMap<CatalogItemId, u32>,
}

impl DiscoveryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one sighting and returns the identifier's new view count.
    pub fn observe(&mut self, id: &CatalogItemId) -> u32 {
        let count = self.seen.entry(id.clone()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn view_count(&self, id: &CatalogItemId) -> u32 {
        self.seen.get(id).copied().unwrap_or(0)
    }

    pub fn is_fully_observed(&self, id: &CatalogItemId) -> bool {
        self.view_count(id) >= FULLY_OBSERVED
    }

    /// True once at least one identifier is tracked and all of them are fully
    /// observed. An empty row never converges on its own.
    pub fn is_converged(&self) -> bool {
        !self.seen.is_empty() && self.seen.values().all(|&count| count >= FULLY_OBSERVED)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &CatalogItemId> {
        self.seen.keys()
    }
}
