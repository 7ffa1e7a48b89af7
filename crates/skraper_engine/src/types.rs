use std::collections::BTreeSet;

use skraper_core::CatalogItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Launching,
    Authenticating,
    Preparing,
    Discovering,
    Extracting,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Every identifier tracked in the row was seen at least twice.
    Converged,
    /// No scroll control, no items, or the scroll budget ran out.
    Abandoned,
    Cancelled,
}

/// Result of the discovery phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub ids: BTreeSet<CatalogItemId>,
    pub rows: Vec<RowOutcome>,
    pub cancelled: bool,
}

impl Discovery {
    /// Adds an identifier; false when it was already known.
    pub fn insert(&mut self, id: CatalogItemId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Counts reported once the extraction phase stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Identifiers left untouched because of cancellation.
    pub remaining: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StageChanged {
        provider: String,
        stage: Stage,
    },
    ItemDiscovered {
        provider: String,
        id: CatalogItemId,
        total: usize,
    },
    RowFinished {
        provider: String,
        row: usize,
        rows: usize,
        outcome: RowOutcome,
    },
    RecordAttempted {
        provider: String,
        id: CatalogItemId,
        valid: bool,
    },
    Finished {
        provider: String,
        report: ExtractionReport,
    },
}
