use std::sync::mpsc;

use skraper_core::CatalogItemId;

use crate::{EngineEvent, ExtractionReport, RowOutcome, Stage};

/// Receives progress of a scraping pass; implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardProgress;

impl ProgressSink for DiscardProgress {
    fn emit(&self, _event: EngineEvent) {}
}

/// Stamps events with the provider they belong to.
#[derive(Clone, Copy)]
pub struct Reporter<'a> {
    provider: &'a str,
    sink: &'a dyn ProgressSink,
}

impl<'a> Reporter<'a> {
    pub fn new(provider: &'a str, sink: &'a dyn ProgressSink) -> Self {
        Self { provider, sink }
    }

    pub fn provider(&self) -> &'a str {
        self.provider
    }

    pub fn stage(&self, stage: Stage) {
        self.sink.emit(EngineEvent::StageChanged {
            provider: self.provider.to_string(),
            stage,
        });
    }

    pub fn discovered(&self, id: &CatalogItemId, total: usize) {
        self.sink.emit(EngineEvent::ItemDiscovered {
            provider: self.provider.to_string(),
            id: id.clone(),
            total,
        });
    }

    pub fn row_finished(&self, row: usize, rows: usize, outcome: RowOutcome) {
        self.sink.emit(EngineEvent::RowFinished {
            provider: self.provider.to_string(),
            row,
            rows,
            outcome,
        });
    }

    pub fn attempted(&self, id: &CatalogItemId, valid: bool) {
        self.sink.emit(EngineEvent::RecordAttempted {
            provider: self.provider.to_string(),
            id: id.clone(),
            valid,
        });
    }

    pub fn finished(&self, report: ExtractionReport) {
        self.sink.emit(EngineEvent::Finished {
            provider: self.provider.to_string(),
            report,
        });
    }
}
