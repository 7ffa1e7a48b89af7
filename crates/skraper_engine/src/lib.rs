//! Skraper engine: cancellable workers, fault-isolated automation calls and
//! the discovery/extraction pipeline.
mod browser;
mod discovery;
mod error;
mod extraction;
mod invoker;
mod manager;
mod pipeline;
mod progress;
mod results;
mod settings;
mod task;
mod types;

pub use browser::{AutomationResult, Browser, BrowserLauncher, Element, Locator};
pub use discovery::DiscoveryEngine;
pub use error::{AutomationError, EngineError, TaskError};
pub use extraction::ExtractionEngine;
pub use invoker::{FaultHandler, Pace, ProtectedInvoker};
pub use manager::ScrapeManager;
pub use pipeline::Scraper;
pub use progress::{ChannelProgressSink, DiscardProgress, ProgressSink, Reporter};
pub use results::ResultCollection;
pub use settings::{
    CatalogLayout, DetailLayout, FieldRead, FieldSource, ParseFaultPolicy, ProviderProfile,
    ScraperSettings,
};
pub use task::{CancellableTask, TaskContext, TaskEvent, TaskFault};
pub use types::{Discovery, EngineEvent, ExtractionReport, RowOutcome, Stage};
