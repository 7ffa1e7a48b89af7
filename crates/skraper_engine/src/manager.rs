use std::sync::Arc;

use engine_logging::{sink_error, sink_info, LogSink};

use crate::{CancellableTask, ResultCollection, Scraper};

/// Owns the scrapers of a run and the collection they all write to.
///
/// Dropping the manager terminates every scraper.
pub struct ScrapeManager {
    results: ResultCollection,
    scrapers: Vec<Scraper>,
    log: Arc<dyn LogSink>,
}

impl ScrapeManager {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self {
            results: ResultCollection::new(),
            scrapers: Vec::new(),
            log,
        }
    }

    /// Shared collection to hand to new scrapers.
    pub fn results(&self) -> &ResultCollection {
        &self.results
    }

    pub fn add(&mut self, scraper: Scraper) {
        self.scrapers.push(scraper);
    }

    pub fn scrapers(&self) -> &[Scraper] {
        &self.scrapers
    }

    /// Starts every scraper. One that cannot start is logged and skipped.
    pub fn scrape_all(&self) {
        for scraper in &self.scrapers {
            sink_info!(self.log, "Starting {} scraper", scraper.provider());
            if let Err(err) = scraper.start() {
                sink_error!(self.log, "{}", err);
            }
        }
    }

    /// Blocks until every started scraper has exited.
    pub fn wait_all(&self) {
        let tasks: Vec<&CancellableTask> = self.scrapers.iter().map(Scraper::task).collect();
        CancellableTask::wait_all(&tasks);
    }

    pub fn terminate_all(&self) {
        for scraper in &self.scrapers {
            scraper.terminate();
        }
    }
}

impl Drop for ScrapeManager {
    fn drop(&mut self) {
        self.terminate_all();
    }
}
