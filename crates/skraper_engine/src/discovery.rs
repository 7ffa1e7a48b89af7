//! Catalog enumeration: a vertical pass to realize lazy rows, then a
//! row-by-row horizontal scan until every row converges.

use engine_logging::{sink_debug, sink_info, sink_warn};
use skraper_core::{CatalogItemId, DiscoveryRecord, IdPattern};

use crate::progress::Reporter;
use crate::settings::{CatalogLayout, ScraperSettings};
use crate::{Discovery, Element, EngineError, FaultHandler, ProtectedInvoker, RowOutcome};

pub struct DiscoveryEngine<'a> {
    invoker: &'a ProtectedInvoker,
    layout: &'a CatalogLayout,
    pattern: &'a IdPattern,
    settings: &'a ScraperSettings,
    reporter: Reporter<'a>,
}

impl<'a> DiscoveryEngine<'a> {
    pub fn new(
        invoker: &'a ProtectedInvoker,
        layout: &'a CatalogLayout,
        pattern: &'a IdPattern,
        settings: &'a ScraperSettings,
        reporter: Reporter<'a>,
    ) -> Self {
        Self {
            invoker,
            layout,
            pattern,
            settings,
            reporter,
        }
    }

    /// Scrolls to the bottom until the page height stops growing, then back
    /// to the top. Stops early on cancellation.
    pub async fn prepare(&self) -> Result<(), EngineError> {
        let ctx = self.invoker.context();
        let mut height = self.invoker.page_height().await?;

        for pass in 0..self.settings.max_vertical_passes {
            if ctx.is_cancelled() {
                return Ok(());
            }
            self.invoker.scroll_to_bottom().await?;
            if !ctx.sleep_or_exit(self.settings.scroll_settle).await {
                return Ok(());
            }
            let next = self.invoker.page_height().await?;
            if next == height {
                sink_debug!(
                    self.invoker.log(),
                    "{}: page height stable after {} passes",
                    self.reporter.provider(),
                    pass + 1
                );
                break;
            }
            height = next;
        }

        self.invoker.scroll_to_top().await?;
        Ok(())
    }

    /// Enumerates every row in page order. On cancellation the identifiers
    /// found so far are returned and `cancelled` is set.
    pub async fn discover(&self) -> Result<Discovery, EngineError> {
        let ctx = self.invoker.context();
        let log = self.invoker.log();
        let mut found = Discovery::default();

        let Some(rows) = self
            .invoker
            .try_find_many(None, &self.layout.rows, Some(&FaultHandler::Quiet))
            .await?
        else {
            sink_warn!(log, "{}: no catalog rows found", self.reporter.provider());
            return Ok(found);
        };

        for (index, row) in rows.iter().enumerate() {
            if ctx.is_cancelled() {
                found.cancelled = true;
                break;
            }

            let outcome = self.discover_row(row, &mut found).await?;
            found.rows.push(outcome);
            self.reporter.row_finished(index, rows.len(), outcome);
            sink_info!(
                log,
                "{}: row {}/{} {:?}, {} items discovered",
                self.reporter.provider(),
                index + 1,
                rows.len(),
                outcome,
                found.len()
            );

            if outcome == RowOutcome::Cancelled {
                found.cancelled = true;
                break;
            }
        }

        Ok(found)
    }

    async fn discover_row(
        &self,
        row: &Element,
        found: &mut Discovery,
    ) -> Result<RowOutcome, EngineError> {
        let ctx = self.invoker.context();
        let quiet = FaultHandler::Quiet;
        let max_steps = self.settings.max_scroll_steps_per_row;

        self.invoker.scroll_to_element(row).await?;

        let mut record = DiscoveryRecord::new();
        let mut control: Option<Element> = None;

        for step in 0..=max_steps {
            let items = self
                .invoker
                .try_find_many(Some(row), &self.layout.items, Some(&quiet))
                .await?
                .unwrap_or_default();

            for item in &items {
                if ctx.is_cancelled() {
                    return Ok(RowOutcome::Cancelled);
                }
                // Clipped items can expose a truncated link.
                if !self.invoker.is_fully_visible(item).await? {
                    continue;
                }
                let Some(id) = self.read_id(item).await? else {
                    continue;
                };
                record.observe(&id);
                if found.insert(id.clone()) {
                    self.reporter.discovered(&id, found.len());
                }
            }

            if record.is_converged() {
                return Ok(RowOutcome::Converged);
            }
            if step == max_steps {
                break;
            }
            if ctx.is_cancelled() {
                return Ok(RowOutcome::Cancelled);
            }

            if control.is_none() {
                control = self.scroll_control(row).await?;
            }
            let Some(handle) = &control else {
                sink_debug!(
                    self.invoker.log(),
                    "{}: row without scroll control abandoned ({} items tracked)",
                    self.reporter.provider(),
                    record.len()
                );
                return Ok(RowOutcome::Abandoned);
            };
            let clicked = self
                .invoker
                .click_and_settle(handle, self.settings.row_scroll_settle, Some(&quiet))
                .await?;
            if clicked.is_none() {
                // Looked up again on the next step.
                control = None;
            }
        }

        sink_warn!(
            self.invoker.log(),
            "{}: row abandoned after {} scroll steps without converging",
            self.reporter.provider(),
            max_steps
        );
        Ok(RowOutcome::Abandoned)
    }

    async fn read_id(&self, item: &Element) -> Result<Option<CatalogItemId>, EngineError> {
        let Some(link) = self
            .invoker
            .try_find(Some(item), &self.layout.item_link, Some(&FaultHandler::Quiet))
            .await?
        else {
            return Ok(None);
        };
        let value = self
            .invoker
            .read_attribute(&link, &self.layout.link_attribute)
            .await?;
        Ok(value.and_then(|value| self.pattern.extract(&value)))
    }

    /// The row's last handle element scrolls it forward.
    async fn scroll_control(&self, row: &Element) -> Result<Option<Element>, EngineError> {
        let handles = self
            .invoker
            .try_find_many(Some(row), &self.layout.scroll_control, Some(&FaultHandler::Quiet))
            .await?;
        Ok(handles.and_then(|mut handles| handles.pop()))
    }
}
