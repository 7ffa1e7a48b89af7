//! Detail-view extraction: one attempt per discovered identifier.

use std::collections::BTreeSet;

use engine_logging::{sink_info, sink_warn};
use skraper_core::{classify_runtime, clean_tag, CatalogItemId, CatalogUrls, MediaDetails, MediaRecord};

use crate::progress::Reporter;
use crate::settings::{DetailLayout, FieldRead, FieldSource, ParseFaultPolicy, ScraperSettings};
use crate::{Element, EngineError, ExtractionReport, FaultHandler, ProtectedInvoker, ResultCollection};

pub struct ExtractionEngine<'a> {
    invoker: &'a ProtectedInvoker,
    layout: &'a DetailLayout,
    urls: &'a CatalogUrls,
    settings: &'a ScraperSettings,
    reporter: Reporter<'a>,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(
        invoker: &'a ProtectedInvoker,
        layout: &'a DetailLayout,
        urls: &'a CatalogUrls,
        settings: &'a ScraperSettings,
        reporter: Reporter<'a>,
    ) -> Self {
        Self {
            invoker,
            layout,
            urls,
            settings,
            reporter,
        }
    }

    /// Attempts every identifier exactly once and appends the valid records
    /// to `results`.
    ///
    /// An identifier leaves the remaining set before its attempt, whatever
    /// the outcome. Cancellation stops the loop between identifiers; the
    /// untouched ones are counted in [`ExtractionReport::remaining`].
    pub async fn extract_all(
        &self,
        ids: impl IntoIterator<Item = CatalogItemId>,
        results: &ResultCollection,
    ) -> Result<ExtractionReport, EngineError> {
        let ctx = self.invoker.context();
        let log = self.invoker.log();
        let provider = self.reporter.provider();

        let mut remaining: BTreeSet<CatalogItemId> = ids.into_iter().collect();
        let mut report = ExtractionReport::default();

        while !remaining.is_empty() && !ctx.is_cancelled() {
            let Some(id) = remaining.pop_first() else {
                break;
            };
            report.attempted += 1;

            let stored = match self.extract_one(&id).await {
                Ok(Some(record)) => {
                    let name = record.name().to_string();
                    let missing = record.missing_fields();
                    if results.push(record) {
                        sink_info!(log, "> Scraping {} - {} SUCCEEDED", id, name);
                        true
                    } else {
                        sink_warn!(
                            log,
                            "> Scraping {} - {} FAILED (empty {})",
                            id,
                            name,
                            missing.join(", ")
                        );
                        false
                    }
                }
                Ok(None) => {
                    sink_warn!(log, "> Scraping {} FAILED (detail view unavailable)", id);
                    false
                }
                Err(EngineError::Parse { id: _, source })
                    if self.settings.parse_fault_policy == ParseFaultPolicy::SkipItem =>
                {
                    sink_warn!(log, "> Scraping {} FAILED ({})", id, source);
                    false
                }
                Err(err) => return Err(err),
            };

            if stored {
                report.succeeded += 1;
            }
            self.reporter.attempted(&id, stored);
        }

        report.remaining = remaining.len();
        sink_info!(
            log,
            "{}: {} records out of {} attempts ({} left)",
            provider,
            report.succeeded,
            report.attempted,
            report.remaining
        );
        Ok(report)
    }

    /// Reads one detail view. `Ok(None)` when the view could not be shown;
    /// otherwise the record as read, valid or not.
    pub async fn extract_one(&self, id: &CatalogItemId) -> Result<Option<MediaRecord>, EngineError> {
        let detail_url = self
            .urls
            .detail_url(id)
            .map_err(|err| EngineError::Config(format!("detail url for {id}: {err}")))?;
        if self.invoker.navigate(detail_url.as_str()).await?.is_none() {
            return Ok(None);
        }

        let Some(panel) = self.invoker.try_find(None, &self.layout.panel, None).await? else {
            return Ok(None);
        };

        let runtime = self
            .read_field(&panel, &self.layout.runtime)
            .await?
            .to_lowercase();
        // Unreadable runtime: nothing to classify, so the view counts as unavailable.
        if runtime.is_empty() {
            return Ok(None);
        }
        let kind = classify_runtime(&runtime, &self.layout.season_markers).map_err(|source| {
            EngineError::Parse {
                id: id.to_string(),
                source,
            }
        })?;

        let url = self
            .urls
            .watch_url(id)
            .map_err(|err| EngineError::Config(format!("watch url for {id}: {err}")))?;

        let mut details = MediaDetails {
            name: self.read_field(&panel, &self.layout.name).await?,
            description: self.read_field(&panel, &self.layout.description).await?,
            age: self.read_field(&panel, &self.layout.age).await?,
            thumbnail: self.read_field(&panel, &self.layout.thumbnail).await?,
            url: url.to_string(),
            provider_id: id.to_string(),
            provider: self.reporter.provider().to_string(),
            ..MediaDetails::default()
        };
        self.read_tags(&panel, &mut details).await?;

        Ok(Some(MediaRecord::new(kind, details)))
    }

    /// Empty when the field's element or value is missing.
    async fn read_field(&self, panel: &Element, source: &FieldSource) -> Result<String, EngineError> {
        let Some(element) = self
            .invoker
            .try_find(Some(panel), &source.locator, Some(&FaultHandler::Quiet))
            .await?
        else {
            return Ok(String::new());
        };
        let value = match &source.read {
            FieldRead::Text => self.invoker.read_text(&element).await?,
            FieldRead::Attribute(name) => self.invoker.read_attribute(&element, name).await?,
        };
        Ok(value.map(|value| value.trim().to_string()).unwrap_or_default())
    }

    async fn read_tags(&self, panel: &Element, details: &mut MediaDetails) -> Result<(), EngineError> {
        let quiet = FaultHandler::Quiet;
        let groups = self
            .invoker
            .try_find_many(Some(panel), &self.layout.tag_groups, Some(&quiet))
            .await?
            .unwrap_or_default();

        for group in &groups {
            let kind = self
                .invoker
                .read_attribute(group, &self.layout.tag_kind_attribute)
                .await?
                .unwrap_or_default();
            let target = if kind == self.layout.actor_group {
                &mut details.actors
            } else if kind == self.layout.genre_group {
                &mut details.genres
            } else {
                continue;
            };

            let links = self
                .invoker
                .try_find_many(Some(group), &self.layout.tag_links, Some(&quiet))
                .await?
                .unwrap_or_default();
            for link in &links {
                let Some(text) = self.invoker.read_text(link).await? else {
                    continue;
                };
                if let Some(tag) = clean_tag(&text, &self.layout.tag_exclusions) {
                    target.insert(tag);
                }
            }
        }
        Ok(())
    }
}
