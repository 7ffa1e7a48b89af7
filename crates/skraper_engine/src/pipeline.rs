//! One provider's scraping pass, run as a [`CancellableTask`].

use std::mem;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use engine_logging::{sink_debug, sink_error, sink_info, sink_warn, LogSink};
use skraper_core::{CatalogUrls, IdPattern, TaskState};

use crate::progress::Reporter;
use crate::settings::{ProviderProfile, ScraperSettings};
use crate::{
    Browser, BrowserLauncher, CancellableTask, DiscoveryEngine, EngineError, ExtractionEngine,
    ExtractionReport, FaultHandler, ProgressSink, ProtectedInvoker, ResultCollection, Stage,
    TaskContext, TaskError, TaskEvent,
};

#[derive(Default)]
struct SessionsInner {
    next_ticket: u64,
    /// Sessions of runs still in progress, keyed by the ticket of the run
    /// that launched them.
    live: Vec<(u64, Arc<dyn Browser>)>,
    /// Handed over by a faulted run; released from the owner side.
    stranded: Vec<Arc<dyn Browser>>,
}

/// Automation sessions created by the worker, tracked so that the owner can
/// release them.
#[derive(Default)]
struct Sessions {
    inner: Mutex<SessionsInner>,
}

impl Sessions {
    fn lock(&self) -> MutexGuard<'_, SessionsInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a freshly launched session; the ticket identifies it later.
    fn attach(&self, session: Arc<dyn Browser>) -> u64 {
        let mut inner = self.lock();
        let ticket = inner.next_ticket;
        inner.next_ticket += 1;
        inner.live.push((ticket, session));
        ticket
    }

    fn detach(&self, ticket: u64) -> Option<Arc<dyn Browser>> {
        let mut inner = self.lock();
        let index = inner.live.iter().position(|(held, _)| *held == ticket)?;
        Some(inner.live.swap_remove(index).1)
    }

    fn strand(&self, ticket: u64) {
        let mut inner = self.lock();
        if let Some(index) = inner.live.iter().position(|(held, _)| *held == ticket) {
            let (_, session) = inner.live.swap_remove(index);
            inner.stranded.push(session);
        }
    }

    fn drain_stranded(&self) -> Vec<Arc<dyn Browser>> {
        mem::take(&mut self.lock().stranded)
    }

    fn drain_all(&self) -> Vec<Arc<dyn Browser>> {
        let mut inner = self.lock();
        let mut sessions = mem::take(&mut inner.stranded);
        sessions.extend(inner.live.drain(..).map(|(_, session)| session));
        sessions
    }

    fn held(&self) -> usize {
        let inner = self.lock();
        inner.stranded.len() + inner.live.len()
    }
}

/// Everything the worker needs for one pass.
struct Pipeline {
    profile: ProviderProfile,
    urls: CatalogUrls,
    pattern: IdPattern,
    settings: ScraperSettings,
    launcher: Arc<dyn BrowserLauncher>,
    results: ResultCollection,
    progress: Arc<dyn ProgressSink>,
    log: Arc<dyn LogSink>,
    sessions: Arc<Sessions>,
}

impl Pipeline {
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<()> {
        let reporter = Reporter::new(&self.profile.provider, self.progress.as_ref());
        reporter.stage(Stage::Launching);

        let browser = self
            .launcher
            .launch()
            .await
            .map_err(EngineError::Launch)
            .with_context(|| format!("{} scraping pass", self.profile.provider))?;
        let ticket = self.sessions.attach(browser.clone());

        match self.drive(&ctx, browser, reporter).await {
            Ok(report) => {
                reporter.stage(Stage::Done);
                reporter.finished(report);
                self.release(ticket);
                Ok(())
            }
            // A stopped run's fault is not published, so nobody else would
            // release its session.
            Err(err) if ctx.is_cancelled() => {
                self.release(ticket);
                Err(err).with_context(|| format!("{} scraping pass", self.profile.provider))
            }
            Err(err) => {
                // The owner releases it once the fault is published.
                self.sessions.strand(ticket);
                Err(err).with_context(|| format!("{} scraping pass", self.profile.provider))
            }
        }
    }

    fn release(&self, ticket: u64) {
        if let Some(session) = self.sessions.detach(ticket) {
            self.launcher.release(session);
        }
    }

    async fn drive(
        &self,
        ctx: &TaskContext,
        browser: Arc<dyn Browser>,
        reporter: Reporter<'_>,
    ) -> Result<ExtractionReport, EngineError> {
        let provider = self.profile.provider.clone();
        let log = self.log.clone();
        let invoker = ProtectedInvoker::new(
            browser,
            ctx.clone(),
            self.settings.action_cooldown,
            self.log.clone(),
        )
        .with_fault_handler(FaultHandler::route(move |fault| {
            sink_debug!(log, "{}: automation fault: {}", provider, fault);
        }));

        reporter.stage(Stage::Authenticating);
        self.enter_catalog(&invoker).await?;

        let discovery = DiscoveryEngine::new(
            &invoker,
            &self.profile.catalog,
            &self.pattern,
            &self.settings,
            reporter,
        );
        if ctx.is_cancelled() {
            return Ok(ExtractionReport::default());
        }
        reporter.stage(Stage::Preparing);
        discovery.prepare().await?;

        if ctx.is_cancelled() {
            return Ok(ExtractionReport::default());
        }
        reporter.stage(Stage::Discovering);
        let found = discovery.discover().await?;
        sink_info!(
            self.log,
            "{}: discovered {} items in {} rows",
            self.profile.provider,
            found.len(),
            found.rows.len()
        );

        if ctx.is_cancelled() {
            return Ok(ExtractionReport {
                remaining: found.len(),
                ..ExtractionReport::default()
            });
        }
        reporter.stage(Stage::Extracting);
        let extraction = ExtractionEngine::new(
            &invoker,
            &self.profile.detail,
            &self.urls,
            &self.settings,
            reporter,
        );
        extraction.extract_all(found.ids, &self.results).await
    }

    /// Opens the catalog, waits out the login gate and clicks through the
    /// entry screen.
    async fn enter_catalog(&self, invoker: &ProtectedInvoker) -> Result<(), EngineError> {
        let ctx = invoker.context();
        let quiet = FaultHandler::Quiet;

        invoker.navigate(self.urls.base().as_str()).await?;

        if let Some(gate) = &self.profile.login_gate {
            let mut asked = false;
            while invoker.try_find(None, gate, Some(&quiet)).await?.is_some() {
                if !asked {
                    sink_warn!(
                        self.log,
                        "{}: please log in using the browser window",
                        self.profile.provider
                    );
                    asked = true;
                }
                if !ctx.sleep_or_exit(self.settings.login_poll_interval).await {
                    return Ok(());
                }
            }
        }

        if let Some(entry) = &self.profile.entry_click {
            if let Some(element) = invoker.try_find(None, entry, Some(&quiet)).await? {
                invoker
                    .click_and_settle(&element, Duration::ZERO, None)
                    .await?;
            }
        }
        Ok(())
    }
}

/// Scrapes one provider on a background worker.
///
/// Faults of the worker are logged and the automation session is released
/// from a listener thread; the worker itself never cleans up after a reported
/// fault. Each run only ever releases the session it launched.
pub struct Scraper {
    provider: String,
    task: CancellableTask,
    launcher: Arc<dyn BrowserLauncher>,
    sessions: Arc<Sessions>,
}

impl Scraper {
    pub fn new(
        profile: ProviderProfile,
        settings: ScraperSettings,
        launcher: Arc<dyn BrowserLauncher>,
        results: ResultCollection,
        progress: Arc<dyn ProgressSink>,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, EngineError> {
        let provider = profile.provider.clone();
        let sessions = Arc::new(Sessions::default());
        let pipeline = Arc::new(Pipeline {
            urls: profile.urls()?,
            pattern: profile.id_pattern()?,
            profile,
            settings,
            launcher: launcher.clone(),
            results,
            progress,
            log: log.clone(),
            sessions: sessions.clone(),
        });

        let task = CancellableTask::new(provider.clone(), log.clone(), move |ctx| {
            let pipeline = pipeline.clone();
            async move { pipeline.run(ctx).await }
        });

        spawn_fault_listener(
            task.subscribe(),
            provider.clone(),
            launcher.clone(),
            sessions.clone(),
            log,
        );

        Ok(Self {
            provider,
            task,
            launcher,
            sessions,
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn state(&self) -> TaskState {
        self.task.state()
    }

    pub fn task(&self) -> &CancellableTask {
        &self.task
    }

    pub fn subscribe(&self) -> mpsc::Receiver<TaskEvent> {
        self.task.subscribe()
    }

    pub fn start(&self) -> Result<(), TaskError> {
        self.task.start()
    }

    pub fn stop(&self, wait_for_completion: bool) {
        self.task.stop(wait_for_completion);
    }

    pub fn restart(&self) -> Result<(), TaskError> {
        self.task.restart()
    }

    pub fn wait(&self) {
        self.task.wait();
    }

    /// Terminates the task, then releases any session still held.
    pub fn terminate(&self) {
        self.task.terminate();
        for session in self.sessions.drain_all() {
            self.launcher.release(session);
        }
    }

    /// Sessions launched and not yet released.
    pub fn held_sessions(&self) -> usize {
        self.sessions.held()
    }
}

fn spawn_fault_listener(
    events: mpsc::Receiver<TaskEvent>,
    provider: String,
    launcher: Arc<dyn BrowserLauncher>,
    sessions: Arc<Sessions>,
    log: Arc<dyn LogSink>,
) {
    let spawned = thread::Builder::new()
        .name(format!("faults-{provider}"))
        .spawn(move || {
            // Ends once the task and its workers are gone.
            while let Ok(event) = events.recv() {
                let TaskEvent::Faulted(fault) = event else {
                    continue;
                };
                sink_error!(
                    log,
                    "Unexpected error with {} scraping task: {:#}",
                    provider,
                    fault.error
                );
                for session in sessions.drain_stranded() {
                    launcher.release(session);
                }
            }
        });

    if let Err(err) = spawned {
        engine_logging::engine_error!("failed to spawn fault listener: {}", err);
    }
}
