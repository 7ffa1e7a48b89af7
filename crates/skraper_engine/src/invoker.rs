//! Fault isolation around individual automation calls.
//!
//! Transient automation faults become a `None` sentinel plus a routed
//! notification; the discovery and extraction logic never sees them as
//! errors. Non-transient faults surface as [`EngineError::Unimplemented`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{sink_debug, sink_error, sink_warn, LogSink};

use crate::browser::AutomationResult;
use crate::{AutomationError, Browser, Element, EngineError, Locator, TaskContext};

/// Receiver of transient automation faults.
#[derive(Clone)]
pub enum FaultHandler {
    /// The fault is expected at this call site. It does not stop the chain,
    /// but a fault nobody handles is then only logged at debug level.
    Quiet,
    Route(Arc<dyn Fn(&AutomationError) + Send + Sync>),
}

impl FaultHandler {
    pub fn route(handler: impl Fn(&AutomationError) + Send + Sync + 'static) -> Self {
        FaultHandler::Route(Arc::new(handler))
    }
}

impl fmt::Debug for FaultHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultHandler::Quiet => f.write_str("Quiet"),
            FaultHandler::Route(_) => f.write_str("Route(..)"),
        }
    }
}

/// Whether a successful call is followed by the cooldown pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Page-level calls: navigation, scrolling, page-wide lookups.
    Cooldown,
    /// Element-level reads.
    Immediate,
}

pub struct ProtectedInvoker {
    browser: Arc<dyn Browser>,
    ctx: TaskContext,
    cooldown: Duration,
    component_handler: Option<FaultHandler>,
    log: Arc<dyn LogSink>,
}

impl ProtectedInvoker {
    pub fn new(
        browser: Arc<dyn Browser>,
        ctx: TaskContext,
        cooldown: Duration,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            browser,
            ctx,
            cooldown,
            component_handler: None,
            log,
        }
    }

    /// Registers the handler used when a call site does not route a fault.
    pub fn with_fault_handler(mut self, handler: FaultHandler) -> Self {
        self.component_handler = Some(handler);
        self
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    pub fn log(&self) -> &dyn LogSink {
        self.log.as_ref()
    }

    /// Runs one automation call.
    ///
    /// `Ok(Some(_))` on success, `Ok(None)` after a transient fault has been
    /// routed, `Err(Unimplemented)` for anything else.
    pub async fn invoke<T, Fut>(
        &self,
        label: &str,
        call: Fut,
        pace: Pace,
        on_fault: Option<&FaultHandler>,
    ) -> Result<Option<T>, EngineError>
    where
        Fut: Future<Output = AutomationResult<T>>,
    {
        match call.await {
            Ok(value) => {
                if pace == Pace::Cooldown {
                    self.ctx.sleep_or_exit(self.cooldown).await;
                }
                Ok(Some(value))
            }
            Err(fault) if fault.is_transient() => {
                self.route(label, &fault, on_fault);
                Ok(None)
            }
            Err(fault) => {
                sink_error!(self.log, "Scenario not implemented in {}: {}", label, fault);
                Err(EngineError::Unimplemented(format!("{label}: {fault}")))
            }
        }
    }

    fn route(&self, label: &str, fault: &AutomationError, on_fault: Option<&FaultHandler>) {
        let chain = [
            ("specific", on_fault),
            ("generic", self.component_handler.as_ref()),
        ];

        let mut expected = false;
        for (scope, handler) in chain {
            match handler {
                Some(FaultHandler::Route(handler)) => {
                    sink_debug!(
                        self.log,
                        "Automation fault during {} ({} handler raised): {}",
                        label,
                        scope,
                        fault
                    );
                    handler(fault);
                    return;
                }
                Some(FaultHandler::Quiet) => expected = true,
                None => {}
            }
        }

        if expected {
            sink_debug!(self.log, "Expected automation fault during {}: {}", label, fault);
        } else {
            sink_warn!(
                self.log,
                "Automation fault during {} (no handler registered): {}",
                label,
                fault
            );
        }
    }

    pub async fn navigate(&self, url: &str) -> Result<Option<()>, EngineError> {
        self.invoke("navigate", self.browser.navigate(url), Pace::Cooldown, None)
            .await
    }

    pub async fn scroll_to_element(&self, element: &Element) -> Result<Option<()>, EngineError> {
        self.invoke(
            "scroll_to_element",
            self.browser.scroll_to_element(element),
            Pace::Cooldown,
            None,
        )
        .await
    }

    pub async fn scroll_to_top(&self) -> Result<Option<()>, EngineError> {
        self.invoke("scroll_to_top", self.browser.scroll_to_top(), Pace::Cooldown, None)
            .await
    }

    pub async fn scroll_to_bottom(&self) -> Result<Option<()>, EngineError> {
        self.invoke(
            "scroll_to_bottom",
            self.browser.scroll_to_bottom(),
            Pace::Cooldown,
            None,
        )
        .await
    }

    pub async fn scroll_by(&self, pixels: i64) -> Result<Option<()>, EngineError> {
        self.invoke("scroll_by", self.browser.scroll_by(pixels), Pace::Cooldown, None)
            .await
    }

    pub async fn page_height(&self) -> Result<Option<u64>, EngineError> {
        self.invoke("page_height", self.browser.page_height(), Pace::Immediate, None)
            .await
    }

    /// Single element lookup; `Some` iff the element was found.
    pub async fn try_find(
        &self,
        scope: Option<&Element>,
        locator: &Locator,
        on_fault: Option<&FaultHandler>,
    ) -> Result<Option<Element>, EngineError> {
        let pace = if scope.is_some() {
            Pace::Immediate
        } else {
            Pace::Cooldown
        };
        self.invoke("find_one", self.browser.find_one(scope, locator), pace, on_fault)
            .await
    }

    /// Multi element lookup; `Some` iff at least one element was found.
    pub async fn try_find_many(
        &self,
        scope: Option<&Element>,
        locator: &Locator,
        on_fault: Option<&FaultHandler>,
    ) -> Result<Option<Vec<Element>>, EngineError> {
        let pace = if scope.is_some() {
            Pace::Immediate
        } else {
            Pace::Cooldown
        };
        let found = self
            .invoke("find_many", self.browser.find_many(scope, locator), pace, on_fault)
            .await?;
        Ok(found.filter(|elements| !elements.is_empty()))
    }

    /// Clicks, then waits `settle` (or the cooldown when `settle` is zero)
    /// unless cancelled.
    pub async fn click_and_settle(
        &self,
        element: &Element,
        settle: Duration,
        on_fault: Option<&FaultHandler>,
    ) -> Result<Option<()>, EngineError> {
        let clicked = self
            .invoke("click", self.browser.click(element), Pace::Immediate, on_fault)
            .await?;
        if clicked.is_some() {
            let pause = if settle.is_zero() { self.cooldown } else { settle };
            self.ctx.sleep_or_exit(pause).await;
        }
        Ok(clicked)
    }

    pub async fn read_text(&self, element: &Element) -> Result<Option<String>, EngineError> {
        self.invoke("read_text", self.browser.read_text(element), Pace::Immediate, None)
            .await
    }

    pub async fn read_attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, EngineError> {
        let value = self
            .invoke(
                "read_attribute",
                self.browser.read_attribute(element, name),
                Pace::Immediate,
                None,
            )
            .await?;
        Ok(value.flatten())
    }

    /// Sentinel is `false`: an element whose visibility cannot be read is
    /// treated as clipped.
    pub async fn is_fully_visible(&self, element: &Element) -> Result<bool, EngineError> {
        let visible = self
            .invoke(
                "is_fully_visible",
                self.browser.is_fully_visible(element),
                Pace::Immediate,
                None,
            )
            .await?;
        Ok(visible.unwrap_or(false))
    }
}
