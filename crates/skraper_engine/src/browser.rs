//! Contract toward the browser automation capability.
//!
//! The engine never drives a browser directly; a collaborator implements
//! [`Browser`] and [`BrowserLauncher`]. Every action has fire-and-wait-for-settle
//! semantics: it returns once its visible effect has stabilized.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AutomationError;

pub type AutomationResult<T> = Result<T, AutomationError>;

/// Opaque element query understood by the browser collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(query: impl Into<String>) -> Self {
        Self(query.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Handle to an element of the current page. Handles go stale on navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element(String);

impl Element {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn handle(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One automation session. Only the worker that launched it calls into it.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn navigate(&self, url: &str) -> AutomationResult<()>;
    async fn scroll_to_element(&self, element: &Element) -> AutomationResult<()>;
    async fn scroll_to_top(&self) -> AutomationResult<()>;
    async fn scroll_to_bottom(&self) -> AutomationResult<()>;
    async fn scroll_by(&self, pixels: i64) -> AutomationResult<()>;
    /// Current scrollable height of the document, in pixels.
    async fn page_height(&self) -> AutomationResult<u64>;
    /// First element matching `locator`, searched below `scope` or in the
    /// whole page. A missing element is an `Err`, never an empty handle.
    async fn find_one(&self, scope: Option<&Element>, locator: &Locator)
        -> AutomationResult<Element>;
    async fn find_many(
        &self,
        scope: Option<&Element>,
        locator: &Locator,
    ) -> AutomationResult<Vec<Element>>;
    async fn click(&self, element: &Element) -> AutomationResult<()>;
    async fn read_text(&self, element: &Element) -> AutomationResult<String>;
    async fn read_attribute(&self, element: &Element, name: &str)
        -> AutomationResult<Option<String>>;
    /// True only when the element lies entirely inside the viewport.
    async fn is_fully_visible(&self, element: &Element) -> AutomationResult<bool>;
}

/// Creates and releases automation sessions on behalf of a pipeline.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> AutomationResult<Arc<dyn Browser>>;

    /// Releases a session and whatever process backs it. Called from the
    /// owner side after a fault, so it must not need the worker's runtime.
    fn release(&self, session: Arc<dyn Browser>);
}
