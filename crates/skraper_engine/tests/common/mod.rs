#![allow(dead_code)]

//! In-memory catalog driven through the `Browser` trait.
//!
//! Rows are wrapping carousels: a window of items is fully visible, the item
//! right after it is present but clipped, and clicking the row's last handle
//! advances the window by `step`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Once};
use std::time::Duration;

use async_trait::async_trait;
use skraper_engine::{
    AutomationError, AutomationResult, Browser, BrowserLauncher, Element, EngineEvent, Locator,
    ProgressSink, ProviderProfile,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub const PROFILE: &str = r#"(
    provider: "demo",
    base_url: "https://catalog.example.com/browse",
    detail_path: "/title/{id}",
    watch_path: "/watch/{id}",
    id_pattern: "[A-Za-z0-9]+$",
    login_gate: Some(".login"),
    entry_click: Some(".profile"),
    catalog: (
        rows: ".row",
        items: ".card",
        item_link: "a",
        scroll_control: ".handle",
    ),
    detail: (
        panel: ".detail",
        runtime: (locator: ".duration", read: Text),
        name: (locator: ".boxart", read: Attribute("alt")),
        thumbnail: (locator: ".boxart", read: Attribute("src")),
        description: (locator: ".synopsis", read: Text),
        age: (locator: ".year", read: Text),
        tag_groups: ".tags",
        tag_kind_attribute: "data-kind",
        tag_links: "a",
        actor_group: "person",
        genre_group: "genre",
        season_markers: ["season", "saison"],
        tag_exclusions: ["plus"],
    ),
)"#;

pub fn profile() -> ProviderProfile {
    ProviderProfile::from_ron(PROFILE).expect("test profile parses")
}

#[derive(Debug, Clone)]
pub struct RowScript {
    pub ids: Vec<String>,
    pub window: usize,
    pub step: usize,
    pub has_handle: bool,
}

impl RowScript {
    pub fn carousel(ids: &[&str], window: usize, step: usize) -> Self {
        Self {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            window,
            step,
            has_handle: true,
        }
    }

    pub fn without_handle(mut self) -> Self {
        self.has_handle = false;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DetailScript {
    pub runtime: String,
    pub name: String,
    pub description: String,
    pub age: String,
    pub thumbnail: String,
    pub actors: Vec<String>,
    pub genres: Vec<String>,
}

impl DetailScript {
    pub fn movie(name: &str, runtime: &str) -> Self {
        Self {
            runtime: runtime.to_string(),
            name: name.to_string(),
            description: format!("About {name}"),
            age: "16+".to_string(),
            thumbnail: format!("https://img.example.com/{name}.jpg"),
            actors: vec!["Ann Actor,".to_string(), "Bo Actor".to_string()],
            genres: vec!["Drama".to_string(), "plus".to_string()],
        }
    }

    pub fn without_description(mut self) -> Self {
        self.description.clear();
        self
    }
}

#[derive(Default)]
pub struct SiteState {
    rows: Vec<RowScript>,
    offsets: Vec<usize>,
    details: HashMap<String, DetailScript>,
    heights: VecDeque<u64>,
    login_polls: usize,
    profile_screen: bool,
    current: Option<String>,
    /// Scripted outcomes per operation; `None` lets one call through.
    faults: HashMap<String, VecDeque<Option<AutomationError>>>,
    delays: HashMap<String, Duration>,
    pub calls: Vec<String>,
}

impl SiteState {
    fn take_fault(&mut self, op: &str) -> AutomationResult<()> {
        match self.faults.get_mut(op).and_then(VecDeque::pop_front) {
            Some(Some(fault)) => Err(fault),
            _ => Ok(()),
        }
    }

    fn row_of(&self, element: &Element) -> Option<usize> {
        element.handle().strip_prefix("row:")?.parse().ok()
    }

    fn card_of(&self, element: &Element, prefix: &str) -> Option<(usize, usize)> {
        let rest = element.handle().strip_prefix(prefix)?;
        let (row, index) = rest.split_once(':')?;
        Some((row.parse().ok()?, index.parse().ok()?))
    }

    /// Fully visible positions first, then the clipped one.
    fn positions(&self, row: usize) -> (Vec<usize>, Option<usize>) {
        let script = &self.rows[row];
        let len = script.ids.len();
        if len == 0 {
            return (Vec::new(), None);
        }
        let shown = script.window.min(len);
        let offset = self.offsets[row];
        let visible = (0..shown).map(|k| (offset + k) % len).collect();
        let clipped = (len > shown).then(|| (offset + shown) % len);
        (visible, clipped)
    }

    fn detail(&self) -> Option<&DetailScript> {
        self.details.get(self.current.as_deref()?)
    }
}

/// Builder and shared handle for the scripted site.
#[derive(Clone, Default)]
pub struct Site {
    state: Arc<Mutex<SiteState>>,
}

impl Site {
    pub fn new() -> Self {
        let site = Self::default();
        site.lock().heights = VecDeque::from(vec![1000, 2000, 2000]);
        site
    }

    pub fn lock(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap()
    }

    pub fn with_row(self, row: RowScript) -> Self {
        {
            let mut state = self.lock();
            state.rows.push(row);
            state.offsets.push(0);
        }
        self
    }

    pub fn with_detail(self, id: &str, detail: DetailScript) -> Self {
        self.lock().details.insert(id.to_string(), detail);
        self
    }

    pub fn with_login_polls(self, polls: usize) -> Self {
        self.lock().login_polls = polls;
        self
    }

    pub fn with_profile_screen(self) -> Self {
        self.lock().profile_screen = true;
        self
    }

    pub fn fail_next(&self, op: &str, fault: AutomationError) {
        self.lock()
            .faults
            .entry(op.to_string())
            .or_default()
            .push_back(Some(fault));
    }

    /// Lets `calls` more `op` calls succeed before the next queued fault.
    pub fn pass_next(&self, op: &str, calls: usize) {
        let mut state = self.lock();
        let queue = state.faults.entry(op.to_string()).or_default();
        queue.extend(std::iter::repeat_n(None, calls));
    }

    /// Every later `op` call takes at least `delay`.
    pub fn with_delay(self, op: &str, delay: Duration) -> Self {
        self.lock().delays.insert(op.to_string(), delay);
        self
    }

    async fn pause(&self, op: &str) {
        let delay = self.lock().delays.get(op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn browser(&self) -> Arc<dyn Browser> {
        Arc::new(ScriptedBrowser { site: self.clone() })
    }
}

pub struct ScriptedBrowser {
    site: Site,
}

fn missing(locator: &Locator) -> AutomationError {
    AutomationError::NoSuchElement(locator.to_string())
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn navigate(&self, url: &str) -> AutomationResult<()> {
        let mut state = self.site.lock();
        state.take_fault("navigate")?;
        state.calls.push(format!("navigate {url}"));
        state.current = url
            .rsplit_once("/title/")
            .map(|(_, id)| id.to_string());
        Ok(())
    }

    async fn scroll_to_element(&self, element: &Element) -> AutomationResult<()> {
        let mut state = self.site.lock();
        state.take_fault("scroll_to_element")?;
        state.calls.push(format!("scroll_to {element}"));
        Ok(())
    }

    async fn scroll_to_top(&self) -> AutomationResult<()> {
        let mut state = self.site.lock();
        state.take_fault("scroll_to_top")?;
        state.calls.push("scroll_to_top".to_string());
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> AutomationResult<()> {
        let mut state = self.site.lock();
        state.take_fault("scroll_to_bottom")?;
        state.calls.push("scroll_to_bottom".to_string());
        Ok(())
    }

    async fn scroll_by(&self, pixels: i64) -> AutomationResult<()> {
        let mut state = self.site.lock();
        state.take_fault("scroll_by")?;
        state.calls.push(format!("scroll_by {pixels}"));
        Ok(())
    }

    async fn page_height(&self) -> AutomationResult<u64> {
        let mut state = self.site.lock();
        state.take_fault("page_height")?;
        let height = if state.heights.len() > 1 {
            state.heights.pop_front()
        } else {
            state.heights.front().copied()
        };
        Ok(height.unwrap_or(0))
    }

    async fn find_one(
        &self,
        scope: Option<&Element>,
        locator: &Locator,
    ) -> AutomationResult<Element> {
        self.site.pause("find_one").await;
        let mut state = self.site.lock();
        state.take_fault("find_one")?;
        match (scope.map(Element::handle), locator.as_str()) {
            (None, ".login") if state.login_polls > 0 => {
                state.login_polls -= 1;
                Ok(Element::new("gate"))
            }
            (None, ".profile") if state.profile_screen => Ok(Element::new("profile")),
            (None, ".detail") if state.detail().is_some() => Ok(Element::new("panel")),
            (Some("panel"), field) => Ok(Element::new(format!("field:{field}"))),
            (Some(card), "a") if card.starts_with("card:") => Ok(Element::new(
                card.replacen("card:", "link:", 1),
            )),
            _ => Err(missing(locator)),
        }
    }

    async fn find_many(
        &self,
        scope: Option<&Element>,
        locator: &Locator,
    ) -> AutomationResult<Vec<Element>> {
        let mut state = self.site.lock();
        state.take_fault("find_many")?;
        let elements: Vec<Element> = match (scope, locator.as_str()) {
            (None, ".row") => (0..state.rows.len())
                .map(|row| Element::new(format!("row:{row}")))
                .collect(),
            (Some(row), ".card") => match state.row_of(row) {
                Some(row) => {
                    let (visible, clipped) = state.positions(row);
                    visible
                        .into_iter()
                        .chain(clipped)
                        .map(|index| Element::new(format!("card:{row}:{index}")))
                        .collect()
                }
                None => Vec::new(),
            },
            (Some(row), ".handle") => match state.row_of(row) {
                Some(row) if state.rows[row].has_handle => vec![
                    Element::new(format!("handle:{row}:prev")),
                    Element::new(format!("handle:{row}:next")),
                ],
                _ => Vec::new(),
            },
            (Some(panel), ".tags") if panel.handle() == "panel" => ["person", "genre", "other"]
                .iter()
                .map(|kind| Element::new(format!("tags:{kind}")))
                .collect(),
            (Some(group), "a") if group.handle().starts_with("tags:") => {
                let kind = group.handle().trim_start_matches("tags:");
                let count = match (state.detail(), kind) {
                    (Some(detail), "person") => detail.actors.len(),
                    (Some(detail), "genre") => detail.genres.len(),
                    (Some(_), _) => 1,
                    (None, _) => 0,
                };
                (0..count)
                    .map(|index| Element::new(format!("tag:{kind}:{index}")))
                    .collect()
            }
            _ => Vec::new(),
        };
        Ok(elements)
    }

    async fn click(&self, element: &Element) -> AutomationResult<()> {
        let mut state = self.site.lock();
        state.take_fault("click")?;
        state.calls.push(format!("click {element}"));
        if element.handle() == "profile" {
            state.profile_screen = false;
        } else if let Some(row) = element
            .handle()
            .strip_prefix("handle:")
            .and_then(|rest| rest.strip_suffix(":next"))
            .and_then(|row| row.parse::<usize>().ok())
        {
            let len = state.rows[row].ids.len().max(1);
            let next = (state.offsets[row] + state.rows[row].step) % len;
            state.offsets[row] = next;
        }
        Ok(())
    }

    async fn read_text(&self, element: &Element) -> AutomationResult<String> {
        let mut state = self.site.lock();
        state.take_fault("read_text")?;
        let detail = state
            .detail()
            .cloned()
            .ok_or_else(|| AutomationError::StaleElement(element.to_string()))?;
        let handle = element.handle();
        let text = match handle {
            "field:.duration" => detail.runtime,
            "field:.synopsis" => detail.description,
            "field:.year" => detail.age,
            _ => match handle.strip_prefix("tag:").and_then(|rest| rest.split_once(':')) {
                Some(("person", index)) => detail.actors[index.parse::<usize>().unwrap()].clone(),
                Some(("genre", index)) => detail.genres[index.parse::<usize>().unwrap()].clone(),
                Some(_) => "Unrelated".to_string(),
                None => return Err(AutomationError::StaleElement(handle.to_string())),
            },
        };
        Ok(text)
    }

    async fn read_attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> AutomationResult<Option<String>> {
        let mut state = self.site.lock();
        state.take_fault("read_attribute")?;
        if let Some((row, index)) = state.card_of(element, "link:") {
            let id = &state.rows[row].ids[index];
            let href = if id.is_empty() {
                "javascript:void(0)".to_string()
            } else {
                format!("/title/{id}")
            };
            return Ok((name == "href").then_some(href));
        }
        if let Some(kind) = element.handle().strip_prefix("tags:") {
            return Ok((name == "data-kind").then(|| kind.to_string()));
        }
        let detail = state.detail();
        Ok(match (element.handle(), name) {
            ("field:.boxart", "alt") => detail.map(|d| d.name.clone()),
            ("field:.boxart", "src") => detail.map(|d| d.thumbnail.clone()),
            _ => None,
        })
    }

    async fn is_fully_visible(&self, element: &Element) -> AutomationResult<bool> {
        let mut state = self.site.lock();
        state.take_fault("is_fully_visible")?;
        Ok(match state.card_of(element, "card:") {
            Some((row, index)) => state.positions(row).0.contains(&index),
            None => true,
        })
    }
}

/// Hands out sessions on the scripted site and counts them.
pub struct ScriptedLauncher {
    site: Site,
    launched: AtomicUsize,
    released: AtomicUsize,
    sessions: Mutex<Vec<Arc<dyn Browser>>>,
    released_sessions: Mutex<Vec<usize>>,
    refuse: bool,
}

impl ScriptedLauncher {
    fn build(site: Site, refuse: bool) -> Arc<Self> {
        Arc::new(Self {
            site,
            launched: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            sessions: Mutex::new(Vec::new()),
            released_sessions: Mutex::new(Vec::new()),
            refuse,
        })
    }

    pub fn new(site: Site) -> Arc<Self> {
        Self::build(site, false)
    }

    pub fn refusing(site: Site) -> Arc<Self> {
        Self::build(site, true)
    }

    /// Launch order (1-based) of each released session, in release order.
    pub fn released_sessions(&self) -> Vec<usize> {
        self.released_sessions.lock().unwrap().clone()
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> AutomationResult<Arc<dyn Browser>> {
        if self.refuse {
            return Err(AutomationError::SessionClosed);
        }
        self.launched.fetch_add(1, Ordering::SeqCst);
        let session = self.site.browser();
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    fn release(&self, session: Arc<dyn Browser>) {
        self.released.fetch_add(1, Ordering::SeqCst);
        let released = Arc::as_ptr(&session) as *const ();
        let number = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .position(|held| Arc::as_ptr(held) as *const () == released)
            .map_or(0, |index| index + 1);
        self.released_sessions.lock().unwrap().push(number);
    }
}

/// Collects events; optionally runs a hook on each one.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<EngineEvent>>,
    hook: Option<Box<dyn Fn(&EngineEvent) + Send + Sync>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(hook: impl Fn(&EngineEvent) + Send + Sync + 'static) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            hook: Some(Box::new(hook)),
        }
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: EngineEvent) {
        if let Some(hook) = &self.hook {
            hook(&event);
        }
        self.events.lock().unwrap().push(event);
    }
}
