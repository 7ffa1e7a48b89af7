use std::time::Duration;

use serde::{Deserialize, Serialize};
use skraper_core::{CatalogUrls, IdPattern, DEFAULT_ID_PATTERN};

use crate::{EngineError, Locator};

/// What the extraction phase does when a runtime label cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParseFaultPolicy {
    /// Fail the whole pass; the worker faults and the owner decides.
    #[default]
    AbortPass,
    /// Count the identifier as an invalid attempt and continue.
    SkipItem,
}

#[derive(Debug, Clone)]
pub struct ScraperSettings {
    /// Pause after every successful page-level automation call.
    pub action_cooldown: Duration,
    /// Wait after each jump of the vertical lazy-loading pass.
    pub scroll_settle: Duration,
    /// Wait after each horizontal scroll click inside a row.
    pub row_scroll_settle: Duration,
    pub login_poll_interval: Duration,
    pub max_scroll_steps_per_row: usize,
    pub max_vertical_passes: usize,
    pub parse_fault_policy: ParseFaultPolicy,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        let action_cooldown = Duration::from_millis(500);
        Self {
            action_cooldown,
            scroll_settle: action_cooldown * 3,
            row_scroll_settle: action_cooldown * 2,
            login_poll_interval: Duration::from_secs(1),
            max_scroll_steps_per_row: 100,
            max_vertical_passes: 50,
            parse_fault_policy: ParseFaultPolicy::default(),
        }
    }
}

impl ScraperSettings {
    /// No pauses at all; for scripted browsers.
    pub fn immediate() -> Self {
        Self {
            action_cooldown: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            row_scroll_settle: Duration::ZERO,
            login_poll_interval: Duration::from_millis(5),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldRead {
    Text,
    Attribute(String),
}

/// Where one record field lives inside the detail panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSource {
    pub locator: Locator,
    pub read: FieldRead,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogLayout {
    pub rows: Locator,
    pub items: Locator,
    pub item_link: Locator,
    #[serde(default = "default_link_attribute")]
    pub link_attribute: String,
    pub scroll_control: Locator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailLayout {
    pub panel: Locator,
    pub runtime: FieldSource,
    pub name: FieldSource,
    pub thumbnail: FieldSource,
    pub description: FieldSource,
    pub age: FieldSource,
    pub tag_groups: Locator,
    pub tag_kind_attribute: String,
    pub tag_links: Locator,
    pub actor_group: String,
    pub genre_group: String,
    #[serde(default)]
    pub season_markers: Vec<String>,
    #[serde(default)]
    pub tag_exclusions: Vec<String>,
}

/// Everything provider-specific, as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider: String,
    pub base_url: String,
    pub detail_path: String,
    pub watch_path: String,
    #[serde(default = "default_id_pattern")]
    pub id_pattern: String,
    /// Present while the session still needs a manual login.
    #[serde(default)]
    pub login_gate: Option<Locator>,
    /// Clicked once before discovery when present (profile pickers and such).
    #[serde(default)]
    pub entry_click: Option<Locator>,
    pub catalog: CatalogLayout,
    pub detail: DetailLayout,
}

impl ProviderProfile {
    pub fn from_ron(text: &str) -> Result<Self, EngineError> {
        ron::from_str(text).map_err(|err| EngineError::Config(err.to_string()))
    }

    pub fn urls(&self) -> Result<CatalogUrls, EngineError> {
        CatalogUrls::new(&self.base_url, &self.detail_path, &self.watch_path)
            .map_err(|err| EngineError::Config(format!("base url {}: {err}", self.base_url)))
    }

    pub fn id_pattern(&self) -> Result<IdPattern, EngineError> {
        IdPattern::new(&self.id_pattern)
            .map_err(|err| EngineError::Config(format!("id pattern {}: {err}", self.id_pattern)))
    }
}

fn default_link_attribute() -> String {
    "href".to_string()
}

fn default_id_pattern() -> String {
    DEFAULT_ID_PATTERN.to_string()
}
