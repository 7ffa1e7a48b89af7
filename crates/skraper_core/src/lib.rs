//! Scraper core: pure lifecycle state machine and catalog domain types.
mod discovery;
mod effect;
mod ids;
mod media;
mod msg;
mod runtime;
mod state;
mod update;
mod urls;

pub use discovery::{DiscoveryRecord, FULLY_OBSERVED};
pub use effect::TaskEffect;
pub use ids::{CatalogItemId, IdPattern, DEFAULT_ID_PATTERN};
pub use media::{clean_tag, MediaDetails, MediaKind, MediaRecord};
pub use msg::TaskMsg;
pub use runtime::{classify_runtime, parse_duration, ParseDurationError};
pub use state::{LifecycleError, TaskState};
pub use update::update;
pub use urls::{CatalogUrls, ID_PLACEHOLDER};
