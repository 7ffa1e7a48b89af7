use url::{ParseError, Url};

use crate::CatalogItemId;

/// Token replaced by the item identifier in path templates.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Builds the detail-view and canonical urls of catalog items.
///
/// Templates follow url join rules: a leading `/` resolves from the host,
/// anything else resolves below the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogUrls {
    base: Url,
    /// `base` with a trailing slash, so that relative templates nest below it.
    join_root: Url,
    detail_path: String,
    watch_path: String,
}

impl CatalogUrls {
    pub fn new(base: &str, detail_path: &str, watch_path: &str) -> Result<Self, ParseError> {
        let base = Url::parse(base.trim())?;
        // `join` replaces the last segment unless the base ends with a slash.
        let mut join_root = base.clone();
        if !join_root.path().ends_with('/') {
            let path = format!("{}/", join_root.path());
            join_root.set_path(&path);
        }
        Ok(Self {
            base,
            join_root,
            detail_path: detail_path.to_string(),
            watch_path: watch_path.to_string(),
        })
    }

    /// Catalog entry page, as configured.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Page that shows the item's details.
    pub fn detail_url(&self, id: &CatalogItemId) -> Result<Url, ParseError> {
        self.resolve(&self.detail_path, id)
    }

    /// Canonical url stored on the extracted record.
    pub fn watch_url(&self, id: &CatalogItemId) -> Result<Url, ParseError> {
        self.resolve(&self.watch_path, id)
    }

    fn resolve(&self, template: &str, id: &CatalogItemId) -> Result<Url, ParseError> {
        self.join_root.join(&template.replace(ID_PLACEHOLDER, id.as_str()))
    }
}
