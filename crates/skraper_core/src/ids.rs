use std::borrow::Borrow;
use std::fmt;

use regex::Regex;

/// Pattern used when a provider profile does not override it.
pub const DEFAULT_ID_PATTERN: &str = "[0-9]+";

/// Opaque token identifying one catalog item within a discovery run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogItemId(String);

impl CatalogItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CatalogItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CatalogItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for CatalogItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CatalogItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Pulls a catalog identifier out of a link or attribute value.
#[derive(Debug, Clone)]
pub struct IdPattern {
    regex: Regex,
}

impl IdPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// First non-empty match in `text`, if any.
    pub fn extract(&self, text: &str) -> Option<CatalogItemId> {
        self.regex
            .find_iter(text)
            .map(|m| m.as_str())
            .find(|m| !m.is_empty())
            .map(CatalogItemId::from)
    }
}

impl Default for IdPattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_ID_PATTERN).expect("default id pattern compiles"),
        }
    }
}
