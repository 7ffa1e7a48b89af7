use std::collections::BTreeSet;

/// Variant-specific part of an extracted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Movie { duration_minutes: u32 },
    Series { seasons: String },
}

/// Fields shared by every record, whatever its kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaDetails {
    pub name: String,
    pub description: String,
    pub age: String,
    pub thumbnail: String,
    pub url: String,
    pub provider_id: String,
    pub genres: BTreeSet<String>,
    pub actors: BTreeSet<String>,
    pub provider: String,
}

/// One record extracted from a detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRecord {
    pub details: MediaDetails,
    pub kind: MediaKind,
}

impl MediaRecord {
    pub fn new(kind: MediaKind, details: MediaDetails) -> Self {
        Self { details, kind }
    }

    /// A record is kept only when name, provider id, description and url are
    /// all non-empty.
    pub fn is_valid(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Names of the required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let d = &self.details;
        [
            ("name", d.name.as_str()),
            ("provider_id", d.provider_id.as_str()),
            ("description", d.description.as_str()),
            ("url", d.url.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn provider_id(&self) -> &str {
        &self.details.provider_id
    }

    pub fn is_series(&self) -> bool {
        matches!(self.kind, MediaKind::Series { .. })
    }
}

/// Normalizes one genre/actor tag: commas are stripped, whitespace trimmed.
/// Empty tags and tags containing any of `exclusions` (case-insensitive)
/// yield `None`.
pub fn clean_tag(raw: &str, exclusions: &[String]) -> Option<String> {
    let tag = raw.replace(',', "");
    let tag = tag.trim();
    if tag.is_empty() {
        return None;
    }
    let lowered = tag.to_lowercase();
    if exclusions
        .iter()
        .any(|word| !word.is_empty() && lowered.contains(&word.to_lowercase()))
    {
        return None;
    }
    Some(tag.to_string())
}
