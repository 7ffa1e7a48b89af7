use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::MediaKind;

static INTEGER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[0-9]+").expect("integer token pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDurationError {
    #[error("runtime `{input}` has {tokens} integer tokens, expected 1 or 2")]
    TokenCount { input: String, tokens: usize },
    #[error("runtime `{input}` does not fit in minutes")]
    Overflow { input: String },
}

/// Parses a runtime label into minutes.
///
/// One integer token is already minutes (`"90 min"`); two tokens are hours
/// then minutes (`"2h 15m"`). Any other token count is an error.
pub fn parse_duration(text: &str) -> Result<u32, ParseDurationError> {
    let overflow = || ParseDurationError::Overflow {
        input: text.to_string(),
    };
    let tokens = INTEGER_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().parse::<u32>().map_err(|_| overflow()))
        .collect::<Result<Vec<_>, _>>()?;

    match tokens.as_slice() {
        [minutes] => Ok(*minutes),
        [hours, minutes] => hours
            .checked_mul(60)
            .and_then(|h| h.checked_add(*minutes))
            .ok_or_else(overflow),
        _ => Err(ParseDurationError::TokenCount {
            input: text.to_string(),
            tokens: tokens.len(),
        }),
    }
}

/// Decides the record variant from the runtime field of a detail view.
///
/// A label containing any season marker selects a series and keeps the label
/// verbatim; anything else must parse as a movie duration.
pub fn classify_runtime(
    text: &str,
    season_markers: &[String],
) -> Result<MediaKind, ParseDurationError> {
    let lowered = text.to_lowercase();
    let is_series = season_markers
        .iter()
        .any(|marker| !marker.is_empty() && lowered.contains(&marker.to_lowercase()));

    if is_series {
        Ok(MediaKind::Series {
            seasons: text.trim().to_string(),
        })
    } else {
        parse_duration(text).map(|duration_minutes| MediaKind::Movie { duration_minutes })
    }
}
