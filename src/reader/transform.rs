//! Value transforms applied to every extracted value.
//!
//! Each transform is one variant of [`Transform`], dispatched by an
//! exhaustive match to a pure function.

use chrono::NaiveDate;
use indexmap::IndexMap;

/// Output format of normalized dates.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// A value transform.
#[derive(Debug, Clone, Copy)]
pub enum Transform<'a> {
    /// Reformat values that parse as a date under one of the patterns.
    NormalizeDate {
        /// `chrono` patterns, tried in order
        patterns: &'a [String],
    },
    /// Replace display text by its destination identifier.
    AcceptedValues {
        /// Identifier to display text
        accepted: &'a IndexMap<String, String>,
        /// Suppress values without a match instead of passing them through
        strict: bool,
    },
}

impl Transform<'_> {
    /// Apply the transform.
    #[must_use]
    pub fn apply(&self, value: &str) -> String {
        match *self {
            Transform::NormalizeDate { patterns } => normalize_date(value, patterns),
            Transform::AcceptedValues { accepted, strict } => {
                substitute_accepted(value, accepted, strict)
            }
        }
    }
}

/// Rewrite `value` as ISO-8601 if it parses under one of `patterns`.
///
/// Values that match no pattern are returned unchanged.
///
/// # Examples
///
/// ```
/// use marc_mapping::reader::transform::normalize_date;
///
/// let patterns = vec!["%Y-%m-%d".to_string(), "%m/%d/%Y".to_string()];
/// assert_eq!(normalize_date("12/31/2020", &patterns), "2020-12-31");
/// assert_eq!(normalize_date("v.12", &patterns), "v.12");
/// ```
#[must_use]
pub fn normalize_date(value: &str, patterns: &[String]) -> String {
    let trimmed = value.trim();
    patterns
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(trimmed, pattern).ok())
        .map_or_else(
            || value.to_string(),
            |date| date.format(ISO_DATE_FORMAT).to_string(),
        )
}

/// Split `Name (Code)` into its name and code.
fn split_bracketed(text: &str) -> Option<(&str, &str)> {
    let trimmed = text.trim_end();
    let body = trimmed.strip_suffix(')')?;
    let open = body.rfind('(')?;
    Some((body[..open].trim(), body[open + 1..].trim()))
}

/// Whether `value` names the accepted display text `text`.
fn matches_display(value: &str, text: &str) -> bool {
    if value.eq_ignore_ascii_case(text.trim()) {
        return true;
    }
    match split_bracketed(text) {
        Some((name, code)) => {
            value.eq_ignore_ascii_case(code)
                || value.eq_ignore_ascii_case(&format!("({code})"))
                || (!name.is_empty() && value.eq_ignore_ascii_case(name))
        }
        None => false,
    }
}

/// Reverse-lookup a value in an accepted-values map.
///
/// Returns the identifier whose display text matches `value`, either exactly
/// (case-insensitive) or through the `Name (Code)` convention: the code, the
/// parenthesized code, or the name alone. A value that already is an
/// identifier matches itself.
#[must_use]
pub fn match_accepted_value<'a>(
    value: &str,
    accepted: &'a IndexMap<String, String>,
) -> Option<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Some((id, _)) = accepted.get_key_value(value) {
        return Some(id.as_str());
    }
    accepted
        .iter()
        .find(|(_, text)| matches_display(value, text))
        .map(|(id, _)| id.as_str())
}

/// Substitute a value by its accepted identifier.
///
/// With an empty map the value passes through. Without a match the value
/// passes through, or becomes blank when `strict`.
#[must_use]
pub fn substitute_accepted(value: &str, accepted: &IndexMap<String, String>, strict: bool) -> String {
    if accepted.is_empty() {
        return value.to_string();
    }
    match match_accepted_value(value, accepted) {
        Some(id) => id.to_string(),
        None if strict => String::new(),
        None => value.to_string(),
    }
}
