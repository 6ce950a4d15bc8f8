//! Duplicate-attendance detection
//!
//! The remote attendance service reports "already recorded today" as a
//! business error, but the HTTP status it uses for it varies (200, 400, 409
//! and 500 have all been observed). Detection therefore looks at the
//! `message`/`error` text of the reply body instead of the status code.
//!
//! The phrases are an allow-list of substrings. The defaults match the
//! service's current wording; deployments can extend the list in TOML when
//! the wording changes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message the proxy sends back when it remaps a duplicate
pub const DUPLICATE_MESSAGE: &str = "오늘 이미 출석한 이력이 있습니다.";

/// Default phrases, matched as substrings.
///
/// The Korean phrase also covers the longer "오늘 이미 출석한 이력이 있습니다"
/// variant.
pub const DEFAULT_PHRASES: &[&str] = &["이미 출석한 이력이 있습니다", "already recorded today"];

/// Allow-list of substrings that mark a reply as a duplicate attendance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DuplicatePhrases(Vec<String>);

impl DuplicatePhrases {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            phrases
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.trim().is_empty())
                .collect(),
        )
    }

    pub fn phrases(&self) -> &[String] {
        &self.0
    }

    /// True if `text` contains any phrase (ASCII case-insensitive)
    pub fn matches(&self, text: &str) -> bool {
        let lowered = text.to_ascii_lowercase();
        self.0
            .iter()
            .any(|phrase| lowered.contains(&phrase.to_ascii_lowercase()))
    }

    /// Inspect a parsed reply body.
    ///
    /// A reply is a duplicate when its `message` or `error` string matches a
    /// phrase, or when it carries `isDuplicate: true` (set by the proxy after
    /// remapping).
    pub fn detect(&self, body: &Value) -> bool {
        if body.get("isDuplicate").and_then(Value::as_bool) == Some(true) {
            return true;
        }

        ["message", "error"]
            .iter()
            .filter_map(|field| body.get(field).and_then(Value::as_str))
            .any(|text| self.matches(text))
    }
}

impl Default for DuplicatePhrases {
    fn default() -> Self {
        Self::new(DEFAULT_PHRASES.iter().copied())
    }
}
