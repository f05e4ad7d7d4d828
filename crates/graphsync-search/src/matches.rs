//! Hit envelope parsing.
//!
//! The backend response is a JSON object with a `"hits"` object whose
//! inner `"hits"` array carries one element per match: `"_score"`
//! (numeric) and `"_id"` (string, the external key). Everything else
//! in the envelope is opaque to this path; callers that want it use
//! `raw_search`.

use serde_json::Value;
use tracing::warn;

/// A search result paired with, optionally, the live graph entity it
/// was resolved to.
///
/// Unresolved matches are filtered out of final results, never
/// surfaced as empty entries.
#[derive(Debug, Clone)]
pub struct SearchMatch<T> {
    /// External key from the hit's `_id`
    pub key: String,

    /// Relevance score as returned by the backend, not re-sorted
    pub score: f64,

    /// Live entity, populated by resolution
    pub entity: Option<T>,
}

impl<T> SearchMatch<T> {
    pub fn unresolved(key: impl Into<String>, score: f64) -> Self {
        Self {
            key: key.into(),
            score,
            entity: None,
        }
    }

    /// The same match carrying a resolved entity.
    pub fn resolved(self, entity: T) -> Self {
        Self {
            entity: Some(entity),
            ..self
        }
    }
}

/// Parse the hit envelope into matches, in backend order.
///
/// Absence of the whole `hits` structure yields zero matches, not an
/// error; a hit without an `_id` is skipped with a diagnostic.
pub fn parse_hits<T>(body: &str) -> Vec<SearchMatch<T>> {
    let envelope: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Search response is not valid JSON");
            return Vec::new();
        }
    };

    let Some(hits) = envelope.get("hits").and_then(|h| h.get("hits")).and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let mut matches = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(key) = hit.get("_id").and_then(Value::as_str) else {
            warn!(hit = %hit, "No key found in search hit");
            continue;
        };
        let score = hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0);
        matches.push(SearchMatch::unresolved(key, score));
    }
    matches
}
