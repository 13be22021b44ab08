//! Term extraction over a compiled index.

use tracing::debug;

use super::index::SearchIndex;
use super::store::DictionaryStore;
use super::{FoundTerms, TermMatch};
use crate::error::EngineError;

/// Distinct canonical terms occurring in `text`, first occurrence first.
pub fn find_terms(index: &SearchIndex, store: &DictionaryStore, text: &str) -> FoundTerms {
    let mut found = FoundTerms::new();
    if text.is_empty() {
        return found;
    }
    let spans = index.scan(text);
    for span in &spans {
        let Some(key) = span.canonical else {
            debug!(start = span.start, end = span.end, "span did not resolve, skipped");
            continue;
        };
        if let Some(translation) = store.translation(key) {
            found.insert_first(key, translation);
        }
    }
    let occurrences = spans.len();
    debug!(occurrences, distinct = found.len(), "term scan done");
    found
}

/// Every occurrence in `text`, left to right, without deduplication.
/// A span that does not resolve to a dictionary entry is an index defect and
/// fails the whole scan.
pub fn find_matches(
    index: &SearchIndex,
    store: &DictionaryStore,
    text: &str,
) -> Result<Vec<TermMatch>, EngineError> {
    let mut matches = Vec::new();
    for span in index.scan(text) {
        let unresolved = || EngineError::UnresolvedMatch {
            matched: String::from_utf8_lossy(&text.as_bytes()[span.start..span.end]).into_owned(),
            offset: span.start,
        };
        let matched = text.get(span.start..span.end).ok_or_else(unresolved)?;
        let key = span.canonical.ok_or_else(unresolved)?;
        let translation = store.translation(key).ok_or_else(unresolved)?;
        matches.push(TermMatch {
            start: span.start,
            end: span.end,
            matched_text: matched.to_string(),
            canonical_key: key.to_string(),
            translation: translation.to_string(),
        });
    }
    Ok(matches)
}
