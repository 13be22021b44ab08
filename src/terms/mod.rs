//! Glossary term matching: dictionary store, lemma resolution, compiled
//! search index, term extraction and translation attachment.

pub mod engine;
pub mod index;
pub mod lemma;
pub mod matcher;
pub mod rewriter;
pub mod store;

use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One dictionary row: source term and its translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub source: String,
    pub target: String,
}

/// A single occurrence found during one scan. Offsets are byte offsets into
/// the scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermMatch {
    pub start: usize,
    pub end: usize,
    /// Text exactly as it appears in the source.
    pub matched_text: String,
    pub canonical_key: String,
    pub translation: String,
}

/// Distinct terms found in a text, in order of first occurrence.
/// Serializes as a `{term: translation}` map in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoundTerms {
    entries: Vec<GlossaryEntry>,
    positions: HashMap<String, usize>,
}

impl FoundTerms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` unless it is already present. Returns whether it was added.
    pub(crate) fn insert_first(&mut self, key: &str, translation: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.positions.insert(key.to_string(), self.entries.len());
        self.entries.push(GlossaryEntry {
            source: key.to_string(),
            target: translation.to_string(),
        });
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.positions
            .get(key)
            .map(|&i| self.entries[i].target.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlossaryEntry> {
        self.entries.iter()
    }

    /// Export order: longest term first, first occurrence breaks ties.
    pub fn sorted_by_length_desc(&self) -> Vec<GlossaryEntry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|e| std::cmp::Reverse(e.source.chars().count()));
        sorted
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.entries.into_iter().map(|e| (e.source, e.target)).collect()
    }
}

impl Serialize for FoundTerms {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for e in &self.entries {
            map.serialize_entry(&e.source, &e.target)?;
        }
        map.end()
    }
}
