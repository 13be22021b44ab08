//! Dictionary store: the term → translation mapping for one loaded glossary.
//! A load replaces the whole mapping at once; revision and fingerprint tell
//! compiled indexes which snapshot they belong to.

use std::collections::HashMap;

use tracing::{debug, info};

use super::GlossaryEntry;
use crate::error::EngineError;

/// Positional table as read from a glossary source. Only the first two
/// columns are used, whatever their header names.
#[derive(Debug, Clone, Default)]
pub struct GlossaryTable {
    pub source_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl GlossaryTable {
    pub fn new(source_name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            source_name: source_name.into(),
            headers,
            rows,
        }
    }

    /// Build a two-column table from (source, target) pairs.
    pub fn from_pairs<I, S, T>(source_name: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            source_name: source_name.into(),
            headers: vec!["source".to_string(), "target".to_string()],
            rows: pairs
                .into_iter()
                .map(|(s, t)| vec![s.into(), t.into()])
                .collect(),
        }
    }

    /// Number of columns: the header width or the widest row, whichever is larger.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.headers.len())
    }
}

#[derive(Debug, Clone)]
pub struct DictionaryStore {
    entries: Vec<GlossaryEntry>,
    positions: HashMap<String, usize>,
    revision: u64,
    fingerprint: blake3::Hash,
}

impl Default for DictionaryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
            revision: 0,
            fingerprint: fingerprint_of(&[]),
        }
    }

    /// Replace the mapping with the first two columns of `table`.
    ///
    /// Fields are trimmed; rows with an empty source or target are dropped.
    /// A repeated source keeps its first position but takes the last
    /// translation. On error the previous mapping is left untouched.
    pub fn load(&mut self, table: &GlossaryTable) -> Result<usize, EngineError> {
        if table.width() < 2 {
            return Err(EngineError::malformed(
                &table.source_name,
                format!(
                    "{} column(s); need at least a source and a target column",
                    table.width()
                ),
            ));
        }

        let mut entries: Vec<GlossaryEntry> = Vec::with_capacity(table.rows.len());
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(table.rows.len());
        let mut dropped = 0usize;

        for row in &table.rows {
            let source = row.first().map(|s| s.trim()).unwrap_or("");
            let target = row.get(1).map(|s| s.trim()).unwrap_or("");
            if source.is_empty() || target.is_empty() {
                dropped += 1;
                continue;
            }
            match positions.get(source) {
                Some(&i) => entries[i].target = target.to_string(),
                None => {
                    positions.insert(source.to_string(), entries.len());
                    entries.push(GlossaryEntry {
                        source: source.to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }

        if entries.is_empty() {
            return Err(EngineError::malformed(
                &table.source_name,
                "no rows with both a source term and a translation",
            ));
        }

        debug!(
            source = %table.source_name,
            rows = table.rows.len(),
            dropped,
            "glossary rows cleaned"
        );

        self.fingerprint = fingerprint_of(&entries);
        self.entries = entries;
        self.positions = positions;
        self.revision += 1;
        info!(
            source = %table.source_name,
            entries = self.entries.len(),
            revision = self.revision,
            "dictionary loaded"
        );
        Ok(self.entries.len())
    }

    pub fn translation(&self, term: &str) -> Option<&str> {
        self.positions
            .get(term)
            .map(|&i| self.entries[i].target.as_str())
    }

    /// Entries in first-insertion order.
    pub fn entries(&self) -> &[GlossaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Incremented on every successful load or clear.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// blake3 digest of the current entries.
    pub fn fingerprint(&self) -> blake3::Hash {
        self.fingerprint
    }
}

fn fingerprint_of(entries: &[GlossaryEntry]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for e in entries {
        hasher.update(e.source.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(e.target.as_bytes());
        hasher.update(b"\x1e");
    }
    hasher.finalize()
}
