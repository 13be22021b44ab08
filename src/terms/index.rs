//! Search index: one compiled case-insensitive alternation over every
//! dictionary surface form and lemma form, plus the tables that resolve a
//! matched span back to its canonical dictionary key.
//!
//! Alternatives are listed longest first, and the regex engine prefers the
//! earliest alternative that matches at a position, so the longest form wins.
//! Very large vocabularies are split into chunks of `max_alternation_len`
//! characters joined by an outer alternation. Ordering is exact inside a
//! chunk; across chunks an earlier chunk wins even against a longer form in a
//! later one.
//!
//! With a lemma resolver, words left unmatched by the pattern are lemmatized
//! too, so "running" in the text finds the dictionary term "run".

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use regex::bytes::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::lemma::{lemmatize_chain, LemmaResolver};
use super::store::DictionaryStore;
use crate::config::{IndexConfig, WordBoundary};
use crate::error::EngineError;

/// Whether lemma forms took part in the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LemmaStatus {
    Applied,
    /// No resolver configured.
    Disabled,
    /// Resolver data could not be obtained; surface forms only.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub terms: usize,
    pub surface_forms: usize,
    pub lemma_forms: usize,
    pub chunks: usize,
    pub lemma_status: LemmaStatus,
}

/// One occurrence found by `SearchIndex::scan`. Byte offsets into the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'i> {
    pub start: usize,
    pub end: usize,
    /// `None` only if the index is inconsistent with its own pattern.
    pub canonical: Option<&'i str>,
}

#[derive(Clone)]
pub struct SearchIndex {
    pattern: Option<Regex>,
    /// Word tokens checked against lemmas in the gaps between pattern matches.
    word_pattern: Option<Regex>,
    resolver: Option<Arc<dyn LemmaResolver>>,
    /// case-folded term → term as authored
    surface_to_canonical: HashMap<String, String>,
    /// case-folded lemma → term as authored
    lemma_to_canonical: HashMap<String, String>,
    chunks: usize,
    terms: usize,
    lemma_status: LemmaStatus,
    revision: u64,
    fingerprint: blake3::Hash,
}

impl SearchIndex {
    /// Compile `store` into an index. Lemma data problems degrade the index to
    /// surface forms; only a pattern compile failure is an error.
    pub fn build(
        store: &DictionaryStore,
        resolver: Option<Arc<dyn LemmaResolver>>,
        config: &IndexConfig,
    ) -> Result<Self, EngineError> {
        let mut index = Self {
            pattern: None,
            word_pattern: None,
            resolver: None,
            surface_to_canonical: HashMap::new(),
            lemma_to_canonical: HashMap::new(),
            chunks: 0,
            terms: store.len(),
            lemma_status: LemmaStatus::Disabled,
            revision: store.revision(),
            fingerprint: store.fingerprint(),
        };
        if store.is_empty() {
            debug!("empty dictionary, index has no pattern");
            return Ok(index);
        }

        // Stable: equal lengths keep insertion order.
        let mut keys: Vec<&str> = store.entries().iter().map(|e| e.source.as_str()).collect();
        keys.sort_by_key(|k| Reverse(k.chars().count()));

        for key in &keys {
            index
                .surface_to_canonical
                .insert(fold_case(key), key.to_string());
        }

        if let Some(resolver) = resolver {
            index.lemma_status = match resolver.prepare() {
                Ok(()) => {
                    index.register_lemmas(&keys, resolver.as_ref());
                    index.word_pattern = Some(word_pattern(config.word_boundary)?);
                    index.resolver = Some(resolver);
                    LemmaStatus::Applied
                }
                Err(e) => {
                    warn!(error = %e, "lemma resolver unavailable, matching surface forms only");
                    LemmaStatus::Unavailable {
                        reason: e.to_string(),
                    }
                }
            };
        }

        let mut forms: Vec<&str> = index
            .surface_to_canonical
            .keys()
            .chain(index.lemma_to_canonical.keys())
            .map(String::as_str)
            .collect();
        forms.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        let escaped: Vec<String> = forms.iter().map(|f| regex::escape(f)).collect();

        let chunks = chunk_alternation(&escaped, config.max_alternation_len);
        index.chunks = chunks.len();
        let pattern = wrap_pattern(&chunks, config.word_boundary);
        debug!(
            forms = escaped.len(),
            chunks = index.chunks,
            pattern_len = pattern.len(),
            "compiling term pattern"
        );

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .size_limit(config.regex_size_limit)
            .dfa_size_limit(config.regex_size_limit)
            .build()?;
        index.pattern = Some(regex);

        info!(
            terms = index.terms,
            surface_forms = index.surface_to_canonical.len(),
            lemma_forms = index.lemma_to_canonical.len(),
            chunks = index.chunks,
            "search index built"
        );
        Ok(index)
    }

    /// Single-word terms whose lemma differs from the term and is not itself a
    /// surface form. The first (longest) term to claim a lemma keeps it.
    fn register_lemmas(&mut self, keys: &[&str], resolver: &dyn LemmaResolver) {
        for key in keys {
            let lower = key.to_lowercase();
            if lower.contains(char::is_whitespace) {
                continue;
            }
            let lemma = fold_case(&lemmatize_chain(resolver, &lower));
            if lemma.is_empty()
                || lemma == fold_case(key)
                || self.surface_to_canonical.contains_key(&lemma)
            {
                continue;
            }
            self.lemma_to_canonical
                .entry(lemma)
                .or_insert_with(|| key.to_string());
        }
    }

    pub fn has_pattern(&self) -> bool {
        self.pattern.is_some()
    }

    /// Whether this index was compiled from the current contents of `store`.
    pub fn is_built_from(&self, store: &DictionaryStore) -> bool {
        self.revision == store.revision() && self.fingerprint == store.fingerprint()
    }

    /// Canonical key for a matched span: surface forms first, then lemmas.
    pub fn resolve(&self, matched: &str) -> Option<&str> {
        let folded = fold_case(matched);
        self.surface_to_canonical
            .get(&folded)
            .or_else(|| self.lemma_to_canonical.get(&folded))
            .map(String::as_str)
    }

    /// Byte spans of non-overlapping pattern matches, left to right.
    pub fn spans<'a>(&'a self, text: &'a str) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.pattern
            .iter()
            .flat_map(move |re| re.find_iter(text.as_bytes()))
            .map(|m| (m.start(), m.end()))
    }

    /// All occurrences in `text`, left to right: pattern matches, plus words
    /// between them whose lemma is a dictionary form.
    pub fn scan(&self, text: &str) -> Vec<Span<'_>> {
        let mut out = Vec::new();
        let mut cursor = 0;
        for (start, end) in self.spans(text) {
            self.scan_gap(text, cursor, start, &mut out);
            out.push(Span {
                start,
                end,
                canonical: text.get(start..end).and_then(|m| self.resolve(m)),
            });
            cursor = end;
        }
        self.scan_gap(text, cursor, text.len(), &mut out);
        out
    }

    fn scan_gap<'i>(&'i self, text: &str, from: usize, to: usize, out: &mut Vec<Span<'i>>) {
        let (Some(words), Some(resolver)) = (&self.word_pattern, &self.resolver) else {
            return;
        };
        let Some(gap) = text.get(from..to) else {
            return;
        };
        for m in words.find_iter(gap.as_bytes()) {
            let Some(word) = gap.get(m.start()..m.end()) else {
                continue;
            };
            let lower = word.to_lowercase();
            let lemma = lemmatize_chain(resolver.as_ref(), &lower);
            if fold_case(&lemma) == fold_case(word) {
                continue;
            }
            if let Some(key) = self.resolve(&lemma) {
                out.push(Span {
                    start: from + m.start(),
                    end: from + m.end(),
                    canonical: Some(key),
                });
            }
        }
    }

    pub fn lemma_forms(&self) -> &HashMap<String, String> {
        &self.lemma_to_canonical
    }

    pub fn surface_forms(&self) -> &HashMap<String, String> {
        &self.surface_to_canonical
    }

    pub fn report(&self) -> BuildReport {
        BuildReport {
            terms: self.terms,
            surface_forms: self.surface_to_canonical.len(),
            lemma_forms: self.lemma_to_canonical.len(),
            chunks: self.chunks,
            lemma_status: self.lemma_status.clone(),
        }
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("has_pattern", &self.pattern.is_some())
            .field("surface_forms", &self.surface_to_canonical.len())
            .field("lemma_forms", &self.lemma_to_canonical.len())
            .field("chunks", &self.chunks)
            .field("lemma_status", &self.lemma_status)
            .field("revision", &self.revision)
            .finish()
    }
}

/// Case-fold key shared by the lookup tables and matched spans.
///
/// The compiled pattern is case-insensitive under Unicode simple case
/// folding, so every string it treats as equal must fold to the same key.
/// Per-char lowercasing covers most classes; the table below merges the
/// lowercase letters that share a fold class (ſ/s, ς/σ, µ/μ, ...). Per-char
/// mapping also keeps a final Σ as σ, unlike `str::to_lowercase`. `İ` has
/// no simple fold partner and stays as written.
pub(crate) fn fold_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\u{0130}' {
            out.push(c);
            continue;
        }
        out.extend(c.to_lowercase().map(merge_fold_class));
    }
    out
}

fn merge_fold_class(c: char) -> char {
    match c {
        'ſ' => 's',
        'ς' => 'σ',
        'µ' => 'μ',
        'ϐ' => 'β',
        'ϑ' => 'θ',
        'ϕ' => 'φ',
        'ϖ' => 'π',
        'ϰ' => 'κ',
        'ϱ' => 'ρ',
        'ϵ' => 'ε',
        '\u{0345}' | '\u{1FBE}' => 'ι',
        'ẛ' => 'ṡ',
        'ᲀ' => 'в',
        'ᲁ' => 'д',
        'ᲂ' => 'о',
        'ᲃ' => 'с',
        'ᲄ' | 'ᲅ' => 'т',
        'ᲆ' => 'ъ',
        'ᲇ' => 'ѣ',
        'ᲈ' => 'ꙋ',
        other => other,
    }
}

/// Group escaped forms so each group's length plus one separator per form
/// stays within `max_len` characters. A form longer than `max_len` gets a
/// group of its own.
fn chunk_alternation(escaped: &[String], max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf: Vec<&str> = Vec::new();
    let mut cur_len = 0usize;
    for term in escaped {
        let cost = term.chars().count() + 1;
        if !buf.is_empty() && cur_len + cost > max_len {
            chunks.push(buf.join("|"));
            buf.clear();
            cur_len = 0;
        }
        buf.push(term);
        cur_len += cost;
    }
    if !buf.is_empty() {
        chunks.push(buf.join("|"));
    }
    chunks
}

fn word_pattern(boundary: WordBoundary) -> Result<Regex, regex::Error> {
    match boundary {
        WordBoundary::Ascii => Regex::new(r"(?-u:\b)(?-u:\w)+(?-u:\b)"),
        WordBoundary::Unicode => Regex::new(r"\b\w+\b"),
    }
}

fn wrap_pattern(chunks: &[String], boundary: WordBoundary) -> String {
    let body = match chunks {
        [only] => only.clone(),
        _ => format!("(?:{})", chunks.join(")|(?:")),
    };
    let b = match boundary {
        WordBoundary::Ascii => r"(?-u:\b)",
        WordBoundary::Unicode => r"\b",
    };
    format!("{b}(?:{body}){b}")
}
