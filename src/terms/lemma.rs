//! Lemma resolution: maps an inflected single word to its base form.
//!
//! The index builder only depends on the `LemmaResolver` trait. The concrete
//! resolver here follows WordNet's morphy: exception lists, suffix detachment
//! rules, and a lexicon filter, loaded from a local data directory.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOfSpeech {
    Noun,
    Verb,
}

impl PartOfSpeech {
    fn file_suffix(self) -> &'static str {
        match self {
            PartOfSpeech::Noun => "noun",
            PartOfSpeech::Verb => "verb",
        }
    }

    fn detachment_rules(self) -> &'static [(&'static str, &'static str)] {
        match self {
            PartOfSpeech::Noun => &[
                ("s", ""),
                ("ses", "s"),
                ("xes", "x"),
                ("zes", "z"),
                ("ches", "ch"),
                ("shes", "sh"),
                ("men", "man"),
                ("ies", "y"),
            ],
            PartOfSpeech::Verb => &[
                ("s", ""),
                ("ies", "y"),
                ("es", "e"),
                ("es", ""),
                ("ed", "e"),
                ("ed", ""),
                ("ing", "e"),
                ("ing", ""),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LemmaError {
    #[error("lemma data unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Base-form lookup for lowercase single words.
///
/// `lemmatize` must be pure: the same word and part of speech always give the
/// same answer. Words the resolver does not know are returned unchanged.
pub trait LemmaResolver: Send + Sync {
    /// Make backing data available. The index builder calls this once per
    /// build and falls back to surface-only matching on error.
    fn prepare(&self) -> Result<(), LemmaError> {
        Ok(())
    }

    fn lemmatize(&self, word: &str, pos: PartOfSpeech) -> String;
}

/// Verb-then-noun normalization: "running" → "run", "wolves" → "wolf".
pub fn lemmatize_chain(resolver: &dyn LemmaResolver, word: &str) -> String {
    let verb = resolver.lemmatize(word, PartOfSpeech::Verb);
    resolver.lemmatize(&verb, PartOfSpeech::Noun)
}

/// WordNet-style morphological analyzer over in-memory tables.
#[derive(Debug, Clone, Default)]
pub struct MorphyLemmatizer {
    lexicon: HashMap<PartOfSpeech, HashSet<String>>,
    exceptions: HashMap<PartOfSpeech, HashMap<String, Vec<String>>>,
}

impl MorphyLemmatizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add base forms known for `pos`.
    pub fn with_lemmas<I, S>(mut self, pos: PartOfSpeech, lemmas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lexicon
            .entry(pos)
            .or_default()
            .extend(lemmas.into_iter().map(Into::into));
        self
    }

    /// Add an irregular form and its base forms for `pos`.
    pub fn with_exception(mut self, pos: PartOfSpeech, form: &str, bases: &[&str]) -> Self {
        self.exceptions
            .entry(pos)
            .or_default()
            .insert(form.to_string(), bases.iter().map(|b| b.to_string()).collect());
        self
    }

    /// Load `index.{noun,verb}` and `{noun,verb}.exc` from a WordNet dict directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self, LemmaError> {
        if !dir.is_dir() {
            return Err(LemmaError::Unavailable {
                reason: format!("{} is not a directory", dir.display()),
            });
        }
        let mut lemmatizer = Self::new();
        for pos in [PartOfSpeech::Noun, PartOfSpeech::Verb] {
            let index_path = dir.join(format!("index.{}", pos.file_suffix()));
            let index = read_data_file(&index_path)?;
            lemmatizer
                .lexicon
                .insert(pos, parse_index(&index).collect());

            // Exception lists are optional; a missing one only loses irregular forms.
            let exc_path = dir.join(format!("{}.exc", pos.file_suffix()));
            match std::fs::read_to_string(&exc_path) {
                Ok(exc) => {
                    lemmatizer.exceptions.insert(pos, parse_exceptions(&exc));
                }
                Err(e) => {
                    warn!(path = %exc_path.display(), error = %e, "exception list not loaded");
                }
            }
        }
        info!(
            dir = %dir.display(),
            nouns = lemmatizer.lexicon_len(PartOfSpeech::Noun),
            verbs = lemmatizer.lexicon_len(PartOfSpeech::Verb),
            "lemma data loaded"
        );
        Ok(lemmatizer)
    }

    pub fn lexicon_len(&self, pos: PartOfSpeech) -> usize {
        self.lexicon.get(&pos).map_or(0, HashSet::len)
    }

    fn in_lexicon(&self, pos: PartOfSpeech, form: &str) -> bool {
        self.lexicon.get(&pos).is_some_and(|l| l.contains(form))
    }

    /// Lexicon forms `word` may be an inflection of, in candidate order.
    fn candidates(&self, word: &str, pos: PartOfSpeech) -> Vec<String> {
        let mut forms = vec![word.to_string()];
        match self.exceptions.get(&pos).and_then(|e| e.get(word)) {
            Some(bases) => forms.extend(bases.iter().cloned()),
            None => {
                for (suffix, replacement) in pos.detachment_rules() {
                    if let Some(stem) = word.strip_suffix(suffix) {
                        forms.push(format!("{stem}{replacement}"));
                    }
                }
            }
        }
        let mut seen = HashSet::new();
        forms
            .into_iter()
            .filter(|f| !f.is_empty() && self.in_lexicon(pos, f))
            .filter(|f| seen.insert(f.clone()))
            .collect()
    }
}

impl LemmaResolver for MorphyLemmatizer {
    fn lemmatize(&self, word: &str, pos: PartOfSpeech) -> String {
        let candidates = self.candidates(word, pos);
        // Shortest candidate wins; min_by_key keeps the first on ties.
        candidates
            .into_iter()
            .min_by_key(|c| c.chars().count())
            .unwrap_or_else(|| word.to_string())
    }
}

fn read_data_file(path: &Path) -> Result<String, LemmaError> {
    std::fs::read_to_string(path).map_err(|e| LemmaError::Unavailable {
        reason: format!("{}: {e}", path.display()),
    })
}

/// Lemmas from a WordNet index file. License header lines start with a space;
/// collocations (`fire_ball`) never match a single word and are skipped.
fn parse_index(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .filter(|line| !line.starts_with(' '))
        .filter_map(|line| line.split_whitespace().next())
        .filter(|lemma| !lemma.contains('_'))
        .map(str::to_lowercase)
}

/// `inflected base1 [base2 ...]` per line.
fn parse_exceptions(content: &str) -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let Some(form) = fields.next() else {
            continue;
        };
        let bases: Vec<String> = fields.map(str::to_lowercase).collect();
        if !bases.is_empty() {
            map.insert(form.to_lowercase(), bases);
        }
    }
    map
}

/// Loads a `MorphyLemmatizer` from disk on first `prepare()`.
/// A failed load is remembered; later builds report the same reason without
/// touching the disk again.
pub struct LazyLemmatizer {
    data_dir: PathBuf,
    state: Mutex<Option<Result<MorphyLemmatizer, LemmaError>>>,
}

impl LazyLemmatizer {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            state: Mutex::new(None),
        }
    }
}

impl LemmaResolver for LazyLemmatizer {
    fn prepare(&self) -> Result<(), LemmaError> {
        let mut state = self.state.lock();
        let loaded =
            state.get_or_insert_with(|| MorphyLemmatizer::load_from_dir(&self.data_dir));
        match loaded {
            Ok(_) => Ok(()),
            Err(e) => Err(e.clone()),
        }
    }

    fn lemmatize(&self, word: &str, pos: PartOfSpeech) -> String {
        match self.state.lock().as_ref() {
            Some(Ok(morphy)) => morphy.lemmatize(word, pos),
            _ => word.to_string(),
        }
    }
}

/// LRU memo in front of another resolver, keyed on (pos, word).
pub struct CachedLemmatizer<R> {
    inner: R,
    cache: Mutex<LruCache<(PartOfSpeech, String), String>>,
}

impl<R: LemmaResolver> CachedLemmatizer<R> {
    pub fn new(inner: R, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of memoized lookups.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }
}

impl<R: LemmaResolver> LemmaResolver for CachedLemmatizer<R> {
    fn prepare(&self) -> Result<(), LemmaError> {
        self.inner.prepare()
    }

    fn lemmatize(&self, word: &str, pos: PartOfSpeech) -> String {
        let key = (pos, word.to_string());
        if let Some(hit) = self.cache.lock().get(&key) {
            return hit.clone();
        }
        let lemma = self.inner.lemmatize(word, pos);
        debug!(word, lemma = %lemma, ?pos, "lemma cached");
        self.cache.lock().put(key, lemma.clone());
        lemma
    }
}
