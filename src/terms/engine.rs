//! Translation engine: owns the dictionary and its compiled index.
//!
//! Loading a glossary invalidates the index; the next match or rewrite
//! rebuilds it. The engine is synchronous and not meant to be shared across
//! threads without external locking: hosts run it on a worker and keep the UI
//! responsive through the progress observer.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::index::{BuildReport, LemmaStatus, SearchIndex};
use super::lemma::LemmaResolver;
use super::matcher;
use super::rewriter::{self, Template};
use super::store::{DictionaryStore, GlossaryTable};
use super::{FoundTerms, TermMatch};
use crate::config::IndexConfig;
use crate::error::EngineError;
use crate::metrics::{MetricsRegistry, Stage};
use crate::progress::{Progress, ProgressObserver};

pub struct TranslationEngine {
    store: DictionaryStore,
    /// `None` until first use after a load.
    index: Option<SearchIndex>,
    resolver: Option<Arc<dyn LemmaResolver>>,
    observer: Option<Arc<dyn ProgressObserver>>,
    config: IndexConfig,
    metrics: Arc<MetricsRegistry>,
}

impl Default for TranslationEngine {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl TranslationEngine {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            store: DictionaryStore::new(),
            index: None,
            resolver: None,
            observer: None,
            config,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn LemmaResolver>) -> Self {
        self.resolver = Some(resolver);
        self.index = None;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    fn report(&self, event: Progress) {
        if let Some(observer) = &self.observer {
            observer.on_progress(&event);
        }
    }

    /// Replace the dictionary with `table`. Returns the number of retained terms.
    pub fn load_table(&mut self, table: &GlossaryTable) -> Result<usize, EngineError> {
        self.report(Progress::LoadStarted {
            source_name: table.source_name.clone(),
        });
        let timer = self.metrics.time(Stage::DictionaryLoad);
        let count = self.store.load(table)?;
        timer.stop();
        self.index = None;
        self.report(Progress::LoadComplete { entries: count });
        Ok(count)
    }

    /// Read a glossary file (see `source::read_table`) and load it.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, EngineError> {
        let table = crate::source::read_table(path)?;
        self.load_table(&table)
    }

    pub fn term_count(&self) -> usize {
        self.store.len()
    }

    pub fn store(&self) -> &DictionaryStore {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn is_index_current(&self) -> bool {
        self.index
            .as_ref()
            .is_some_and(|index| index.is_built_from(&self.store))
    }

    /// Compile the index now instead of on first use.
    pub fn build_index(&mut self) -> Result<BuildReport, EngineError> {
        let (index, _) = self.prepared()?;
        Ok(index.report())
    }

    /// Current index and the store it was built from, rebuilding if stale.
    fn prepared(&mut self) -> Result<(&SearchIndex, &DictionaryStore), EngineError> {
        let index = match self.index.take() {
            Some(index) if index.is_built_from(&self.store) => index,
            _ => self.compile()?,
        };
        Ok((self.index.insert(index), &self.store))
    }

    fn compile(&self) -> Result<SearchIndex, EngineError> {
        self.report(Progress::IndexBuildStarted {
            terms: self.store.len(),
        });
        let timer = self.metrics.time(Stage::IndexBuild);
        let index = SearchIndex::build(&self.store, self.resolver.clone(), &self.config)?;
        timer.stop();

        let report = index.report();
        if let LemmaStatus::Unavailable { reason } = &report.lemma_status {
            warn!(reason = %reason, "index built without lemma forms");
            self.report(Progress::LemmaUnavailable {
                reason: reason.clone(),
            });
        }
        self.report(Progress::IndexBuildComplete {
            surface_forms: report.surface_forms,
            lemma_forms: report.lemma_forms,
        });
        Ok(index)
    }

    /// Distinct dictionary terms in `text` mapped to their translations.
    pub fn find_terms(&mut self, text: &str) -> Result<FoundTerms, EngineError> {
        let metrics = Arc::clone(&self.metrics);
        let (index, store) = self.prepared()?;
        let timer = metrics.time(Stage::FindTerms);
        let found = matcher::find_terms(index, store, text);
        timer.stop();
        info!(chars = text.chars().count(), found = found.len(), "terms extracted");
        self.report(Progress::MatchComplete { found: found.len() });
        Ok(found)
    }

    /// Every occurrence of a dictionary term in `text`, left to right.
    pub fn find_matches(&mut self, text: &str) -> Result<Vec<TermMatch>, EngineError> {
        let (index, store) = self.prepared()?;
        matcher::find_matches(index, store, text)
    }

    /// Replace every occurrence in `text` using `template`.
    pub fn rewrite(&mut self, text: &str, template: &Template) -> Result<String, EngineError> {
        let metrics = Arc::clone(&self.metrics);
        let (index, store) = self.prepared()?;
        let timer = metrics.time(Stage::Rewrite);
        let rewritten = rewriter::rewrite(index, store, text, template)?;
        timer.stop();
        info!(replacements = rewritten.matches.len(), "translations attached");
        self.report(Progress::RewriteComplete {
            replacements: rewritten.matches.len(),
        });
        Ok(rewritten.text)
    }

    /// `rewrite` with a template given as a string.
    pub fn rewrite_with(&mut self, text: &str, template: &str) -> Result<String, EngineError> {
        let template = Template::parse(template)?;
        self.rewrite(text, &template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terms::lemma::{LemmaError, PartOfSpeech};
    use parking_lot::Mutex;
    use std::collections::HashMap;

    struct MapResolver(HashMap<&'static str, &'static str>);

    impl LemmaResolver for MapResolver {
        fn lemmatize(&self, word: &str, pos: PartOfSpeech) -> String {
            match pos {
                PartOfSpeech::Verb => self.0.get(word).copied().unwrap_or(word).to_string(),
                PartOfSpeech::Noun => word.to_string(),
            }
        }
    }

    struct Missing;

    impl LemmaResolver for Missing {
        fn prepare(&self) -> Result<(), LemmaError> {
            Err(LemmaError::Unavailable {
                reason: "offline".into(),
            })
        }

        fn lemmatize(&self, word: &str, _pos: PartOfSpeech) -> String {
            word.to_string()
        }
    }

    fn engine(pairs: &[(&str, &str)]) -> TranslationEngine {
        let mut e = TranslationEngine::default();
        e.load_table(&GlossaryTable::from_pairs("test", pairs.iter().copied()))
            .unwrap();
        e
    }

    fn recorder() -> (Arc<Mutex<Vec<Progress>>>, Arc<dyn ProgressObserver>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let observer: Arc<dyn ProgressObserver> =
            Arc::new(move |event: &Progress| sink.lock().push(event.clone()));
        (events, observer)
    }

    #[test]
    fn index_built_lazily_and_invalidated_by_load() {
        let mut e = engine(&[("orc", "兽人")]);
        assert!(!e.is_index_current());
        assert_eq!(e.find_terms("an orc").unwrap().get("orc"), Some("兽人"));
        assert!(e.is_index_current());

        e.load_table(&GlossaryTable::from_pairs("next", [("elf", "精灵")]))
            .unwrap();
        assert!(!e.is_index_current());
        let found = e.find_terms("an orc and an elf").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.get("elf"), Some("精灵"));
    }

    #[test]
    fn lemma_fallback_resolves_to_dictionary_key() {
        let resolver = Arc::new(MapResolver(HashMap::from([("running", "run")])));
        let mut e = TranslationEngine::default().with_resolver(resolver);
        e.load_table(&GlossaryTable::from_pairs("test", [("Running", "奔跑")]))
            .unwrap();
        let found = e.find_terms("we run").unwrap();
        assert_eq!(found.get("Running"), Some("奔跑"));
    }

    #[test]
    fn inflected_text_resolves_to_base_form_key() {
        let resolver = Arc::new(MapResolver(HashMap::from([("running", "run")])));
        let mut e = TranslationEngine::default().with_resolver(resolver);
        e.load_table(&GlossaryTable::from_pairs("test", [("run", "跑")]))
            .unwrap();
        let found = e.find_terms("She is running").unwrap();
        assert_eq!(found.into_map(), HashMap::from([("run".to_string(), "跑".to_string())]));
        assert_eq!(
            e.rewrite_with("She is running", "{translation}({original})").unwrap(),
            "She is 跑(running)"
        );
    }

    #[test]
    fn progress_milestones_in_order() {
        let (events, observer) = recorder();
        let mut e = TranslationEngine::default().with_observer(observer);
        e.load_table(&GlossaryTable::from_pairs("g.csv", [("orc", "兽人")]))
            .unwrap();
        e.rewrite("orc", &Template::default()).unwrap();
        e.find_terms("orc").unwrap();

        assert_eq!(
            *events.lock(),
            vec![
                Progress::LoadStarted {
                    source_name: "g.csv".into()
                },
                Progress::LoadComplete { entries: 1 },
                Progress::IndexBuildStarted { terms: 1 },
                Progress::IndexBuildComplete {
                    surface_forms: 1,
                    lemma_forms: 0
                },
                Progress::RewriteComplete { replacements: 1 },
                Progress::MatchComplete { found: 1 },
            ]
        );
    }

    #[test]
    fn unavailable_lemma_data_is_a_soft_warning() {
        let (events, observer) = recorder();
        let mut e = TranslationEngine::default()
            .with_resolver(Arc::new(Missing))
            .with_observer(observer);
        e.load_table(&GlossaryTable::from_pairs("g", [("orc", "兽人")]))
            .unwrap();
        let report = e.build_index().unwrap();
        assert_eq!(
            report.lemma_status,
            LemmaStatus::Unavailable {
                reason: "lemma data unavailable: offline".into()
            }
        );
        assert!(events
            .lock()
            .iter()
            .any(|ev| matches!(ev, Progress::LemmaUnavailable { .. })));
        assert_eq!(e.find_terms("orc").unwrap().len(), 1);
    }

    #[test]
    fn empty_engine_is_a_no_op() {
        let mut e = TranslationEngine::default();
        assert!(e.find_terms("anything").unwrap().is_empty());
        assert_eq!(e.rewrite_with("anything", "{original}").unwrap(), "anything");
        assert!(e.find_matches("").unwrap().is_empty());
    }

    #[test]
    fn bad_template_is_rejected_before_scanning() {
        let mut e = engine(&[("orc", "兽人")]);
        let err = e.rewrite_with("orc", "{translation} {lang}").unwrap_err();
        assert!(matches!(err, EngineError::Template(_)));
    }

    #[test]
    fn failed_load_keeps_working_index() {
        let mut e = engine(&[("orc", "兽人")]);
        e.build_index().unwrap();
        let bad = GlossaryTable::new("bad", vec!["only".into()], vec![vec!["x".into()]]);
        assert!(e.load_table(&bad).is_err());
        assert!(e.is_index_current());
        assert_eq!(e.term_count(), 1);
    }

    #[test]
    fn records_stage_metrics() {
        let mut e = engine(&[("orc", "兽人")]);
        e.find_terms("orc").unwrap();
        e.rewrite("orc", &Template::default()).unwrap();
        let metrics = e.metrics();
        assert_eq!(metrics.count(Stage::DictionaryLoad), 1);
        assert_eq!(metrics.count(Stage::IndexBuild), 1);
        assert_eq!(metrics.count(Stage::FindTerms), 1);
        assert_eq!(metrics.count(Stage::Rewrite), 1);
    }
}
