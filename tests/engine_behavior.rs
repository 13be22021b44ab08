//! End-to-end behavior of the public engine API: loading, matching,
//! attachment and lemma fallback with on-disk lemma data.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use termkit::terms::index::LemmaStatus;
use termkit::terms::lemma::{CachedLemmatizer, LazyLemmatizer, MorphyLemmatizer, PartOfSpeech};
use termkit::{EngineError, GlossaryTable, IndexConfig, Progress, TranslationEngine, WordBoundary};

fn engine_with(pairs: &[(&str, &str)]) -> TranslationEngine {
    let mut engine = TranslationEngine::default();
    engine
        .load_table(&GlossaryTable::from_pairs("test", pairs.iter().copied()))
        .unwrap();
    engine
}

fn write_wordnet(dir: &Path) {
    std::fs::write(
        dir.join("index.noun"),
        "  1 This software and database is being provided\nwolf n 2 1 @ 2 0 02114100\nrun n 16 4 @ ~ #m %p 16 1\nfire_ball n 1 0 1 0 00000001\n",
    )
    .unwrap();
    std::fs::write(dir.join("index.verb"), "run v 41 4 @ ~ * > 41 30\ncast v 1 0 1 0 1\n").unwrap();
    std::fs::write(dir.join("noun.exc"), "wolves wolf\n").unwrap();
    std::fs::write(dir.join("verb.exc"), "ran run\nrunning run\n").unwrap();
}

#[test]
fn longest_match_wins() {
    let mut engine = engine_with(&[("fire", "火"), ("fire ball", "火球术")]);
    let found = engine.find_terms("a fire ball spell").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found.get("fire ball"), Some("火球术"));
}

#[test]
fn case_insensitive_match_with_case_preserving_rewrite() {
    let mut engine = engine_with(&[("fireball", "火球术")]);
    let out = engine
        .rewrite_with("Cast FIREBALL now", "{translation}({original})")
        .unwrap();
    assert_eq!(out, "Cast 火球术(FIREBALL) now");
}

#[test]
fn dedup_in_find_terms_and_multiplicity_in_rewrite() {
    let mut engine = engine_with(&[("orc", "兽人")]);
    assert_eq!(engine.find_terms("orc orc orc").unwrap().len(), 1);
    assert_eq!(
        engine.rewrite_with("orc orc orc", "{original}/{translation}").unwrap(),
        "orc/兽人 orc/兽人 orc/兽人"
    );
}

#[test]
fn empty_dictionary_and_empty_text() {
    let mut empty = TranslationEngine::default();
    assert!(empty.find_terms("anything at all").unwrap().is_empty());
    assert_eq!(
        empty.rewrite_with("anything at all", "{translation}").unwrap(),
        "anything at all"
    );

    let mut engine = engine_with(&[("orc", "兽人")]);
    assert!(engine.find_terms("").unwrap().is_empty());
    assert_eq!(engine.rewrite_with("", "{translation}").unwrap(), "");
}

#[test]
fn lemma_fallback_through_wordnet_files() {
    let dir = tempfile::tempdir().unwrap();
    write_wordnet(dir.path());
    let resolver = Arc::new(CachedLemmatizer::new(LazyLemmatizer::new(dir.path()), 64));

    let mut engine = TranslationEngine::default().with_resolver(resolver);
    engine
        .load_table(&GlossaryTable::from_pairs("t", [("run", "跑"), ("wolves", "狼群")]))
        .unwrap();
    let report = engine.build_index().unwrap();
    assert_eq!(report.lemma_status, LemmaStatus::Applied);

    let found = engine.find_terms("She is running with a wolf").unwrap();
    assert_eq!(found.get("run"), Some("跑"));
    assert_eq!(found.get("wolves"), Some("狼群"));
    assert_eq!(found.len(), 2);
}

#[test]
fn missing_lemma_data_degrades_to_surface_matching() {
    let dir = tempfile::tempdir().unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let mut engine = TranslationEngine::default()
        .with_resolver(Arc::new(LazyLemmatizer::new(dir.path().join("absent"))))
        .with_observer(Arc::new(move |p: &Progress| sink.lock().push(p.clone())));
    engine
        .load_table(&GlossaryTable::from_pairs("t", [("run", "跑")]))
        .unwrap();

    let found = engine.find_terms("run, she is running").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found.get("run"), Some("跑"));
    assert!(events
        .lock()
        .iter()
        .any(|p| matches!(p, Progress::LemmaUnavailable { .. })));
    assert!(matches!(
        engine.build_index().unwrap().lemma_status,
        LemmaStatus::Unavailable { .. }
    ));
}

#[test]
fn in_memory_morphy_resolver() {
    let morphy = MorphyLemmatizer::new()
        .with_lemmas(PartOfSpeech::Verb, ["cast"])
        .with_lemmas(PartOfSpeech::Noun, ["spell"]);
    let mut engine = TranslationEngine::default().with_resolver(Arc::new(morphy));
    engine
        .load_table(&GlossaryTable::from_pairs("t", [("casts", "施放"), ("spell", "法术")]))
        .unwrap();

    // "casts" registers its lemma "cast"; "spells" resolves through the text side.
    let found = engine.find_terms("to cast spells").unwrap();
    assert_eq!(found.get("casts"), Some("施放"));
    assert_eq!(found.get("spell"), Some("法术"));
}

#[test]
fn reload_replaces_dictionary_and_rebuilds() {
    let mut engine = engine_with(&[("orc", "兽人")]);
    assert_eq!(engine.find_terms("orc and elf").unwrap().len(), 1);
    assert!(engine.is_index_current());

    engine
        .load_table(&GlossaryTable::from_pairs("v2", [("elf", "精灵")]))
        .unwrap();
    assert!(!engine.is_index_current());
    let found = engine.find_terms("orc and elf").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found.get("elf"), Some("精灵"));
    assert!(engine.is_index_current());
}

#[test]
fn rejected_load_keeps_previous_dictionary() {
    let mut engine = engine_with(&[("orc", "兽人")]);
    let blank = GlossaryTable::from_pairs("blank", [("  ", "x"), ("y", "")]);
    let err = engine.load_table(&blank).unwrap_err();
    assert!(matches!(err, EngineError::EmptyOrMalformedSource { .. }));
    assert_eq!(engine.term_count(), 1);
    assert_eq!(engine.find_terms("an orc").unwrap().get("orc"), Some("兽人"));
}

#[test]
fn many_terms_split_across_chunks_still_match() {
    let terms: Vec<(String, String)> = (0..4000)
        .map(|i| (format!("term{i:05}"), format!("译{i}")))
        .collect();
    let mut engine = TranslationEngine::new(IndexConfig {
        max_alternation_len: 1000,
        ..IndexConfig::default()
    });
    engine
        .load_table(&GlossaryTable::from_pairs("big", terms.iter().cloned()))
        .unwrap();
    let report = engine.build_index().unwrap();
    assert!(report.chunks > 1, "{report:?}");

    let found = engine.find_terms("first TERM00000 then term03999").unwrap();
    assert_eq!(found.get("term00000"), Some("译0"));
    assert_eq!(found.get("term03999"), Some("译3999"));
}

#[test]
fn unicode_boundary_mode() {
    let pairs = [("elf", "精灵")];
    let mut ascii = engine_with(&pairs);
    assert_eq!(ascii.find_terms("精灵elf").unwrap().len(), 1);

    let mut unicode = TranslationEngine::new(IndexConfig {
        word_boundary: WordBoundary::Unicode,
        ..IndexConfig::default()
    });
    unicode
        .load_table(&GlossaryTable::from_pairs("t", pairs))
        .unwrap();
    // CJK letters are word characters under Unicode rules.
    assert!(unicode.find_terms("精灵elf").unwrap().is_empty());
    assert_eq!(unicode.find_terms("精灵 elf").unwrap().len(), 1);
}

#[test]
fn glossary_file_to_attached_text() {
    let dir = tempfile::tempdir().unwrap();
    let glossary = dir.path().join("terms.csv");
    std::fs::write(&glossary, "原文,译文\nfire ball,火球术\norc,兽人\n").unwrap();

    let mut engine = TranslationEngine::default();
    assert_eq!(engine.load_file(&glossary).unwrap(), 2);
    let out = engine
        .rewrite_with("The Orc cast Fire Ball.", "{original} ({translation})")
        .unwrap();
    assert_eq!(out, "The Orc (兽人) cast Fire Ball (火球术).");

    let err = engine.load_file(&dir.path().join("missing.csv")).unwrap_err();
    assert!(matches!(err, EngineError::SourceNotFound { .. }));
}

fn unicode_engine_with(pairs: &[(&str, &str)]) -> TranslationEngine {
    let mut engine = TranslationEngine::new(IndexConfig {
        word_boundary: WordBoundary::Unicode,
        ..IndexConfig::default()
    });
    engine
        .load_table(&GlossaryTable::from_pairs("test", pairs.iter().copied()))
        .unwrap();
    engine
}

#[test]
fn case_fold_variants_rewrite_to_their_key() {
    let mut engine = engine_with(&[("mission", "任务"), ("orc", "兽人")]);
    assert_eq!(
        engine
            .rewrite_with("the orc's miſſion", "{translation}({original})")
            .unwrap(),
        "the 兽人(orc)'s 任务(miſſion)"
    );
    assert_eq!(engine.find_terms("miſſion").unwrap().get("mission"), Some("任务"));

    let mut greek = unicode_engine_with(&[("ΟΔΟΣ", "道路")]);
    assert_eq!(greek.rewrite_with("η οδοσ εδω", "{translation}").unwrap(), "η 道路 εδω");
    assert_eq!(greek.rewrite_with("η οδος εδω", "{translation}").unwrap(), "η 道路 εδω");
}

#[test]
fn non_ascii_edge_terms_need_unicode_boundary() {
    let pairs = [("café", "咖啡馆"), ("Æsir", "阿萨神族")];
    let text = "a café and the Æsir here";

    let mut ascii = engine_with(&pairs);
    assert!(ascii.find_terms(text).unwrap().is_empty());

    let mut unicode = unicode_engine_with(&pairs);
    let found = unicode.find_terms(text).unwrap();
    assert_eq!(found.get("café"), Some("咖啡馆"));
    assert_eq!(found.get("Æsir"), Some("阿萨神族"));
}
