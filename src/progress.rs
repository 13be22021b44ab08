//! Coarse progress milestones reported synchronously to a host observer.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Progress {
    LoadStarted { source_name: String },
    LoadComplete { entries: usize },
    IndexBuildStarted { terms: usize },
    /// Lemma data could not be obtained; the index matches surface forms only.
    LemmaUnavailable { reason: String },
    IndexBuildComplete { surface_forms: usize, lemma_forms: usize },
    MatchComplete { found: usize },
    RewriteComplete { replacements: usize },
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Progress::LoadStarted { source_name } => write!(f, "loading glossary {source_name}"),
            Progress::LoadComplete { entries } => write!(f, "loaded {entries} terms"),
            Progress::IndexBuildStarted { terms } => write!(f, "building index over {terms} terms"),
            Progress::LemmaUnavailable { reason } => {
                write!(f, "lemma data unavailable ({reason}), surface matching only")
            }
            Progress::IndexBuildComplete {
                surface_forms,
                lemma_forms,
            } => write!(f, "index built: {surface_forms} surface forms, {lemma_forms} lemma forms"),
            Progress::MatchComplete { found } => write!(f, "found {found} distinct terms"),
            Progress::RewriteComplete { replacements } => {
                write!(f, "attached translations to {replacements} occurrences")
            }
        }
    }
}

/// Receives milestones on the calling thread. Implementations must not block.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn on_progress(&self, event: &Progress) {
        self(event)
    }
}
