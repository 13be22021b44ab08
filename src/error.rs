//! Error taxonomy for loading, index building and rewriting.
//! Lemma data problems are not errors here: they degrade the index
//! (see `terms::lemma::LemmaError`) and are reported through the build report.

use std::path::PathBuf;

use crate::terms::rewriter::TemplateError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("source unreadable: {source_name}: {reason}")]
    SourceUnreadable { source_name: String, reason: String },

    #[error("empty or malformed source: {source_name}: {reason}")]
    EmptyOrMalformedSource { source_name: String, reason: String },

    #[error("term index build failed: {0}")]
    IndexBuild(#[from] regex::Error),

    #[error("invalid template: {0}")]
    Template(#[from] TemplateError),

    /// A span accepted by the compiled pattern did not resolve to a dictionary
    /// key. This is an index defect, never a user error.
    #[error("matched span {matched:?} at byte {offset} does not resolve to a dictionary term")]
    UnresolvedMatch { matched: String, offset: usize },

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub(crate) fn unreadable(source_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        EngineError::SourceUnreadable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::EmptyOrMalformedSource {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
