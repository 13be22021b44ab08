//! termkit: glossary term extraction and translation attachment.
//!
//! A [`TranslationEngine`] holds a source-term → translation dictionary and a
//! compiled search index over it. It answers two questions about a text:
//! which dictionary terms occur in it, and what the text looks like with a
//! translation attached next to every occurrence.

pub mod config;
pub mod error;
pub mod metrics;
pub mod progress;
pub mod source;
pub mod terms;

pub use config::{AppConfig, IndexConfig, WordBoundary};
pub use error::EngineError;
pub use progress::{Progress, ProgressObserver};
pub use terms::engine::TranslationEngine;
pub use terms::rewriter::{Template, TemplateError, DEFAULT_TEMPLATE, TEMPLATE_PRESETS};
pub use terms::store::GlossaryTable;
pub use terms::{FoundTerms, GlossaryEntry, TermMatch};

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// `termkit=info` filter; `json` switches to one JSON object per line.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("termkit=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    // A second init in the same process (tests) is not an error.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
