//! Application configuration persisted as TOML.
//! Every section falls back to defaults field by field, so a partial or
//! outdated file still loads.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// Budget (in characters, separators included) for one alternation chunk.
pub const DEFAULT_MAX_ALTERNATION_LEN: usize = 20_000;

/// How `\b` around each dictionary form is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WordBoundary {
    /// Only ASCII letters, digits and `_` are word characters. A term that
    /// starts or ends with a non-ASCII letter ("café", "Æsir") never matches
    /// in this mode; such glossaries need `unicode`.
    #[default]
    Ascii,
    /// Unicode word characters (letters of any script count).
    Unicode,
}

/// Search index construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub max_alternation_len: usize,
    /// Upper bound on the compiled regex program, in bytes.
    pub regex_size_limit: usize,
    pub word_boundary: WordBoundary,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_alternation_len: DEFAULT_MAX_ALTERNATION_LEN,
            regex_size_limit: 256 * (1 << 20),
            word_boundary: WordBoundary::Ascii,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttacherConfig {
    pub format_template: String,
}

impl Default for AttacherConfig {
    fn default() -> Self {
        Self {
            format_template: crate::terms::rewriter::DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Recently used paths. Empty means "not set".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub last_text_file: String,
    pub last_glossary_file: String,
    pub last_output_dir: String,
    pub lemma_data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Header names for the (term, translation) columns of exported tables.
    pub columns: [String; 2],
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            columns: ["原文".to_string(), "译文".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub index: IndexConfig,
    pub attacher: AttacherConfig,
    pub paths: PathsConfig,
    pub export: ExportConfig,
}

impl AppConfig {
    /// Load from `path`. A missing or unparsable file yields defaults.
    pub fn load_or_default(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config read failed, using defaults");
                return Self::default();
            }
        };
        match toml::from_str(&content) {
            Ok(config) => {
                info!(path = %path.display(), "config loaded");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config parse failed, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| EngineError::unreadable(path.display().to_string(), e))?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| EngineError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Lemma data directory, if one is configured.
    pub fn lemma_data_dir(&self) -> Option<PathBuf> {
        non_empty_path(&self.paths.lemma_data_dir)
    }
}

fn non_empty_path(s: &str) -> Option<PathBuf> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(PathBuf::from(s))
    }
}
