//! File-side collaborators: glossary tables, text files and result export.
//! The engine itself never touches the filesystem.

use std::path::{Path, PathBuf};

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::terms::store::GlossaryTable;
use crate::terms::{FoundTerms, GlossaryEntry};

/// On-disk JSON glossary format.
#[derive(Debug, Deserialize)]
struct GlossaryFile {
    #[serde(default)]
    version: u32,
    entries: Vec<GlossaryEntry>,
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}

fn ensure_exists(path: &Path) -> Result<(), EngineError> {
    if path.exists() {
        Ok(())
    } else {
        Err(EngineError::SourceNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Read a glossary table. The format follows the extension: `.csv`
/// (comma), `.tsv` / `.txt` (tab), `.json`. Delimited files have a header row.
pub fn read_table(path: &Path) -> Result<GlossaryTable, EngineError> {
    ensure_exists(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let table = match ext.as_str() {
        "csv" => read_delimited(path, b',')?,
        "tsv" | "txt" => read_delimited(path, b'\t')?,
        "json" => read_json(path)?,
        other => {
            return Err(EngineError::unreadable(
                source_name(path),
                format!("unsupported glossary format {other:?}; use .csv, .tsv or .json"),
            ))
        }
    };
    if table.width() < 2 {
        return Err(EngineError::malformed(
            source_name(path),
            format!(
                "{} column(s); need at least a source and a target column",
                table.width()
            ),
        ));
    }
    info!(
        path = %path.display(),
        rows = table.rows.len(),
        source_col = table.headers.first().map(String::as_str).unwrap_or(""),
        target_col = table.headers.get(1).map(String::as_str).unwrap_or(""),
        "glossary table read"
    );
    Ok(table)
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<GlossaryTable, EngineError> {
    let bytes = std::fs::read(path).map_err(|e| EngineError::unreadable(source_name(path), e))?;
    let content = decode_text(&bytes, path);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| EngineError::unreadable(source_name(path), e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::unreadable(source_name(path), e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(GlossaryTable::new(source_name(path), headers, rows))
}

fn read_json(path: &Path) -> Result<GlossaryTable, EngineError> {
    let bytes = std::fs::read(path).map_err(|e| EngineError::unreadable(source_name(path), e))?;
    let content = decode_text(&bytes, path);
    let file: GlossaryFile =
        serde_json::from_str(&content).map_err(|e| EngineError::unreadable(source_name(path), e))?;
    info!(path = %path.display(), version = file.version, "json glossary parsed");
    Ok(GlossaryTable::from_pairs(
        source_name(path),
        file.entries.into_iter().map(|e| (e.source, e.target)),
    ))
}

/// Decode file bytes. UTF-8 (BOM stripped) is taken as is; a UTF-16 BOM
/// selects UTF-16; anything else goes through charset detection, so GBK or
/// Big5 glossaries and texts decode without loss.
fn decode_text(bytes: &[u8], path: &Path) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    let encoding = match Encoding::for_bom(bytes) {
        Some((encoding, _)) => encoding,
        None => {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        }
    };
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!(
            path = %path.display(),
            encoding = used.name(),
            "undecodable bytes replaced"
        );
    } else {
        info!(path = %path.display(), encoding = used.name(), "decoded non-UTF-8 file");
    }
    text.into_owned()
}

/// Read a text file to be scanned.
pub fn read_text(path: &Path) -> Result<String, EngineError> {
    ensure_exists(path)?;
    let bytes = std::fs::read(path).map_err(|e| EngineError::unreadable(source_name(path), e))?;
    let text = decode_text(&bytes, path);
    info!(path = %path.display(), chars = text.chars().count(), "text file read");
    Ok(text)
}

fn create_parent(path: &Path) -> Result<(), EngineError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|source| EngineError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Write UTF-8 text, creating parent directories.
pub fn write_text(path: &Path, content: &str) -> Result<(), EngineError> {
    create_parent(path)?;
    std::fs::write(path, content).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "text file written");
    Ok(())
}

/// Files written by `export_found_terms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub txt: PathBuf,
    pub csv: PathBuf,
}

/// Write `{prefix}_results.txt` and `{prefix}_results.csv`, longest term
/// first. Nothing is written when `found` is empty.
pub fn export_found_terms(
    found: &FoundTerms,
    prefix: &Path,
    columns: &[String; 2],
) -> Result<Option<ExportPaths>, EngineError> {
    if found.is_empty() {
        info!("no terms found, nothing exported");
        return Ok(None);
    }
    let sorted = found.sorted_by_length_desc();
    let paths = ExportPaths {
        txt: with_suffix(prefix, "_results.txt"),
        csv: with_suffix(prefix, "_results.csv"),
    };

    let mut txt = String::from("Extracted terms (original -> translation):\n");
    txt.push_str(&"=".repeat(40));
    txt.push('\n');
    for e in &sorted {
        txt.push_str(&format!("{}    {}\n", e.source, e.target));
    }
    write_text(&paths.txt, &txt)?;

    create_parent(&paths.csv)?;
    let io_err = |source: std::io::Error| EngineError::Io {
        path: paths.csv.clone(),
        source,
    };
    let mut writer = csv::Writer::from_path(&paths.csv).map_err(|e| io_err(e.into()))?;
    writer
        .write_record(columns)
        .map_err(|e| io_err(e.into()))?;
    for e in &sorted {
        writer
            .write_record([&e.source, &e.target])
            .map_err(|e| io_err(e.into()))?;
    }
    writer.flush().map_err(io_err)?;

    info!(
        txt = %paths.txt.display(),
        csv = %paths.csv.display(),
        terms = sorted.len(),
        "extraction results exported"
    );
    Ok(Some(paths))
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
