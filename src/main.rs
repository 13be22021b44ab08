//! termkit - glossary term extraction and translation attachment
//!
//! Usage: termkit [--config FILE] <command>

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use termkit::metrics::MetricsRegistry;
use termkit::source;
use termkit::terms::lemma::{CachedLemmatizer, LazyLemmatizer, LemmaResolver};
use termkit::{AppConfig, Progress, Template, TranslationEngine, TEMPLATE_PRESETS};

/// Used when neither `--lemma-data` nor the config names a directory.
const DEFAULT_LEMMA_DIR: &str = "wordnet";
const LEMMA_CACHE_CAPACITY: usize = 4096;

#[derive(Parser)]
#[command(name = "termkit")]
#[command(about = "Find glossary terms in text and attach their translations")]
struct Cli {
    /// Config file (created on first save)
    #[arg(long, default_value = "termkit.toml")]
    config: PathBuf,

    /// Directory with WordNet index.noun / index.verb / noun.exc / verb.exc
    #[arg(long)]
    lemma_data: Option<PathBuf>,

    /// Match surface forms only
    #[arg(long)]
    no_lemma: bool,

    /// Print stage timings as JSON when done
    #[arg(long)]
    stats: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List dictionary terms found in a text
    Extract {
        /// Glossary table (.csv, .tsv, .txt or .json)
        #[arg(long)]
        glossary: PathBuf,
        /// Text file to scan
        #[arg(long)]
        input: PathBuf,
        /// Write <prefix>_results.txt and <prefix>_results.csv
        #[arg(long)]
        output_prefix: Option<PathBuf>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Attach translations next to every term occurrence
    Attach {
        /// Glossary table (.csv, .tsv, .txt or .json)
        #[arg(long)]
        glossary: PathBuf,
        /// Text file to rewrite
        #[arg(long)]
        input: PathBuf,
        /// Output file (default: <input stem>_attached.txt next to the input)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Format template with {translation} and {original} slots
        #[arg(long, conflicts_with = "preset")]
        template: Option<String>,
        /// Built-in template number (see `termkit presets`)
        #[arg(long)]
        preset: Option<usize>,
    },

    /// List built-in format templates
    Presets,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    termkit::init_tracing(cli.log_json);

    let mut config = AppConfig::load_or_default(&cli.config);
    let metrics = Arc::new(MetricsRegistry::new());

    match &cli.command {
        Command::Presets => {
            list_presets();
            return Ok(());
        }
        Command::Extract {
            glossary,
            input,
            output_prefix,
            json,
        } => {
            let mut engine = build_engine(&cli, &config, &metrics);
            load_glossary(&mut engine, glossary)?;
            let text = source::read_text(input)
                .with_context(|| format!("reading text {}", input.display()))?;
            let found = engine.find_terms(&text).context("matching terms")?;
            let sorted = found.sorted_by_length_desc();

            if *json {
                println!("{}", serde_json::to_string_pretty(&sorted)?);
            } else {
                for entry in &sorted {
                    println!("{}\t{}", entry.source, entry.target);
                }
                println!("found {} term(s)", sorted.len());
            }

            if let Some(prefix) = output_prefix {
                match source::export_found_terms(&found, prefix, &config.export.columns)
                    .context("exporting results")?
                {
                    Some(paths) => {
                        info!(txt = %paths.txt.display(), csv = %paths.csv.display(), "exported");
                        remember_output_dir(&mut config, &paths.csv);
                    }
                    None => info!("nothing to export"),
                }
            }
            remember_inputs(&mut config, glossary, input);
        }
        Command::Attach {
            glossary,
            input,
            output,
            template,
            preset,
        } => {
            let template = choose_template(&config, template.as_deref(), *preset)?;
            let mut engine = build_engine(&cli, &config, &metrics);
            load_glossary(&mut engine, glossary)?;
            let text = source::read_text(input)
                .with_context(|| format!("reading text {}", input.display()))?;
            let rewritten = engine
                .rewrite(&text, &template)
                .context("attaching translations")?;

            let output = output.clone().unwrap_or_else(|| attached_path(input));
            source::write_text(&output, &rewritten)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("{}", output.display());

            config.attacher.format_template = template.to_string();
            remember_inputs(&mut config, glossary, input);
            remember_output_dir(&mut config, &output);
        }
    }

    config
        .save(&cli.config)
        .with_context(|| format!("saving config {}", cli.config.display()))?;

    if cli.stats {
        println!("{}", serde_json::to_string_pretty(&metrics.summary())?);
    }
    Ok(())
}

fn build_engine(cli: &Cli, config: &AppConfig, metrics: &Arc<MetricsRegistry>) -> TranslationEngine {
    let engine = TranslationEngine::new(config.index.clone())
        .with_metrics(Arc::clone(metrics))
        .with_observer(Arc::new(|event: &Progress| {
            debug!(target: "termkit::progress", "{event}");
        }));
    if cli.no_lemma {
        info!("lemma matching disabled");
        return engine;
    }
    let dir = cli
        .lemma_data
        .clone()
        .or_else(|| config.lemma_data_dir())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LEMMA_DIR));
    debug!(dir = %dir.display(), "lemma data directory");
    let resolver: Arc<dyn LemmaResolver> = Arc::new(CachedLemmatizer::new(
        LazyLemmatizer::new(dir),
        LEMMA_CACHE_CAPACITY,
    ));
    engine.with_resolver(resolver)
}

fn load_glossary(engine: &mut TranslationEngine, path: &Path) -> Result<()> {
    let count = engine
        .load_file(path)
        .with_context(|| format!("loading glossary {}", path.display()))?;
    info!(path = %path.display(), terms = count, "glossary loaded");
    Ok(())
}

/// `--template` wins over `--preset`; neither means the saved template.
fn choose_template(config: &AppConfig, template: Option<&str>, preset: Option<usize>) -> Result<Template> {
    let source = match (template, preset) {
        (Some(t), _) => t.to_string(),
        (None, Some(n)) => match n.checked_sub(1).and_then(|i| TEMPLATE_PRESETS.get(i)) {
            Some((t, _)) => t.to_string(),
            None => bail!("preset {n} does not exist; choose 1..={}", TEMPLATE_PRESETS.len()),
        },
        (None, None) => config.attacher.format_template.clone(),
    };
    Template::parse(&source).with_context(|| format!("invalid template {source:?}"))
}

fn list_presets() {
    for (i, (template, example)) in TEMPLATE_PRESETS.iter().enumerate() {
        println!("{}. {template:<28} e.g. {example}", i + 1);
    }
}

fn attached_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_attached.txt"))
}

fn remember_inputs(config: &mut AppConfig, glossary: &Path, input: &Path) {
    config.paths.last_glossary_file = glossary.display().to_string();
    config.paths.last_text_file = input.display().to_string();
}

fn remember_output_dir(config: &mut AppConfig, written: &Path) {
    if let Some(dir) = written.parent() {
        config.paths.last_output_dir = dir.display().to_string();
    }
}
