use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;
use webdex_core::persist::{load_index, save_index, IndexPaths};
use webdex_core::tokenizer::{FilterStats, StemmerKind, StopWords, TokenFilter};
use webdex_core::InvertedIndex;

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect TF-IDF inverted indexes from local text files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every .txt file under the input path
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// Continue numbering from an existing index in the output directory
        #[arg(long, default_value_t = false)]
        append: bool,
        /// Extra stop words, one per line
        #[arg(long)]
        stop_words: Option<PathBuf>,
        /// Index unstemmed tokens
        #[arg(long, default_value_t = false)]
        no_stem: bool,
    },
    /// Print document, term and posting counts of a saved index
    Stats {
        #[arg(long)]
        index: PathBuf,
    },
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, append, stop_words, no_stem } => {
            let mut words = StopWords::new();
            if let Some(path) = stop_words {
                words.extend_from_file(&path)?;
            }
            let kind = if no_stem { StemmerKind::Identity } else { StemmerKind::Porter };
            build_index(&input, &output, append, TokenFilter::with_kind(kind, words))
        }
        Commands::Stats { index } => print_stats(&index),
    }
}

fn build_index(input: &Path, output: &Path, append: bool, filter: TokenFilter) -> Result<()> {
    let out_paths = IndexPaths::new(output);
    let mut index = if append && out_paths.exists() {
        load_index(&out_paths)?
    } else {
        InvertedIndex::new()
    };

    let files = collect_files(input)?;
    tracing::info!(files = files.len(), first_doc_id = index.next_doc_id(), "indexing corpus");

    let mut stats = FilterStats::default();
    for (i, file) in files.iter().enumerate() {
        let bytes = match fs::read(file) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let doc = filter.filter(&String::from_utf8_lossy(&bytes));
        stats.merge(&doc.stats);
        let doc_id = index.index_document(file.to_string_lossy(), &doc.terms);
        tracing::debug!(doc_id, n = i + 1, total = files.len(), file = %file.display(), "processed");
    }

    let summary = index.score();
    save_index(&out_paths, &index)?;
    tracing::info!(
        documents = summary.num_docs,
        terms = summary.num_terms,
        tokens = stats.tokens,
        stop_words = stats.stop_words,
        short_words = stats.short_words,
        numbers = stats.numbers,
        output = %output.display(),
        "index build complete"
    );
    Ok(())
}

/// `.txt` files under `input`, in sorted path order so ids are reproducible.
fn collect_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("input path not found: {}", input.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
        .collect();
    files.sort();
    Ok(files)
}

fn print_stats(root: &Path) -> Result<()> {
    let index = load_index(&IndexPaths::new(root))?;
    println!("Documents: {}", index.num_docs());
    println!("Terms: {}", index.num_terms());
    println!("Postings: {}", index.num_postings());
    println!("Next document id: {}", index.next_doc_id());
    println!("Next term id: {}", index.next_term_id());
    Ok(())
}
