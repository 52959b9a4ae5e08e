use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;
use webdex_core::tokenizer::{StemmerKind, StopWords, TokenFilter};
use webdex_crawler::config::DEFAULT_USER_AGENT;
use webdex_crawler::{CrawlConfig, Crawler, HttpFetcher};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl a site depth-first and build a TF-IDF inverted index")]
struct Cli {
    /// Seed URL, e.g. http://www.example.com
    #[arg(long)]
    seed: String,
    /// Output directory for the index tables
    #[arg(long, default_value = "./web_index")]
    output: PathBuf,
    /// Maximum number of URLs in the frontier and documents to process
    #[arg(long, default_value_t = 500)]
    max_urls: usize,
    /// Maximum link depth from the seed
    #[arg(long, default_value_t = 10)]
    max_depth: u32,
    /// Request timeout seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// Pause between fetches in milliseconds
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
    /// Only follow links that stay on the same host as the page
    #[arg(long, default_value_t = false)]
    same_host_only: bool,
    /// Extra stop words, one per line
    #[arg(long)]
    stop_words: Option<PathBuf>,
    /// Index unstemmed tokens
    #[arg(long, default_value_t = false)]
    no_stem: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();
    let args = Cli::parse();

    let seed = Url::parse(&args.seed).with_context(|| format!("invalid seed url {:?}", args.seed))?;
    if !matches!(seed.scheme(), "http" | "https") {
        bail!("seed must start with http:// or https://, got {}", args.seed);
    }

    let mut stop_words = StopWords::new();
    if let Some(path) = &args.stop_words {
        let added = stop_words.extend_from_file(path)?;
        tracing::info!(added, total = stop_words.len(), "loaded extra stop words");
    }
    let kind = if args.no_stem { StemmerKind::Identity } else { StemmerKind::Porter };

    let config = CrawlConfig {
        max_urls: args.max_urls,
        max_depth: args.max_depth,
        timeout: Duration::from_secs(args.timeout_secs),
        delay: Duration::from_millis(args.delay_ms),
        user_agent: args.user_agent.clone(),
        same_host_only: args.same_host_only,
        output_dir: args.output.clone(),
        ..CrawlConfig::default()
    };
    let stop = Arc::new(AtomicBool::new(false));
    let interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing current page");
            interrupt.store(true, Ordering::SeqCst);
        }
    });

    let fetcher = HttpFetcher::new(&config)?;
    let mut crawler =
        Crawler::new(config, fetcher, TokenFilter::with_kind(kind, stop_words)).with_stop(stop);

    let report = crawler.run(&seed).await?;

    let stats_path = args.output.join("crawl_stats.json");
    fs::write(&stats_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("writing {}", stats_path.display()))?;

    tracing::info!(
        state = ?report.state,
        documents = report.documents_processed,
        tokens = report.filter.tokens,
        unique_terms = report.unique_terms,
        stop_words = report.filter.stop_words,
        vocabulary_ratio = format!("{:.2}%", report.vocabulary_ratio),
        elapsed_secs = report.elapsed_secs,
        output = %args.output.display(),
        "done"
    );
    Ok(())
}
