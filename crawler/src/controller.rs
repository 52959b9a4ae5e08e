//! Sequential depth-first crawl loop.
//!
//! One URL at a time: pop, depth check, fetch, extract, filter, index, push
//! links. Scoring and persistence run once the loop stops, whether it ran out
//! of URLs, hit the budget, or was interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::time::sleep;
use url::Url;
use webdex_core::persist::{save_index, IndexPaths};
use webdex_core::scoring::ScoreSummary;
use webdex_core::tokenizer::{FilterStats, TokenFilter};
use webdex_core::{IndexError, InvertedIndex};

use crate::config::CrawlConfig;
use crate::extract::{extract_links, extract_text};
use crate::fetch::Fetcher;
use crate::frontier::Frontier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlState {
    Ready,
    Crawling,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub state: CrawlState,
    pub started_at: String,
    pub finished_at: String,
    pub elapsed_secs: f64,
    pub documents_processed: usize,
    pub fetch_failures: usize,
    pub depth_skips: usize,
    pub frontier_pending: usize,
    pub frontier_size: usize,
    pub unique_terms: usize,
    pub filter: FilterStats,
    /// Unique terms as a percentage of all tokens seen.
    pub vocabulary_ratio: f64,
}

pub struct Crawler<F> {
    config: CrawlConfig,
    fetcher: F,
    filter: TokenFilter,
    frontier: Frontier,
    index: InvertedIndex,
    state: CrawlState,
    stop: Arc<AtomicBool>,
    processed: usize,
    fetch_failures: usize,
    depth_skips: usize,
    filter_stats: FilterStats,
}

impl<F: Fetcher> Crawler<F> {
    pub fn new(config: CrawlConfig, fetcher: F, filter: TokenFilter) -> Self {
        let frontier = Frontier::new(config.max_urls);
        Self {
            config,
            fetcher,
            filter,
            frontier,
            index: InvertedIndex::new(),
            state: CrawlState::Ready,
            stop: Arc::new(AtomicBool::new(false)),
            processed: 0,
            fetch_failures: 0,
            depth_skips: 0,
            filter_stats: FilterStats::default(),
        }
    }

    /// Shares `stop` with the crawl loop. Setting it ends the crawl at the
    /// top of the next iteration.
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    /// Crawls, scores and saves to the configured output directory. If the
    /// save fails the index is kept and [`Crawler::save`] can be retried.
    pub async fn run(&mut self, seed: &Url) -> Result<CrawlReport, IndexError> {
        let report = self.crawl(seed).await;
        let summary = self.score();
        tracing::info!(
            documents = summary.num_docs,
            terms = summary.num_terms,
            unit_length_docs = summary.unit_length_docs,
            "scoring complete"
        );
        if let Err(e) = self.save() {
            tracing::error!(error = %e, "failed to save index");
            return Err(e);
        }
        Ok(report)
    }

    pub async fn crawl(&mut self, seed: &Url) -> CrawlReport {
        let started_at = now_rfc3339();
        let start = Instant::now();
        if self.state != CrawlState::Ready {
            tracing::warn!(state = ?self.state, "crawl already ran");
            return self.report(started_at, start);
        }
        self.state = CrawlState::Crawling;
        self.frontier.push(seed, 0);
        tracing::info!(
            seed = %seed,
            max_urls = self.config.max_urls,
            max_depth = self.config.max_depth,
            "crawl started"
        );

        let mut fetched_once = false;
        loop {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!("crawl interrupted");
                self.state = CrawlState::Aborted;
                break;
            }
            if self.processed >= self.config.max_urls {
                tracing::info!(max_urls = self.config.max_urls, "reached url budget");
                self.state = CrawlState::Completed;
                break;
            }
            let Some(entry) = self.frontier.pop() else {
                self.state = CrawlState::Completed;
                break;
            };
            if entry.depth > self.config.max_depth {
                tracing::debug!(url = %entry.url, depth = entry.depth, "skipping, exceeded max depth");
                self.depth_skips += 1;
                continue;
            }

            if fetched_once && !self.config.delay.is_zero() {
                sleep(self.config.delay).await;
            }
            fetched_once = true;

            tracing::debug!(url = %entry.url, depth = entry.depth, n = self.processed + 1, "fetching");
            let page = match self.fetcher.fetch(&entry.url).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(url = %entry.url, error = %e, "fetch failed");
                    self.fetch_failures += 1;
                    continue;
                }
            };

            let html = String::from_utf8_lossy(&page.body);
            let doc = self.filter.filter(&extract_text(&html));
            self.filter_stats.merge(&doc.stats);
            let doc_id = self.index.index_document(entry.url.as_str(), &doc.terms);
            tracing::debug!(doc_id, url = %entry.url, terms = doc.terms.len(), "indexed");

            for link in extract_links(&html, &page.url) {
                if self.config.same_host_only && link.host_str() != page.url.host_str() {
                    continue;
                }
                self.frontier.push(&link, entry.depth + 1);
            }

            self.processed += 1;
            if self.processed % 10 == 0 {
                tracing::info!(
                    processed = self.processed,
                    pending = self.frontier.pending(),
                    visited = self.frontier.size(),
                    "progress"
                );
            }
        }

        let report = self.report(started_at, start);
        tracing::info!(
            state = ?report.state,
            documents = report.documents_processed,
            fetch_failures = report.fetch_failures,
            depth_skips = report.depth_skips,
            unique_terms = report.unique_terms,
            "crawl finished"
        );
        report
    }

    pub fn score(&mut self) -> ScoreSummary { self.index.score() }

    pub fn save(&self) -> Result<(), IndexError> {
        save_index(&IndexPaths::new(&self.config.output_dir), &self.index)
    }

    fn report(&self, started_at: String, start: Instant) -> CrawlReport {
        let unique_terms = self.index.num_terms();
        let vocabulary_ratio = if self.filter_stats.tokens > 0 {
            unique_terms as f64 / self.filter_stats.tokens as f64 * 100.0
        } else {
            0.0
        };
        CrawlReport {
            state: self.state,
            started_at,
            finished_at: now_rfc3339(),
            elapsed_secs: start.elapsed().as_secs_f64(),
            documents_processed: self.processed,
            fetch_failures: self.fetch_failures,
            depth_skips: self.depth_skips,
            frontier_pending: self.frontier.pending(),
            frontier_size: self.frontier.size(),
            unique_terms,
            filter: self.filter_stats,
            vocabulary_ratio,
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}
