use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use url::Url;
use webdex_core::persist::{load_index, IndexPaths};
use webdex_core::tokenizer::TokenFilter;
use webdex_crawler::{CrawlConfig, CrawlState, Crawler, FetchError, FetchedPage, Fetcher};

/// In-memory site: path -> HTML. Unknown paths fail like a 404.
struct SiteFetcher {
    pages: HashMap<String, String>,
}

impl SiteFetcher {
    fn new(pages: &[(&str, &str)]) -> Self {
        let pages = pages.iter().map(|(p, html)| (p.to_string(), html.to_string())).collect();
        Self { pages }
    }
}

impl Fetcher for SiteFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        match self.pages.get(url.path()) {
            Some(html) => Ok(FetchedPage { url: url.clone(), body: html.as_bytes().to_vec() }),
            None => Err(FetchError::Status(404)),
        }
    }
}

fn page(text: &str, links: &[&str]) -> String {
    let anchors: String = links.iter().map(|l| format!(r#"<a href="{l}">go</a>"#)).collect();
    format!("<html><body><p>{text}</p>{anchors}</body></html>")
}

fn config(out: &std::path::Path) -> CrawlConfig {
    CrawlConfig {
        max_urls: 10,
        max_depth: 5,
        delay: Duration::ZERO,
        output_dir: out.to_path_buf(),
        ..CrawlConfig::default()
    }
}

fn seed() -> Url { Url::parse("http://site.test/").unwrap() }

fn visit_order(crawler: &Crawler<SiteFetcher>) -> Vec<String> {
    crawler
        .index()
        .documents()
        .values()
        .map(|u| Url::parse(u).unwrap().path().to_string())
        .collect()
}

#[tokio::test]
async fn crawls_depth_first() {
    let a = page("alpha", &["/b", "/c"]);
    let b = page("bravo", &["/d"]);
    let c = page("charlie", &[]);
    let d = page("delta", &[]);
    let site = SiteFetcher::new(&[("/", &a), ("/b", &b), ("/c", &c), ("/d", &d)]);
    let dir = tempdir().unwrap();
    let mut crawler = Crawler::new(config(dir.path()), site, TokenFilter::default());

    let report = crawler.crawl(&seed()).await;
    assert_eq!(report.state, CrawlState::Completed);
    // the last link pushed is on top of the stack
    assert_eq!(visit_order(&crawler), ["/", "/c", "/b", "/d"]);
    assert_eq!(crawler.index().documents().keys().copied().collect::<Vec<_>>(), [1, 2, 3, 4]);
}

#[tokio::test]
async fn processed_count_stops_at_budget() {
    let links: Vec<String> = (0..20).map(|i| format!("/p{i}")).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    let root = page("root", &link_refs);
    let leaf = page("leaf", &[]);
    let mut pages = vec![("/".to_string(), root)];
    pages.extend(links.iter().map(|l| (l.clone(), leaf.clone())));
    let pages: Vec<(&str, &str)> = pages.iter().map(|(p, h)| (p.as_str(), h.as_str())).collect();

    let dir = tempdir().unwrap();
    let cfg = CrawlConfig { max_urls: 3, ..config(dir.path()) };
    let mut crawler = Crawler::new(cfg, SiteFetcher::new(&pages), TokenFilter::default());
    let report = crawler.crawl(&seed()).await;

    assert_eq!(report.documents_processed, 3);
    assert_eq!(report.frontier_size, 3);
    assert_eq!(crawler.index().num_docs(), 3);
}

#[tokio::test]
async fn over_depth_entries_are_discarded() {
    let root = page("root", &["/one"]);
    let one = page("one", &["/two"]);
    let two = page("two", &[]);
    let site = SiteFetcher::new(&[("/", &root), ("/one", &one), ("/two", &two)]);
    let dir = tempdir().unwrap();
    let cfg = CrawlConfig { max_depth: 1, ..config(dir.path()) };
    let mut crawler = Crawler::new(cfg, site, TokenFilter::default());
    let report = crawler.crawl(&seed()).await;

    assert_eq!(report.documents_processed, 2);
    assert_eq!(report.depth_skips, 1);
    // the skipped URL still occupies frontier capacity
    assert_eq!(report.frontier_size, 3);
}

#[tokio::test]
async fn fetch_failures_are_skipped() {
    let root = page("root", &["/missing", "/ok"]);
    let ok = page("fine", &[]);
    let site = SiteFetcher::new(&[("/", &root), ("/ok", &ok)]);
    let dir = tempdir().unwrap();
    let mut crawler = Crawler::new(config(dir.path()), site, TokenFilter::default());
    let report = crawler.crawl(&seed()).await;

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.documents_processed, 2);
}

/// Serves pages from `site` and raises `stop` after the first one.
struct StopAfterFirst {
    site: SiteFetcher,
    stop: Arc<AtomicBool>,
}

impl Fetcher for StopAfterFirst {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let page = self.site.fetch(url).await;
        self.stop.store(true, Ordering::SeqCst);
        page
    }
}

#[tokio::test]
async fn interrupt_aborts_but_still_saves() {
    let root = page("spiders crawl graphs", &["/next"]);
    let next = page("never fetched", &[]);
    let stop = Arc::new(AtomicBool::new(false));
    let fetcher = StopAfterFirst {
        site: SiteFetcher::new(&[("/", &root), ("/next", &next)]),
        stop: stop.clone(),
    };
    let dir = tempdir().unwrap();
    let mut crawler = Crawler::new(config(dir.path()), fetcher, TokenFilter::default()).with_stop(stop);

    let report = crawler.run(&seed()).await.unwrap();
    assert_eq!(report.state, CrawlState::Aborted);
    assert_eq!(report.documents_processed, 1);
    assert_eq!(report.frontier_pending, 1);

    let loaded = load_index(&IndexPaths::new(dir.path())).unwrap();
    assert_eq!(loaded.num_docs(), 1);
    assert!(loaded.num_terms() > 0);
    assert_eq!(loaded.num_postings(), loaded.num_terms());
    // a single document makes every idf zero
    assert_eq!(loaded.doc_length(1), Some(1.0));
}

#[tokio::test]
async fn stop_before_first_pop_saves_empty_index() {
    let root = page("root", &[]);
    let site = SiteFetcher::new(&[("/", &root)]);
    let dir = tempdir().unwrap();
    let stop = Arc::new(AtomicBool::new(true));
    let mut crawler = Crawler::new(config(dir.path()), site, TokenFilter::default()).with_stop(stop);

    let report = crawler.run(&seed()).await.unwrap();
    assert_eq!(report.state, CrawlState::Aborted);
    assert_eq!(report.documents_processed, 0);
    assert_eq!(load_index(&IndexPaths::new(dir.path())).unwrap().num_docs(), 0);
}

#[tokio::test]
async fn same_host_only_drops_external_links() {
    let root = page("root", &["/local", "http://other.test/away"]);
    let leaf = page("leaf", &[]);
    let pages = [("/", root.as_str()), ("/local", leaf.as_str()), ("/away", leaf.as_str())];

    let dir = tempdir().unwrap();
    let mut open = Crawler::new(config(dir.path()), SiteFetcher::new(&pages), TokenFilter::default());
    assert_eq!(open.crawl(&seed()).await.documents_processed, 3);

    let cfg = CrawlConfig { same_host_only: true, ..config(dir.path()) };
    let mut scoped = Crawler::new(cfg, SiteFetcher::new(&pages), TokenFilter::default());
    let report = scoped.crawl(&seed()).await;
    assert_eq!(report.documents_processed, 2);
    assert!(scoped.index().documents().values().all(|u| u.starts_with("http://site.test/")));
}

#[tokio::test]
async fn page_without_terms_gets_unit_length() {
    let root = page("crawler graphs", &["/empty"]);
    let empty = page("the and of 42", &[]);
    let site = SiteFetcher::new(&[("/", &root), ("/empty", &empty)]);
    let dir = tempdir().unwrap();
    let mut crawler = Crawler::new(config(dir.path()), site, TokenFilter::default());
    crawler.run(&seed()).await.unwrap();

    let index = crawler.index();
    assert_eq!(index.doc_length(2), Some(1.0));
    // both terms are unique to doc 1: idf = ln(2)
    let expected = (2.0 * 2f64.ln().powi(2)).sqrt();
    assert!((index.doc_length(1).unwrap() - expected).abs() < 1e-12);
}

#[tokio::test]
async fn failed_save_keeps_index_for_retry() {
    let root = page("spiders", &[]);
    let site = SiteFetcher::new(&[("/", &root)]);
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();
    let cfg = config(&blocker.join("index"));
    let mut crawler = Crawler::new(cfg, site, TokenFilter::default());

    assert!(crawler.run(&seed()).await.is_err());
    assert_eq!(crawler.index().num_docs(), 1);
    std::fs::remove_file(&blocker).unwrap();
    crawler.save().unwrap();
    assert_eq!(load_index(&IndexPaths::new(blocker.join("index"))).unwrap().num_docs(), 1);
}
