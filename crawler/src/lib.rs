//! Depth-first site crawler feeding a TF-IDF inverted index.

pub mod config;
pub mod controller;
pub mod extract;
pub mod fetch;
pub mod frontier;

pub use config::CrawlConfig;
pub use controller::{CrawlReport, CrawlState, Crawler};
pub use fetch::{FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use frontier::{canonicalize, Frontier, FrontierEntry};
