use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "webdex-crawler/0.1 (+https://example.com/bot)";

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Cap on URLs the frontier accepts and on documents processed.
    pub max_urls: usize,
    /// Entries deeper than this are popped and discarded.
    pub max_depth: u32,
    pub timeout: Duration,
    /// Pause between successive fetches.
    pub delay: Duration,
    pub max_body_bytes: usize,
    pub user_agent: String,
    /// Only follow links on the same host as the page they were found on.
    pub same_host_only: bool,
    pub output_dir: PathBuf,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_urls: 500,
            max_depth: 10,
            timeout: Duration::from_secs(10),
            delay: Duration::from_millis(100),
            max_body_bytes: 2 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            same_host_only: false,
            output_dir: PathBuf::from("./web_index"),
        }
    }
}
