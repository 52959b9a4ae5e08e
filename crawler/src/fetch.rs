use std::future::Future;

use reqwest::{header, Client, Url};
use thiserror::Error;

use crate::config::CrawlConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("not HTML: {0}")]
    NotHtml(String),

    #[error("body of {size} bytes exceeds limit of {limit}")]
    TooLarge { size: usize, limit: usize },
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects; relative links resolve against it.
    pub url: Url,
    pub body: Vec<u8>,
}

/// Retrieves one page. Errors are never fatal to a crawl.
pub trait Fetcher {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, max_body_bytes: config.max_body_bytes })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let resp = self.client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
            let ct = ct.to_str().unwrap_or_default();
            if !is_html(ct) {
                return Err(FetchError::NotHtml(ct.to_string()));
            }
        }
        if let Some(len) = resp.content_length() {
            if len as usize > self.max_body_bytes {
                return Err(FetchError::TooLarge { size: len as usize, limit: self.max_body_bytes });
            }
        }
        let final_url = resp.url().clone();
        let bytes = resp.bytes().await?;
        if bytes.len() > self.max_body_bytes {
            return Err(FetchError::TooLarge { size: bytes.len(), limit: self.max_body_bytes });
        }
        Ok(FetchedPage { url: final_url, body: bytes.to_vec() })
    }
}

/// Media types are case-insensitive; parameters such as `charset` are ignored.
fn is_html(content_type: &str) -> bool {
    content_type.trim_start().to_ascii_lowercase().starts_with("text/html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_content_type_ignores_case_and_parameters() {
        assert!(is_html("text/html"));
        assert!(is_html("Text/HTML; charset=UTF-8"));
        assert!(is_html(" TEXT/html"));
        assert!(!is_html("application/json"));
        assert!(!is_html("text/plain"));
        assert!(!is_html(""));
    }
}
