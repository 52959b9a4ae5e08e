use std::collections::HashSet;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
}

/// Drops the fragment and trailing path slashes so equivalent URLs share one key.
pub fn canonicalize(url: &Url) -> Url {
    let mut u = url.clone();
    u.set_fragment(None);
    let trimmed = u.path().trim_end_matches('/').to_string();
    if trimmed.len() != u.path().len() {
        u.set_path(&trimmed);
    }
    u
}

/// Depth-first URL stack with a hard cap on everything it has ever accepted.
///
/// Popped URLs stay in `seen`, so pending + visited never exceeds `max_urls`
/// and a URL is handed out at most once.
#[derive(Debug)]
pub struct Frontier {
    stack: Vec<FrontierEntry>,
    seen: HashSet<String>,
    max_urls: usize,
}

impl Frontier {
    pub fn new(max_urls: usize) -> Self {
        Self { stack: Vec::new(), seen: HashSet::new(), max_urls }
    }

    /// Returns false when the URL was already seen or the frontier is full.
    pub fn push(&mut self, url: &Url, depth: u32) -> bool {
        if self.seen.len() >= self.max_urls {
            return false;
        }
        let url = canonicalize(url);
        if !self.seen.insert(url.as_str().to_string()) {
            return false;
        }
        self.stack.push(FrontierEntry { url, depth });
        true
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> { self.stack.pop() }

    pub fn pending(&self) -> usize { self.stack.len() }

    /// Pending plus already popped.
    pub fn size(&self) -> usize { self.seen.len() }
}
