//! Text and link extraction from fetched HTML.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Node, Selector};
use url::Url;

const SKIPPED_TAGS: &[&str] = &["script", "style", "head", "noscript", "template", "meta", "link"];

const SKIPPED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff",
    ".mp3", ".mp4", ".avi", ".mov", ".wmv",
    ".zip", ".tar", ".gz", ".rar", ".7z",
    ".exe", ".dmg", ".msi", ".iso",
    ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
];

lazy_static! {
    static ref SEL_A: Selector = Selector::parse("a[href]").expect("valid selector");
    static ref RE_SCRIPT: Regex = Regex::new(r"(?is)<script.*?</script>").expect("valid regex");
    static ref RE_STYLE: Regex = Regex::new(r"(?is)<style.*?</style>").expect("valid regex");
    static ref RE_HEAD: Regex = Regex::new(r"(?is)<head.*?</head>").expect("valid regex");
    static ref RE_TAG: Regex = Regex::new(r"(?s)<[^>]+>").expect("valid regex");
    static ref RE_SPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Visible text of an HTML page. Falls back to tag stripping when the DOM
/// walk yields nothing.
pub fn extract_text(html: &str) -> String {
    match dom_text(html) {
        Some(text) => text,
        None => fallback_text(html),
    }
}

fn dom_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();
    for node in doc.root_element().descendants() {
        let Node::Text(text) = node.value() else { continue };
        let hidden = node.ancestors().any(|a| {
            a.value().as_element().is_some_and(|el| SKIPPED_TAGS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let t = text.trim();
        if !t.is_empty() {
            parts.push(t);
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(collapse_whitespace(&parts.join(" ")))
}

fn fallback_text(html: &str) -> String {
    let s = RE_SCRIPT.replace_all(html, " ");
    let s = RE_STYLE.replace_all(&s, " ");
    let s = RE_HEAD.replace_all(&s, " ");
    let s = RE_TAG.replace_all(&s, " ");
    let s = s
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    collapse_whitespace(&s)
}

fn collapse_whitespace(s: &str) -> String {
    RE_SPACE.replace_all(s, " ").trim().to_string()
}

/// Absolute, crawlable links of a page, in document order.
pub fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let mut links = Vec::new();
    for a in doc.select(&SEL_A) {
        let Some(href) = a.value().attr("href") else { continue };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let Ok(url) = base.join(href) else { continue };
        if is_crawlable(&url) {
            links.push(url);
        }
    }
    links
}

/// HTTP(S) and not a known binary file type.
pub fn is_crawlable(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let path = url.path().to_ascii_lowercase();
    !SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
