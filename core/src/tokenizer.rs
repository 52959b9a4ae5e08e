use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::Algorithm;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

use crate::error::{IndexError, Result};

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{Alphabetic}\p{N}]+").expect("valid regex");
    static ref DEFAULT_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","an","the",
            "and","or","but","nor","so","yet","for",
            "about","above","across","after","against","along","among","around","at",
            "before","behind","below","beneath","beside","between","beyond","by",
            "down","during","except","from","in","inside","into","like","near","of","off","on","onto",
            "out","outside","over","past","since","through","throughout","till","to","toward","under",
            "underneath","until","up","upon","with","within","without",
            "i","me","my","mine","myself","you","your","yours","yourself","yourselves",
            "he","him","his","himself","she","her","hers","herself","it","its","itself",
            "we","us","our","ours","ourselves","they","them","their","theirs","themselves",
            "am","is","are","was","were","be","been","being","have","has","had","having",
            "do","does","did","doing","will","would","shall","should","can","could","may","might","must",
            "very","too","quite","rather","somewhat","almost","just","only","really","even","ever",
            "never","always","often","sometimes","usually","well","better","best","bad","worse","worst",
            "all","any","both","each","every","few","many","more","most","much","several","some","such",
            "no","none","other","same","different","new","old","good","great","high","small","large",
            "big","long","little","young","important","early","late",
            "aren't","can't","couldn't","didn't","doesn't","don't","hadn't","hasn't","haven't","isn't",
            "mightn't","mustn't","needn't","shan't","shouldn't","wasn't","weren't","won't","wouldn't",
            "also","however","therefore","thus","hence","consequently","furthermore","moreover",
            "nevertheless","nonetheless","otherwise","similarly","accordingly","besides","else",
            "instead","likewise","meanwhile","namely","next","now","still","then","thereafter","undoubtedly",
            "click","here","home","page","website","web","site","link","menu","navigation","footer",
            "header","sidebar","content","copyright","privacy","policy","terms","conditions","contact",
            "services","products","blog","news","read","view","download","subscribe","sign",
            "login","logout","register","account","profile","settings",
            "today","tomorrow","yesterday","when","while","soon","later",
            "there","where","everywhere","anywhere","somewhere",
            "what","which","who","whom","whose","why","how",
            "this","that","these","those",
            "one","two","three","four","five","six","seven","eight","nine","ten",
            "first","second","third","fourth","fifth","last","previous",
            "com","www","http","https","html","htm","php","asp","jsp","index","default","main","homepage",
        ];
        words.iter().copied().collect()
    };
}

/// Reduces a normalized token to its root form. `None` signals failure and the
/// caller keeps the unstemmed token.
pub trait Stemmer: Send + Sync {
    fn stem(&self, token: &str) -> Option<String>;
}

/// Snowball English (Porter2) stemmer.
pub struct PorterStemmer {
    inner: rust_stemmers::Stemmer,
}

impl PorterStemmer {
    pub fn new() -> Self {
        Self { inner: rust_stemmers::Stemmer::create(Algorithm::English) }
    }
}

impl Default for PorterStemmer {
    fn default() -> Self { Self::new() }
}

impl Stemmer for PorterStemmer {
    fn stem(&self, token: &str) -> Option<String> {
        let stem = self.inner.stem(token);
        if stem.is_empty() { None } else { Some(stem.into_owned()) }
    }
}

/// Leaves tokens untouched.
pub struct IdentityStemmer;

impl Stemmer for IdentityStemmer {
    fn stem(&self, token: &str) -> Option<String> { Some(token.to_string()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StemmerKind {
    #[default]
    Porter,
    Identity,
}

impl StemmerKind {
    pub fn build(self) -> Box<dyn Stemmer> {
        match self {
            StemmerKind::Porter => Box::new(PorterStemmer::new()),
            StemmerKind::Identity => Box::new(IdentityStemmer),
        }
    }
}

pub trait StopWordSet: Send + Sync {
    fn contains(&self, token: &str) -> bool;
}

/// Built-in English and web-boilerplate stop words, optionally extended from a file.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    extra: HashSet<String>,
}

impl StopWords {
    pub fn new() -> Self { Self::default() }

    /// Adds one word per line from `path`; blank lines are ignored.
    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize> {
        let text = fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
        let before = self.extra.len();
        for line in text.lines() {
            let word = line.trim().to_lowercase();
            if !word.is_empty() && !DEFAULT_STOPWORDS.contains(word.as_str()) {
                self.extra.insert(word);
            }
        }
        Ok(self.extra.len() - before)
    }

    pub fn len(&self) -> usize { DEFAULT_STOPWORDS.len() + self.extra.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl StopWordSet for StopWords {
    fn contains(&self, token: &str) -> bool {
        DEFAULT_STOPWORDS.contains(token) || self.extra.contains(token)
    }
}

/// Why a candidate token was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    StopWord,
    Punctuation,
    Short,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    Kept { stem: String, fallback: bool },
    Rejected(Rejection),
}

/// Per-filter counters. Additive across documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub tokens: u64,
    pub stop_words: u64,
    pub punctuation: u64,
    pub short_words: u64,
    pub numbers: u64,
    pub stem_fallbacks: u64,
    pub kept: u64,
}

impl FilterStats {
    pub fn merge(&mut self, other: &FilterStats) {
        self.tokens += other.tokens;
        self.stop_words += other.stop_words;
        self.punctuation += other.punctuation;
        self.short_words += other.short_words;
        self.numbers += other.numbers;
        self.stem_fallbacks += other.stem_fallbacks;
        self.kept += other.kept;
    }

    fn record(&mut self, outcome: &TokenOutcome) {
        match outcome {
            TokenOutcome::Rejected(Rejection::Empty) => return,
            TokenOutcome::Rejected(Rejection::StopWord) => self.stop_words += 1,
            TokenOutcome::Rejected(Rejection::Punctuation) => self.punctuation += 1,
            TokenOutcome::Rejected(Rejection::Short) => self.short_words += 1,
            TokenOutcome::Rejected(Rejection::Number) => self.numbers += 1,
            TokenOutcome::Kept { fallback, .. } => {
                self.kept += 1;
                if *fallback { self.stem_fallbacks += 1; }
            }
        }
        self.tokens += 1;
    }
}

/// Stem frequencies for one document, in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermCounts {
    order: Vec<(String, u32)>,
    slots: HashMap<String, usize>,
}

impl TermCounts {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, stem: String) {
        match self.slots.get(&stem) {
            Some(&i) => self.order[i].1 += 1,
            None => {
                self.slots.insert(stem.clone(), self.order.len());
                self.order.push((stem, 1));
            }
        }
    }

    pub fn get(&self, stem: &str) -> Option<u32> {
        self.slots.get(stem).map(|&i| self.order[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.order.iter().map(|(s, n)| (s.as_str(), *n))
    }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }
}

#[derive(Debug, Clone, Default)]
pub struct FilteredDocument {
    pub terms: TermCounts,
    pub stats: FilterStats,
}

/// Turns raw document text into stemmed term frequencies.
pub struct TokenFilter {
    stemmer: Box<dyn Stemmer>,
    stop_words: Box<dyn StopWordSet>,
}

impl TokenFilter {
    pub fn new(stemmer: Box<dyn Stemmer>, stop_words: Box<dyn StopWordSet>) -> Self {
        Self { stemmer, stop_words }
    }

    pub fn with_kind(kind: StemmerKind, stop_words: StopWords) -> Self {
        Self::new(kind.build(), Box::new(stop_words))
    }

    /// Runs one candidate token through the filters. Stop words are checked
    /// before every other filter, and stemming only runs on survivors.
    pub fn classify(&self, raw: &str) -> TokenOutcome {
        let token = raw.trim().to_lowercase();
        if token.is_empty() {
            return TokenOutcome::Rejected(Rejection::Empty);
        }
        if self.stop_words.contains(&token) {
            return TokenOutcome::Rejected(Rejection::StopWord);
        }
        if token.chars().next().is_some_and(|c| c.is_ascii_punctuation()) {
            return TokenOutcome::Rejected(Rejection::Punctuation);
        }
        if token.chars().count() <= 2 {
            return TokenOutcome::Rejected(Rejection::Short);
        }
        if is_number(&token) {
            return TokenOutcome::Rejected(Rejection::Number);
        }
        match self.stemmer.stem(&token) {
            Some(stem) => TokenOutcome::Kept { stem, fallback: false },
            None => TokenOutcome::Kept { stem: token, fallback: true },
        }
    }

    pub fn filter(&self, text: &str) -> FilteredDocument {
        let normalized = text.nfkc().collect::<String>();
        let mut doc = FilteredDocument::default();
        for mat in RE.find_iter(&normalized) {
            let outcome = self.classify(mat.as_str());
            doc.stats.record(&outcome);
            if let TokenOutcome::Kept { stem, .. } = outcome {
                doc.terms.add(stem);
            }
        }
        doc
    }
}

impl Default for TokenFilter {
    fn default() -> Self { Self::with_kind(StemmerKind::Porter, StopWords::new()) }
}

fn is_number(token: &str) -> bool {
    token.parse::<i64>().is_ok() || token.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStemmer;

    impl Stemmer for FailingStemmer {
        fn stem(&self, _token: &str) -> Option<String> { None }
    }

    #[test]
    fn basic_filter() {
        let doc = TokenFilter::default().filter("Running, runner's run!");
        assert!(doc.terms.get("run").is_some());
    }

    #[test]
    fn stop_word_checked_before_length() {
        let filter = TokenFilter::default();
        assert_eq!(filter.classify("a"), TokenOutcome::Rejected(Rejection::StopWord));
        assert_eq!(filter.classify("zq"), TokenOutcome::Rejected(Rejection::Short));
    }

    #[test]
    fn stemmer_failure_keeps_normalized_token() {
        let filter = TokenFilter::new(Box::new(FailingStemmer), Box::new(StopWords::new()));
        assert_eq!(
            filter.classify("  Crawling "),
            TokenOutcome::Kept { stem: "crawling".into(), fallback: true }
        );
        let doc = filter.filter("Crawling crawling");
        assert_eq!(doc.terms.get("crawling"), Some(2));
        assert_eq!(doc.stats.stem_fallbacks, 2);
    }

    #[test]
    fn punctuation_led_token_rejected() {
        let filter = TokenFilter::default();
        assert_eq!(filter.classify("'quoted"), TokenOutcome::Rejected(Rejection::Punctuation));
    }
}
