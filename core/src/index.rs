use std::collections::{BTreeMap, HashMap};

use crate::error::{IndexError, Result};
use crate::scoring::{self, ScoreSummary};
use crate::tokenizer::TermCounts;

pub type TermId = u32;
pub type DocId = u32;

/// One (term, document) cell. `idf`, `tf_idf` and `df` are zero until scored.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Posting {
    pub tf: u32,
    pub idf: f64,
    pub tf_idf: f64,
    pub df: u32,
}

impl Posting {
    pub fn raw(tf: u32) -> Self {
        Self { tf, ..Self::default() }
    }
}

/// term_id -> doc_id -> posting
pub type PostingTable = BTreeMap<TermId, BTreeMap<DocId, Posting>>;

/// Document and term tables, postings and document lengths for one crawl.
///
/// Ids start at 1 and are never reused. The builder does not dedupe URLs:
/// adding the same URL twice yields two documents.
#[derive(Debug, Clone)]
pub struct InvertedIndex {
    documents: BTreeMap<DocId, String>,
    dictionary: HashMap<String, TermId>,
    terms: BTreeMap<TermId, String>,
    postings: PostingTable,
    doc_lengths: BTreeMap<DocId, f64>,
    next_doc_id: DocId,
    next_term_id: TermId,
}

impl Default for InvertedIndex {
    fn default() -> Self { Self::new() }
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self {
            documents: BTreeMap::new(),
            dictionary: HashMap::new(),
            terms: BTreeMap::new(),
            postings: BTreeMap::new(),
            doc_lengths: BTreeMap::new(),
            next_doc_id: 1,
            next_term_id: 1,
        }
    }

    /// Rebuilds an index from persisted tables. Every posting and length must
    /// reference a known document/term and each term may appear under one id
    /// only; counters resume at `max + 1`.
    pub fn from_tables(
        documents: BTreeMap<DocId, String>,
        terms: BTreeMap<TermId, String>,
        postings: PostingTable,
        doc_lengths: BTreeMap<DocId, f64>,
    ) -> Result<Self> {
        for (term_id, docs) in &postings {
            if !terms.contains_key(term_id) {
                return Err(IndexError::UnknownTerm { file: "postings.dat", term_id: *term_id });
            }
            if let Some(doc_id) = docs.keys().find(|d| !documents.contains_key(d)) {
                return Err(IndexError::UnknownDocument { file: "postings.dat", doc_id: *doc_id });
            }
        }
        if let Some(doc_id) = doc_lengths.keys().find(|d| !documents.contains_key(d)) {
            return Err(IndexError::UnknownDocument { file: "doc_lengths.dat", doc_id: *doc_id });
        }
        let mut dictionary = HashMap::with_capacity(terms.len());
        for (term_id, term) in &terms {
            if dictionary.insert(term.clone(), *term_id).is_some() {
                return Err(IndexError::DuplicateTerm(term.clone()));
            }
        }
        let next_doc_id = documents.keys().next_back().map_or(1, |id| id + 1);
        let next_term_id = terms.keys().next_back().map_or(1, |id| id + 1);
        Ok(Self { documents, dictionary, terms, postings, doc_lengths, next_doc_id, next_term_id })
    }

    pub fn add_document(&mut self, url: impl Into<String>) -> DocId {
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;
        self.documents.insert(doc_id, url.into());
        doc_id
    }

    /// Upserts the posting for `(stem, doc_id)`. A second call for the same
    /// pair overwrites `tf`; callers aggregate per document first.
    pub fn record_term(&mut self, doc_id: DocId, stem: &str, tf: u32) -> Result<TermId> {
        if !self.documents.contains_key(&doc_id) {
            return Err(IndexError::UnregisteredDocument(doc_id));
        }
        Ok(self.upsert(doc_id, stem, tf))
    }

    /// Registers `url` and records every stem in `counts` against it.
    pub fn index_document(&mut self, url: impl Into<String>, counts: &TermCounts) -> DocId {
        let doc_id = self.add_document(url);
        for (stem, tf) in counts.iter() {
            self.upsert(doc_id, stem, tf);
        }
        doc_id
    }

    /// `doc_id` must already be registered.
    fn upsert(&mut self, doc_id: DocId, stem: &str, tf: u32) -> TermId {
        let term_id = self.intern(stem);
        self.postings.entry(term_id).or_default().insert(doc_id, Posting::raw(tf));
        term_id
    }

    fn intern(&mut self, stem: &str) -> TermId {
        if let Some(&id) = self.dictionary.get(stem) {
            return id;
        }
        let id = self.next_term_id;
        self.next_term_id += 1;
        self.dictionary.insert(stem.to_string(), id);
        self.terms.insert(id, stem.to_string());
        id
    }

    /// Recomputes df, idf, tf-idf and document lengths over the whole index.
    pub fn score(&mut self) -> ScoreSummary {
        let n = self.documents.len() as u32;
        scoring::score_postings(&mut self.postings, n);
        let (lengths, zero_mass) = scoring::document_lengths(&self.postings, self.documents.keys().copied());
        self.doc_lengths = lengths;
        ScoreSummary::new(n, self.terms.len(), zero_mass)
    }

    pub fn documents(&self) -> &BTreeMap<DocId, String> { &self.documents }

    pub fn terms(&self) -> &BTreeMap<TermId, String> { &self.terms }

    pub fn postings(&self) -> &PostingTable { &self.postings }

    pub fn doc_lengths(&self) -> &BTreeMap<DocId, f64> { &self.doc_lengths }

    pub fn term_id(&self, stem: &str) -> Option<TermId> { self.dictionary.get(stem).copied() }

    pub fn posting(&self, term_id: TermId, doc_id: DocId) -> Option<&Posting> {
        self.postings.get(&term_id)?.get(&doc_id)
    }

    pub fn doc_length(&self, doc_id: DocId) -> Option<f64> { self.doc_lengths.get(&doc_id).copied() }

    pub fn num_docs(&self) -> usize { self.documents.len() }

    pub fn num_terms(&self) -> usize { self.terms.len() }

    pub fn num_postings(&self) -> usize { self.postings.values().map(|d| d.len()).sum() }

    pub fn next_doc_id(&self) -> DocId { self.next_doc_id }

    pub fn next_term_id(&self) -> TermId { self.next_term_id }
}
