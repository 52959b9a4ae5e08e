//! Batch TF-IDF scoring.
//!
//! Runs once over the finished postings table: document frequencies are
//! recounted from scratch, so the pass can be repeated after more documents
//! are added without drifting.

use std::collections::BTreeMap;

use crate::index::{DocId, PostingTable};

/// `ln(n / df)`, or 0 when either side is empty.
pub fn idf(n: u32, df: u32) -> f64 {
    if n == 0 || df == 0 {
        return 0.0;
    }
    (n as f64 / df as f64).ln()
}

/// Fills `df`, `idf` and `tf_idf` on every posting for a corpus of `n` documents.
pub fn score_postings(postings: &mut PostingTable, n: u32) {
    if n == 0 {
        return;
    }
    for docs in postings.values_mut() {
        let df = docs.len() as u32;
        let term_idf = idf(n, df);
        for posting in docs.values_mut() {
            posting.df = df;
            posting.idf = term_idf;
            posting.tf_idf = posting.tf as f64 * term_idf;
        }
    }
}

/// Euclidean norm of each document's tf-idf vector, plus how many documents
/// had no weight at all. Those get 1.0 so they stay usable as a cosine
/// denominator.
pub fn document_lengths(
    postings: &PostingTable,
    documents: impl IntoIterator<Item = DocId>,
) -> (BTreeMap<DocId, f64>, usize) {
    let mut sums: BTreeMap<DocId, f64> = documents.into_iter().map(|d| (d, 0.0)).collect();
    for docs in postings.values() {
        for (doc_id, posting) in docs {
            if let Some(sum) = sums.get_mut(doc_id) {
                *sum += posting.tf_idf * posting.tf_idf;
            }
        }
    }
    let mut zero_mass = 0;
    let lengths = sums
        .into_iter()
        .map(|(doc_id, sum)| {
            if sum > 0.0 {
                (doc_id, sum.sqrt())
            } else {
                zero_mass += 1;
                (doc_id, 1.0)
            }
        })
        .collect();
    (lengths, zero_mass)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub num_docs: u32,
    pub num_terms: usize,
    /// Documents whose tf-idf vector was all zeros.
    pub unit_length_docs: usize,
}

impl ScoreSummary {
    pub(crate) fn new(num_docs: u32, num_terms: usize, unit_length_docs: usize) -> Self {
        tracing::debug!(num_docs, num_terms, unit_length_docs, "scored index");
        Self { num_docs, num_terms, unit_length_docs }
    }
}
