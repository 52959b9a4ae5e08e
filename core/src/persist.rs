//! Plain-text index tables.
//!
//! | file            | row                                   |
//! |-----------------|---------------------------------------|
//! | documents.dat   | `url,doc_id`                          |
//! | terms.dat       | `term,term_id`                        |
//! | postings.dat    | `term_id,doc_id,tf_idf,tf,idf,df`     |
//! | doc_lengths.dat | `doc_id,length`                       |
//!
//! Rows are written in ascending id order and floats with six decimals, so
//! saving a freshly loaded index reproduces the files byte for byte.

use std::collections::{BTreeMap, HashSet};
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{IndexError, Result};
use crate::index::{DocId, InvertedIndex, Posting, PostingTable, TermId};

const DOCUMENTS: &str = "documents.dat";
const TERMS: &str = "terms.dat";
const POSTINGS: &str = "postings.dat";
const DOC_LENGTHS: &str = "doc_lengths.dat";

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn documents(&self) -> PathBuf { self.root.join(DOCUMENTS) }
    pub fn terms(&self) -> PathBuf { self.root.join(TERMS) }
    pub fn postings(&self) -> PathBuf { self.root.join(POSTINGS) }
    pub fn doc_lengths(&self) -> PathBuf { self.root.join(DOC_LENGTHS) }

    /// True when all four tables are present.
    pub fn exists(&self) -> bool {
        [self.documents(), self.terms(), self.postings(), self.doc_lengths()]
            .iter()
            .all(|p| p.is_file())
    }
}

pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root).map_err(|e| IndexError::io(&paths.root, e))?;
    write_table(&paths.documents(), |w| write_documents(w, index.documents()))?;
    write_table(&paths.terms(), |w| write_terms(w, index.terms()))?;
    write_table(&paths.postings(), |w| write_postings(w, index.postings()))?;
    write_table(&paths.doc_lengths(), |w| write_doc_lengths(w, index.doc_lengths()))?;
    tracing::info!(
        root = %paths.root.display(),
        documents = index.num_docs(),
        terms = index.num_terms(),
        postings = index.num_postings(),
        "index saved"
    );
    Ok(())
}

/// Reads all four tables. Nothing is returned unless every row parses, no id
/// or key repeats, and every reference resolves.
pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let mut documents = BTreeMap::new();
    for (line, (url, doc_id)) in read_table(&paths.documents(), DOCUMENTS, parse_document)? {
        if documents.insert(doc_id, url).is_some() {
            return Err(IndexError::corrupt(DOCUMENTS, line, format!("duplicate doc_id {doc_id}")));
        }
    }

    let mut terms = BTreeMap::new();
    let mut surface_forms = HashSet::new();
    for (line, (term, term_id)) in read_table(&paths.terms(), TERMS, parse_term)? {
        if !surface_forms.insert(term.clone()) {
            return Err(IndexError::corrupt(TERMS, line, format!("duplicate term {term:?}")));
        }
        if terms.insert(term_id, term).is_some() {
            return Err(IndexError::corrupt(TERMS, line, format!("duplicate term_id {term_id}")));
        }
    }

    let mut postings = PostingTable::new();
    for (line, (term_id, doc_id, posting)) in read_table(&paths.postings(), POSTINGS, parse_posting)? {
        if postings.entry(term_id).or_default().insert(doc_id, posting).is_some() {
            return Err(IndexError::corrupt(
                POSTINGS,
                line,
                format!("duplicate posting for term {term_id} in doc {doc_id}"),
            ));
        }
    }

    let mut doc_lengths = BTreeMap::new();
    for (line, (doc_id, length)) in read_table(&paths.doc_lengths(), DOC_LENGTHS, parse_doc_length)? {
        if doc_lengths.insert(doc_id, length).is_some() {
            return Err(IndexError::corrupt(DOC_LENGTHS, line, format!("duplicate doc_id {doc_id}")));
        }
    }

    let index = InvertedIndex::from_tables(documents, terms, postings, doc_lengths)?;
    tracing::info!(
        root = %paths.root.display(),
        documents = index.num_docs(),
        terms = index.num_terms(),
        "index loaded"
    );
    Ok(index)
}

pub fn write_documents<W: Write>(w: &mut W, documents: &BTreeMap<DocId, String>) -> std::io::Result<()> {
    for (doc_id, url) in documents {
        writeln!(w, "{url},{doc_id}")?;
    }
    Ok(())
}

pub fn write_terms<W: Write>(w: &mut W, terms: &BTreeMap<TermId, String>) -> std::io::Result<()> {
    for (term_id, term) in terms {
        writeln!(w, "{term},{term_id}")?;
    }
    Ok(())
}

pub fn write_postings<W: Write>(w: &mut W, postings: &PostingTable) -> std::io::Result<()> {
    for (term_id, docs) in postings {
        for (doc_id, p) in docs {
            writeln!(w, "{term_id},{doc_id},{:.6},{},{:.6},{}", p.tf_idf, p.tf, p.idf, p.df)?;
        }
    }
    Ok(())
}

pub fn write_doc_lengths<W: Write>(w: &mut W, lengths: &BTreeMap<DocId, f64>) -> std::io::Result<()> {
    for (doc_id, length) in lengths {
        writeln!(w, "{doc_id},{length:.6}")?;
    }
    Ok(())
}

fn write_table<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let f = File::create(path).map_err(|e| IndexError::io(path, e))?;
    let mut w = BufWriter::new(f);
    body(&mut w)
        .and_then(|_| w.flush())
        .map_err(|e| IndexError::io(path, e))
}

/// Parsed rows paired with their 1-based line numbers.
fn read_table<T, F>(path: &Path, file: &'static str, parse: F) -> Result<Vec<(usize, T)>>
where
    F: Fn(&str) -> std::result::Result<T, String>,
{
    let f = File::open(path).map_err(|e| IndexError::io(path, e))?;
    let mut rows = Vec::new();
    for (i, line) in BufReader::new(f).lines().enumerate() {
        let line = line.map_err(|e| IndexError::io(path, e))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let row = parse(line).map_err(|reason| IndexError::corrupt(file, i + 1, reason))?;
        rows.push((i + 1, row));
    }
    Ok(rows)
}

fn parse_document(line: &str) -> std::result::Result<(String, DocId), String> {
    // URLs may contain commas; the id is always after the last one.
    let (url, id) = line.rsplit_once(',').ok_or("expected `url,doc_id`")?;
    Ok((url.to_string(), parse_id(id)?))
}

fn parse_term(line: &str) -> std::result::Result<(String, TermId), String> {
    let (term, id) = line.rsplit_once(',').ok_or("expected `term,term_id`")?;
    if term.is_empty() {
        return Err("empty term".into());
    }
    Ok((term.to_string(), parse_id(id)?))
}

fn parse_posting(line: &str) -> std::result::Result<(TermId, DocId, Posting), String> {
    let fields: Vec<&str> = line.split(',').collect();
    let [term_id, doc_id, tf_idf, tf, idf, df] = fields[..] else {
        return Err(format!("expected 6 fields, found {}", fields.len()));
    };
    let posting = Posting {
        tf: parse_field(tf, "tf")?,
        idf: parse_float(idf, "idf")?,
        tf_idf: parse_float(tf_idf, "tf_idf")?,
        df: parse_field(df, "df")?,
    };
    Ok((parse_id(term_id)?, parse_id(doc_id)?, posting))
}

fn parse_doc_length(line: &str) -> std::result::Result<(DocId, f64), String> {
    let (id, length) = line.split_once(',').ok_or("expected `doc_id,length`")?;
    let length = parse_float(length, "length")?;
    if length < 0.0 {
        return Err(format!("negative length {length}"));
    }
    Ok((parse_id(id)?, length))
}

fn parse_id(s: &str) -> std::result::Result<u32, String> {
    match s.trim().parse::<u32>() {
        Ok(0) => Err("ids start at 1".into()),
        Ok(id) => Ok(id),
        Err(e) => Err(format!("bad id {s:?}: {e}")),
    }
}

fn parse_field<T: FromStr>(s: &str, name: &str) -> std::result::Result<T, String>
where
    T::Err: std::fmt::Display,
{
    s.trim().parse().map_err(|e| format!("bad {name} {s:?}: {e}"))
}

fn parse_float(s: &str, name: &str) -> std::result::Result<f64, String> {
    let v: f64 = parse_field(s, name)?;
    if v.is_finite() { Ok(v) } else { Err(format!("non-finite {name} {s:?}")) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_url_may_contain_commas() {
        let (url, id) = parse_document("http://example.com/a,b?c=1,2,17").unwrap();
        assert_eq!(url, "http://example.com/a,b?c=1,2");
        assert_eq!(id, 17);
    }

    #[test]
    fn posting_row_field_order() {
        let (t, d, p) = parse_posting("3,5,1.386294,2,0.693147,2").unwrap();
        assert_eq!((t, d, p.tf, p.df), (3, 5, 2, 2));
        assert!((p.tf_idf - 1.386294).abs() < 1e-9);
        assert!((p.idf - 0.693147).abs() < 1e-9);
    }

    #[test]
    fn short_posting_row_is_corrupt() {
        assert!(parse_posting("3,5,1.0,2").is_err());
        assert!(parse_id("0").is_err());
        assert!(parse_doc_length("1,nan").is_err());
    }

    #[test]
    fn floats_use_six_decimals() {
        let mut out = Vec::new();
        write_doc_lengths(&mut out, &BTreeMap::from([(1, 1.0), (2, 2f64.ln())])).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1,1.000000\n2,0.693147\n");
    }
}
