use crate::{DocId, TermId};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building, saving or loading an index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt row in {file} at line {line}: {reason}")]
    Corrupt {
        file: &'static str,
        line: usize,
        reason: String,
    },

    #[error("{file} references unknown document {doc_id}")]
    UnknownDocument { file: &'static str, doc_id: DocId },

    #[error("{file} references unknown term {term_id}")]
    UnknownTerm { file: &'static str, term_id: TermId },

    #[error("term {0:?} appears under more than one id")]
    DuplicateTerm(String),

    #[error("cannot record terms for unregistered document {0}")]
    UnregisteredDocument(DocId),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io { path: path.into(), source }
    }

    pub(crate) fn corrupt(file: &'static str, line: usize, reason: impl Into<String>) -> Self {
        IndexError::Corrupt { file, line, reason: reason.into() }
    }
}

pub type Result<T, E = IndexError> = std::result::Result<T, E>;
