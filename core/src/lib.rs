pub mod error;
pub mod index;
pub mod persist;
pub mod scoring;
pub mod tokenizer;

pub use error::IndexError;
pub use index::*;
