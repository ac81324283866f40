//! Indexing and ranking pipeline for a small fulltext search engine.
//!
//! Documents are registered into a [`store::DocumentStore`], tokenized by a
//! [`tokenizer::Tokenizer`], turned into term-frequency weights by a
//! [`indexer::DocumentIndexer`] and accumulated into an [`store::IndexStore`].
//! Queries go through [`query::QueryEngine`]; [`controller::Searcher`] wires
//! everything together from a [`config::SearcherConfig`].

use serde::{Deserialize, Serialize};

pub mod config;
pub mod controller;
pub mod error;
pub mod indexer;
pub mod persist;
pub mod query;
pub mod store;
pub mod tokenizer;

pub use config::SearcherConfig;
pub use controller::{IndexStats, QueryOptions, QueryResponse, Searcher};
pub use error::{Error, Result};

pub type DocId = u64;
pub type TermId = u32;

/// A stored document as seen by the pipeline. Content is read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub content: String,
}

impl Document {
    pub fn new(id: DocId, content: impl Into<String>) -> Self {
        Self { id, content: content.into() }
    }

    /// First line of the content.
    pub fn preview(&self) -> &str {
        self.content.split('\n').next().unwrap_or("")
    }
}

/// One term of one document with its term-frequency weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermWeight {
    pub doc_id: DocId,
    pub term: String,
    pub weight: f32, // count / total tokens, in (0, 1]
}

/// Entry in a term's hit list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f32,
}

impl From<&TermWeight> for Posting {
    fn from(tw: &TermWeight) -> Self {
        Self { doc_id: tw.doc_id, weight: tw.weight }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_first_line() {
        let doc = Document::new(7, "Title line\nbody text\nmore");
        assert_eq!(doc.preview(), "Title line");
        assert_eq!(Document::new(8, "").preview(), "");
        assert_eq!(Document::new(9, "single").preview(), "single");
    }
}
