use crate::tokenizer::Tokenizer;
use crate::{DocId, Document, TermWeight};
use std::collections::HashMap;

/// Term-frequency table for a single document.
///
/// Created per document and thrown away afterwards; postings are
/// `count(term) / total_tokens`.
#[derive(Debug)]
pub struct DocumentIndexer {
    doc_id: DocId,
    counts: HashMap<String, u32>,
    total_tokens: u32,
}

impl DocumentIndexer {
    pub fn new(doc_id: DocId) -> Self {
        Self { doc_id, counts: HashMap::new(), total_tokens: 0 }
    }

    /// Tokenize and count a whole document.
    pub fn index(document: &Document, tokenizer: &Tokenizer) -> Self {
        let mut indexer = Self::new(document.id);
        indexer.index_tokens(tokenizer.tokenize(&document.content));
        indexer
    }

    pub fn index_tokens<I: IntoIterator<Item = String>>(&mut self, tokens: I) {
        for token in tokens {
            *self.counts.entry(token).or_insert(0) += 1;
            self.total_tokens += 1;
        }
    }

    pub fn doc_id(&self) -> DocId {
        self.doc_id
    }

    pub fn total_tokens(&self) -> u32 {
        self.total_tokens
    }

    pub fn distinct_terms(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_tokens == 0
    }

    /// One weight per distinct term, in no particular order. Empty for a
    /// document without tokens.
    pub fn postings(&self) -> impl Iterator<Item = TermWeight> + '_ {
        // counts is empty whenever total_tokens is 0, so the division never runs on zero
        let total = self.total_tokens as f32;
        self.counts.iter().map(move |(term, &count)| TermWeight {
            doc_id: self.doc_id,
            term: term.clone(),
            weight: count as f32 / total,
        })
    }
}
