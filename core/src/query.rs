use crate::store::IndexStore;
use crate::tokenizer::Tokenizer;
use crate::{DocId, Result};
use std::collections::HashMap;

/// Ranks documents for a free-text query.
///
/// Every query token is looked up on its own (a repeated word counts
/// twice), the weights of all hits are summed per document and the best
/// `limit` documents are returned. Equal scores keep the order in which
/// documents were first hit.
pub struct QueryEngine<'a> {
    tokenizer: &'a Tokenizer,
    store: &'a dyn IndexStore,
}

impl<'a> QueryEngine<'a> {
    pub fn new(tokenizer: &'a Tokenizer, store: &'a dyn IndexStore) -> Self {
        Self { tokenizer, store }
    }

    /// Document ids with their summed scores, best first.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<(DocId, f32)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut slots: HashMap<DocId, usize> = HashMap::new();
        let mut scored: Vec<(DocId, f32)> = Vec::new();
        for term in self.tokenizer.tokenize(query) {
            for hit in self.store.find_by_term(&term, Some(limit))? {
                match slots.get(&hit.doc_id) {
                    Some(&slot) => scored[slot].1 += hit.weight,
                    None => {
                        slots.insert(hit.doc_id, scored.len());
                        scored.push((hit.doc_id, hit.weight));
                    }
                }
            }
        }
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        Ok(scored)
    }

    pub fn query(&self, query: &str, limit: usize) -> Result<Vec<DocId>> {
        Ok(self.search(query, limit)?.into_iter().map(|(id, _)| id).collect())
    }
}
