//! In-process stores.
//!
//! `MemoryIndexStore` keeps its persisted postings behind a shared handle.
//! Handing that handle to a second store emulates reopening the index after
//! the first one went away, which makes the cost of a missing flush visible.

use super::{DocumentStore, IndexStore, PostingBuffer};
use crate::{DocId, Document, Error, Posting, Result, TermWeight};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Persisted side of a [`MemoryIndexStore`]: term -> hits, weight descending.
pub type SharedPostings = Arc<RwLock<HashMap<String, Vec<Posting>>>>;

#[derive(Debug)]
pub struct MemoryDocumentStore {
    documents: BTreeMap<DocId, String>,
    next_id: DocId,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self { documents: BTreeMap::new(), next_id: 1 }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.documents.clear();
        Ok(())
    }

    fn store_documents(&mut self, contents: Vec<String>) -> Result<Vec<DocId>> {
        let mut ids = Vec::with_capacity(contents.len());
        for content in contents {
            let id = self.next_id;
            self.next_id += 1;
            self.documents.insert(id, content);
            ids.push(id);
        }
        Ok(ids)
    }

    fn load_document(&self, id: DocId) -> Result<Document> {
        let content = self.documents.get(&id).ok_or(Error::DocumentNotFound(id))?;
        Ok(Document { id, content: content.clone() })
    }

    fn document_ids(&self) -> Box<dyn Iterator<Item = Result<DocId>> + '_> {
        Box::new(self.documents.keys().map(|id| Ok(*id)))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.documents.len())
    }
}

#[derive(Debug)]
pub struct MemoryIndexStore {
    persisted: SharedPostings,
    buffer: PostingBuffer,
}

impl MemoryIndexStore {
    pub fn new(batch_size: usize) -> Self {
        Self::with_persisted(batch_size, SharedPostings::default())
    }

    /// A store over postings persisted by an earlier store.
    pub fn with_persisted(batch_size: usize, persisted: SharedPostings) -> Self {
        Self { persisted, buffer: PostingBuffer::new(batch_size) }
    }

    pub fn persisted(&self) -> SharedPostings {
        Arc::clone(&self.persisted)
    }

    fn persist(&self, postings: Vec<TermWeight>) {
        if postings.is_empty() {
            return;
        }
        let count = postings.len();
        let mut map = self.persisted.write();
        for tw in postings {
            let hits = map.entry(tw.term.clone()).or_default();
            // after every hit with a weight >= this one, so ties stay in arrival order
            let at = hits.partition_point(|p| p.weight >= tw.weight);
            hits.insert(at, Posting::from(&tw));
        }
        debug!(count, "persisted posting batch");
    }
}

impl IndexStore for MemoryIndexStore {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.buffer.clear();
        self.persisted.write().clear();
        Ok(())
    }

    fn register(&mut self, postings: &mut dyn Iterator<Item = TermWeight>) -> Result<()> {
        for batch in self.buffer.push(postings) {
            self.persist(batch);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let rest = self.buffer.take();
        self.persist(rest);
        Ok(())
    }

    fn find_by_term(&self, term: &str, limit: Option<usize>) -> Result<Vec<Posting>> {
        let map = self.persisted.read();
        let hits = match map.get(term) {
            Some(hits) => hits,
            None => return Ok(Vec::new()),
        };
        let n = limit.unwrap_or(hits.len()).min(hits.len());
        Ok(hits[..n].to_vec())
    }

    fn unsaved_len(&self) -> usize {
        self.buffer.len()
    }
}
