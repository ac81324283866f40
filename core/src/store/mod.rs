//! Document and index storage.
//!
//! Both stores are trait objects so the pipeline never branches on the
//! backend. [`open_stores`] picks the implementation once from the
//! `datastore` config string.

use crate::{DocId, Document, Posting, Result, SearcherConfig, TermWeight};
use crate::Error;

pub mod kv;
pub mod memory;
pub mod segment;

pub use kv::{SledDocumentStore, SledIndexStore};
pub use memory::{MemoryDocumentStore, MemoryIndexStore, SharedPostings};
pub use segment::{FileDocumentStore, SegmentIndexStore};

pub trait DocumentStore: Send + Sync {
    /// Create backing structures if they are missing. Never destroys data.
    fn init(&mut self) -> Result<()>;

    /// Remove every document.
    fn clear(&mut self) -> Result<()>;

    /// Store contents and return the ids assigned to them, in input order.
    fn store_documents(&mut self, contents: Vec<String>) -> Result<Vec<DocId>>;

    /// Fails with [`Error::DocumentNotFound`] for an unknown id.
    fn load_document(&self, id: DocId) -> Result<Document>;

    fn document_ids(&self) -> Box<dyn Iterator<Item = Result<DocId>> + '_>;

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Persisted inverted index.
///
/// Postings are appended through [`register`](IndexStore::register) into an
/// in-memory buffer that is written out in batches. Whatever is still
/// buffered when the store is dropped is lost: an indexing run must end
/// with exactly one [`flush`](IndexStore::flush).
pub trait IndexStore: Send + Sync {
    fn init(&mut self) -> Result<()>;

    /// Drop all persisted and buffered postings.
    fn clear(&mut self) -> Result<()>;

    /// Buffer postings, persisting full batches once the buffer outgrows
    /// the batch size. No deduplication: registering the same document
    /// twice yields duplicate postings.
    fn register(&mut self, postings: &mut dyn Iterator<Item = TermWeight>) -> Result<()>;

    /// Persist the remaining buffer and make every posting durable and visible.
    fn flush(&mut self) -> Result<()>;

    /// Hits for `term`, highest weight first, at most `limit` of them.
    fn find_by_term(&self, term: &str, limit: Option<usize>) -> Result<Vec<Posting>>;

    /// Postings buffered but not yet persisted.
    fn unsaved_len(&self) -> usize;
}

/// Unsaved postings plus the batch-threshold policy shared by all backends.
#[derive(Debug)]
pub struct PostingBuffer {
    batch_size: usize,
    unsaved: Vec<TermWeight>,
}

impl PostingBuffer {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size: batch_size.max(1), unsaved: Vec::new() }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn len(&self) -> usize {
        self.unsaved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unsaved.is_empty()
    }

    /// Append postings and split off the oldest full batches while the
    /// buffer holds more than one batch worth. The caller persists them.
    pub fn push(&mut self, postings: &mut dyn Iterator<Item = TermWeight>) -> Vec<Vec<TermWeight>> {
        self.unsaved.extend(postings);
        let mut ready = Vec::new();
        while self.unsaved.len() > self.batch_size {
            let rest = self.unsaved.split_off(self.batch_size);
            ready.push(std::mem::replace(&mut self.unsaved, rest));
        }
        ready
    }

    /// Everything left in the buffer.
    pub fn take(&mut self) -> Vec<TermWeight> {
        std::mem::take(&mut self.unsaved)
    }

    pub fn clear(&mut self) {
        self.unsaved.clear();
    }
}

pub type Stores = (Box<dyn DocumentStore>, Box<dyn IndexStore>);

/// Build the document and index store named by `config.datastore`.
pub fn open_stores(config: &SearcherConfig) -> Result<Stores> {
    match config.datastore.as_str() {
        "sled" => {
            let db = sled::open(&config.sled.path)?;
            let documents = SledDocumentStore::new(db.clone())?;
            let index = SledIndexStore::new(db, config.sled.index_batch_size)?;
            Ok((Box::new(documents), Box::new(index)))
        }
        "segment" => {
            let documents = FileDocumentStore::open(&config.segment.path)?;
            let index = SegmentIndexStore::open(&config.segment.path, config.segment.index_batch_size)?;
            Ok((Box::new(documents), Box::new(index)))
        }
        "memory" => Ok((
            Box::new(MemoryDocumentStore::new()),
            Box::new(MemoryIndexStore::new(config.memory.index_batch_size)),
        )),
        other => Err(Error::UnknownDatastore(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postings(n: usize) -> Vec<TermWeight> {
        (0..n)
            .map(|i| TermWeight { doc_id: i as DocId, term: "t".into(), weight: 0.5 })
            .collect()
    }

    #[test]
    fn buffer_below_threshold_keeps_everything() {
        let mut buf = PostingBuffer::new(3);
        assert!(buf.push(&mut postings(3).into_iter()).is_empty());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn buffer_splits_oldest_full_batches() {
        let mut buf = PostingBuffer::new(3);
        let ready = buf.push(&mut postings(8).into_iter());
        assert_eq!(ready.len(), 2);
        assert_eq!(ready[0].iter().map(|p| p.doc_id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(ready[1].iter().map(|p| p.doc_id).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(buf.take().iter().map(|p| p.doc_id).collect::<Vec<_>>(), vec![6, 7]);
        assert!(buf.is_empty());
    }

    #[test]
    fn unknown_datastore_is_rejected() {
        let config = SearcherConfig { datastore: "mongo".into(), ..Default::default() };
        match open_stores(&config) {
            Err(Error::UnknownDatastore(name)) => assert_eq!(name, "mongo"),
            _ => panic!("expected UnknownDatastore"),
        }
    }
}
