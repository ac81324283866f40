//! sled-backed stores.
//!
//! The `postings` tree plays the part of a flat posting table. Keys are
//! `term 0x00 rank posting_id`, where `rank` is the bitwise complement of
//! the weight's bits, so a prefix scan over a term is already sorted by
//! weight descending and a limit is just a shorter scan. Posting ids grow
//! monotonically, which keeps equal weights in insertion order. The value
//! is the bincode document id; the weight is read back from the key.

use super::{DocumentStore, IndexStore, PostingBuffer};
use crate::{DocId, Document, Error, Posting, Result, TermWeight};
use sled::{Batch, Db, Tree};
use tracing::{debug, info, warn};

const DOCUMENTS_TREE: &str = "documents";
const POSTINGS_TREE: &str = "postings";

fn term_prefix(term: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(term.len() + 13);
    key.extend_from_slice(term.as_bytes());
    key.push(0);
    key
}

// Weights are positive, so their bit patterns order like the floats do.
fn posting_key(term: &str, weight: f32, posting_id: u64) -> Vec<u8> {
    let mut key = term_prefix(term);
    key.extend_from_slice(&(!weight.to_bits()).to_be_bytes());
    key.extend_from_slice(&posting_id.to_be_bytes());
    key
}

fn decode_weight(key: &[u8], prefix_len: usize) -> Result<f32> {
    let raw: [u8; 4] = key
        .get(prefix_len..prefix_len + 4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| Error::invalid_data(format!("posting key of {} bytes", key.len())))?;
    Ok(f32::from_bits(!u32::from_be_bytes(raw)))
}

fn decode_id(bytes: &[u8]) -> Result<DocId> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::invalid_data(format!("document key of {} bytes", bytes.len())))?;
    Ok(DocId::from_be_bytes(raw))
}

pub struct SledDocumentStore {
    db: Db,
    documents: Tree,
}

impl SledDocumentStore {
    pub fn new(db: Db) -> Result<Self> {
        let documents = db.open_tree(DOCUMENTS_TREE)?;
        Ok(Self { db, documents })
    }
}

impl DocumentStore for SledDocumentStore {
    fn init(&mut self) -> Result<()> {
        if !self.documents.is_empty() {
            warn!(documents = self.documents.len(), "document store already populated, keeping it");
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        warn!(documents = self.documents.len(), "clearing document store");
        self.documents.clear()?;
        Ok(())
    }

    fn store_documents(&mut self, contents: Vec<String>) -> Result<Vec<DocId>> {
        let mut batch = Batch::default();
        let mut ids = Vec::with_capacity(contents.len());
        for content in contents {
            let id = self.db.generate_id()?;
            batch.insert(id.to_be_bytes().to_vec(), content.into_bytes());
            ids.push(id);
        }
        self.documents.apply_batch(batch)?;
        debug!(stored = ids.len(), "stored document batch");
        Ok(ids)
    }

    fn load_document(&self, id: DocId) -> Result<Document> {
        let raw = self.documents.get(id.to_be_bytes())?.ok_or(Error::DocumentNotFound(id))?;
        let content = String::from_utf8(raw.to_vec())
            .map_err(|e| Error::invalid_data(format!("document {id}: {e}")))?;
        Ok(Document { id, content })
    }

    fn document_ids(&self) -> Box<dyn Iterator<Item = Result<DocId>> + '_> {
        Box::new(
            self.documents
                .iter()
                .keys()
                .map(|key| key.map_err(Error::from).and_then(|k| decode_id(&k))),
        )
    }

    fn len(&self) -> Result<usize> {
        Ok(self.documents.len())
    }
}

pub struct SledIndexStore {
    db: Db,
    postings: Tree,
    buffer: PostingBuffer,
}

impl SledIndexStore {
    pub fn new(db: Db, batch_size: usize) -> Result<Self> {
        let postings = db.open_tree(POSTINGS_TREE)?;
        Ok(Self { db, postings, buffer: PostingBuffer::new(batch_size) })
    }

    fn persist(&self, postings: Vec<TermWeight>) -> Result<()> {
        if postings.is_empty() {
            return Ok(());
        }
        let count = postings.len();
        let mut batch = Batch::default();
        for tw in postings {
            let key = posting_key(&tw.term, tw.weight, self.db.generate_id()?);
            let value = bincode::serialize(&tw.doc_id)?;
            batch.insert(key, value);
        }
        self.postings.apply_batch(batch)?;
        debug!(count, "persisted posting batch");
        Ok(())
    }
}

impl IndexStore for SledIndexStore {
    fn init(&mut self) -> Result<()> {
        if !self.postings.is_empty() {
            warn!(postings = self.postings.len(), "index already populated, keeping it");
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        warn!(postings = self.postings.len(), "clearing index");
        self.buffer.clear();
        self.postings.clear()?;
        Ok(())
    }

    fn register(&mut self, postings: &mut dyn Iterator<Item = TermWeight>) -> Result<()> {
        for batch in self.buffer.push(postings) {
            self.persist(batch)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let rest = self.buffer.take();
        self.persist(rest)?;
        let bytes = self.db.flush()?;
        info!(postings = self.postings.len(), bytes, "index flushed");
        Ok(())
    }

    fn find_by_term(&self, term: &str, limit: Option<usize>) -> Result<Vec<Posting>> {
        let prefix = term_prefix(term);
        self.postings
            .scan_prefix(&prefix)
            .take(limit.unwrap_or(usize::MAX))
            .map(|entry| -> Result<Posting> {
                let (key, value) = entry?;
                let weight = decode_weight(&key, prefix.len())?;
                Ok(Posting { doc_id: bincode::deserialize(&value)?, weight })
            })
            .collect()
    }

    fn unsaved_len(&self) -> usize {
        self.buffer.len()
    }
}
