//! File-backed stores.
//!
//! The index keeps one rank-sorted hit list per term. Registered postings
//! are first written out as raw staging batches; [`SegmentIndexStore::flush`]
//! merges the staged batches into the hit lists one batch at a time, so
//! memory stays bounded by the batch size. Until then readers see the
//! previously merged index only. A flush cut short is finished by the next
//! one.

use super::{DocumentStore, IndexStore, PostingBuffer};
use crate::persist::{
    list_staged_batches, list_text_ids, load_dictionary, load_meta, load_postings_for_term,
    load_staged_batch, save_dictionary, save_meta, save_postings_for_term, save_staged_batch,
    IndexPaths, MetaFile, FORMAT_VERSION,
};
use crate::{DocId, Document, Error, Posting, Result, TermId, TermWeight};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

pub struct FileDocumentStore {
    paths: IndexPaths,
    next_id: DocId,
}

impl FileDocumentStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let paths = IndexPaths::new(root);
        let next_id = list_text_ids(&paths)?.last().map_or(1, |id| id + 1);
        Ok(Self { paths, next_id })
    }
}

impl DocumentStore for FileDocumentStore {
    fn init(&mut self) -> Result<()> {
        let dir = self.paths.texts_dir();
        if dir.exists() {
            warn!(path = %dir.display(), "document directory already exists, keeping it");
        }
        fs::create_dir_all(dir)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let dir = self.paths.texts_dir();
        if dir.exists() {
            warn!(path = %dir.display(), "removing document directory");
            fs::remove_dir_all(dir)?;
        }
        self.next_id = 1;
        Ok(())
    }

    fn store_documents(&mut self, contents: Vec<String>) -> Result<Vec<DocId>> {
        fs::create_dir_all(self.paths.texts_dir())?;
        let mut ids = Vec::with_capacity(contents.len());
        for content in contents {
            let id = self.next_id;
            fs::write(self.paths.text(id), content)?;
            self.next_id += 1;
            ids.push(id);
        }
        debug!(stored = ids.len(), "stored document batch");
        Ok(ids)
    }

    fn load_document(&self, id: DocId) -> Result<Document> {
        match fs::read_to_string(self.paths.text(id)) {
            Ok(content) => Ok(Document { id, content }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::DocumentNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    fn document_ids(&self) -> Box<dyn Iterator<Item = Result<DocId>> + '_> {
        match list_text_ids(&self.paths) {
            Ok(ids) => Box::new(ids.into_iter().map(Ok)),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn len(&self) -> Result<usize> {
        Ok(list_text_ids(&self.paths)?.len())
    }
}

pub struct SegmentIndexStore {
    paths: IndexPaths,
    dictionary: RwLock<Dictionary>,
    num_postings: u64,
    merged_batches: u64,
    next_batch: u64,
    buffer: PostingBuffer,
}

/// Term ids plus the `updated_at` of the meta file they were read with.
#[derive(Default)]
struct Dictionary {
    terms: HashMap<String, TermId>,
    stamp: Option<String>,
}

impl SegmentIndexStore {
    pub fn open<P: AsRef<Path>>(root: P, batch_size: usize) -> Result<Self> {
        let paths = IndexPaths::new(root);
        let terms = load_dictionary(&paths)?;
        let meta = load_meta(&paths).ok();
        let num_postings = meta.as_ref().map_or(0, |m| m.num_postings);
        let merged_batches = meta.as_ref().map_or(0, |m| m.merged_batches);
        let staged_end = list_staged_batches(&paths)?.last().map_or(0, |(seq, _)| seq + 1);
        Ok(Self {
            paths,
            dictionary: RwLock::new(Dictionary { terms, stamp: meta.map(|m| m.updated_at) }),
            num_postings,
            merged_batches,
            next_batch: merged_batches.max(staged_end),
            buffer: PostingBuffer::new(batch_size),
        })
    }

    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.read().terms.len()
    }

    fn stage(&mut self, batch: Vec<TermWeight>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        save_staged_batch(&self.paths, self.next_batch, &batch)?;
        debug!(seq = self.next_batch, count = batch.len(), "staged posting batch");
        self.next_batch += 1;
        Ok(())
    }

    /// Fold the staged batches into the per-term hit lists, one batch at a time.
    fn merge_staged(&mut self) -> Result<usize> {
        let mut merged = 0;
        for (seq, path) in list_staged_batches(&self.paths)? {
            if seq < self.merged_batches {
                debug!(seq, "dropping staged batch merged before an interruption");
            } else {
                merged += self.merge_batch(seq, &path)?;
                self.merged_batches = seq + 1;
                self.write_meta()?;
            }
            fs::remove_file(path)?;
        }
        Ok(merged)
    }

    // Term ids are persisted before any hit list refers to them. A hit list
    // that already holds batch `seq` is left alone when the batch is replayed.
    fn merge_batch(&mut self, seq: u64, path: &Path) -> Result<usize> {
        let batch = load_staged_batch(path)?;
        let count = batch.len();
        let mut grouped: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        for tw in batch {
            let posting = Posting::from(&tw);
            grouped.entry(tw.term).or_default().push(posting);
        }

        let terms = &mut self.dictionary.get_mut().terms;
        let known = terms.len();
        let mut fresh = Vec::with_capacity(grouped.len());
        for (term, postings) in grouped {
            let next_id = terms.len() as TermId;
            fresh.push((*terms.entry(term).or_insert(next_id), postings));
        }
        if terms.len() > known {
            save_dictionary(&self.paths, terms)?;
        }

        for (term_id, postings) in fresh {
            let mut list = load_postings_for_term(&self.paths, term_id)?;
            if list.merged_batches > seq {
                continue;
            }
            list.hits.extend(postings);
            // stable: older postings win ties
            list.hits.sort_by(|a, b| b.weight.total_cmp(&a.weight));
            list.merged_batches = seq + 1;
            save_postings_for_term(&self.paths, term_id, &list)?;
        }
        self.num_postings += count as u64;
        debug!(seq, count, "merged staged batch");
        Ok(count)
    }

    fn write_meta(&mut self) -> Result<()> {
        let dictionary = self.dictionary.get_mut();
        let meta = MetaFile {
            num_terms: dictionary.terms.len() as u32,
            num_postings: self.num_postings,
            merged_batches: self.merged_batches,
            updated_at: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            version: FORMAT_VERSION,
        };
        save_meta(&self.paths, &meta)?;
        dictionary.stamp = Some(meta.updated_at);
        Ok(())
    }

    /// Pick up terms added by another process since the dictionary was read.
    fn refresh(&self) -> Result<()> {
        let Ok(meta) = load_meta(&self.paths) else {
            return Ok(());
        };
        if self.dictionary.read().stamp.as_deref() == Some(meta.updated_at.as_str()) {
            return Ok(());
        }
        let terms = load_dictionary(&self.paths)?;
        debug!(terms = terms.len(), updated_at = %meta.updated_at, "reloaded dictionary");
        *self.dictionary.write() = Dictionary { terms, stamp: Some(meta.updated_at) };
        Ok(())
    }
}

impl IndexStore for SegmentIndexStore {
    fn init(&mut self) -> Result<()> {
        let dir = self.paths.index_dir();
        if dir.exists() {
            warn!(path = %dir.display(), "index directory already exists, keeping it");
        }
        fs::create_dir_all(self.paths.postings_dir())?;
        fs::create_dir_all(self.paths.staging_dir())?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let dir = self.paths.index_dir();
        if dir.exists() {
            warn!(path = %dir.display(), "removing index directory");
            fs::remove_dir_all(dir)?;
        }
        *self.dictionary.get_mut() = Dictionary::default();
        self.num_postings = 0;
        self.merged_batches = 0;
        self.next_batch = 0;
        self.buffer.clear();
        Ok(())
    }

    fn register(&mut self, postings: &mut dyn Iterator<Item = TermWeight>) -> Result<()> {
        for batch in self.buffer.push(postings) {
            self.stage(batch)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let rest = self.buffer.take();
        self.stage(rest)?;
        let merged = self.merge_staged()?;
        self.write_meta()?;
        info!(merged, terms = self.num_terms(), postings = self.num_postings, "index flushed");
        Ok(())
    }

    fn find_by_term(&self, term: &str, limit: Option<usize>) -> Result<Vec<Posting>> {
        self.refresh()?;
        let Some(term_id) = self.dictionary.read().terms.get(term).copied() else {
            return Ok(Vec::new());
        };
        let mut hits = load_postings_for_term(&self.paths, term_id)?.hits;
        if let Some(limit) = limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    fn unsaved_len(&self) -> usize {
        self.buffer.len()
    }
}
