use crate::indexer::DocumentIndexer;
use crate::query::QueryEngine;
use crate::store::{self, DocumentStore, IndexStore};
use crate::tokenizer::Tokenizer;
use crate::{DocId, Result, SearcherConfig};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const PROGRESS_EVERY: usize = 1_000;

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Falls back to `query_limit` from the config.
    pub limit: Option<usize>,
    pub preview: bool,
    pub measure: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub document_ids: Vec<DocId>,
    /// First lines of the hits, only filled in preview mode.
    pub previews: Vec<String>,
    /// Wall-clock time of the query, only in measure mode.
    pub took: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub empty_documents: usize,
    pub postings: usize,
}

/// Document store, index store and tokenizer behind one handle.
pub struct Searcher {
    config: SearcherConfig,
    tokenizer: Tokenizer,
    documents: Box<dyn DocumentStore>,
    index: Box<dyn IndexStore>,
}

impl Searcher {
    /// Build tokenizer and stores from the config.
    pub fn open(config: SearcherConfig) -> Result<Self> {
        config.validate()?;
        let tokenizer = Tokenizer::from_name(&config.stemmer)?;
        let (documents, index) = store::open_stores(&config)?;
        info!(datastore = %config.datastore, stemmer = %config.stemmer, "opened searcher");
        Ok(Self { config, tokenizer, documents, index })
    }

    pub fn with_stores(
        config: SearcherConfig,
        tokenizer: Tokenizer,
        documents: Box<dyn DocumentStore>,
        index: Box<dyn IndexStore>,
    ) -> Self {
        Self { config, tokenizer, documents, index }
    }

    pub fn config(&self) -> &SearcherConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn documents(&self) -> &dyn DocumentStore {
        self.documents.as_ref()
    }

    pub fn index_store(&self) -> &dyn IndexStore {
        self.index.as_ref()
    }

    /// Prepare both stores. With `force` everything stored so far is dropped first.
    pub fn init(&mut self, force: bool) -> Result<()> {
        if force {
            self.documents.clear()?;
            self.index.clear()?;
        }
        self.documents.init()?;
        self.index.init()
    }

    /// Store every regular file below `root` as one document.
    pub fn register_path<P: AsRef<Path>>(&mut self, root: P) -> Result<usize> {
        let root = root.as_ref();
        let batch_size = self.config.document_batch_size;
        let mut pending = Vec::with_capacity(batch_size);
        let mut count = 0;
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable path");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let bytes = fs::read(entry.path())?;
            pending.push(String::from_utf8_lossy(&bytes).into_owned());
            count += 1;
            if pending.len() == batch_size {
                self.documents.store_documents(std::mem::take(&mut pending))?;
                debug!(count, "registered documents");
            }
        }
        if !pending.is_empty() {
            self.documents.store_documents(pending)?;
        }
        info!(count, root = %root.display(), "done registering documents");
        Ok(count)
    }

    /// Store in-memory contents, batched like [`register_path`](Self::register_path).
    pub fn register_documents<I>(&mut self, contents: I) -> Result<Vec<DocId>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let batch_size = self.config.document_batch_size;
        let mut ids = Vec::new();
        let mut pending: Vec<String> = Vec::with_capacity(batch_size);
        for content in contents {
            pending.push(content.into());
            if pending.len() == batch_size {
                ids.extend(self.documents.store_documents(std::mem::take(&mut pending))?);
            }
        }
        if !pending.is_empty() {
            ids.extend(self.documents.store_documents(pending)?);
        }
        Ok(ids)
    }

    /// Index every stored document and flush the index once at the end.
    pub fn index(&mut self) -> Result<IndexStats> {
        let mut stats = IndexStats::default();
        for id in self.documents.document_ids() {
            let document = self.documents.load_document(id?)?;
            let indexer = DocumentIndexer::index(&document, &self.tokenizer);
            stats.documents += 1;
            if indexer.is_empty() {
                debug!(doc_id = document.id, "document has no tokens, nothing to index");
                stats.empty_documents += 1;
                continue;
            }
            stats.postings += indexer.distinct_terms();
            self.index.register(&mut indexer.postings())?;
            if stats.documents % PROGRESS_EVERY == 0 {
                info!(documents = stats.documents, "indexing");
            }
        }
        self.index.flush()?;
        info!(
            documents = stats.documents,
            empty = stats.empty_documents,
            postings = stats.postings,
            "done indexing documents"
        );
        Ok(stats)
    }

    /// Content (or first line) of each document, in the order given.
    pub fn show(&self, ids: &[DocId], preview: bool) -> Result<Vec<String>> {
        ids.iter()
            .map(|&id| -> Result<String> {
                let document = self.documents.load_document(id)?;
                Ok(if preview { document.preview().to_string() } else { document.content })
            })
            .collect()
    }

    pub fn query(&self, query: &str, options: &QueryOptions) -> Result<QueryResponse> {
        let start = Instant::now();
        let limit = options.limit.unwrap_or(self.config.query_limit);
        let engine = QueryEngine::new(&self.tokenizer, self.index.as_ref());
        let document_ids = engine.query(query, limit)?;
        let previews = if options.preview { self.show(&document_ids, true)? } else { Vec::new() };
        let took = options.measure.then(|| start.elapsed());
        debug!(query, hits = document_ids.len(), "query done");
        Ok(QueryResponse { document_ids, previews, took })
    }
}
