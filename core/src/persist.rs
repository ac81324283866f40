//! On-disk layout of the segment store.
//!
//! ```text
//! <root>/texts/00000001.txt              document contents
//! <root>/index/dictionary.bin            term -> term id
//! <root>/index/postings/00000000.postings.bin   hit list of one term
//! <root>/index/staging/00000000.batch.bin       persisted, not yet merged batch
//! <root>/index/meta.json
//! ```

use crate::{DocId, Posting, Result, TermId, TermWeight};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_terms: u32,
    pub num_postings: u64,
    /// Staged batches with a lower sequence number are fully merged.
    #[serde(default)]
    pub merged_batches: u64,
    pub updated_at: String,
    pub version: u32,
}

/// Rank-sorted hit list of one term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermHits {
    /// Staged batches with a lower sequence number are already in `hits`.
    pub merged_batches: u64,
    pub hits: Vec<Posting>,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn texts_dir(&self) -> PathBuf { self.root.join("texts") }
    pub fn index_dir(&self) -> PathBuf { self.root.join("index") }
    pub fn dictionary(&self) -> PathBuf { self.index_dir().join("dictionary.bin") }
    pub fn meta(&self) -> PathBuf { self.index_dir().join("meta.json") }
    pub fn postings_dir(&self) -> PathBuf { self.index_dir().join("postings") }
    pub fn staging_dir(&self) -> PathBuf { self.index_dir().join("staging") }

    pub fn text(&self, doc_id: DocId) -> PathBuf {
        self.texts_dir().join(format!("{doc_id:08}.txt"))
    }
    pub fn postings(&self, term_id: TermId) -> PathBuf {
        self.postings_dir().join(format!("{term_id:08}.postings.bin"))
    }
    pub fn staged_batch(&self, seq: u64) -> PathBuf {
        self.staging_dir().join(format!("{seq:08}.batch.bin"))
    }
}

// Readers and restarts see either the old file or the new one, never a torn write.
fn replace_file(path: &Path, write: impl FnOnce(&mut BufWriter<File>) -> Result<()>) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("tmp");
    let mut w = BufWriter::new(File::create(&tmp)?);
    write(&mut w)?;
    w.flush()?;
    w.get_ref().sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn write_bincode<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    replace_file(path, |w| Ok(bincode::serialize_into(w, value)?))
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let r = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(r)?)
}

pub fn save_dictionary(paths: &IndexPaths, dict: &HashMap<String, TermId>) -> Result<()> {
    write_bincode(&paths.dictionary(), dict)
}

/// Missing dictionary means an empty index.
pub fn load_dictionary(paths: &IndexPaths) -> Result<HashMap<String, TermId>> {
    let path = paths.dictionary();
    if !path.exists() {
        return Ok(HashMap::new());
    }
    read_bincode(&path)
}

pub fn save_postings_for_term(paths: &IndexPaths, term_id: TermId, hits: &TermHits) -> Result<()> {
    write_bincode(&paths.postings(term_id), hits)
}

pub fn load_postings_for_term(paths: &IndexPaths, term_id: TermId) -> Result<TermHits> {
    let path = paths.postings(term_id);
    if !path.exists() {
        return Ok(TermHits::default());
    }
    read_bincode(&path)
}

pub fn save_staged_batch(paths: &IndexPaths, seq: u64, batch: &[TermWeight]) -> Result<()> {
    write_bincode(&paths.staged_batch(seq), batch)
}

pub fn load_staged_batch(path: &Path) -> Result<Vec<TermWeight>> {
    read_bincode(path)
}

/// Staged batch files ordered by sequence number.
pub fn list_staged_batches(paths: &IndexPaths) -> Result<Vec<(u64, PathBuf)>> {
    let dir = paths.staging_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut batches = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let seq = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".batch.bin"))
            .and_then(|n| n.parse::<u64>().ok());
        if let Some(seq) = seq {
            batches.push((seq, path));
        }
    }
    batches.sort_by_key(|(seq, _)| *seq);
    Ok(batches)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    let json = serde_json::to_string_pretty(meta)?;
    replace_file(&paths.meta(), |w| Ok(w.write_all(json.as_bytes())?))
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let text = fs::read_to_string(paths.meta())?;
    Ok(serde_json::from_str(&text)?)
}

/// Document ids present under `texts/`, ascending.
pub fn list_text_ids(paths: &IndexPaths) -> Result<Vec<DocId>> {
    let dir = paths.texts_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let id = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".txt"))
            .and_then(|n| n.parse::<DocId>().ok());
        if let Some(id) = id {
            ids.push(id);
        }
    }
    ids.sort_unstable();
    Ok(ids)
}
