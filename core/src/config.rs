//! Searcher configuration.
//!
//! Loaded from a TOML file; every field has a default so a partial file (or
//! no file at all) is valid. The core never looks a config file up on its
//! own, callers resolve the path and hand the struct in.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearcherConfig {
    /// Store family: "sled", "segment" or "memory".
    pub datastore: String,
    /// Default number of results returned by a query.
    pub query_limit: usize,
    /// "none" or a Snowball language name such as "english".
    pub stemmer: String,
    /// Documents stored per write while registering a directory.
    pub document_batch_size: usize,
    pub sled: SledConfig,
    pub segment: SegmentConfig,
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SledConfig {
    pub path: PathBuf,
    pub index_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    pub path: PathBuf,
    pub index_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub index_batch_size: usize,
}

impl Default for SearcherConfig {
    fn default() -> Self {
        Self {
            datastore: "sled".to_string(),
            query_limit: 10,
            stemmer: "none".to_string(),
            document_batch_size: 100,
            sled: SledConfig::default(),
            segment: SegmentConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl Default for SledConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("data/searcher.sled"), index_batch_size: 10_000 }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("data/segment"), index_batch_size: 30_000 }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { index_batch_size: 10_000 }
    }
}

impl SearcherConfig {
    /// Read and validate a TOML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::config(format!("config parse: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Use `explicit` if given, else the file named by `SEARCHER_CONFIG`,
    /// else built-in defaults. An explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match std::env::var_os("SEARCHER_CONFIG") {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("query_limit", self.query_limit),
            ("document_batch_size", self.document_batch_size),
            ("sled.index_batch_size", self.sled.index_batch_size),
            ("segment.index_batch_size", self.segment.index_batch_size),
            ("memory.index_batch_size", self.memory.index_batch_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::config(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}
