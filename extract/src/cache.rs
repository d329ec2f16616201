//! Extraction result cache keyed by content hash.
//!
//! Chat-completion extraction is slow and costs tokens, so results are
//! remembered per (strategy, DDL text). The cache is a plain value owned by
//! the caller: in-memory by default, optionally persisted as one JSON file
//! per entry in a directory.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use ddl_schema_core::Table;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::strategy::SchemaExtractor;

/// SHA-256 of the strategy name and DDL text, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// # Examples
    ///
    /// ```
    /// use ddl_schema_extract::cache::ContentHash;
    ///
    /// let a = ContentHash::compute("llm", "CREATE TABLE t (id int);");
    /// assert_eq!(a.as_str().len(), 64);
    /// assert_eq!(a, ContentHash::compute("llm", "CREATE TABLE t (id int);"));
    /// assert_ne!(a, ContentHash::compute("regex", "CREATE TABLE t (id int);"));
    /// ```
    pub fn compute(extractor: &str, ddl: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(extractor.as_bytes());
        hasher.update([0u8]);
        hasher.update(ddl.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cached extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: ContentHash,
    pub extractor: String,
    pub tables: Vec<Table>,
    /// RFC 3339 timestamp of when the entry was stored.
    pub cached_at: String,
}

/// In-memory extraction cache with optional directory persistence.
#[derive(Debug, Default)]
pub struct ExtractionCache {
    entries: HashMap<ContentHash, CacheEntry>,
    dir: Option<PathBuf>,
    hits: usize,
    misses: usize,
}

impl ExtractionCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Cache that also reads and writes `<dir>/<hash>.json`.
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Looks up an entry, loading it from disk on a memory miss.
    pub fn get(&mut self, key: &ContentHash) -> Option<&CacheEntry> {
        if !self.entries.contains_key(key) {
            let loaded = self.load(key)?;
            self.entries.insert(key.clone(), loaded);
        }
        self.entries.get(key)
    }

    /// Stores an entry. Disk write failures are logged and otherwise ignored.
    pub fn put(&mut self, key: ContentHash, extractor: &str, tables: Vec<Table>) {
        let entry = CacheEntry {
            key: key.clone(),
            extractor: extractor.to_string(),
            tables,
            cached_at: chrono::Utc::now().to_rfc3339(),
        };
        self.store(&entry);
        self.entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `(hits, misses)` recorded by [`extract_cached`].
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    fn entry_path(&self, key: &ContentHash) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", key.as_str())))
    }

    fn load(&self, key: &ContentHash) -> Option<CacheEntry> {
        let path = self.entry_path(key)?;
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if entry.key == *key => Some(entry),
            Ok(_) => {
                debug!(path = %path.display(), "Cache entry key mismatch");
                None
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    fn store(&self, entry: &CacheEntry) {
        let (Some(dir), Some(path)) = (self.dir.as_ref(), self.entry_path(&entry.key)) else {
            return;
        };
        if let Err(err) = fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), %err, "Cannot create cache directory");
            return;
        }
        let written = serde_json::to_string_pretty(entry)
            .map_err(|err| err.to_string())
            .and_then(|json| fs::write(&path, json).map_err(|err| err.to_string()));
        if let Err(err) = written {
            warn!(path = %path.display(), %err, "Cannot write cache entry");
        }
    }
}

/// Runs `extractor` through `cache`.
///
/// A hit returns the stored tables without calling the extractor. Only
/// non-empty successful results are stored.
///
/// # Examples
///
/// ```
/// use ddl_schema_extract::cache::{ExtractionCache, extract_cached};
/// use ddl_schema_extract::strategy::RegexExtractor;
///
/// let mut cache = ExtractionCache::in_memory();
/// let ddl = "CREATE TABLE t (id int);";
/// let first = extract_cached(&RegexExtractor::default(), ddl, &mut cache).unwrap();
/// let second = extract_cached(&RegexExtractor::default(), ddl, &mut cache).unwrap();
/// assert_eq!(first, second);
/// assert_eq!(cache.stats(), (1, 1));
/// ```
pub fn extract_cached<E: SchemaExtractor + ?Sized>(
    extractor: &E,
    ddl: &str,
    cache: &mut ExtractionCache,
) -> Result<Vec<Table>, ExtractError> {
    let key = ContentHash::compute(extractor.name(), ddl);
    if let Some(entry) = cache.get(&key) {
        let tables = entry.tables.clone();
        debug!(extractor = extractor.name(), key = %key, "Cache hit");
        cache.hits += 1;
        return Ok(tables);
    }

    cache.misses += 1;
    let tables = extractor.extract(ddl)?;
    if !tables.is_empty() {
        cache.put(key, extractor.name(), tables.clone());
    }
    Ok(tables)
}
