//! Local persistent cache
//!
//! A key -> JSON-string store kept in a single JSON document under the data
//! directory. Every mutation rewrites the document via a temp file and an
//! atomic rename, so readers never observe a half-written cache.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

const CACHE_FILE: &str = "cache.json";
const CACHE_TMP_FILE: &str = "cache.json.tmp";

/// Well-known cache keys
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER: &str = "user";
    pub const MOOD_ENTRIES: &str = "moodEntries";
    pub const USER_STICKERS: &str = "userStickers";

    /// Keys that belong to a logged-in session
    pub const SESSION: [&str; 4] = [TOKEN, USER, MOOD_ENTRIES, USER_STICKERS];
}

/// Errors from the local cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// On-disk document format
#[derive(Serialize, Deserialize, Default)]
struct CacheData {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// File-backed key -> JSON-string store
#[derive(Debug)]
pub struct LocalCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl LocalCache {
    /// Open (or create) the cache in `data_dir`
    pub fn open(data_dir: &Path) -> CacheResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(CACHE_FILE);

        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<CacheData>(&content) {
                Ok(data) => data.entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable cache file");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened local cache");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| CacheError::Lock(e.to_string()))
    }

    /// Raw JSON string stored under `key`
    pub fn get_raw(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    /// Store a raw JSON string and persist
    pub fn set_raw(&self, key: &str, value: String) -> CacheResult<()> {
        let mut entries = self.lock()?;
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    /// Decode the value under `key`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encode `value` under `key` and persist
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> CacheResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw)
    }

    /// Remove `key` and persist. Returns whether it was present.
    pub fn remove(&self, key: &str) -> CacheResult<bool> {
        let mut entries = self.lock()?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.persist(&entries)?;
        }
        Ok(existed)
    }

    /// Remove several keys with a single write
    pub fn remove_all(&self, keys: &[&str]) -> CacheResult<()> {
        let mut entries = self.lock()?;
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() != before {
            self.persist(&entries)?;
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> CacheResult<bool> {
        Ok(self.lock()?.contains_key(key))
    }

    /// Write the document: temp file then rename over the original
    fn persist(&self, entries: &BTreeMap<String, String>) -> CacheResult<()> {
        let data = CacheData {
            version: 1,
            entries: entries.clone(),
        };
        let json = serde_json::to_string_pretty(&data)?;

        let tmp_path = self.path.with_file_name(CACHE_TMP_FILE);
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
