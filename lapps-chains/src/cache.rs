use crate::traits::MetadataCache;
use crate::types::{LappsError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Process-local cache, used by tests and one-off runs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn put(&self, key: &str, value: &Value) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| LappsError::General(format!("Cache lock poisoned: {}", e)))?;
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// One pretty-printed JSON file per key under `root`. A key such as
/// `metadata/anc:gate.tokenizer_2.2.0` is stored at
/// `<root>/metadata/anc:gate.tokenizer_2.2.0.json`.
///
/// Nothing expires; delete the files to force a refresh.
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    root: PathBuf,
}

impl DirectoryCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.split('/').filter(|s| !s.is_empty() && *s != "..") {
            path.push(segment);
        }
        path.set_file_name(format!(
            "{}.json",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("entry")
        ));
        path
    }
}

impl MetadataCache for DirectoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => {
                debug!("Loaded {} from local cache", key);
                Some(value)
            }
            Err(e) => {
                warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn put(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        debug!("Cached {} at {}", key, path.display());
        Ok(())
    }
}
