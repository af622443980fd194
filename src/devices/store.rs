use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::errors::{DevframeError, DevframeResult};

/// Minimal string key/value persistence the device registry writes through.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> DevframeResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> DevframeResult<()>;
}

/// One `<key>.json` file per key inside a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> DevframeResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(DevframeError::Persistence(format!("invalid storage key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> DevframeResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> DevframeResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        // Write-then-rename so a crash mid-write leaves the previous list intact.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!(path = %path.display(), bytes = value.len(), "store written");
        Ok(())
    }
}

/// In-memory store. Clones share the same entries, which lets tests
/// "reload" by building a second registry over the same store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes whose total size would exceed `bytes` fail like a full browser store.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota_bytes: Some(bytes),
        }
    }

    fn lock(&self) -> DevframeResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| DevframeError::Persistence("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> DevframeResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> DevframeResult<()> {
        let mut entries = self.lock()?;
        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(DevframeError::Persistence(format!(
                    "storage quota exceeded ({needed} > {quota} bytes)"
                )));
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
