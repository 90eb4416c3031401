// File: ./src/storage.rs
// Local fallback persistence: two fixed keys in a durable key-value store.
use crate::model::{Dataset, default_events, default_help};
use crate::sanitize::{sanitize_collection, sanitize_event, sanitize_help};
use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg(not(target_os = "android"))]
use fs2::FileExt;

pub const EVENTS_KEY: &str = "invahelp_events";
pub const HELP_KEY: &str = "invahelp_services";

/// Minimal get/set capability the fallback needs from durable storage.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

// --- File-backed store ---

/// One JSON file per key inside `root`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the file path for a key. Keys are restricted to a safe
    /// character set so they can never escape `root`.
    pub fn path_for_key(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.root.join(format!("{}.json", safe))
    }

    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut ext = ext.to_os_string();
            ext.push(".lock");
            lock_path.set_extension(ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    #[cfg(not(target_os = "android"))]
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {:?}", lock_path))?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    #[cfg(target_os = "android")]
    pub fn with_lock<F, T>(_file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        f()
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for_key(key);
        if !path.exists() {
            return Ok(None);
        }
        Self::with_lock(&path, || {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            Ok(Some(content))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)
                .with_context(|| format!("Failed to create directory: {:?}", self.root))?;
        }
        let path = self.path_for_key(key);
        Self::with_lock(&path, || Self::atomic_write(&path, value))
    }
}

// --- In-memory store ---

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every access fails, as when storage is disabled.
    pub fn unavailable() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            unavailable: true,
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        if self.unavailable {
            return Err(anyhow!("storage unavailable"));
        }
        self.entries
            .lock()
            .map_err(|_| anyhow!("storage lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// --- Fallback adapter ---

/// Durable copy of the dataset used whenever the remote source is unavailable.
#[derive(Debug, Clone)]
pub struct LocalStore {
    kv: std::sync::Arc<dyn KeyValueStore>,
}

impl LocalStore {
    pub fn new(kv: std::sync::Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Reads both keys. Each key independently falls back to the built-in
    /// defaults when it is absent or unreadable.
    pub fn load_fallback(&self) -> Dataset {
        Dataset {
            events: self
                .load_key(EVENTS_KEY, |raw| sanitize_collection(raw, sanitize_event))
                .unwrap_or_else(default_events),
            help: self
                .load_key(HELP_KEY, |raw| sanitize_collection(raw, sanitize_help))
                .unwrap_or_else(default_help),
        }
    }

    fn load_key<T>(&self, key: &str, clean: impl Fn(&Value) -> Vec<T>) -> Option<Vec<T>> {
        match self.read_array(key) {
            Ok(Some(raw)) => Some(clean(&raw)),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Discarding stored '{}': {:#}", key, e);
                None
            }
        }
    }

    fn read_array(&self, key: &str) -> Result<Option<Value>> {
        let Some(content) = self.kv.get(key)? else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("'{}' is not valid JSON", key))?;
        if !value.is_array() {
            return Err(anyhow!("'{}' does not hold a list", key));
        }
        Ok(Some(value))
    }

    /// Writes both collections. Failures are logged, never raised.
    pub fn save_fallback(&self, data: &Dataset) {
        if let Err(e) = self.try_save(data) {
            log::error!("Failed to write local fallback: {:#}", e);
        }
    }

    pub fn try_save(&self, data: &Dataset) -> Result<()> {
        self.write_key(EVENTS_KEY, &data.events)?;
        self.write_key(HELP_KEY, &data.help)?;
        Ok(())
    }

    fn write_key<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let json = serde_json::to_string(items)?;
        self.kv.set(key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;
    use crate::model::{Event, HelpService, RecordStatus, default_dataset};
    use std::sync::Arc;

    fn memory() -> (Arc<MemoryStore>, LocalStore) {
        let kv = Arc::new(MemoryStore::new());
        let store = LocalStore::new(kv.clone());
        (kv, store)
    }

    fn sample() -> Dataset {
        Dataset::new(
            vec![Event {
                id: "e1".to_string(),
                title: "Stored".to_string(),
                contact_methods: vec!["email".to_string()],
                ..Default::default()
            }],
            vec![HelpService {
                id: "h1".to_string(),
                is_free: true,
                status: RecordStatus::Approved,
                ..Default::default()
            }],
        )
    }

    #[test]
    fn test_empty_store_yields_defaults() {
        let (_, store) = memory();
        assert_eq!(store.load_fallback(), default_dataset());
    }

    #[test]
    fn test_save_then_load() {
        let (_, store) = memory();
        store.save_fallback(&sample());
        assert_eq!(store.load_fallback(), sample());
    }

    #[test]
    fn test_empty_lists_are_not_replaced_by_defaults() {
        let (_, store) = memory();
        store.save_fallback(&Dataset::default());
        assert!(store.load_fallback().is_empty());
    }

    #[test]
    fn test_corrupt_key_does_not_affect_other_key() {
        let (kv, store) = memory();
        store.save_fallback(&sample());
        kv.set(EVENTS_KEY, "{not json").unwrap();

        let loaded = store.load_fallback();
        assert_eq!(loaded.events, default_events());
        assert_eq!(loaded.help, sample().help);
    }

    #[test]
    fn test_non_list_value_counts_as_corrupt() {
        let (kv, store) = memory();
        kv.set(HELP_KEY, "{\"id\": 1}").unwrap();
        assert_eq!(store.load_fallback().help, default_help());
    }

    #[test]
    fn test_loose_stored_rows_are_sanitized() {
        let (kv, store) = memory();
        kv.set(HELP_KEY, r#"[{"id": 7, "contacts": 79991234567}, null]"#)
            .unwrap();
        let help = store.load_fallback().help;
        assert_eq!(help.len(), 1);
        assert_eq!(help[0].id, "7");
        assert_eq!(help[0].contacts, "79991234567");
    }

    #[test]
    fn test_unavailable_storage_falls_back_to_defaults() {
        let store = LocalStore::new(Arc::new(MemoryStore::unavailable()));
        assert_eq!(store.load_fallback(), default_dataset());
        // Writes are swallowed
        store.save_fallback(&sample());
        assert!(store.try_save(&sample()).is_err());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let ctx = TestContext::new();
        let kv = Arc::new(FileStore::new(ctx.root.join("store")));
        let store = LocalStore::new(kv.clone());

        assert_eq!(kv.get(EVENTS_KEY).unwrap(), None);
        store.save_fallback(&sample());
        assert!(kv.path_for_key(EVENTS_KEY).exists());
        assert_eq!(store.load_fallback(), sample());
    }

    #[test]
    fn test_file_store_key_cannot_escape_root() {
        let kv = FileStore::new("/tmp/invahelp-root");
        let path = kv.path_for_key("../../etc/passwd");
        assert_eq!(path, PathBuf::from("/tmp/invahelp-root/etcpasswd.json"));
    }
}
