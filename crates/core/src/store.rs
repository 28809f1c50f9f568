//! Best-effort persistence for provider records.
//!
//! The store remembers which provider served an interface so a later visit
//! can reconnect silently. It is strictly best-effort: a missing or broken
//! backing medium degrades to a no-op with a warning, never an error, since
//! the worst outcome is that the user logs in interactively again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use skybridge_protocol::ProviderMetadata;

/// Key/value persistence for provider records.
///
/// Implementations must swallow their own failures; callers treat every
/// operation as infallible.
pub trait ProviderStore: Send + Sync {
    fn get(&self, key: &str) -> Option<ProviderMetadata>;
    fn set(&self, key: &str, record: &ProviderMetadata);
    fn remove(&self, key: &str);
}

/// Opens the store backed by `path`, degrading to a no-op when absent.
pub fn open_store(path: Option<PathBuf>) -> Arc<dyn ProviderStore> {
    match path {
        Some(path) => Arc::new(JsonFileStore::new(path)),
        None => {
            tracing::warn!(target: "skybridge.store", "no store path configured, records will not persist");
            Arc::new(NoopStore)
        }
    }
}

/// Store backed by a single JSON map file.
///
/// Each mutation loads the whole map, applies the change, and writes it
/// back. Read and write failures are logged and otherwise ignored.
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes load-modify-save cycles.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> HashMap<String, ProviderMetadata> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(
                        target: "skybridge.store",
                        path = %self.path.display(),
                        error = %e,
                        "store file is corrupt, starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(
                    target: "skybridge.store",
                    path = %self.path.display(),
                    error = %e,
                    "failed to read store file"
                );
                HashMap::new()
            }
        }
    }

    fn save(&self, map: &HashMap<String, ProviderMetadata>) {
        let contents = match serde_json::to_string_pretty(map) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(target: "skybridge.store", error = %e, "failed to encode store");
                return;
            }
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(
                    target: "skybridge.store",
                    path = %self.path.display(),
                    error = %e,
                    "failed to create store directory"
                );
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, contents) {
            tracing::warn!(
                target: "skybridge.store",
                path = %self.path.display(),
                error = %e,
                "failed to write store file"
            );
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProviderStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<ProviderMetadata> {
        let _guard = self.lock.lock();
        self.load().remove(key)
    }

    fn set(&self, key: &str, record: &ProviderMetadata) {
        let _guard = self.lock.lock();
        let mut map = self.load();
        map.insert(key.to_string(), record.clone());
        self.save(&map);
        tracing::debug!(target: "skybridge.store", key, provider = %record.name, "record saved");
    }

    fn remove(&self, key: &str) {
        let _guard = self.lock.lock();
        let mut map = self.load();
        if map.remove(key).is_some() {
            self.save(&map);
            tracing::debug!(target: "skybridge.store", key, "record removed");
        }
    }
}

/// Store that persists nothing. Every operation warns once per call.
pub struct NoopStore;

impl ProviderStore for NoopStore {
    fn get(&self, key: &str) -> Option<ProviderMetadata> {
        tracing::warn!(target: "skybridge.store", key, "store unavailable, no record");
        None
    }

    fn set(&self, key: &str, _record: &ProviderMetadata) {
        tracing::warn!(target: "skybridge.store", key, "store unavailable, record not saved");
    }

    fn remove(&self, key: &str) {
        tracing::warn!(target: "skybridge.store", key, "store unavailable, nothing to remove");
    }
}

/// In-memory store for tests and demo harnesses.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, ProviderMetadata>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProviderStore for MemoryStore {
    fn get(&self, key: &str) -> Option<ProviderMetadata> {
        self.records.lock().get(key).cloned()
    }

    fn set(&self, key: &str, record: &ProviderMetadata) {
        self.records.lock().insert(key.to_string(), record.clone());
    }

    fn remove(&self, key: &str) {
        self.records.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> ProviderMetadata {
        ProviderMetadata::new(name, format!("https://{name}.example.com"))
    }

    #[test]
    fn json_file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("records.json"));

        assert!(store.get("interface:identity").is_none());

        let saved = ProviderMetadata {
            relative_connector_path: Some("connector/".into()),
            connector_name: Some("connector.html".into()),
            connector_w: Some(400),
            connector_h: Some(500),
            ..record("crane")
        };
        store.set("interface:identity", &saved);
        assert_eq!(store.get("interface:identity").unwrap(), saved);

        store.remove("interface:identity");
        assert!(store.get("interface:identity").is_none());
    }

    #[test]
    fn json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");

        JsonFileStore::new(&path).set("interface:identity", &record("crane"));

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("interface:identity").unwrap().name, "crane");
    }

    #[test]
    fn corrupt_store_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.get("interface:identity").is_none());

        // Writing afterward replaces the corrupt file.
        store.set("interface:identity", &record("crane"));
        assert_eq!(store.get("interface:identity").unwrap().name, "crane");
    }

    #[test]
    fn noop_store_returns_nothing() {
        let store = NoopStore;
        store.set("interface:identity", &record("crane"));
        assert!(store.get("interface:identity").is_none());
    }

    #[test]
    fn open_store_without_path_is_noop() {
        let store = open_store(None);
        store.set("interface:identity", &record("crane"));
        assert!(store.get("interface:identity").is_none());
    }
}
