use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{SettingsStore, StoreError, StoreKind};

/// Default location: `$XDG_DATA_HOME/bwcalc/settings.json`.
pub fn default_path() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join(".local")
                .join("share")
        });
    base.join("bwcalc").join("settings.json")
}

/// Flat string entries in a single JSON file, written through on every change.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl LocalStore {
    /// Open the store at `path`, creating an empty one if absent.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            tracing::info!(path = %path.display(), "creating local settings store");
            let empty = BTreeMap::new();
            write_entries(&path, &empty)?;
            empty
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // entries stay consistent even if a writer panicked mid-update
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn write_entries(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_err)
}

#[async_trait]
impl SettingsStore for LocalStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }

    fn location(&self) -> String {
        format!("local file {}", self.path().display())
    }

    async fn get_prefix(&self, prefix: &str) -> Result<BTreeMap<String, String>, StoreError> {
        let entries = self.lock();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.lock();
        entries.insert(key.to_string(), value.to_string());
        write_entries(&self.path, &entries)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.lock();
        let existed = entries.remove(key).is_some();
        if existed {
            write_entries(&self.path, &entries)?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = LocalStore::open(path.clone()).unwrap();
        assert!(path.is_file());
        assert_eq!(store.path(), path.as_path());
        assert_eq!(store.location(), format!("local file {}", path.display()));
        assert_eq!(store.kind(), StoreKind::Local);
    }

    #[tokio::test]
    async fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("settings.json")).unwrap();

        store.put("/bw/bwCurrentUsed", "600").await.unwrap();
        store.put("/bw/dayOfMonth/01", "40.000").await.unwrap();
        store.put("/bwother/x", "1").await.unwrap();

        let all = store.get_prefix("/bw/").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("/bw/bwCurrentUsed").map(String::as_str), Some("600"));

        assert!(store.delete("/bw/dayOfMonth/01").await.unwrap());
        assert!(!store.delete("/bw/dayOfMonth/01").await.unwrap());
        assert_eq!(store.get_prefix("/bw/dayOfMonth/").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn values_persist_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        {
            let store = LocalStore::open(path.clone()).unwrap();
            store.put("/bw/monthOfYear", "6").await.unwrap();
        }
        let reopened = LocalStore::open(path).unwrap();
        let all = reopened.get_prefix("/bw/").await.unwrap();
        assert_eq!(all.get("/bw/monthOfYear").map(String::as_str), Some("6"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        let err = LocalStore::open(path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn default_path_uses_xdg_data_home() {
        std::env::set_var("XDG_DATA_HOME", "/tmp/test_xdg_data");
        let path = default_path();
        std::env::remove_var("XDG_DATA_HOME");
        assert_eq!(path, PathBuf::from("/tmp/test_xdg_data/bwcalc/settings.json"));
    }
}
