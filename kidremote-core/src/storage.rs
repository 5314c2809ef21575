use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::config::mkdir_if_not_exists;

pub type StorageHandle = Arc<Storage>;

/// Well-known keys of the flat key-value store.
pub mod keys {
    pub const PARENTAL_PIN: &str = "parental_pin";
    pub const CONTENT_PASSPHRASE: &str = "toddler_content_passphrase";
    pub const THEME: &str = "theme";
    pub const DEVICE_REGISTRY: &str = "device_registry";
    pub const ROKU_IP: &str = "roku_ip_address";
    pub const GOVEE_IP: &str = "govee_ip";
    pub const GOVEE_PORT: &str = "govee_port";
    pub const GOVEE_API_KEY: &str = "govee_api_key";
    pub const GOVEE_BRIGHTNESS: &str = "govee_brightness";
}

/// String-keyed persistent store.  The whole map is read on open and written
/// back on every mutation; a failed write is logged and the in-memory value
/// still takes effect.
pub struct Storage {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, String>>,
}

impl Storage {
    pub fn open(path: PathBuf) -> StorageHandle {
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                log::error!("failed to parse storage {:?}: {}", &path, err);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        log::info!("opened storage {:?} ({} entries)", &path, entries.len());
        Arc::new(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    pub fn in_memory() -> StorageHandle {
        Arc::new(Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Like `get`, but treats an empty value as missing.
    pub fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|value| !value.is_empty())
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.into());
        self.persist(&entries);
    }

    pub fn remove(&self, key: &str) {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if let Err(err) = mkdir_if_not_exists(dir) {
                log::error!("failed to create storage dir {:?}: {}", dir, err);
                return;
            }
        }
        let result = serde_json::to_vec_pretty(entries)
            .map_err(std::io::Error::from)
            .and_then(|bytes| write_atomically(path, &bytes));
        if let Err(err) = result {
            log::error!("failed to save storage {:?}: {}", path, err);
        }
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let storage = Storage::open(path.clone());
        storage.set(keys::THEME, "light");
        storage.set(keys::PARENTAL_PIN, "4321");
        storage.remove(keys::PARENTAL_PIN);

        let reopened = Storage::open(path);
        assert_eq!(reopened.get(keys::THEME).as_deref(), Some("light"));
        assert_eq!(reopened.get(keys::PARENTAL_PIN), None);
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, b"{ not json").unwrap();
        let storage = Storage::open(path);
        assert_eq!(storage.get(keys::THEME), None);
    }

    #[test]
    fn empty_values_are_missing_for_get_non_empty() {
        let storage = Storage::in_memory();
        storage.set(keys::CONTENT_PASSPHRASE, "");
        assert_eq!(storage.get(keys::CONTENT_PASSPHRASE).as_deref(), Some(""));
        assert_eq!(storage.get_non_empty(keys::CONTENT_PASSPHRASE), None);
    }
}
