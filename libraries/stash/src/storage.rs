//! Device-local key-value storage, shaped like the browser's `localStorage`: string keys, string values,
//! synchronous calls. Values are JSON by convention; see [`load_json`] and [`save_json`].

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fs,
    io::Write as _,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};

const FILE_EXTENSION: &str = "json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("could not serialize value for {key:?}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn keys(&self) -> Result<Vec<String>, StorageError>;

    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        (**self).keys()
    }
}

/// Read and parse a JSON value. A missing key, an unreadable store, or malformed JSON all read as `None`.
pub fn load_json<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("Failed to read {key:?} from storage: {e}");
            return None;
        }
    };
    serde_json::from_str(&raw)
        .inspect_err(|e| log::warn!("Ignoring malformed JSON under {key:?}: {e}"))
        .ok()
}

pub fn save_json<T: Serialize>(
    store: &impl KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.values.borrow().keys().cloned().collect())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.{FILE_EXTENSION}")))
    }
}

fn replace_file(tmp: &Path, path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()?;
    fs::rename(tmp, path)
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        // write next to the target and rename over it, so readers never see a partial value
        let tmp = self.root.join(format!(".{key}.{FILE_EXTENSION}.tmp"));
        if let Err(e) = replace_file(&tmp, &path, value) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                log::debug!("Could not remove {}: {cleanup}", tmp.display());
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if !stem.starts_with('.') {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// The browser's `localStorage`.
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn open() -> Result<Self, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".to_string()))?;
        Ok(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let len = self
            .storage
            .length()
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?;
        let mut keys = Vec::with_capacity(len as usize);
        for i in 0..len {
            if let Ok(Some(key)) = self.storage.key(i) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}
