//! # QueryCache
//! The cache holds one JSON value per resource path. It is meant to be owned by the app context inside a
//! `RefCell` and passed around explicitly, so each test can build its own instance.
//!
//! Listeners are never called while the cache is borrowed. Mutations only record which keys changed;
//! [`QueryCache::flush_notifications`] releases the borrow before calling anyone, so a listener is free to read the cache.

use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use slotmap::{SlotMap, new_key_type};

use crate::remote::{Remote, RemoteError};

new_key_type! {
    pub struct ListenerKey;
}

type Listener = Rc<dyn Fn(ListenerKey, &str)>;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cached value under `{key}` does not have the expected shape: {source}")]
    Shape {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("value for `{key}` could not be serialized: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
    pub stale: bool,
}

/// The value of one key as it was right before an optimistic write.
/// `previous` is `None` if the key was not cached at all.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheSnapshot {
    key: String,
    previous: Option<CacheEntry>,
}

impl CacheSnapshot {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn previous(&self) -> Option<&serde_json::Value> {
        self.previous.as_ref().map(|entry| &entry.value)
    }
}

#[derive(Default)]
pub struct QueryCache {
    entries: im::HashMap<String, CacheEntry>,
    listeners: SlotMap<ListenerKey, Listener>,
    pending: BTreeSet<String>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries)
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending)
            .finish()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_raw(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.get_raw(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|source| CacheError::Shape {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    pub fn set_raw(&mut self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        self.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                updated_at: Utc::now(),
                stale: false,
            },
        );
        self.pending.insert(key);
    }

    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<(), CacheError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|source| CacheError::Serialize {
            key: key.clone(),
            source,
        })?;
        self.set_raw(key, value);
        Ok(())
    }

    /// Replace the value under `key` with `f(current)`. A missing key starts from `T::default()`.
    pub fn update<T, F>(&mut self, key: &str, f: F) -> Result<(), CacheError>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(T) -> T,
    {
        let current = self.get::<T>(key)?.unwrap_or_default();
        let stale = self.is_stale(key);
        self.set(key, &f(current))?;
        if stale {
            self.invalidate(key);
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        let removed = self.entries.remove(key).map(|entry| entry.value);
        if removed.is_some() {
            self.pending.insert(key.to_string());
        }
        removed
    }

    /// Mark a key as needing a refetch. The value stays readable until the refetch lands.
    pub fn invalidate(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.stale = true;
        }
    }

    pub fn is_stale(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.stale)
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn snapshot(&self, key: &str) -> CacheSnapshot {
        CacheSnapshot {
            key: key.to_string(),
            previous: self.entries.get(key).cloned(),
        }
    }

    /// Put a key back exactly as it was when the snapshot was taken.
    pub fn restore(&mut self, snapshot: CacheSnapshot) {
        let CacheSnapshot { key, previous } = snapshot;
        match previous {
            Some(entry) => {
                self.entries.insert(key.clone(), entry);
            }
            None => {
                self.entries.remove(&key);
            }
        }
        self.pending.insert(key);
    }

    /// Register a listener that is called with the key of every entry that changes.
    pub fn register_listener(&mut self, listener: impl Fn(ListenerKey, &str) + 'static) -> ListenerKey {
        self.listeners.insert(Rc::new(listener))
    }

    /// Register a listener for a single key.
    pub fn subscribe(&mut self, key: impl Into<String>, callback: impl Fn() + 'static) -> ListenerKey {
        let key = key.into();
        self.register_listener(move |_, changed| {
            if changed == key {
                callback();
            }
        })
    }

    pub fn unregister_listener(&mut self, key: ListenerKey) {
        self.listeners.remove(key);
    }

    pub fn has_pending_notifications(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Call listeners for every key changed since the last flush.
    pub fn flush_notifications(cache: &RefCell<QueryCache>) {
        let (changed, listeners) = {
            let mut cache = cache.borrow_mut();
            if cache.pending.is_empty() {
                return;
            }
            let changed = std::mem::take(&mut cache.pending);
            let listeners: Vec<(ListenerKey, Listener)> = cache
                .listeners
                .iter()
                .map(|(listener_key, listener)| (listener_key, Rc::clone(listener)))
                .collect();
            (changed, listeners)
        };

        for key in &changed {
            for (listener_key, listener) in &listeners {
                listener(*listener_key, key);
            }
        }
    }

    /// Refetch `key` from the remote and replace the cached value with the response.
    pub async fn revalidate<R: Remote>(
        cache: &RefCell<QueryCache>,
        remote: &R,
        key: &str,
    ) -> Result<(), RemoteError> {
        let value = remote.fetch(key).await.inspect_err(|e| {
            log::warn!("Failed to revalidate `{key}`: {e}");
        })?;
        cache.borrow_mut().set_raw(key, value);
        Self::flush_notifications(cache);
        Ok(())
    }
}
