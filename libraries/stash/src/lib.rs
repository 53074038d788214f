//! This is a library for keeping a client-side copy of remote data responsive while writes are in flight.
//! It was created for Logbook, so it doesn't include much that was not needed for that project.
//!
//! Write strategy:
//! 1. Every piece of remote data lives in a [`QueryCache`] under the resource path it was fetched from.
//! 2. Screens subscribe to the keys they render and get notified whenever an entry changes.
//! 3. When the user writes something, the cache is patched first, so the change is visible immediately.
//! 4. The real request is then sent:
//!   1. If it succeeds, the key is marked stale and refetched, so the speculative value is replaced by server truth.
//!   2. If it fails, the patch is undone (either by an explicit rollback patch, or by restoring the snapshot taken before the write).
//!
//! Drafts and other device-local state go through [`storage::KeyValueStore`] instead of the cache.

pub mod cache;
pub mod optimistic;
pub mod remote;
pub mod storage;

#[cfg(feature = "supabase")]
pub mod supabase;

pub use cache::{CacheError, CacheSnapshot, ListenerKey, QueryCache};
pub use optimistic::{MutationError, OptimisticWrite};
pub use remote::{Method, Remote, RemoteError, WriteRequest};
pub use storage::{KeyValueStore, StorageError};

/// A fresh client-side identifier, used for optimistic inserts and new supersets.
pub fn new_client_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
