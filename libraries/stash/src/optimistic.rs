//! Optimistic writes against a [`QueryCache`].
//!
//! The protocol, for one key:
//! 1. take a snapshot of the key, then apply the optimistic patch and notify listeners;
//! 2. await the real write;
//! 3. on success, mark the key stale and refetch it;
//! 4. on failure, undo the patch (rollback patch or snapshot restore), notify, and return the error.
//!
//! Runs for the same key may overlap. Nothing serializes them: the cache ends up with whatever was
//! written last, and a slow refetch from an earlier run can overwrite a newer one. Rollback patches
//! that target a single record (e.g. by client id) keep concurrent runs from undoing each other.

use std::cell::RefCell;
use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};

use crate::cache::{CacheError, QueryCache};
use crate::remote::{Remote, RemoteError};

#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("write failed: {0}")]
    Write(#[source] RemoteError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

type Patch<T> = Box<dyn FnOnce(T) -> T>;

enum Rollback<T> {
    Patch(Patch<T>),
    Restore,
}

pub struct OptimisticWrite<T> {
    key: String,
    apply: Patch<T>,
    rollback: Rollback<T>,
    revalidate: bool,
}

impl<T> OptimisticWrite<T>
where
    T: Serialize + DeserializeOwned + Default + 'static,
{
    /// A write that patches `key` with `apply` and, unless told otherwise, restores the pre-write snapshot on failure.
    pub fn new(key: impl Into<String>, apply: impl FnOnce(T) -> T + 'static) -> Self {
        Self {
            key: key.into(),
            apply: Box::new(apply),
            rollback: Rollback::Restore,
            revalidate: true,
        }
    }

    /// Undo the write with a patch instead of restoring the snapshot.
    /// Prefer this when other writes to the same key may be in flight.
    pub fn rollback_with(mut self, rollback: impl FnOnce(T) -> T + 'static) -> Self {
        self.rollback = Rollback::Patch(Box::new(rollback));
        self
    }

    /// Skip the refetch after a successful write.
    pub fn without_revalidation(mut self) -> Self {
        self.revalidate = false;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Apply the patch, then drive `write`.
    ///
    /// `write` is only polled after the patch is in the cache, so it can be built before calling this.
    pub async fn run<R, W, Out>(
        self,
        cache: &RefCell<QueryCache>,
        remote: &R,
        write: W,
    ) -> Result<Out, MutationError>
    where
        R: Remote,
        W: Future<Output = Result<Out, RemoteError>>,
    {
        let OptimisticWrite {
            key,
            apply,
            rollback,
            revalidate,
        } = self;

        let snapshot = {
            let mut cache_mut = cache.borrow_mut();
            let snapshot = cache_mut.snapshot(&key);
            cache_mut.update(&key, apply)?;
            snapshot
        };
        QueryCache::flush_notifications(cache);

        match write.await {
            Ok(out) => {
                drop(snapshot);
                if revalidate {
                    cache.borrow_mut().invalidate(&key);
                    // the write itself went through; a failed refetch leaves the entry stale
                    let _ = QueryCache::revalidate(cache, remote, &key).await;
                }
                Ok(out)
            }
            Err(e) => {
                log::warn!("Write to `{key}` failed, rolling back: {e}");
                match rollback {
                    Rollback::Patch(patch) => cache.borrow_mut().update(&key, patch)?,
                    Rollback::Restore => cache.borrow_mut().restore(snapshot),
                }
                QueryCache::flush_notifications(cache);
                Err(MutationError::Write(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryRemote, WriteRequest};
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Row {
        id: String,
        title: String,
    }

    fn row(id: &str, title: &str) -> Row {
        Row {
            id: id.to_string(),
            title: title.to_string(),
        }
    }

    fn seeded() -> (RefCell<QueryCache>, MemoryRemote, Vec<Row>) {
        let rows = vec![row("a", "first"), row("b", "second")];
        let cache = RefCell::new(QueryCache::new());
        cache.borrow_mut().set("notes", &rows).unwrap();
        let remote = MemoryRemote::new();
        remote.insert("notes", serde_json::to_value(&rows).unwrap());
        (cache, remote, rows)
    }

    fn prepend(new_row: Row) -> OptimisticWrite<Vec<Row>> {
        let id = new_row.id.clone();
        OptimisticWrite::new("notes", move |mut rows: Vec<Row>| {
            rows.insert(0, new_row);
            rows
        })
        .rollback_with(move |rows: Vec<Row>| rows.into_iter().filter(|r| r.id != id).collect())
    }

    #[test]
    fn failed_write_rolls_back_exactly() {
        let (cache, remote, rows) = seeded();
        remote.set_fail_writes(true);

        let new_row = row(&crate::new_client_id(), "draft");
        let write = remote.write(WriteRequest::post(
            "notes",
            serde_json::to_value(&new_row).unwrap(),
        ));
        let result = block_on(prepend(new_row).run(&cache, &remote, write));

        assert!(matches!(result, Err(MutationError::Write(_))));
        assert_eq!(cache.borrow().get::<Vec<Row>>("notes").unwrap(), Some(rows));
    }

    #[test]
    fn snapshot_rollback_restores_previous_value() {
        let (cache, remote, rows) = seeded();
        remote.set_fail_writes(true);

        let op = OptimisticWrite::new("notes", |_: Vec<Row>| Vec::new());
        let write = remote.write(WriteRequest::delete("notes?id=eq.a"));
        let result = block_on(op.run(&cache, &remote, write));

        assert!(result.is_err());
        assert_eq!(cache.borrow().get::<Vec<Row>>("notes").unwrap(), Some(rows));
    }

    #[test]
    fn successful_write_is_reconciled_with_server() {
        let (cache, remote, _) = seeded();

        let new_row = row("c", "third");
        let write = remote.write(WriteRequest::post(
            "notes",
            serde_json::to_value(&new_row).unwrap(),
        ));
        block_on(prepend(new_row).run(&cache, &remote, write)).unwrap();

        // the server appends, the optimistic patch prepended: server order wins after refetch
        assert_eq!(
            cache.borrow().get_raw("notes"),
            remote.resource("notes").as_ref()
        );
        assert!(!cache.borrow().is_stale("notes"));
    }

    #[test]
    fn patch_is_visible_before_write_resolves() {
        let (cache, remote, _) = seeded();
        let seen_during_write = Rc::new(Cell::new(0usize));

        let cache_ref = &cache;
        let seen = Rc::clone(&seen_during_write);
        let write = async move {
            let rows = cache_ref.borrow().get::<Vec<Row>>("notes").unwrap().unwrap();
            seen.set(rows.len());
            Ok::<_, RemoteError>(())
        };
        block_on(
            prepend(row("c", "third"))
                .without_revalidation()
                .run(&cache, &remote, write),
        )
        .unwrap();

        assert_eq!(seen_during_write.get(), 3);
    }

    #[test]
    fn listeners_see_patch_and_rollback() {
        let (cache, remote, _) = seeded();
        remote.set_fail_writes(true);
        let notifications = Rc::new(Cell::new(0));
        let n = Rc::clone(&notifications);
        cache.borrow_mut().subscribe("notes", move || n.set(n.get() + 1));

        let write = remote.write(WriteRequest::post("notes", json!({})));
        let _ = block_on(prepend(row("c", "third")).run(&cache, &remote, write));

        assert_eq!(notifications.get(), 2);
    }

    #[test]
    fn overlapping_writes_only_undo_their_own_record() {
        let (cache, remote, _) = seeded();
        remote.set_yield_on_write(true);

        let failing_row = row("failing", "will fail");
        let failing = {
            let row = failing_row.clone();
            let remote = &remote;
            async move {
                remote.set_fail_writes(true);
                let result = remote
                    .write(WriteRequest::post("notes", serde_json::to_value(&row).unwrap()))
                    .await;
                remote.set_fail_writes(false);
                result
            }
        };
        let ok_row = row("ok", "will succeed");
        let succeeding = remote.write(WriteRequest::post(
            "notes",
            serde_json::to_value(&ok_row).unwrap(),
        ));

        let (first, second) = block_on(async {
            futures::join!(
                prepend(failing_row).run(&cache, &remote, failing),
                prepend(ok_row).run(&cache, &remote, succeeding),
            )
        });

        assert!(first.is_err());
        assert!(second.is_ok());
        let cached = cache.borrow().get::<Vec<Row>>("notes").unwrap().unwrap();
        assert!(cached.iter().all(|r| r.id != "failing"));
        assert!(cached.iter().any(|r| r.id == "ok"));
        assert_eq!(
            cache.borrow().get_raw("notes"),
            remote.resource("notes").as_ref()
        );
    }
}
