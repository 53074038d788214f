//! Core of a personal activity tracker.
//!
//! A UI shell owns one [`Logbook`], subscribes to the cache keys it renders, and calls the mutation
//! methods when the user saves or deletes something. Everything the shell has to provide (confirm
//! dialogs, toasts, navigation) goes through [`Host`].

pub mod analytics;
pub mod config;
pub mod disc_golf;
pub mod draft;
mod error;
pub mod exercise;
pub mod feed;
pub mod grouping;
pub mod host;
pub mod mutations;
pub mod records;
pub mod reminders;

use std::cell::RefCell;
use std::sync::LazyLock;

use stash::{KeyValueStore, ListenerKey, QueryCache, Remote};

pub use config::{Config, ConfigError};
pub use draft::{Draft, DraftEditor, DraftKind, DraftStore};
pub use error::Error;
pub use feed::{FeedItem, RawFeedItem};
pub use host::Host;
pub use mutations::Outcome;

// a static, so the backend is installed at most once per process
static LOGGER: LazyLock<()> = LazyLock::new(|| {
    #[cfg(target_arch = "wasm32")]
    wasm_logger::init(wasm_logger::Config::default());

    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Logger was already set: {e}");
        }
    }

    log::info!("Logging initialized");
});

#[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen)]
pub fn init_logging() {
    LazyLock::force(&LOGGER);
}

pub struct Logbook<R, S, H> {
    // never hold a borrow of this across an .await
    cache: RefCell<QueryCache>,
    storage: S,
    remote: R,
    host: H,
}

impl<R: Remote, S: KeyValueStore, H: Host> Logbook<R, S, H> {
    pub fn new(remote: R, storage: S, host: H) -> Self {
        init_logging();
        Self {
            cache: RefCell::new(QueryCache::new()),
            storage,
            remote,
            host,
        }
    }

    pub fn cache(&self) -> &RefCell<QueryCache> {
        &self.cache
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn drafts(&self) -> DraftStore<&S> {
        DraftStore::new(&self.storage)
    }

    pub fn draft_editor(&self, kind: DraftKind) -> DraftEditor<&S> {
        DraftEditor::new(self.drafts(), kind)
    }

    /// Call `callback` whenever the entry under `key` changes.
    pub fn subscribe(&self, key: impl Into<String>, callback: impl Fn() + 'static) -> ListenerKey {
        self.cache.borrow_mut().subscribe(key, callback)
    }

    pub fn unsubscribe(&self, listener: ListenerKey) {
        self.cache.borrow_mut().unregister_listener(listener);
    }

    /// Fetch `key` from the server and replace the cached value.
    pub async fn refresh(&self, key: &str) -> Result<(), Error> {
        QueryCache::revalidate(&self.cache, &self.remote, key).await?;
        Ok(())
    }

    /// The cached feed, parsed and sorted for display. Empty until the first refresh.
    pub fn feed(&self) -> Result<Vec<FeedItem>, Error> {
        let raw: Vec<RawFeedItem> = self
            .cache
            .borrow()
            .get(feed::FEED_KEY)?
            .unwrap_or_default();
        let mut items: Vec<FeedItem> = raw.iter().map(FeedItem::from_raw).collect();
        feed::sort_feed(&mut items);
        Ok(items)
    }

    pub fn friends(&self) -> Result<Vec<records::Friend>, Error> {
        Ok(self
            .cache
            .borrow()
            .get(mutations::FRIENDS_KEY)?
            .unwrap_or_default())
    }

    pub fn templates(&self) -> Result<Vec<records::GymTemplate>, Error> {
        Ok(self
            .cache
            .borrow()
            .get(mutations::TEMPLATES_KEY)?
            .unwrap_or_default())
    }
}

#[cfg(all(feature = "supabase", not(target_arch = "wasm32")))]
impl<H: Host> Logbook<stash::supabase::SupabaseRemote, stash::storage::FileStorage, H> {
    /// A logbook talking to the configured project, keeping drafts under `config.storage_dir`.
    pub fn connect(config: &Config, access_token: Option<String>, host: H) -> Result<Self, Error> {
        let storage = stash::storage::FileStorage::open(config.storage_dir.clone())?;
        let mut remote = stash::supabase::SupabaseRemote::new(config.supabase());
        if let Some(token) = access_token {
            remote = remote.with_access_token(token);
        }
        Ok(Self::new(remote, storage, host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;
    use stash::remote::MemoryRemote;
    use stash::storage::MemoryStorage;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Silent;

    impl Host for Silent {
        fn confirm(&self, _prompt: &str) -> bool {
            true
        }

        fn notify_error(&self, _message: &str) {}

        fn navigate(&self, _route: &str) {}
    }

    #[test]
    fn feed_is_empty_before_first_refresh() {
        let logbook = Logbook::new(MemoryRemote::new(), MemoryStorage::new(), Silent);
        assert!(logbook.feed().unwrap().is_empty());
    }

    #[test]
    fn refresh_notifies_subscribers_and_sorts_feed() {
        let remote = MemoryRemote::new();
        remote.insert(
            "feed",
            json!([
                {"table": "weight", "item": {"id": "w1", "weight": 80.0, "created_at": "2024-05-01T07:00:00Z"}},
                {"table": "weight", "item": {"id": "w2", "weight": 79.5, "created_at": "2024-05-02T07:00:00Z"}},
                {"table": "mystery", "item": {"id": "m1"}}
            ]),
        );
        let logbook = Logbook::new(remote, MemoryStorage::new(), Silent);

        let notified = Rc::new(Cell::new(0));
        let listener = logbook.subscribe("feed", {
            let notified = notified.clone();
            move || notified.set(notified.get() + 1)
        });
        block_on(logbook.refresh("feed")).unwrap();
        assert_eq!(notified.get(), 1);

        let ids: Vec<String> = logbook.feed().unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["w2", "w1", "m1"]);

        logbook.unsubscribe(listener);
        block_on(logbook.refresh("feed")).unwrap();
        assert_eq!(notified.get(), 1);
    }

    #[test]
    fn refresh_of_missing_resource_is_an_error() {
        let logbook = Logbook::new(MemoryRemote::new(), MemoryStorage::new(), Silent);
        let error = block_on(logbook.refresh("friends")).unwrap_err();
        assert!(matches!(error, Error::Remote(_)));
    }

    #[test]
    fn logging_can_be_initialized_repeatedly() {
        init_logging();
        init_logging();
    }
}
