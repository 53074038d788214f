//! The app's writes. Each one patches the cache first, then talks to the server.
//!
//! Every rollback touches only the row its own write changed, so a failed write can't undo another
//! write to the same list. Inserts get a client-generated id and are filtered out again; deletes
//! put the removed row back where it was, unless a refetch already brought it back. Destructive
//! actions ask the host first; declining touches nothing.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use stash::{KeyValueStore, MutationError, OptimisticWrite, Remote, WriteRequest};

use crate::draft::{Draft, DraftKind};
use crate::error::Error;
use crate::feed::{CardTarget, FEED_KEY, RawFeedItem, tables};
use crate::host::{Host, routes};
use crate::records::{Friend, GymSession, GymTemplate};
use crate::Logbook;

pub const FRIENDS_KEY: &str = "friends";
pub const TEMPLATES_KEY: &str = "gym_templates";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The user declined the confirmation.
    Cancelled,
}

fn row_path(table: &str, id: &str) -> String {
    format!("{table}?id=eq.{id}")
}

/// A delete of the first row matching `matches`, for [`OptimisticWrite::rollback_with`].
fn remove_row<T>(key: &str, matches: impl Fn(&T) -> bool + Clone + 'static) -> OptimisticWrite<Vec<T>>
where
    T: serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    let removed: Rc<RefCell<Option<(usize, T)>>> = Rc::default();
    let slot = removed.clone();
    let found = matches.clone();
    OptimisticWrite::new(key, move |mut rows: Vec<T>| {
        if let Some(index) = rows.iter().position(|row| found(row)) {
            *slot.borrow_mut() = Some((index, rows.remove(index)));
        }
        rows
    })
    .rollback_with(move |mut rows: Vec<T>| {
        if let Some((index, row)) = removed.borrow_mut().take() {
            // a refetch may already have it
            if !rows.iter().any(|other| matches(other)) {
                rows.insert(index.min(rows.len()), row);
            }
        }
        rows
    })
}

impl<R: Remote, S: KeyValueStore, H: Host> Logbook<R, S, H> {
    fn report<T>(&self, result: Result<T, MutationError>) -> Result<T, Error> {
        result.map_err(|e| {
            let e = Error::from(e);
            self.host.notify_error(&e.user_message());
            e
        })
    }

    /// Save a finished workout. It shows up at the top of the feed right away; once the server has
    /// it, the session draft is dropped and the host goes back to the feed.
    pub async fn save_gym_session(
        &self,
        draft: &Draft,
        now: DateTime<Utc>,
    ) -> Result<GymSession, Error> {
        let session = GymSession::from_draft(draft, stash::new_client_id(), now);
        let feed_item = RawFeedItem::new(tables::GYM_SESSIONS, &session)?;
        let body = serde_json::to_value(&session)?;

        let id = session.id.clone();
        let write = self
            .remote
            .write(WriteRequest::post(tables::GYM_SESSIONS, body));
        let result = OptimisticWrite::new(FEED_KEY, move |mut feed: Vec<RawFeedItem>| {
            feed.insert(0, feed_item);
            feed
        })
        .rollback_with(move |feed: Vec<RawFeedItem>| {
            feed.into_iter()
                .filter(|item| !item.is(tables::GYM_SESSIONS, &id))
                .collect()
        })
        .run(&self.cache, &self.remote, write)
        .await;
        self.report(result)?;

        log::info!("Saved gym session {}", session.id);
        let drafts = self.drafts();
        if let Err(e) = drafts.reset(DraftKind::GymSession) {
            log::error!("Saved session {} but could not clear its draft: {e}", session.id);
        }
        if let Err(e) = drafts.end_session() {
            log::error!("Could not clear the session clock: {e}");
        }
        self.host.navigate(routes::FEED);
        Ok(session)
    }

    pub async fn delete_feed_item(&self, target: &CardTarget) -> Result<Outcome, Error> {
        if !self.host.confirm("Delete this entry? This can't be undone.") {
            return Ok(Outcome::Cancelled);
        }

        let table = target.table.clone();
        let id = target.id.clone();
        let write = self
            .remote
            .write(WriteRequest::delete(row_path(&target.table, &target.id)));
        let result = remove_row(FEED_KEY, move |item: &RawFeedItem| item.is(&table, &id))
            .run(&self.cache, &self.remote, write)
            .await;
        self.report(result)?;
        Ok(Outcome::Done)
    }

    pub async fn toggle_pin(&self, target: &CardTarget) -> Result<(), Error> {
        let pinned = !target.pinned;
        let set_pinned = |table: String, id: String, pinned: bool| {
            move |feed: Vec<RawFeedItem>| -> Vec<RawFeedItem> {
                feed.into_iter()
                    .map(|mut item| {
                        if item.is(&table, &id) {
                            item.pinned = pinned;
                        }
                        item
                    })
                    .collect()
            }
        };

        let write = self.remote.write(WriteRequest::patch(
            row_path(&target.table, &target.id),
            serde_json::json!({ "id": target.id, "pinned": pinned }),
        ));
        let result = OptimisticWrite::new(
            FEED_KEY,
            set_pinned(target.table.clone(), target.id.clone(), pinned),
        )
        .rollback_with(set_pinned(target.table.clone(), target.id.clone(), target.pinned))
        .run(&self.cache, &self.remote, write)
        .await;
        self.report(result)?;
        Ok(())
    }

    pub async fn add_friend(&self, user_id: &str) -> Result<Friend, Error> {
        let friend = Friend {
            id: stash::new_client_id(),
            user_id: user_id.to_string(),
            display_name: None,
        };
        let body = serde_json::to_value(&friend)?;

        let added = friend.clone();
        let id = friend.id.clone();
        let write = self.remote.write(WriteRequest::post(FRIENDS_KEY, body));
        let result = OptimisticWrite::new(FRIENDS_KEY, move |mut friends: Vec<Friend>| {
            friends.push(added);
            friends
        })
        .rollback_with(move |friends: Vec<Friend>| {
            friends.into_iter().filter(|f| f.id != id).collect()
        })
        .run(&self.cache, &self.remote, write)
        .await;
        self.report(result)?;
        Ok(friend)
    }

    pub async fn remove_friend(&self, friend: &Friend) -> Result<Outcome, Error> {
        let name = friend.display_name.as_deref().unwrap_or("this friend");
        if !self.host.confirm(&format!("Remove {name}?")) {
            return Ok(Outcome::Cancelled);
        }

        let id = friend.id.clone();
        let write = self
            .remote
            .write(WriteRequest::delete(row_path(FRIENDS_KEY, &friend.id)));
        let result = remove_row(FRIENDS_KEY, move |f: &Friend| f.id == id)
            .run(&self.cache, &self.remote, write)
            .await;
        self.report(result)?;
        Ok(Outcome::Done)
    }

    /// Save the template draft as a new template, then drop the draft and show the templates.
    pub async fn save_template(
        &self,
        draft: &Draft,
        now: DateTime<Utc>,
    ) -> Result<GymTemplate, Error> {
        let template = GymTemplate::from_draft(draft, stash::new_client_id(), now);
        let body = serde_json::to_value(&template)?;

        let added = template.clone();
        let id = template.id.clone();
        let write = self.remote.write(WriteRequest::post(TEMPLATES_KEY, body));
        let result = OptimisticWrite::new(TEMPLATES_KEY, move |mut templates: Vec<GymTemplate>| {
            templates.insert(0, added);
            templates
        })
        .rollback_with(move |templates: Vec<GymTemplate>| {
            templates.into_iter().filter(|t| t.id != id).collect()
        })
        .run(&self.cache, &self.remote, write)
        .await;
        self.report(result)?;

        if let Err(e) = self.drafts().reset(DraftKind::Template) {
            log::error!("Saved template {} but could not clear its draft: {e}", template.id);
        }
        self.host.navigate(routes::TEMPLATES);
        Ok(template)
    }

    pub async fn delete_template(&self, template: &GymTemplate) -> Result<Outcome, Error> {
        if !self
            .host
            .confirm(&format!("Delete the template \"{}\"?", template.name))
        {
            return Ok(Outcome::Cancelled);
        }

        let id = template.id.clone();
        let write = self
            .remote
            .write(WriteRequest::delete(row_path(TEMPLATES_KEY, &template.id)));
        let result = remove_row(TEMPLATES_KEY, move |t: &GymTemplate| t.id == id)
            .run(&self.cache, &self.remote, write)
            .await;
        self.report(result)?;
        Ok(Outcome::Done)
    }
}
