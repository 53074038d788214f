//! Unsaved edits, mirrored to device storage so they survive a reload.
//!
//! A draft key exists exactly when there is unsaved, non-blank content: saving a blank draft removes
//! the key instead of writing it. Saving is skipped until the draft has been loaded once, otherwise
//! the first (empty) state of a screen would wipe the draft it is about to load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stash::storage::{KeyValueStore, StorageError, load_json, save_json};

use crate::exercise::ExerciseEntry;
use crate::host::Host;
use crate::mutations::Outcome;

pub const ACTIVE_SESSION_KEY: &str = "active_session";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DraftKind {
    GymSession,
    Template,
    Notes,
    Timer,
}

impl DraftKind {
    pub const fn key(self) -> &'static str {
        match self {
            DraftKind::GymSession => "gym_session_draft",
            DraftKind::Template => "template_draft",
            DraftKind::Notes => "notes_draft",
            DraftKind::Timer => "timer_draft",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub exercises: Vec<ExerciseEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Draft {
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty()
            && self.exercises.is_empty()
            && self.notes.as_deref().is_none_or(|notes| notes.trim().is_empty())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftWrite {
    Written,
    Removed,
    /// The draft was not loaded yet, so nothing was touched.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct DraftStore<S> {
    storage: S,
}

impl<S: KeyValueStore> DraftStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Absent and malformed drafts both load as `None`.
    pub fn load(&self, kind: DraftKind) -> Option<Draft> {
        load_json(&self.storage, kind.key())
    }

    pub fn save(
        &self,
        kind: DraftKind,
        draft: &Draft,
        loaded: bool,
    ) -> Result<DraftWrite, StorageError> {
        if !loaded {
            return Ok(DraftWrite::Skipped);
        }
        if draft.is_blank() {
            self.storage.remove(kind.key())?;
            return Ok(DraftWrite::Removed);
        }
        save_json(&self.storage, kind.key(), draft)
            .inspect_err(|e| log::error!("Failed to save {}: {e}", kind.key()))?;
        Ok(DraftWrite::Written)
    }

    pub fn reset(&self, kind: DraftKind) -> Result<(), StorageError> {
        self.storage.remove(kind.key())
    }

    pub fn exists(&self, kind: DraftKind) -> bool {
        self.storage.contains(kind.key()).unwrap_or(false)
    }

    pub fn start_session(
        &self,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<ActiveSession, StorageError> {
        let session = ActiveSession {
            title: title.into(),
            started_at: now,
        };
        save_json(&self.storage, ACTIVE_SESSION_KEY, &session)?;
        Ok(session)
    }

    pub fn active_session(&self) -> Option<ActiveSession> {
        load_json(&self.storage, ACTIVE_SESSION_KEY)
    }

    pub fn end_session(&self) -> Result<(), StorageError> {
        self.storage.remove(ACTIVE_SESSION_KEY)
    }
}

/// The clock of a workout in progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub title: String,
    pub started_at: DateTime<Utc>,
}

impl ActiveSession {
    pub fn elapsed(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.started_at).max(chrono::Duration::zero())
    }
}

/// The in-memory state of one draft-backed editor, plus its load guard.
#[derive(Debug)]
pub struct DraftEditor<S> {
    store: DraftStore<S>,
    kind: DraftKind,
    draft: Draft,
    loaded: bool,
}

impl<S: KeyValueStore> DraftEditor<S> {
    pub fn new(store: DraftStore<S>, kind: DraftKind) -> Self {
        Self {
            store,
            kind,
            draft: Draft::default(),
            loaded: false,
        }
    }

    pub fn kind(&self) -> DraftKind {
        self.kind
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn store(&self) -> &DraftStore<S> {
        &self.store
    }

    /// Hydrate from storage. Runs once; later calls return `false` and keep the in-memory state.
    pub fn mount(&mut self) -> bool {
        if self.loaded {
            return false;
        }
        let restored = match self.store.load(self.kind) {
            Some(draft) => {
                self.draft = draft;
                true
            }
            None => false,
        };
        self.loaded = true;
        restored
    }

    /// Change the draft and mirror the result to storage.
    pub fn edit(&mut self, f: impl FnOnce(&mut Draft)) -> Result<DraftWrite, StorageError> {
        f(&mut self.draft);
        self.store.save(self.kind, &self.draft, self.loaded)
    }

    /// Delete the exercise at `index` once the user confirms, then save.
    /// Declining, or an index past the end, leaves memory and storage as they were.
    pub fn remove_exercise(
        &mut self,
        index: usize,
        host: &impl Host,
    ) -> Result<Outcome, StorageError> {
        let Some(entry) = self.draft.exercises.get(index) else {
            log::debug!("No exercise at {index} to remove");
            return Ok(Outcome::Cancelled);
        };
        let name = if entry.name.trim().is_empty() {
            "this exercise"
        } else {
            entry.name.trim()
        };
        if !host.confirm(&format!("Remove {name} and its sets?")) {
            return Ok(Outcome::Cancelled);
        }
        self.draft.exercises.remove(index);
        self.store.save(self.kind, &self.draft, self.loaded)?;
        Ok(Outcome::Done)
    }

    /// Drop the draft: the key is removed first, and memory is only cleared if that worked.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.store.reset(self.kind)?;
        self.draft = Draft::default();
        Ok(())
    }
}
