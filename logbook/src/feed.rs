//! The unified activity feed.
//!
//! The server returns every record kind in one list, each row tagged with the table it came from.
//! [`FeedItem::from_raw`] turns the tag into a [`FeedRecord`] variant, and [`dispatch`] picks the
//! card for it. A new kind needs a variant, a [`FeedCard`] impl, its tag in `from_raw` and an arm
//! in `dispatch`; the compiler points at the missing arm. The item keeps the raw tag, so nothing
//! else has to learn about the new kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::disc_golf::DiscGolfRound;
use crate::records::{GymSession, Note, TodoList, WeightEntry};
use crate::reminders::{Reminder, Repeat};

pub const FEED_KEY: &str = "feed";

pub mod tables {
    pub const NOTES: &str = "notes";
    pub const GYM_SESSIONS: &str = "gym_sessions";
    pub const WEIGHT: &str = "weight";
    pub const TODO_LISTS: &str = "todo_lists";
    pub const REMINDERS: &str = "reminders";
    pub const DISC_GOLF_ROUNDS: &str = "disc_golf_rounds";
}

/// One row of the feed as it comes over the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawFeedItem {
    pub table: String,
    pub item: serde_json::Value,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub pinned: bool,
}

impl RawFeedItem {
    pub fn new<T: Serialize>(table: &str, item: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            table: table.to_string(),
            item: serde_json::to_value(item)?,
            pinned: false,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.item.get("id").and_then(serde_json::Value::as_str)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.item
            .get("created_at")
            .and_then(serde_json::Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn is(&self, table: &str, id: &str) -> bool {
        self.table == table && self.id() == Some(id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FeedRecord {
    Note(Note),
    GymSession(GymSession),
    Weight(WeightEntry),
    TodoList(TodoList),
    Reminder(Reminder),
    DiscGolfRound(DiscGolfRound),
    /// A kind this build doesn't know, or a row that doesn't match its kind's shape.
    Unknown { table: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedItem {
    pub id: String,
    table: String,
    pub pinned: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub record: FeedRecord,
}

fn parse<T: DeserializeOwned>(
    raw: &RawFeedItem,
    variant: impl FnOnce(T) -> FeedRecord,
) -> FeedRecord {
    match serde_json::from_value(raw.item.clone()) {
        Ok(record) => variant(record),
        Err(e) => {
            log::warn!("Malformed `{}` feed row: {e}", raw.table);
            FeedRecord::Unknown {
                table: raw.table.clone(),
            }
        }
    }
}

impl FeedItem {
    pub fn from_raw(raw: &RawFeedItem) -> Self {
        let record = match raw.table.as_str() {
            tables::NOTES => parse(raw, FeedRecord::Note),
            tables::GYM_SESSIONS => parse(raw, FeedRecord::GymSession),
            tables::WEIGHT => parse(raw, FeedRecord::Weight),
            tables::TODO_LISTS => parse(raw, FeedRecord::TodoList),
            tables::REMINDERS => parse(raw, FeedRecord::Reminder),
            tables::DISC_GOLF_ROUNDS => parse(raw, FeedRecord::DiscGolfRound),
            other => {
                log::debug!("Skipping feed row of unknown kind `{other}`");
                FeedRecord::Unknown {
                    table: other.to_string(),
                }
            }
        };
        Self {
            id: raw.id().unwrap_or_default().to_string(),
            table: raw.table.clone(),
            pinned: raw.pinned,
            created_at: raw.created_at(),
            record,
        }
    }

    /// The table the row came from, as the server tagged it.
    pub fn table(&self) -> &str {
        &self.table
    }
}

/// Pinned items first, then newest first. Items without a timestamp sink to the bottom of their half.
pub fn sort_feed(items: &mut [FeedItem]) {
    items.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// What a card shows for one record.
pub trait FeedCard {
    fn title(&self) -> String;

    fn summary(&self) -> String;
}

const SUMMARY_CHARS: usize = 140;

fn excerpt(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= SUMMARY_CHARS {
        return text.to_string();
    }
    let mut excerpt: String = text.chars().take(SUMMARY_CHARS).collect();
    excerpt.push('…');
    excerpt
}

fn plural(n: usize, word: &str) -> String {
    format!("{n} {word}{}", if n == 1 { "" } else { "s" })
}

impl FeedCard for Note {
    fn title(&self) -> String {
        if self.title.trim().is_empty() {
            self.notes.lines().next().unwrap_or("Note").trim().to_string()
        } else {
            self.title.clone()
        }
    }

    fn summary(&self) -> String {
        excerpt(&self.notes)
    }
}

impl FeedCard for GymSession {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn summary(&self) -> String {
        format!(
            "{}, {}",
            plural(self.exercises.len(), "exercise"),
            plural(self.total_sets(), "set")
        )
    }
}

impl FeedCard for WeightEntry {
    fn title(&self) -> String {
        format!("{} {}", self.weight, self.unit)
    }

    fn summary(&self) -> String {
        "Weigh-in".to_string()
    }
}

impl FeedCard for TodoList {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn summary(&self) -> String {
        format!(
            "{}/{} done ({}%)",
            self.completed(),
            self.items.len(),
            self.progress()
        )
    }
}

impl FeedCard for Reminder {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn summary(&self) -> String {
        let when = self.remind_at.format("%Y-%m-%d %H:%M");
        match self.repeat {
            None => when.to_string(),
            Some(Repeat::Daily) => format!("{when}, daily"),
            Some(Repeat::Weekly) => format!("{when}, weekly"),
            Some(Repeat::Monthly) => format!("{when}, monthly"),
        }
    }
}

impl FeedCard for DiscGolfRound {
    fn title(&self) -> String {
        self.course_name.clone()
    }

    fn summary(&self) -> String {
        let players = plural(self.scorecards.len(), "player");
        match self.leaderboard().first() {
            Some(leader) => format!("{players}, {} at {:+}", leader.player, leader.to_par()),
            None => players,
        }
    }
}

/// Identifies the record a card action applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardTarget {
    pub table: String,
    pub id: String,
    pub pinned: bool,
}

/// The actions every card offers, whatever its kind.
pub trait FeedCallbacks {
    fn toggle_pin(&self, target: &CardTarget);

    fn delete(&self, target: &CardTarget);

    fn expand(&self, target: &CardTarget);

    fn edit(&self, target: &CardTarget);
}

pub struct CardView<'a> {
    pub target: CardTarget,
    pub title: String,
    pub summary: String,
    pub created_at: Option<DateTime<Utc>>,
    callbacks: &'a dyn FeedCallbacks,
}

impl std::fmt::Debug for CardView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardView")
            .field("target", &self.target)
            .field("title", &self.title)
            .field("summary", &self.summary)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl CardView<'_> {
    pub fn toggle_pin(&self) {
        self.callbacks.toggle_pin(&self.target);
    }

    pub fn delete(&self) {
        self.callbacks.delete(&self.target);
    }

    pub fn expand(&self) {
        self.callbacks.expand(&self.target);
    }

    pub fn edit(&self) {
        self.callbacks.edit(&self.target);
    }
}

/// The card for `item`, or `None` when its kind has no card.
pub fn dispatch<'a>(item: &FeedItem, callbacks: &'a dyn FeedCallbacks) -> Option<CardView<'a>> {
    let card: &dyn FeedCard = match &item.record {
        FeedRecord::Note(note) => note,
        FeedRecord::GymSession(session) => session,
        FeedRecord::Weight(entry) => entry,
        FeedRecord::TodoList(list) => list,
        FeedRecord::Reminder(reminder) => reminder,
        FeedRecord::DiscGolfRound(round) => round,
        FeedRecord::Unknown { .. } => return None,
    };
    Some(CardView {
        target: CardTarget {
            table: item.table().to_string(),
            id: item.id.clone(),
            pinned: item.pinned,
        },
        title: card.title(),
        summary: card.summary(),
        created_at: item.created_at,
        callbacks,
    })
}
