//! Reminder scheduling. Delivering them is up to the host.

use chrono::{DateTime, Datelike, Days, Months, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    Daily,
    Weekly,
    Monthly,
}

impl Repeat {
    /// The `n`th occurrence after `start`. Monthly steps are counted from `start`, so a reminder on
    /// the 31st comes back to the 31st after a short month.
    fn nth_after(self, start: DateTime<Utc>, n: u32) -> Option<DateTime<Utc>> {
        match self {
            Repeat::Daily => start.checked_add_days(Days::new(u64::from(n))),
            Repeat::Weekly => start.checked_add_days(Days::new(7 * u64::from(n))),
            Repeat::Monthly => start.checked_add_months(Months::new(n)),
        }
    }

    /// A step count whose occurrence is not later than `after`. Months are counted on the calendar.
    fn steps_not_after(self, start: DateTime<Utc>, after: DateTime<Utc>) -> u32 {
        let steps = match self {
            Repeat::Daily => (after - start).num_days(),
            Repeat::Weekly => (after - start).num_days() / 7,
            Repeat::Monthly => {
                (i64::from(after.year()) - i64::from(start.year())) * 12
                    + i64::from(after.month())
                    - i64::from(start.month())
            }
        };
        u32::try_from(steps.saturating_sub(1).max(0)).unwrap_or(u32::MAX)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub remind_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub done: bool,
}

impl Reminder {
    /// The first time strictly after `after` this reminder fires.
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.done {
            return None;
        }
        if self.remind_at > after {
            return Some(self.remind_at);
        }
        let repeat = self.repeat?;

        // jump close to `after` first, then step forward
        let mut n = repeat.steps_not_after(self.remind_at, after);
        loop {
            let candidate = repeat.nth_after(self.remind_at, n)?;
            if candidate > after {
                return Some(candidate);
            }
            n = n.checked_add(1)?;
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.done && self.remind_at <= now
    }

    /// Acknowledge a fired reminder: repeating ones move to their next occurrence, others are done.
    pub fn acknowledge(&mut self, now: DateTime<Utc>) {
        match self.repeat.and_then(|_| self.next_occurrence(now)) {
            Some(next) => self.remind_at = next,
            None => self.done = true,
        }
    }
}

/// Reminders that should have fired by `now`, oldest first.
pub fn due_reminders(reminders: &[Reminder], now: DateTime<Utc>) -> Vec<&Reminder> {
    let mut due: Vec<&Reminder> = reminders.iter().filter(|r| r.is_due(now)).collect();
    due.sort_by_key(|r| r.remind_at);
    due
}
