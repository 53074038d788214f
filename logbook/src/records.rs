//! Row shapes of the record kinds, as the hosted database returns them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::pct;
use crate::draft::Draft;
use crate::exercise::{ExerciseEntry, MainGroup, SetRow};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionExercise {
    pub exercise_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub equipment: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub muscle_group: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub main_group: MainGroup,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub superset_id: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub notes: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub sets: Vec<SetRow>,
}

impl From<&ExerciseEntry> for SessionExercise {
    fn from(entry: &ExerciseEntry) -> Self {
        Self {
            exercise_id: entry.exercise_id.clone(),
            name: entry.name.clone(),
            equipment: entry.equipment.clone(),
            muscle_group: entry.muscle_group.clone(),
            main_group: entry.main_group,
            superset_id: entry.superset_id.clone(),
            notes: entry.notes.clone(),
            sets: entry.sets.iter().map(|set| set.normalized()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GymSession {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub exercises: Vec<SessionExercise>,
}

impl GymSession {
    /// The row to insert for a finished draft. `id` is generated on the client so the insert can be rolled back.
    pub fn from_draft(draft: &Draft, id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title.trim().to_string(),
            notes: draft
                .notes
                .as_ref()
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            created_at,
            duration_minutes: None,
            exercises: draft.exercises.iter().map(SessionExercise::from).collect(),
        }
    }

    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    /// Sum of weight × reps over every set.
    pub fn volume(&self) -> f64 {
        self.exercises
            .iter()
            .flat_map(|e| &e.sets)
            .map(|set| set.weight * set.reps as f64)
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub id: String,
    pub weight: f64,
    #[serde(default = "default_weight_unit", deserialize_with = "weight_unit")]
    pub unit: String,
    pub created_at: DateTime<Utc>,
}

fn default_weight_unit() -> String {
    "kg".to_string()
}

fn weight_unit<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_weight_unit))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub done: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub items: Vec<TodoItem>,
    pub created_at: DateTime<Utc>,
}

impl TodoList {
    pub fn completed(&self) -> usize {
        self.items.iter().filter(|item| item.done).count()
    }

    /// Percent of items done; an empty list is 0%.
    pub fn progress(&self) -> u32 {
        pct(self.completed() as u32, self.items.len() as u32)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GymTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub exercises: Vec<ExerciseEntry>,
    pub created_at: DateTime<Utc>,
}

impl GymTemplate {
    pub fn from_draft(draft: &Draft, id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.title.trim().to_string(),
            exercises: draft.exercises.clone(),
            created_at,
        }
    }

    /// Start a session draft from this template. Every superset gets a fresh id, so two sessions
    /// started from the same template never share group keys.
    pub fn to_draft(&self) -> Draft {
        let mut renamed: std::collections::HashMap<&str, String> = std::collections::HashMap::new();
        let exercises = self
            .exercises
            .iter()
            .map(|exercise| {
                let superset_id = if exercise.superset_id.is_empty() {
                    stash::new_client_id()
                } else {
                    renamed
                        .entry(exercise.superset_id.as_str())
                        .or_insert_with(stash::new_client_id)
                        .clone()
                };
                ExerciseEntry {
                    superset_id,
                    sets: Vec::new(),
                    ..exercise.clone()
                }
            })
            .collect();
        Draft {
            title: self.name.clone(),
            exercises,
            notes: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Friend {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::WorkoutSet;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn session_from_draft_normalizes_sets() {
        let draft = Draft {
            title: " Leg Day ".to_string(),
            exercises: vec![ExerciseEntry {
                exercise_id: "squat".to_string(),
                name: "Squat".to_string(),
                sets: vec![
                    WorkoutSet {
                        reps: Some(5),
                        ..WorkoutSet::default()
                    },
                    WorkoutSet::strength(100.0, 5),
                ],
                ..ExerciseEntry::default()
            }],
            notes: Some("   ".to_string()),
        };
        let session = GymSession::from_draft(&draft, "id-1".to_string(), at(1));

        assert_eq!(session.title, "Leg Day");
        assert_eq!(session.notes, None);
        assert_eq!(session.exercises[0].sets[0].weight, 0.0);
        assert_eq!(session.total_sets(), 2);
        assert_eq!(session.volume(), 500.0);
    }

    #[test]
    fn todo_progress() {
        let mut list = TodoList {
            id: "t".to_string(),
            title: "Groceries".to_string(),
            items: Vec::new(),
            created_at: at(1),
        };
        assert_eq!(list.progress(), 0);

        for (i, done) in [true, false, false].into_iter().enumerate() {
            list.items.push(TodoItem {
                id: i.to_string(),
                text: format!("item {i}"),
                done,
            });
        }
        assert_eq!(list.progress(), 33);
    }

    #[test]
    fn template_to_draft_renames_supersets_consistently() {
        let exercise = |name: &str, superset_id: &str| ExerciseEntry {
            exercise_id: name.to_string(),
            name: name.to_string(),
            superset_id: superset_id.to_string(),
            sets: vec![WorkoutSet::strength(50.0, 10)],
            ..ExerciseEntry::default()
        };
        let template = GymTemplate {
            id: "tpl".to_string(),
            name: "Push".to_string(),
            exercises: vec![exercise("a", "s1"), exercise("b", "s1"), exercise("c", "")],
            created_at: at(2),
        };

        let first = template.to_draft();
        let second = template.to_draft();
        assert_eq!(first.title, "Push");
        assert_eq!(first.exercises[0].superset_id, first.exercises[1].superset_id);
        assert_ne!(first.exercises[0].superset_id, "s1");
        assert!(!first.exercises[2].superset_id.is_empty());
        assert_ne!(first.exercises[0].superset_id, second.exercises[0].superset_id);
        assert!(first.exercises.iter().all(|e| e.sets.is_empty()));
    }

    #[test]
    fn weight_unit_defaults_to_kg() {
        let entry: WeightEntry = serde_json::from_str(
            r#"{"id":"w","weight":80.5,"created_at":"2024-05-01T07:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(entry.unit, "kg");
    }
}
