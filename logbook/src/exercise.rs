use enumap::EnuMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Nullable columns come back as `null`; read those the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(
    EnuMap, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum MainGroup {
    Chest,
    Back,
    Legs,
    Shoulders,
    Arms,
    Core,
    Cardio,
    #[default]
    Other,
}

impl From<String> for MainGroup {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "chest" => MainGroup::Chest,
            "back" => MainGroup::Back,
            "legs" => MainGroup::Legs,
            "shoulders" => MainGroup::Shoulders,
            "arms" => MainGroup::Arms,
            "core" => MainGroup::Core,
            "cardio" => MainGroup::Cardio,
            _ => MainGroup::Other,
        }
    }
}

impl std::fmt::Display for MainGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MainGroup::Chest => "Chest",
            MainGroup::Back => "Back",
            MainGroup::Legs => "Legs",
            MainGroup::Shoulders => "Shoulders",
            MainGroup::Arms => "Arms",
            MainGroup::Core => "Core",
            MainGroup::Cardio => "Cardio",
            MainGroup::Other => "Other",
        };
        write!(f, "{name}")
    }
}

/// An entry of the exercise catalog the user picks from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogExercise {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub equipment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub muscle_group: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub main_group: MainGroup,
}

/// One logged set. Strength sets use weight/reps/rpe, cardio sets use time/distance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpe: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

/// A set as it is saved: every measurement present, missing ones as 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SetRow {
    pub weight: f64,
    pub reps: u32,
    pub rpe: f64,
    pub time_min: f64,
    pub distance_meters: f64,
}

impl WorkoutSet {
    pub fn strength(weight: f64, reps: u32) -> Self {
        Self {
            weight: Some(weight),
            reps: Some(reps),
            ..Self::default()
        }
    }

    pub fn cardio(time_min: f64, distance_meters: f64) -> Self {
        Self {
            time_min: Some(time_min),
            distance_meters: Some(distance_meters),
            ..Self::default()
        }
    }

    pub fn normalized(&self) -> SetRow {
        SetRow {
            weight: self.weight.unwrap_or(0.0),
            reps: self.reps.unwrap_or(0),
            rpe: self.rpe.unwrap_or(0.0),
            time_min: self.time_min.unwrap_or(0.0),
            distance_meters: self.distance_meters.unwrap_or(0.0),
        }
    }
}

/// An exercise inside a session or template being edited.
///
/// Entries sharing a non-empty `superset_id` form one superset. Entries created through
/// [`ExerciseEntry::from_catalog`] always get their own fresh id, so they start out solo.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub exercise_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub equipment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub muscle_group: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub main_group: MainGroup,
    #[serde(default, deserialize_with = "null_as_default")]
    pub superset_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sets: Vec<WorkoutSet>,
}

impl ExerciseEntry {
    pub fn from_catalog(exercise: &CatalogExercise) -> Self {
        Self {
            exercise_id: exercise.id.clone(),
            name: exercise.name.clone(),
            equipment: exercise.equipment.clone(),
            muscle_group: exercise.muscle_group.clone(),
            main_group: exercise.main_group,
            superset_id: stash::new_client_id(),
            notes: String::new(),
            sets: Vec::new(),
        }
    }

    pub fn is_cardio(&self) -> bool {
        self.main_group == MainGroup::Cardio
    }

    /// Append a set, prefilled from the last one so repeated sets are one tap.
    pub fn add_set(&mut self) -> &mut WorkoutSet {
        let next = self.sets.last().cloned().unwrap_or_default();
        self.sets.push(next);
        let last = self.sets.len() - 1;
        &mut self.sets[last]
    }

    pub fn remove_set(&mut self, index: usize) -> Option<WorkoutSet> {
        (index < self.sets.len()).then(|| self.sets.remove(index))
    }
}

/// Put the entries at `indices` into one new superset. Needs at least two distinct, valid indices.
pub fn link_superset(entries: &mut [ExerciseEntry], indices: &[usize]) -> Option<String> {
    let mut indices: Vec<usize> = indices
        .iter()
        .copied()
        .filter(|&i| i < entries.len())
        .collect();
    indices.sort_unstable();
    indices.dedup();
    if indices.len() < 2 {
        return None;
    }

    let superset_id = stash::new_client_id();
    for i in indices {
        entries[i].superset_id = superset_id.clone();
    }
    Some(superset_id)
}

/// Take one entry out of its superset.
pub fn unlink(entries: &mut [ExerciseEntry], index: usize) -> bool {
    match entries.get_mut(index) {
        Some(entry) => {
            entry.superset_id = stash::new_client_id();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(name: &str, main_group: MainGroup) -> CatalogExercise {
        CatalogExercise {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            equipment: "barbell".to_string(),
            muscle_group: "quads".to_string(),
            main_group,
        }
    }

    #[test]
    fn catalog_entries_start_solo() {
        let a = ExerciseEntry::from_catalog(&catalog("Squat", MainGroup::Legs));
        let b = ExerciseEntry::from_catalog(&catalog("Squat", MainGroup::Legs));
        assert!(!a.superset_id.is_empty());
        assert_ne!(a.superset_id, b.superset_id);
    }

    #[test]
    fn link_and_unlink() {
        let mut entries = vec![
            ExerciseEntry::from_catalog(&catalog("Bench Press", MainGroup::Chest)),
            ExerciseEntry::from_catalog(&catalog("Row", MainGroup::Back)),
            ExerciseEntry::from_catalog(&catalog("Curl", MainGroup::Arms)),
        ];

        assert_eq!(link_superset(&mut entries, &[1, 1]), None);
        assert_eq!(link_superset(&mut entries, &[0, 9]), None);

        let id = link_superset(&mut entries, &[0, 2]).unwrap();
        assert_eq!(entries[0].superset_id, id);
        assert_eq!(entries[2].superset_id, id);
        assert_ne!(entries[1].superset_id, id);

        assert!(unlink(&mut entries, 2));
        assert_ne!(entries[2].superset_id, id);
        assert!(!unlink(&mut entries, 3));
    }

    #[test]
    fn add_set_copies_previous_values() {
        let mut entry = ExerciseEntry::from_catalog(&catalog("Squat", MainGroup::Legs));
        assert_eq!(*entry.add_set(), WorkoutSet::default());
        *entry.add_set() = WorkoutSet::strength(100.0, 5);
        assert_eq!(*entry.add_set(), WorkoutSet::strength(100.0, 5));
        assert_eq!(entry.sets.len(), 3);
        assert_eq!(entry.remove_set(0), Some(WorkoutSet::default()));
        assert_eq!(entry.remove_set(5), None);
    }

    #[test]
    fn normalized_sets_fill_missing_with_zero() {
        let row = WorkoutSet::cardio(30.0, 5000.0).normalized();
        assert_eq!(
            row,
            SetRow {
                weight: 0.0,
                reps: 0,
                rpe: 0.0,
                time_min: 30.0,
                distance_meters: 5000.0,
            }
        );
    }

    #[test]
    fn main_group_parses_leniently() {
        let entry: ExerciseEntry = serde_json::from_str(
            r#"{"exercise_id":"1","name":"Run","main_group":"Cardio"}"#,
        )
        .unwrap();
        assert!(entry.is_cardio());
        assert_eq!(entry.superset_id, "");

        let group: MainGroup = serde_json::from_str(r#""glutes""#).unwrap();
        assert_eq!(group, MainGroup::Other);
        assert_eq!(serde_json::to_string(&MainGroup::Shoulders).unwrap(), r#""shoulders""#);
    }
}
