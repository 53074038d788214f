//! Partitioning of a session's exercise list into supersets for display and editing.

use indexmap::IndexMap;

use crate::exercise::ExerciseEntry;

/// Entries with an empty `superset_id` get a `Solo` key derived from their position, so they can
/// never merge with each other or with a real superset id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Superset(String),
    Solo(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexedExercise<'a> {
    pub exercise: &'a ExerciseEntry,
    /// Position in the original list.
    pub index: usize,
}

pub type GroupedExercises<'a> = IndexMap<GroupKey, Vec<IndexedExercise<'a>>>;

/// Groups keep the position of their first member; members keep their input order.
pub fn group_exercises(exercises: &[ExerciseEntry]) -> GroupedExercises<'_> {
    let mut groups: GroupedExercises<'_> = IndexMap::new();
    for (index, exercise) in exercises.iter().enumerate() {
        let key = if exercise.superset_id.is_empty() {
            GroupKey::Solo(index)
        } else {
            GroupKey::Superset(exercise.superset_id.clone())
        };
        groups
            .entry(key)
            .or_default()
            .push(IndexedExercise { exercise, index });
    }
    groups
}

/// A borrowed view of one group, for rendering.
#[derive(Clone, Copy, Debug)]
pub struct ExerciseGroup<'g, 'a> {
    pub key: &'g GroupKey,
    pub members: &'g [IndexedExercise<'a>],
}

impl ExerciseGroup<'_, '_> {
    pub fn is_superset(&self) -> bool {
        self.members.len() > 1
    }

    pub fn label(&self) -> Option<&'static str> {
        self.is_superset().then_some("Super-Set")
    }
}

pub fn groups<'g, 'a>(
    grouped: &'g GroupedExercises<'a>,
) -> impl Iterator<Item = ExerciseGroup<'g, 'a>> {
    grouped
        .iter()
        .map(|(key, members)| ExerciseGroup { key, members })
}
