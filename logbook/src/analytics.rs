//! Calendar bucketing and aggregation behind the history charts.
//!
//! Everything here is a pure function over records that are already in memory.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};

use crate::exercise::{MainGroup, MainGroupMap};
use crate::records::GymSession;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RangeKind {
    Week,
    Month,
    Year,
}

/// Inclusive bounds of a chart window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        days_in(self.start, self.end)
    }
}

fn sub_months(day: NaiveDate, months: u32) -> NaiveDate {
    day.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

fn sub_days(day: NaiveDate, days: u64) -> NaiveDate {
    day.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// The window `offset` periods before the one ending on `reference`.
///
/// A week is the 7 days ending on the reference day; months and years are calendar deltas. For
/// years, the start never precedes `earliest` (the first day with data), so young histories don't
/// render as a mostly empty year.
pub fn date_range(
    reference: NaiveDate,
    kind: RangeKind,
    offset: u32,
    earliest: Option<NaiveDate>,
) -> DateRange {
    match kind {
        RangeKind::Week => {
            let end = sub_days(reference, 7 * u64::from(offset));
            DateRange {
                start: sub_days(end, 6),
                end,
            }
        }
        RangeKind::Month => {
            let end = sub_months(reference, offset);
            DateRange {
                start: sub_months(end, 1),
                end,
            }
        }
        RangeKind::Year => {
            let end = sub_months(reference, offset.saturating_mul(12));
            let naive_start = sub_months(end, 12);
            let start = match earliest {
                Some(earliest) if naive_start < earliest && earliest <= end => earliest,
                _ => naive_start,
            };
            DateRange { start, end }
        }
    }
}

/// Every calendar day from `start` to `end`, both included. Empty when `start > end`.
pub fn days_in(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// A value for every day of `[start, end]` from sparse points.
///
/// A day without a point repeats the last value seen, starting from the latest point before the
/// window. Days before any point are `None`. When several points fall on one day, the last one wins.
pub fn carry_forward_series(
    points: &[(NaiveDate, f64)],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<(NaiveDate, Option<f64>)> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for &(day, value) in points {
        by_day.insert(day, value);
    }

    let mut carried = by_day.range(..start).next_back().map(|(_, value)| *value);
    days_in(start, end)
        .map(|day| {
            if let Some(value) = by_day.get(&day) {
                carried = Some(*value);
            }
            (day, carried)
        })
        .collect()
}

/// `made / attempted` as a whole percentage. Nothing attempted is 0%.
#[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen)]
pub fn pct(made: u32, attempted: u32) -> u32 {
    if attempted == 0 {
        return 0;
    }
    (f64::from(made) / f64::from(attempted) * 100.0).round() as u32
}

/// Number of logged sets per main muscle group.
pub fn muscle_group_distribution(sessions: &[GymSession]) -> MainGroupMap<u32> {
    let mut counts = MainGroupMap::<u32>::default();
    for exercise in sessions.iter().flat_map(|s| &s.exercises) {
        *counts.get_mut(&exercise.main_group) += exercise.sets.len() as u32;
    }
    counts
}

/// The distribution as whole percentages of all sets.
pub fn muscle_group_percentages(counts: &MainGroupMap<u32>) -> MainGroupMap<u32> {
    let total: u32 = counts.iter().map(|(_, count)| *count).sum();
    MainGroupMap::from_fn(|group: MainGroup| pct(*counts.get(&group), total))
}

/// Sessions per day over `[start, end]`, zero-filled.
pub fn workout_heatmap(
    sessions: &[GymSession],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<(NaiveDate, u32)> {
    let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
    for session in sessions {
        *per_day.entry(session.created_at.date_naive()).or_default() += 1;
    }
    days_in(start, end)
        .map(|day| (day, per_day.get(&day).copied().unwrap_or(0)))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bucket {
    Day,
    /// Weeks start on Monday.
    Week,
    Month,
    Year,
}

impl Bucket {
    /// The first day of the bucket `day` falls in.
    pub fn start_of(self, day: NaiveDate) -> NaiveDate {
        match self {
            Bucket::Day => day,
            Bucket::Week => sub_days(day, u64::from(day.weekday().num_days_from_monday())),
            Bucket::Month => day.with_day(1).unwrap_or(day),
            Bucket::Year => day.with_ordinal(1).unwrap_or(day),
        }
    }
}

/// Counts per bucket, keyed by the bucket's first day. Empty buckets are absent.
pub fn bucket_counts(
    dates: impl IntoIterator<Item = NaiveDate>,
    bucket: Bucket,
) -> BTreeMap<NaiveDate, u32> {
    let mut counts = BTreeMap::new();
    for day in dates {
        *counts.entry(bucket.start_of(day)).or_default() += 1;
    }
    counts
}

#[derive(Clone, Debug, PartialEq)]
pub struct PersonalRecord {
    pub exercise_id: String,
    pub name: String,
    pub weight: f64,
    pub reps: u32,
    pub achieved_at: DateTime<Utc>,
}

/// The heaviest set of every exercise, sorted by exercise name. On equal weight the earlier set
/// keeps the record. Sets without weight don't count.
pub fn personal_records(sessions: &[GymSession]) -> Vec<PersonalRecord> {
    let mut records: HashMap<&str, PersonalRecord> = HashMap::new();
    for session in sessions {
        for exercise in &session.exercises {
            for set in exercise.sets.iter().filter(|set| set.weight > 0.0) {
                let beats = |current: &PersonalRecord| {
                    set.weight > current.weight
                        || (set.weight == current.weight && session.created_at < current.achieved_at)
                };
                if records
                    .get(exercise.exercise_id.as_str())
                    .is_none_or(beats)
                {
                    records.insert(
                        &exercise.exercise_id,
                        PersonalRecord {
                            exercise_id: exercise.exercise_id.clone(),
                            name: exercise.name.clone(),
                            weight: set.weight,
                            reps: set.reps,
                            achieved_at: session.created_at,
                        },
                    );
                }
            }
        }
    }

    let mut records: Vec<PersonalRecord> = records.into_values().collect();
    records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.exercise_id.cmp(&b.exercise_id)));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::SetRow;
    use crate::records::SessionExercise;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn session(d: u32, exercises: Vec<SessionExercise>) -> GymSession {
        GymSession {
            id: format!("session-{d}"),
            title: "Workout".to_string(),
            notes: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, d, 18, 0, 0).unwrap(),
            duration_minutes: None,
            exercises,
        }
    }

    fn exercise(id: &str, main_group: MainGroup, weights: &[f64]) -> SessionExercise {
        SessionExercise {
            exercise_id: id.to_string(),
            name: id.to_string(),
            equipment: String::new(),
            muscle_group: String::new(),
            main_group,
            superset_id: String::new(),
            notes: String::new(),
            sets: weights
                .iter()
                .map(|&weight| SetRow {
                    weight,
                    reps: 5,
                    ..SetRow::default()
                })
                .collect(),
        }
    }

    #[test]
    fn percentages_round_and_never_divide_by_zero() {
        assert_eq!(pct(0, 0), 0);
        assert_eq!(pct(5, 0), 0);
        assert_eq!(pct(3, 4), 75);
        assert_eq!(pct(1, 3), 33);
        assert_eq!(pct(2, 3), 67);
    }

    #[test]
    fn week_ranges_step_back_seven_days() {
        let reference = day(2024, 5, 15);
        assert_eq!(
            date_range(reference, RangeKind::Week, 0, None),
            DateRange {
                start: day(2024, 5, 9),
                end: day(2024, 5, 15)
            }
        );
        assert_eq!(
            date_range(reference, RangeKind::Week, 1, None),
            DateRange {
                start: day(2024, 5, 2),
                end: day(2024, 5, 8)
            }
        );
    }

    #[test]
    fn month_ranges_use_calendar_months() {
        let range = date_range(day(2024, 3, 31), RangeKind::Month, 1, None);
        assert_eq!(range.end, day(2024, 2, 29));
        assert_eq!(range.start, day(2024, 1, 29));
    }

    #[test]
    fn year_start_is_clamped_to_earliest_data() {
        let reference = day(2024, 5, 15);
        let earliest = Some(day(2024, 1, 10));
        let range = date_range(reference, RangeKind::Year, 0, earliest);
        assert_eq!(range.start, day(2024, 1, 10));
        assert_eq!(range.end, reference);

        // a window that ends before any data keeps its naive bounds
        let range = date_range(reference, RangeKind::Year, 1, earliest);
        assert_eq!(range.start, day(2022, 5, 15));
        assert_eq!(range.end, day(2023, 5, 15));
    }

    #[test]
    fn carry_forward_fills_gaps() {
        let points = [(day(2024, 5, 1), 80.0), (day(2024, 5, 5), 78.0)];
        let series = carry_forward_series(&points, day(2024, 5, 1), day(2024, 5, 7));
        let values: Vec<Option<f64>> = series.iter().map(|(_, v)| *v).collect();
        assert_eq!(
            values,
            [80.0, 80.0, 80.0, 80.0, 78.0, 78.0, 78.0].map(Some).to_vec()
        );
    }

    #[test]
    fn carry_forward_uses_prior_point_and_leaves_early_days_empty() {
        let points = [(day(2024, 4, 20), 81.0)];
        let series = carry_forward_series(&points, day(2024, 5, 1), day(2024, 5, 2));
        assert_eq!(series[0].1, Some(81.0));

        let points = [(day(2024, 5, 3), 79.0)];
        let values: Vec<Option<f64>> = carry_forward_series(&points, day(2024, 5, 1), day(2024, 5, 4))
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        assert_eq!(values, vec![None, None, Some(79.0), Some(79.0)]);
    }

    #[test]
    fn distribution_counts_sets() {
        let sessions = vec![
            session(1, vec![exercise("bench", MainGroup::Chest, &[60.0, 60.0, 60.0])]),
            session(2, vec![exercise("squat", MainGroup::Legs, &[100.0])]),
        ];
        let counts = muscle_group_distribution(&sessions);
        assert_eq!(counts.chest, 3);
        assert_eq!(counts.legs, 1);
        assert_eq!(counts.back, 0);

        let shares = muscle_group_percentages(&counts);
        assert_eq!(shares.chest, 75);
        assert_eq!(shares.legs, 25);
        assert_eq!(muscle_group_percentages(&MainGroupMap::default()).chest, 0);
    }

    #[test]
    fn heatmap_is_zero_filled() {
        let sessions = vec![session(2, vec![]), session(2, vec![]), session(4, vec![])];
        let heatmap = workout_heatmap(&sessions, day(2024, 5, 1), day(2024, 5, 4));
        let counts: Vec<u32> = heatmap.iter().map(|(_, n)| *n).collect();
        assert_eq!(counts, vec![0, 2, 0, 1]);
    }

    #[test]
    fn buckets_are_keyed_by_their_first_day() {
        // 2024-05-06 is a Monday
        let dates = [day(2024, 5, 6), day(2024, 5, 12), day(2024, 5, 13), day(2024, 6, 1)];
        let weeks = bucket_counts(dates, Bucket::Week);
        assert_eq!(
            weeks.into_iter().collect::<Vec<_>>(),
            vec![(day(2024, 5, 6), 2), (day(2024, 5, 13), 1), (day(2024, 5, 27), 1)]
        );
        let months = bucket_counts(dates, Bucket::Month);
        assert_eq!(months.get(&day(2024, 5, 1)), Some(&3));
        assert_eq!(bucket_counts(dates, Bucket::Year).get(&day(2024, 1, 1)), Some(&4));
    }

    #[test]
    fn personal_records_keep_the_heaviest_earliest_set() {
        let sessions = vec![
            session(1, vec![exercise("squat", MainGroup::Legs, &[100.0, 110.0])]),
            session(3, vec![exercise("squat", MainGroup::Legs, &[110.0])]),
            session(2, vec![exercise("bench", MainGroup::Chest, &[0.0, 80.0])]),
        ];
        let records = personal_records(&sessions);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "bench");
        assert_eq!(records[0].weight, 80.0);
        assert_eq!(records[1].weight, 110.0);
        assert_eq!(records[1].achieved_at, sessions[0].created_at);
    }
}
