//! Progress statistics.
//!
//! Raw progress entries are stored in append order, which is not guaranteed
//! to be chronological. Everything here sorts by date before looking at order.

use crate::catalog::CatalogRepository;
use crate::types::{Exercise, ProgressData, ProgressEntry};

/// Default number of entries in the recent-sessions view
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Display order for entry lists
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    NewestFirst,
    OldestFirst,
}

/// Summary of every recorded attempt at one exercise
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExerciseStats {
    pub sessions: usize,
    /// Mean duration in seconds, rounded half away from zero
    pub avg_duration: u64,
    pub max_duration: u64,
    /// Mean tempo in BPM, rounded half away from zero
    pub avg_tempo: u32,
    pub min_tempo: u32,
    pub max_tempo: u32,
    /// Entries sorted ascending by date; ties keep their stored order
    pub chronological: Vec<ProgressEntry>,
}

/// Rounded mean of non-negative values (half away from zero)
fn rounded_mean(sum: u64, count: u64) -> u64 {
    (2 * sum + count) / (2 * count)
}

/// Summarize progress entries; `None` when the exercise was never practiced
pub fn summarize(entries: &[ProgressEntry]) -> Option<ExerciseStats> {
    if entries.is_empty() {
        return None;
    }

    let count = entries.len() as u64;
    let duration_sum: u64 = entries.iter().map(|e| e.duration).sum();
    let tempo_sum: u64 = entries.iter().map(|e| e.tempo as u64).sum();

    let mut chronological = entries.to_vec();
    // sort_by_key is stable
    chronological.sort_by_key(|e| e.date);

    Some(ExerciseStats {
        sessions: entries.len(),
        avg_duration: rounded_mean(duration_sum, count),
        max_duration: entries.iter().map(|e| e.duration).max().unwrap_or(0),
        avg_tempo: rounded_mean(tempo_sum, count) as u32,
        min_tempo: entries.iter().map(|e| e.tempo).min().unwrap_or(0),
        max_tempo: entries.iter().map(|e| e.tempo).max().unwrap_or(0),
        chronological,
    })
}

impl ExerciseStats {
    /// The `limit` most recent entries, ordered by `direction`
    pub fn recent(&self, limit: usize, direction: Direction) -> Vec<&ProgressEntry> {
        let start = self.chronological.len().saturating_sub(limit);
        let window = self.chronological[start..].iter();
        match direction {
            Direction::OldestFirst => window.collect(),
            Direction::NewestFirst => window.rev().collect(),
        }
    }

    /// Chronological entries in the requested direction
    pub fn history(&self, direction: Direction) -> Vec<&ProgressEntry> {
        self.recent(self.chronological.len(), direction)
    }
}

/// An exercise together with its statistics
#[derive(Clone, Debug)]
pub struct RankedExercise<'a> {
    pub exercise: &'a Exercise,
    pub stats: ExerciseStats,
}

/// Exercises with progress, most practiced first
///
/// Exercises without entries are left out; ties keep catalog order.
pub fn rank_exercises<'a>(
    catalog: &'a CatalogRepository,
    progress: &ProgressData,
) -> Vec<RankedExercise<'a>> {
    let mut ranked: Vec<RankedExercise<'a>> = catalog
        .exercises
        .iter()
        .filter_map(|exercise| {
            let entries = progress.get(&exercise.id)?;
            summarize(entries).map(|stats| RankedExercise { exercise, stats })
        })
        .collect();
    ranked.sort_by(|a, b| b.stats.sessions.cmp(&a.stats.sessions));
    ranked
}

/// Totals across every exercise
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressOverview {
    pub exercises_practiced: usize,
    pub total_entries: usize,
    /// Sum of all recorded exercise durations in seconds
    pub total_seconds: u64,
}

/// Overall totals for a progress map, counting only non-empty exercises
pub fn overview(progress: &ProgressData) -> ProgressOverview {
    progress
        .values()
        .filter(|entries| !entries.is_empty())
        .fold(ProgressOverview::default(), |mut acc, entries| {
            acc.exercises_practiced += 1;
            acc.total_entries += entries.len();
            acc.total_seconds += entries.iter().map(|e| e.duration).sum::<u64>();
            acc
        })
}
