//! Core domain types for the Drumlog system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises and their catalog metadata
//! - Per-exercise results recorded during a practice session
//! - Persisted practice sessions
//! - Progress entries used for statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Slowest tempo the metronome and the catalog accept (BPM)
pub const MIN_TEMPO: u32 = 40;

/// Fastest tempo the metronome and the catalog accept (BPM)
pub const MAX_TEMPO: u32 = 200;

/// Clamp a tempo into the supported metronome range
pub fn clamp_tempo(bpm: u32) -> u32 {
    bpm.clamp(MIN_TEMPO, MAX_TEMPO)
}

// ============================================================================
// Exercise Types
// ============================================================================

/// Category an exercise belongs to
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    Rudiments,
    Grooves,
    Fills,
    Coordination,
    Reading,
}

impl ExerciseCategory {
    /// Human-readable category name
    pub fn display_name(&self) -> &'static str {
        match self {
            ExerciseCategory::Rudiments => "Rudiments",
            ExerciseCategory::Grooves => "Grooves",
            ExerciseCategory::Fills => "Fills",
            ExerciseCategory::Coordination => "Coordination",
            ExerciseCategory::Reading => "Reading",
        }
    }
}

/// Difficulty rating of an exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

/// A practice exercise definition (e.g., "Single Stroke Roll")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ExerciseCategory,
    pub skills: Vec<String>,
    pub difficulty: Difficulty,
    /// Estimated practice time in minutes
    pub estimated_time: u32,
    /// Starting metronome tempo in BPM
    pub default_tempo: u32,
}

impl Exercise {
    /// Whether the exercise trains the given skill (exact match)
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s == skill)
    }
}

/// Named estimated-time bucket used by the exercise filter (inclusive bounds, minutes)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub id: String,
    pub label: String,
    pub min: u32,
    pub max: u32,
}

impl TimeRange {
    pub fn contains(&self, minutes: u32) -> bool {
        minutes >= self.min && minutes <= self.max
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Outcome of one completed exercise inside a practice session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PracticeExerciseResult {
    pub exercise_id: String,
    pub exercise_name: String,
    /// Seconds spent on the exercise
    pub duration: u64,
    /// Tempo in effect when the exercise was completed
    pub tempo: u32,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of an exercise as it was practiced, merged with its result
///
/// Skipped exercises carry no duration, tempo or timestamp.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionExercise {
    #[serde(flatten)]
    pub exercise: Exercise,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SessionExercise {
    /// Merge an exercise with its result; `None` marks a skipped exercise
    pub fn merge(exercise: Exercise, result: Option<&PracticeExerciseResult>) -> Self {
        Self {
            exercise,
            duration: result.map(|r| r.duration),
            tempo: result.map(|r| r.tempo),
            timestamp: result.map(|r| r.timestamp),
        }
    }

    pub fn was_skipped(&self) -> bool {
        self.duration.is_none()
    }
}

/// A finished, persisted practice session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSession {
    pub id: String,
    pub exercises: Vec<SessionExercise>,
    /// Wall-clock seconds from session start to finish
    pub total_duration: u64,
    /// Completion instant
    pub date: DateTime<Utc>,
    pub exercise_data: Vec<PracticeExerciseResult>,
}

// ============================================================================
// Progress Types
// ============================================================================

/// One completed attempt at an exercise, used for statistics
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEntry {
    /// Seconds spent on the exercise
    pub duration: u64,
    pub tempo: u32,
    pub date: DateTime<Utc>,
}

/// All progress entries keyed by exercise id, in insertion order per exercise
pub type ProgressData = BTreeMap<String, Vec<ProgressEntry>>;
