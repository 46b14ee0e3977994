//! Read-only views over stored practice sessions.
//!
//! Sessions are never modified after they are saved. "Repeat" and "modify"
//! copy the exercise snapshots out of a stored session so a new, independent
//! session can be started from them.

use crate::types::{Exercise, PracticeExerciseResult, PracticeSession};

/// Short listing of a session: the first few exercise names and how many were left out
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPreview<'a> {
    pub names: Vec<&'a str>,
    pub more: usize,
}

impl PracticeSession {
    /// First `limit` exercise names plus the count of the rest
    pub fn preview(&self, limit: usize) -> SessionPreview<'_> {
        let names: Vec<&str> = self
            .exercises
            .iter()
            .take(limit)
            .map(|e| e.exercise.name.as_str())
            .collect();
        SessionPreview {
            more: self.exercises.len() - names.len(),
            names,
        }
    }

    /// The recorded result for `exercise_id`, if it was completed
    pub fn result_for(&self, exercise_id: &str) -> Option<&PracticeExerciseResult> {
        self.exercise_data
            .iter()
            .find(|r| r.exercise_id == exercise_id)
    }

    /// Fresh exercise list for repeating or modifying this session
    ///
    /// Recorded results are stripped; the stored session is untouched.
    pub fn exercise_list(&self) -> Vec<Exercise> {
        self.exercises.iter().map(|e| e.exercise.clone()).collect()
    }

    /// Number of exercises that were completed rather than skipped
    pub fn completed_count(&self) -> usize {
        self.exercises.iter().filter(|e| !e.was_skipped()).count()
    }
}

fn plural(n: u64, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Compact duration, e.g. `"2m 5s"` or `"45s"`
pub fn format_duration_short(seconds: u64) -> String {
    let (mins, secs) = (seconds / 60, seconds % 60);
    if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Spelled-out duration, e.g. `"2 minutes 5 seconds"` or `"1 second"`
pub fn format_duration_long(seconds: u64) -> String {
    let (mins, secs) = (seconds / 60, seconds % 60);
    if mins > 0 {
        format!("{} {}", plural(mins, "minute"), plural(secs, "second"))
    } else {
        plural(secs, "second")
    }
}

/// Clock-style duration, e.g. `"1:30"`
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Whole minutes practiced, rounded to nearest
pub fn practiced_minutes(total_seconds: u64) -> u64 {
    (total_seconds + 30) / 60
}

/// Message shown when a session has been saved
pub fn completion_message(session: &PracticeSession) -> String {
    format!(
        "You practiced for {} minutes. Great work!",
        practiced_minutes(session.total_duration)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_default_catalog;
    use crate::types::SessionExercise;
    use chrono::{TimeZone, Utc};

    fn session_with(ids: &[&str], completed: &[&str]) -> PracticeSession {
        let catalog = build_default_catalog();
        let date = Utc.with_ymd_and_hms(2024, 4, 4, 9, 30, 0).unwrap();
        let exercises = catalog.resolve_ids(ids).unwrap();
        let results: Vec<PracticeExerciseResult> = exercises
            .iter()
            .filter(|e| completed.contains(&e.id.as_str()))
            .map(|e| PracticeExerciseResult {
                exercise_id: e.id.clone(),
                exercise_name: e.name.clone(),
                duration: 75,
                tempo: e.default_tempo,
                timestamp: date,
            })
            .collect();
        PracticeSession {
            id: "1712223000000".into(),
            exercises: exercises
                .into_iter()
                .map(|e| {
                    let result = results.iter().find(|r| r.exercise_id == e.id);
                    SessionExercise::merge(e, result)
                })
                .collect(),
            total_duration: 200,
            date,
            exercise_data: results,
        }
    }

    #[test]
    fn test_preview_truncates_names() {
        let session = session_with(
            &["flam_taps", "linear_fill", "shuffle_groove", "kick_endurance", "jazz_ride_pattern"],
            &[],
        );
        let preview = session.preview(3);
        assert_eq!(
            preview.names,
            vec!["Flam Taps", "Linear Fill", "Shuffle Groove"]
        );
        assert_eq!(preview.more, 2);

        let single = session_with(&["flam_taps"], &[]);
        let short = single.preview(3);
        assert_eq!(short.names, vec!["Flam Taps"]);
        assert_eq!(short.more, 0);
    }

    #[test]
    fn test_result_lookup_by_exercise_id() {
        let session = session_with(&["flam_taps", "linear_fill"], &["linear_fill"]);
        assert!(session.result_for("flam_taps").is_none());
        assert_eq!(session.result_for("linear_fill").unwrap().duration, 75);
        assert_eq!(session.completed_count(), 1);
    }

    #[test]
    fn test_exercise_list_strips_results_without_touching_session() {
        let session = session_with(&["flam_taps", "linear_fill"], &["flam_taps"]);
        let before = session.clone();

        let list = session.exercise_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "flam_taps");
        assert_eq!(session, before);
    }

    #[test]
    fn test_duration_formats() {
        assert_eq!(format_duration_short(45), "45s");
        assert_eq!(format_duration_short(125), "2m 5s");
        assert_eq!(format_duration_long(1), "1 second");
        assert_eq!(format_duration_long(61), "1 minute 1 second");
        assert_eq!(format_duration_long(125), "2 minutes 5 seconds");
        assert_eq!(format_clock(90), "1:30");
        assert_eq!(format_clock(5), "0:05");
    }

    #[test]
    fn test_completion_message_rounds_minutes() {
        let mut session = session_with(&["flam_taps"], &["flam_taps"]);
        session.total_duration = 89;
        assert_eq!(
            completion_message(&session),
            "You practiced for 1 minutes. Great work!"
        );
        session.total_duration = 90;
        assert_eq!(practiced_minutes(session.total_duration), 2);
    }
}
