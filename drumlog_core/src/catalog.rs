//! Built-in exercise catalog.
//!
//! The catalog is read-only reference data: the exercise definitions, the
//! named time-range presets used by the filter, and the skill vocabulary.
//! Callers construct a [`CatalogRepository`] (or borrow the cached default)
//! and pass it explicitly to the filter, recorder and aggregator.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<CatalogRepository> = Lazy::new(build_default_catalog_internal);

/// Skills an exercise may be tagged with
pub const SKILL_OPTIONS: &[&str] = &[
    "Speed",
    "Control",
    "Endurance",
    "Timing",
    "Dynamics",
    "Coordination",
    "Independence",
    "Reading",
];

/// Read-only collection of exercises plus the filter vocabulary
#[derive(Clone, Debug)]
pub struct CatalogRepository {
    /// Exercises in their natural display order
    pub exercises: Vec<Exercise>,
    pub time_ranges: Vec<TimeRange>,
    pub skills: Vec<String>,
}

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static CatalogRepository {
    &DEFAULT_CATALOG
}

/// Builds the default catalog
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for testing and custom catalog creation.
pub fn build_default_catalog() -> CatalogRepository {
    build_default_catalog_internal()
}

#[allow(clippy::too_many_arguments)]
fn exercise(
    id: &str,
    name: &str,
    description: &str,
    category: ExerciseCategory,
    skills: &[&str],
    difficulty: Difficulty,
    estimated_time: u32,
    default_tempo: u32,
) -> Exercise {
    Exercise {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        category,
        skills: skills.iter().map(|s| s.to_string()).collect(),
        difficulty,
        estimated_time,
        default_tempo,
    }
}

fn time_range(id: &str, label: &str, min: u32, max: u32) -> TimeRange {
    TimeRange {
        id: id.into(),
        label: label.into(),
        min,
        max,
    }
}

fn build_default_catalog_internal() -> CatalogRepository {
    use Difficulty::*;
    use ExerciseCategory::*;

    let exercises = vec![
        // ====================================================================
        // Rudiments
        // ====================================================================
        exercise(
            "single_stroke_roll",
            "Single Stroke Roll",
            "Alternate single strokes RLRL evenly between hands, keeping stick heights matched.",
            Rudiments,
            &["Speed", "Control", "Endurance"],
            Beginner,
            5,
            100,
        ),
        exercise(
            "double_stroke_roll",
            "Double Stroke Roll",
            "Two strokes per hand RRLL, letting the rebound produce the second note.",
            Rudiments,
            &["Speed", "Control"],
            Intermediate,
            10,
            90,
        ),
        exercise(
            "single_paradiddle",
            "Single Paradiddle",
            "RLRR LRLL with accents on the first note of each group.",
            Rudiments,
            &["Coordination", "Control", "Dynamics"],
            Beginner,
            5,
            80,
        ),
        exercise(
            "flam_taps",
            "Flam Taps",
            "Flam followed by a tap on the same hand, alternating lead hands.",
            Rudiments,
            &["Control", "Dynamics"],
            Intermediate,
            10,
            70,
        ),
        exercise(
            "five_stroke_roll",
            "Five Stroke Roll",
            "Two doubles resolved by an accented single, alternating sides.",
            Rudiments,
            &["Control", "Speed"],
            Intermediate,
            8,
            85,
        ),
        // ====================================================================
        // Grooves
        // ====================================================================
        exercise(
            "basic_rock_beat",
            "Basic Rock Beat",
            "Eighth notes on the hi-hat, snare on 2 and 4, kick on 1 and 3.",
            Grooves,
            &["Timing", "Independence"],
            Beginner,
            5,
            100,
        ),
        exercise(
            "sixteenth_hihat_groove",
            "16th Note Hi-Hat Groove",
            "Alternating sixteenth notes on the hi-hat over a backbeat.",
            Grooves,
            &["Timing", "Endurance", "Speed"],
            Intermediate,
            12,
            90,
        ),
        exercise(
            "shuffle_groove",
            "Shuffle Groove",
            "Triplet-based shuffle with ghost notes on the snare.",
            Grooves,
            &["Timing", "Dynamics"],
            Advanced,
            15,
            110,
        ),
        exercise(
            "jazz_ride_pattern",
            "Jazz Ride Pattern",
            "Swung spang-a-lang on the ride with hi-hat on 2 and 4.",
            Grooves,
            &["Timing", "Independence"],
            Intermediate,
            15,
            140,
        ),
        // ====================================================================
        // Fills
        // ====================================================================
        exercise(
            "tom_fill_sixteenths",
            "Around-the-Kit Sixteenth Fill",
            "One-bar sixteenth note fill moving snare to floor tom, back into the groove.",
            Fills,
            &["Coordination", "Timing"],
            Beginner,
            6,
            90,
        ),
        exercise(
            "linear_fill",
            "Linear Fill",
            "Hands and feet never play together; six-note linear patterns across the toms.",
            Fills,
            &["Coordination", "Speed"],
            Advanced,
            20,
            80,
        ),
        // ====================================================================
        // Coordination
        // ====================================================================
        exercise(
            "four_way_independence",
            "Four-Way Independence",
            "Ostinato on ride and hi-hat foot while reading kick and snare variations.",
            Coordination,
            &["Independence", "Coordination"],
            Advanced,
            25,
            70,
        ),
        exercise(
            "kick_endurance",
            "Bass Drum Endurance",
            "Continuous eighth notes on the kick drum with a relaxed heel-up stroke.",
            Coordination,
            &["Endurance", "Speed"],
            Intermediate,
            10,
            120,
        ),
        // ====================================================================
        // Reading
        // ====================================================================
        exercise(
            "syncopation_reading",
            "Syncopation Reading",
            "Read syncopated eighth-note figures on snare against a quarter-note pulse.",
            Reading,
            &["Reading", "Timing"],
            Intermediate,
            20,
            90,
        ),
        exercise(
            "accent_patterns",
            "Accent Patterns",
            "Accent and tap sixteenth patterns with clear height differences.",
            Reading,
            &["Dynamics", "Reading", "Control"],
            Beginner,
            30,
            80,
        ),
    ];

    let time_ranges = vec![
        time_range("quick", "Quick (up to 5 min)", 0, 5),
        time_range("short", "Short (6-10 min)", 6, 10),
        time_range("medium", "Medium (11-20 min)", 11, 20),
        time_range("long", "Long (21-60 min)", 21, 60),
    ];

    CatalogRepository {
        exercises,
        time_ranges,
        skills: SKILL_OPTIONS.iter().map(|s| s.to_string()).collect(),
    }
}

impl CatalogRepository {
    /// Look up an exercise by id
    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Look up a time-range preset by id
    pub fn time_range(&self, id: &str) -> Option<&TimeRange> {
        self.time_ranges.iter().find(|r| r.id == id)
    }

    /// Resolve a list of ids into exercises, preserving the given order
    pub fn resolve_ids<S: AsRef<str>>(&self, ids: &[S]) -> crate::Result<Vec<Exercise>> {
        ids.iter()
            .map(|id| {
                self.get(id.as_ref()).cloned().ok_or_else(|| {
                    crate::Error::Other(format!("Unknown exercise id '{}'", id.as_ref()))
                })
            })
            .collect()
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen_ids = HashSet::new();

        if self.exercises.is_empty() {
            errors.push("Catalog has no exercises".to_string());
        }

        for ex in &self.exercises {
            if ex.id.is_empty() {
                errors.push("Exercise has empty ID".to_string());
            }
            if !seen_ids.insert(ex.id.as_str()) {
                errors.push(format!("Duplicate exercise id '{}'", ex.id));
            }
            if ex.name.is_empty() {
                errors.push(format!("Exercise '{}' has empty name", ex.id));
            }
            if ex.estimated_time == 0 {
                errors.push(format!("Exercise '{}' has zero estimated time", ex.id));
            }
            if !(MIN_TEMPO..=MAX_TEMPO).contains(&ex.default_tempo) {
                errors.push(format!(
                    "Exercise '{}': default tempo {} outside {}-{} BPM",
                    ex.id, ex.default_tempo, MIN_TEMPO, MAX_TEMPO
                ));
            }
            if ex.skills.is_empty() {
                errors.push(format!("Exercise '{}' has no skills", ex.id));
            }
            let mut seen_skills = HashSet::new();
            for skill in &ex.skills {
                if !self.skills.contains(skill) {
                    errors.push(format!(
                        "Exercise '{}' references unknown skill '{}'",
                        ex.id, skill
                    ));
                }
                if !seen_skills.insert(skill.as_str()) {
                    errors.push(format!("Exercise '{}' lists skill '{}' twice", ex.id, skill));
                }
            }
        }

        let mut seen_ranges = HashSet::new();
        for range in &self.time_ranges {
            if !seen_ranges.insert(range.id.as_str()) {
                errors.push(format!("Duplicate time range id '{}'", range.id));
            }
            if range.min > range.max {
                errors.push(format!(
                    "Time range '{}': min {} > max {}",
                    range.id, range.min, range.max
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.exercises.len(), 15);
        assert_eq!(catalog.time_ranges.len(), 4);
        assert_eq!(catalog.skills.len(), SKILL_OPTIONS.len());
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_every_category_has_exercises() {
        let catalog = build_default_catalog();
        for category in [
            ExerciseCategory::Rudiments,
            ExerciseCategory::Grooves,
            ExerciseCategory::Fills,
            ExerciseCategory::Coordination,
            ExerciseCategory::Reading,
        ] {
            assert!(
                catalog.exercises.iter().any(|e| e.category == category),
                "No exercises in {:?}",
                category
            );
        }
    }

    #[test]
    fn test_every_exercise_fits_a_time_range() {
        let catalog = build_default_catalog();
        for ex in &catalog.exercises {
            assert!(
                catalog.time_ranges.iter().any(|r| r.contains(ex.estimated_time)),
                "{} ({} min) fits no time range",
                ex.id,
                ex.estimated_time
            );
        }
    }

    #[test]
    fn test_resolve_ids_preserves_order() {
        let catalog = build_default_catalog();
        let picked = catalog
            .resolve_ids(&["flam_taps", "single_stroke_roll"])
            .unwrap();
        assert_eq!(picked[0].id, "flam_taps");
        assert_eq!(picked[1].id, "single_stroke_roll");

        assert!(catalog.resolve_ids(&["cowbell_solo"]).is_err());
    }

    #[test]
    fn test_validate_flags_bad_entries() {
        let mut catalog = build_default_catalog();
        let mut dup = catalog.exercises[0].clone();
        dup.default_tempo = 300;
        dup.skills.push("Juggling".into());
        catalog.exercises.push(dup);
        catalog.time_ranges.push(TimeRange {
            id: "broken".into(),
            label: "Broken".into(),
            min: 10,
            max: 5,
        });

        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate exercise id")));
        assert!(errors.iter().any(|e| e.contains("default tempo 300")));
        assert!(errors.iter().any(|e| e.contains("unknown skill 'Juggling'")));
        assert!(errors.iter().any(|e| e.contains("min 10 > max 5")));
    }

    #[test]
    fn test_cached_catalog_matches_built() {
        let cached = get_default_catalog();
        let built = build_default_catalog();
        assert_eq!(cached.exercises, built.exercises);
    }
}
