//! Exercise filtering by skill, estimated time and free-text query.
//!
//! Filtering is a pure function of the exercise list and the criteria: the
//! same inputs always produce the same subset, in the input's order.

use crate::catalog::CatalogRepository;
use crate::types::{Exercise, TimeRange};
use crate::{Error, Result};
use std::collections::BTreeSet;

/// How the time range of an [`ExerciseFilter`] is chosen
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeRangeSelection {
    /// A named preset from the catalog (e.g. "short")
    Preset(String),
    /// Explicit inclusive bounds in minutes
    Minutes { min: u32, max: u32 },
}

/// Criteria applied by [`filter_exercises`]; empty criteria match everything
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExerciseFilter {
    /// Keep exercises sharing at least one of these skills
    pub skills: BTreeSet<String>,
    pub time_range: Option<TimeRangeSelection>,
    /// Case-insensitive substring of name or description
    pub query: Option<String>,
}

impl ExerciseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    pub fn with_time_preset(mut self, id: impl Into<String>) -> Self {
        self.time_range = Some(TimeRangeSelection::Preset(id.into()));
        self
    }

    pub fn with_minutes(mut self, min: u32, max: u32) -> Self {
        self.time_range = Some(TimeRangeSelection::Minutes { min, max });
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Add the skill if absent, remove it if present
    pub fn toggle_skill(&mut self, skill: &str) {
        if !self.skills.remove(skill) {
            self.skills.insert(skill.to_string());
        }
    }

    /// Turn the time selection into concrete bounds
    fn resolve_bounds(&self, presets: &[TimeRange]) -> Result<Option<(u32, u32)>> {
        match &self.time_range {
            None => Ok(None),
            Some(TimeRangeSelection::Preset(id)) => presets
                .iter()
                .find(|r| &r.id == id)
                .map(|r| Some((r.min, r.max)))
                .ok_or_else(|| Error::InvalidCriteria(format!("unknown time range '{}'", id))),
            Some(TimeRangeSelection::Minutes { min, max }) => {
                if min > max {
                    return Err(Error::InvalidCriteria(format!(
                        "time range min {} exceeds max {}",
                        min, max
                    )));
                }
                Ok(Some((*min, *max)))
            }
        }
    }
}

/// Filter `exercises` by `criteria`, resolving preset ids against `presets`
///
/// All three predicates must hold. Unknown presets and inverted bounds fail
/// with [`Error::InvalidCriteria`] instead of matching nothing.
pub fn filter_exercises<'a>(
    exercises: &'a [Exercise],
    presets: &[TimeRange],
    criteria: &ExerciseFilter,
) -> Result<Vec<&'a Exercise>> {
    let bounds = criteria.resolve_bounds(presets)?;
    let query = criteria
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let matched: Vec<&Exercise> = exercises
        .iter()
        .filter(|ex| criteria.skills.is_empty() || ex.skills.iter().any(|s| criteria.skills.contains(s)))
        .filter(|ex| match bounds {
            Some((min, max)) => ex.estimated_time >= min && ex.estimated_time <= max,
            None => true,
        })
        .filter(|ex| match &query {
            Some(q) => {
                ex.name.to_lowercase().contains(q.as_str())
                    || ex.description.to_lowercase().contains(q.as_str())
            }
            None => true,
        })
        .collect();

    tracing::debug!(
        "Filter matched {} of {} exercises",
        matched.len(),
        exercises.len()
    );
    Ok(matched)
}

impl CatalogRepository {
    /// Filter the catalog's exercises, keeping catalog order
    pub fn filter(&self, criteria: &ExerciseFilter) -> Result<Vec<&Exercise>> {
        filter_exercises(&self.exercises, &self.time_ranges, criteria)
    }
}
