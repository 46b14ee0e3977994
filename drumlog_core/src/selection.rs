//! Building the ordered list of exercises for a new session.

use crate::types::{Exercise, PracticeSession};
use crate::{Error, Result};

/// Exercises picked for the next session, in pick order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    exercises: Vec<Exercise>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a selection from a stored session ("modify")
    pub fn from_session(session: &PracticeSession) -> Self {
        Self {
            exercises: session.exercise_list(),
        }
    }

    pub fn contains(&self, exercise_id: &str) -> bool {
        self.exercises.iter().any(|e| e.id == exercise_id)
    }

    /// Add the exercise if absent, remove it if present; returns whether it is now selected
    pub fn toggle(&mut self, exercise: &Exercise) -> bool {
        if let Some(pos) = self.exercises.iter().position(|e| e.id == exercise.id) {
            self.exercises.remove(pos);
            false
        } else {
            self.exercises.push(exercise.clone());
            true
        }
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Sum of estimated minutes
    pub fn total_minutes(&self) -> u32 {
        self.exercises.iter().map(|e| e.estimated_time).sum()
    }

    /// Hand the selection to a recorder; an empty selection cannot start
    pub fn into_exercises(self) -> Result<Vec<Exercise>> {
        if self.exercises.is_empty() {
            return Err(Error::EmptySelection);
        }
        Ok(self.exercises)
    }
}
