//! Practice session recorder.
//!
//! The recorder walks through the selected exercises in order. Each exercise
//! is either completed (producing a result and a progress entry) or skipped
//! (producing nothing). Once every exercise has been handled the session can
//! be finished, which persists the merged session record.
//!
//! State machine:
//!
//! ```text
//! NotStarted --start--> InProgress(0) --complete/skip--> InProgress(i+1) ...
//!                                      --last complete/skip--> Completed --finish--> Finished
//! ```

use crate::clock::{elapsed_secs, Clock};
use crate::repository::{ProgressSink, SessionSink};
use crate::types::{
    clamp_tempo, Exercise, PracticeExerciseResult, PracticeSession, ProgressEntry,
    SessionExercise,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// Lifecycle position of a [`SessionRecorder`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderState {
    NotStarted,
    InProgress { current_index: usize },
    /// Every exercise was completed or skipped; `finish` may be called
    Completed,
    /// The session has been persisted
    Finished,
}

/// Outcome of [`SessionRecorder::complete_current`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedExercise {
    pub result: PracticeExerciseResult,
    /// False when the progress entry could not be written
    pub progress_saved: bool,
}

/// Builds a practice session as exercises are completed or skipped
#[derive(Debug)]
pub struct SessionRecorder<C: Clock> {
    clock: C,
    state: RecorderState,
    exercises: Vec<Exercise>,
    /// One slot per exercise; `None` until completed, and forever for skips
    outcomes: Vec<Option<PracticeExerciseResult>>,
    session_started_at: Option<DateTime<Utc>>,
    exercise_started_at: Option<DateTime<Utc>>,
    tempo: u32,
    /// Session built by a `finish` whose save failed, reused on retry
    pending: Option<PracticeSession>,
}

impl<C: Clock> SessionRecorder<C> {
    /// Create a recorder in the `NotStarted` state
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: RecorderState::NotStarted,
            exercises: Vec::new(),
            outcomes: Vec::new(),
            session_started_at: None,
            exercise_started_at: None,
            tempo: 0,
            pending: None,
        }
    }

    /// Create a recorder and start it with `exercises`
    pub fn begin(exercises: Vec<Exercise>, clock: C) -> Result<Self> {
        let mut recorder = Self::new(clock);
        recorder.start(exercises)?;
        Ok(recorder)
    }

    /// Start the session; the first exercise starts at the same instant
    pub fn start(&mut self, exercises: Vec<Exercise>) -> Result<()> {
        if self.state != RecorderState::NotStarted {
            return Err(Error::InvalidState(format!(
                "session already started ({:?})",
                self.state
            )));
        }
        if exercises.is_empty() {
            return Err(Error::EmptySelection);
        }

        let now = self.clock.now();
        self.tempo = clamp_tempo(exercises[0].default_tempo);
        self.outcomes = vec![None; exercises.len()];
        self.exercises = exercises;
        self.session_started_at = Some(now);
        self.exercise_started_at = Some(now);
        self.state = RecorderState::InProgress { current_index: 0 };

        tracing::info!(
            "Started practice session with {} exercises",
            self.exercises.len()
        );
        Ok(())
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    /// Index of the exercise being practiced, if any
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            RecorderState::InProgress { current_index } => Some(current_index),
            _ => None,
        }
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.current_index().map(|i| &self.exercises[i])
    }

    /// Results recorded so far, in completion order
    pub fn results(&self) -> Vec<PracticeExerciseResult> {
        self.outcomes.iter().flatten().cloned().collect()
    }

    /// Live tempo for the current exercise
    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Adjust the live tempo; returns the clamped value in effect
    pub fn set_tempo(&mut self, bpm: u32) -> u32 {
        self.tempo = clamp_tempo(bpm);
        self.tempo
    }

    /// Nudge the live tempo by `delta` BPM; returns the clamped value in effect
    pub fn adjust_tempo(&mut self, delta: i32) -> u32 {
        let target = (self.tempo as i64 + delta as i64).max(0) as u32;
        self.set_tempo(target)
    }

    /// Seconds spent on the current exercise so far
    pub fn exercise_elapsed_secs(&self) -> u64 {
        self.exercise_started_at
            .map(|start| elapsed_secs(start, self.clock.now()))
            .unwrap_or(0)
    }

    /// Seconds since the session started
    pub fn session_elapsed_secs(&self) -> u64 {
        self.session_started_at
            .map(|start| elapsed_secs(start, self.clock.now()))
            .unwrap_or(0)
    }

    fn require_in_progress(&self, operation: &str) -> Result<usize> {
        self.current_index().ok_or_else(|| {
            Error::InvalidState(format!("cannot {} in state {:?}", operation, self.state))
        })
    }

    /// Move past the current exercise, starting the next one at `now`
    fn advance(&mut self, from: usize, now: DateTime<Utc>) {
        let next = from + 1;
        if next == self.exercises.len() {
            self.state = RecorderState::Completed;
            self.exercise_started_at = None;
            tracing::debug!("All {} exercises handled", self.exercises.len());
        } else {
            self.state = RecorderState::InProgress {
                current_index: next,
            };
            self.exercise_started_at = Some(now);
            self.tempo = clamp_tempo(self.exercises[next].default_tempo);
        }
    }

    /// Complete the current exercise at `actual_tempo`
    ///
    /// The progress entry is written immediately. A failed write is logged
    /// and reported through [`CompletedExercise::progress_saved`], but the
    /// recorder still advances.
    pub fn complete_current<P: ProgressSink + ?Sized>(
        &mut self,
        actual_tempo: u32,
        progress: &mut P,
    ) -> Result<CompletedExercise> {
        let index = self.require_in_progress("complete an exercise")?;
        let now = self.clock.now();
        let started = self.exercise_started_at.unwrap_or(now);
        let exercise = &self.exercises[index];

        let result = PracticeExerciseResult {
            exercise_id: exercise.id.clone(),
            exercise_name: exercise.name.clone(),
            duration: elapsed_secs(started, now),
            tempo: clamp_tempo(actual_tempo),
            timestamp: now,
        };
        let entry = ProgressEntry {
            duration: result.duration,
            tempo: result.tempo,
            date: now,
        };

        let progress_saved = match progress.append_progress(&exercise.id, &entry) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to save progress for '{}': {}", exercise.id, e);
                false
            }
        };

        tracing::info!(
            "Completed '{}' in {}s at {} BPM",
            result.exercise_id,
            result.duration,
            result.tempo
        );

        self.outcomes[index] = Some(result.clone());
        self.advance(index, now);

        Ok(CompletedExercise {
            result,
            progress_saved,
        })
    }

    /// Complete the current exercise at the live tempo
    pub fn complete_at_live_tempo<P: ProgressSink + ?Sized>(
        &mut self,
        progress: &mut P,
    ) -> Result<CompletedExercise> {
        let tempo = self.tempo;
        self.complete_current(tempo, progress)
    }

    /// Skip the current exercise without recording anything
    ///
    /// Callers are expected to have confirmed the skip with the user.
    pub fn skip_current(&mut self) -> Result<()> {
        let index = self.require_in_progress("skip an exercise")?;
        tracing::info!("Skipped '{}'", self.exercises[index].id);
        let now = self.clock.now();
        self.advance(index, now);
        Ok(())
    }

    fn build_session(&self) -> Result<PracticeSession> {
        let started = self
            .session_started_at
            .ok_or_else(|| Error::InvalidState("session never started".into()))?;
        let now = self.clock.now();

        let exercises = self
            .exercises
            .iter()
            .zip(&self.outcomes)
            .map(|(exercise, outcome)| SessionExercise::merge(exercise.clone(), outcome.as_ref()))
            .collect();

        Ok(PracticeSession {
            id: now.timestamp_millis().to_string(),
            exercises,
            total_duration: elapsed_secs(started, now),
            date: now,
            exercise_data: self.results(),
        })
    }

    /// Persist the finished session and return it
    ///
    /// Only valid in `Completed`. If the save fails the recorder stays in
    /// `Completed` and a later call persists the same record.
    pub fn finish<S: SessionSink + ?Sized>(&mut self, sink: &mut S) -> Result<PracticeSession> {
        if self.state != RecorderState::Completed {
            return Err(Error::InvalidState(format!(
                "cannot finish session in state {:?}",
                self.state
            )));
        }

        let session = match self.pending.take() {
            Some(session) => session,
            None => self.build_session()?,
        };

        if let Err(e) = sink.save_session(&session) {
            tracing::warn!("Failed to save session {}: {}", session.id, e);
            self.pending = Some(session);
            return Err(e);
        }

        self.state = RecorderState::Finished;
        tracing::info!(
            "Finished session {}: {} of {} exercises completed in {}s",
            session.id,
            session.exercise_data.len(),
            session.exercises.len(),
            session.total_duration
        );
        Ok(session)
    }
}
