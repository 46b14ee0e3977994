#![forbid(unsafe_code)]

//! Core domain model and business logic for Drumlog, a drum practice tracker.
//!
//! This crate provides:
//! - Domain types (exercises, sessions, progress entries)
//! - The built-in exercise catalog and its filter
//! - The session recorder state machine
//! - Progress statistics
//! - Persistence over a key-value store
//! - Metronome and display timers

pub mod types;
pub mod error;
pub mod catalog;
pub mod filter;
pub mod clock;
pub mod config;
pub mod logging;
pub mod store;
pub mod repository;
pub mod recorder;
pub mod stats;
pub mod selection;
pub mod history;
pub mod timing;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, CatalogRepository};
pub use filter::{filter_exercises, ExerciseFilter, TimeRangeSelection};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use repository::{PracticeRepository, ProgressSink, SessionSink};
pub use recorder::{CompletedExercise, RecorderState, SessionRecorder};
pub use stats::{overview, rank_exercises, summarize, Direction, ExerciseStats};
pub use selection::Selection;
pub use timing::{Metronome, PeriodicTask, PracticeTimers};
