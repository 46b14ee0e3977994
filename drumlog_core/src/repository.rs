//! Practice sessions and progress data on top of a [`KeyValueStore`].
//!
//! Two keys are used:
//! - `practice_sessions`: array of sessions, most recent first
//! - `progress_data`: map of exercise id to progress entries, append order
//!
//! Values are wrapped in a versioned envelope
//! `{"schemaVersion": N, "data": ...}`. Bare payloads without the envelope
//! are read as version 0 and passed through the migration hook.
//!
//! Reads never fail: a missing, unreadable or unparseable value yields an
//! empty collection and a warning. Writes report failures to the caller.

use crate::store::KeyValueStore;
use crate::types::{PracticeSession, ProgressData, ProgressEntry};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Key holding the session list
pub const SESSIONS_KEY: &str = "practice_sessions";

/// Key holding the per-exercise progress map
pub const PROGRESS_KEY: &str = "progress_data";

/// Envelope version written by this build
pub const SCHEMA_VERSION: u32 = 1;

/// Upgrades a payload stored under `key` from `from_version` to `from_version + 1`
pub type MigrationHook = fn(key: &str, from_version: u32, data: Value) -> Result<Value>;

/// Sink for finished practice sessions
pub trait SessionSink {
    fn save_session(&mut self, session: &PracticeSession) -> Result<()>;
}

/// Sink for per-exercise progress entries
pub trait ProgressSink {
    fn append_progress(&mut self, exercise_id: &str, entry: &ProgressEntry) -> Result<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    schema_version: u32,
    data: T,
}

/// Default migration hook
///
/// Version 0 is the unversioned layout; its payload shape is identical to
/// version 1, so the data passes through unchanged.
pub fn default_migration(key: &str, from_version: u32, data: Value) -> Result<Value> {
    match from_version {
        0 => {
            tracing::info!("Migrating '{}' from unversioned layout", key);
            Ok(data)
        }
        v => Err(Error::persistence(key, format!("no migration from schema version {}", v))),
    }
}

/// Why a stored value could not be turned into a collection
enum LoadError {
    /// The store itself failed; the stored value may still be intact
    Store(Error),
    /// The value exists but cannot be decoded
    Corrupt(Error),
}

/// Unwrap the envelope of `raw` and upgrade it to the current schema
fn decode_payload<T: DeserializeOwned>(migrate: MigrationHook, key: &str, raw: &str) -> Result<T> {
    let value: Value = serde_json::from_str(raw)?;

    let (mut version, mut data) = match value {
        Value::Object(mut map) if map.contains_key("schemaVersion") => {
            let version = map
                .get("schemaVersion")
                .and_then(Value::as_u64)
                .ok_or_else(|| Error::persistence(key, "schemaVersion is not a number"))?;
            let version = u32::try_from(version).map_err(|_| {
                Error::persistence(key, format!("schema version {} is out of range", version))
            })?;
            let data = map.remove("data").unwrap_or(Value::Null);
            (version, data)
        }
        other => (0, other),
    };

    if version > SCHEMA_VERSION {
        return Err(Error::persistence(
            key,
            format!(
                "schema version {} is newer than supported {}",
                version, SCHEMA_VERSION
            ),
        ));
    }

    while version < SCHEMA_VERSION {
        data = migrate(key, version, data)?;
        version += 1;
    }

    Ok(serde_json::from_value(data)?)
}

fn encode_payload<T: Serialize>(key: &str, data: &T) -> Result<String> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        data,
    };
    serde_json::to_string(&envelope).map_err(|e| Error::persistence(key, e))
}

/// Session and progress persistence over any key-value store
pub struct PracticeRepository<S> {
    store: S,
    migrate: MigrationHook,
}

impl<S: KeyValueStore> PracticeRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            migrate: default_migration,
        }
    }

    /// Replace the migration hook used when reading older layouts
    pub fn with_migration(mut self, hook: MigrationHook) -> Self {
        self.migrate = hook;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    // ------------------------------------------------------------------------
    // Envelope handling
    // ------------------------------------------------------------------------

    fn decode<T: DeserializeOwned>(&self, key: &str, raw: &str) -> Result<T> {
        decode_payload(self.migrate, key, raw)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> std::result::Result<Option<T>, LoadError> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => return Err(LoadError::Store(e)),
        };
        self.decode(key, &raw).map(Some).map_err(LoadError::Corrupt)
    }

    /// Load a collection, degrading every failure to the empty default
    fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.load(key) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(LoadError::Store(e)) | Err(LoadError::Corrupt(e)) => {
                tracing::warn!("Unable to read '{}': {}. Using empty collection.", key, e);
                T::default()
            }
        }
    }

    /// Read-modify-write a collection as one store update
    ///
    /// A corrupt value is replaced (with a warning), but a failing store
    /// aborts the write so intact data is never overwritten.
    fn update<T, F>(&mut self, key: &str, modify: F) -> Result<T>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T),
    {
        let migrate = self.migrate;
        let mut modify = Some(modify);
        let mut updated: Option<T> = None;

        self.store
            .update(key, &mut |raw| {
                let mut value: T = match raw {
                    None => T::default(),
                    Some(raw) => decode_payload(migrate, key, &raw).unwrap_or_else(|e| {
                        tracing::warn!("Discarding unreadable '{}': {}", key, e);
                        T::default()
                    }),
                };
                if let Some(modify) = modify.take() {
                    modify(&mut value);
                }
                let encoded = encode_payload(key, &value)?;
                updated = Some(value);
                Ok(encoded)
            })
            .map_err(|e| match e {
                Error::Persistence { .. } => e,
                other => Error::persistence(key, other),
            })?;

        updated.ok_or_else(|| Error::persistence(key, "store skipped the update"))
    }

    // ------------------------------------------------------------------------
    // Practice sessions
    // ------------------------------------------------------------------------

    /// All stored sessions, most recent first
    pub fn practice_sessions(&self) -> Vec<PracticeSession> {
        let sessions: Vec<PracticeSession> = self.load_or_default(SESSIONS_KEY);
        tracing::debug!("Loaded {} practice sessions", sessions.len());
        sessions
    }

    /// Prepend `session` to the stored list
    pub fn save_practice_session(&mut self, session: &PracticeSession) -> Result<()> {
        let sessions: Vec<PracticeSession> =
            self.update(SESSIONS_KEY, |sessions: &mut Vec<PracticeSession>| {
                sessions.insert(0, session.clone())
            })?;
        tracing::info!(
            "Saved practice session {} ({} total)",
            session.id,
            sessions.len()
        );
        Ok(())
    }

    /// Look up a stored session by id
    pub fn find_session(&self, id: &str) -> Option<PracticeSession> {
        self.practice_sessions().into_iter().find(|s| s.id == id)
    }

    // ------------------------------------------------------------------------
    // Progress data
    // ------------------------------------------------------------------------

    /// Every exercise's progress entries, in append order
    pub fn progress_data(&self) -> ProgressData {
        self.load_or_default(PROGRESS_KEY)
    }

    /// Progress entries for one exercise, in append order
    pub fn exercise_progress(&self, exercise_id: &str) -> Vec<ProgressEntry> {
        self.progress_data()
            .remove(exercise_id)
            .unwrap_or_default()
    }

    /// Append a progress entry for `exercise_id`
    pub fn save_progress_entry(&mut self, exercise_id: &str, entry: &ProgressEntry) -> Result<()> {
        self.update(PROGRESS_KEY, |data: &mut ProgressData| {
            data.entry(exercise_id.to_string())
                .or_default()
                .push(entry.clone())
        })?;
        tracing::debug!("Appended progress entry for '{}'", exercise_id);
        Ok(())
    }
}

impl<S: KeyValueStore> SessionSink for PracticeRepository<S> {
    fn save_session(&mut self, session: &PracticeSession) -> Result<()> {
        self.save_practice_session(session)
    }
}

impl<S: KeyValueStore> ProgressSink for PracticeRepository<S> {
    fn append_progress(&mut self, exercise_id: &str, entry: &ProgressEntry) -> Result<()> {
        self.save_progress_entry(exercise_id, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_default_catalog;
    use crate::store::{FileStore, MemoryStore};
    use crate::types::{PracticeExerciseResult, SessionExercise};
    use chrono::{Duration, TimeZone, Utc};

    fn session(id: &str, minutes_ago: i64) -> PracticeSession {
        let date = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
            - Duration::minutes(minutes_ago);
        let exercise = build_default_catalog().exercises[0].clone();
        let result = PracticeExerciseResult {
            exercise_id: exercise.id.clone(),
            exercise_name: exercise.name.clone(),
            duration: 60,
            tempo: 100,
            timestamp: date,
        };
        PracticeSession {
            id: id.into(),
            exercises: vec![SessionExercise::merge(exercise, Some(&result))],
            total_duration: 65,
            date,
            exercise_data: vec![result],
        }
    }

    fn entry(duration: u64, tempo: u32) -> ProgressEntry {
        ProgressEntry {
            duration,
            tempo,
            date: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_absent_keys_read_as_empty() {
        let repo = PracticeRepository::new(MemoryStore::new());
        assert!(repo.practice_sessions().is_empty());
        assert!(repo.progress_data().is_empty());
        assert!(repo.exercise_progress("single_stroke_roll").is_empty());
    }

    #[test]
    fn test_newest_session_is_first() {
        let mut repo = PracticeRepository::new(MemoryStore::new());
        repo.save_practice_session(&session("first", 10)).unwrap();
        repo.save_practice_session(&session("second", 0)).unwrap();

        let sessions = repo.practice_sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "second");
        assert_eq!(sessions[1].id, "first");
    }

    #[test]
    fn test_find_session() {
        let mut repo = PracticeRepository::new(MemoryStore::new());
        repo.save_practice_session(&session("abc", 0)).unwrap();
        assert!(repo.find_session("abc").is_some());
        assert!(repo.find_session("missing").is_none());
    }

    #[test]
    fn test_progress_entries_append_per_exercise() {
        let mut repo = PracticeRepository::new(MemoryStore::new());
        repo.save_progress_entry("flam_taps", &entry(60, 70)).unwrap();
        repo.save_progress_entry("flam_taps", &entry(90, 75)).unwrap();
        repo.save_progress_entry("shuffle_groove", &entry(30, 110)).unwrap();

        let flams = repo.exercise_progress("flam_taps");
        assert_eq!(flams.len(), 2);
        assert_eq!(flams[0].duration, 60);
        assert_eq!(flams[1].duration, 90);
        assert_eq!(repo.progress_data().len(), 2);
    }

    #[test]
    fn test_writes_use_versioned_envelope() {
        let mut repo = PracticeRepository::new(MemoryStore::new());
        repo.save_progress_entry("flam_taps", &entry(60, 70)).unwrap();

        let raw: Value = serde_json::from_str(repo.store().raw(PROGRESS_KEY).unwrap()).unwrap();
        assert_eq!(raw["schemaVersion"], SCHEMA_VERSION);
        assert_eq!(raw["data"]["flam_taps"][0]["tempo"], 70);
    }

    #[test]
    fn test_reads_legacy_unversioned_payload() {
        let mut store = MemoryStore::new();
        store
            .set(
                PROGRESS_KEY,
                r#"{"flam_taps":[{"duration":45,"tempo":72,"date":"2024-05-01T10:00:00.000Z"}]}"#,
            )
            .unwrap();
        let repo = PracticeRepository::new(store);

        let flams = repo.exercise_progress("flam_taps");
        assert_eq!(flams.len(), 1);
        assert_eq!(flams[0].tempo, 72);
    }

    #[test]
    fn test_custom_migration_hook_runs() {
        fn double_tempo(_key: &str, _from: u32, mut data: Value) -> Result<Value> {
            if let Some(entries) = data.get_mut("flam_taps").and_then(Value::as_array_mut) {
                for e in entries {
                    let tempo = e["tempo"].as_u64().unwrap_or(0);
                    e["tempo"] = Value::from(tempo * 2);
                }
            }
            Ok(data)
        }

        let mut store = MemoryStore::new();
        store
            .set(
                PROGRESS_KEY,
                r#"{"flam_taps":[{"duration":45,"tempo":50,"date":"2024-05-01T10:00:00Z"}]}"#,
            )
            .unwrap();
        let repo = PracticeRepository::new(store).with_migration(double_tempo);
        assert_eq!(repo.exercise_progress("flam_taps")[0].tempo, 100);
    }

    #[test]
    fn test_future_schema_version_reads_as_empty() {
        let mut store = MemoryStore::new();
        store
            .set(SESSIONS_KEY, r#"{"schemaVersion":99,"data":[]}"#)
            .unwrap();
        let repo = PracticeRepository::new(store);
        assert!(repo.practice_sessions().is_empty());
    }

    #[test]
    fn test_oversized_schema_version_is_rejected() {
        let mut store = MemoryStore::new();
        store
            .set(SESSIONS_KEY, r#"{"schemaVersion":4294967297,"data":[]}"#)
            .unwrap();
        let repo = PracticeRepository::new(store);

        let raw = repo.store().get(SESSIONS_KEY).unwrap().unwrap();
        let err = repo.decode::<Vec<PracticeSession>>(SESSIONS_KEY, &raw).unwrap_err();
        assert!(matches!(err, Error::Persistence { ref key, .. } if key == SESSIONS_KEY));
        assert!(repo.practice_sessions().is_empty());
    }

    #[test]
    fn test_corrupted_value_reads_as_empty_and_is_replaced() {
        let mut store = MemoryStore::new();
        store.set(SESSIONS_KEY, "{ invalid json }").unwrap();
        let mut repo = PracticeRepository::new(store);

        assert!(repo.practice_sessions().is_empty());
        repo.save_practice_session(&session("fresh", 0)).unwrap();
        assert_eq!(repo.practice_sessions().len(), 1);
    }

    #[test]
    fn test_failed_write_reports_persistence_error() {
        let mut repo = PracticeRepository::new(MemoryStore::new());
        repo.store_mut().fail_writes(true);

        let err = repo.save_practice_session(&session("lost", 0)).unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
        let err = repo.save_progress_entry("flam_taps", &entry(1, 60)).unwrap_err();
        assert!(matches!(err, Error::Persistence { ref key, .. } if key == PROGRESS_KEY));
    }

    #[test]
    fn test_failed_read_does_not_overwrite_existing_data() {
        let mut repo = PracticeRepository::new(MemoryStore::new());
        repo.save_practice_session(&session("kept", 0)).unwrap();

        repo.store_mut().fail_reads(true);
        assert!(repo.practice_sessions().is_empty());
        assert!(repo.save_practice_session(&session("new", 0)).is_err());

        repo.store_mut().fail_reads(false);
        let sessions = repo.practice_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "kept");
    }

    #[test]
    fn test_concurrent_saves_keep_every_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().to_path_buf();

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let dir = dir.clone();
                std::thread::spawn(move || {
                    let mut repo = PracticeRepository::new(FileStore::new(dir));
                    repo.save_practice_session(&session(&format!("s{}", i), i))
                        .unwrap();
                    repo.save_progress_entry("flam_taps", &entry(30, 70)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let repo = PracticeRepository::new(FileStore::new(&dir));
        assert_eq!(repo.practice_sessions().len(), 6);
        assert_eq!(repo.exercise_progress("flam_taps").len(), 6);
    }

    #[test]
    fn test_file_backed_repository_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut repo = PracticeRepository::new(FileStore::new(temp_dir.path()));
        repo.save_practice_session(&session("on-disk", 0)).unwrap();

        let reopened = PracticeRepository::new(FileStore::new(temp_dir.path()));
        let sessions = reopened.practice_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0], session("on-disk", 0));
    }
}
