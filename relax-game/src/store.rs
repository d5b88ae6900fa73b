//! Local result store: best-of-day records and bounded run history.
//!
//! The browser's local storage is abstracted as a string key-value
//! capability. The plain reads and writes are best-effort: backend or
//! decoding failures are logged and degrade to "no data". The `try_*`
//! reads surface the error instead.

use crate::constants::HISTORY_CAPACITY;
use crate::result::{GameKind, RunRecord};
use crate::seed::DailyKey;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// Failures raised by a key-value backend or by record (de)serialization.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key-value capability, e.g. browser `localStorage`.
pub trait KeyValueStore {
    /// Read a raw value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a raw value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write (quota, disabled storage).
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value; deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// What happened when a finished run was recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome<R> {
    /// Best-of-day after the save.
    pub best: R,
    pub new_best: bool,
    /// History after the prepend, most recent first.
    pub history: Vec<R>,
}

/// Typed best-of-day and history access over a key-value backend.
#[derive(Debug, Clone)]
pub struct ResultStore<S> {
    backend: S,
    capacity: usize,
}

impl<S: KeyValueStore> ResultStore<S> {
    pub const fn new(backend: S) -> Self {
        Self {
            backend,
            capacity: HISTORY_CAPACITY,
        }
    }

    #[must_use]
    pub const fn backend(&self) -> &S {
        &self.backend
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Best result recorded for `day`, or `None` when absent or unreadable.
    #[must_use]
    pub fn load_best<R: RunRecord>(&self, day: DailyKey) -> Option<R> {
        self.try_load_best(day).unwrap_or_else(|err| {
            log::warn!("discarding best-of-day at {}: {err}", R::GAME.best_key(day));
            None
        })
    }

    /// # Errors
    ///
    /// Returns the backend failure or the decode error of a corrupt record.
    pub fn try_load_best<R: RunRecord>(&self, day: DailyKey) -> Result<Option<R>, StoreError> {
        Ok(self.try_read::<Option<R>>(&R::GAME.best_key(day))?.flatten())
    }

    /// Save `candidate` as best-of-day when it beats the stored record.
    /// Returns the best-of-day after the call and whether it changed.
    pub fn save_best<R: RunRecord>(&self, candidate: &R) -> (R, bool) {
        let current = self.load_best::<R>(candidate.date_key());
        match current {
            Some(best) if !candidate.improves_on(&best) => (best, false),
            _ => {
                let key = R::GAME.best_key(candidate.date_key());
                if let Err(err) = self.try_write(&key, candidate) {
                    log::warn!("best-of-day not persisted at {key}: {err}");
                }
                (candidate.clone(), true)
            }
        }
    }

    /// Run history, most recent first; empty when absent or unreadable.
    #[must_use]
    pub fn load_history<R: RunRecord>(&self) -> Vec<R> {
        self.try_load_history().unwrap_or_else(|err| {
            log::warn!("discarding history at {}: {err}", R::GAME.history_key());
            Vec::new()
        })
    }

    /// # Errors
    ///
    /// Returns the backend failure or the decode error of a corrupt record.
    pub fn try_load_history<R: RunRecord>(&self) -> Result<Vec<R>, StoreError> {
        Ok(self
            .try_read::<Vec<R>>(&R::GAME.history_key())?
            .unwrap_or_default())
    }

    /// Prepend `result` and truncate to capacity. Returns the new history.
    pub fn append_history<R: RunRecord>(&self, result: &R) -> Vec<R> {
        let mut history = self.load_history::<R>();
        history.insert(0, result.clone());
        history.truncate(self.capacity);
        let key = R::GAME.history_key();
        if let Err(err) = self.try_write(&key, &history) {
            log::warn!("history not persisted at {key}: {err}");
        }
        history
    }

    /// Drop every history entry of `game`. Best-of-day records are kept.
    pub fn clear_history(&self, game: GameKind) {
        let key = game.history_key();
        if let Err(err) = self.backend.remove(&key) {
            log::warn!("history not cleared at {key}: {err}");
        }
    }

    /// Save best-of-day and append to history in one call.
    pub fn record<R: RunRecord>(&self, result: &R) -> RecordOutcome<R> {
        let (best, new_best) = self.save_best(result);
        let history = self.append_history(result);
        log::debug!(
            "recorded {} run for {} (new best: {new_best})",
            R::GAME,
            result.date_key()
        );
        RecordOutcome {
            best,
            new_best,
            history,
        }
    }

    fn try_read<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        match self.backend.get(key)? {
            Some(raw) if !raw.is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
            _ => Ok(None),
        }
    }

    fn try_write<T: serde::Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{ClimbRunResult, RunResult, TargetRunResult};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("storage disabled".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("quota exceeded".into()))
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("storage disabled".into()))
        }
    }

    fn day(d: u32) -> DailyKey {
        DailyKey::from_ymd(2024, 3, d).unwrap()
    }

    fn reaction(total: f64, at: i64) -> RunResult {
        RunResult::from_trials(day(1), &[total], 0, at)
    }

    #[test]
    fn missing_best_is_none() {
        let store = ResultStore::new(MemoryStore::new());
        assert!(store.load_best::<RunResult>(day(1)).is_none());
        assert!(store.load_history::<RunResult>().is_empty());
    }

    #[test]
    fn timed_best_only_decreases() {
        let store = ResultStore::new(MemoryStore::new());
        let (best, new_best) = store.save_best(&reaction(900.0, 1));
        assert!(new_best);
        assert!((best.total_duration_ms - 900.0).abs() < f64::EPSILON);

        let (best, new_best) = store.save_best(&reaction(1_100.0, 2));
        assert!(!new_best);
        assert!((best.total_duration_ms - 900.0).abs() < f64::EPSILON);

        let (_, new_best) = store.save_best(&reaction(850.0, 3));
        assert!(new_best);
        let stored = store.load_best::<RunResult>(day(1)).unwrap();
        assert_eq!(stored.created_at_epoch_ms, 3);
    }

    #[test]
    fn climb_best_only_increases() {
        let store = ResultStore::new(MemoryStore::new());
        store.save_best(&ClimbRunResult::from_progress(day(1), 500.0, 1, 1));
        let (best, new_best) = store.save_best(&ClimbRunResult::from_progress(day(1), 10.0, 0, 2));
        assert!(!new_best);
        assert_eq!(best.score, 600);
    }

    #[test]
    fn best_is_partitioned_by_day() {
        let store = ResultStore::new(MemoryStore::new());
        store.save_best(&reaction(900.0, 1));
        assert!(store.load_best::<RunResult>(day(2)).is_none());
    }

    #[test]
    fn history_is_bounded_and_most_recent_first() {
        let store = ResultStore::new(MemoryStore::new());
        for at in 0..40 {
            store.append_history(&TargetRunResult::from_elapsed(day(1), 4_000.0, 20, 0, at));
        }
        let history = store.load_history::<TargetRunResult>();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history[0].created_at_epoch_ms, 39);
        assert!(
            history
                .windows(2)
                .all(|pair| pair[0].created_at_epoch_ms >= pair[1].created_at_epoch_ms)
        );
    }

    #[test]
    fn clear_history_keeps_best() {
        let store = ResultStore::new(MemoryStore::new());
        store.record(&reaction(700.0, 1));
        store.clear_history(GameKind::ReactionSprint);
        assert!(store.load_history::<RunResult>().is_empty());
        assert!(store.load_best::<RunResult>(day(1)).is_some());
    }

    #[test]
    fn games_do_not_share_history() {
        let store = ResultStore::new(MemoryStore::new());
        store.record(&reaction(700.0, 1));
        assert!(store.load_history::<ClimbRunResult>().is_empty());
        assert_eq!(store.load_history::<RunResult>().len(), 1);
    }

    #[test]
    fn corrupt_records_read_as_absent() {
        let backend = MemoryStore::new();
        backend
            .set("relax-reaction-sprint:best:2024-03-01", "{not json")
            .unwrap();
        backend.set("relax-reaction-sprint:history", "[1,2,3]").unwrap();
        let store = ResultStore::new(backend);
        assert!(store.load_best::<RunResult>(day(1)).is_none());
        assert!(store.load_history::<RunResult>().is_empty());

        let outcome = store.record(&reaction(640.0, 9));
        assert!(outcome.new_best);
        assert_eq!(outcome.history.len(), 1);
    }

    #[test]
    fn failing_backend_degrades_to_empty() {
        let store = ResultStore::new(BrokenStore);
        assert!(store.load_best::<RunResult>(day(1)).is_none());
        let outcome = store.record(&reaction(640.0, 9));
        assert!(outcome.new_best);
        assert_eq!(outcome.history.len(), 1);
        store.clear_history(GameKind::ReactionSprint);
        assert!(store.load_history::<RunResult>().is_empty());
        assert!(matches!(
            store.try_load_best::<RunResult>(day(1)),
            Err(StoreError::Backend(_))
        ));
        assert!(store.try_load_history::<RunResult>().is_err());
    }

    #[test]
    fn fallible_reads_surface_corruption() {
        let backend = MemoryStore::new();
        backend.set("relax-sky-jump:history", "{oops").unwrap();
        let store = ResultStore::new(backend);
        assert!(matches!(
            store.try_load_history::<ClimbRunResult>(),
            Err(StoreError::Json(_))
        ));
        assert_eq!(store.try_load_best::<ClimbRunResult>(day(1)).unwrap(), None);
    }

    #[test]
    fn memory_store_clones_share_entries() {
        let backend = MemoryStore::new();
        let store = ResultStore::new(backend.clone());
        store.record(&reaction(640.0, 9));
        assert_eq!(
            backend.keys(),
            vec![
                "relax-reaction-sprint:best:2024-03-01".to_string(),
                "relax-reaction-sprint:history".to_string(),
            ]
        );
    }
}
