mod legacy;
mod local;

use crate::config::Preferences;
use crate::error::{AppError, AppResult};
use crate::history::HistoryEntry;
use crate::reminder::Reminder;
use std::sync::{Arc, Mutex};

pub use local::LocalStorage;
pub(crate) use legacy::{migrate_legacy_reminders_strict, LegacyReminder};

/// Where reminders, history and preferences live between runs.
pub trait Persistence: Send {
    /// Empty on first run.
    fn load_reminders(&self) -> AppResult<Vec<Reminder>>;
    fn save_reminders(&self, reminders: &[Reminder]) -> AppResult<()>;
    fn load_history(&self) -> AppResult<Vec<HistoryEntry>>;
    fn save_history(&self, entries: &[HistoryEntry]) -> AppResult<()>;
    fn load_preferences(&self) -> AppResult<Preferences>;
    fn save_preferences(&self, preferences: &Preferences) -> AppResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryData {
    pub reminders: Vec<Reminder>,
    pub history: Vec<HistoryEntry>,
    pub preferences: Preferences,
    pub saves: usize,
}

/// In-process storage; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<MemoryData>>,
}

impl MemoryStorage {
    pub fn with_reminders(reminders: Vec<Reminder>) -> Self {
        let storage = Self::default();
        storage.lock().reminders = reminders;
        storage
    }

    /// Copy of what has been saved so far.
    pub fn snapshot(&self) -> MemoryData {
        self.lock().clone()
    }

    /// Lock data, recovering from poison if needed
    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryData> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Persistence for MemoryStorage {
    fn load_reminders(&self) -> AppResult<Vec<Reminder>> {
        Ok(self.lock().reminders.clone())
    }

    fn save_reminders(&self, reminders: &[Reminder]) -> AppResult<()> {
        let mut data = self.lock();
        data.reminders = reminders.to_vec();
        data.saves += 1;
        Ok(())
    }

    fn load_history(&self) -> AppResult<Vec<HistoryEntry>> {
        Ok(self.lock().history.clone())
    }

    fn save_history(&self, entries: &[HistoryEntry]) -> AppResult<()> {
        let mut data = self.lock();
        data.history = entries.to_vec();
        data.saves += 1;
        Ok(())
    }

    fn load_preferences(&self) -> AppResult<Preferences> {
        Ok(self.lock().preferences.clone())
    }

    fn save_preferences(&self, preferences: &Preferences) -> AppResult<()> {
        let mut data = self.lock();
        data.preferences = preferences.clone();
        data.saves += 1;
        Ok(())
    }
}

/// Storage that refuses every write; reads return nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyStorage;

impl Persistence for ReadOnlyStorage {
    fn load_reminders(&self) -> AppResult<Vec<Reminder>> {
        Ok(Vec::new())
    }

    fn save_reminders(&self, _reminders: &[Reminder]) -> AppResult<()> {
        Err(AppError::storage("storage is read-only"))
    }

    fn load_history(&self) -> AppResult<Vec<HistoryEntry>> {
        Ok(Vec::new())
    }

    fn save_history(&self, _entries: &[HistoryEntry]) -> AppResult<()> {
        Err(AppError::storage("storage is read-only"))
    }

    fn load_preferences(&self) -> AppResult<Preferences> {
        Ok(Preferences::default())
    }

    fn save_preferences(&self, _preferences: &Preferences) -> AppResult<()> {
        Err(AppError::storage("storage is read-only"))
    }
}
