use crate::config::{
    Preferences, HISTORY_FILE, LEGACY_BACKUP_SUFFIX, PREFERENCES_FILE, REMINDERS_FILE,
};
use crate::error::AppResult;
use crate::history::HistoryEntry;
use crate::reminder::Reminder;
use crate::storage::legacy::try_migrate_legacy_data;
use crate::storage::Persistence;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON files in one data directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    app_data_path: PathBuf,
}

impl LocalStorage {
    pub fn open(app_data_path: impl Into<PathBuf>) -> AppResult<Self> {
        let app_data_path = app_data_path.into();
        fs::create_dir_all(&app_data_path)?;
        Ok(Self { app_data_path })
    }

    pub fn path(&self) -> &Path {
        &self.app_data_path
    }

    fn read(&self, file: &str) -> AppResult<Option<String>> {
        let path = self.app_data_path.join(file);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn write<T: Serialize + ?Sized>(&self, file: &str, data: &T) -> AppResult<()> {
        let path = self.app_data_path.join(file);
        let content = serde_json::to_string_pretty(data)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Missing file is a first run; an unreadable one starts over empty.
    fn load_or_default<T: DeserializeOwned + Default>(&self, file: &str) -> AppResult<T> {
        let Some(content) = self.read(file)? else {
            return Ok(T::default());
        };
        match serde_json::from_str::<T>(&content) {
            Ok(data) => Ok(data),
            Err(e) => {
                warn!("{} is corrupt ({}), starting with empty data", file, e);
                Ok(T::default())
            }
        }
    }
}

impl Persistence for LocalStorage {
    fn load_reminders(&self) -> AppResult<Vec<Reminder>> {
        let Some(content) = self.read(REMINDERS_FILE)? else {
            return Ok(Vec::new());
        };

        if let Ok(data) = serde_json::from_str::<Vec<Reminder>>(&content) {
            return Ok(data);
        }

        let backup_path = self
            .app_data_path
            .join(format!("{}{}", REMINDERS_FILE, LEGACY_BACKUP_SUFFIX));
        if let Some(migrated) = try_migrate_legacy_data(&content, Some(&backup_path)) {
            self.save_reminders(&migrated)?;
            return Ok(migrated);
        }

        warn!("{} is corrupt, starting with no reminders", REMINDERS_FILE);
        Ok(Vec::new())
    }

    fn save_reminders(&self, reminders: &[Reminder]) -> AppResult<()> {
        self.write(REMINDERS_FILE, reminders)
    }

    fn load_history(&self) -> AppResult<Vec<HistoryEntry>> {
        self.load_or_default(HISTORY_FILE)
    }

    fn save_history(&self, entries: &[HistoryEntry]) -> AppResult<()> {
        self.write(HISTORY_FILE, entries)
    }

    fn load_preferences(&self) -> AppResult<Preferences> {
        self.load_or_default(PREFERENCES_FILE)
    }

    fn save_preferences(&self, preferences: &Preferences) -> AppResult<()> {
        info!("Saving preferences: speak alarm = {}", preferences.speak_alarm);
        self.write(PREFERENCES_FILE, preferences)
    }
}
