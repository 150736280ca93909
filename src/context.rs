use crate::alarm::{AlarmController, AlarmState};
use crate::config::Preferences;
use crate::error::{AppError, AppResult};
use crate::history::{HistoryEntry, HistoryLog};
use crate::reminder::{NewReminder, Reminder, ReminderId};
use crate::scheduler::{Scheduler, TickReport};
use crate::signal::AlarmSignal;
use crate::storage::Persistence;
use crate::store::ReminderStore;
use crate::transfer::ExportBundle;
use chrono::{DateTime, FixedOffset};
use log::{info, warn};

/// Counts of what an import replaced; `None` means the document left that
/// collection alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub reminders: Option<usize>,
    pub history: Option<usize>,
}

/// Everything the host needs to run reminders: the store, the history, the
/// single alarm slot and the persistence they are saved to.
///
/// Every mutating call saves before returning. If the save fails the
/// in-memory change is kept and the error is returned.
pub struct ReminderContext {
    store: ReminderStore,
    history: HistoryLog,
    alarm: AlarmController,
    scheduler: Scheduler,
    preferences: Preferences,
    persistence: Box<dyn Persistence>,
}

fn recover_parse<T: Default>(what: &str, loaded: AppResult<T>) -> AppResult<T> {
    match loaded {
        Ok(data) => Ok(data),
        Err(AppError::Parse(e)) => {
            warn!("Stored {} unreadable ({}), starting empty", what, e);
            Ok(T::default())
        }
        Err(e) => Err(e),
    }
}

impl ReminderContext {
    pub fn load(persistence: Box<dyn Persistence>, signal: Box<dyn AlarmSignal>) -> AppResult<Self> {
        let reminders = recover_parse("reminders", persistence.load_reminders())?;
        let history = recover_parse("history", persistence.load_history())?;
        let preferences = recover_parse("preferences", persistence.load_preferences())?;

        info!(
            "Loaded {} reminders and {} history entries",
            reminders.len(),
            history.len()
        );

        let mut alarm = AlarmController::new(signal);
        alarm.set_speech_enabled(preferences.speak_alarm);

        Ok(Self {
            store: ReminderStore::from_reminders(reminders),
            history: HistoryLog::from_entries(history),
            alarm,
            scheduler: Scheduler,
            preferences,
            persistence,
        })
    }

    // ============ Scheduling ============

    /// One scheduling pass. Save failures are logged; a tick never fails.
    pub fn tick(&mut self, now: DateTime<FixedOffset>) -> TickReport {
        let report = self.scheduler.tick(&mut self.store, &mut self.alarm, now);
        if report.reset_changed {
            if let Err(e) = self.save_reminders() {
                warn!("Failed to save reminders after daily reset: {}", e);
            }
        }
        report
    }

    /// `Ok(None)` when nothing is ringing.
    pub fn dismiss(&mut self, now: DateTime<FixedOffset>) -> AppResult<Option<HistoryEntry>> {
        let entry = self.alarm.dismiss(&mut self.store, &mut self.history, now);
        if entry.is_some() {
            self.save_resolution()?;
        }
        Ok(entry)
    }

    /// `Ok(None)` when nothing is ringing.
    pub fn snooze(&mut self, now: DateTime<FixedOffset>) -> AppResult<Option<HistoryEntry>> {
        let entry = self.alarm.snooze(&mut self.store, &mut self.history, now);
        if entry.is_some() {
            self.save_resolution()?;
        }
        Ok(entry)
    }

    // ============ Reminders ============

    pub fn add_reminder(&mut self, spec: NewReminder) -> AppResult<ReminderId> {
        let id = self.store.add(spec)?;
        info!("Added reminder {}", id);
        self.save_reminders()?;
        Ok(id)
    }

    /// Adds a reminder from its JSON form, e.g. a host command payload.
    pub fn add_reminder_json(&mut self, json: &str) -> AppResult<ReminderId> {
        let spec: NewReminder = serde_json::from_str(json)
            .map_err(|e| AppError::validation(format!("invalid reminder: {}", e)))?;
        self.add_reminder(spec)
    }

    /// Removing the ringing reminder silences the alarm.
    pub fn remove_reminder(&mut self, id: ReminderId) -> AppResult<Reminder> {
        let removed = self.store.remove(id)?;
        self.alarm.release_if_missing(&self.store);
        info!("Removed reminder {} ('{}')", id, removed.name);
        self.save_reminders()?;
        Ok(removed)
    }

    // ============ History & preferences ============

    /// Callers confirm with the user first.
    pub fn clear_history(&mut self) -> AppResult<()> {
        let cleared = self.history.len();
        self.history.clear();
        info!("Cleared {} history entries", cleared);
        self.persistence.save_history(self.history.entries())
    }

    pub fn set_speak_alarm(&mut self, enabled: bool) -> AppResult<()> {
        self.preferences.speak_alarm = enabled;
        self.alarm.set_speech_enabled(enabled);
        self.persistence.save_preferences(&self.preferences)
    }

    // ============ Export / import ============

    pub fn export_json(&self) -> AppResult<String> {
        ExportBundle::new(self.store.list(), self.history.entries()).to_json()
    }

    /// Replaces whichever collections the document carries. A malformed
    /// document changes nothing.
    pub fn import_json(&mut self, content: &str) -> AppResult<ImportSummary> {
        let bundle = ExportBundle::from_json(content)?;
        let mut summary = ImportSummary::default();

        if let Some(reminders) = bundle.reminders {
            summary.reminders = Some(reminders.len());
            // Imported ids may be reused by unrelated reminders.
            self.alarm.release();
            self.store.replace_all(reminders);
            self.save_reminders()?;
        }
        if let Some(history) = bundle.history {
            summary.history = Some(history.len());
            self.history = HistoryLog::from_entries(history);
            self.persistence.save_history(self.history.entries())?;
        }

        info!(
            "Imported {:?} reminders and {:?} history entries",
            summary.reminders, summary.history
        );
        Ok(summary)
    }

    // ============ Queries ============

    pub fn alarm_state(&self) -> AlarmState {
        self.alarm.state()
    }

    pub fn ringing_reminder(&self) -> Option<&Reminder> {
        match self.alarm.state() {
            AlarmState::Ringing { reminder_id } => self.store.get(reminder_id),
            AlarmState::Idle => None,
        }
    }

    pub fn reminders(&self) -> &[Reminder] {
        self.store.list()
    }

    pub fn reminder(&self, id: ReminderId) -> Option<&Reminder> {
        self.store.get(id)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    pub fn low_stock(&self) -> Vec<&Reminder> {
        self.store.low_stock()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Writes everything; used at teardown.
    pub fn save_all(&self) -> AppResult<()> {
        self.save_reminders()?;
        self.persistence.save_history(self.history.entries())?;
        self.persistence.save_preferences(&self.preferences)
    }

    fn save_reminders(&self) -> AppResult<()> {
        self.persistence.save_reminders(self.store.list())
    }

    fn save_resolution(&self) -> AppResult<()> {
        self.save_reminders()?;
        self.persistence.save_history(self.history.entries())
    }
}
