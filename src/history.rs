use crate::reminder::{Reminder, TimeOfDay};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Dismiss,
    Snooze,
}

/// One resolved alarm. Built only by the alarm controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub name: String,
    pub time: TimeOfDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snooze_duration: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub(crate) fn dismissed(reminder: &Reminder, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: HistoryKind::Dismiss,
            name: reminder.name.clone(),
            time: reminder.time,
            dosage: Some(reminder.dosage),
            snooze_duration: None,
            timestamp,
        }
    }

    /// Expects `reminder.time` to already hold the snoozed time.
    pub(crate) fn snoozed(reminder: &Reminder, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: HistoryKind::Snooze,
            name: reminder.name.clone(),
            time: reminder.time,
            dosage: None,
            snooze_duration: Some(reminder.snooze_duration),
            timestamp,
        }
    }
}

/// Append-only, chronological record of alarm resolutions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Host must confirm with the user before calling.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
