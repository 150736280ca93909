//! Bulk export and import of reminders and history.

use crate::error::{AppError, AppResult};
use crate::history::HistoryEntry;
use crate::reminder::{Reminder, ReminderId};
use crate::storage::{migrate_legacy_reminders_strict, LegacyReminder};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Deserialize)]
struct ImportDocument {
    #[serde(default)]
    reminders: Option<Value>,
    #[serde(default)]
    history: Option<Vec<HistoryEntry>>,
}

/// Current-format reminders, or a browser-era list when every record
/// converts without loss.
fn parse_reminders(value: Value) -> AppResult<Vec<Reminder>> {
    let current_err = match serde_json::from_value::<Vec<Reminder>>(value.clone()) {
        Ok(reminders) => return Ok(reminders),
        Err(e) => e,
    };
    let invalid = |detail: String| AppError::parse(format!("invalid import file: {}", detail));

    let legacy: Vec<LegacyReminder> =
        serde_json::from_value(value).map_err(|_| invalid(current_err.to_string()))?;
    let migrated = migrate_legacy_reminders_strict(legacy)
        .map_err(|problem| invalid(format!("{} ({})", current_err, problem)))?;
    info!("Import file uses the legacy reminder format, converted {}", migrated.len());
    Ok(migrated)
}

/// Export document. On import a missing collection leaves the current one
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Vec<Reminder>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
}

impl ExportBundle {
    pub fn new(reminders: &[Reminder], history: &[HistoryEntry]) -> Self {
        Self {
            reminders: Some(reminders.to_vec()),
            history: Some(history.to_vec()),
        }
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and checks an import document without touching any state.
    pub fn from_json(content: &str) -> AppResult<Self> {
        let document: ImportDocument = serde_json::from_str(content)
            .map_err(|e| AppError::parse(format!("invalid import file: {}", e)))?;
        let bundle = ExportBundle {
            reminders: document.reminders.map(parse_reminders).transpose()?,
            history: document.history,
        };

        if let Some(reminders) = &bundle.reminders {
            let mut ids: HashSet<ReminderId> = HashSet::new();
            for reminder in reminders {
                if reminder.name.trim().is_empty() {
                    return Err(AppError::validation(format!(
                        "reminder {} has an empty name",
                        reminder.id
                    )));
                }
                if !ids.insert(reminder.id) {
                    return Err(AppError::validation(format!(
                        "duplicate reminder id {}",
                        reminder.id
                    )));
                }
            }
        }

        Ok(bundle)
    }
}
