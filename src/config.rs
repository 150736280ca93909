//! Application configuration
//!
//! Centralized constants for the reminder core plus the host's
//! environment-driven settings.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Recommended period between scheduler ticks
pub const TICK_INTERVAL_MS: u64 = 1000;

/// Stock at or below this (and above zero) is reported as low
pub const LOW_STOCK_THRESHOLD: u32 = 3;

/// Minutes in a day, used for time-of-day wraparound
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Snooze length used when a new reminder does not specify one
pub const DEFAULT_SNOOZE_MINUTES: u32 = 5;

/// Display color used when a new reminder does not specify one
pub const DEFAULT_REMINDER_COLOR: &str = "#4a90e2";

/// Directory under the user's local data dir
pub const DATA_DIR_NAME: &str = "MedReminder";

pub const REMINDERS_FILE: &str = "reminders.json";
pub const HISTORY_FILE: &str = "history.json";
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Raw copy of a file written before a legacy migration overwrites it
pub const LEGACY_BACKUP_SUFFIX: &str = ".legacy_backup";

/// Default file name for bulk exports
pub const EXPORT_FILE_NAME: &str = "medicine_reminder_data.json";

/// User preferences persisted next to the reminders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Speak the reminder aloud when the alarm starts
    #[serde(default = "default_speak_alarm")]
    pub speak_alarm: bool,
}

fn default_speak_alarm() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            speak_alarm: default_speak_alarm(),
        }
    }
}

/// Settings for the headless host, read from the environment
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub data_dir: PathBuf,
    pub tick_interval: Duration,
    pub log_level: String,
}

impl HostConfig {
    /// Reads `MED_REMINDER_DATA_DIR`, `MED_REMINDER_TICK_MS` and `RUST_LOG`.
    pub fn from_env() -> Result<Self, String> {
        let data_dir = match env::var_os("MED_REMINDER_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .ok_or("Failed to get local data dir")?
                .join(DATA_DIR_NAME),
        };

        let tick_ms = match env::var("MED_REMINDER_TICK_MS") {
            Ok(raw) => parse_tick_ms(&raw)?,
            Err(_) => TICK_INTERVAL_MS,
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            data_dir,
            tick_interval: Duration::from_millis(tick_ms),
            log_level,
        })
    }
}

fn parse_tick_ms(raw: &str) -> Result<u64, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err("MED_REMINDER_TICK_MS must be greater than zero".to_string()),
        Ok(ms) => Ok(ms),
        Err(e) => Err(format!("Invalid MED_REMINDER_TICK_MS '{}': {}", raw, e)),
    }
}
