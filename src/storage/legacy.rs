use crate::reminder::{Reminder, ReminderId, TimeOfDay, WeekdaySet};
use chrono::NaiveDate;
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Reminder as written by the browser version of the app. Numeric form
/// fields left blank were stored as `null`, and the trigger date uses the
/// `"Sat Oct 17 2026"` format.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReminder {
    #[serde(default)]
    pub id: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub dosage: Option<f64>,
    #[serde(default)]
    pub stock: Option<f64>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub repeat_days: Option<Vec<i64>>,
    #[serde(default)]
    pub last_triggered_date: Option<String>,
    #[serde(default)]
    pub snooze_duration: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
}

fn whole_number(value: Option<f64>) -> u32 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v.min(f64::from(u32::MAX)).floor() as u32,
        _ => 0,
    }
}

/// Accepts ISO dates as well as the browser's `Date.toDateString()` output.
pub fn parse_legacy_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%a %b %d %Y"))
        .ok()
}

/// Converts one legacy record, or `None` if its time cannot be recovered.
pub fn migrate_legacy_reminder(legacy: LegacyReminder, id: ReminderId) -> Option<Reminder> {
    let time = match legacy.time.as_deref().map(str::parse::<TimeOfDay>) {
        Some(Ok(time)) => time,
        _ => {
            warn!(
                "Dropping legacy reminder {:?}: unusable time {:?}",
                legacy.name, legacy.time
            );
            return None;
        }
    };

    let days: Vec<i64> = legacy
        .repeat_days
        .unwrap_or_default()
        .into_iter()
        .filter(|d| (0..=6).contains(d))
        .collect();
    let repeat_days = WeekdaySet::from_days(&days).unwrap_or_default();

    let name = legacy
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Unnamed reminder".to_string());

    Some(Reminder {
        id,
        name,
        time,
        notes: legacy.notes.filter(|n| !n.trim().is_empty()),
        dosage: whole_number(legacy.dosage),
        stock: whole_number(legacy.stock),
        active: legacy.active.unwrap_or(true),
        repeat_days,
        last_triggered_date: legacy
            .last_triggered_date
            .as_deref()
            .and_then(parse_legacy_date),
        snooze_duration: whole_number(legacy.snooze_duration),
        color: legacy.color.unwrap_or_default(),
    })
}

/// Largest id the browser could have produced (`Number.MAX_SAFE_INTEGER`).
const MAX_LEGACY_ID: f64 = 9_007_199_254_740_991.0;

fn usable_id(raw: f64) -> Option<ReminderId> {
    (raw.is_finite() && raw >= 0.0 && raw.fract() == 0.0 && raw <= MAX_LEGACY_ID)
        .then_some(raw as ReminderId)
}

/// Keeps every usable, unique id and numbers the rest after the largest one.
fn assign_ids(records: &[LegacyReminder]) -> Vec<ReminderId> {
    let mut next_id = records
        .iter()
        .filter_map(|r| r.id.and_then(usable_id))
        .max()
        .unwrap_or(0)
        + 1;
    let mut seen: HashSet<ReminderId> = HashSet::new();

    records
        .iter()
        .map(|record| match record.id.and_then(usable_id) {
            Some(id) if seen.insert(id) => id,
            _ => {
                let id = next_id;
                next_id += 1;
                seen.insert(id);
                id
            }
        })
        .collect()
}

/// Converts a whole legacy list, dropping records whose time is unusable.
pub fn migrate_legacy_reminders(records: Vec<LegacyReminder>) -> Vec<Reminder> {
    let total = records.len();
    let ids = assign_ids(&records);
    let migrated: Vec<Reminder> = records
        .into_iter()
        .zip(ids)
        .filter_map(|(record, id)| migrate_legacy_reminder(record, id))
        .collect();
    info!("Migrated {} of {} legacy reminders", migrated.len(), total);
    migrated
}

fn out_of_range(value: Option<f64>) -> bool {
    value.is_some_and(|v| {
        !(v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX))
    })
}

fn strict_problem(record: &LegacyReminder) -> Option<String> {
    let label = record.name.as_deref().unwrap_or("unnamed");
    if !matches!(record.time.as_deref().map(str::parse::<TimeOfDay>), Some(Ok(_))) {
        return Some(format!("{}: unusable time {:?}", label, record.time));
    }
    for (field, value) in [
        ("dosage", record.dosage),
        ("stock", record.stock),
        ("snoozeDuration", record.snooze_duration),
    ] {
        if out_of_range(value) {
            return Some(format!("{}: bad {} {:?}", label, field, value));
        }
    }
    if let Some(day) = record
        .repeat_days
        .iter()
        .flatten()
        .find(|d| !(0..=6).contains(*d))
    {
        return Some(format!("{}: weekday {} out of range", label, day));
    }
    match record.last_triggered_date.as_deref() {
        Some(raw) if parse_legacy_date(raw).is_none() => {
            Some(format!("{}: unreadable date {:?}", label, raw))
        }
        _ => None,
    }
}

/// Like [`migrate_legacy_reminders`], but refuses the whole list if any
/// record would be dropped or clamped. Blank (`null`) numbers still become 0.
pub fn migrate_legacy_reminders_strict(
    records: Vec<LegacyReminder>,
) -> Result<Vec<Reminder>, String> {
    if let Some(problem) = records.iter().find_map(strict_problem) {
        return Err(problem);
    }
    Ok(migrate_legacy_reminders(records))
}

/// Try to parse content as the legacy format and migrate it.
///
/// Returns `None` when the content already parses as the current format or
/// is not legacy data at all.
pub fn try_migrate_legacy_data(content: &str, backup_path: Option<&Path>) -> Option<Vec<Reminder>> {
    if serde_json::from_str::<Vec<Reminder>>(content).is_ok() {
        return None;
    }
    let legacy = serde_json::from_str::<Vec<LegacyReminder>>(content).ok()?;

    info!("Detected legacy reminder format, migrating...");

    if let Some(backup) = backup_path {
        match fs::write(backup, content) {
            Ok(()) => info!("Created backup at {:?}", backup),
            Err(e) => warn!("Failed to create backup: {}", e),
        }
    }

    Some(migrate_legacy_reminders(legacy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BROWSER_DATA: &str = r##"[
        {"id": 1700000000000, "name": "Aspirin", "time": "08:00", "notes": "",
         "dosage": 2, "stock": 10, "active": true, "repeatDays": [1, 3, 5],
         "lastTriggeredDate": "Mon Oct 12 2026", "snoozeDuration": 10, "color": "#ff0000"},
        {"id": 1700000000001, "name": "Syrup", "time": "21:30",
         "dosage": null, "stock": null, "active": false,
         "lastTriggeredDate": null, "snoozeDuration": null, "color": "#00ff00"}
    ]"##;

    #[test]
    fn test_parse_legacy_date() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(parse_legacy_date("Sat Oct 17 2026"), Some(expected));
        assert_eq!(parse_legacy_date("2026-10-17"), Some(expected));
        assert_eq!(parse_legacy_date("yesterday"), None);
    }

    #[test]
    fn test_migrates_browser_records() {
        let migrated = try_migrate_legacy_data(BROWSER_DATA, None).unwrap();
        assert_eq!(migrated.len(), 2);

        let aspirin = &migrated[0];
        assert_eq!(aspirin.id, 1_700_000_000_000);
        assert_eq!(aspirin.notes, None);
        assert_eq!(aspirin.repeat_days.days().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(
            aspirin.last_triggered_date,
            NaiveDate::from_ymd_opt(2026, 10, 12)
        );

        let syrup = &migrated[1];
        assert_eq!(syrup.dosage, 0);
        assert_eq!(syrup.stock, 0);
        assert_eq!(syrup.snooze_duration, 0);
        assert!(!syrup.active);
        assert!(!syrup.is_recurring());
    }

    #[test]
    fn test_current_format_is_not_migrated() {
        let current = r#"[{"id":1,"name":"A","time":"08:00","notes":null,"dosage":1,"stock":2,
            "active":true,"repeatDays":[],"lastTriggeredDate":null,"snoozeDuration":5,"color":""}]"#;
        assert!(try_migrate_legacy_data(current, None).is_none());
        assert!(try_migrate_legacy_data("not json", None).is_none());
    }

    #[test]
    fn test_drops_bad_time_and_fixes_ids() {
        let raw = r#"[
            {"id": 5, "name": "Keep", "time": "07:00", "dosage": 1, "stock": 1, "repeatDays": [9, 2]},
            {"id": 5, "name": "Dup", "time": "07:30", "dosage": 1, "stock": 1},
            {"name": "Broken", "time": "7 o'clock", "dosage": 1, "stock": 1}
        ]"#;
        let migrated = try_migrate_legacy_data(raw, None).unwrap();
        assert_eq!(migrated.len(), 2);
        assert_eq!(migrated[0].id, 5);
        assert_eq!(migrated[0].repeat_days.days().collect::<Vec<_>>(), vec![2]);
        assert_eq!(migrated[1].id, 6);
    }

    #[test]
    fn test_huge_ids_are_renumbered() {
        let raw = r#"[
            {"id": 1e19, "name": "Huge", "time": "07:00", "dosage": 1, "stock": 1},
            {"id": 9223372036854775807, "name": "Max", "time": "08:00", "dosage": 1, "stock": 1},
            {"id": 2.5, "name": "Half", "time": "09:00", "dosage": 1, "stock": 1},
            {"id": 4, "name": "Plain", "time": "10:00", "dosage": 1, "stock": 1}
        ]"#;
        let migrated = try_migrate_legacy_data(raw, None).unwrap();
        let ids: Vec<ReminderId> = migrated.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 6, 7, 4]);
    }

    #[test]
    fn test_strict_migration_refuses_lossy_records() {
        let parse = |raw: &str| serde_json::from_str::<Vec<LegacyReminder>>(raw).unwrap();

        let blanks = parse(r#"[{"name": "Syrup", "time": "21:30", "dosage": null, "stock": null}]"#);
        let migrated = migrate_legacy_reminders_strict(blanks).unwrap();
        assert_eq!(migrated[0].dosage, 0);

        for raw in [
            r#"[{"name": "A", "time": "8", "dosage": 1, "stock": 1}]"#,
            r#"[{"name": "A", "time": "08:00", "dosage": 1, "stock": -1}]"#,
            r#"[{"name": "A", "time": "08:00", "dosage": 1.5, "stock": 1}]"#,
            r#"[{"name": "A", "time": "08:00", "dosage": 1, "stock": 1, "repeatDays": [7]}]"#,
            r#"[{"name": "A", "time": "08:00", "lastTriggeredDate": "someday"}]"#,
        ] {
            assert!(migrate_legacy_reminders_strict(parse(raw)).is_err(), "{}", raw);
        }
    }

    #[test]
    fn test_writes_backup() {
        let dir = TempDir::new().unwrap();
        let backup = dir.path().join("reminders.json.legacy_backup");
        try_migrate_legacy_data(BROWSER_DATA, Some(&backup)).unwrap();
        assert_eq!(fs::read_to_string(&backup).unwrap(), BROWSER_DATA);
    }
}
