pub mod alarm;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod reminder;
pub mod scheduler;
pub mod signal;
pub mod storage;
pub mod store;
pub mod transfer;

use std::fs;
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

pub use alarm::{AlarmController, AlarmState};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{HostConfig, Preferences};
pub use context::{ImportSummary, ReminderContext};
pub use error::{AppError, AppResult};
pub use history::{HistoryEntry, HistoryKind, HistoryLog};
pub use reminder::{NewReminder, Reminder, ReminderId, TimeOfDay, WeekdaySet};
pub use scheduler::{Scheduler, TickReport};
pub use signal::{AlarmSignal, SilentSignal, TerminalSignal};
pub use storage::{LocalStorage, MemoryStorage, Persistence};
pub use store::ReminderStore;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

const HELP: &str = "\
Commands:
  list                      show reminders
  add <json>                add a reminder, e.g. add {\"name\":\"Aspirin\",\"time\":\"08:00\",\"dosage\":1,\"stock\":20,\"repeatDays\":[1,3,5]}
  remove <id>               delete a reminder
  dismiss | snooze          resolve the ringing alarm
  status                    show the alarm state
  history                   show dismiss/snooze history
  clear-history yes         delete all history
  speech on|off             speak alarms aloud when supported
  export [path]             write reminders and history to a JSON file
  import <path>             load reminders and history from a JSON file
  quit";

pub struct AppState {
    pub context: Mutex<ReminderContext>,
}

impl AppState {
    pub fn new(context: ReminderContext) -> Self {
        Self {
            context: Mutex::new(context),
        }
    }

    /// Lock the context, recovering from poison if needed
    pub fn lock_context(&self) -> std::sync::MutexGuard<'_, ReminderContext> {
        self.context.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Ticks the scheduler forever. Each tick holds the context lock for its
/// whole run, so ticks and user commands never overlap.
fn start_tick_scheduler(state: Arc<AppState>, clock: SystemClock, interval: Duration) {
    thread::spawn(move || loop {
        thread::sleep(interval);

        let mut context = state.lock_context();
        let report = context.tick(clock.now());
        if let Some(id) = report.triggered {
            debug!("Tick started alarm for reminder {}", id);
        }
    });
}

fn format_reminder(reminder: &Reminder) -> String {
    let mut line = format!("#{} {} at {}", reminder.id, reminder.name, reminder.time);
    if reminder.is_recurring() {
        let days: Vec<&str> = reminder
            .repeat_days
            .days()
            .map(|d| DAY_NAMES[usize::from(d)])
            .collect();
        line.push_str(&format!(" ({})", days.join(", ")));
    } else if !reminder.active {
        line.push_str(" (done)");
    }
    line.push_str(&format!(
        " - Dosage: {} pills, Stock: {}",
        reminder.dosage, reminder.stock
    ));
    if reminder.is_low_stock() {
        line.push_str(&format!(
            "  Low stock: {} doses remaining!",
            reminder.stock
        ));
    }
    if let Some(notes) = &reminder.notes {
        line.push_str(&format!("\n    {}", notes));
    }
    line
}

fn format_history(entry: &HistoryEntry) -> String {
    let when = entry
        .timestamp
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S");
    match entry.kind {
        HistoryKind::Dismiss => format!(
            "{}: {} - dismiss at {} (Dosage: {})",
            when,
            entry.name,
            entry.time,
            entry.dosage.map_or("N/A".to_string(), |d| d.to_string())
        ),
        HistoryKind::Snooze => format!(
            "{}: {} - snooze to {} (Snoozed for {} min)",
            when,
            entry.name,
            entry.time,
            entry.snooze_duration.unwrap_or(0)
        ),
    }
}

/// Runs one host command line and returns the text to show the user.
pub fn handle_command(
    context: &mut ReminderContext,
    clock: &dyn Clock,
    line: &str,
) -> Result<String, String> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "" => Ok(String::new()),
        "help" => Ok(HELP.to_string()),
        "list" => {
            if context.reminders().is_empty() {
                return Ok("No reminders".to_string());
            }
            Ok(context
                .reminders()
                .iter()
                .map(format_reminder)
                .collect::<Vec<_>>()
                .join("\n"))
        }
        "add" => {
            let id = context.add_reminder_json(rest)?;
            Ok(format!("Added reminder #{}", id))
        }
        "remove" => {
            let id: ReminderId = rest
                .parse()
                .map_err(|_| format!("Invalid reminder id '{}'", rest))?;
            let removed = context.remove_reminder(id)?;
            Ok(format!("Removed #{} {}", id, removed.name))
        }
        "dismiss" => match context.dismiss(clock.now())? {
            Some(entry) => Ok(format!("Dismissed {}", entry.name)),
            None => Ok("No alarm is ringing".to_string()),
        },
        "snooze" => match context.snooze(clock.now())? {
            Some(entry) => Ok(format!("Snoozed {} until {}", entry.name, entry.time)),
            None => Ok("No alarm is ringing".to_string()),
        },
        "status" => Ok(match context.ringing_reminder() {
            Some(reminder) => format!("Ringing: {}", format_reminder(reminder)),
            None => "Idle".to_string(),
        }),
        "history" => {
            if context.history().is_empty() {
                return Ok("No history".to_string());
            }
            // Newest first
            Ok(context
                .history()
                .iter()
                .rev()
                .map(format_history)
                .collect::<Vec<_>>()
                .join("\n"))
        }
        "clear-history" => {
            if rest != "yes" {
                return Ok("Type 'clear-history yes' to delete all history".to_string());
            }
            context.clear_history()?;
            Ok("History cleared".to_string())
        }
        "speech" => {
            let enabled = match rest {
                "on" => true,
                "off" => false,
                other => return Err(format!("Expected 'on' or 'off', got '{}'", other)),
            };
            context.set_speak_alarm(enabled)?;
            Ok(format!("Speech {}", rest))
        }
        "export" => {
            let path = if rest.is_empty() {
                config::EXPORT_FILE_NAME
            } else {
                rest
            };
            fs::write(path, context.export_json()?)
                .map_err(|e| format!("Failed to write {}: {}", path, e))?;
            Ok(format!("Exported to {}", path))
        }
        "import" => {
            let content = fs::read_to_string(Path::new(rest))
                .map_err(|e| format!("Failed to read {}: {}", rest, e))?;
            let summary = context.import_json(&content)?;
            Ok(format!(
                "Imported {} reminders, {} history entries",
                summary.reminders.unwrap_or(0),
                summary.history.unwrap_or(0)
            ))
        }
        other => Err(format!("Unknown command '{}', try 'help'", other)),
    }
}

/// Headless host: loads data, ticks in the background and reads commands
/// from stdin until EOF or `quit`.
pub fn run() -> Result<(), String> {
    let config = HostConfig::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Using data directory {:?}", config.data_dir);

    let storage = LocalStorage::open(&config.data_dir)?;
    let context = ReminderContext::load(Box::new(storage), Box::new(TerminalSignal::default()))?;
    let low = context.low_stock().len();
    if low > 0 {
        warn!("{} reminder(s) are low on stock", low);
    }

    let state = Arc::new(AppState::new(context));
    let clock = SystemClock;
    start_tick_scheduler(state.clone(), clock, config.tick_interval);

    println!("Medication reminders running. Type 'help' for commands.");
    for line in io::stdin().lock().lines() {
        let line = line.map_err(|e| format!("Failed to read input: {}", e))?;
        if line.trim() == "quit" {
            break;
        }
        let mut context = state.lock_context();
        match handle_command(&mut context, &clock, &line) {
            Ok(output) if output.is_empty() => {}
            Ok(output) => println!("{}", output),
            Err(e) => println!("Error: {}", e),
        }
    }

    let context = state.lock_context();
    context.save_all()?;
    info!("Saved reminders, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ReminderContext, FixedClock) {
        let context =
            ReminderContext::load(Box::new(MemoryStorage::default()), Box::new(SilentSignal)).unwrap();
        let now = chrono::DateTime::parse_from_rfc3339("2026-10-19T08:00:00+00:00").unwrap();
        (context, FixedClock(now))
    }

    #[test]
    fn test_add_list_and_remove_commands() {
        let (mut ctx, clock) = setup();
        let out = handle_command(
            &mut ctx,
            &clock,
            r#"add {"name":"Aspirin","time":"08:00","dosage":1,"stock":2,"repeatDays":[1,3,5],"notes":"after breakfast"}"#,
        )
        .unwrap();
        assert_eq!(out, "Added reminder #1");

        let list = handle_command(&mut ctx, &clock, "list").unwrap();
        assert!(list.contains("Aspirin at 08:00 (Mon, Wed, Fri)"));
        assert!(list.contains("Low stock: 2 doses remaining!"));
        assert!(list.contains("after breakfast"));

        assert!(handle_command(&mut ctx, &clock, "remove 1").is_ok());
        assert!(handle_command(&mut ctx, &clock, "remove 1").is_err());
        assert!(handle_command(&mut ctx, &clock, "remove one").is_err());
        assert_eq!(handle_command(&mut ctx, &clock, "list").unwrap(), "No reminders");
    }

    #[test]
    fn test_alarm_commands() {
        let (mut ctx, clock) = setup();
        handle_command(
            &mut ctx,
            &clock,
            r#"add {"name":"Aspirin","time":"08:00","dosage":1,"stock":10,"snoozeDuration":15}"#,
        )
        .unwrap();
        assert_eq!(handle_command(&mut ctx, &clock, "status").unwrap(), "Idle");

        ctx.tick(clock.now());
        assert!(handle_command(&mut ctx, &clock, "status")
            .unwrap()
            .starts_with("Ringing: #1 Aspirin"));
        assert_eq!(
            handle_command(&mut ctx, &clock, "snooze").unwrap(),
            "Snoozed Aspirin until 08:15"
        );
        assert_eq!(
            handle_command(&mut ctx, &clock, "dismiss").unwrap(),
            "No alarm is ringing"
        );

        let history = handle_command(&mut ctx, &clock, "history").unwrap();
        assert!(history.contains("Aspirin - snooze to 08:15 (Snoozed for 15 min)"));
    }

    #[test]
    fn test_clear_history_needs_confirmation() {
        let (mut ctx, clock) = setup();
        handle_command(&mut ctx, &clock, r#"add {"name":"A","time":"08:00","dosage":1,"stock":10}"#)
            .unwrap();
        ctx.tick(clock.now());
        handle_command(&mut ctx, &clock, "dismiss").unwrap();

        handle_command(&mut ctx, &clock, "clear-history").unwrap();
        assert_eq!(ctx.history().len(), 1);
        handle_command(&mut ctx, &clock, "clear-history yes").unwrap();
        assert!(ctx.history().is_empty());
    }

    #[test]
    fn test_export_import_commands() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("backup.json");
        let path = path.to_str().unwrap();

        let (mut ctx, clock) = setup();
        handle_command(&mut ctx, &clock, r#"add {"name":"A","time":"08:00","dosage":1,"stock":10}"#)
            .unwrap();
        handle_command(&mut ctx, &clock, &format!("export {}", path)).unwrap();

        let (mut other, _) = setup();
        let out = handle_command(&mut other, &clock, &format!("import {}", path)).unwrap();
        assert_eq!(out, "Imported 1 reminders, 0 history entries");
        assert_eq!(other.reminders(), ctx.reminders());
    }

    #[test]
    fn test_unknown_and_bad_arguments() {
        let (mut ctx, clock) = setup();
        assert!(handle_command(&mut ctx, &clock, "frobnicate").is_err());
        assert!(handle_command(&mut ctx, &clock, "speech maybe").is_err());
        assert_eq!(handle_command(&mut ctx, &clock, "speech off").unwrap(), "Speech off");
        assert!(!ctx.preferences().speak_alarm);
        assert!(handle_command(&mut ctx, &clock, "add {\"name\":\"A\"}").is_err());
    }
}
