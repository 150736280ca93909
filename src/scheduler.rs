use crate::alarm::AlarmController;
use crate::reminder::{Reminder, ReminderId, TimeOfDay};
use crate::store::ReminderStore;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Weekday};
use log::debug;

/// Outcome of one scheduling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The daily reset changed at least one reminder.
    pub reset_changed: bool,
    /// Reminder that started ringing on this tick.
    pub triggered: Option<ReminderId>,
}

/// Decides, once per host tick, whether a reminder starts ringing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    /// Daily reset then trigger pass. At most one alarm starts per tick.
    pub fn tick(
        &self,
        store: &mut ReminderStore,
        alarm: &mut AlarmController,
        now: DateTime<FixedOffset>,
    ) -> TickReport {
        let today = now.date_naive();
        let reset_changed = self.reset_recurring(store, today);

        let mut triggered = None;
        if !alarm.is_ringing() {
            let minute = TimeOfDay::from_time(&now.time());
            if let Some(reminder) = self.find_due(store, today, minute) {
                if alarm.trigger(reminder, now) {
                    triggered = Some(reminder.id);
                }
            }
        }

        TickReport {
            reset_changed,
            triggered,
        }
    }

    /// Re-arms recurring reminders scheduled for today that have not been
    /// resolved today, and drops trigger markers from earlier days.
    pub fn reset_recurring(&self, store: &mut ReminderStore, today: NaiveDate) -> bool {
        let weekday = today.weekday();
        let mut changed = false;

        for reminder in store.iter_mut() {
            if !scheduled_on(reminder, weekday) || reminder.resolved_on(today) {
                continue;
            }
            if !reminder.active {
                reminder.active = true;
                changed = true;
            }
            if matches!(reminder.last_triggered_date, Some(date) if date < today) {
                debug!("Clearing stale trigger date for reminder {}", reminder.id);
                reminder.last_triggered_date = None;
                changed = true;
            }
        }

        changed
    }

    /// First reminder in store order that is due at `minute` today.
    pub fn find_due<'a>(
        &self,
        store: &'a ReminderStore,
        today: NaiveDate,
        minute: TimeOfDay,
    ) -> Option<&'a Reminder> {
        let weekday = today.weekday();
        store.list().iter().find(|r| {
            if r.time != minute {
                return false;
            }
            if r.is_recurring() {
                scheduled_on(r, weekday) && !r.resolved_on(today)
            } else {
                r.active
            }
        })
    }
}

fn scheduled_on(reminder: &Reminder, weekday: Weekday) -> bool {
    reminder.repeat_days.contains(weekday)
}
