use crate::history::{HistoryEntry, HistoryLog};
use crate::reminder::{Reminder, ReminderId, TimeOfDay};
use crate::signal::{start_or_fall_back, AlarmSignal};
use crate::store::ReminderStore;
use chrono::{DateTime, FixedOffset, Utc};
use log::{info, warn};

/// What the presentation layer polls to know whether something is ringing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Idle,
    Ringing { reminder_id: ReminderId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveAlarm {
    pub reminder_id: ReminderId,
    pub started_at: DateTime<FixedOffset>,
}

/// Holds the single ringing alarm and resolves it.
///
/// Only dismiss and snooze leave `Ringing`; both are no-ops while idle so a
/// doubled user action cannot resolve twice.
pub struct AlarmController {
    active: Option<ActiveAlarm>,
    signal: Box<dyn AlarmSignal>,
    speech_enabled: bool,
}

impl AlarmController {
    pub fn new(signal: Box<dyn AlarmSignal>) -> Self {
        Self {
            active: None,
            signal,
            speech_enabled: true,
        }
    }

    pub fn set_speech_enabled(&mut self, enabled: bool) {
        self.speech_enabled = enabled;
    }

    pub fn state(&self) -> AlarmState {
        match self.active {
            Some(alarm) => AlarmState::Ringing {
                reminder_id: alarm.reminder_id,
            },
            None => AlarmState::Idle,
        }
    }

    pub fn active(&self) -> Option<&ActiveAlarm> {
        self.active.as_ref()
    }

    pub fn is_ringing(&self) -> bool {
        self.active.is_some()
    }

    /// Returns false without side effects if an alarm is already ringing.
    pub fn trigger(&mut self, reminder: &Reminder, now: DateTime<FixedOffset>) -> bool {
        if let Some(current) = self.active {
            warn!(
                "Ignoring trigger for reminder {} while reminder {} is ringing",
                reminder.id, current.reminder_id
            );
            return false;
        }

        self.active = Some(ActiveAlarm {
            reminder_id: reminder.id,
            started_at: now,
        });
        info!("Alarm ringing for '{}' ({})", reminder.name, reminder.time);

        start_or_fall_back(self.signal.as_mut(), &reminder.name);

        if self.speech_enabled && self.signal.supports_speech() {
            let text = match reminder.notes.as_deref() {
                Some(notes) => format!("Time for your {}! Notes: {}", reminder.name, notes),
                None => format!("Time for your {}!", reminder.name),
            };
            self.signal.announce(&text);
        }

        self.signal
            .show_alarm_message(&format!("Time for your {}!", reminder.name));
        true
    }

    /// Takes the dose: stock drops by the dosage (floored at zero), recurring
    /// reminders are marked done for today, one-time reminders are disabled.
    pub fn dismiss(
        &mut self,
        store: &mut ReminderStore,
        history: &mut HistoryLog,
        now: DateTime<FixedOffset>,
    ) -> Option<HistoryEntry> {
        let reminder = self.take_ringing(store)?;

        reminder.stock = reminder.stock.saturating_sub(reminder.dosage);
        if reminder.is_recurring() {
            reminder.last_triggered_date = Some(now.date_naive());
        } else {
            reminder.active = false;
        }

        let entry = HistoryEntry::dismissed(reminder, now.with_timezone(&Utc));
        info!(
            "Dismissed '{}': {} dose(s) taken, {} left",
            reminder.name, reminder.dosage, reminder.stock
        );
        history.append(entry.clone());
        self.finish();
        Some(entry)
    }

    /// Moves the reminder's time to now + snooze duration, wrapping at
    /// midnight. Nothing else about the reminder changes.
    pub fn snooze(
        &mut self,
        store: &mut ReminderStore,
        history: &mut HistoryLog,
        now: DateTime<FixedOffset>,
    ) -> Option<HistoryEntry> {
        let reminder = self.take_ringing(store)?;

        reminder.time = TimeOfDay::from_time(&now.time()).add_minutes(reminder.snooze_duration);

        let entry = HistoryEntry::snoozed(reminder, now.with_timezone(&Utc));
        info!(
            "Snoozed '{}' for {} min, next at {}",
            reminder.name, reminder.snooze_duration, reminder.time
        );
        history.append(entry.clone());
        self.finish();
        Some(entry)
    }

    /// Silences the alarm if its reminder is no longer in the store.
    pub(crate) fn release_if_missing(&mut self, store: &ReminderStore) -> bool {
        match self.active {
            Some(alarm) if !store.contains(alarm.reminder_id) => {
                info!(
                    "Reminder {} removed while ringing, silencing alarm",
                    alarm.reminder_id
                );
                self.finish();
                true
            }
            _ => false,
        }
    }

    /// Silences and clears whatever is ringing.
    pub(crate) fn release(&mut self) -> bool {
        match self.active {
            Some(alarm) => {
                info!("Silencing alarm for reminder {}", alarm.reminder_id);
                self.finish();
                true
            }
            None => false,
        }
    }

    fn take_ringing<'a>(&mut self, store: &'a mut ReminderStore) -> Option<&'a mut Reminder> {
        let alarm = self.active?;
        let found = store.get_mut(alarm.reminder_id);
        if found.is_none() {
            warn!(
                "Ringing reminder {} no longer exists, clearing alarm",
                alarm.reminder_id
            );
            self.finish();
        }
        found
    }

    fn finish(&mut self) {
        self.signal.stop_alarm_signal();
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryKind;
    use crate::reminder::NewReminder;
    use crate::signal::testing::{Call, RecordingSignal};
    use chrono::NaiveDate;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn setup(spec: NewReminder) -> (AlarmController, RecordingSignal, ReminderStore, ReminderId) {
        let signal = RecordingSignal::default();
        let controller = AlarmController::new(Box::new(signal.clone()));
        let mut store = ReminderStore::default();
        let id = store.add(spec).unwrap();
        (controller, signal, store, id)
    }

    #[test]
    fn test_trigger_enters_ringing_once() {
        let (mut alarm, signal, mut store, id) = setup(NewReminder::new("A", "08:00", 1, 5));
        store.add(NewReminder::new("B", "08:00", 1, 5)).unwrap();
        let now = at("2026-10-17T08:00:00+00:00");

        assert_eq!(alarm.state(), AlarmState::Idle);
        assert!(alarm.trigger(store.get(id).unwrap(), now));
        assert_eq!(alarm.state(), AlarmState::Ringing { reminder_id: id });

        let other = store.list()[1].clone();
        assert!(!alarm.trigger(&other, now));
        assert_eq!(alarm.state(), AlarmState::Ringing { reminder_id: id });
        assert_eq!(
            signal.calls(),
            vec![Call::Start, Call::Message("Time for your A!".to_string())]
        );
    }

    #[test]
    fn test_dismiss_one_time_deactivates() {
        let (mut alarm, signal, mut store, id) = setup(NewReminder::new("A", "09:00", 3, 2));
        let mut history = HistoryLog::default();
        let now = at("2026-10-17T09:00:30+00:00");

        alarm.trigger(store.get(id).unwrap(), now);
        let entry = alarm.dismiss(&mut store, &mut history, now).unwrap();

        let reminder = store.get(id).unwrap();
        assert_eq!(reminder.stock, 0);
        assert!(!reminder.active);
        assert_eq!(reminder.last_triggered_date, None);
        assert_eq!(entry.kind, HistoryKind::Dismiss);
        assert_eq!(entry.dosage, Some(3));
        assert_eq!(history.len(), 1);
        assert_eq!(alarm.state(), AlarmState::Idle);
        assert_eq!(signal.calls().last(), Some(&Call::Stop));
    }

    #[test]
    fn test_dismiss_recurring_marks_today() {
        let (mut alarm, _signal, mut store, id) =
            setup(NewReminder::new("A", "08:00", 2, 5).repeat_on(&[1, 3, 5]));
        let mut history = HistoryLog::default();
        let now = at("2026-10-19T08:00:00+00:00");

        alarm.trigger(store.get(id).unwrap(), now);
        alarm.dismiss(&mut store, &mut history, now).unwrap();

        let reminder = store.get(id).unwrap();
        assert_eq!(reminder.stock, 3);
        assert!(reminder.active);
        assert_eq!(
            reminder.last_triggered_date,
            Some(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())
        );
    }

    #[test]
    fn test_dismiss_uses_local_date_of_offset() {
        let (mut alarm, _signal, mut store, id) =
            setup(NewReminder::new("A", "00:30", 1, 5).repeat_on(&[0, 1, 2, 3, 4, 5, 6]));
        let mut history = HistoryLog::default();
        let now = at("2026-10-18T00:30:00+09:00");

        alarm.trigger(store.get(id).unwrap(), now);
        let entry = alarm.dismiss(&mut store, &mut history, now).unwrap();

        assert_eq!(
            store.get(id).unwrap().last_triggered_date,
            Some(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())
        );
        assert_eq!(entry.timestamp.to_rfc3339(), "2026-10-17T15:30:00+00:00");
    }

    #[test]
    fn test_snooze_wraps_past_midnight() {
        let (mut alarm, _signal, mut store, id) =
            setup(NewReminder::new("A", "23:55", 1, 5).repeat_on(&[6]).snooze_for(10));
        let mut history = HistoryLog::default();
        let now = at("2026-10-17T23:55:40+00:00");

        alarm.trigger(store.get(id).unwrap(), now);
        let entry = alarm.snooze(&mut store, &mut history, now).unwrap();

        let reminder = store.get(id).unwrap();
        assert_eq!(reminder.time.to_string(), "00:05");
        assert_eq!(reminder.stock, 5);
        assert!(reminder.active);
        assert_eq!(reminder.last_triggered_date, None);
        assert_eq!(entry.kind, HistoryKind::Snooze);
        assert_eq!(entry.time.to_string(), "00:05");
        assert_eq!(entry.snooze_duration, Some(10));
        assert!(alarm.active().is_none());
    }

    #[test]
    fn test_resolve_while_idle_is_noop() {
        let (mut alarm, signal, mut store, id) = setup(NewReminder::new("A", "09:00", 1, 5));
        let mut history = HistoryLog::default();
        let now = at("2026-10-17T09:00:00+00:00");

        assert!(alarm.dismiss(&mut store, &mut history, now).is_none());
        assert!(alarm.snooze(&mut store, &mut history, now).is_none());

        alarm.trigger(store.get(id).unwrap(), now);
        assert!(alarm.dismiss(&mut store, &mut history, now).is_some());
        assert!(alarm.dismiss(&mut store, &mut history, now).is_none());

        assert_eq!(store.get(id).unwrap().stock, 4);
        assert_eq!(history.len(), 1);
        assert_eq!(signal.calls().iter().filter(|c| **c == Call::Stop).count(), 1);
    }

    #[test]
    fn test_failed_sound_still_rings() {
        let signal = RecordingSignal {
            fail_start: true,
            ..Default::default()
        };
        let mut alarm = AlarmController::new(Box::new(signal.clone()));
        let mut store = ReminderStore::default();
        let id = store.add(NewReminder::new("Aspirin", "09:00", 1, 5)).unwrap();

        assert!(alarm.trigger(store.get(id).unwrap(), at("2026-10-17T09:00:00+00:00")));
        assert!(alarm.is_ringing());
        assert_eq!(
            signal.calls(),
            vec![
                Call::Message("Time for your medicine: Aspirin!".to_string()),
                Call::Message("Time for your Aspirin!".to_string()),
            ]
        );
    }

    #[test]
    fn test_announce_respects_preference_and_capability() {
        let signal = RecordingSignal {
            speech: true,
            ..Default::default()
        };
        let mut alarm = AlarmController::new(Box::new(signal.clone()));
        let mut store = ReminderStore::default();
        let id = store
            .add(NewReminder::new("Insulin", "07:00", 1, 5).with_notes("with food"))
            .unwrap();
        let mut history = HistoryLog::default();
        let now = at("2026-10-17T07:00:00+00:00");

        alarm.trigger(store.get(id).unwrap(), now);
        assert!(signal
            .calls()
            .contains(&Call::Announce("Time for your Insulin! Notes: with food".to_string())));
        alarm.dismiss(&mut store, &mut history, now);

        alarm.set_speech_enabled(false);
        signal.calls.lock().unwrap().clear();
        let id = store.add(NewReminder::new("B", "07:00", 1, 5)).unwrap();
        alarm.trigger(store.get(id).unwrap(), now);
        assert!(!signal.calls().iter().any(|c| matches!(c, Call::Announce(_))));
    }

    #[test]
    fn test_release_when_reminder_removed() {
        let (mut alarm, signal, mut store, id) = setup(NewReminder::new("A", "09:00", 1, 5));
        alarm.trigger(store.get(id).unwrap(), at("2026-10-17T09:00:00+00:00"));

        assert!(!alarm.release_if_missing(&store));
        store.remove(id).unwrap();
        assert!(alarm.release_if_missing(&store));
        assert_eq!(alarm.state(), AlarmState::Idle);
        assert_eq!(signal.calls().last(), Some(&Call::Stop));
    }
}
