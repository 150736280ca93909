use crate::error::{AppError, AppResult};
use crate::reminder::{NewReminder, Reminder, ReminderId};

/// Ordered reminder collection.
///
/// Outside the crate the collection is read-only apart from add/remove;
/// stock, active flag, trigger date and time change only through the
/// scheduler and the alarm controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderStore {
    reminders: Vec<Reminder>,
}

impl ReminderStore {
    pub fn from_reminders(reminders: Vec<Reminder>) -> Self {
        Self { reminders }
    }

    fn next_id(&self) -> AppResult<ReminderId> {
        let max = self.reminders.iter().map(|r| r.id).max().unwrap_or(0);
        max.checked_add(1).ok_or_else(|| {
            AppError::validation(format!("no reminder id left after {}", max))
        })
    }

    pub fn add(&mut self, spec: NewReminder) -> AppResult<ReminderId> {
        let reminder = spec.validate(self.next_id()?)?;
        let id = reminder.id;
        self.reminders.push(reminder);
        Ok(id)
    }

    pub fn remove(&mut self, id: ReminderId) -> AppResult<Reminder> {
        let idx = self
            .reminders
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AppError::not_found(format!("reminder {}", id)))?;
        Ok(self.reminders.remove(idx))
    }

    pub fn list(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn get(&self, id: ReminderId) -> Option<&Reminder> {
        self.reminders.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: ReminderId) -> bool {
        self.get(id).is_some()
    }

    pub fn low_stock(&self) -> Vec<&Reminder> {
        self.reminders.iter().filter(|r| r.is_low_stock()).collect()
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    pub(crate) fn replace_all(&mut self, reminders: Vec<Reminder>) {
        self.reminders = reminders;
    }

    pub(crate) fn get_mut(&mut self, id: ReminderId) -> Option<&mut Reminder> {
        self.reminders.iter_mut().find(|r| r.id == id)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Reminder> {
        self.reminders.iter_mut()
    }
}
