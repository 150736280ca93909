use crate::config::{
    DEFAULT_REMINDER_COLOR, DEFAULT_SNOOZE_MINUTES, LOW_STOCK_THRESHOLD, MINUTES_PER_DAY,
};
use crate::error::{AppError, AppResult};
use chrono::{NaiveDate, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ReminderId = i64;

/// Time of day at minute resolution, persisted as "HH:MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> AppResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(AppError::validation(format!(
                "time {:02}:{:02} is out of range",
                hour, minute
            )));
        }
        Ok(Self {
            minutes: (hour * 60 + minute) as u16,
        })
    }

    /// Wall-clock reading truncated to the minute.
    pub fn from_time<T: Timelike>(time: &T) -> Self {
        Self {
            minutes: (time.hour() * 60 + time.minute()) as u16,
        }
    }

    pub fn hour(self) -> u32 {
        u32::from(self.minutes) / 60
    }

    pub fn minute(self) -> u32 {
        u32::from(self.minutes) % 60
    }

    pub fn minutes_since_midnight(self) -> u32 {
        u32::from(self.minutes)
    }

    /// Adds minutes modulo one day. The calendar date is not involved.
    pub fn add_minutes(self, minutes: u32) -> Self {
        let total = (self.minutes_since_midnight() + minutes % MINUTES_PER_DAY) % MINUTES_PER_DAY;
        Self {
            minutes: total as u16,
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::validation(format!("'{}' is not a valid HH:MM time", s));
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let (hh, mm) = (&s[0..2], &s[3..5]);
        if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let hour: u32 = hh.parse().map_err(|_| invalid())?;
        let minute: u32 = mm.parse().map_err(|_| invalid())?;
        TimeOfDay::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Weekdays a reminder repeats on, Sunday = 0. Empty means one-time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub fn from_days(days: &[i64]) -> AppResult<Self> {
        let mut bits = 0u8;
        for &day in days {
            if !(0..=6).contains(&day) {
                return Err(AppError::validation(format!(
                    "weekday {} is outside 0-6",
                    day
                )));
            }
            bits |= 1u8 << day;
        }
        Ok(Self(bits))
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains_day(self, day: u8) -> bool {
        day < 7 && self.0 & (1 << day) != 0
    }

    pub fn contains(self, weekday: Weekday) -> bool {
        self.contains_day(weekday.num_days_from_sunday() as u8)
    }

    pub fn days(self) -> impl Iterator<Item = u8> {
        (0..7u8).filter(move |&d| self.contains_day(d))
    }
}

impl TryFrom<Vec<i64>> for WeekdaySet {
    type Error = AppError;

    fn try_from(days: Vec<i64>) -> Result<Self, Self::Error> {
        WeekdaySet::from_days(&days)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.days().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: ReminderId,
    pub name: String,
    pub time: TimeOfDay,
    #[serde(default)]
    pub notes: Option<String>,
    pub dosage: u32,
    pub stock: u32,
    pub active: bool,
    #[serde(default)]
    pub repeat_days: WeekdaySet,
    #[serde(default)]
    pub last_triggered_date: Option<NaiveDate>,
    #[serde(default)]
    pub snooze_duration: u32,
    #[serde(default)]
    pub color: String,
}

impl Reminder {
    pub fn is_recurring(&self) -> bool {
        !self.repeat_days.is_empty()
    }

    /// Advisory only; never feeds the alarm state machine.
    pub fn is_low_stock(&self) -> bool {
        self.stock > 0 && self.stock <= LOW_STOCK_THRESHOLD
    }

    pub fn resolved_on(&self, date: NaiveDate) -> bool {
        self.last_triggered_date == Some(date)
    }
}

/// User-supplied reminder fields, checked by [`NewReminder::validate`]
/// before anything reaches the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReminder {
    pub name: String,
    pub time: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub dosage: i64,
    pub stock: i64,
    #[serde(default)]
    pub repeat_days: Vec<i64>,
    #[serde(default = "default_snooze_duration")]
    pub snooze_duration: i64,
    #[serde(default)]
    pub color: Option<String>,
}

fn default_snooze_duration() -> i64 {
    i64::from(DEFAULT_SNOOZE_MINUTES)
}

impl NewReminder {
    pub fn new(name: impl Into<String>, time: impl Into<String>, dosage: i64, stock: i64) -> Self {
        Self {
            name: name.into(),
            time: time.into(),
            notes: None,
            dosage,
            stock,
            repeat_days: Vec::new(),
            snooze_duration: default_snooze_duration(),
            color: None,
        }
    }

    pub fn repeat_on(mut self, days: &[i64]) -> Self {
        self.repeat_days = days.to_vec();
        self
    }

    pub fn snooze_for(mut self, minutes: i64) -> Self {
        self.snooze_duration = minutes;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Builds an active, never-triggered reminder or explains what is wrong.
    pub fn validate(self, id: ReminderId) -> AppResult<Reminder> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
        let time: TimeOfDay = self.time.trim().parse()?;
        let dosage = non_negative("dosage", self.dosage)?;
        let stock = non_negative("stock", self.stock)?;
        let snooze_duration = non_negative("snoozeDuration", self.snooze_duration)?;
        let repeat_days = WeekdaySet::from_days(&self.repeat_days)?;

        Ok(Reminder {
            id,
            name,
            time,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            dosage,
            stock,
            active: true,
            repeat_days,
            last_triggered_date: None,
            snooze_duration,
            color: self
                .color
                .unwrap_or_else(|| DEFAULT_REMINDER_COLOR.to_string()),
        })
    }
}

fn non_negative(field: &str, value: i64) -> AppResult<u32> {
    if value < 0 {
        return Err(AppError::validation(format!(
            "{} must be a non-negative integer, got {}",
            field, value
        )));
    }
    u32::try_from(value).map_err(|_| {
        AppError::validation(format!(
            "{} is too large, got {} (max {})",
            field,
            value,
            u32::MAX
        ))
    })
}
