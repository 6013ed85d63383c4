//! Recurrence rule data model and validation.
//!
//! A [`RecurrenceRule`] is the persisted scheduling unit: one class type taught by
//! one instructor in one room, repeating according to a [`RecurrenceKind`] and
//! emitted once per [`TimeSlot`] on every matched date. All times are naive
//! wall-clock values; there is no timezone handling.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScheduleError};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Opaque rule identifier, assigned once at creation and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(Uuid);

impl RuleId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        RuleId(Uuid::new_v4())
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RuleId {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(RuleId)
            .map_err(|e| ScheduleError::InvalidRule(format!("bad rule id '{}': {}", s, e)))
    }
}

/// Reference to an instructor owned by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstructorRef(String);

/// Reference to a room owned by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomRef(String);

macro_rules! string_ref {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_ref!(InstructorRef);
string_ref!(RoomRef);

/// A time of day with minute precision.
///
/// Deserializes from either `{"hour": 9, "minute": 0}` or `"09:00"`, and always
/// serializes to the structured form. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "TimeSlotRepr")]
pub struct TimeSlot {
    pub hour: u8,
    pub minute: u8,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimeSlotRepr {
    Text(String),
    Parts { hour: u8, minute: u8 },
}

impl TryFrom<TimeSlotRepr> for TimeSlot {
    type Error = ScheduleError;

    fn try_from(repr: TimeSlotRepr) -> Result<Self> {
        match repr {
            TimeSlotRepr::Text(s) => s.parse(),
            TimeSlotRepr::Parts { hour, minute } => TimeSlot::new(hour, minute),
        }
    }
}

impl TimeSlot {
    /// Build a time slot, rejecting hour > 23 or minute > 59.
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTimeSlot(format!(
                "{}:{:02} is outside 00:00..=23:59",
                hour, minute
            )));
        }
        Ok(TimeSlot { hour, minute })
    }

    /// Minutes elapsed since midnight.
    pub fn minute_of_day(self) -> u32 {
        u32::from(self.hour) * 60 + u32::from(self.minute)
    }

    /// The time of day `minutes` after midnight, wrapping past 24:00.
    pub fn from_minute_of_day(minutes: u32) -> Self {
        let m = minutes % MINUTES_PER_DAY;
        TimeSlot {
            hour: (m / 60) as u8,
            minute: (m % 60) as u8,
        }
    }

    /// Add minutes with wraparound at midnight.
    pub fn add_minutes(self, minutes: u32) -> Self {
        Self::from_minute_of_day(self.minute_of_day() + minutes % MINUTES_PER_DAY)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeSlot {
    type Err = ScheduleError;

    /// Parse `H:MM` or `HH:MM`.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || ScheduleError::InvalidTimeSlot(format!("'{}' is not HH:MM", s));
        let (h, m) = s.trim().split_once(':').ok_or_else(bad)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(bad());
        }
        let hour: u8 = h.parse().map_err(|_| bad())?;
        let minute: u8 = m.parse().map_err(|_| bad())?;
        TimeSlot::new(hour, minute)
    }
}

/// Weekday codes used by WEEKLY and CUSTOM rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeekdayCode {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl From<Weekday> for WeekdayCode {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => WeekdayCode::Mon,
            Weekday::Tue => WeekdayCode::Tue,
            Weekday::Wed => WeekdayCode::Wed,
            Weekday::Thu => WeekdayCode::Thu,
            Weekday::Fri => WeekdayCode::Fri,
            Weekday::Sat => WeekdayCode::Sat,
            Weekday::Sun => WeekdayCode::Sun,
        }
    }
}

impl FromStr for WeekdayCode {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MON" => Ok(WeekdayCode::Mon),
            "TUE" => Ok(WeekdayCode::Tue),
            "WED" => Ok(WeekdayCode::Wed),
            "THU" => Ok(WeekdayCode::Thu),
            "FRI" => Ok(WeekdayCode::Fri),
            "SAT" => Ok(WeekdayCode::Sat),
            "SUN" => Ok(WeekdayCode::Sun),
            _ => Err(ScheduleError::InvalidRule(format!("unknown weekday code '{}'", s))),
        }
    }
}

/// How a rule repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum RecurrenceKind {
    /// One-off class on `start_date`.
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    /// Explicit dates with their own slots, optionally plus weekday matching.
    Custom,
}

impl RecurrenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceKind::None => "NONE",
            RecurrenceKind::Daily => "DAILY",
            RecurrenceKind::Weekly => "WEEKLY",
            RecurrenceKind::Monthly => "MONTHLY",
            RecurrenceKind::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceKind {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(RecurrenceKind::None),
            "DAILY" => Ok(RecurrenceKind::Daily),
            "WEEKLY" => Ok(RecurrenceKind::Weekly),
            "MONTHLY" => Ok(RecurrenceKind::Monthly),
            "CUSTOM" => Ok(RecurrenceKind::Custom),
            _ => Err(ScheduleError::UnsupportedPattern(s.to_string())),
        }
    }
}

impl TryFrom<String> for RecurrenceKind {
    type Error = ScheduleError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

fn default_interval() -> u32 {
    1
}

/// The persisted scheduling unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    /// Generated when absent from the input.
    #[serde(default)]
    pub id: RuleId,
    pub class_type: String,
    pub instructor_ref: InstructorRef,
    pub room_ref: RoomRef,
    pub duration_minutes: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub recurrence_kind: RecurrenceKind,
    /// Every Nth day, week or month depending on the kind.
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub weekdays: BTreeSet<WeekdayCode>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub month_days: BTreeSet<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub explicit_dates: BTreeMap<NaiveDate, Vec<TimeSlot>>,
    /// Emission order on a matched date follows declaration order.
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
}

impl RecurrenceRule {
    /// A one-off (`NONE`) rule with a fresh id and no time slots yet.
    pub fn new(
        class_type: impl Into<String>,
        instructor_ref: impl Into<InstructorRef>,
        room_ref: impl Into<RoomRef>,
        duration_minutes: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        RecurrenceRule {
            id: RuleId::new(),
            class_type: class_type.into(),
            instructor_ref: instructor_ref.into(),
            room_ref: room_ref.into(),
            duration_minutes,
            start_date,
            end_date,
            recurrence_kind: RecurrenceKind::None,
            interval: 1,
            weekdays: BTreeSet::new(),
            month_days: BTreeSet::new(),
            explicit_dates: BTreeMap::new(),
            time_slots: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: RecurrenceKind) -> Self {
        self.recurrence_kind = kind;
        self
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_weekdays(mut self, days: impl IntoIterator<Item = WeekdayCode>) -> Self {
        self.weekdays = days.into_iter().collect();
        self
    }

    pub fn with_month_days(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.month_days = days.into_iter().collect();
        self
    }

    pub fn with_time_slots(mut self, slots: impl IntoIterator<Item = TimeSlot>) -> Self {
        self.time_slots = slots.into_iter().collect();
        self
    }

    pub fn with_explicit_date(mut self, date: NaiveDate, slots: Vec<TimeSlot>) -> Self {
        self.explicit_dates.insert(date, slots);
        self
    }

    /// Whether `[start_date, end_date]` intersects `[start, end]`.
    pub fn overlaps_range(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }

    /// Whether the two rules book the same room or the same instructor.
    pub fn shares_resource_with(&self, other: &RecurrenceRule) -> bool {
        self.room_ref == other.room_ref || self.instructor_ref == other.instructor_ref
    }

    /// Check the rule is well formed before it is persisted.
    ///
    /// The occurrence generator does not require this; it simply produces
    /// nothing for empty weekday/month-day/slot sets.
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(ScheduleError::InvalidRange(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if self.class_type.trim().is_empty() {
            return Err(invalid("class type is required"));
        }
        if self.instructor_ref.as_str().trim().is_empty() {
            return Err(invalid("instructor is required"));
        }
        if self.room_ref.as_str().trim().is_empty() {
            return Err(invalid("room is required"));
        }
        if self.duration_minutes == 0 {
            return Err(invalid("duration must be at least 1 minute"));
        }
        if self.duration_minutes > MINUTES_PER_DAY {
            return Err(invalid(&format!(
                "duration of {} minutes is longer than a day",
                self.duration_minutes
            )));
        }
        if self.interval == 0 {
            return Err(invalid("interval must be at least 1"));
        }
        if let Some(day) = self.month_days.iter().find(|d| !(1..=31).contains(*d)) {
            return Err(invalid(&format!("month day {} is outside 1..=31", day)));
        }
        if let Some(dup) = first_duplicate(&self.time_slots) {
            return Err(invalid(&format!("duplicate time slot {}", dup)));
        }
        for (date, slots) in &self.explicit_dates {
            if *date < self.start_date || *date > self.end_date {
                return Err(invalid(&format!(
                    "explicit date {} is outside {}..={}",
                    date, self.start_date, self.end_date
                )));
            }
            if slots.is_empty() {
                return Err(invalid(&format!("explicit date {} has no time slots", date)));
            }
            if let Some(dup) = first_duplicate(slots) {
                return Err(invalid(&format!("duplicate time slot {} on {}", dup, date)));
            }
        }

        match self.recurrence_kind {
            RecurrenceKind::Weekly if self.weekdays.is_empty() => {
                return Err(invalid("weekly rule needs at least one weekday"));
            }
            RecurrenceKind::Monthly if self.month_days.is_empty() => {
                return Err(invalid("monthly rule needs at least one day of month"));
            }
            RecurrenceKind::Custom => {
                if self.explicit_dates.is_empty() && self.weekdays.is_empty() {
                    return Err(invalid("custom rule needs explicit dates or weekdays"));
                }
                if !self.weekdays.is_empty() && self.time_slots.is_empty() {
                    return Err(invalid("custom weekday matching needs time slots"));
                }
                return Ok(());
            }
            _ => {}
        }
        if self.time_slots.is_empty() {
            return Err(invalid("at least one time slot is required"));
        }
        Ok(())
    }
}

fn first_duplicate(slots: &[TimeSlot]) -> Option<TimeSlot> {
    let mut seen = BTreeSet::new();
    slots.iter().copied().find(|slot| !seen.insert(*slot))
}

fn invalid(message: &str) -> ScheduleError {
    ScheduleError::InvalidRule(message.to_string())
}
