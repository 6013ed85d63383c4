//! Partial updates to a stored rule.
//!
//! Each field of a [`RulePatch`] says whether to keep, clear or replace the
//! stored value. In JSON an absent field means keep, `null` means clear and any
//! other value means replace.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, ScheduleError};
use crate::model::{InstructorRef, RecurrenceKind, RecurrenceRule, RoomRef, TimeSlot, WeekdayCode};

/// One field of a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    /// Leave the stored value as is.
    #[default]
    Keep,
    /// Reset the stored value.
    Clear,
    /// Replace the stored value.
    Set(T),
}

impl<T> FieldUpdate<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, FieldUpdate::Keep)
    }
}

impl<T> From<T> for FieldUpdate<T> {
    fn from(value: T) -> Self {
        FieldUpdate::Set(value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        })
    }
}

impl<T: Serialize> Serialize for FieldUpdate<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldUpdate::Set(value) => serializer.serialize_some(value),
            FieldUpdate::Keep | FieldUpdate::Clear => serializer.serialize_none(),
        }
    }
}

/// A partial update to every mutable field of a [`RecurrenceRule`].
///
/// The rule id is not part of the patch; it never changes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulePatch {
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub class_type: FieldUpdate<String>,
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub instructor_ref: FieldUpdate<InstructorRef>,
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub room_ref: FieldUpdate<RoomRef>,
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub duration_minutes: FieldUpdate<u32>,
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub start_date: FieldUpdate<NaiveDate>,
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub end_date: FieldUpdate<NaiveDate>,
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub recurrence_kind: FieldUpdate<RecurrenceKind>,
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub interval: FieldUpdate<u32>,
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub weekdays: FieldUpdate<BTreeSet<WeekdayCode>>,
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub month_days: FieldUpdate<BTreeSet<u8>>,
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub explicit_dates: FieldUpdate<BTreeMap<NaiveDate, Vec<TimeSlot>>>,
    #[serde(skip_serializing_if = "FieldUpdate::is_keep")]
    pub time_slots: FieldUpdate<Vec<TimeSlot>>,
}

impl RulePatch {
    pub fn is_empty(&self) -> bool {
        *self == RulePatch::default()
    }
}

/// Merge `patch` over `existing`, returning the merged rule.
///
/// The result is not validated; callers re-validate and re-check conflicts.
///
/// # Errors
/// Returns `ScheduleError::InvalidRule` when the patch clears a field that has
/// no empty state (class type, instructor, room, duration, dates).
pub fn apply_patch(existing: &RecurrenceRule, patch: &RulePatch) -> Result<RecurrenceRule> {
    let mut rule = existing.clone();

    rule.class_type = required(&patch.class_type, "classType", &existing.class_type)?;
    rule.instructor_ref = required(&patch.instructor_ref, "instructorRef", &existing.instructor_ref)?;
    rule.room_ref = required(&patch.room_ref, "roomRef", &existing.room_ref)?;
    rule.duration_minutes = required(&patch.duration_minutes, "durationMinutes", &existing.duration_minutes)?;
    rule.start_date = required(&patch.start_date, "startDate", &existing.start_date)?;
    rule.end_date = required(&patch.end_date, "endDate", &existing.end_date)?;

    rule.recurrence_kind = resettable(&patch.recurrence_kind, &existing.recurrence_kind, RecurrenceKind::None);
    rule.interval = resettable(&patch.interval, &existing.interval, 1);
    rule.weekdays = resettable(&patch.weekdays, &existing.weekdays, BTreeSet::new());
    rule.month_days = resettable(&patch.month_days, &existing.month_days, BTreeSet::new());
    rule.explicit_dates = resettable(&patch.explicit_dates, &existing.explicit_dates, BTreeMap::new());
    rule.time_slots = resettable(&patch.time_slots, &existing.time_slots, Vec::new());

    Ok(rule)
}

fn required<T: Clone>(update: &FieldUpdate<T>, field: &str, current: &T) -> Result<T> {
    match update {
        FieldUpdate::Keep => Ok(current.clone()),
        FieldUpdate::Set(value) => Ok(value.clone()),
        FieldUpdate::Clear => Err(ScheduleError::InvalidRule(format!("{} cannot be cleared", field))),
    }
}

fn resettable<T: Clone>(update: &FieldUpdate<T>, current: &T, empty: T) -> T {
    match update {
        FieldUpdate::Keep => current.clone(),
        FieldUpdate::Clear => empty,
        FieldUpdate::Set(value) => value.clone(),
    }
}
