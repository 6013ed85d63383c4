//! Calendar projection -- flattens many rules into one display-ordered event list.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{InstructorRef, RecurrenceKind, RecurrenceRule, RoomRef, RuleId, TimeSlot};
use crate::occurrence::{generate_in_window, DateWindow};

/// One class instance as shown on a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub rule_id: RuleId,
    pub class_type: String,
    pub instructor_ref: InstructorRef,
    pub room_ref: RoomRef,
    pub recurrence_kind: RecurrenceKind,
    pub date: NaiveDate,
    pub start_time: TimeSlot,
    pub end_time: TimeSlot,
    pub duration_minutes: u32,
}

/// Project every rule onto `[from, to]` and sort the result chronologically.
///
/// Events are ordered by `(date, start_time)`; ties keep the order of `rules`.
///
/// # Errors
/// Returns `ScheduleError::InvalidRange` if `from > to` or any rule has an
/// inverted date range.
pub fn project_calendar(
    rules: &[RecurrenceRule],
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<CalendarEvent>> {
    let window = DateWindow::new(from, to)?;

    let mut events = Vec::new();
    for rule in rules {
        for occ in generate_in_window(rule, window)? {
            events.push(CalendarEvent {
                rule_id: rule.id,
                class_type: rule.class_type.clone(),
                instructor_ref: rule.instructor_ref.clone(),
                room_ref: rule.room_ref.clone(),
                recurrence_kind: rule.recurrence_kind,
                date: occ.date,
                start_time: occ.start_time,
                end_time: occ.end_time,
                duration_minutes: rule.duration_minutes,
            });
        }
    }

    // Stable sort keeps input order among simultaneous events.
    events.sort_by_key(|e| (e.date, e.start_time));
    Ok(events)
}
