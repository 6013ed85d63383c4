//! Occurrence generation -- projects a recurrence rule onto concrete dated, timed
//! occurrences within a date window.
//!
//! Expansion is pure and deterministic: the same rule and window always yield the
//! same sequence, ordered by date and then by the rule's declared slot order.
//! Windows are compared at date granularity; time of day never affects which
//! dates are included.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::model::{RecurrenceKind, RecurrenceRule, TimeSlot, WeekdayCode};

/// A single expanded class instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub date: NaiveDate,
    pub start_time: TimeSlot,
    /// `start_time + duration`, wrapping at midnight.
    pub end_time: TimeSlot,
}

/// All slots a rule emits on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOccurrences {
    pub date: NaiveDate,
    pub time_slots: Vec<TimeSlot>,
}

/// An inclusive `[from, to]` date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// # Errors
    /// Returns `ScheduleError::InvalidRange` if `from > to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(ScheduleError::InvalidRange(format!(
                "window start {} is after window end {}",
                from, to
            )));
        }
        Ok(DateWindow { from, to })
    }

    /// Build a window from date-times, discarding the time of day.
    pub fn from_datetimes(from: NaiveDateTime, to: NaiveDateTime) -> Result<Self> {
        Self::new(from.date(), to.date())
    }

    /// The overlap of two windows, or `None` when they are disjoint.
    pub fn intersect(self, other: DateWindow) -> Option<DateWindow> {
        let from = self.from.max(other.from);
        let to = self.to.min(other.to);
        (from <= to).then_some(DateWindow { from, to })
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Every date in the window, ascending.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to;
        self.from.iter_days().take_while(move |d| *d <= to)
    }
}

/// Expand a rule into occurrences within `[from, to]` (both inclusive).
///
/// The iteration range is the intersection of the rule's own
/// `[start_date, end_date]` and the query window. A disjoint window yields an
/// empty list, not an error.
///
/// # Errors
/// Returns `ScheduleError::InvalidRange` if the rule's `start_date > end_date`
/// or if `from > to`.
pub fn generate_occurrences(
    rule: &RecurrenceRule,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Occurrence>> {
    generate_in_window(rule, DateWindow::new(from, to)?)
}

/// Expand a rule and group the result per date (`{ date, timeSlots[] }`).
pub fn generate_days(
    rule: &RecurrenceRule,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DayOccurrences>> {
    let occurrences = generate_occurrences(rule, from, to)?;
    let mut days: Vec<DayOccurrences> = Vec::new();
    for occ in occurrences {
        match days.last_mut() {
            Some(last) if last.date == occ.date => last.time_slots.push(occ.start_time),
            _ => days.push(DayOccurrences {
                date: occ.date,
                time_slots: vec![occ.start_time],
            }),
        }
    }
    Ok(days)
}

/// Expand a rule over an already-validated window.
pub fn generate_in_window(rule: &RecurrenceRule, window: DateWindow) -> Result<Vec<Occurrence>> {
    let rule_range = DateWindow::new(rule.start_date, rule.end_date)?;
    let Some(range) = rule_range.intersect(window) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    let interval = rule.interval.max(1);

    match rule.recurrence_kind {
        RecurrenceKind::None => {
            if range.contains(rule.start_date) {
                push_slots(&mut out, rule, rule.start_date, &rule.time_slots);
            }
        }
        RecurrenceKind::Daily => {
            // Phase is anchored on the rule's start date so that narrowing the
            // window never shifts which dates are hit.
            let offset = (range.from - rule.start_date).num_days() as u64;
            let step = u64::from(interval);
            let first_step = offset.div_ceil(step) * step;
            let mut current = rule.start_date.checked_add_days(Days::new(first_step));
            while let Some(date) = current.filter(|d| *d <= range.to) {
                push_slots(&mut out, rule, date, &rule.time_slots);
                current = date.checked_add_days(Days::new(step));
            }
        }
        RecurrenceKind::Weekly => {
            for date in range.days() {
                if matches_week(rule, date, interval) {
                    push_slots(&mut out, rule, date, &rule.time_slots);
                }
            }
        }
        RecurrenceKind::Monthly => {
            // A month day that does not exist in a month (e.g. 31 in February)
            // is never visited by the walk, so it is skipped, not rolled over.
            for date in range.days() {
                if rule.month_days.contains(&(date.day() as u8))
                    && months_since(rule.start_date, date) % interval == 0
                {
                    push_slots(&mut out, rule, date, &rule.time_slots);
                }
            }
        }
        RecurrenceKind::Custom => {
            if rule.weekdays.is_empty() {
                for (date, slots) in rule.explicit_dates.range(range.from..=range.to) {
                    push_slots(&mut out, rule, *date, slots);
                }
            } else {
                for date in range.days() {
                    if let Some(slots) = rule.explicit_dates.get(&date) {
                        push_slots(&mut out, rule, date, slots);
                    } else if matches_week(rule, date, interval) {
                        push_slots(&mut out, rule, date, &rule.time_slots);
                    }
                }
            }
        }
    }

    Ok(out)
}

/// Whole weeks elapsed since the rule's start date; week zero is the start week.
pub fn weeks_since(start: NaiveDate, date: NaiveDate) -> i64 {
    (date - start).num_days().div_euclid(7)
}

fn months_since(start: NaiveDate, date: NaiveDate) -> u32 {
    let start_index = start.year() * 12 + start.month0() as i32;
    let index = date.year() * 12 + date.month0() as i32;
    (index - start_index).max(0) as u32
}

fn matches_week(rule: &RecurrenceRule, date: NaiveDate, interval: u32) -> bool {
    rule.weekdays.contains(&WeekdayCode::from(date.weekday()))
        && weeks_since(rule.start_date, date) % i64::from(interval) == 0
}

fn push_slots(out: &mut Vec<Occurrence>, rule: &RecurrenceRule, date: NaiveDate, slots: &[TimeSlot]) {
    out.extend(slots.iter().map(|slot| Occurrence {
        date,
        start_time: *slot,
        end_time: slot.add_minutes(rule.duration_minutes),
    }));
}
