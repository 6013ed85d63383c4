//! Detect room and instructor double-bookings between recurrence rules.
//!
//! A candidate rule is expanded alongside every existing rule over a comparison
//! horizon. Occurrences on the same date whose time windows overlap conflict when
//! the two rules share a room or an instructor. Windows are half-open: a class
//! ending at 10:00 does not collide with one starting at 10:00.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::model::{RecurrenceRule, RuleId};
use crate::occurrence::{generate_in_window, DateWindow, Occurrence};

/// Which shared resource is double-booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Room,
    Instructor,
}

/// A detected collision between a candidate occurrence and an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub kind: ConflictKind,
    pub date: NaiveDate,
    pub existing_rule: RuleId,
    pub candidate: Occurrence,
    pub existing: Occurrence,
    pub overlap_minutes: u32,
}

impl From<Conflict> for ScheduleError {
    fn from(conflict: Conflict) -> Self {
        match conflict.kind {
            ConflictKind::Room => ScheduleError::RoomConflict(Box::new(conflict)),
            ConflictKind::Instructor => ScheduleError::InstructorConflict(Box::new(conflict)),
        }
    }
}

/// The date range over which two rules are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictHorizon {
    /// Compare each pair over the intersection of the two rules' own date
    /// ranges. Every conflict is found.
    #[default]
    RuleOverlap,
    /// Compare over `[anchor, anchor + days]` only. Conflicts that fall
    /// entirely outside this window are not detected.
    LookAhead { anchor: NaiveDate, days: u32 },
}

impl ConflictHorizon {
    fn window_for(self, candidate: &RecurrenceRule, existing: &RecurrenceRule) -> Option<DateWindow> {
        let pair = DateWindow {
            from: candidate.start_date.max(existing.start_date),
            to: candidate.end_date.min(existing.end_date),
        };
        if pair.from > pair.to {
            return None;
        }
        match self {
            ConflictHorizon::RuleOverlap => Some(pair),
            ConflictHorizon::LookAhead { anchor, days } => {
                let to = anchor
                    .checked_add_days(Days::new(u64::from(days)))
                    .unwrap_or(NaiveDate::MAX);
                pair.intersect(DateWindow { from: anchor, to })
            }
        }
    }
}

/// Report the first conflict between `candidate` and `existing`, if any.
///
/// Existing rules are scanned in the order given; within a pair, a room
/// conflict is reported before an instructor conflict.
///
/// # Errors
/// Returns `ScheduleError::InvalidRange` if any rule has `start_date > end_date`.
pub fn check_conflicts(
    candidate: &RecurrenceRule,
    existing: &[RecurrenceRule],
    horizon: ConflictHorizon,
) -> Result<Option<Conflict>> {
    let mut found = None;
    scan(candidate, existing, horizon, |conflict| {
        found = Some(conflict);
        false
    })?;
    Ok(found)
}

/// Collect every conflict between `candidate` and `existing`.
///
/// A single pair of occurrences may yield both a room and an instructor
/// conflict.
pub fn find_all_conflicts(
    candidate: &RecurrenceRule,
    existing: &[RecurrenceRule],
    horizon: ConflictHorizon,
) -> Result<Vec<Conflict>> {
    let mut conflicts = Vec::new();
    scan(candidate, existing, horizon, |conflict| {
        conflicts.push(conflict);
        true
    })?;
    Ok(conflicts)
}

/// Minute-of-day interval `[start, start + duration)` without midnight wrap.
///
/// Unvalidated rules may carry any duration, so the end saturates.
fn interval(occ: &Occurrence, duration_minutes: u32) -> (u32, u32) {
    let start = occ.start_time.minute_of_day();
    (start, start.saturating_add(duration_minutes))
}

/// Walk all overlapping occurrence pairs, handing each conflict to `emit`.
/// Stops as soon as `emit` returns `false`.
fn scan<F>(
    candidate: &RecurrenceRule,
    existing: &[RecurrenceRule],
    horizon: ConflictHorizon,
    mut emit: F,
) -> Result<()>
where
    F: FnMut(Conflict) -> bool,
{
    DateWindow::new(candidate.start_date, candidate.end_date)?;

    for other in existing {
        if other.id == candidate.id || !candidate.shares_resource_with(other) {
            continue;
        }
        DateWindow::new(other.start_date, other.end_date)?;
        let Some(window) = horizon.window_for(candidate, other) else {
            continue;
        };

        let ours = generate_in_window(candidate, window)?;
        if ours.is_empty() {
            continue;
        }
        let mut theirs_by_date: BTreeMap<NaiveDate, Vec<Occurrence>> = BTreeMap::new();
        for occ in generate_in_window(other, window)? {
            theirs_by_date.entry(occ.date).or_default().push(occ);
        }

        let same_room = candidate.room_ref == other.room_ref;
        let same_instructor = candidate.instructor_ref == other.instructor_ref;

        for a in &ours {
            let Some(same_day) = theirs_by_date.get(&a.date) else {
                continue;
            };
            let (a_start, a_end) = interval(a, candidate.duration_minutes);
            for b in same_day {
                let (b_start, b_end) = interval(b, other.duration_minutes);
                if !(a_start < b_end && b_start < a_end) {
                    continue;
                }
                let overlap_minutes = a_end.min(b_end) - a_start.max(b_start);
                let kinds = [
                    (same_room, ConflictKind::Room),
                    (same_instructor, ConflictKind::Instructor),
                ];
                for (shared, kind) in kinds {
                    if !shared {
                        continue;
                    }
                    let conflict = Conflict {
                        kind,
                        date: a.date,
                        existing_rule: other.id,
                        candidate: *a,
                        existing: *b,
                        overlap_minutes,
                    };
                    if !emit(conflict) {
                        return Ok(());
                    }
                }
            }
        }
    }

    Ok(())
}
