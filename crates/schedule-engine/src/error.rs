//! Error types for schedule-engine operations.

use thiserror::Error;

use crate::conflict::Conflict;
use crate::model::RuleId;

/// Errors raised by the generator, the conflict detector and the service layer.
///
/// Conflicts are ordinary outcomes, not bugs: they carry the full [`Conflict`]
/// so callers can render their own message.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// A date range was inverted (`start > end`) or otherwise malformed.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// A recurrence pattern with no generation branch.
    #[error("Unsupported recurrence pattern: {0}")]
    UnsupportedPattern(String),

    /// A rule failed validation.
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// A time-of-day outside 00:00..=23:59 or not in `HH:MM` form.
    #[error("Invalid time slot: {0}")]
    InvalidTimeSlot(String),

    #[error("Room conflict on {} ({}-{})", .0.date, .0.candidate.start_time, .0.candidate.end_time)]
    RoomConflict(Box<Conflict>),

    #[error("Instructor conflict on {} ({}-{})", .0.date, .0.candidate.start_time, .0.candidate.end_time)]
    InstructorConflict(Box<Conflict>),

    /// Update or delete targeted a rule id that is not stored.
    #[error("Schedule rule not found: {0}")]
    NotFound(RuleId),

    /// The storage collaborator failed.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScheduleError {
    /// The conflict carried by a `RoomConflict` or `InstructorConflict` error.
    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            ScheduleError::RoomConflict(c) | ScheduleError::InstructorConflict(c) => Some(c),
            _ => None,
        }
    }
}

/// Convenience alias used throughout schedule-engine.
pub type Result<T> = std::result::Result<T, ScheduleError>;
