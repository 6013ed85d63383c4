//! # schedule-engine
//!
//! Recurrence expansion and double-booking detection for fitness class schedules.
//!
//! A [`RecurrenceRule`] describes a class that repeats daily, weekly, monthly or on
//! custom dates, once per time slot. The engine projects rules into concrete dated
//! occurrences and refuses rules whose occurrences would share a room or an
//! instructor with an existing rule at an overlapping time.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use schedule_engine::{generate_occurrences, RecurrenceKind, RecurrenceRule, TimeSlot, WeekdayCode};
//!
//! let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
//! let rule = RecurrenceRule::new("Yoga", "ana", "studio-1", 60, d(2, 1), d(2, 29))
//!     .with_kind(RecurrenceKind::Weekly)
//!     .with_weekdays([WeekdayCode::Mon, WeekdayCode::Thu])
//!     .with_time_slots([TimeSlot::new(9, 0).unwrap()]);
//!
//! let occurrences = generate_occurrences(&rule, d(2, 1), d(2, 7)).unwrap();
//! assert_eq!(occurrences.len(), 2); // Thu 1st, Mon 5th
//! ```
//!
//! ## Modules
//!
//! - [`model`] — Rules, time slots, weekday codes, validation
//! - [`occurrence`] — Rule + window → ordered occurrences
//! - [`conflict`] — Room/instructor collision detection
//! - [`calendar`] — Many rules → flat, chronological event list
//! - [`patch`] — Explicit partial updates and their merge
//! - [`store`] — Rule lookup/persistence collaborator
//! - [`service`] — Create/update/delete with conflict checks
//! - [`config`] — Scheduler configuration
//! - [`error`] — Error types

pub mod calendar;
pub mod config;
pub mod conflict;
pub mod error;
pub mod model;
pub mod occurrence;
pub mod patch;
pub mod service;
pub mod store;

pub use calendar::{project_calendar, CalendarEvent};
pub use config::{HorizonConfig, SchedulerConfig};
pub use conflict::{check_conflicts, find_all_conflicts, Conflict, ConflictHorizon, ConflictKind};
pub use error::{Result, ScheduleError};
pub use model::{InstructorRef, RecurrenceKind, RecurrenceRule, RoomRef, RuleId, TimeSlot, WeekdayCode};
pub use occurrence::{generate_days, generate_occurrences, DateWindow, DayOccurrences, Occurrence};
pub use patch::{apply_patch, FieldUpdate, RulePatch};
pub use service::ScheduleService;
pub use store::{InMemoryRuleStore, RuleStore};
