//! Tests for partial-update merging.

use chrono::NaiveDate;
use schedule_engine::{
    apply_patch, FieldUpdate, RecurrenceKind, RecurrenceRule, RulePatch, ScheduleError, TimeSlot,
    WeekdayCode,
};

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn slot(s: &str) -> TimeSlot {
    s.parse().unwrap()
}

fn stored() -> RecurrenceRule {
    RecurrenceRule::new("Original Yoga", "ana", "studio-1", 60, d(2024, 3, 1), d(2024, 3, 31))
        .with_kind(RecurrenceKind::Weekly)
        .with_interval(2)
        .with_weekdays([WeekdayCode::Mon, WeekdayCode::Wed])
        .with_time_slots([slot("09:00")])
}

#[test]
fn empty_patch_keeps_everything() {
    let rule = stored();
    let patch = RulePatch::default();

    assert!(patch.is_empty());
    assert_eq!(apply_patch(&rule, &patch).unwrap(), rule);
}

#[test]
fn set_fields_replace_and_others_are_kept() {
    let rule = stored();
    let patch = RulePatch {
        class_type: "Updated Yoga Flow".to_string().into(),
        time_slots: vec![slot("10:00"), slot("16:00")].into(),
        weekdays: FieldUpdate::Set([WeekdayCode::Tue, WeekdayCode::Thu, WeekdayCode::Fri].into()),
        ..RulePatch::default()
    };

    let merged = apply_patch(&rule, &patch).unwrap();

    assert_eq!(merged.id, rule.id);
    assert_eq!(merged.class_type, "Updated Yoga Flow");
    assert_eq!(merged.time_slots, vec![slot("10:00"), slot("16:00")]);
    assert_eq!(merged.weekdays.len(), 3);
    assert_eq!(merged.room_ref, rule.room_ref);
    assert_eq!(merged.interval, 2);
    assert_eq!(merged.start_date, rule.start_date);
}

#[test]
fn clear_resets_resettable_fields() {
    let rule = stored();
    let patch = RulePatch {
        interval: FieldUpdate::Clear,
        recurrence_kind: FieldUpdate::Clear,
        weekdays: FieldUpdate::Clear,
        ..RulePatch::default()
    };

    let merged = apply_patch(&rule, &patch).unwrap();

    assert_eq!(merged.interval, 1);
    assert_eq!(merged.recurrence_kind, RecurrenceKind::None);
    assert!(merged.weekdays.is_empty());
    assert_eq!(merged.time_slots, rule.time_slots);
}

#[test]
fn clearing_a_required_field_is_invalid() {
    let patch = RulePatch {
        room_ref: FieldUpdate::Clear,
        ..RulePatch::default()
    };

    let err = apply_patch(&stored(), &patch).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidRule(ref m) if m.contains("roomRef")));
}

#[test]
fn merge_does_not_validate() {
    // Inverted dates survive the merge; the caller re-validates.
    let patch = RulePatch {
        end_date: d(2024, 2, 1).into(),
        ..RulePatch::default()
    };

    let merged = apply_patch(&stored(), &patch).unwrap();
    assert!(matches!(merged.validate(), Err(ScheduleError::InvalidRange(_))));
}

#[test]
fn json_absent_null_and_value_map_to_keep_clear_set() {
    let patch: RulePatch = serde_json::from_str(
        r#"{ "classType": "Evening Flow", "monthDays": null, "timeSlots": ["18:00"] }"#,
    )
    .unwrap();

    assert_eq!(patch.class_type, FieldUpdate::Set("Evening Flow".to_string()));
    assert_eq!(patch.month_days, FieldUpdate::Clear);
    assert_eq!(patch.time_slots, FieldUpdate::Set(vec![slot("18:00")]));
    assert_eq!(patch.room_ref, FieldUpdate::Keep);
    assert_eq!(patch.weekdays, FieldUpdate::Keep);
}

#[test]
fn json_serialization_omits_kept_fields() {
    let patch = RulePatch {
        interval: FieldUpdate::Set(3),
        weekdays: FieldUpdate::Clear,
        ..RulePatch::default()
    };

    let value = serde_json::to_value(&patch).unwrap();
    let object = value.as_object().unwrap();

    assert_eq!(object.len(), 2);
    assert_eq!(value["interval"], 3);
    assert!(value["weekdays"].is_null());
}
