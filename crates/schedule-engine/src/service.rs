//! Rule lifecycle orchestration: validate, check conflicts, persist.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::calendar::{project_calendar, CalendarEvent};
use crate::config::SchedulerConfig;
use crate::conflict::{check_conflicts, find_all_conflicts, Conflict, ConflictHorizon};
use crate::error::{Result, ScheduleError};
use crate::model::{RecurrenceRule, RuleId};
use crate::occurrence::DateWindow;
use crate::patch::{apply_patch, RulePatch};
use crate::store::RuleStore;

/// Creates, updates and deletes rules against a [`RuleStore`], refusing any
/// write that would double-book a room or an instructor.
///
/// Check and write happen under one lock, so two writers sharing this service
/// cannot both pass a check against the same stale rule set. The lock does not
/// extend to other processes writing the same store; those need a uniqueness
/// constraint in the store itself.
pub struct ScheduleService {
    store: Arc<dyn RuleStore>,
    config: SchedulerConfig,
    today: Option<NaiveDate>,
    write_lock: Mutex<()>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self::with_config(store, SchedulerConfig::default())
    }

    pub fn with_config(store: Arc<dyn RuleStore>, config: SchedulerConfig) -> Self {
        Self {
            store,
            config,
            today: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Pin the date a look-ahead horizon is anchored at (defaults to the local
    /// date at check time).
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn store(&self) -> &Arc<dyn RuleStore> {
        &self.store
    }

    fn horizon(&self) -> ConflictHorizon {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        self.config.horizon.resolve(today)
    }

    /// Validate, conflict-check and persist a new rule.
    ///
    /// # Errors
    /// `InvalidRule`/`InvalidRange` on validation failure, `RoomConflict` or
    /// `InstructorConflict` if the rule collides with a stored one. Nothing is
    /// written on error.
    pub async fn create(&self, rule: RecurrenceRule) -> Result<RecurrenceRule> {
        rule.validate()?;

        let _guard = self.write_lock.lock().await;
        self.ensure_no_conflict(&rule).await?;
        self.store.insert(rule.clone()).await?;

        info!(rule_id = %rule.id, class_type = %rule.class_type, kind = %rule.recurrence_kind, "Schedule rule created");
        Ok(rule)
    }

    /// Merge `patch` over the stored rule, re-validate, re-check conflicts
    /// (ignoring the rule's own stored version) and persist.
    ///
    /// # Errors
    /// `NotFound` if `id` is not stored, plus everything [`create`](Self::create)
    /// can return.
    pub async fn update(&self, id: RuleId, patch: &RulePatch) -> Result<RecurrenceRule> {
        let _guard = self.write_lock.lock().await;

        let existing = self.store.get(id).await?.ok_or(ScheduleError::NotFound(id))?;
        let merged = apply_patch(&existing, patch)?;
        merged.validate()?;

        self.ensure_no_conflict(&merged).await?;
        self.store.replace(merged.clone()).await?;

        info!(rule_id = %id, "Schedule rule updated");
        Ok(merged)
    }

    /// # Errors
    /// `NotFound` if `id` is not stored.
    pub async fn delete(&self, id: RuleId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.delete(id).await?;
        info!(rule_id = %id, "Schedule rule deleted");
        Ok(())
    }

    /// All stored class instances within `[from, to]`, chronologically.
    pub async fn calendar(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CalendarEvent>> {
        DateWindow::new(from, to)?;
        let rules = self.store.find_overlapping(None, from, to).await?;
        project_calendar(&rules, from, to)
    }

    /// Every conflict `rule` would cause if written, without writing it.
    pub async fn preview_conflicts(&self, rule: &RecurrenceRule) -> Result<Vec<Conflict>> {
        let existing = self.overlapping(rule).await?;
        find_all_conflicts(rule, &existing, self.horizon())
    }

    async fn overlapping(&self, rule: &RecurrenceRule) -> Result<Vec<RecurrenceRule>> {
        self.store
            .find_overlapping(Some(rule.id), rule.start_date, rule.end_date)
            .await
    }

    async fn ensure_no_conflict(&self, rule: &RecurrenceRule) -> Result<()> {
        let existing = self.overlapping(rule).await?;
        debug!(rule_id = %rule.id, candidates = existing.len(), "Checking schedule conflicts");

        match check_conflicts(rule, &existing, self.horizon())? {
            None => Ok(()),
            Some(conflict) => {
                warn!(
                    rule_id = %rule.id,
                    existing_rule = %conflict.existing_rule,
                    kind = ?conflict.kind,
                    date = %conflict.date,
                    "Schedule rule rejected by conflict"
                );
                Err(conflict.into())
            }
        }
    }
}
