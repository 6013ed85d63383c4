//! Storage collaborator for recurrence rules.
//!
//! The engine only needs range lookup plus opaque create/replace/delete. Real
//! deployments back [`RuleStore`] with a database; [`InMemoryRuleStore`] is used
//! by the CLI and the tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::error::{Result, ScheduleError};
use crate::model::{RecurrenceRule, RuleId};

/// Persistence and lookup for recurrence rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Every stored rule whose `[start_date, end_date]` intersects `[start, end]`,
    /// excluding the rule with id `exclude`.
    async fn find_overlapping(
        &self,
        exclude: Option<RuleId>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RecurrenceRule>>;

    async fn get(&self, id: RuleId) -> Result<Option<RecurrenceRule>>;

    async fn list(&self) -> Result<Vec<RecurrenceRule>>;

    /// Persist a new rule.
    async fn insert(&self, rule: RecurrenceRule) -> Result<()>;

    /// Overwrite the stored rule with the same id.
    ///
    /// Returns `ScheduleError::NotFound` if no such rule is stored.
    async fn replace(&self, rule: RecurrenceRule) -> Result<()>;

    /// Returns `ScheduleError::NotFound` if no such rule is stored.
    async fn delete(&self, id: RuleId) -> Result<()>;
}

/// A [`RuleStore`] held in process memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: RwLock<Vec<RecurrenceRule>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store without any conflict checks.
    pub fn with_rules(rules: Vec<RecurrenceRule>) -> Self {
        InMemoryRuleStore {
            rules: RwLock::new(rules),
        }
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn find_overlapping(
        &self,
        exclude: Option<RuleId>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RecurrenceRule>> {
        let rules = self.rules.read().await;
        Ok(rules
            .iter()
            .filter(|r| Some(r.id) != exclude && r.overlaps_range(start, end))
            .cloned()
            .collect())
    }

    async fn get(&self, id: RuleId) -> Result<Option<RecurrenceRule>> {
        let rules = self.rules.read().await;
        Ok(rules.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<RecurrenceRule>> {
        Ok(self.rules.read().await.clone())
    }

    async fn insert(&self, rule: RecurrenceRule) -> Result<()> {
        let mut rules = self.rules.write().await;
        if rules.iter().any(|r| r.id == rule.id) {
            return Err(ScheduleError::Storage(format!("duplicate rule id {}", rule.id)));
        }
        rules.push(rule);
        Ok(())
    }

    async fn replace(&self, rule: RecurrenceRule) -> Result<()> {
        let mut rules = self.rules.write().await;
        let slot = rules
            .iter_mut()
            .find(|r| r.id == rule.id)
            .ok_or(ScheduleError::NotFound(rule.id))?;
        *slot = rule;
        Ok(())
    }

    async fn delete(&self, id: RuleId) -> Result<()> {
        let mut rules = self.rules.write().await;
        let index = rules
            .iter()
            .position(|r| r.id == id)
            .ok_or(ScheduleError::NotFound(id))?;
        rules.remove(index);
        Ok(())
    }
}
