//! Scheduler configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::conflict::ConflictHorizon;
use crate::error::Result;

/// Top-level configuration for [`ScheduleService`](crate::service::ScheduleService).
///
/// ```json
/// { "horizon": { "mode": "look-ahead", "days": 60 } }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub horizon: HorizonConfig,
}

impl SchedulerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// How far ahead conflict detection looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum HorizonConfig {
    /// Compare over the rules' actual overlapping date ranges.
    #[default]
    RuleOverlap,
    /// Compare over a fixed number of days starting today.
    LookAhead { days: u32 },
}

impl HorizonConfig {
    /// Pin a look-ahead horizon to `today`.
    pub fn resolve(self, today: NaiveDate) -> ConflictHorizon {
        match self {
            HorizonConfig::RuleOverlap => ConflictHorizon::RuleOverlap,
            HorizonConfig::LookAhead { days } => ConflictHorizon::LookAhead { anchor: today, days },
        }
    }
}
