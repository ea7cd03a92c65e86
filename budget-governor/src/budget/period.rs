//! Period keys and the clock abstraction

use chrono::{DateTime, Local, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

/// Aggregation bucket for budget accounting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Daily => "daily",
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
        }
    }

    /// Sortable key of the bucket containing `at`.
    ///
    /// Weekly keys use the Monday-first week of the year (`%W`, `00`..`53`),
    /// which is not ISO-8601 week numbering: days before the first Monday of
    /// January fall into week `00` of that year.
    pub fn key_for(&self, at: &DateTime<Local>) -> String {
        let pattern = match self {
            BudgetPeriod::Daily => "%Y-%m-%d",
            BudgetPeriod::Weekly => "%Y-W%W",
            BudgetPeriod::Monthly => "%Y-%m",
        };
        at.format(pattern).to_string()
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "day" => Ok(BudgetPeriod::Daily),
            "weekly" | "week" => Ok(BudgetPeriod::Weekly),
            "monthly" | "month" => Ok(BudgetPeriod::Monthly),
            _ => Err(format!(
                "Unknown budget period '{}'. Valid options: daily, weekly, monthly",
                s
            )),
        }
    }
}

/// Period key for `granularity` at `at`
pub fn period_key(granularity: BudgetPeriod, at: &DateTime<Local>) -> String {
    granularity.key_for(at)
}

/// Calendar date key (`YYYY-MM-DD`) used for usage records and snapshot files
pub fn daily_key(at: &DateTime<Local>) -> String {
    BudgetPeriod::Daily.key_for(at)
}

/// Source of the current time
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock in local time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually driven clock, for tests and replay tooling
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Local>) -> Self {
        Self { now: Mutex::new(at) }
    }

    pub fn set(&self, at: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
