use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::budget::period::daily_key;
use crate::error::{BudgetError, BudgetResult};

/// Spending limit for one period
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct BudgetLimit {
    /// Total budget in USD
    pub total: f64,
    /// Fraction of `total` at which warnings start
    pub warning_threshold: f64,
    /// Fraction of `total` at which cheaper models are recommended proactively
    pub critical_threshold: f64,
}

impl BudgetLimit {
    pub const DEFAULT_WARNING: f64 = 0.8;
    pub const DEFAULT_CRITICAL: f64 = 0.95;

    pub fn new(total: f64) -> Self {
        Self::with_thresholds(total, Self::DEFAULT_WARNING, Self::DEFAULT_CRITICAL)
    }

    pub fn with_thresholds(total: f64, warning_threshold: f64, critical_threshold: f64) -> Self {
        Self {
            total,
            warning_threshold,
            critical_threshold,
        }
    }

    pub fn validate(&self, name: &str) -> BudgetResult<()> {
        if !(self.total.is_finite() && self.total > 0.0) {
            return Err(BudgetError::config(format!(
                "{} budget must be positive, got {}",
                name, self.total
            )));
        }
        if !(self.warning_threshold > 0.0 && self.warning_threshold <= 1.0) {
            return Err(BudgetError::config(format!(
                "{} warning threshold must be in (0, 1], got {}",
                name, self.warning_threshold
            )));
        }
        if !(self.critical_threshold > 0.0 && self.critical_threshold <= 1.0) {
            return Err(BudgetError::config(format!(
                "{} critical threshold must be in (0, 1], got {}",
                name, self.critical_threshold
            )));
        }
        if self.critical_threshold < self.warning_threshold {
            return Err(BudgetError::config(format!(
                "{} critical threshold {} is below warning threshold {}",
                name, self.critical_threshold, self.warning_threshold
            )));
        }
        Ok(())
    }
}

/// Degradation applied to an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// No degradation needed, run as requested
    None,
    /// Run with `recommended_model` instead of the requested model
    SmallerModel,
    /// Serve from cached results only; issue no new paid request
    CacheOnly,
    /// Do not run the operation
    Block,
}

impl FallbackStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackStrategy::None => "none",
            FallbackStrategy::SmallerModel => "smaller_model",
            FallbackStrategy::CacheOnly => "cache_only",
            FallbackStrategy::Block => "block",
        }
    }
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage measured against one limit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UsageLevel {
    pub current_usage: f64,
    pub budget_limit: f64,
    pub usage_percentage: f64,
}

/// Decision returned by an admission check
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdmissionVerdict {
    pub allowed: bool,
    /// Usage of the limit that decided the verdict, before this operation
    pub current_usage: f64,
    pub budget_limit: f64,
    pub usage_percentage: f64,
    pub strategy: FallbackStrategy,
    pub recommended_model: Option<String>,
    pub message: Option<String>,
}

impl AdmissionVerdict {
    fn build(
        allowed: bool,
        level: UsageLevel,
        strategy: FallbackStrategy,
        recommended_model: Option<String>,
        message: Option<String>,
    ) -> Self {
        Self {
            allowed,
            current_usage: level.current_usage,
            budget_limit: level.budget_limit,
            usage_percentage: level.usage_percentage,
            strategy,
            recommended_model,
            message,
        }
    }

    pub fn pass(level: UsageLevel, model: &str) -> Self {
        Self::build(true, level, FallbackStrategy::None, Some(model.to_string()), None)
    }

    pub fn smaller_model(level: UsageLevel, model: &str, message: impl Into<String>) -> Self {
        Self::build(
            true,
            level,
            FallbackStrategy::SmallerModel,
            Some(model.to_string()),
            Some(message.into()),
        )
    }

    pub fn cache_only(level: UsageLevel, message: impl Into<String>) -> Self {
        Self::build(true, level, FallbackStrategy::CacheOnly, None, Some(message.into()))
    }

    pub fn block(level: UsageLevel, message: impl Into<String>) -> Self {
        Self::build(false, level, FallbackStrategy::Block, None, Some(message.into()))
    }

    /// Whether the caller must change how it runs the operation
    pub fn is_degraded(&self) -> bool {
        self.strategy != FallbackStrategy::None
    }
}

/// One recorded cost-bearing operation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Daily period key of `timestamp`
    #[serde(rename = "period")]
    pub period_key: String,
    pub agent_type: String,
    pub operation: String,
    #[serde(rename = "cost_usd")]
    pub cost: f64,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Local>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub fallback_applied: bool,
}

impl UsageRecord {
    pub fn new(
        timestamp: DateTime<Local>,
        agent_type: impl Into<String>,
        operation: impl Into<String>,
        cost: f64,
        model: Option<String>,
        fallback_applied: bool,
    ) -> Self {
        Self {
            period_key: daily_key(&timestamp),
            agent_type: agent_type.into(),
            operation: operation.into(),
            cost,
            timestamp,
            model,
            fallback_applied,
        }
    }
}

/// Coarse health label derived from daily usage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Caution,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn from_percentage(usage_percentage: f64, limit: &BudgetLimit) -> Self {
        if usage_percentage >= 100.0 {
            HealthStatus::Critical
        } else if usage_percentage >= limit.critical_threshold * 100.0 {
            HealthStatus::Warning
        } else if usage_percentage >= limit.warning_threshold * 100.0 {
            HealthStatus::Caution
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Caution => "caution",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RFC 3339 on write; naive `YYYY-MM-DDTHH:MM:SS[.f]` local timestamps are
/// accepted on read for files written by older tooling.
mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&at.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Local>> {
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(at.with_timezone(&Local));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .and_then(|naive| naive.and_local_timezone(Local).earliest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_limit_validation() {
        assert!(BudgetLimit::new(1.0).validate("daily").is_ok());
        assert!(BudgetLimit::new(0.0).validate("daily").is_err());
        assert!(BudgetLimit::new(-5.0).validate("daily").is_err());
        assert!(BudgetLimit::with_thresholds(1.0, 0.0, 0.9).validate("daily").is_err());
        assert!(BudgetLimit::with_thresholds(1.0, 0.9, 0.8).validate("daily").is_err());
        assert!(BudgetLimit::with_thresholds(1.0, 0.9, 1.2).validate("daily").is_err());
        assert!(BudgetLimit::with_thresholds(1.0, 1.0, 1.0).validate("daily").is_ok());
    }

    #[test]
    fn test_health_tiers() {
        let limit = BudgetLimit::new(1.0);
        assert_eq!(HealthStatus::from_percentage(30.0, &limit), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_percentage(80.0, &limit), HealthStatus::Caution);
        assert_eq!(HealthStatus::from_percentage(96.0, &limit), HealthStatus::Warning);
        assert_eq!(HealthStatus::from_percentage(100.0, &limit), HealthStatus::Critical);
    }

    #[test]
    fn test_pass_is_distinct_from_block() {
        let level = UsageLevel {
            current_usage: 0.0,
            budget_limit: 1.0,
            usage_percentage: 10.0,
        };
        let pass = AdmissionVerdict::pass(level, "claude-3-haiku-20240307");
        let block = AdmissionVerdict::block(level, "no budget left");
        assert!(pass.allowed && !pass.is_degraded());
        assert_eq!(pass.strategy, FallbackStrategy::None);
        assert!(!block.allowed && block.is_degraded());
    }

    #[test]
    fn test_record_wire_format() {
        let at = Local.with_ymd_and_hms(2025, 11, 21, 9, 30, 0).single().unwrap();
        let record = UsageRecord::new(at, "executor", "llm_call", 0.05, None, true);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["period"], "2025-11-21");
        assert_eq!(value["cost_usd"], 0.05);
        assert_eq!(value["model"], serde_json::Value::Null);
        assert_eq!(value["fallback_applied"], true);

        let back: UsageRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_naive_timestamps_are_accepted() {
        let json = r#"{"period": "2025-11-21", "agent_type": "planner", "operation": "llm_call",
                       "cost_usd": 0.01, "timestamp": "2025-11-21T10:15:30.123456"}"#;
        let record: UsageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.timestamp.hour(), 10);
        assert_eq!(record.model, None);
        assert!(!record.fallback_applied);

        assert!(timestamp::parse("2025-11-21T10:15:30").is_some());
        assert!(timestamp::parse("yesterday").is_none());
    }
}
