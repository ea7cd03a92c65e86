//! Period reports, health status and on-disk history

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::budget::ledger::UsageLedger;
use crate::budget::period::{daily_key, BudgetPeriod};
use crate::budget::policy::BudgetPolicy;
use crate::budget::types::{HealthStatus, UsageRecord};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentBreakdown {
    pub cost: f64,
    /// Share of the period's total cost
    pub percentage: f64,
    pub count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationBreakdown {
    pub cost: f64,
    pub count: usize,
}

impl OperationBreakdown {
    pub fn average_cost(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.cost / self.count as f64
        }
    }
}

/// Aggregated spending for one period
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    pub period: String,
    pub granularity: BudgetPeriod,
    pub total_cost: f64,
    pub budget_limit: f64,
    pub usage_percentage: f64,
    pub remaining_budget: f64,
    pub agent_breakdown: BTreeMap<String, AgentBreakdown>,
    pub operation_breakdown: BTreeMap<String, OperationBreakdown>,
    pub fallback_count: usize,
    pub total_operations: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentUsage {
    pub used: f64,
    pub allocated: f64,
}

impl AgentUsage {
    pub fn usage_percentage(&self) -> f64 {
        if self.allocated > 0.0 {
            self.used / self.allocated * 100.0
        } else {
            0.0
        }
    }
}

/// Current daily health, for monitors and dashboards
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: HealthStatus,
    pub current_usage: f64,
    pub budget_limit: f64,
    pub usage_percentage: f64,
    pub remaining_budget: f64,
    /// Usage of every configured agent role, including idle ones
    pub agent_usage: BTreeMap<String, AgentUsage>,
}

/// Totals of one historical daily snapshot file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyHistory {
    pub date: String,
    pub total_cost: f64,
    pub operations: usize,
    pub fallbacks: usize,
}

impl DailyHistory {
    pub fn from_records(date: impl Into<String>, records: &[UsageRecord]) -> Self {
        Self {
            date: date.into(),
            total_cost: records.iter().map(|r| r.cost).sum(),
            operations: records.len(),
            fallbacks: records.iter().filter(|r| r.fallback_applied).count(),
        }
    }
}

pub struct ReportGenerator<'a> {
    policy: &'a BudgetPolicy,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(policy: &'a BudgetPolicy) -> Self {
        Self { policy }
    }

    /// Report for the period containing `now`.
    ///
    /// Daily reports select on the record's stored day key; weekly and
    /// monthly reports bucket each record by its timestamp.
    pub fn generate(
        &self,
        ledger: &UsageLedger,
        period: BudgetPeriod,
        now: &DateTime<Local>,
    ) -> BudgetReport {
        let period_key = period.key_for(now);
        let records: Vec<&UsageRecord> = ledger
            .records()
            .iter()
            .filter(|r| match period {
                BudgetPeriod::Daily => r.period_key == period_key,
                _ => period.key_for(&r.timestamp) == period_key,
            })
            .collect();

        let budget_limit = self.policy.limit_for(period).total;
        let total_cost: f64 = records.iter().map(|r| r.cost).sum();

        let mut agent_breakdown: BTreeMap<String, AgentBreakdown> = BTreeMap::new();
        let mut operation_breakdown: BTreeMap<String, OperationBreakdown> = BTreeMap::new();
        for record in &records {
            let agent = agent_breakdown.entry(record.agent_type.clone()).or_default();
            agent.cost += record.cost;
            agent.count += 1;

            let op = operation_breakdown.entry(record.operation.clone()).or_default();
            op.cost += record.cost;
            op.count += 1;
        }
        for agent in agent_breakdown.values_mut() {
            agent.percentage = if total_cost > 0.0 {
                agent.cost / total_cost * 100.0
            } else {
                0.0
            };
        }

        BudgetReport {
            period: period_key,
            granularity: period,
            total_cost,
            budget_limit,
            usage_percentage: total_cost / budget_limit * 100.0,
            remaining_budget: budget_limit - total_cost,
            agent_breakdown,
            operation_breakdown,
            fallback_count: records.iter().filter(|r| r.fallback_applied).count(),
            total_operations: records.len(),
        }
    }

    pub fn status(&self, ledger: &UsageLedger, now: &DateTime<Local>) -> StatusSnapshot {
        let today = daily_key(now);
        let daily = self.policy.daily();
        let current_usage = ledger.total_for_day(&today);
        let usage_percentage = current_usage / daily.total * 100.0;

        let agent_usage = self
            .policy
            .agent_ratios()
            .keys()
            .map(|agent| {
                (
                    agent.clone(),
                    AgentUsage {
                        used: ledger.agent_total_for_day(&today, agent),
                        allocated: self.policy.agent_limit(agent),
                    },
                )
            })
            .collect();

        StatusSnapshot {
            status: HealthStatus::from_percentage(usage_percentage, daily),
            current_usage,
            budget_limit: daily.total,
            usage_percentage,
            remaining_budget: daily.total - current_usage,
            agent_usage,
        }
    }
}
