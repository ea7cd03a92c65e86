//! Admission control - decides whether, and how, an operation may run

use crate::budget::ledger::UsageLedger;
use crate::budget::policy::{BudgetPolicy, LLM_CALL, RESEARCHER, WEB_SEARCH};
use crate::budget::types::{AdmissionVerdict, UsageLevel};

/// Prospective operation submitted for admission
#[derive(Clone, Copy, Debug)]
pub struct AdmissionRequest<'r> {
    pub agent_type: &'r str,
    pub operation: &'r str,
    pub estimated_cost: f64,
    pub model: &'r str,
}

/// Stateless decision engine over a policy and a ledger view.
///
/// The controller only reads; recording the actual cost after the operation
/// is the caller's job.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionController<'a> {
    policy: &'a BudgetPolicy,
}

impl<'a> AdmissionController<'a> {
    pub fn new(policy: &'a BudgetPolicy) -> Self {
        Self { policy }
    }

    /// Check a request against today's daily limit, then the agent's share
    /// of it, then the warning thresholds.
    pub fn check(
        &self,
        ledger: &UsageLedger,
        today: &str,
        request: AdmissionRequest<'_>,
    ) -> AdmissionVerdict {
        let daily = self.policy.daily();
        let daily_usage = ledger.total_for_day(today);

        // Zero-cost operations spend nothing and are always admitted
        if !(request.estimated_cost > 0.0) {
            return AdmissionVerdict::pass(
                UsageLevel {
                    current_usage: daily_usage,
                    budget_limit: daily.total,
                    usage_percentage: daily_usage / daily.total * 100.0,
                },
                request.model,
            );
        }

        let agent_limit = self.policy.agent_limit(request.agent_type);
        let agent_usage = ledger.agent_total_for_day(today, request.agent_type);

        let projected_total = daily_usage + request.estimated_cost;
        let usage_percentage = projected_total / daily.total * 100.0;

        log::debug!(
            "Budget check: {}.{} | estimated=${:.4} | usage=${:.4}/{:.2} | projected={:.1}%",
            request.agent_type,
            request.operation,
            request.estimated_cost,
            daily_usage,
            daily.total,
            usage_percentage
        );

        if projected_total > daily.total {
            log::warn!(
                "Daily budget exceeded: usage=${:.4}, limit=${:.2}",
                daily_usage,
                daily.total
            );
            return self.degrade(
                request,
                UsageLevel {
                    current_usage: daily_usage,
                    budget_limit: daily.total,
                    usage_percentage,
                },
            );
        }

        let agent_projected = agent_usage + request.estimated_cost;
        if agent_projected > agent_limit {
            log::warn!(
                "{} agent budget exceeded: usage=${:.4}, limit=${:.2}",
                request.agent_type,
                agent_usage,
                agent_limit
            );
            let agent_percentage = if agent_limit > 0.0 {
                agent_projected / agent_limit * 100.0
            } else {
                100.0
            };
            return self.degrade(
                request,
                UsageLevel {
                    current_usage: agent_usage,
                    budget_limit: agent_limit,
                    usage_percentage: agent_percentage,
                },
            );
        }

        let level = UsageLevel {
            current_usage: daily_usage,
            budget_limit: daily.total,
            usage_percentage,
        };

        if usage_percentage >= daily.warning_threshold * 100.0 {
            log::warn!(
                "Budget warning: {:.1}% used (${:.4}/${:.2})",
                usage_percentage,
                daily_usage,
                daily.total
            );

            if self.policy.auto_fallback_enabled()
                && usage_percentage >= daily.critical_threshold * 100.0
            {
                let cheaper = self.policy.next_cheaper_model(request.model);
                if cheaper != request.model {
                    log::info!(
                        "Budget critical, recommending {} instead of {}",
                        cheaper,
                        request.model
                    );
                    return AdmissionVerdict::smaller_model(
                        level,
                        cheaper,
                        format!("Budget is tight, switch to {}", cheaper),
                    );
                }
            }
        }

        AdmissionVerdict::pass(level, request.model)
    }

    /// Pick the mildest degradation available for an over-limit request.
    fn degrade(&self, request: AdmissionRequest<'_>, level: UsageLevel) -> AdmissionVerdict {
        if !self.policy.auto_fallback_enabled() {
            log::error!(
                "Budget exceeded, blocking {}.{} (auto-fallback disabled)",
                request.agent_type,
                request.operation
            );
            return AdmissionVerdict::block(level, "Budget exceeded, operation blocked");
        }

        if request.operation == WEB_SEARCH && request.agent_type == RESEARCHER {
            log::info!("Fallback strategy: research cache only");
            return AdmissionVerdict::cache_only(level, "Budget exceeded, serve cached results only");
        }

        if request.operation == LLM_CALL {
            let cheaper = self.policy.next_cheaper_model(request.model);
            if cheaper != request.model {
                log::info!("Fallback strategy: switching model {} -> {}", request.model, cheaper);
                return AdmissionVerdict::smaller_model(
                    level,
                    cheaper,
                    format!("Budget exceeded, switched to {}", cheaper),
                );
            }
        }

        log::error!(
            "Budget exhausted, blocking {}.{}",
            request.agent_type,
            request.operation
        );
        AdmissionVerdict::block(level, "Budget exhausted, no cheaper fallback available")
    }
}
