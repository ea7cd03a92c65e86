//! Immutable budget policy: limits, agent allocation, pricing and fallback chain

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::budget::period::BudgetPeriod;
use crate::budget::types::BudgetLimit;
use crate::config::GovernorConfig;
use crate::error::{BudgetError, BudgetResult};

/// Operation name of a priced model invocation
pub const LLM_CALL: &str = "llm_call";
/// Operation name of a paid web search
pub const WEB_SEARCH: &str = "web_search";
/// Agent role allowed to fall back to cached search results
pub const RESEARCHER: &str = "researcher";

/// Characters per billing unit used by text-based estimation
pub const CHARS_PER_UNIT: usize = 4;

const UNITS_PER_RATE: f64 = 1_000_000.0;

/// Price of a model in USD per million input/output units
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ModelPricing {
    pub name: String,
    pub input_rate: f64,
    pub output_rate: f64,
}

impl ModelPricing {
    pub fn new(name: impl Into<String>, input_rate: f64, output_rate: f64) -> Self {
        Self {
            name: name.into(),
            input_rate,
            output_rate,
        }
    }

    fn combined_rate(&self) -> f64 {
        self.input_rate + self.output_rate
    }
}

/// Built-in price table, ordered most expensive first
pub fn default_models() -> Vec<ModelPricing> {
    vec![
        ModelPricing::new("claude-3-opus-20240229", 15.00, 75.00),
        ModelPricing::new("claude-3-5-sonnet-20241022", 3.00, 15.00),
        ModelPricing::new("claude-sonnet-4-5", 3.00, 15.00),
        ModelPricing::new("claude-3-haiku-20240307", 0.25, 1.25),
    ]
}

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Budget policy, constructed once per process from a validated config
#[derive(Clone, Debug)]
pub struct BudgetPolicy {
    daily: BudgetLimit,
    weekly: BudgetLimit,
    monthly: BudgetLimit,
    agent_ratios: BTreeMap<String, f64>,
    default_agent_ratio: f64,
    prices: HashMap<String, ModelPricing>,
    /// Model names, most expensive first
    fallback_chain: Vec<String>,
    default_model: String,
    auto_fallback: bool,
}

impl BudgetPolicy {
    pub fn from_config(config: &GovernorConfig) -> BudgetResult<Self> {
        config.validate()?;

        let limit = |total: f64| {
            BudgetLimit::with_thresholds(total, config.warning_threshold, config.critical_threshold)
        };
        let daily = limit(config.daily_budget);
        let weekly = limit(config.weekly_total());
        let monthly = limit(config.monthly_total());
        daily.validate("daily")?;
        weekly.validate("weekly")?;
        monthly.validate("monthly")?;

        Self::validate_models(&config.models, &config.default_model)?;

        Ok(Self {
            daily,
            weekly,
            monthly,
            agent_ratios: config.agent_ratios.clone(),
            default_agent_ratio: config.default_agent_ratio,
            prices: config
                .models
                .iter()
                .map(|m| (m.name.clone(), m.clone()))
                .collect(),
            fallback_chain: config.models.iter().map(|m| m.name.clone()).collect(),
            default_model: config.default_model.clone(),
            auto_fallback: config.enable_auto_fallback,
        })
    }

    fn validate_models(models: &[ModelPricing], default_model: &str) -> BudgetResult<()> {
        if models.is_empty() {
            return Err(BudgetError::config("model price table is empty"));
        }
        let mut seen = HashSet::new();
        for model in models {
            if !seen.insert(model.name.as_str()) {
                return Err(BudgetError::config(format!(
                    "model '{}' is listed twice",
                    model.name
                )));
            }
            let rates_ok = [model.input_rate, model.output_rate]
                .iter()
                .all(|r| r.is_finite() && *r >= 0.0);
            if !rates_ok {
                return Err(BudgetError::config(format!(
                    "model '{}' has a negative or non-finite rate",
                    model.name
                )));
            }
        }
        // The chain must never step to a more expensive model
        for pair in models.windows(2) {
            if pair[1].combined_rate() > pair[0].combined_rate() {
                return Err(BudgetError::config(format!(
                    "fallback chain is not ordered most expensive first: '{}' follows '{}'",
                    pair[1].name, pair[0].name
                )));
            }
        }
        if !seen.contains(default_model) {
            return Err(BudgetError::config(format!(
                "default model '{}' has no price entry",
                default_model
            )));
        }
        Ok(())
    }

    pub fn daily(&self) -> &BudgetLimit {
        &self.daily
    }

    /// Limit matching a reporting granularity
    pub fn limit_for(&self, period: BudgetPeriod) -> &BudgetLimit {
        match period {
            BudgetPeriod::Daily => &self.daily,
            BudgetPeriod::Weekly => &self.weekly,
            BudgetPeriod::Monthly => &self.monthly,
        }
    }

    pub fn agent_ratios(&self) -> &BTreeMap<String, f64> {
        &self.agent_ratios
    }

    pub fn default_agent_ratio(&self) -> f64 {
        self.default_agent_ratio
    }

    /// Share of the daily budget allocated to `agent_type`; unknown agents
    /// get the default ratio.
    pub fn agent_ratio(&self, agent_type: &str) -> f64 {
        self.agent_ratios
            .get(agent_type)
            .copied()
            .unwrap_or(self.default_agent_ratio)
    }

    pub fn agent_limit(&self, agent_type: &str) -> f64 {
        self.daily.total * self.agent_ratio(agent_type)
    }

    pub fn auto_fallback_enabled(&self) -> bool {
        self.auto_fallback
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn fallback_chain(&self) -> &[String] {
        &self.fallback_chain
    }

    /// Price entry for `model`, or the default model's entry if unknown
    pub fn pricing(&self, model: &str) -> &ModelPricing {
        self.prices
            .get(model)
            .or_else(|| self.prices.get(&self.default_model))
            .unwrap_or_else(|| &self.prices[&self.fallback_chain[0]])
    }

    pub fn estimate_cost(&self, input_units: u64, output_units: u64, model: &str) -> f64 {
        let pricing = self.pricing(model);
        (input_units as f64 / UNITS_PER_RATE) * pricing.input_rate
            + (output_units as f64 / UNITS_PER_RATE) * pricing.output_rate
    }

    /// Rough estimate from text length; not a tokenizer.
    pub fn estimate_cost_from_text(&self, input_text: &str, output_text: &str, model: &str) -> f64 {
        let input_units = (input_text.chars().count() / CHARS_PER_UNIT) as u64;
        let output_units = (output_text.chars().count() / CHARS_PER_UNIT) as u64;
        self.estimate_cost(input_units, output_units, model)
    }

    pub fn cheapest_model(&self) -> &str {
        self.fallback_chain
            .last()
            .map(String::as_str)
            .unwrap_or(&self.default_model)
    }

    /// Next entry after `model` in the fallback chain. The last entry maps to
    /// itself; models outside the chain are treated as the most expensive
    /// and map to the cheapest entry.
    pub fn next_cheaper_model(&self, model: &str) -> &str {
        match self.fallback_chain.iter().position(|m| m == model) {
            Some(idx) if idx + 1 < self.fallback_chain.len() => &self.fallback_chain[idx + 1],
            _ => self.cheapest_model(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BudgetPolicy {
        BudgetPolicy::from_config(&GovernorConfig::with_daily_budget(1.0)).unwrap()
    }

    #[test]
    fn test_estimate_cost_sonnet() {
        let cost = policy().estimate_cost(100_000, 50_000, "claude-3-5-sonnet-20241022");
        assert!((cost - 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_cost_haiku() {
        let cost = policy().estimate_cost(100_000, 50_000, "claude-3-haiku-20240307");
        assert!((cost - 0.0875).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_uses_default_pricing() {
        let p = policy();
        assert_eq!(
            p.estimate_cost(1_000, 1_000, "gpt-unknown"),
            p.estimate_cost(1_000, 1_000, DEFAULT_MODEL)
        );
    }

    #[test]
    fn test_estimate_cost_from_text() {
        let p = policy();
        let cost = p.estimate_cost_from_text(&"a".repeat(400), &"b".repeat(200), DEFAULT_MODEL);
        assert!((cost - p.estimate_cost(100, 50, DEFAULT_MODEL)).abs() < 1e-12);
        assert!(cost > 0.0 && cost < 0.01);
        // Fewer than four characters bill nothing
        assert_eq!(p.estimate_cost_from_text("abc", "", DEFAULT_MODEL), 0.0);
    }

    #[test]
    fn test_next_cheaper_model() {
        let p = policy();
        assert_eq!(p.next_cheaper_model("claude-3-opus-20240229"), "claude-3-5-sonnet-20241022");
        assert_eq!(p.next_cheaper_model("claude-3-5-sonnet-20241022"), "claude-sonnet-4-5");
        assert_eq!(p.next_cheaper_model("claude-3-haiku-20240307"), "claude-3-haiku-20240307");
        assert_eq!(p.next_cheaper_model("mystery-model"), "claude-3-haiku-20240307");
    }

    #[test]
    fn test_fallback_chain_is_monotonic_and_converges() {
        let p = policy();
        for start in p.fallback_chain().iter().map(String::as_str).chain(["mystery-model"]) {
            let mut current = start.to_string();
            for _ in 0..p.fallback_chain().len() + 1 {
                let next = p.next_cheaper_model(&current).to_string();
                if p.fallback_chain().contains(&current) {
                    assert!(p.pricing(&next).combined_rate() <= p.pricing(&current).combined_rate());
                }
                current = next;
            }
            assert_eq!(current, p.cheapest_model());
            assert_eq!(p.next_cheaper_model(&current), current);
        }
    }

    #[test]
    fn test_agent_ratios_and_default() {
        let p = policy();
        assert!((p.agent_limit("executor") - 0.6).abs() < 1e-12);
        assert!((p.agent_limit("planner") - 0.1).abs() < 1e-12);
        assert_eq!(p.agent_ratio("unknown_agent"), p.default_agent_ratio());
        let total: f64 = p.agent_ratios().values().sum();
        assert!((total - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_period_limits_default_from_daily() {
        let p = policy();
        assert_eq!(p.limit_for(BudgetPeriod::Weekly).total, 7.0);
        assert_eq!(p.limit_for(BudgetPeriod::Monthly).total, 30.0);
    }

    #[test]
    fn test_chain_must_be_cost_descending() {
        let mut config = GovernorConfig::with_daily_budget(1.0);
        config.models.reverse();
        config.default_model = "claude-3-haiku-20240307".to_string();
        assert!(matches!(
            BudgetPolicy::from_config(&config),
            Err(BudgetError::Configuration(_))
        ));
    }

    #[test]
    fn test_default_model_must_be_priced() {
        let mut config = GovernorConfig::with_daily_budget(1.0);
        config.default_model = "nonexistent".to_string();
        assert!(BudgetPolicy::from_config(&config).is_err());
    }
}
