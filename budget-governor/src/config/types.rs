use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::budget::policy::{default_models, ModelPricing, DEFAULT_MODEL};
use crate::budget::BudgetLimit;
use crate::error::{BudgetError, BudgetResult};

/// Top-level shape of a configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub budget: GovernorConfig,
}

/// Budget governor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GovernorConfig {
    /// Daily budget in USD
    pub daily_budget: f64,
    /// Weekly budget in USD (defaults to `daily_budget * 7`)
    pub weekly_budget: Option<f64>,
    /// Monthly budget in USD (defaults to `daily_budget * 30`)
    pub monthly_budget: Option<f64>,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    /// Share of the daily budget per agent role
    pub agent_ratios: BTreeMap<String, f64>,
    /// Share used for agent roles missing from `agent_ratios`
    pub default_agent_ratio: f64,
    /// Degrade instead of blocking when a limit would be crossed
    pub enable_auto_fallback: bool,
    /// Directory holding `budget_usage_<date>.json` snapshots
    pub storage_dir: PathBuf,
    /// Number of appends between snapshot writes
    pub batch_size: usize,
    /// Days of records kept in memory by `reset`
    pub retention_days: u32,
    /// Model priced for unknown model names
    pub default_model: String,
    /// Price table and fallback chain, most expensive first
    pub models: Vec<ModelPricing>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            daily_budget: 100.0,
            weekly_budget: None,
            monthly_budget: None,
            warning_threshold: BudgetLimit::DEFAULT_WARNING,
            critical_threshold: BudgetLimit::DEFAULT_CRITICAL,
            agent_ratios: default_agent_ratios(),
            default_agent_ratio: 0.3,
            enable_auto_fallback: true,
            storage_dir: PathBuf::from("logs/budget"),
            batch_size: 10,
            retention_days: 7,
            default_model: DEFAULT_MODEL.to_string(),
            models: default_models(),
        }
    }
}

fn default_agent_ratios() -> BTreeMap<String, f64> {
    [("planner", 0.1), ("executor", 0.6), ("researcher", 0.3)]
        .into_iter()
        .map(|(agent, ratio)| (agent.to_string(), ratio))
        .collect()
}

impl GovernorConfig {
    pub fn with_daily_budget(daily_budget: f64) -> Self {
        Self {
            daily_budget,
            ..Default::default()
        }
    }

    pub fn weekly_total(&self) -> f64 {
        self.weekly_budget.unwrap_or(self.daily_budget * 7.0)
    }

    pub fn monthly_total(&self) -> f64 {
        self.monthly_budget.unwrap_or(self.daily_budget * 30.0)
    }

    /// Load the `[budget]` table from a TOML file; a missing file yields defaults.
    pub fn load(path: &Path) -> BudgetResult<Self> {
        if !path.exists() {
            log::debug!("No budget config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            BudgetError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            BudgetError::Configuration(msg) => {
                BudgetError::config(format!("{:?}: {}", path, msg))
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> BudgetResult<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| BudgetError::config(format!("Failed to parse config: {}", e)))?;
        file.budget.validate()?;
        Ok(file.budget)
    }

    /// Check every constraint a policy needs; violations are fatal.
    pub fn validate(&self) -> BudgetResult<()> {
        BudgetLimit::with_thresholds(
            self.daily_budget,
            self.warning_threshold,
            self.critical_threshold,
        )
        .validate("daily")?;
        for (name, total) in [("weekly", self.weekly_budget), ("monthly", self.monthly_budget)] {
            if let Some(total) = total {
                BudgetLimit::new(total).validate(name)?;
            }
        }

        for (agent, ratio) in &self.agent_ratios {
            if !(0.0..=1.0).contains(ratio) {
                return Err(BudgetError::config(format!(
                    "agent ratio for '{}' must be in [0, 1], got {}",
                    agent, ratio
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.default_agent_ratio) {
            return Err(BudgetError::config(format!(
                "default agent ratio must be in [0, 1], got {}",
                self.default_agent_ratio
            )));
        }
        let allocated: f64 = self.agent_ratios.values().sum();
        if allocated > 1.0 + f64::EPSILON {
            log::warn!(
                "Agent ratios sum to {:.2}; agent limits overcommit the daily budget",
                allocated
            );
        }

        if self.batch_size == 0 {
            return Err(BudgetError::config("batch_size must be at least 1"));
        }
        Ok(())
    }
}
