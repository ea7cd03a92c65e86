//! CLI context - shared configuration for all commands

use std::path::PathBuf;

use crate::budget::BudgetGovernor;
use crate::config::GovernorConfig;
use crate::error::BudgetResult;

/// Shared context for CLI commands
pub struct CliContext {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Loaded budget configuration
    pub config: GovernorConfig,
    /// Output format preference
    pub output_format: super::OutputFormat,
    /// Quiet mode (suppress status messages)
    pub quiet: bool,
    /// Verbose mode (extra debug output)
    pub verbose: bool,
}

impl CliContext {
    /// Create a new CLI context from configuration path
    pub fn new(config_path: PathBuf) -> BudgetResult<Self> {
        let config = GovernorConfig::load(&config_path)?;
        Ok(Self {
            config_path,
            config,
            output_format: super::OutputFormat::Table,
            quiet: false,
            verbose: false,
        })
    }

    /// Create context from the first config file found in the usual places
    pub fn with_defaults() -> BudgetResult<Self> {
        let default_paths = [
            PathBuf::from("config/budget.toml"),
            PathBuf::from("budget.toml"),
        ];

        for path in &default_paths {
            if path.exists() {
                return Self::new(path.clone());
            }
        }

        Ok(Self {
            config_path: PathBuf::from("budget.toml"),
            config: GovernorConfig::default(),
            output_format: super::OutputFormat::Table,
            quiet: false,
            verbose: false,
        })
    }

    /// Build a fresh governor; it loads today's snapshot from storage.
    pub fn governor(&self) -> BudgetResult<BudgetGovernor> {
        BudgetGovernor::new(self.config.clone())
    }
}
