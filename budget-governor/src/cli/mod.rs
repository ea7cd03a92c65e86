//! Budget CLI module
//!
//! Command-line monitor for the budget governor.
//!
//! # Commands
//!
//! - `status` - Current daily usage, health and per-agent allocation
//! - `report` - Period report with agent and operation breakdowns
//! - `history` - Totals of recent daily snapshot files
//! - `reset` - Apply the retention window to the loaded ledger (files are kept)
//! - `watch` - Refresh the status view periodically

pub mod commands;
pub mod context;
pub mod output;

pub use context::CliContext;
pub use output::{OutputFormat, OutputFormatter};
