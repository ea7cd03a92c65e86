//! Reset command - prune in-memory records older than the retention window
//!
//! A governor built by the CLI loads only today's snapshot, so a reset run
//! from here finds nothing old to prune. The command checks the retention
//! window against the loaded ledger and reports the result. Snapshot files
//! are never touched; long-running processes get the real effect by calling
//! `BudgetGovernor::reset` themselves.

use std::io::{self, BufRead, Write};

use crate::cli::{CliContext, OutputFormat, OutputFormatter};
use crate::error::BudgetResult;

pub fn execute(ctx: &CliContext, yes: bool) -> BudgetResult<()> {
    let formatter = OutputFormatter::new(ctx.output_format);

    if !yes && !confirm(ctx.config.retention_days) {
        formatter.warning("Reset cancelled");
        return Ok(());
    }

    let governor = ctx.governor()?;
    let removed = governor.reset();

    if formatter.format() == OutputFormat::Json {
        formatter.json(&serde_json::json!({
            "pruned": removed,
            "retention_days": ctx.config.retention_days,
        }));
    } else {
        formatter.kv("Reset", &summary(removed, ctx.config.retention_days));
    }
    Ok(())
}

fn summary(removed: usize, retention_days: u32) -> String {
    if removed == 0 {
        format!(
            "nothing older than {} days in memory (this process loaded only today's snapshot; files are kept)",
            retention_days
        )
    } else {
        format!(
            "pruned {} records older than {} days from memory (files are kept)",
            removed, retention_days
        )
    }
}

fn confirm(retention_days: u32) -> bool {
    print!(
        "Prune in-memory budget records older than {} days? Snapshot files are kept. [y/N] ",
        retention_days
    );
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
