//! History command - totals of recent daily snapshot files

use crate::cli::output::usd;
use crate::cli::{CliContext, OutputFormat, OutputFormatter};
use crate::error::BudgetResult;

pub fn execute(ctx: &CliContext, days: u32) -> BudgetResult<()> {
    let formatter = OutputFormatter::new(ctx.output_format);
    let governor = ctx.governor()?;
    let history = governor.history(days);

    if formatter.format() == OutputFormat::Json {
        formatter.json(&history);
        return Ok(());
    }

    formatter.section(&format!("Budget History (last {} days)", days));
    if history.is_empty() {
        formatter.kv(
            "Snapshots",
            &format!("none found in {}", governor.storage_dir().display()),
        );
        return Ok(());
    }

    formatter.table_header(&["Date", "Cost", "Operations", "Fallbacks"]);
    for day in &history {
        formatter.table_row(&[
            day.date.clone(),
            usd(day.total_cost),
            day.operations.to_string(),
            day.fallbacks.to_string(),
        ]);
    }

    let total_cost: f64 = history.iter().map(|d| d.total_cost).sum();
    let total_operations: usize = history.iter().map(|d| d.operations).sum();

    formatter.section("Summary");
    formatter.kv("Total cost", &usd(total_cost));
    formatter.kv("Total operations", &total_operations.to_string());
    formatter.kv(
        "Average per day",
        &usd(total_cost / history.len() as f64),
    );

    Ok(())
}
