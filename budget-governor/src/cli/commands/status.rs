//! Status command - current daily usage and per-agent allocation

use crate::budget::{HealthStatus, StatusSnapshot};
use crate::cli::output::usd;
use crate::cli::{CliContext, OutputFormat, OutputFormatter};
use crate::error::BudgetResult;

pub fn execute(ctx: &CliContext) -> BudgetResult<()> {
    let governor = ctx.governor()?;
    let status = governor.get_status();
    render(&status, &OutputFormatter::new(ctx.output_format));
    Ok(())
}

/// Print a status snapshot; shared with `watch`.
pub fn render(status: &StatusSnapshot, formatter: &OutputFormatter) {
    if formatter.format() == OutputFormat::Json {
        formatter.json(status);
        return;
    }

    formatter.section("Budget Status");
    formatter.kv("Status", &formatter.status_label(status.status));
    formatter.kv(
        "Daily usage",
        &format!("{} / {}", usd(status.current_usage), usd(status.budget_limit)),
    );
    formatter.kv("Remaining", &usd(status.remaining_budget));
    formatter.usage_bar(status.usage_percentage, status.status);

    formatter.section("Agent Allocation");
    formatter.table_header(&["Agent", "Used", "Allocated", "Usage"]);
    for (agent, usage) in &status.agent_usage {
        formatter.table_row(&[
            agent.clone(),
            usd(usage.used),
            usd(usage.allocated),
            format!("{:.1}%", usage.usage_percentage()),
        ]);
    }

    match status.status {
        HealthStatus::Critical => {
            formatter.error("Daily budget exhausted; operations are degraded or blocked")
        }
        HealthStatus::Warning => {
            formatter.warning("Critical threshold reached; cheaper models are recommended")
        }
        HealthStatus::Caution => formatter.warning("Warning threshold reached"),
        HealthStatus::Healthy => {}
    }
}
