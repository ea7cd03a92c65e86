//! Report command - period totals with agent and operation breakdowns

use crate::budget::{BudgetPeriod, HealthStatus};
use crate::cli::output::usd;
use crate::cli::{CliContext, OutputFormat, OutputFormatter};
use crate::error::BudgetResult;

pub fn execute(ctx: &CliContext, period: BudgetPeriod) -> BudgetResult<()> {
    let formatter = OutputFormatter::new(ctx.output_format);
    let governor = ctx.governor()?;
    let report = governor.generate_report(period);

    if formatter.format() == OutputFormat::Json {
        formatter.json(&report);
        return Ok(());
    }

    let limit = governor.policy().limit_for(period);
    let status = HealthStatus::from_percentage(report.usage_percentage, limit);

    formatter.section(&format!("Budget Report ({} {})", report.granularity, report.period));
    formatter.kv(
        "Total cost",
        &format!("{} / {}", usd(report.total_cost), usd(report.budget_limit)),
    );
    formatter.kv("Remaining", &usd(report.remaining_budget));
    formatter.kv("Operations", &report.total_operations.to_string());
    formatter.kv("Fallbacks", &report.fallback_count.to_string());
    formatter.usage_bar(report.usage_percentage, status);

    if report.total_operations == 0 {
        formatter.kv("Usage", "none recorded for this period");
        return Ok(());
    }

    formatter.section("By Agent");
    formatter.table_header(&["Agent", "Cost", "Share", "Count"]);
    for (agent, breakdown) in &report.agent_breakdown {
        formatter.table_row(&[
            agent.clone(),
            usd(breakdown.cost),
            format!("{:.1}%", breakdown.percentage),
            breakdown.count.to_string(),
        ]);
    }

    formatter.section("By Operation");
    formatter.table_header(&["Operation", "Cost", "Count", "Average"]);
    for (operation, breakdown) in &report.operation_breakdown {
        formatter.table_row(&[
            operation.clone(),
            usd(breakdown.cost),
            breakdown.count.to_string(),
            usd(breakdown.average_cost()),
        ]);
    }

    Ok(())
}
