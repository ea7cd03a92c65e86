//! Watch command - periodically refresh the status view

use std::thread;
use std::time::Duration;

use crate::cli::commands::status;
use crate::cli::{CliContext, OutputFormat, OutputFormatter};
use crate::error::BudgetResult;

/// Runs until interrupted. The governor is rebuilt on every tick so the
/// view follows snapshots written by other processes.
pub fn execute(ctx: &CliContext, interval_secs: u64) -> BudgetResult<()> {
    let formatter = OutputFormatter::new(ctx.output_format);
    let interval = Duration::from_secs(interval_secs.max(1));

    loop {
        let governor = ctx.governor()?;
        let snapshot = governor.get_status();

        if formatter.format() != OutputFormat::Json {
            // ANSI clear screen and home cursor
            print!("\x1B[2J\x1B[1;1H");
        }
        status::render(&snapshot, &formatter);
        if formatter.format() != OutputFormat::Json && !ctx.quiet {
            println!();
            println!(
                "Refreshing every {}s, press Ctrl+C to stop",
                interval.as_secs()
            );
        }

        thread::sleep(interval);
    }
}
