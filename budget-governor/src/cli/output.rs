//! Output formatting for CLI commands

use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::fmt::Display;

use crate::budget::HealthStatus;

const BAR_WIDTH: usize = 40;

/// Supported output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain text (minimal formatting)
    Plain,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "plain" => Ok(OutputFormat::Plain),
            _ => Err(format!(
                "Unknown output format '{}'. Valid options: table, json, plain",
                s
            )),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Plain => write!(f, "plain"),
        }
    }
}

/// Output formatter for consistent CLI output
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({"status": "error", "message": message})
                );
            }
            _ => {
                eprintln!("{} {}", "✗".red(), message);
            }
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        match self.format {
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({"status": "warning", "message": message})
                );
            }
            _ => {
                eprintln!("{} {}", "⚠".yellow(), message);
            }
        }
    }

    /// Print data as JSON
    pub fn json<T: Serialize>(&self, data: &T) {
        match serde_json::to_string_pretty(data) {
            Ok(json) => println!("{}", json),
            Err(e) => self.error(&format!("Failed to serialize to JSON: {}", e)),
        }
    }

    /// Print a simple key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({key: value}));
            }
            OutputFormat::Table => {
                println!("{}: {}", key.cyan(), value);
            }
            OutputFormat::Plain => {
                println!("{}: {}", key, value);
            }
        }
    }

    /// Print a table header
    pub fn table_header(&self, columns: &[&str]) {
        let header: Vec<String> = columns.iter().map(|c| format!("{:<14}", c)).collect();
        match self.format {
            OutputFormat::Table => {
                println!("{}", header.join("  ").bold());
                println!("{}", "-".repeat(header.len() * 16));
            }
            OutputFormat::Plain => println!("{}", header.join("  ")),
            OutputFormat::Json => {}
        }
    }

    /// Print a table row
    pub fn table_row<S: AsRef<str>>(&self, values: &[S]) {
        if self.format != OutputFormat::Json {
            let row: Vec<String> = values
                .iter()
                .map(|v| format!("{:<14}", v.as_ref()))
                .collect();
            println!("{}", row.join("  "));
        }
    }

    /// Print a section title
    pub fn section(&self, title: &str) {
        match self.format {
            OutputFormat::Table => {
                println!();
                println!("{}", title.bold().underline());
                println!();
            }
            OutputFormat::Plain => {
                println!();
                println!("{}", title);
                println!();
            }
            OutputFormat::Json => {}
        }
    }

    /// Health label in its status color
    pub fn status_label(&self, status: HealthStatus) -> String {
        let label = status.as_str().to_uppercase();
        match self.format {
            OutputFormat::Table => paint(&label, status).bold().to_string(),
            _ => label,
        }
    }

    /// Print a usage bar filled to `percentage`
    pub fn usage_bar(&self, percentage: f64, status: HealthStatus) {
        if self.format == OutputFormat::Json {
            return;
        }
        let filled = filled_cells(percentage);
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
        match self.format {
            OutputFormat::Table => println!("{} {:.1}%", paint(&bar, status), percentage),
            _ => println!("{} {:.1}%", bar, percentage),
        }
    }
}

/// Bar cells covered by `percentage`; overspend fills the whole bar
fn filled_cells(percentage: f64) -> usize {
    if !percentage.is_finite() {
        return if percentage > 0.0 { BAR_WIDTH } else { 0 };
    }
    ((percentage / 100.0) * BAR_WIDTH as f64)
        .round()
        .clamp(0.0, BAR_WIDTH as f64) as usize
}

fn paint(text: &str, status: HealthStatus) -> ColoredString {
    match status {
        HealthStatus::Healthy => text.green(),
        HealthStatus::Caution => text.yellow(),
        HealthStatus::Warning => text.truecolor(255, 165, 0),
        HealthStatus::Critical => text.red(),
    }
}

/// Dollar amount with four decimals
pub fn usd(amount: f64) -> String {
    format!("${:.4}", amount)
}
