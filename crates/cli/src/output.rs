//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use uicheck_e2e::{Report, ScenarioStatus, SuiteReport};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for Report {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Status", "Steps", "Duration", "Failing step", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.scenario.clone(),
            self.status.to_string(),
            self.steps.len().to_string(),
            format!("{} ms", self.duration_ms),
            self.failing_step.map(|i| i.to_string()).unwrap_or_default(),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

fn status_color(status: ScenarioStatus) -> Color {
    match status {
        ScenarioStatus::Passed => Color::Green,
        ScenarioStatus::Failed => Color::Red,
        ScenarioStatus::Timeout => Color::Yellow,
        ScenarioStatus::Errored => Color::Magenta,
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() && format != OutputFormat::Json {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print the outcome of a run
pub fn print_suite(suite: &SuiteReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(suite).unwrap_or_default());
            return;
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(Report::headers());
            for report in &suite.reports {
                let mut row = report.row().into_iter().map(Cell::new).collect::<Vec<_>>();
                row[1] = Cell::new(report.status.to_string()).fg(status_color(report.status));
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Plain => {
            for report in &suite.reports {
                println!("{}", report.summary_line());
            }
        }
    }

    for report in suite.reports.iter().filter(|r| !r.passed()) {
        for path in report.artifact_paths() {
            print_info(&format!("{}: {}", report.scenario, path.display()));
        }
    }

    let summary = format!(
        "{} total, {} passed, {} failed, {} timed out, {} errored in {} ms",
        suite.total, suite.passed, suite.failed, suite.timed_out, suite.errored, suite.duration_ms
    );
    if suite.all_passed() {
        print_success(&summary);
    } else {
        print_error(&summary);
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message.green());
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌".red(), message.red());
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}
