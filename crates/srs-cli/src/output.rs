//! Text and JSON printing shared by the commands.

use colored::Colorize;
use serde::Serialize;

use crate::OutputFormat;

/// Print `value` as pretty JSON on stdout.
pub fn print<T: Serialize>(value: &T, format: OutputFormat, quiet: bool) {
    if quiet || !matches!(format, OutputFormat::Json) {
        return;
    }
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("{}: failed to encode JSON: {e}", "Error".red().bold()),
    }
}

/// Status line on stderr, text mode only.
pub fn info(message: &str, format: OutputFormat, quiet: bool) {
    if quiet || matches!(format, OutputFormat::Json) {
        return;
    }
    eprintln!("{} {message}", "•".blue());
}

pub fn success(message: &str, format: OutputFormat, quiet: bool) {
    if quiet || matches!(format, OutputFormat::Json) {
        return;
    }
    println!("{} {message}", "✓".green().bold());
}

pub fn warning(message: &str, format: OutputFormat, quiet: bool) {
    if quiet || matches!(format, OutputFormat::Json) {
        return;
    }
    eprintln!("{} {message}", "!".yellow().bold());
}

/// Indented `label: value` line.
pub fn field(label: &str, value: impl std::fmt::Display) {
    println!("  {}: {value}", label.cyan());
}
