//! Output formatting utilities

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    #[value(alias = "json-pretty")]
    Pretty,
    Table,
}

/// Color output options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Set up color output based on user preference
pub fn setup_colors(mode: ColorMode) {
    let enabled = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal(),
    };
    colored::control::set_override(enabled);
}

/// Format an error for display
pub fn format_error(error: &anyhow::Error) -> String {
    format!("{} {:#}", "Error:".red().bold(), error)
}

/// Format a success message for display
pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

/// Write output to a file or stdout
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    if let Some(path) = output_file {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write to output file: {}", path.display()))?;
        eprintln!(
            "{}",
            format_success(&format!("Output written to {}", path.display()))
        );
    } else {
        println!("{content}");
    }
    Ok(())
}

/// A titled grid of display strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new(title: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            title: title.into(),
            columns,
            rows: Vec::new(),
        }
    }

    fn render(&self) -> String {
        if self.rows.is_empty() {
            return format!("{}\n(no rows)", self.title.bold());
        }
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().cloned());
        for row in &self.rows {
            builder.push_record(row.iter().cloned());
        }
        let mut table = builder.build();
        table.with(Style::modern());
        format!("{}\n{}", self.title.bold(), table)
    }
}

/// Command results that can also be shown as tables
pub trait Tabular: Serialize {
    fn tables(&self) -> Vec<TextTable>;
}

/// Format a command result in the requested format
pub fn format_output<T: Tabular + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(value).context("Failed to serialize JSON"),
        OutputFormat::Pretty => serde_json::to_string_pretty(value).context("Failed to serialize JSON"),
        OutputFormat::Table => Ok(value
            .tables()
            .iter()
            .map(TextTable::render)
            .collect::<Vec<_>>()
            .join("\n\n")),
    }
}

/// Format and write a command result
pub fn print_output<T: Tabular + ?Sized>(value: &T, format: OutputFormat, output_file: Option<&Path>) -> Result<()> {
    let content = format_output(value, format)?;
    write_output(&content, output_file)
}
