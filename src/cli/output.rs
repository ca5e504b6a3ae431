//! Output formatting helpers for CLI commands

use crate::agent::{AnalysisResult, Presence};
use crate::history::LogEntry;
use chrono::Local;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// Colored presence label
fn presence_label(present: Presence) -> String {
    match present {
        Presence::Present => "Present".green().to_string(),
        Presence::Absent => "Away".red().to_string(),
        Presence::Unknown => "Unknown".yellow().to_string(),
    }
}

/// Hint text, or the error for failed analyses
fn note(result: &AnalysisResult) -> String {
    match &result.error {
        Some(error) => error.red().to_string(),
        None if result.need_hint => result.hint.clone(),
        None => String::new(),
    }
}

fn local_time(entry: &LogEntry) -> String {
    entry
        .timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Format entries as a table, newest first
pub fn format_history_table(entries: &[LogEntry]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Present", "Page", "Status", "Hint"]);

    for entry in entries {
        table.add_row(vec![
            Cell::new(local_time(entry)),
            Cell::new(presence_label(entry.result.present)),
            Cell::new(&entry.result.page),
            Cell::new(&entry.result.status),
            Cell::new(note(&entry.result)),
        ]);
    }

    table.to_string()
}

/// Format entries as JSON
pub fn format_history_json(entries: &[LogEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "count": entries.len(),
        "entries": entries
    }))
}

/// One-line summary printed as entries arrive during `watch`
pub fn format_entry_line(entry: &LogEntry) -> String {
    let result = &entry.result;
    let mut line = format!(
        "[{}] {} page={} status={}",
        local_time(entry),
        presence_label(result.present),
        result.page,
        result.status
    );

    let note = note(result);
    if !note.is_empty() {
        line.push_str(" | ");
        line.push_str(&note);
    }
    line
}

/// Human-readable rendering of a single analysis
pub fn format_result(result: &AnalysisResult) -> String {
    let mut lines = vec![
        format!("Present: {}", presence_label(result.present)),
        format!("Page:    {}", result.page),
        format!("Status:  {}", result.status),
    ];
    if result.need_hint {
        lines.push(format!("Hint:    {}", result.hint));
    }
    if let Some(error) = &result.error {
        lines.push(format!("Error:   {}", error.red()));
    }
    lines.join("\n")
}
