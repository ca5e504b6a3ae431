//! History command handlers

use crate::cli::output::{format_history_json, format_history_table};
use crate::cli::{HistoryClearArgs, HistoryListArgs};
use crate::history::{JsonFileStorage, LogStore};
use std::io::{BufRead, Write};
use std::path::Path;

fn open_persisted(config_path: &Path) -> Result<LogStore, Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let storage = JsonFileStorage::new(config.history.resolved_path());
    Ok(LogStore::open(Box::new(storage), config.history.capacity))
}

/// Handle `studycam history list` command
pub fn handle_history_list(args: &HistoryListArgs) -> Result<String, Box<dyn std::error::Error>> {
    let store = open_persisted(&args.config)?;
    render_list(&store, args.limit, args.json)
}

fn render_list(
    store: &LogStore,
    limit: Option<usize>,
    json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut entries = store.list();
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    if json {
        return Ok(format_history_json(&entries)?);
    }

    if entries.is_empty() {
        return Ok("No study history yet.".to_string());
    }
    Ok(format_history_table(&entries))
}

/// Handle `studycam history clear` command
///
/// Without `--yes`, reads a y/N answer from `input`.
pub fn handle_history_clear(
    args: &HistoryClearArgs,
    input: &mut impl BufRead,
) -> Result<String, Box<dyn std::error::Error>> {
    let store = open_persisted(&args.config)?;
    clear_confirmed(&store, args.yes, input)
}

fn clear_confirmed(
    store: &LogStore,
    yes: bool,
    input: &mut impl BufRead,
) -> Result<String, Box<dyn std::error::Error>> {
    let count = store.len();

    if !yes {
        print!("Delete all {} history entries? [y/N] ", count);
        std::io::stdout().flush()?;

        let mut answer = String::new();
        input.read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            return Ok("Aborted, history kept.".to_string());
        }
    }

    store.clear();
    Ok(format!("✓ Cleared {} history entries", count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AnalysisResult, Presence};

    fn seeded(count: usize) -> LogStore {
        let store = LogStore::in_memory();
        for i in 0..count {
            store.append(AnalysisResult {
                present: Presence::Present,
                page: format!("p{}", i),
                status: "solving".to_string(),
                ..Default::default()
            });
        }
        store
    }

    fn count(store: &LogStore) -> u64 {
        let parsed: serde_json::Value =
            serde_json::from_str(&render_list(store, None, true).unwrap()).unwrap();
        parsed["count"].as_u64().unwrap()
    }

    #[test]
    fn test_list_json_newest_first() {
        let store = seeded(3);
        let output = render_list(&store, None, true).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["count"], 3);
        assert_eq!(parsed["entries"][0]["page"], "p2");
        assert_eq!(parsed["entries"][2]["page"], "p0");
    }

    #[test]
    fn test_list_limit() {
        let store = seeded(5);
        let parsed: serde_json::Value =
            serde_json::from_str(&render_list(&store, Some(2), true).unwrap()).unwrap();
        assert_eq!(parsed["count"], 2);
        assert_eq!(parsed["entries"][1]["page"], "p3");
    }

    #[test]
    fn test_list_empty_table() {
        let store = seeded(0);
        assert_eq!(
            render_list(&store, None, false).unwrap(),
            "No study history yet."
        );
    }

    #[test]
    fn test_list_table() {
        let store = seeded(1);
        assert!(render_list(&store, None, false).unwrap().contains("p0"));
    }

    #[test]
    fn test_clear_with_yes() {
        let store = seeded(2);
        let msg = clear_confirmed(&store, true, &mut std::io::empty()).unwrap();
        assert!(msg.contains("Cleared 2"));
        assert_eq!(count(&store), 0);
    }

    #[test]
    fn test_clear_declined_keeps_history() {
        let store = seeded(2);
        let msg = clear_confirmed(&store, false, &mut "n\n".as_bytes()).unwrap();
        assert!(msg.starts_with("Aborted"));
        assert_eq!(count(&store), 2);
    }

    #[test]
    fn test_clear_eof_keeps_history() {
        let store = seeded(1);
        let msg = clear_confirmed(&store, false, &mut std::io::empty()).unwrap();
        assert!(msg.starts_with("Aborted"));
        assert_eq!(count(&store), 1);
    }

    #[test]
    fn test_clear_confirmed() {
        let store = seeded(1);
        let msg = clear_confirmed(&store, false, &mut "yes\n".as_bytes()).unwrap();
        assert!(msg.contains("Cleared 1"));
        assert_eq!(count(&store), 0);
    }
}
