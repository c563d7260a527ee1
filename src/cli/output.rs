//! Output formatting utilities for the CLI.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::domain::models::Conflict;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to at most `max_len` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// A borderless table with upper-cased headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Conflicts as a table, or a short line when there are none.
pub fn conflict_table(conflicts: &[Conflict]) -> String {
    if conflicts.is_empty() {
        return "No conflicts found.".to_string();
    }
    let mut table = list_table(&["severity", "kind", "target", "component", "description"]);
    for conflict in conflicts {
        table.add_row(vec![
            Cell::new(conflict.severity.as_str()),
            Cell::new(conflict.kind.as_str()),
            Cell::new(conflict.target.as_str()),
            Cell::new(conflict.affected_component.as_deref().unwrap_or("-")),
            Cell::new(truncate(&conflict.description, 80)),
        ]);
    }
    let noun = if conflicts.len() == 1 { "conflict" } else { "conflicts" };
    format!("{} {noun}:\n{table}", conflicts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ConflictKind, ConflictTarget, Severity};

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn conflict_table_lists_every_conflict() {
        let conflicts = vec![Conflict::new(
            ConflictKind::PropMismatch,
            "structural_alignment",
            Severity::Medium,
            ConflictTarget::Impl,
            "props missing",
        )
        .with_component("Well Count Chart")];
        let rendered = conflict_table(&conflicts);
        assert!(rendered.starts_with("1 conflict:"));
        assert!(rendered.contains("Well Count Chart"));
        assert_eq!(conflict_table(&[]), "No conflicts found.");
    }
}
