//! CLI output formatting.
//!
//! Every command reports what it extracted before saying where it went, so
//! the output reads as an inventory of the selected lists:
//!
//! ```text
//! Lidl (2 items)
//!     001 Milk
//!     002 Bread
//! Carrefour (1 item)
//!     001 Eggs
//! Whole Foods (no items)
//!
//! 3 items exported to courses_export.csv.
//! ```
//!
//! A note run ends with `Google Keep note created: "Courses" (notes/1a2b3c)`;
//! a dry run previews the note instead:
//!
//! ```text
//! Title: Courses
//! [ ] LIDL
//!     [ ] Milk
//! ```
//!
//! Each `format_*` function returns `Vec<String>` and does no I/O; the
//! `print_*` wrappers write to stdout. Logs go to stderr, so stdout carries
//! only these lines.

use crate::encode::{ListItem, NoteBody};
use crate::keep::{CreatedNote, NewNote};
use crate::normalize::ItemMap;
use crate::pipeline::{ExportSummary, SnapshotSummary};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 item`, `2 items`, `no items`.
fn count_label(n: usize, noun: &str) -> String {
    match n {
        0 => format!("no {noun}s"),
        1 => format!("1 {noun}"),
        n => format!("{n} {noun}s"),
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Lists in mapping order, each with its indexed items.
pub fn format_item_map(map: &ItemMap) -> Vec<String> {
    let mut lines = Vec::new();
    for (_, list) in map.iter() {
        lines.push(format!(
            "{} ({})",
            list.label,
            count_label(list.items.len(), "item")
        ));
        for (i, item) in list.items.iter().enumerate() {
            lines.push(format!("{}{} {}", indent(1), format_index(i + 1), item));
        }
    }
    lines
}

pub fn print_item_map(map: &ItemMap) {
    for line in format_item_map(map) {
        println!("{}", line);
    }
}

// ============================================================================
// Results
// ============================================================================

pub fn format_export_summary(summary: &ExportSummary) -> Vec<String> {
    vec![format!(
        "{} exported to {}.",
        count_label(summary.items, "item"),
        summary.path.display()
    )]
}

pub fn print_export_summary(summary: &ExportSummary) {
    for line in format_export_summary(summary) {
        println!("{}", line);
    }
}

pub fn format_note_created(note: &CreatedNote) -> Vec<String> {
    vec![format!(
        "Google Keep note created: \"{}\" ({})",
        note.title, note.name
    )]
}

pub fn print_note_created(note: &CreatedNote) {
    for line in format_note_created(note) {
        println!("{}", line);
    }
}

pub fn format_snapshot_saved(summary: &SnapshotSummary) -> Vec<String> {
    vec![format!(
        "Saved board \"{}\" ({}, {}) to {}.",
        summary.board,
        count_label(summary.lists, "list"),
        count_label(summary.cards, "card"),
        summary.path.display()
    )]
}

pub fn print_snapshot_saved(summary: &SnapshotSummary) {
    for line in format_snapshot_saved(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Dry run
// ============================================================================

fn checklist_lines(items: &[ListItem], depth: usize, lines: &mut Vec<String>) {
    for item in items {
        let mark = if item.checked { "[x]" } else { "[ ]" };
        lines.push(format!("{}{} {}", indent(depth), mark, item.text.text));
        checklist_lines(item.children(), depth + 1, lines);
    }
}

/// The note as it would appear in Keep.
pub fn format_note_preview(note: &NewNote) -> Vec<String> {
    let mut lines = vec![format!("Title: {}", note.title)];
    match &note.body {
        NoteBody::List(list) => checklist_lines(&list.list_items, 0, &mut lines),
        NoteBody::Text(text) => lines.extend(text.text.lines().map(str::to_string)),
    }
    lines
}

pub fn print_note_preview(note: &NewNote) {
    for line in format_note_preview(note) {
        println!("{}", line);
    }
}
