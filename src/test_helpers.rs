//! Shared test utilities.
//!
//! JSON builders for the two board shapes, fixture access, and a flattening
//! helper for asserting on an [`ItemMap`] in one expression.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let value = action_log(vec![
//!     create_card("Lidl", "Milk"),
//!     other_action("updateCard"),
//! ]);
//! let board = RawBoard::parse(&value, RawKind::ActionLog).unwrap();
//! let map = normalize(&board, &filter(&["lidl"]), NormalizeOptions::for_kind(RawKind::ActionLog));
//!
//! assert_eq!(map_pairs(&map), vec![("lidl".to_string(), vec!["Milk".to_string()])]);
//! ```

use crate::normalize::{ItemMap, ListFilter};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

// =========================================================================
// Board builders
// =========================================================================

/// A `createCard` action as it appears in a board export.
pub fn create_card(list: &str, card: &str) -> Value {
    json!({
        "type": "createCard",
        "data": {
            "list": {"name": list},
            "card": {"name": card},
        },
    })
}

/// Any non-card action, e.g. `updateCard` or `commentCard`.
pub fn other_action(kind: &str) -> Value {
    json!({
        "type": kind,
        "data": {"text": "ignored"},
    })
}

/// A board payload with only an `actions` array.
pub fn action_log(actions: Vec<Value>) -> Value {
    json!({"name": "Courses", "actions": actions})
}

/// A board payload named "Courses" with `(id, name, closed)` lists and
/// `(name, idList, closed)` cards.
pub fn snapshot(lists: &[(&str, &str, bool)], cards: &[(&str, &str, bool)]) -> Value {
    let lists: Vec<Value> = lists
        .iter()
        .map(|(id, name, closed)| json!({"id": id, "name": name, "closed": closed}))
        .collect();
    let cards: Vec<Value> = cards
        .iter()
        .map(|(name, id_list, closed)| json!({"name": name, "idList": id_list, "closed": closed}))
        .collect();
    json!({"name": "Courses", "lists": lists, "cards": cards})
}

// =========================================================================
// Fixtures
// =========================================================================

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

pub fn load_fixture(name: &str) -> Value {
    let content = std::fs::read_to_string(fixture_path(name)).unwrap();
    serde_json::from_str(&content).unwrap()
}

// =========================================================================
// Filters and mappings
// =========================================================================

pub fn filter(names: &[&str]) -> ListFilter {
    ListFilter::new(names.iter().copied())
}

/// `(key, items)` pairs in mapping order.
pub fn map_pairs(map: &ItemMap) -> Vec<(String, Vec<String>)> {
    map.iter()
        .map(|(key, list)| (key.to_string(), list.items.clone()))
        .collect()
}
