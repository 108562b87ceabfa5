//! Board normalization: raw board → selected lists and their items.
//!
//! Both raw representations reduce to the same [`ItemMap`]: lowercased list
//! name → source-cased label and ordered item names. Only lists named in the
//! [`ListFilter`] ever appear, and items keep the order of the input.
//!
//! ## Policies
//!
//! The two representations differ in what they can express, so the policies
//! are explicit rather than unified:
//!
//! | Policy | Action log | Snapshot |
//! |---|---|---|
//! | [`ClosedPolicy`] | not applicable (no status in events) | caller's choice |
//! | [`Prepopulate`] | `No`: keys in first-seen order | `Yes`: every filter key, in filter order |
//!
//! [`NormalizeOptions::for_kind`] gives the defaults above; callers may
//! override either.

use crate::board::{ActionLog, RawBoard, RawKind, Snapshot};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

/// Case-insensitive, order-preserving set of list names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// `(lowercased, as given)`, first spelling wins on duplicates.
    names: Vec<(String, String)>,
}

impl ListFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for name in names {
            let given = name.as_ref();
            let key = given.to_lowercase();
            if !filter.names.iter().any(|(k, _)| *k == key) {
                filter.names.push((key, given.to_string()));
            }
        }
        filter
    }

    /// Whether `name` (any casing) is selected.
    pub fn contains(&self, name: &str) -> bool {
        self.position(&name.to_lowercase()).is_some()
    }

    /// Lowercased keys in caller order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|(k, _)| k.as_str())
    }

    /// Names as the caller spelled them, in caller order.
    pub fn given_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|(_, g)| g.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.names.iter().position(|(k, _)| k == key)
    }
}

/// Items collected for one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItems {
    /// List name in source casing (first occurrence on the board).
    pub label: String,
    pub items: Vec<String>,
    /// List name as spelled where each item was found, parallel to `items`.
    pub sources: Vec<String>,
}

impl ListItems {
    /// `(source list name, item)` pairs in collection order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sources
            .iter()
            .zip(&self.items)
            .map(|(source, item)| (source.as_str(), item.as_str()))
    }
}

/// Insertion-ordered mapping from lowercased list name to its items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemMap {
    lists: IndexMap<String, ListItems>,
}

impl ItemMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key` with no items unless it is already present.
    pub fn ensure(&mut self, key: &str, label: &str) -> &mut ListItems {
        self.lists
            .entry(key.to_string())
            .or_insert_with(|| ListItems {
                label: label.to_string(),
                items: Vec::new(),
                sources: Vec::new(),
            })
    }

    /// Append `item`; `label` is the list name as spelled on the item's own
    /// list and becomes the list label only if `key` is new.
    pub fn push(&mut self, key: &str, label: &str, item: &str) {
        let list = self.ensure(key, label);
        list.items.push(item.to_string());
        list.sources.push(label.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&ListItems> {
        self.lists.get(key)
    }

    /// `(key, list)` pairs in population order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ListItems)> {
        self.lists.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    /// Number of lists (including empty ones).
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Number of items across all lists.
    pub fn total_items(&self) -> usize {
        self.lists.values().map(|l| l.items.len()).sum()
    }
}

/// What to do with archived lists and cards in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClosedPolicy {
    /// Drop closed lists and closed cards.
    #[default]
    ExcludeClosed,
    /// Treat closed lists and cards like open ones.
    IgnoreStatus,
}

/// Whether every filter key is present in the mapping before items are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prepopulate {
    /// Keys appear in filter order, possibly with no items.
    Yes,
    /// Keys appear when their first item is found.
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub closed: ClosedPolicy,
    pub prepopulate: Prepopulate,
}

impl NormalizeOptions {
    pub fn for_kind(kind: RawKind) -> Self {
        match kind {
            RawKind::ActionLog => Self {
                closed: ClosedPolicy::IgnoreStatus,
                prepopulate: Prepopulate::No,
            },
            RawKind::Snapshot => Self {
                closed: ClosedPolicy::ExcludeClosed,
                prepopulate: Prepopulate::Yes,
            },
        }
    }

    pub fn with_closed(mut self, closed: ClosedPolicy) -> Self {
        self.closed = closed;
        self
    }

    pub fn with_prepopulate(mut self, prepopulate: Prepopulate) -> Self {
        self.prepopulate = prepopulate;
        self
    }
}

pub fn normalize(board: &RawBoard, filter: &ListFilter, options: NormalizeOptions) -> ItemMap {
    match board {
        RawBoard::ActionLog(log) => normalize_action_log(log, filter, options.prepopulate),
        RawBoard::Snapshot(snapshot) => normalize_snapshot(snapshot, filter, options),
    }
}

/// Collect card names from `createCard` events whose list is selected.
///
/// Events carry no open/closed status, so nothing is filtered on it.
pub fn normalize_action_log(
    log: &ActionLog,
    filter: &ListFilter,
    prepopulate: Prepopulate,
) -> ItemMap {
    let mut map = ItemMap::new();
    if prepopulate == Prepopulate::Yes {
        for (key, given) in &filter.names {
            map.ensure(key, given);
        }
    }

    for event in log.cards_created() {
        let key = event.list_name.to_lowercase();
        if filter.position(&key).is_some() {
            map.push(&key, &event.list_name, &event.card_name);
        }
    }

    debug!(
        lists = map.len(),
        items = map.total_items(),
        "normalized action log"
    );
    map
}

/// Collect card names of selected lists from a board snapshot.
pub fn normalize_snapshot(
    snapshot: &Snapshot,
    filter: &ListFilter,
    options: NormalizeOptions,
) -> ItemMap {
    let exclude_closed = options.closed == ClosedPolicy::ExcludeClosed;

    // list id → (lowercased name, list's own spelling), plus the first
    // spelling per name
    let mut lookup: HashMap<&str, (String, &str)> = HashMap::new();
    let mut labels: HashMap<String, &str> = HashMap::new();
    for list in &snapshot.lists {
        if exclude_closed && list.closed {
            continue;
        }
        let key = list.name.to_lowercase();
        if filter.position(&key).is_none() {
            continue;
        }
        labels.entry(key.clone()).or_insert(list.name.as_str());
        lookup.insert(list.id.as_str(), (key, list.name.as_str()));
    }

    let mut map = ItemMap::new();
    if options.prepopulate == Prepopulate::Yes {
        for (key, given) in &filter.names {
            let label = labels.get(key).copied().unwrap_or(given.as_str());
            map.ensure(key, label);
        }
    }

    for card in &snapshot.cards {
        if exclude_closed && card.closed {
            continue;
        }
        if let Some((key, name)) = lookup.get(card.id_list.as_str()) {
            map.ensure(key, labels.get(key).copied().unwrap_or(*name));
            map.push(key, name, &card.name);
        }
    }

    debug!(
        lists = map.len(),
        items = map.total_items(),
        closed = ?options.closed,
        "normalized snapshot"
    );
    map
}
