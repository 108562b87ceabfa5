//! Encoders from an [`ItemMap`] to the three output shapes.
//!
//! | Encoding | Iteration order | Empty lists |
//! |---|---|---|
//! | CSV ([`encode_csv`]) | mapping population order | no rows |
//! | Text ([`encode_text`]) | caller's filter order | skipped entirely |
//! | Checklist ([`encode_checklist`]) | mapping population order | entry with no children |
//!
//! All functions here are pure: same mapping in, same output out.

use crate::normalize::{ItemMap, ListFilter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub const CSV_HEADER: [&str; 2] = ["list", "item"];

#[derive(Serialize)]
struct CsvRow<'a> {
    list: &'a str,
    item: &'a str,
}

/// `(list name, item)` pairs in CSV row order. Each row carries the list
/// name as spelled where that item was found.
pub fn csv_rows(map: &ItemMap) -> Vec<(&str, &str)> {
    map.iter().flat_map(|(_, list)| list.rows()).collect()
}

/// Encode as CSV with a `list,item` header, one row per item.
pub fn encode_csv(map: &ItemMap) -> Result<String, EncodeError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    // Written by hand so an empty mapping still yields a header
    writer.write_record(CSV_HEADER)?;
    for (list, item) in csv_rows(map) {
        writer.serialize(CsvRow { list, item })?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Encode as plain text: upper-cased list name, its items, then a blank line.
///
/// Lists are visited in `filter` order; lists without items produce nothing.
pub fn encode_text(map: &ItemMap, filter: &ListFilter) -> String {
    let mut lines = Vec::new();
    let sections = filter
        .keys()
        .filter_map(|key| map.get(key))
        .filter(|list| !list.items.is_empty());
    for list in sections {
        lines.push(list.label.to_uppercase());
        lines.extend(list.items.iter().cloned());
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Text fragment as the Keep API nests it: `{"text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
}

/// One checkable entry of a checklist note.
///
/// Sections always carry `childListItems`, as `[]` when the list is empty;
/// leaf items leave the field out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub text: TextContent,
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_list_items: Option<Vec<ListItem>>,
}

impl ListItem {
    pub fn unchecked(text: impl Into<String>) -> Self {
        Self {
            text: TextContent { text: text.into() },
            checked: false,
            child_list_items: None,
        }
    }

    /// The entry's children, empty for a leaf.
    pub fn children(&self) -> &[ListItem] {
        self.child_list_items.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListContent {
    pub list_items: Vec<ListItem>,
}

/// Body of a note: `{"text": {...}}` or `{"list": {"listItems": [...]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteBody {
    Text(TextContent),
    List(ListContent),
}

/// Shape of the note to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteStyle {
    /// One section entry per list with the items nested beneath it.
    #[default]
    Checklist,
    /// The [`encode_text`] output as a single text body.
    Text,
}

/// Encode as checklist entries: one unchecked section per list, one unchecked
/// child per item. Lists without items still get their section.
pub fn encode_checklist(map: &ItemMap) -> Vec<ListItem> {
    map.iter()
        .map(|(_, list)| ListItem {
            child_list_items: Some(list.items.iter().map(ListItem::unchecked).collect()),
            ..ListItem::unchecked(list.label.to_uppercase())
        })
        .collect()
}

pub fn encode_note(map: &ItemMap, filter: &ListFilter, style: NoteStyle) -> NoteBody {
    match style {
        NoteStyle::Checklist => NoteBody::List(ListContent {
            list_items: encode_checklist(map),
        }),
        NoteStyle::Text => NoteBody::Text(TextContent {
            text: encode_text(map, filter),
        }),
    }
}
