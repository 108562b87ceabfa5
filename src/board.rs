//! Raw board representations.
//!
//! A board reaches the pipeline in one of two shapes, both plain JSON:
//!
//! - **Action log**: the `actions` array of a Trello board export. Only
//!   `createCard` events matter; each names the list the card was created in
//!   and the card itself.
//!
//! - **Snapshot**: the current `lists` and `cards` of a board, as returned by
//!   `GET /boards/{id}?lists=…&cards=…`. Cards point at their list by id.
//!
//! A full Trello export carries both, so the caller always states which one
//! to read through [`RawKind`]. Parsing only checks the top-level structure;
//! individual action events that don't look like a card creation are kept as
//! [`ActionEvent::Other`] and skipped later.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Board JSON does not contain `{0}`")]
    MissingField(&'static str),
    #[error("Board JSON field `{field}` is malformed: {source}")]
    Malformed {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Which representation of the board to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    /// `actions` array of `createCard` events.
    ActionLog,
    /// `lists` + `cards` collections.
    Snapshot,
}

/// A card-creation event reduced to the two names the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardCreated {
    pub list_name: String,
    pub card_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEvent {
    CardCreated(CardCreated),
    /// Any other action kind, or a `createCard` missing its list or card name.
    Other,
}

#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    pub events: Vec<ActionEvent>,
}

#[derive(Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<RawActionData>,
}

#[derive(Deserialize)]
struct RawActionData {
    list: Option<Named>,
    card: Option<Named>,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

impl ActionEvent {
    fn from_value(value: &Value) -> Self {
        let Ok(action) = RawAction::deserialize(value) else {
            return ActionEvent::Other;
        };
        if action.kind != "createCard" {
            return ActionEvent::Other;
        }
        match action.data {
            Some(RawActionData {
                list: Some(list),
                card: Some(card),
            }) => ActionEvent::CardCreated(CardCreated {
                list_name: list.name,
                card_name: card.name,
            }),
            _ => ActionEvent::Other,
        }
    }
}

impl ActionLog {
    /// Read the `actions` array of a board export.
    pub fn from_value(value: &Value) -> Result<Self, BoardError> {
        let actions = value
            .get("actions")
            .ok_or(BoardError::MissingField("actions"))?;
        let actions = actions
            .as_array()
            .ok_or_else(|| malformed("actions", actions))?;
        Ok(Self {
            events: actions.iter().map(ActionEvent::from_value).collect(),
        })
    }

    /// Card-creation events in log order.
    pub fn cards_created(&self) -> impl Iterator<Item = &CardCreated> {
        self.events.iter().filter_map(|e| match e {
            ActionEvent::CardCreated(c) => Some(c),
            ActionEvent::Other => None,
        })
    }
}

/// A list (column) of a board.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BoardList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub closed: bool,
}

/// A card, owned by the list whose id is `id_list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Card {
    pub name: String,
    #[serde(rename = "idList")]
    pub id_list: String,
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Board name, when the payload carries one.
    pub name: Option<String>,
    pub lists: Vec<BoardList>,
    pub cards: Vec<Card>,
}

impl Snapshot {
    /// Read the `lists` and `cards` collections of a board payload.
    pub fn from_value(value: &Value) -> Result<Self, BoardError> {
        let cards = value.get("cards").ok_or(BoardError::MissingField("cards"))?;
        let lists = value.get("lists").ok_or(BoardError::MissingField("lists"))?;
        let lists = Vec::<BoardList>::deserialize(lists).map_err(|source| BoardError::Malformed {
            field: "lists",
            source,
        })?;
        let cards = Vec::<Card>::deserialize(cards).map_err(|source| BoardError::Malformed {
            field: "cards",
            source,
        })?;
        Ok(Self {
            name: value.get("name").and_then(Value::as_str).map(str::to_string),
            lists,
            cards,
        })
    }
}

/// One board, in the representation the caller asked for.
#[derive(Debug, Clone)]
pub enum RawBoard {
    ActionLog(ActionLog),
    Snapshot(Snapshot),
}

impl RawBoard {
    pub fn parse(value: &Value, kind: RawKind) -> Result<Self, BoardError> {
        match kind {
            RawKind::ActionLog => ActionLog::from_value(value).map(RawBoard::ActionLog),
            RawKind::Snapshot => Snapshot::from_value(value).map(RawBoard::Snapshot),
        }
    }

    pub fn kind(&self) -> RawKind {
        match self {
            RawBoard::ActionLog(_) => RawKind::ActionLog,
            RawBoard::Snapshot(_) => RawKind::Snapshot,
        }
    }
}

fn malformed(field: &'static str, value: &Value) -> BoardError {
    // Reuse serde's wording for the type mismatch.
    let source = Vec::<Value>::deserialize(value)
        .err()
        .unwrap_or_else(|| serde::de::Error::custom("expected an array"));
    BoardError::Malformed { field, source }
}
