//! Trello REST client.
//!
//! The [`BoardSource`] trait is the seam the pipeline fetches boards
//! through; [`TrelloClient`] is the production implementation. Responses
//! are returned as raw JSON so a fetched board and a board read from an
//! export file take the same path through [`crate::board`].
//!
//! A board is addressed by name or id. Names are resolved against the
//! boards of the authenticated member (`GET /members/me/boards`) with an
//! exact, case-sensitive match. When no name matches and the identifier has
//! the shape of a Trello id (24 hex digits, or an 8-character short link) it
//! is used as the id directly.

use crate::board::RawKind;
use crate::config::TrelloConfig;
use crate::credentials::TrelloCredentials;
use crate::normalize::ClosedPolicy;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum TrelloError {
    #[error("Board '{0}' not found")]
    NotFound(String),
    #[error("Trello rejected the API key or token ({0})")]
    Unauthorized(StatusCode),
    #[error("Trello request failed with {status}: {body}")]
    Remote { status: StatusCode, body: String },
    #[error("Trello request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Most actions Trello returns for one board request. The endpoint does not
/// page them.
pub const ACTIONS_LIMIT: &str = "1000";

/// What to ask the board endpoint for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub kind: RawKind,
    pub closed: ClosedPolicy,
}

impl FetchRequest {
    pub fn snapshot(closed: ClosedPolicy) -> Self {
        Self {
            kind: RawKind::Snapshot,
            closed,
        }
    }

    /// Query parameters for `GET /boards/{id}`, credentials excluded.
    pub fn query(&self) -> Vec<(&'static str, &'static str)> {
        let filter = match self.closed {
            ClosedPolicy::ExcludeClosed => "open",
            ClosedPolicy::IgnoreStatus => "all",
        };
        let mut query = vec![
            ("fields", "name"),
            ("lists", filter),
            ("list_fields", "name,closed"),
            ("cards", filter),
            ("card_fields", "name,idList,closed"),
        ];
        if self.kind == RawKind::ActionLog {
            query.push(("actions", "createCard"));
            query.push(("actions_limit", ACTIONS_LIMIT));
        }
        query
    }
}

/// Anything that can produce a raw board payload.
pub trait BoardSource {
    /// Fetch the board named or identified by `board`.
    fn fetch(&self, board: &str, request: FetchRequest) -> Result<Value, TrelloError>;
}

#[derive(Debug, Deserialize)]
struct BoardSummary {
    id: String,
    name: String,
}

pub struct TrelloClient {
    http: Client,
    base_url: String,
    credentials: TrelloCredentials,
}

impl TrelloClient {
    pub fn new(credentials: TrelloCredentials, config: &TrelloConfig) -> Result<Self, TrelloError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, TrelloError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.credentials.api_key.as_str()),
                ("token", self.credentials.token.as_str()),
            ])
            .query(query)
            .send()?;
        Ok(response)
    }

    /// Id of the member's board named exactly `name`, if any.
    pub fn board_id_by_name(&self, name: &str) -> Result<Option<String>, TrelloError> {
        let response = check_status(self.get("/members/me/boards", &[("fields", "name")])?)?;
        let boards: Vec<BoardSummary> = response.json()?;
        Ok(boards.into_iter().find(|b| b.name == name).map(|b| b.id))
    }

    /// Resolve a board name or id to an id.
    pub fn resolve_board_id(&self, board: &str) -> Result<String, TrelloError> {
        if let Some(id) = self.board_id_by_name(board)? {
            debug!(board, %id, "resolved board name");
            return Ok(id);
        }
        if looks_like_board_id(board) {
            return Ok(board.to_string());
        }
        Err(TrelloError::NotFound(board.to_string()))
    }

    /// Fetch a board by id.
    pub fn get_board_data(&self, id: &str, request: FetchRequest) -> Result<Value, TrelloError> {
        let response = self.get(&format!("/boards/{id}"), &request.query())?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(TrelloError::NotFound(id.to_string()));
        }
        let value: Value = check_status(response)?.json()?;
        if request.kind == RawKind::ActionLog && actions_at_limit(&value) {
            warn!(
                board = id,
                limit = ACTIONS_LIMIT,
                "action log is truncated at Trello's limit, older cards are missing"
            );
        }
        Ok(value)
    }
}

impl BoardSource for TrelloClient {
    fn fetch(&self, board: &str, request: FetchRequest) -> Result<Value, TrelloError> {
        let id = self.resolve_board_id(board)?;
        info!(board, %id, kind = ?request.kind, "fetching board");
        self.get_board_data(&id, request)
    }
}

fn check_status(response: Response) -> Result<Response, TrelloError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(TrelloError::Unauthorized(status));
    }
    let body = response.text().unwrap_or_default();
    Err(TrelloError::Remote { status, body })
}

/// Whether a board payload holds exactly [`ACTIONS_LIMIT`] actions.
pub fn actions_at_limit(value: &Value) -> bool {
    let returned = value.get("actions").and_then(Value::as_array).map(Vec::len);
    returned.is_some() && returned == ACTIONS_LIMIT.parse::<usize>().ok()
}

/// Whether `s` has the shape of a board id or short link.
pub fn looks_like_board_id(s: &str) -> bool {
    let full_id = s.len() == 24 && s.chars().all(|c| c.is_ascii_hexdigit());
    let short_link = s.len() == 8 && s.chars().all(|c| c.is_ascii_alphanumeric());
    full_id || short_link
}
