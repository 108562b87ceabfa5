//! The export pipeline: Source → Normalizer → Encoder → Sink.
//!
//! Each front-end command is a short composition of the functions here:
//!
//! ```text
//! csv   = read_board_file | fetch_board → extract → export_csv
//! text  = read_board_file | fetch_board → extract → export_text
//! note  = read_board_file | fetch_board → extract → publish_note
//! fetch = save_snapshot
//! ```
//!
//! [`extract`] is the single gate between input and output: it fails with
//! [`PipelineError::NoMatchingData`] when the selected lists hold no items,
//! and nothing is written or sent after a failure.
//!
//! Remote collaborators come in as trait objects ([`BoardSource`],
//! [`NoteService`]) so tests drive the whole pipeline without a network.

use crate::board::{BoardError, RawBoard, RawKind};
use crate::config::ConfigError;
use crate::credentials::CredentialsError;
use crate::encode::{self, EncodeError, NoteStyle};
use crate::keep::{CreatedNote, KeepError, NewNote, NoteService};
use crate::normalize::{ClosedPolicy, ItemMap, ListFilter, NormalizeOptions, normalize};
use crate::sink::{self, SinkError};
use crate::trello::{BoardSource, FetchRequest, TrelloError};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Coarse classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input file or board payload is unusable.
    InvalidInput,
    /// Board (or input file) does not exist.
    NotFound,
    /// The filter matched no items.
    NoMatchingData,
    /// A remote service rejected the credentials.
    Authorization,
    /// Network or remote failure.
    Transport,
    Io,
    Config,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input file {} does not exist", .0.display())]
    InputNotFound(PathBuf),
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("No items found in the selected lists ({})", .0.join(", "))]
    NoMatchingData(Vec<String>),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error(transparent)]
    Trello(#[from] TrelloError),
    #[error(transparent)]
    Keep(#[from] KeepError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InputNotFound(_) => ErrorKind::NotFound,
            PipelineError::Json { .. } | PipelineError::Board(_) => ErrorKind::InvalidInput,
            PipelineError::NoMatchingData(_) => ErrorKind::NoMatchingData,
            PipelineError::Read { .. } | PipelineError::Sink(_) | PipelineError::Encode(_) => {
                ErrorKind::Io
            }
            PipelineError::Config(_) | PipelineError::Credentials(_) => ErrorKind::Config,
            PipelineError::Trello(e) => match e {
                TrelloError::NotFound(_) => ErrorKind::NotFound,
                TrelloError::Unauthorized(_) => ErrorKind::Authorization,
                TrelloError::Remote { .. } | TrelloError::Http(_) => ErrorKind::Transport,
            },
            PipelineError::Keep(e) => match e {
                KeepError::NoImpersonatedUser => ErrorKind::Config,
                KeepError::Authorization(_) | KeepError::Signing(_) => ErrorKind::Authorization,
                KeepError::Remote { .. } | KeepError::Transport(_) => ErrorKind::Transport,
            },
        }
    }
}

/// Where the board comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A JSON export on disk.
    File(PathBuf),
    /// A live board, by name or id.
    Board(String),
}

impl Source {
    /// Representation read when the caller doesn't choose one: exports carry
    /// the full action history, live boards are read as they stand.
    pub fn default_kind(&self) -> RawKind {
        match self {
            Source::File(_) => RawKind::ActionLog,
            Source::Board(_) => RawKind::Snapshot,
        }
    }

    /// Note title when none is given: the board identifier or the file stem.
    pub fn default_title(&self) -> String {
        match self {
            Source::Board(board) => board.clone(),
            Source::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

/// Which lists to export and how to read the board.
#[derive(Debug, Clone)]
pub struct Selection {
    pub filter: ListFilter,
    pub kind: RawKind,
    pub closed: ClosedPolicy,
}

impl Selection {
    pub fn new(filter: ListFilter, kind: RawKind) -> Self {
        Self {
            filter,
            kind,
            closed: ClosedPolicy::default(),
        }
    }

    pub fn with_closed(mut self, closed: ClosedPolicy) -> Self {
        self.closed = closed;
        self
    }

    pub fn options(&self) -> NormalizeOptions {
        let options = NormalizeOptions::for_kind(self.kind);
        match self.kind {
            // Events carry no status to act on.
            RawKind::ActionLog => options,
            RawKind::Snapshot => options.with_closed(self.closed),
        }
    }

    fn request(&self) -> FetchRequest {
        FetchRequest {
            kind: self.kind,
            closed: self.closed,
        }
    }
}

/// Result of a file export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub items: usize,
    pub path: PathBuf,
}

/// Result of [`save_snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub board: String,
    pub lists: usize,
    pub cards: usize,
    pub path: PathBuf,
}

// ============================================================================
// Source
// ============================================================================

pub fn read_board_file(path: &Path) -> Result<Value, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "read board file");
    serde_json::from_str(&content).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn fetch_board(
    source: &dyn BoardSource,
    board: &str,
    selection: &Selection,
) -> Result<Value, PipelineError> {
    Ok(source.fetch(board, selection.request())?)
}

// ============================================================================
// Normalize
// ============================================================================

/// Parse `value` as the selected representation and normalize it.
pub fn extract(value: &Value, selection: &Selection) -> Result<ItemMap, PipelineError> {
    let board = RawBoard::parse(value, selection.kind)?;
    let map = normalize(&board, &selection.filter, selection.options());

    if map.total_items() == 0 {
        let names = selection.filter.given_names().map(str::to_string).collect();
        return Err(PipelineError::NoMatchingData(names));
    }
    for name in selection.filter.given_names() {
        let found = map
            .get(&name.to_lowercase())
            .is_some_and(|list| !list.items.is_empty());
        if !found {
            warn!(list = name, "no items in list");
        }
    }
    info!(lists = map.len(), items = map.total_items(), "extracted items");
    Ok(map)
}

// ============================================================================
// Encode + sink
// ============================================================================

pub fn export_csv(map: &ItemMap, path: &Path) -> Result<ExportSummary, PipelineError> {
    let payload = encode::encode_csv(map)?;
    sink::write_output(path, &payload)?;
    Ok(ExportSummary {
        items: map.total_items(),
        path: path.to_path_buf(),
    })
}

pub fn export_text(
    map: &ItemMap,
    filter: &ListFilter,
    path: &Path,
) -> Result<ExportSummary, PipelineError> {
    let payload = encode::encode_text(map, filter);
    sink::write_output(path, &payload)?;
    Ok(ExportSummary {
        items: map.total_items(),
        path: path.to_path_buf(),
    })
}

/// Build the note [`publish_note`] would send.
pub fn build_note(title: &str, map: &ItemMap, filter: &ListFilter, style: NoteStyle) -> NewNote {
    NewNote {
        title: title.to_string(),
        body: encode::encode_note(map, filter, style),
    }
}

pub fn publish_note(
    service: &dyn NoteService,
    title: &str,
    map: &ItemMap,
    filter: &ListFilter,
    style: NoteStyle,
) -> Result<CreatedNote, PipelineError> {
    let note = build_note(title, map, filter, style);
    Ok(service.create_note(&note)?)
}

/// Fetch a live board and store it as pretty-printed JSON.
pub fn save_snapshot(
    source: &dyn BoardSource,
    board: &str,
    closed: ClosedPolicy,
    path: &Path,
) -> Result<SnapshotSummary, PipelineError> {
    let value = source.fetch(board, FetchRequest::snapshot(closed))?;
    let count = |field: &str| value.get(field).and_then(Value::as_array).map_or(0, Vec::len);
    let summary = SnapshotSummary {
        board: value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(board)
            .to_string(),
        lists: count("lists"),
        cards: count("cards"),
        path: path.to_path_buf(),
    };
    sink::write_json(path, &value)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keep::tests::RecordingNoteService;
    use crate::test_helpers::*;
    use crate::trello::tests::MockBoardSource;
    use tempfile::TempDir;

    fn example_log() -> Value {
        action_log(vec![
            create_card("Lidl", "Milk"),
            create_card("Carrefour", "Eggs"),
            other_action("other"),
        ])
    }

    fn log_selection(names: &[&str]) -> Selection {
        Selection::new(filter(names), RawKind::ActionLog)
    }

    // =========================================================================
    // extract
    // =========================================================================

    #[test]
    fn extract_example_action_log() {
        let map = extract(&example_log(), &log_selection(&["lidl", "carrefour"])).unwrap();
        assert_eq!(
            map_pairs(&map),
            vec![
                ("lidl".to_string(), vec!["Milk".to_string()]),
                ("carrefour".to_string(), vec!["Eggs".to_string()]),
            ]
        );
    }

    #[test]
    fn extract_closed_list_has_no_matching_data() {
        let value = snapshot(&[("l1", "Lidl", true)], &[("Milk", "l1", false)]);
        let selection = Selection::new(filter(&["lidl"]), RawKind::Snapshot);
        let err = extract(&value, &selection).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatchingData);
        assert!(err.to_string().contains("lidl"));
    }

    #[test]
    fn extract_closed_list_included_on_request() {
        let value = snapshot(&[("l1", "Lidl", true)], &[("Milk", "l1", false)]);
        let selection = Selection::new(filter(&["lidl"]), RawKind::Snapshot)
            .with_closed(ClosedPolicy::IgnoreStatus);
        let map = extract(&value, &selection).unwrap();
        assert_eq!(map.get("lidl").unwrap().items, vec!["Milk"]);
    }

    #[test]
    fn extract_missing_field_is_invalid_input() {
        let value = snapshot(&[], &[]);
        let err = extract(&value, &log_selection(&["lidl"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(matches!(err, PipelineError::Board(BoardError::MissingField("actions"))));
    }

    #[test]
    fn extract_unselected_lists_is_no_matching_data() {
        let err = extract(&example_log(), &log_selection(&["aldi"])).unwrap_err();
        assert!(matches!(err, PipelineError::NoMatchingData(ref names) if names == &["aldi"]));
    }

    // =========================================================================
    // Sources
    // =========================================================================

    #[test]
    fn read_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = read_board_file(&tmp.path().join("courses.json")).unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn read_invalid_json_is_invalid_input() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("courses.json");
        fs::write(&path, "[1, 2").unwrap();
        let err = read_board_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn fetch_board_passes_selection_through() {
        let source = MockBoardSource::with_board("Courses", example_log());
        let selection =
            log_selection(&["lidl"]).with_closed(ClosedPolicy::IgnoreStatus);
        fetch_board(&source, "Courses", &selection).unwrap();

        let requests = source.requests.lock().unwrap();
        assert_eq!(
            requests[0].1,
            FetchRequest {
                kind: RawKind::ActionLog,
                closed: ClosedPolicy::IgnoreStatus
            }
        );
    }

    #[test]
    fn fetch_unknown_board_is_not_found() {
        let source = MockBoardSource::default();
        let err = fetch_board(&source, "Nope", &log_selection(&["lidl"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn source_defaults() {
        let file = Source::File(PathBuf::from("exports/courses.json"));
        assert_eq!(file.default_kind(), RawKind::ActionLog);
        assert_eq!(file.default_title(), "courses");

        let board = Source::Board("Courses".into());
        assert_eq!(board.default_kind(), RawKind::Snapshot);
        assert_eq!(board.default_title(), "Courses");
    }

    // =========================================================================
    // Sinks
    // =========================================================================

    #[test]
    fn export_csv_writes_example_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("courses_export.csv");
        let map = extract(&example_log(), &log_selection(&["lidl", "carrefour"])).unwrap();

        let summary = export_csv(&map, &path).unwrap();
        assert_eq!(summary.items, 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "list,item\nLidl,Milk\nCarrefour,Eggs\n"
        );
    }

    #[test]
    fn export_text_writes_filter_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("courses_export.txt");
        let selection = log_selection(&["carrefour", "lidl"]);
        let map = extract(&example_log(), &selection).unwrap();

        export_text(&map, &selection.filter, &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "CARREFOUR\nEggs\n\nLIDL\nMilk\n"
        );
    }

    #[test]
    fn no_matching_data_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("courses_export.csv");
        let service = RecordingNoteService::new();

        let result = extract(&example_log(), &log_selection(&["aldi"])).and_then(|map| {
            export_csv(&map, &path)?;
            publish_note(&service, "Courses", &map, &filter(&["aldi"]), NoteStyle::Checklist)
        });

        assert!(result.is_err());
        assert!(!path.exists());
        assert!(service.get_notes().is_empty());
    }

    #[test]
    fn publish_note_sends_checklist() {
        let service = RecordingNoteService::new();
        let selection = log_selection(&["lidl", "carrefour"]);
        let map = extract(&example_log(), &selection).unwrap();

        let created =
            publish_note(&service, "Courses", &map, &selection.filter, NoteStyle::Checklist)
                .unwrap();
        assert_eq!(created.title, "Courses");

        let notes = service.get_notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(
            notes[0].body,
            encode::encode_note(&map, &selection.filter, NoteStyle::Checklist)
        );
    }

    #[test]
    fn rejected_note_is_authorization() {
        let service = RecordingNoteService::rejecting();
        let selection = log_selection(&["lidl"]);
        let map = extract(&example_log(), &selection).unwrap();
        let err = publish_note(&service, "Courses", &map, &selection.filter, NoteStyle::Text)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn save_snapshot_writes_board_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("courses.json");
        let value = snapshot(
            &[("l1", "Lidl", false), ("l2", "Carrefour", false)],
            &[("Crème fraîche", "l2", false)],
        );
        let source = MockBoardSource::with_board("Courses", value.clone());

        let summary =
            save_snapshot(&source, "Courses", ClosedPolicy::ExcludeClosed, &path).unwrap();
        assert_eq!(summary.board, "Courses");
        assert_eq!(summary.lists, 2);
        assert_eq!(summary.cards, 1);

        let saved = read_board_file(&path).unwrap();
        assert_eq!(saved, value);
        assert!(fs::read_to_string(&path).unwrap().contains("Crème fraîche"));
    }
}
