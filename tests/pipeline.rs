//! End-to-end runs of the export pipeline through the public library API.
//!
//! Board input comes from `fixtures/board-export.json` or from a `mockito`
//! server standing in for Trello; notes go to a `mockito` server standing in
//! for the Google token endpoint and the Keep API.

use mockito::{Matcher, Server};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use trello2keep::board::RawKind;
use trello2keep::config::{KeepConfig, TrelloConfig};
use trello2keep::credentials::{ServiceAccountKey, load_credentials};
use trello2keep::encode::NoteStyle;
use trello2keep::keep::KeepClient;
use trello2keep::normalize::{ClosedPolicy, ListFilter};
use trello2keep::pipeline::{self, ErrorKind, Selection};
use trello2keep::trello::TrelloClient;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

fn export() -> Value {
    pipeline::read_board_file(&fixture("board-export.json")).unwrap()
}

fn selection(names: &[&str], kind: RawKind) -> Selection {
    Selection::new(ListFilter::new(names), kind)
}

#[test]
fn action_log_to_csv() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("courses_export.csv");
    let map = pipeline::extract(
        &export(),
        &selection(&["LIDL", "carrefour", "whole foods"], RawKind::ActionLog),
    )
    .unwrap();

    let summary = pipeline::export_csv(&map, &path).unwrap();
    assert_eq!(summary.items, 4);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "list,item\nLidl,Milk\nLidl,Bread\nCarrefour,Eggs\nCarrefour,Crème fraîche\n"
    );
}

#[test]
fn action_log_keeps_cards_of_closed_lists() {
    let map = pipeline::extract(&export(), &selection(&["aldi"], RawKind::ActionLog)).unwrap();
    assert_eq!(map.get("aldi").unwrap().items, vec!["Chocolate"]);
}

#[test]
fn snapshot_to_text_skips_closed() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("courses_export.txt");
    let selection = selection(&["aldi", "lidl"], RawKind::Snapshot);
    let map = pipeline::extract(&export(), &selection).unwrap();

    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["aldi", "lidl"]);
    assert!(map.get("aldi").unwrap().items.is_empty());

    pipeline::export_text(&map, &selection.filter, &path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "LIDL\nMilk\nBread\n");
}

#[test]
fn snapshot_of_only_closed_lists_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("courses_export.csv");

    let err = pipeline::extract(&export(), &selection(&["aldi"], RawKind::Snapshot))
        .and_then(|map| pipeline::export_csv(&map, &path))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMatchingData);
    assert!(!path.exists());
}

#[test]
fn missing_input_file_is_reported() {
    let err = pipeline::read_board_file(&fixture("no-such-board.json")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("no-such-board.json"));
}

#[test]
fn live_board_to_csv() {
    let mut server = Server::new();
    let _boards = server
        .mock("GET", "/members/me/boards")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":"5f1c2a9e8b7d6c5a4b3e2f10","name":"Courses"}]"#)
        .create();
    let board = server
        .mock("GET", "/boards/5f1c2a9e8b7d6c5a4b3e2f10")
        .match_query(Matcher::UrlEncoded("lists".into(), "open".into()))
        .with_header("content-type", "application/json")
        .with_body(fs::read_to_string(fixture("board-export.json")).unwrap())
        .create();

    let credentials = load_credentials(&fixture("credentials.json"), |_| None).unwrap();
    let client = TrelloClient::new(
        credentials.trello().unwrap(),
        &TrelloConfig {
            base_url: server.url(),
            timeout_secs: 5,
        },
    )
    .unwrap();

    let selection = selection(&["carrefour"], RawKind::Snapshot);
    let value = pipeline::fetch_board(&client, "Courses", &selection).unwrap();
    let map = pipeline::extract(&value, &selection).unwrap();
    board.assert();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("out.csv");
    pipeline::export_csv(&map, &path).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "list,item\nCarrefour,Eggs\nCarrefour,Crème fraîche\n"
    );
}

#[test]
fn live_board_saved_as_snapshot_reads_back() {
    let mut server = Server::new();
    let _boards = server
        .mock("GET", "/members/me/boards")
        .match_query(Matcher::Any)
        .with_body("[]")
        .create();
    let _board = server
        .mock("GET", "/boards/5f1c2a9e8b7d6c5a4b3e2f10")
        .match_query(Matcher::UrlEncoded("cards".into(), "all".into()))
        .with_body(fs::read_to_string(fixture("board-export.json")).unwrap())
        .create();

    let credentials = load_credentials(&fixture("credentials.json"), |_| None).unwrap();
    let client = TrelloClient::new(
        credentials.trello().unwrap(),
        &TrelloConfig {
            base_url: server.url(),
            timeout_secs: 5,
        },
    )
    .unwrap();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("courses.json");
    let summary = pipeline::save_snapshot(
        &client,
        "5f1c2a9e8b7d6c5a4b3e2f10",
        ClosedPolicy::IgnoreStatus,
        &path,
    )
    .unwrap();
    assert_eq!(summary.board, "Courses");
    assert_eq!(summary.lists, 4);

    let saved = pipeline::read_board_file(&path).unwrap();
    let selection = selection(&["aldi"], RawKind::Snapshot).with_closed(ClosedPolicy::IgnoreStatus);
    let map = pipeline::extract(&saved, &selection).unwrap();
    assert_eq!(map.get("aldi").unwrap().items, vec!["Chocolate"]);
}

#[test]
fn export_to_keep_checklist() {
    let mut server = Server::new();
    let token = server
        .mock("POST", "/token")
        .match_body(Matcher::Regex("assertion=".into()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"ya29.integration","expires_in":3599}"#)
        .create();
    let note = server
        .mock("POST", "/v1/notes")
        .match_header("authorization", "Bearer ya29.integration")
        .match_body(Matcher::Json(serde_json::json!({
            "title": "board-export",
            "body": {"list": {"listItems": [
                {
                    "text": {"text": "LIDL"},
                    "checked": false,
                    "childListItems": [
                        {"text": {"text": "Milk"}, "checked": false},
                        {"text": {"text": "Bread"}, "checked": false}
                    ]
                },
                {
                    "text": {"text": "CARREFOUR"},
                    "checked": false,
                    "childListItems": [
                        {"text": {"text": "Eggs"}, "checked": false},
                        {"text": {"text": "Crème fraîche"}, "checked": false}
                    ]
                }
            ]}}
        })))
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"notes/xyz","title":"board-export"}"#)
        .create();

    let credentials = load_credentials(&fixture("credentials.json"), |_| None).unwrap();
    let key = ServiceAccountKey {
        token_uri: format!("{}/token", server.url()),
        ..credentials.service_account().unwrap().clone()
    };
    let keep = KeepConfig {
        base_url: format!("{}/v1", server.url()),
        timeout_secs: 5,
        impersonated_user: Some("shopper@example.com".into()),
    };
    let client = KeepClient::new(key, keep.impersonated_user.as_deref(), &keep).unwrap();

    let source = pipeline::Source::File(fixture("board-export.json"));
    let selection = selection(&["lidl", "carrefour"], source.default_kind());
    let map = pipeline::extract(&export(), &selection).unwrap();
    let created = pipeline::publish_note(
        &client,
        &source.default_title(),
        &map,
        &selection.filter,
        NoteStyle::Checklist,
    )
    .unwrap();

    assert_eq!(created.name, "notes/xyz");
    token.assert();
    note.assert();
}
