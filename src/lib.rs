//! # trello2keep
//!
//! Export the cards of selected Trello lists to a CSV file, a plain-text file,
//! or a Google Keep note. The lists are chosen by name, case-insensitively, and
//! the board comes either from a JSON export on disk or live from the Trello
//! API.
//!
//! # Architecture: One-Way Pipeline
//!
//! ```text
//! Source        board JSON (file or Trello API)
//!   ↓
//! Normalizer    selected list → ordered item names      (ItemMap)
//!   ↓
//! Encoder       CSV text | plain text | checklist body
//!   ↓
//! Sink          file on disk | Keep note
//! ```
//!
//! The normalizer and encoders are pure functions over plain data. The two
//! remote services sit behind traits ([`trello::BoardSource`],
//! [`keep::NoteService`]) and are handed to the pipeline as values, so the
//! whole flow runs in tests against in-memory fakes or `mockito` servers.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`board`] | Raw board shapes: action log (`createCard` events) and snapshot (lists + cards) |
//! | [`normalize`] | List filter, normalized `ItemMap`, and the closed/prepopulate policies |
//! | [`encode`] | CSV, text, and checklist encoders plus the Keep note body types |
//! | [`pipeline`] | Composition of the stages, error classification |
//! | [`trello`] | Trello REST client and the `BoardSource` trait |
//! | [`keep`] | Google Keep client (service-account JWT grant) and the `NoteService` trait |
//! | [`sink`] | File output |
//! | [`config`] | `trello2keep.toml` loading, merging, and validation |
//! | [`credentials`] | Trello key/token and Google service account key loading |
//! | [`output`] | CLI output formatting |
//!
//! # Two Readings of a Board
//!
//! A Trello export carries both the board's history (`actions`) and its
//! current state (`lists`, `cards`). They answer different questions:
//!
//! - The **action log** lists every card ever created in a list, including
//!   ones since archived or moved. Selected lists appear in the order their
//!   first card shows up, and only if they have one.
//! - The **snapshot** lists what is on the board now. Closed lists and cards
//!   are dropped unless asked otherwise, and every selected list appears, in
//!   the order given, even when empty.
//!
//! Both behaviours are explicit options ([`normalize::ClosedPolicy`],
//! [`normalize::Prepopulate`]) rather than a hidden difference between code
//! paths.

pub mod board;
pub mod config;
pub mod credentials;
pub mod encode;
pub mod keep;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod sink;
pub mod trello;

#[cfg(test)]
pub(crate) mod test_helpers;
