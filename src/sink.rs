//! File output.
//!
//! Targets are overwritten wholesale. Callers only reach this point once the
//! payload is fully encoded, so a failed run never leaves a partial file.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot serialize {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Write `payload` to `path` as UTF-8, replacing any existing file.
pub fn write_output(path: &Path, payload: &str) -> Result<(), SinkError> {
    fs::write(path, payload).map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = payload.len(), "wrote output");
    Ok(())
}

/// Write `value` to `path` as pretty-printed JSON with a trailing newline.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SinkError> {
    let mut json = serde_json::to_string_pretty(value).map_err(|source| SinkError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    json.push('\n');
    write_output(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn overwrites_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("courses_export.txt");
        fs::write(&path, "old content that is longer than the new one").unwrap();
        write_output(&path, "LIDL\nMilk\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "LIDL\nMilk\n");
    }

    #[test]
    fn json_keeps_non_ascii_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("courses.json");
        write_json(&path, &json!({"name": "Crème fraîche"})).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("Crème fraîche"));
        assert!(written.ends_with("}\n"));
    }

    #[test]
    fn missing_directory_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("no/such/dir/out.csv");
        let err = write_output(&path, "x").unwrap_err();
        assert!(matches!(err, SinkError::Io { .. }));
        assert!(err.to_string().contains("out.csv"));
    }
}
