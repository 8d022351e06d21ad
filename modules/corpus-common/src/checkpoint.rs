//! JSON checkpoint files at stage boundaries.
//!
//! Each checkpoint is written once per stage run, after the stage's worker pool
//! has drained. Writes go through a temp file in the same directory and are
//! renamed into place, so an interrupted run leaves the previous checkpoint
//! intact.

use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{CorpusError, Result};

/// Read and decode a checkpoint. A missing file is an error.
pub fn read_checkpoint<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|source| CorpusError::CheckpointIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CorpusError::CheckpointCorrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`read_checkpoint`], but a missing file yields `T::default()`.
/// Used for state that legitimately does not exist before the first run.
pub fn read_checkpoint_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            serde_json::from_str(&content).map_err(|source| CorpusError::CheckpointCorrupt {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No checkpoint yet, starting empty");
            Ok(T::default())
        }
        Err(source) => Err(CorpusError::CheckpointIo {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Encode with 4-space indentation and atomically replace `path`.
pub fn write_checkpoint<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let io_err = |source: std::io::Error| CorpusError::CheckpointIo {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| io_err(std::io::Error::new(ErrorKind::InvalidData, e)))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&buf).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!(path = %path.display(), bytes = buf.len(), "Checkpoint written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GalleryResult, ItemListing};

    #[test]
    fn listings_round_trip_with_unicode_titles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.json");
        let listings = vec![
            ItemListing::new("https://myanimelist.net/anime/2/b", "葬送のフリーレン"),
            ItemListing::new("https://myanimelist.net/anime/1/a", "Alpha"),
        ];

        write_checkpoint(&path, &listings).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("葬送のフリーレン"), "non-ascii must not be escaped");
        assert!(raw.contains("\n        \"url\""), "4-space indentation");

        let back: Vec<ItemListing> = read_checkpoint(&path).unwrap();
        assert_eq!(back, listings);
    }

    #[test]
    fn missing_file_defaults_when_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");

        let listings: Vec<ItemListing> = read_checkpoint_or_default(&path).unwrap();
        assert!(listings.is_empty());

        let err = read_checkpoint::<Vec<ItemListing>>(&path).unwrap_err();
        assert!(matches!(err, CorpusError::CheckpointIo { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn corrupt_checkpoint_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("galleries.json");
        std::fs::write(&path, "[{\"url\": ").unwrap();

        let err = read_checkpoint_or_default::<Vec<GalleryResult>>(&path).unwrap_err();
        assert!(matches!(err, CorpusError::CheckpointCorrupt { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn write_creates_parent_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/index.json");

        write_checkpoint(&path, &vec!["a".to_string()]).unwrap();
        write_checkpoint(&path, &vec!["b".to_string(), "c".to_string()]).unwrap();

        let back: Vec<String> = read_checkpoint(&path).unwrap();
        assert_eq!(back, vec!["b", "c"]);
    }
}
