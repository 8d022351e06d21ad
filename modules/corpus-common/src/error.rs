use std::path::PathBuf;

use site_client::FetchError;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, CorpusError>;

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to access checkpoint {}: {source}", path.display())]
    CheckpointIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint {} is corrupt: {source}", path.display())]
    CheckpointCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CorpusError {
    /// Errors that must abort the whole run rather than a single unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CorpusError::CheckpointCorrupt { .. } | CorpusError::Config(_)
        )
    }
}
