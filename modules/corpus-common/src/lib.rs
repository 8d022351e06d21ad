pub mod checkpoint;
pub mod config;
pub mod error;
pub mod progress;
pub mod report;
pub mod types;

pub use checkpoint::{read_checkpoint, read_checkpoint_or_default, write_checkpoint};
pub use config::PipelineConfig;
pub use error::{CorpusError, Result};
pub use progress::{NullProgress, Progress};
pub use report::StageReport;
pub use types::*;
