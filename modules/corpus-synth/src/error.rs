use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, SynthError>;

#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("Failed to load asset {}: {reason}", path.display())]
    AssetLoad { path: PathBuf, reason: String },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Need at least 2 source images, found {found}")]
    NotEnoughImages { found: usize },

    #[error("Canvas {width}x{height} cannot hold a circle of radius {radius}")]
    CanvasTooSmall { width: u32, height: u32, radius: u32 },

    #[error("Image {width}x{height} collapses to nothing at the target width")]
    Degenerate { width: u32, height: u32 },
}

impl SynthError {
    /// Errors that stop the whole batch instead of one sample.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SynthError::AssetLoad { .. } | SynthError::NotEnoughImages { .. }
        )
    }
}
