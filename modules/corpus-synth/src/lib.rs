//! Stage 5: labeled composites for detector training.
//!
//! Two stored images are laid out side by side or stacked, captioned, marked
//! with a translucent circle, and written together with a label file holding
//! one normalized box per source image plus one for the circle.

pub mod annotation;
pub mod compose;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod overlay;

pub use annotation::{label_text, write_label, BoundingBox};
pub use compose::{compose, Composite, Layout};
pub use error::{Result, SynthError};
pub use generator::{
    generate_batch, list_source_images, CompositeSample, Rendered, SynthSettings, Synthesizer,
};
pub use overlay::{Caption, Captioner, Circle, FontCaptioner};
